//! Ruleset definitions for grouping and identifier cleanup
//!
//! Everything the classifier and normalizer match against lives here as plain
//! data. A ruleset can be loaded from JSON so token lists and group order can
//! change between deployments without touching the engines.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::models::RegionPolicy;

/// Errors raised while loading or compiling a ruleset
#[derive(Debug, Error)]
pub enum RulesetError {
    #[error("failed to read ruleset {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed ruleset {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid pattern in {context}: {source}")]
    InvalidPattern {
        context: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid ruleset: {0}")]
    Invalid(String),
}

/// Complete rule table for one deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ruleset {
    pub version: String,
    #[serde(default)]
    pub region_policy: RegionPolicy,
    pub catch_all: String,
    /// Declared output order for the grouped form
    pub group_order: Vec<String>,
    /// Classification rules, first match wins
    pub rules: Vec<GroupRule>,
    /// Identifier cleanup passes, applied in order after upper-casing
    pub cleanup: Vec<CleanupStep>,
    pub family: FamilyRule,
    #[serde(default)]
    pub localities: Vec<LocalityAlias>,
}

/// One (predicate, label) row of the classifier table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRule {
    pub name: String,
    pub matcher: Matcher,
    pub label: LabelSource,
}

/// Condition evaluated against the upper-cased display name
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Matcher {
    /// Any token is a substring
    ContainsAny { tokens: Vec<String> },
    /// Any token is a substring and none of `except` is
    ContainsExcept {
        tokens: Vec<String>,
        except: Vec<String>,
    },
    /// Regex match; the matched text is the token
    Pattern { pattern: String },
    /// Name starts with one of the ruleset's locality abbreviations
    LocalityPrefix,
}

/// Where a matching rule takes its group label from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum LabelSource {
    Fixed { label: String },
    /// The matched token (or locality name) is the label
    Matched,
    /// Decided by the ruleset's region policy
    RegionPolicy { collapsed: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CleanupStep {
    Replace {
        name: String,
        pattern: String,
        #[serde(default)]
        replacement: String,
        /// Re-apply until the text stops changing; needed when matches share
        /// a delimiter (`720P 1080P`)
        #[serde(default)]
        repeat: bool,
    },
    Trim,
}

/// Numbered channel family (e.g. CCTV1..CCTV17)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyRule {
    pub prefix: String,
    /// Sub-brands kept verbatim instead of being reduced to prefix+number
    pub exempt: Vec<String>,
    /// Marker stripped from the end of an extracted numbered id
    pub strip_suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalityAlias {
    pub abbreviation: String,
    pub name: String,
}

impl Ruleset {
    /// Load a ruleset from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RulesetError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| RulesetError::Read {
            path: display.clone(),
            source,
        })?;
        let ruleset: Ruleset = serde_json::from_str(&raw).map_err(|source| RulesetError::Malformed {
            path: display,
            source,
        })?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    pub fn with_region_policy(mut self, policy: RegionPolicy) -> Self {
        self.region_policy = policy;
        self
    }

    /// Structural checks that regex compilation does not cover
    pub fn validate(&self) -> Result<(), RulesetError> {
        if self.catch_all.trim().is_empty() {
            return Err(RulesetError::Invalid("catch-all label is empty".to_string()));
        }
        if self.family.prefix.trim().is_empty() {
            return Err(RulesetError::Invalid("family prefix is empty".to_string()));
        }
        for rule in &self.rules {
            match &rule.label {
                LabelSource::Fixed { label } | LabelSource::RegionPolicy { collapsed: label }
                    if label.trim().is_empty() =>
                {
                    return Err(RulesetError::Invalid(format!("rule '{}' has an empty label", rule.name)));
                }
                _ => {}
            }
            if let Matcher::ContainsAny { tokens } | Matcher::ContainsExcept { tokens, .. } = &rule.matcher {
                if tokens.iter().any(|t| t.is_empty()) {
                    return Err(RulesetError::Invalid(format!("rule '{}' has an empty token", rule.name)));
                }
            }
        }
        if self.localities.iter().any(|l| l.abbreviation.is_empty()) {
            return Err(RulesetError::Invalid("locality abbreviation is empty".to_string()));
        }
        Ok(())
    }
}

fn tokens(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn fixed(label: &str) -> LabelSource {
    LabelSource::Fixed {
        label: label.to_string(),
    }
}

fn replace(name: &str, pattern: &str) -> CleanupStep {
    CleanupStep::Replace {
        name: name.to_string(),
        pattern: pattern.to_string(),
        replacement: String::new(),
        repeat: false,
    }
}

/// Removes tokens that must stand alone, keeping the neighbouring delimiters
fn delimited(name: &str, pattern: &str) -> CleanupStep {
    CleanupStep::Replace {
        name: name.to_string(),
        pattern: pattern.to_string(),
        replacement: "${1}${2}".to_string(),
        repeat: true,
    }
}

// ============ DEFAULT TABLES ============

const DIGITAL_TITLES: &[&str] = &[
    "风云足球", "风云音乐", "风云剧场", "第一剧场", "怀旧剧场", "女性时尚", "世界地理",
    "高尔夫网球", "央视台球", "电视指南", "兵器科技", "文化精品", "央视精品", "卫生健康",
    "求索纪录", "求索科学", "求索动物", "求索生活", "游戏风云", "动漫秀场", "欢笑剧场",
    "都市剧场", "金色学堂", "生活时尚", "法治天地", "七彩戏剧", "东方财经", "劲爆体育",
    "极速汽车", "梨园", "武术世界", "中国天气", "环球奇观", "快乐垂钓", "先锋乒羽",
    "CHC", "睛彩",
];

const INTERNATIONAL: &[&str] = &[
    "CGTN", "CNN", "BBC", "NHK", "BLOOMBERG", "FRANCE24", "DISCOVERY", "NATIONAL GEOGRAPHIC",
    "HBO", "国际",
];

const REGIONS: &[&str] = &[
    "广东", "广州", "深圳", "珠海", "汕头", "佛山", "韶关", "湛江", "肇庆", "江门", "茂名",
    "惠州", "梅州", "汕尾", "河源", "阳江", "清远", "东莞", "中山", "潮州", "揭阳", "云浮",
    "珠江", "南方", "岭南", "大湾区",
];

const TERRITORY: &[&str] = &[
    "TVB", "翡翠", "明珠", "香港", "澳门", "澳视", "澳亚", "台湾", "华视", "中天", "东森",
    "VIUTV", "HOY", "有线",
];

impl Default for Ruleset {
    fn default() -> Self {
        Self {
            version: "2024.4".to_string(),
            region_policy: RegionPolicy::Collapsed,
            catch_all: "其他".to_string(),
            group_order: tokens(&["央视", "卫视", "数字频道", "国际", "地方", "NewTV", "咪咕体育"]),
            rules: vec![
                GroupRule {
                    name: "national".to_string(),
                    matcher: Matcher::ContainsAny {
                        tokens: tokens(&["CCTV", "中央"]),
                    },
                    label: fixed("央视"),
                },
                GroupRule {
                    name: "satellite".to_string(),
                    matcher: Matcher::ContainsExcept {
                        tokens: tokens(&["卫视"]),
                        except: tokens(&["凤凰"]),
                    },
                    label: fixed("卫视"),
                },
                GroupRule {
                    name: "digital".to_string(),
                    matcher: Matcher::ContainsAny {
                        tokens: tokens(DIGITAL_TITLES),
                    },
                    label: fixed("数字频道"),
                },
                GroupRule {
                    name: "international".to_string(),
                    matcher: Matcher::ContainsAny {
                        tokens: tokens(INTERNATIONAL),
                    },
                    label: fixed("国际"),
                },
                GroupRule {
                    name: "newtv".to_string(),
                    matcher: Matcher::ContainsAny {
                        tokens: tokens(&["NEWTV"]),
                    },
                    label: fixed("NewTV"),
                },
                GroupRule {
                    name: "sports_streaming".to_string(),
                    matcher: Matcher::Pattern {
                        pattern: r"咪咕|MIGU".to_string(),
                    },
                    label: fixed("咪咕体育"),
                },
                GroupRule {
                    name: "region".to_string(),
                    matcher: Matcher::ContainsAny {
                        tokens: tokens(REGIONS),
                    },
                    label: LabelSource::RegionPolicy {
                        collapsed: "地方".to_string(),
                    },
                },
                GroupRule {
                    name: "phoenix".to_string(),
                    matcher: Matcher::ContainsAny {
                        tokens: tokens(&["凤凰"]),
                    },
                    label: fixed("凤凰"),
                },
                GroupRule {
                    name: "territory".to_string(),
                    matcher: Matcher::ContainsAny {
                        tokens: tokens(TERRITORY),
                    },
                    label: fixed("港澳台"),
                },
                GroupRule {
                    name: "locality_prefix".to_string(),
                    matcher: Matcher::LocalityPrefix,
                    label: LabelSource::Matched,
                },
            ],
            cleanup: vec![
                replace("brackets", r"\[[^\]]*\]"),
                replace("frame_rate", r"\d+(?:\.\d+)?FPS"),
                replace("bitrate", r"\d+(?:\.\d+)?M(?:BPS)?"),
                delimited("resolution", r"(^|\D)\d{3,4}[PI]?(\D|$)"),
                CleanupStep::Trim,
                replace("quality", r"超高清|超清|高清|标清|蓝光"),
                delimited("quality_latin", r"(^|[^A-Z])(?:UHD|FHD|HD|SD|HEVC|H\.?26[45])([^A-Z]|$)"),
                replace("separators", r"[-_\s]+"),
                replace("channel_suffix", r"(?:频道|CHANNEL)$"),
                CleanupStep::Trim,
            ],
            family: FamilyRule {
                prefix: "CCTV".to_string(),
                exempt: tokens(&["CCTV4K", "CCTV8K"]),
                strip_suffix: "4K".to_string(),
            },
            localities: vec![
                LocalityAlias {
                    abbreviation: "GDTV".to_string(),
                    name: "广东".to_string(),
                },
                LocalityAlias {
                    abbreviation: "GZTV".to_string(),
                    name: "广州".to_string(),
                },
                LocalityAlias {
                    abbreviation: "SZTV".to_string(),
                    name: "深圳".to_string(),
                },
                LocalityAlias {
                    abbreviation: "FSTV".to_string(),
                    name: "佛山".to_string(),
                },
                LocalityAlias {
                    abbreviation: "DGTV".to_string(),
                    name: "东莞".to_string(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ruleset_is_valid() {
        let ruleset = Ruleset::default();
        assert!(ruleset.validate().is_ok());
        assert_eq!(ruleset.rules.first().map(|r| r.name.as_str()), Some("national"));
        assert_eq!(ruleset.catch_all, "其他");
    }

    #[test]
    fn test_default_ruleset_json_roundtrip() {
        let json = serde_json::to_string(&Ruleset::default()).unwrap();
        let parsed: Ruleset = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.rules.len(), Ruleset::default().rules.len());
        assert_eq!(parsed.group_order, Ruleset::default().group_order);
    }

    #[test]
    fn test_ruleset_from_json() {
        let json = r#"{
            "version": "legacy",
            "regionPolicy": "matched",
            "catchAll": "Other",
            "groupOrder": ["National"],
            "rules": [
                {
                    "name": "national",
                    "matcher": { "kind": "contains_any", "tokens": ["CCTV"] },
                    "label": { "from": "fixed", "label": "National" }
                },
                {
                    "name": "region",
                    "matcher": { "kind": "contains_any", "tokens": ["广东"] },
                    "label": { "from": "region_policy", "collapsed": "Regional" }
                }
            ],
            "cleanup": [
                { "op": "replace", "name": "hd", "pattern": "HD" },
                { "op": "trim" }
            ],
            "family": { "prefix": "CCTV", "exempt": ["CCTV4K"], "stripSuffix": "4K" }
        }"#;
        let ruleset: Ruleset = serde_json::from_str(json).unwrap();
        assert_eq!(ruleset.region_policy, RegionPolicy::Matched);
        assert!(ruleset.localities.is_empty());
        assert!(matches!(ruleset.cleanup[0], CleanupStep::Replace { repeat: false, .. }));
        assert!(matches!(ruleset.cleanup[1], CleanupStep::Trim));
        assert!(ruleset.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_labels() {
        let mut ruleset = Ruleset::default();
        ruleset.rules[0].label = fixed(" ");
        assert!(matches!(ruleset.validate(), Err(RulesetError::Invalid(_))));

        let mut ruleset = Ruleset::default();
        ruleset.catch_all = String::new();
        assert!(ruleset.validate().is_err());
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = Ruleset::from_path("/nonexistent/ruleset.json").unwrap_err();
        assert!(matches!(err, RulesetError::Read { .. }));
    }
}
