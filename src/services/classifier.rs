use regex::Regex;

use crate::models::RegionPolicy;
use crate::services::ruleset::{LabelSource, Matcher, Ruleset, RulesetError};

/// Compiled predicate; returns the matched token on success
#[derive(Debug, Clone)]
enum Predicate {
    ContainsAny(Vec<String>),
    ContainsExcept { tokens: Vec<String>, except: Vec<String> },
    Pattern(Regex),
    /// (abbreviation, locality name)
    Prefix(Vec<(String, String)>),
}

/// Token occurring earliest in the name; list order breaks ties
fn leftmost(tokens: &[String], folded: &str) -> Option<String> {
    tokens
        .iter()
        .filter_map(|t| folded.find(t.as_str()).map(|pos| (pos, t)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, t)| t.clone())
}

impl Predicate {
    fn matches(&self, folded: &str) -> Option<String> {
        match self {
            Predicate::ContainsAny(tokens) => leftmost(tokens, folded),
            Predicate::ContainsExcept { tokens, except } => {
                if except.iter().any(|e| folded.contains(e.as_str())) {
                    return None;
                }
                leftmost(tokens, folded)
            }
            Predicate::Pattern(regex) => regex.find(folded).map(|m| m.as_str().to_string()),
            Predicate::Prefix(aliases) => aliases
                .iter()
                .find(|(abbr, _)| folded.starts_with(abbr.as_str()))
                .map(|(_, name)| name.clone()),
        }
    }
}

fn fold(list: &[String]) -> Vec<String> {
    list.iter().map(|t| t.to_uppercase()).collect()
}

#[derive(Debug, Clone)]
struct CompiledRule {
    name: String,
    predicate: Predicate,
    label: LabelSource,
}

/// Assigns every channel to exactly one group
///
/// Rules are evaluated in table order against the upper-cased display name;
/// the first match wins, otherwise the catch-all label is returned.
#[derive(Debug, Clone)]
pub struct GroupClassifier {
    rules: Vec<CompiledRule>,
    catch_all: String,
    region_policy: RegionPolicy,
}

/// Group label plus the rule that produced it (`None` for the catch-all)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub group: String,
    pub rule: Option<String>,
}

impl GroupClassifier {
    pub fn new(ruleset: &Ruleset) -> Result<Self, RulesetError> {
        let mut rules = Vec::with_capacity(ruleset.rules.len());
        for rule in &ruleset.rules {
            let predicate = match &rule.matcher {
                Matcher::ContainsAny { tokens } => Predicate::ContainsAny(fold(tokens)),
                Matcher::ContainsExcept { tokens, except } => Predicate::ContainsExcept {
                    tokens: fold(tokens),
                    except: fold(except),
                },
                Matcher::Pattern { pattern } => {
                    Predicate::Pattern(Regex::new(pattern).map_err(|source| RulesetError::InvalidPattern {
                        context: format!("group rule '{}'", rule.name),
                        source,
                    })?)
                }
                Matcher::LocalityPrefix => Predicate::Prefix(
                    ruleset
                        .localities
                        .iter()
                        .map(|l| (l.abbreviation.to_uppercase(), l.name.clone()))
                        .collect(),
                ),
            };
            rules.push(CompiledRule {
                name: rule.name.clone(),
                predicate,
                label: rule.label.clone(),
            });
        }

        Ok(Self {
            rules,
            catch_all: ruleset.catch_all.clone(),
            region_policy: ruleset.region_policy,
        })
    }

    /// Group label for a display name
    pub fn classify(&self, display_name: &str) -> String {
        self.classify_detailed(display_name).group
    }

    /// Like [`classify`](Self::classify), also reporting which rule fired
    pub fn classify_detailed(&self, display_name: &str) -> Classification {
        let folded = display_name.to_uppercase();

        for rule in &self.rules {
            if let Some(token) = rule.predicate.matches(&folded) {
                let group = match &rule.label {
                    LabelSource::Fixed { label } => label.clone(),
                    LabelSource::Matched => token,
                    LabelSource::RegionPolicy { collapsed } => match self.region_policy {
                        RegionPolicy::Matched => token,
                        RegionPolicy::Collapsed => collapsed.clone(),
                    },
                };
                return Classification {
                    group,
                    rule: Some(rule.name.clone()),
                };
            }
        }

        Classification {
            group: self.catch_all.clone(),
            rule: None,
        }
    }
}
