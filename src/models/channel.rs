use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Channel record as read from the source playlist, before enrichment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub display_name: String,
    pub raw_address: String,
    /// 1-based line of the `#EXTINF` line this entry came from
    pub line: usize,
}

/// Fully annotated channel, ready for the composers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelEntry {
    pub display_name: String,
    pub raw_address: String,
    pub rewritten_address: String,
    pub channel_id: String,
    pub group: String,
}

/// Why the parser dropped a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `#EXTINF` line without a trailing name field
    MissingName,
    /// `#EXTINF` line at end of input
    MissingAddress,
    /// Address is empty or neither multicast nor http(s)
    UnsupportedScheme,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingName => write!(f, "missing_name"),
            SkipReason::MissingAddress => write!(f, "missing_address"),
            SkipReason::UnsupportedScheme => write!(f, "unsupported_scheme"),
        }
    }
}

/// A dropped record and the line of its `#EXTINF`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub line: usize,
    pub reason: SkipReason,
}

/// Per-run summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub metadata_lines: usize,
    pub entries: usize,
    pub rewritten: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    /// Group label -> member count, in output order
    pub groups: Vec<(String, usize)>,
    pub generated_at: DateTime<Utc>,
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self {
            metadata_lines: 0,
            entries: 0,
            rewritten: 0,
            skipped: BTreeMap::new(),
            groups: Vec::new(),
            generated_at: Utc::now(),
        }
    }
}

impl PipelineStats {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// How region-family matches are labelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionPolicy {
    /// The matched region token becomes the group label
    Matched,
    /// Every region match lands in one shared bucket
    #[default]
    Collapsed,
}

impl std::str::FromStr for RegionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "matched" => Ok(RegionPolicy::Matched),
            "collapsed" => Ok(RegionPolicy::Collapsed),
            other => Err(format!("unknown region policy: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_policy_from_str() {
        assert_eq!("matched".parse::<RegionPolicy>(), Ok(RegionPolicy::Matched));
        assert_eq!(" Collapsed ".parse::<RegionPolicy>(), Ok(RegionPolicy::Collapsed));
        assert!("regional".parse::<RegionPolicy>().is_err());
    }

    #[test]
    fn test_skipped_total() {
        let mut stats = PipelineStats::default();
        stats.skipped.insert(SkipReason::MissingName, 2);
        stats.skipped.insert(SkipReason::UnsupportedScheme, 3);
        assert_eq!(stats.skipped_total(), 5);
    }
}
