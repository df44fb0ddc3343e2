use regex::Regex;

use crate::services::ruleset::{CleanupStep, LocalityAlias, Ruleset, RulesetError};

/// Upper bound on re-applications of a repeating pass
const MAX_REPEAT: usize = 16;

/// Compiled cleanup pass
#[derive(Debug, Clone)]
enum Pass {
    Replace {
        regex: Regex,
        replacement: String,
        repeat: bool,
    },
    Trim,
}

impl Pass {
    fn apply(&self, input: &str) -> String {
        match self {
            Pass::Replace {
                regex,
                replacement,
                repeat,
            } => {
                let mut out = regex.replace_all(input, replacement.as_str()).into_owned();
                if *repeat {
                    for _ in 0..MAX_REPEAT {
                        let next = regex.replace_all(&out, replacement.as_str());
                        if next == out {
                            break;
                        }
                        out = next.into_owned();
                    }
                }
                out
            }
            Pass::Trim => input.trim().to_string(),
        }
    }
}

/// Derives canonical channel ids from noisy display names
///
/// Pipeline: upper-case, ruleset cleanup passes in order, numbered-family
/// extraction, then locality abbreviation substitution.
#[derive(Debug, Clone)]
pub struct IdNormalizer {
    passes: Vec<Pass>,
    family_prefix: String,
    family_number: Regex,
    family_exempt: Vec<String>,
    family_strip_suffix: String,
    localities: Vec<LocalityAlias>,
}

impl IdNormalizer {
    pub fn new(ruleset: &Ruleset) -> Result<Self, RulesetError> {
        let mut passes = Vec::with_capacity(ruleset.cleanup.len());
        for step in &ruleset.cleanup {
            passes.push(match step {
                CleanupStep::Replace {
                    name,
                    pattern,
                    replacement,
                    repeat,
                } => Pass::Replace {
                    regex: Regex::new(pattern).map_err(|source| RulesetError::InvalidPattern {
                        context: format!("cleanup step '{}'", name),
                        source,
                    })?,
                    replacement: replacement.clone(),
                    repeat: *repeat,
                },
                CleanupStep::Trim => Pass::Trim,
            });
        }

        let family_prefix = ruleset.family.prefix.to_uppercase();
        let family_number = Regex::new(&format!(r"{}\d+\+?K?", regex::escape(&family_prefix)))
            .map_err(|source| RulesetError::InvalidPattern {
                context: "family prefix".to_string(),
                source,
            })?;

        Ok(Self {
            passes,
            family_prefix,
            family_number,
            family_exempt: ruleset.family.exempt.iter().map(|s| s.to_uppercase()).collect(),
            family_strip_suffix: ruleset.family.strip_suffix.to_uppercase(),
            localities: ruleset
                .localities
                .iter()
                .map(|l| LocalityAlias {
                    abbreviation: l.abbreviation.to_uppercase(),
                    name: l.name.clone(),
                })
                .collect(),
        })
    }

    /// Canonical id for a display name
    pub fn normalize(&self, display_name: &str) -> String {
        let cleaned = self.clean(display_name);
        let id = self.family_id(&cleaned).unwrap_or(cleaned);
        self.expand_locality(id)
    }

    /// Upper-case and run every cleanup pass
    fn clean(&self, display_name: &str) -> String {
        self.passes
            .iter()
            .fold(display_name.to_uppercase(), |acc, pass| pass.apply(&acc))
    }

    /// Numbered-family special case, `None` when the name is not in the family
    fn family_id(&self, cleaned: &str) -> Option<String> {
        if !cleaned.contains(&self.family_prefix) {
            return None;
        }
        if self.family_exempt.iter().any(|e| e == cleaned) {
            return Some(cleaned.to_string());
        }

        if let Some(m) = self.family_number.find(cleaned) {
            let token = m.as_str();
            let token = if !self.family_strip_suffix.is_empty() {
                token.strip_suffix(&self.family_strip_suffix).unwrap_or(token)
            } else {
                token
            };
            // "CCTV4K" minus "4K" would leave the bare prefix
            if token.len() > self.family_prefix.len() {
                return Some(token.to_string());
            }
            return Some(m.as_str().to_string());
        }

        // Named sub-channel: CCTV风云足球 -> 风云足球
        let start = cleaned.find(&self.family_prefix)? + self.family_prefix.len();
        let rest = cleaned[start..].trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }

    fn expand_locality(&self, id: String) -> String {
        self.localities.iter().fold(id, |acc, alias| {
            if acc.contains(&alias.abbreviation) {
                acc.replace(&alias.abbreviation, &alias.name)
            } else {
                acc
            }
        })
    }
}
