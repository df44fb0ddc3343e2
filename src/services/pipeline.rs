//! Playlist transformation pipeline
//!
//! raw text -> parsed entries -> rewritten addresses -> (id, group) -> outputs.
//! The pipeline itself is pure; diagnostics are reported to a
//! [`PipelineObserver`] supplied by the caller.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::models::{ChannelEntry, PipelineStats, RawEntry, Skipped};
use crate::services::classifier::GroupClassifier;
use crate::services::composer::OutputComposer;
use crate::services::m3u_parser::{count_metadata_lines, EntryParser};
use crate::services::normalizer::IdNormalizer;
use crate::services::rewriter::UrlRewriter;
use crate::services::ruleset::{Ruleset, RulesetError};

/// Receives per-stage events while the pipeline runs
pub trait PipelineObserver {
    fn on_skipped(&mut self, _skipped: &Skipped) {}
    fn on_rewritten(&mut self, _from: &str, _to: &str) {}
    /// `rule` is `None` when the catch-all group was used
    fn on_entry(&mut self, _entry: &ChannelEntry, _rule: Option<&str>) {}
    fn on_finished(&mut self, _stats: &PipelineStats) {}
}

/// Observer that ignores every event
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Observer that forwards events to `tracing`
#[derive(Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_skipped(&mut self, skipped: &Skipped) {
        tracing::debug!(line = skipped.line, reason = %skipped.reason, "Dropped playlist entry");
    }

    fn on_rewritten(&mut self, from: &str, to: &str) {
        tracing::trace!(from, to, "Rewrote multicast address");
    }

    fn on_entry(&mut self, entry: &ChannelEntry, rule: Option<&str>) {
        tracing::trace!(
            name = %entry.display_name,
            id = %entry.channel_id,
            group = %entry.group,
            rule = rule.unwrap_or("catch_all"),
            "Classified channel"
        );
    }

    fn on_finished(&mut self, stats: &PipelineStats) {
        tracing::info!(
            "Processed {} entries from {} metadata lines ({} dropped, {} rewritten)",
            stats.entries,
            stats.metadata_lines,
            stats.skipped_total(),
            stats.rewritten
        );
        for (group, count) in &stats.groups {
            tracing::info!(group = %group, count = *count, "Group summary");
        }
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub entries: Vec<ChannelEntry>,
    pub annotated: String,
    pub grouped: String,
    pub stats: PipelineStats,
}

/// Parser, rewriter, normalizer, classifier and composer wired together
#[derive(Debug, Clone)]
pub struct Pipeline {
    rewriter: UrlRewriter,
    normalizer: IdNormalizer,
    classifier: GroupClassifier,
    composer: OutputComposer,
}

impl Pipeline {
    pub fn new(
        ruleset: &Ruleset,
        rewriter: UrlRewriter,
        logo_template: &str,
        epg_url: Option<&str>,
    ) -> Result<Self, RulesetError> {
        ruleset.validate()?;

        Ok(Self {
            rewriter,
            normalizer: IdNormalizer::new(ruleset)?,
            classifier: GroupClassifier::new(ruleset)?,
            composer: OutputComposer::new(logo_template, epg_url, ruleset.group_order.clone()),
        })
    }

    pub fn from_config(config: &Config, ruleset: &Ruleset) -> Result<Self, RulesetError> {
        let rewriter = UrlRewriter::new(&config.multicast_scheme, &config.proxy_base, &config.proxy_path);
        Self::new(ruleset, rewriter, &config.logo_template, config.epg_url.as_deref())
    }

    pub fn rewriter(&self) -> &UrlRewriter {
        &self.rewriter
    }

    /// Attach rewritten address, id and group to a parsed entry
    pub fn enrich(&self, raw: RawEntry, observer: &mut dyn PipelineObserver) -> ChannelEntry {
        let rewritten_address = match self.rewriter.rewrite(&raw.raw_address) {
            Some(rewritten) => {
                observer.on_rewritten(&raw.raw_address, &rewritten);
                rewritten
            }
            None => raw.raw_address.clone(),
        };

        let classification = self.classifier.classify_detailed(&raw.display_name);
        let entry = ChannelEntry {
            channel_id: self.normalizer.normalize(&raw.display_name),
            group: classification.group,
            display_name: raw.display_name,
            raw_address: raw.raw_address,
            rewritten_address,
        };

        observer.on_entry(&entry, classification.rule.as_deref());
        entry
    }

    /// Run the whole transformation over one playlist document
    pub fn run(&self, text: &str, observer: &mut dyn PipelineObserver) -> PipelineOutput {
        let mut stats = PipelineStats {
            metadata_lines: count_metadata_lines(text),
            ..PipelineStats::default()
        };
        let mut skipped = BTreeMap::new();
        let mut entries = Vec::new();

        for parsed in EntryParser::new(text, self.rewriter.scheme()) {
            match parsed {
                Ok(raw) => {
                    let entry = self.enrich(raw, observer);
                    if entry.rewritten_address != entry.raw_address {
                        stats.rewritten += 1;
                    }
                    entries.push(entry);
                }
                Err(skip) => {
                    observer.on_skipped(&skip);
                    *skipped.entry(skip.reason).or_insert(0) += 1;
                }
            }
        }

        let annotated = self.composer.render_annotated(&entries);
        let grouped = self.composer.render_grouped(&entries);

        stats.entries = entries.len();
        stats.skipped = skipped;
        stats.groups = self
            .composer
            .group_buckets(&entries)
            .into_iter()
            .map(|(group, members)| (group.to_string(), members.len()))
            .collect();

        observer.on_finished(&stats);

        PipelineOutput {
            entries,
            annotated,
            grouped,
            stats,
        }
    }
}
