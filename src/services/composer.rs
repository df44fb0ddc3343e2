use std::collections::HashMap;
use std::fmt::Write;

use crate::models::ChannelEntry;

/// Placeholder replaced by the channel id in the logo template
pub const LOGO_ID_PLACEHOLDER: &str = "{id}";

/// Renders enriched entries into the two output forms
#[derive(Debug, Clone)]
pub struct OutputComposer {
    header: String,
    logo_template: String,
    group_order: Vec<String>,
}

impl OutputComposer {
    pub fn new(logo_template: &str, epg_url: Option<&str>, group_order: Vec<String>) -> Self {
        let header = match epg_url {
            Some(url) if !url.trim().is_empty() => format!("#EXTM3U x-tvg-url=\"{}\"", url.trim()),
            _ => "#EXTM3U".to_string(),
        };

        Self {
            header,
            logo_template: logo_template.to_string(),
            group_order,
        }
    }

    pub fn logo_url(&self, channel_id: &str) -> String {
        self.logo_template.replace(LOGO_ID_PLACEHOLDER, channel_id)
    }

    /// Annotated playlist: header, then an EXTINF + address pair per entry
    pub fn render_annotated(&self, entries: &[ChannelEntry]) -> String {
        let mut out = String::with_capacity(64 + entries.len() * 192);
        out.push_str(&self.header);
        out.push('\n');

        for entry in entries {
            let _ = writeln!(
                out,
                "#EXTINF:-1 tvg-id=\"{id}\" tvg-name=\"{id}\" tvg-logo=\"{logo}\" group-title=\"{group}\",{name}",
                id = entry.channel_id,
                logo = self.logo_url(&entry.channel_id),
                group = entry.group,
                name = entry.display_name,
            );
            out.push_str(&entry.rewritten_address);
            out.push('\n');
        }

        out
    }

    /// Entries bucketed by group: declared order first, then the remaining
    /// groups by first appearance. Empty groups never appear.
    pub fn group_buckets<'a>(&self, entries: &'a [ChannelEntry]) -> Vec<(&'a str, Vec<&'a ChannelEntry>)> {
        let mut buckets: Vec<(&'a str, Vec<&'a ChannelEntry>)> = Vec::new();
        let mut index: HashMap<&'a str, usize> = HashMap::new();

        for entry in entries {
            let slot = *index.entry(entry.group.as_str()).or_insert_with(|| {
                buckets.push((entry.group.as_str(), Vec::new()));
                buckets.len() - 1
            });
            buckets[slot].1.push(entry);
        }

        let rank = |group: &str| {
            self.group_order
                .iter()
                .position(|g| g == group)
                .unwrap_or(self.group_order.len())
        };
        // stable sort keeps first-appearance order among unordered groups
        buckets.sort_by_key(|(group, _)| rank(*group));
        buckets
    }

    /// Grouped plain list: `<group>,#genre#` then `name,address` lines
    pub fn render_grouped(&self, entries: &[ChannelEntry]) -> String {
        let mut out = String::with_capacity(entries.len() * 96);

        for (group, members) in self.group_buckets(entries) {
            let _ = writeln!(out, "{},#genre#", group);
            for entry in members {
                let _ = writeln!(out, "{},{}", entry.display_name, entry.rewritten_address);
            }
            out.push('\n');
        }

        out
    }
}
