use std::iter::Enumerate;
use std::str::Lines;

use crate::models::{RawEntry, SkipReason, Skipped};

/// Marker that introduces a channel's metadata line
pub const EXTINF_MARKER: &str = "#EXTINF";

/// Case-insensitive scheme prefix check (`rtp://`, `http://`, ...)
pub fn has_scheme(address: &str, scheme: &str) -> bool {
    address
        .get(..scheme.len())
        .map(|prefix| prefix.eq_ignore_ascii_case(scheme))
        .unwrap_or(false)
}

/// Extract the display name: trailing comma-delimited field of an EXTINF line
/// Format: #EXTINF:-1 tvg-id="..." group-title="...",Display Name
/// Inner whitespace is kept as written.
fn extract_display_name(line: &str) -> Option<String> {
    let last_comma = line.rfind(',')?;
    let name = line[last_comma + 1..].trim();
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

/// Lazy parser over playlist text
///
/// Pairs every `#EXTINF` line with the next non-blank line. Malformed records
/// are reported as `Err(Skipped)` and never stop the iteration.
pub struct EntryParser<'a> {
    lines: Enumerate<Lines<'a>>,
    multicast_scheme: &'a str,
}

impl<'a> EntryParser<'a> {
    pub fn new(text: &'a str, multicast_scheme: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            multicast_scheme,
        }
    }

    fn next_non_blank(&mut self) -> Option<&'a str> {
        self.lines
            .by_ref()
            .map(|(_, line)| line.trim())
            .find(|line| !line.is_empty())
    }

    fn is_supported(&self, address: &str) -> bool {
        has_scheme(address, self.multicast_scheme)
            || has_scheme(address, "http://")
            || has_scheme(address, "https://")
    }
}

impl<'a> Iterator for EntryParser<'a> {
    type Item = Result<RawEntry, Skipped>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, line) = self.lines.next()?;
            let trimmed = line.trim();

            // Header, blank lines and other directives are not part of a pair
            if !trimmed.starts_with(EXTINF_MARKER) {
                continue;
            }

            let line_no = index + 1;
            let display_name = extract_display_name(trimmed);

            // The address line is consumed whatever it holds
            let address = self.next_non_blank();

            let Some(display_name) = display_name else {
                return Some(Err(Skipped {
                    line: line_no,
                    reason: SkipReason::MissingName,
                }));
            };

            let Some(address) = address else {
                return Some(Err(Skipped {
                    line: line_no,
                    reason: SkipReason::MissingAddress,
                }));
            };

            if !self.is_supported(address) {
                return Some(Err(Skipped {
                    line: line_no,
                    reason: SkipReason::UnsupportedScheme,
                }));
            }

            return Some(Ok(RawEntry {
                display_name,
                raw_address: address.to_string(),
                line: line_no,
            }));
        }
    }
}

/// Number of metadata lines in a document
pub fn count_metadata_lines(text: &str) -> usize {
    text.lines()
        .filter(|line| line.trim().starts_with(EXTINF_MARKER))
        .count()
}
