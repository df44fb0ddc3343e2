use crate::services::m3u_parser::has_scheme;

/// Rewrites multicast addresses into the unicast HTTP proxy form
///
/// `rtp://239.1.1.1:1234/` -> `http://<proxy>/udp/239.1.1.1:1234/`. Only the
/// scheme prefix is substituted; the rest of the address is carried verbatim.
#[derive(Debug, Clone)]
pub struct UrlRewriter {
    scheme: String,
    /// Proxy base plus path segment, always ending in '/'
    target_prefix: String,
}

impl UrlRewriter {
    pub fn new(scheme: &str, proxy_base: &str, proxy_path: &str) -> Self {
        let base = proxy_base.trim_end_matches('/');
        let path = proxy_path.trim_matches('/');
        let target_prefix = if path.is_empty() {
            format!("{}/", base)
        } else {
            format!("{}/{}/", base, path)
        };

        Self {
            scheme: scheme.to_string(),
            target_prefix,
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Rewritten form of a single address, `None` when no rewrite applies
    pub fn rewrite(&self, address: &str) -> Option<String> {
        if !has_scheme(address, &self.scheme) {
            return None;
        }
        Some(format!("{}{}", self.target_prefix, &address[self.scheme.len()..]))
    }

    /// Whole-document substitution of every scheme occurrence
    /// Returns the processed text and the number of replacements
    pub fn rewrite_document(&self, content: &str) -> (String, usize) {
        let count = content.matches(self.scheme.as_str()).count();
        let processed = content.replace(self.scheme.as_str(), &self.target_prefix);
        (processed, count)
    }
}
