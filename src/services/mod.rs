pub mod classifier;
pub mod composer;
pub mod fetcher;
pub mod m3u_parser;
pub mod normalizer;
pub mod pipeline;
pub mod rewriter;
pub mod ruleset;
pub mod writer;
