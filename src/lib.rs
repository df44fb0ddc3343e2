//! Rewrites multicast IPTV playlists into proxied, normalized and grouped
//! playlists.

pub mod config;
pub mod models;
pub mod services;
