//! Malicious-URL vetting against a locally supervised threat-matching
//! server (Safe Browsing v4 wire format).
//!
//! The resolver canonicalizes a URL, asks the threat-matching server for a
//! verdict, and, for clean URLs, follows the redirect chain once to its
//! terminal destination before asking a second (final) time. Terminal URLs
//! are remembered in a persistent bloom filter so repeat runs skip the
//! redirect probes.

pub mod cache;
pub mod canon;
pub mod client;
pub mod config;
pub mod error;
pub mod expander;
pub mod init;
pub mod resolver;
pub mod stats;
pub mod supervisor;
