//! Types shared between the CoConnect client crates.
//!
//! `types` holds the JSON shapes exchanged with the backend over REST and the
//! realtime socket; `config` loads the TOML client configuration.

pub mod config;
pub mod types;
