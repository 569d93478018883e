// LogDepot - platform/mod.rs
//
// Platform abstraction layer: data directories, config.toml, the on-disk
// content store, JSON snapshot helpers and the append-only journal.
// Dependencies: standard library, directories, tempfile, serde_json, chrono.
// Must NOT depend on: app, server.

pub mod config;
pub mod fs;
pub mod journal;
pub mod store;
