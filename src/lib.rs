// LogDepot - lib.rs
//
// Library entry point. The binary (`main.rs`) is a thin CLI over these
// modules; integration tests drive them directly.
//
// Layering:
//   util      constants, error types, logging
//   core      pure logic: data model, filters, line parser (no I/O)
//   platform  filesystem, content store, config.toml
//   app       ingestion, archives, registry, queries, identity
//   server    axum HTTP surface

pub mod app;
pub mod core;
pub mod platform;
pub mod server;
pub mod util;
