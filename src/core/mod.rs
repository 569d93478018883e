// LogDepot - core/mod.rs
//
// Core business logic layer: data model, line classification, filters.
// Must NOT depend on: server, platform, app. Parsing accepts `BufRead`
// implementors and never opens files itself.

pub mod filter;
pub mod model;
pub mod parser;
