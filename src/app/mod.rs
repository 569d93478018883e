// LogDepot - app/mod.rs
//
// Application layer: ingestion, archive expansion, the corpus registry,
// query evaluation, identity tokens and the explicit context that ties
// them together.
// Dependencies: core, platform, util.
// Must NOT depend on: server.

pub mod archive;
pub mod auth;
pub mod context;
pub mod ingest;
pub mod query;
pub mod registry;
pub mod users;
