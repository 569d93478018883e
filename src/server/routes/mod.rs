// LogDepot - server/routes/mod.rs

pub mod auth;
pub mod files;
pub mod health;
pub mod logs;
pub mod upload;
