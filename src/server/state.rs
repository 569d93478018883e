// LogDepot - server/state.rs

use crate::app::context::AppContext;
use std::sync::Arc;

/// Router state: a cheap handle to the shared application context.
#[derive(Clone)]
pub struct ApiState {
    pub ctx: Arc<AppContext>,
}

impl ApiState {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }
}
