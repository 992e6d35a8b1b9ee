//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::feed::ChangeFeed;
use foodbridge_core::ports::DatabaseService;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    /// The per-table change feed every dashboard connection subscribes to.
    /// Handlers publish here after each confirmed mutation, never on failure.
    pub feed: ChangeFeed,
}
