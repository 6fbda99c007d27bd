pub mod com;
pub mod health;

use axum::Router;
use std::sync::Arc;

use crate::com::ComEngine;

/// 创建所有路由 / Create all routes
pub fn create_router(engine: Arc<ComEngine>) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(com::routes())
        .with_state(engine)
}
