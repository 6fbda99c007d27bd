use axum::{extract::State, routing::get, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::com::ComEngine;
use crate::util::{ok_result, ApiResult};

/// 健康检查响应数据 / Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(
    title = "HealthResponse",
    example = json!({
        "status": "ok",
        "version": "0.1.0",
        "pool_initialized": true,
        "now": 1735693200
    })
)]
pub struct HealthResponse {
    /// 服务状态 / Service status
    #[schema(example = "ok")]
    pub status: String,

    /// 服务版本 / Service version
    #[schema(example = "0.1.0")]
    pub version: String,

    /// COM 池是否已初始化 / Whether the COM pool exists
    pub pool_initialized: bool,

    /// 引擎时钟(秒) / Engine clock in seconds
    pub now: u32,
}

/// Health check 接口
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    summary = "健康检查 / Health check",
    responses(
        (status = 200, description = "服务正常 / Service healthy",
         body = crate::docs::ApiResponse<HealthResponse>),
        (status = 500, description = "存储不可用 / Storage unavailable",
         body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn health(State(engine): State<Arc<ComEngine>>) -> ApiResult {
    let pool = engine.get_pool()?;
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pool_initialized: pool.is_some(),
        now: engine.now(),
    };
    Ok(ok_result::<HealthResponse>(Ok(response)))
}

pub fn routes() -> Router<Arc<ComEngine>> {
    Router::new().route("/health", get(health))
}
