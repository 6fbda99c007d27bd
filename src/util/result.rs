use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::error;

use crate::com::ComError;

/// API 统一响应结果类型 / Unified API result type
pub type ApiResult = Result<Response, ApiError>;

/// 统一响应格式 / Unified response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct CommonResult<T: Serialize> {
    /// 响应状态码 / Status code
    pub code: u32,
    /// 响应消息 / Message
    pub msg: String,
    /// 成功时包含数据, 失败时为 None / Payload on success, None on failure
    pub data: Option<T>,
}

impl<T: Serialize> CommonResult<T> {
    pub fn ok(data: T) -> Self {
        CommonResult {
            code: 200,
            msg: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: u32, msg: String) -> Self {
        CommonResult {
            code,
            msg,
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for CommonResult<T> {
    fn into_response(self) -> Response {
        let status = u16::try_from(self.code)
            .ok()
            .and_then(|c| StatusCode::from_u16(c).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// 处理 Result 类型，自动将 Result<T, ApiError> 转换为响应
/// Turn a Result<T, ApiError> into a response
pub fn ok_result<T: Serialize>(result: Result<T, ApiError>) -> Response {
    match result {
        Ok(data) => CommonResult::ok(data).into_response(),
        Err(err) => err.into_response(),
    }
}

/// API 错误枚举 / API error enum
#[derive(Debug)]
pub enum ApiError {
    /// 请求参数或业务规则不满足 / Bad arguments or a rejected business rule
    BadRequest(String),
    /// 未授权 / Missing authority
    Unauthorized(String),
    /// 资源不存在 / Record not found
    NotFound(String),
    /// 内部错误 / Internal error
    InternalError(String),
}

impl ApiError {
    /// 判断是否为业务错误（不需要打印堆栈）
    /// Business errors are expected and not logged as system failures
    pub fn is_business_error(&self) -> bool {
        !matches!(self, ApiError::InternalError(_))
    }

    fn code(&self) -> u32 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(e) => write!(f, "请求错误: {}", e),
            ApiError::Unauthorized(e) => write!(f, "未授权: {}", e),
            ApiError::NotFound(e) => write!(f, "未找到: {}", e),
            ApiError::InternalError(e) => write!(f, "内部错误: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

/// 引擎错误到 HTTP 错误的映射 / Map engine errors onto HTTP errors
impl From<ComError> for ApiError {
    fn from(e: ComError) -> Self {
        match e {
            ComError::Unauthorized(_) => ApiError::Unauthorized(e.to_string()),
            ComError::NotFound(_) => ApiError::NotFound(e.to_string()),
            ComError::InvariantViolation(_) | ComError::Storage(_) => {
                error!("COM engine failure: {}", e);
                ApiError::InternalError(e.to_string())
            }
            _ => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if !self.is_business_error() {
            error!("系统错误: {:?}", self);
        }
        let code = self.code();
        let msg = match self {
            ApiError::BadRequest(e)
            | ApiError::Unauthorized(e)
            | ApiError::NotFound(e)
            | ApiError::InternalError(e) => e,
        };
        CommonResult::<()>::error(code, msg).into_response()
    }
}
