// COM 引擎错误类型定义
// COM Engine Error Types

use thiserror::Error;

use crate::db::StorageError;

/// COM 引擎错误类型, 任何错误都会使整个操作回滚
/// COM engine error types, any error rolls the whole action back
#[derive(Error, Debug)]
pub enum ComError {
    /// 未授权 / Missing authorization
    #[error("missing authority of {0}")]
    Unauthorized(String),

    /// 币种不匹配 / Symbol mismatch
    #[error("wrong currency: expected {expected}, got {actual}")]
    WrongCurrency { expected: String, actual: String },

    /// 非正数金额 / Non-positive amount
    #[error("{0}")]
    NonPositiveAmount(String),

    /// 余额不足(基金/贷款余额/已到期 COM)
    /// Insufficient funds (fund, loan balance or matured COM)
    #[error("{0}")]
    InsufficientFunds(String),

    /// 未满足投票要求 / Voting requirement not met
    #[error("{0}")]
    NotEligible(String),

    /// COM 池未初始化 / COM pool not initialized
    #[error("com system not initialized yet")]
    PoolUninitialized,

    /// COM 池为空 / COM pool is empty
    #[error("lendable COM pool is empty")]
    PoolEmpty,

    /// 当前不可借贷 / Loans currently unavailable
    #[error("com loans are currently not available")]
    LoansUnavailable,

    /// 租赁价格不划算 / Loan price does not favor renting
    #[error("loan price does not favor renting: payment={payment}, rented={rented}")]
    UnfavorablePrice { payment: i64, rented: i64 },

    /// 记录不存在 / Record not found
    #[error("{0}")]
    NotFound(String),

    /// 状态不允许该操作 / State does not allow this action
    #[error("{0}")]
    InvalidState(String),

    /// 资产格式错误 / Malformed asset
    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    /// 内部一致性校验失败, 正常运行时不应出现
    /// Internal consistency check failed, never expected in correct operation
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// 存储错误 / Storage error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<rocksdb::Error> for ComError {
    fn from(e: rocksdb::Error) -> Self {
        ComError::Storage(StorageError::DatabaseError(e))
    }
}

impl From<serde_json::Error> for ComError {
    fn from(e: serde_json::Error) -> Self {
        ComError::Storage(StorageError::SerializationError(e))
    }
}

/// Result 类型别名 / Result type alias
pub type Result<T> = std::result::Result<T, ComError>;

/// 账本加法, 溢出视为内部一致性错误
/// Ledger addition, overflow is an internal consistency failure
pub(crate) fn checked_sum(a: i64, b: i64, what: &str) -> Result<i64> {
    a.checked_add(b)
        .ok_or_else(|| ComError::InvariantViolation(format!("{} overflow: {} + {}", what, a, b)))
}

/// 条件不满足时返回指定错误 / Return the given error unless the condition holds
pub(crate) fn ensure(condition: bool, err: impl FnOnce() -> ComError) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(err())
    }
}
