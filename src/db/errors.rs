// 存储错误定义 / Storage error definitions
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("数据库错误 / Database error: {0}")]
    DatabaseError(#[from] rocksdb::Error),

    #[error("序列化错误 / Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
