// Library 模块导出
// Library Module Exports

pub mod com;
pub mod config;
pub mod db;
pub mod docs;
pub mod router;
pub mod util;

// Re-export commonly used types
// 重导出常用类型
pub use com::{ActionReceipt, Asset, ComEngine, ComError, ResourceType};
