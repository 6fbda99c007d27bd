pub mod errors;
pub mod storage;
pub mod tx;

pub use errors::StorageError;
pub use storage::RocksDbStorage;
pub use tx::LedgerTx;
