use anyhow::Result;
use rocksdb::{Options, DB};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;

/// RocksDB 存储服务
pub struct RocksDbStorage {
    pub(crate) db: Arc<DB>,
}

impl RocksDbStorage {
    /// 创建新的 RocksDB 存储实例
    pub fn new(config: &Config) -> Result<Self> {
        let db = Self::open(&config.database.rocksdb_path)?;
        Ok(Self { db })
    }

    /// 按路径打开数据库 / Open database at path
    pub fn open(path: &str) -> Result<Arc<DB>> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        // 1. 内存配置 - 账本数据量小, 写入频繁
        // Memory config - ledger records are small and written often
        opts.set_write_buffer_size(64 * 1024 * 1024); // 64MB single buffer
        opts.set_max_write_buffer_number(4);
        opts.set_min_write_buffer_number_to_merge(1);

        // 2. 渐进式压缩 / Progressive compression
        opts.set_compression_type(rocksdb::DBCompressionType::None);
        opts.set_compression_per_level(&[
            rocksdb::DBCompressionType::None,   // L0: No compression
            rocksdb::DBCompressionType::None,   // L1: No compression
            rocksdb::DBCompressionType::Snappy, // L2: Light compression
            rocksdb::DBCompressionType::Lz4,    // L3: Light compression
            rocksdb::DBCompressionType::Zstd,   // L4: Medium compression
            rocksdb::DBCompressionType::Zstd,   // L5: Medium compression
            rocksdb::DBCompressionType::Zstd,   // L6: Medium compression
        ]);
        opts.set_num_levels(7);

        // 3. 账本必须持久化, 保留 fsync 与检查
        // Ledger must be durable, keep fsync and checks
        opts.set_use_fsync(true);
        opts.set_paranoid_checks(true);

        // 4. 统计 / Statistics
        opts.set_stats_dump_period_sec(0);
        opts.set_stats_persist_period_sec(0);

        opts.set_max_background_jobs(4);
        opts.set_max_open_files(-1);

        let db = DB::open(&opts, path)?;

        info!("🗄️ RocksDB initialized successfully, path: {}", path);

        Ok(Arc::new(db))
    }

    /// 共享数据库句柄 / Shared database handle
    pub fn db(&self) -> Arc<DB> {
        Arc::clone(&self.db)
    }
}
