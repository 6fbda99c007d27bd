// COM 测试模块
// COM Test Module

use crate::com::{Asset, ComEngine, ManualClock, COM_SYMBOL};
use crate::config::ComConfig;
use crate::db::LedgerTx;
use rocksdb::{IteratorMode, Options, DB};
use std::sync::Arc;
use uuid::Uuid;

/// 测试起始时间: 2025-01-01 01:00:00 UTC
/// Test start time: 2025-01-01 01:00:00 UTC
pub const T0: u32 = 1_735_693_200;

/// 创建临时测试数据库
/// Create temporary test database
pub fn create_test_db() -> (Arc<DB>, String) {
    let temp_dir = std::env::temp_dir().join(format!("com_test_{}", Uuid::new_v4()));
    let mut opts = Options::default();
    opts.create_if_missing(true);
    let db = DB::open(&opts, &temp_dir).expect("Failed to open test DB");
    (Arc::new(db), temp_dir.to_string_lossy().to_string())
}

/// 清理临时测试数据库
/// Clean up temporary test database
pub fn cleanup_test_db(path: &str) {
    let _ = std::fs::remove_dir_all(path);
}

/// 测试环境: 引擎 + 手动时钟 + 底层数据库
/// Test environment: engine + manual clock + underlying database
pub struct TestEnv {
    pub engine: ComEngine,
    pub clock: Arc<ManualClock>,
    pub db: Arc<DB>,
    pub path: String,
}

/// 创建测试用引擎 / Create test engine
pub fn create_test_engine() -> TestEnv {
    create_test_engine_with(ComConfig::default())
}

pub fn create_test_engine_with(config: ComConfig) -> TestEnv {
    let (db, path) = create_test_db();
    let clock = Arc::new(ManualClock::new(T0));
    let engine = ComEngine::new(Arc::clone(&db), config).with_clock(clock.clone());
    TestEnv {
        engine,
        clock,
        db,
        path,
    }
}

/// 基础货币(最小单位) / Base currency in smallest units
pub fn rix(amount: i64) -> Asset {
    Asset::new(amount, "RIX")
}

/// COM(最小单位) / COM in smallest units
pub fn com(amount: i64) -> Asset {
    Asset::new(amount, COM_SYMBOL)
}

impl TestEnv {
    /// 投票给 21 个生产者以满足购买资格
    /// Vote for 21 producers to satisfy the purchase requirement
    pub fn make_voter(&self, account: &str) {
        let producers = (0..21).map(|i| format!("producer{}", i)).collect();
        self.engine.vote(account, account, None, producers).unwrap();
    }

    /// 发行代币并存入基金 / Issue tokens and deposit them into the fund
    pub fn fund_account(&self, account: &str, amount: i64) {
        self.engine.issue("arisen", account, &rix(amount)).unwrap();
        self.engine.deposit(account, account, &rix(amount)).unwrap();
    }

    /// 创建有资格且有基金的账户 / Create an eligible, funded account
    pub fn setup_account(&self, account: &str, amount: i64) {
        self.make_voter(account);
        self.fund_account(account, amount);
    }

    /// 直接在存储中执行一次写入 / Apply one write directly to the store
    pub fn with_tx(&self, f: impl FnOnce(&mut LedgerTx<'_>)) {
        let mut tx = LedgerTx::new(&self.db);
        f(&mut tx);
        tx.commit().unwrap();
    }

    /// 数据库全量快照 / Full database snapshot
    pub fn dump(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.db
            .iterator(IteratorMode::Start)
            .map(|item| {
                let (k, v) = item.unwrap();
                (k.to_vec(), v.to_vec())
            })
            .collect()
    }

    pub fn cleanup(self) {
        let TestEnv { engine, db, path, .. } = self;
        drop(engine);
        drop(db);
        cleanup_test_db(&path);
    }
}

mod account_test;
mod order_test;
mod unstake_test;
