// 账户维护与外部费用通道测试
// Account Upkeep and External Fee Channel Tests

use super::*;
use crate::com::{
    errors::ComError, Authorizer, ResourceType, COM_RATIO, INIT_TOTAL_RENT, SECONDS_PER_DAY,
};
use crate::config::ComConfig;

/// 托管账户可以代表任何账户签名 / A custodian may sign for any account
struct CustodianAuthorizer;

impl Authorizer for CustodianAuthorizer {
    fn require_auth(&self, signer: &str, account: &str) -> crate::com::Result<()> {
        if signer == "custodian" || signer == account {
            Ok(())
        } else {
            Err(ComError::Unauthorized(account.to_string()))
        }
    }
}

const FULL: i64 = 10_000_000_000;

#[test]
fn test_buy_requires_voting() {
    let env = create_test_engine();
    env.fund_account("alice", 1_000_000);

    let err = env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap_err();
    assert!(matches!(err, ComError::NotEligible(_)));

    // 投票给代理同样满足要求 / Voting for a proxy also qualifies
    env.engine
        .vote("alice", "alice", Some("proxy1".to_string()), vec![])
        .unwrap();
    env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap();

    env.cleanup();
}

#[test]
fn test_updatecom_revalues_stake_after_fees() {
    let env = create_test_engine();
    env.setup_account("alice", 1_000_000);
    env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap();
    assert_eq!(env.engine.get_voter("alice").unwrap().unwrap().staked, 1_000_000);

    env.engine.issue("arisen", "arisen", &rix(1_000_000)).unwrap();
    env.engine
        .channel_to_com("arisen", "arisen", &rix(1_000_000))
        .unwrap();

    env.engine.updatecom("alice", "alice").unwrap();
    assert_eq!(
        env.engine.get_balance("alice").unwrap().unwrap().vote_stake,
        2_000_000
    );
    assert_eq!(env.engine.get_voter("alice").unwrap().unwrap().staked, 2_000_000);

    env.cleanup();
}

#[test]
fn test_update_com_stake() {
    let env = create_test_engine();
    env.setup_account("alice", 1_000_000);
    env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap();
    env.engine.issue("arisen", "arisen", &rix(500_000)).unwrap();
    env.engine
        .channel_to_com("arisen", "arisen", &rix(500_000))
        .unwrap();

    env.engine.update_com_stake("alice", "alice").unwrap();
    assert_eq!(
        env.engine.get_balance("alice").unwrap().unwrap().vote_stake,
        1_500_000
    );
    assert_eq!(env.engine.get_voter("alice").unwrap().unwrap().staked, 1_500_000);

    // 没有 COM 余额时不做任何事 / No-op without a COM balance
    let before = env.dump();
    env.engine.update_com_stake("carol", "carol").unwrap();
    assert_eq!(env.dump(), before);

    env.cleanup();
}

#[test]
fn test_setcom_requires_system_account() {
    let env = create_test_engine();

    let err = env.engine.setcom("arisen", &rix(100)).unwrap_err();
    assert!(matches!(err, ComError::PoolUninitialized));

    env.setup_account("alice", 1_000_000);
    env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap();

    let err = env.engine.setcom("alice", &rix(100)).unwrap_err();
    assert!(matches!(err, ComError::Unauthorized(_)));
    let err = env.engine.setcom("arisen", &rix(0)).unwrap_err();
    assert!(matches!(err, ComError::NonPositiveAmount(_)));

    env.engine.setcom("arisen", &rix(100)).unwrap();
    assert_eq!(env.engine.get_pool().unwrap().unwrap().total_rent, 100);

    env.cleanup();
}

#[test]
fn test_reseed_after_full_redemption() {
    let env = create_test_engine();
    env.setup_account("alice", 1_000_000);
    env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap();
    env.engine.setcom("arisen", &rix(777)).unwrap();

    env.clock.advance(6 * SECONDS_PER_DAY);
    env.engine.sellcom("alice", "alice", &com(FULL)).unwrap();
    let pool = env.engine.get_pool().unwrap().unwrap();
    assert_eq!(pool.total_com, 0);
    assert_eq!(pool.total_lendable, 0);

    env.setup_account("bob", 500_000);
    let receipt = env.engine.buycom("bob", "bob", &rix(500_000)).unwrap();
    assert_eq!(
        receipt.events,
        vec![crate::com::ComEvent::BuyResult {
            com_received: 500_000 * COM_RATIO
        }]
    );
    let pool = env.engine.get_pool().unwrap().unwrap();
    assert_eq!(pool.total_rent, 777);
    assert_eq!(pool.total_lendable, 500_000);

    env.cleanup();
}

#[test]
fn test_closecom() {
    let env = create_test_engine();

    // 无任何记录时也能执行 / Works with no records at all
    env.engine.closecom("alice", "alice").unwrap();

    env.setup_account("alice", 1_000_000);
    env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap();
    let err = env.engine.closecom("alice", "alice").unwrap_err();
    assert!(matches!(err, ComError::InvalidState(_)));

    env.clock.advance(6 * SECONDS_PER_DAY);
    env.engine.sellcom("alice", "alice", &com(FULL)).unwrap();
    env.engine.closecom("alice", "alice").unwrap();
    assert!(env.engine.get_balance("alice").unwrap().is_none());
    assert_eq!(env.engine.get_fund("alice").unwrap().unwrap().balance, 1_000_000);

    env.engine.withdraw("alice", "alice", &rix(1_000_000)).unwrap();
    env.engine.closecom("alice", "alice").unwrap();
    assert!(env.engine.get_fund("alice").unwrap().is_none());

    env.cleanup();
}

#[test]
fn test_closecom_keeps_fund_with_open_loan() {
    let env = create_test_engine();
    env.setup_account("alice", 1_000_000);
    env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap();
    env.engine.setcom("arisen", &rix(100_000)).unwrap();
    env.setup_account("dave", 10_000);
    env.engine
        .rent("dave", ResourceType::Cpu, "dave", "dave", &rix(10_000), &rix(0))
        .unwrap();
    assert_eq!(env.engine.get_fund("dave").unwrap().unwrap().balance, 0);

    env.engine.closecom("dave", "dave").unwrap();
    assert!(env.engine.get_fund("dave").unwrap().is_some());

    env.cleanup();
}

#[test]
fn test_namebid_proceeds_delivered_by_sweep() {
    let env = create_test_engine();

    // 池子未初始化时忽略 / Ignored before the pool exists
    env.engine
        .channel_namebid_to_com("arisen", &rix(10))
        .unwrap();

    env.setup_account("alice", 1_000_000);
    env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap();
    env.engine.issue("arisen", "arisen.names", &rix(50_000)).unwrap();

    env.engine
        .channel_namebid_to_com("arisen", &rix(50_000))
        .unwrap();
    let pool = env.engine.get_pool().unwrap().unwrap();
    assert_eq!(pool.namebid_proceeds, 50_000);
    assert_eq!(pool.total_lendable, 1_000_000);
    // 代币在记账时已转入 / Tokens move at accrual time
    assert_eq!(env.engine.get_token_balance("arisen.names").unwrap(), 0);
    assert_eq!(env.engine.get_token_balance("arisen.com").unwrap(), 1_050_000);

    env.engine.comexec("alice", "alice", 1).unwrap();
    let pool = env.engine.get_pool().unwrap().unwrap();
    assert_eq!(pool.namebid_proceeds, 0);
    assert_eq!(pool.total_lendable, 1_050_000);
    assert_eq!(pool.total_unlent, 1_050_000);
    assert_eq!(env.engine.get_token_balance("arisen.com").unwrap(), 1_050_000);

    env.cleanup();
}

#[test]
fn test_namebid_without_backing_tokens_keeps_sweep_running() {
    let env = create_test_engine();
    env.setup_account("alice", 1_000_000);
    env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap();
    env.engine.issue("arisen", "arisen.names", &rix(20_000)).unwrap();

    let before = env.dump();
    let err = env
        .engine
        .channel_namebid_to_com("arisen", &rix(50_000))
        .unwrap_err();
    assert!(matches!(err, ComError::InsufficientFunds(_)));
    assert_eq!(env.dump(), before);
    assert_eq!(env.engine.get_pool().unwrap().unwrap().namebid_proceeds, 0);

    // 后续的维护扫描不受影响 / Later sweeps are unaffected
    env.engine.comexec("alice", "alice", 2).unwrap();
    env.clock.advance(6 * SECONDS_PER_DAY);
    env.engine.sellcom("alice", "alice", &com(1_000_000)).unwrap();
    env.engine.updatecom("alice", "alice").unwrap();

    env.cleanup();
}

#[test]
fn test_fee_channel_disabled() {
    let env = create_test_engine_with(ComConfig {
        channel_fees_to_com: false,
        ..ComConfig::default()
    });
    env.setup_account("alice", 1_000_000);
    env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap();
    env.engine.issue("arisen", "arisen", &rix(1_000)).unwrap();

    let before = env.dump();
    env.engine
        .channel_to_com("arisen", "arisen", &rix(1_000))
        .unwrap();
    env.engine
        .channel_namebid_to_com("arisen", &rix(1_000))
        .unwrap();
    assert_eq!(env.dump(), before);

    let pool = env.engine.get_pool().unwrap().unwrap();
    assert_eq!(pool.total_rent, INIT_TOTAL_RENT);

    env.cleanup();
}

#[test]
fn test_custom_authorizer() {
    let (db, path) = create_test_db();
    let engine = ComEngine::new(db, ComConfig::default())
        .with_clock(Arc::new(ManualClock::new(T0)))
        .with_authorizer(Arc::new(CustodianAuthorizer));

    engine.issue("custodian", "alice", &rix(1_000)).unwrap();
    engine.deposit("custodian", "alice", &rix(1_000)).unwrap();
    assert_eq!(engine.get_fund("alice").unwrap().unwrap().balance, 1_000);

    let err = engine.withdraw("bob", "alice", &rix(1)).unwrap_err();
    assert!(matches!(err, ComError::Unauthorized(_)));

    drop(engine);
    cleanup_test_db(&path);
}
