// 委托抵押购买 COM 测试
// Buying COM With Delegated Stake Tests

use super::*;
use crate::com::{errors::ComError, ComEvent, COM_RATIO};

/// alice 有投票资格, 并把 300 NET + 200 CPU 委托给 bob
/// alice is eligible and delegates 300 NET + 200 CPU to bob
fn setup_delegation(env: &TestEnv) {
    env.make_voter("alice");
    env.engine.issue("arisen", "alice", &rix(1_000_000)).unwrap();
    env.engine
        .delegatebw("alice", "alice", "bob", &rix(300_000), &rix(200_000))
        .unwrap();
}

#[test]
fn test_delegatebw_stakes_tokens() {
    let env = create_test_engine();
    setup_delegation(&env);

    let dbw = env.engine.get_delegated("alice", "bob").unwrap().unwrap();
    assert_eq!(dbw.net_weight, 300_000);
    assert_eq!(dbw.cpu_weight, 200_000);

    let resources = env.engine.get_resources("bob").unwrap().unwrap();
    assert_eq!(resources.net_weight, 300_000);
    assert_eq!(resources.cpu_weight, 200_000);

    assert_eq!(env.engine.get_token_balance("alice").unwrap(), 500_000);
    assert_eq!(env.engine.get_token_balance("arisen.stake").unwrap(), 500_000);
    assert_eq!(env.engine.get_voter("alice").unwrap().unwrap().staked, 500_000);

    env.cleanup();
}

#[test]
fn test_unstaketocom_buys_with_delegated_stake() {
    let env = create_test_engine();
    setup_delegation(&env);

    let receipt = env
        .engine
        .unstaketocom("alice", "alice", "bob", &rix(100_000), &rix(50_000))
        .unwrap();
    assert_eq!(receipt.action, "unstaketocom");
    assert_eq!(
        receipt.events,
        vec![ComEvent::BuyResult {
            com_received: 150_000 * COM_RATIO
        }]
    );

    // 首次购买按初始比例建池 / First purchase seeds the pool at the initial rate
    let pool = env.engine.get_pool().unwrap().unwrap();
    assert_eq!(pool.total_lendable, 150_000);
    assert_eq!(pool.total_com, 150_000 * COM_RATIO);

    let balance = env.engine.get_balance("alice").unwrap().unwrap();
    assert_eq!(balance.com_balance, 150_000 * COM_RATIO);
    assert_eq!(balance.vote_stake, 150_000);

    let dbw = env.engine.get_delegated("alice", "bob").unwrap().unwrap();
    assert_eq!(dbw.net_weight, 200_000);
    assert_eq!(dbw.cpu_weight, 150_000);
    let resources = env.engine.get_resources("bob").unwrap().unwrap();
    assert_eq!(resources.net_weight, 200_000);
    assert_eq!(resources.cpu_weight, 150_000);

    assert_eq!(env.engine.get_token_balance("arisen.stake").unwrap(), 350_000);
    assert_eq!(env.engine.get_token_balance("arisen.com").unwrap(), 150_000);

    // 抵押权重转为 COM 权重, 总投票权不变
    // Delegated weight turns into COM weight, total voting power is unchanged
    assert_eq!(env.engine.get_voter("alice").unwrap().unwrap().staked, 500_000);

    env.cleanup();
}

#[test]
fn test_unstaketocom_erases_emptied_delegation() {
    let env = create_test_engine();
    setup_delegation(&env);

    env.engine
        .unstaketocom("alice", "alice", "bob", &rix(300_000), &rix(200_000))
        .unwrap();

    assert!(env.engine.get_delegated("alice", "bob").unwrap().is_none());
    assert!(env.engine.get_resources("bob").unwrap().is_none());
    assert_eq!(env.engine.get_token_balance("arisen.stake").unwrap(), 0);

    env.cleanup();
}

#[test]
fn test_unstaketocom_revalues_existing_holdings() {
    let env = create_test_engine();
    env.setup_account("alice", 1_000_000);
    env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap();
    env.engine.issue("arisen", "arisen", &rix(100_000)).unwrap();
    env.engine
        .channel_to_com("arisen", "arisen", &rix(100_000))
        .unwrap();

    env.engine.issue("arisen", "alice", &rix(500_000)).unwrap();
    env.engine
        .delegatebw("alice", "alice", "alice", &rix(500_000), &rix(0))
        .unwrap();
    assert_eq!(env.engine.get_voter("alice").unwrap().unwrap().staked, 1_500_000);

    env.engine
        .unstaketocom("alice", "alice", "alice", &rix(110_000), &rix(0))
        .unwrap();

    // 1_210_000 基础货币对应 1.1e10 COM, 全部属于 alice
    // 1_210_000 base units back 1.1e10 COM, all of it held by alice
    let balance = env.engine.get_balance("alice").unwrap().unwrap();
    assert_eq!(balance.com_balance, 110_000 * 100_000);
    assert_eq!(balance.vote_stake, 1_210_000);

    let dbw = env.engine.get_delegated("alice", "alice").unwrap().unwrap();
    assert_eq!(dbw.net_weight, 390_000);
    let voter = env.engine.get_voter("alice").unwrap().unwrap();
    assert_eq!(voter.staked, dbw.net_weight + balance.vote_stake);

    env.cleanup();
}

#[test]
fn test_unstaketocom_rejections_roll_back() {
    let env = create_test_engine();
    setup_delegation(&env);
    env.engine.issue("arisen", "carol", &rix(10_000)).unwrap();
    env.engine
        .delegatebw("carol", "carol", "bob", &rix(10_000), &rix(0))
        .unwrap();
    let before = env.dump();

    let err = env
        .engine
        .unstaketocom("bob", "alice", "bob", &rix(1), &rix(0))
        .unwrap_err();
    assert!(matches!(err, ComError::Unauthorized(_)));

    let err = env
        .engine
        .unstaketocom("alice", "alice", "bob", &rix(0), &rix(0))
        .unwrap_err();
    assert!(matches!(err, ComError::NonPositiveAmount(_)));

    let err = env
        .engine
        .unstaketocom("alice", "alice", "bob", &rix(-1), &rix(10))
        .unwrap_err();
    assert!(matches!(err, ComError::NonPositiveAmount(_)));

    let err = env
        .engine
        .unstaketocom("alice", "alice", "bob", &com(10), &rix(10))
        .unwrap_err();
    assert!(matches!(err, ComError::WrongCurrency { .. }));

    // carol 没有投票 / carol has not voted
    let err = env
        .engine
        .unstaketocom("carol", "carol", "bob", &rix(10_000), &rix(0))
        .unwrap_err();
    assert!(matches!(err, ComError::NotEligible(_)));

    let err = env
        .engine
        .unstaketocom("alice", "alice", "dave", &rix(10), &rix(0))
        .unwrap_err();
    assert!(matches!(err, ComError::NotFound(_)));

    let err = env
        .engine
        .unstaketocom("alice", "alice", "bob", &rix(300_001), &rix(0))
        .unwrap_err();
    assert!(matches!(err, ComError::InsufficientFunds(_)));

    let err = env
        .engine
        .unstaketocom("alice", "alice", "bob", &rix(0), &rix(200_001))
        .unwrap_err();
    assert!(matches!(err, ComError::InsufficientFunds(_)));

    assert_eq!(env.dump(), before);
    env.cleanup();
}
