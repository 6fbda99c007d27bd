// 卖单与 FIFO 维护测试
// Sell Order and FIFO Maintenance Tests

use super::*;
use crate::com::{errors::ComError, ComEvent, ResourceType, SECONDS_PER_DAY, LOAN_TERM};

const FULL: i64 = 10_000_000_000;

/// 每个账户买入 100 RIX 并等待解锁, 然后 dave 租走几乎全部流动性
/// Each account buys 100 RIX and waits for maturity, then dave rents out nearly all liquidity
fn setup_blocked_pool(env: &TestEnv, sellers: &[&str]) {
    for seller in sellers {
        env.setup_account(seller, 1_000_000);
        env.engine.buycom(seller, seller, &rix(1_000_000)).unwrap();
    }
    env.clock.advance(6 * SECONDS_PER_DAY);
    env.engine.setcom("arisen", &rix(1)).unwrap();

    env.setup_account("dave", 100_000);
    env.engine
        .rent("dave", ResourceType::Cpu, "dave", "dave", &rix(100_000), &rix(0))
        .unwrap();
}

#[test]
fn test_sell_fills_immediately() {
    let env = create_test_engine();
    env.setup_account("alice", 1_000_000);
    env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap();
    env.clock.advance(6 * SECONDS_PER_DAY);

    let receipt = env.engine.sellcom("alice", "alice", &com(FULL / 2)).unwrap();
    assert_eq!(receipt.events, vec![ComEvent::SellResult { proceeds: 500_000 }]);

    let balance = env.engine.get_balance("alice").unwrap().unwrap();
    assert_eq!(balance.com_balance, FULL / 2);
    assert_eq!(balance.matured_com, FULL / 2);
    assert_eq!(balance.vote_stake, 500_000);
    assert_eq!(env.engine.get_fund("alice").unwrap().unwrap().balance, 500_000);
    assert_eq!(env.engine.get_voter("alice").unwrap().unwrap().staked, 500_000);
    assert!(env.engine.get_order("alice").unwrap().is_none());

    env.cleanup();
}

#[test]
fn test_sell_requires_matured_com() {
    let env = create_test_engine();
    env.setup_account("alice", 1_000_000);
    env.engine.buycom("alice", "alice", &rix(1_000_000)).unwrap();

    let err = env.engine.sellcom("alice", "alice", &com(1)).unwrap_err();
    assert!(matches!(err, ComError::InsufficientFunds(_)));

    let err = env.engine.sellcom("alice", "alice", &rix(1)).unwrap_err();
    assert!(matches!(err, ComError::WrongCurrency { .. }));

    let err = env.engine.sellcom("bob", "bob", &com(1)).unwrap_err();
    assert!(matches!(err, ComError::NotFound(_)));

    env.cleanup();
}

#[test]
fn test_unfillable_sell_is_queued_and_merged() {
    let env = create_test_engine();
    setup_blocked_pool(&env, &["alice", "bob"]);
    let queued_at = env.engine.now();

    let receipt = env.engine.sellcom("alice", "alice", &com(4_000_000_000)).unwrap();
    assert!(receipt.events.is_empty());

    env.clock.advance(5);
    env.engine.sellcom("alice", "alice", &com(3_000_000_000)).unwrap();

    let order = env.engine.get_order("alice").unwrap().unwrap();
    assert!(order.is_open);
    assert_eq!(order.com_requested, 7_000_000_000);
    assert_eq!(order.order_time, queued_at);

    // 累计排队数量不能超过已解锁余额
    // Cumulative queued amount cannot exceed matured holdings
    let before = env.dump();
    let err = env
        .engine
        .sellcom("alice", "alice", &com(4_000_000_000))
        .unwrap_err();
    assert!(matches!(err, ComError::InsufficientFunds(_)));
    assert_eq!(env.dump(), before);

    // 有未成交卖单时不能新租 / No new rentals while a sell order is unfilled
    env.fund_account("dave", 1_000);
    let err = env
        .engine
        .rent("dave", ResourceType::Net, "dave", "dave", &rix(1_000), &rix(0))
        .unwrap_err();
    assert!(matches!(err, ComError::LoansUnavailable));

    env.cleanup();
}

#[test]
fn test_bootstrap_account_never_queues() {
    let env = create_test_engine();
    setup_blocked_pool(&env, &["alice", "b1"]);

    let err = env.engine.sellcom("b1", "b1", &com(1_000_000_000)).unwrap_err();
    assert!(matches!(err, ComError::InvalidState(_)));
    assert!(env.engine.get_order("b1").unwrap().is_none());

    env.cleanup();
}

#[test]
fn test_fifo_stops_at_first_unfillable_order() {
    let env = create_test_engine();
    setup_blocked_pool(&env, &["alice", "bob", "carol"]);

    env.engine.sellcom("alice", "alice", &com(FULL)).unwrap();
    env.clock.advance(1);
    env.engine.sellcom("bob", "bob", &com(1_000_000_000)).unwrap();
    env.clock.advance(1);
    env.engine.sellcom("carol", "carol", &com(1_000_000_000)).unwrap();

    let owners: Vec<String> = env
        .engine
        .get_orders_by_time(10)
        .unwrap()
        .into_iter()
        .map(|o| o.owner)
        .collect();
    assert_eq!(owners, vec!["alice", "bob", "carol"]);

    // 注入流动性: 足够 bob 成交, 不够 alice
    // Inject liquidity: enough for bob, not for alice
    env.engine.issue("arisen", "arisen", &rix(700_000)).unwrap();
    env.engine
        .channel_to_com("arisen", "arisen", &rix(700_000))
        .unwrap();

    let before = env.dump();
    let receipt = env.engine.comexec("bob", "bob", 10).unwrap();
    assert!(receipt.events.is_empty());
    assert_eq!(env.dump(), before);

    env.engine.cnclcomorder("alice", "alice").unwrap();
    let receipt = env.engine.comexec("bob", "bob", 10).unwrap();
    assert_eq!(
        receipt.events,
        vec![ComEvent::OrderResult {
            owner: "bob".to_string(),
            proceeds: 126_666
        }]
    );

    let bob_order = env.engine.get_order("bob").unwrap().unwrap();
    assert!(!bob_order.is_open);
    assert_eq!(bob_order.proceeds, 126_666);
    assert!(env.engine.get_order("carol").unwrap().unwrap().is_open);

    // 已成交订单排在队尾 / Filled orders sort last
    let owners: Vec<String> = env
        .engine
        .get_orders_by_time(10)
        .unwrap()
        .into_iter()
        .map(|o| o.owner)
        .collect();
    assert_eq!(owners, vec!["carol", "bob"]);

    // bob 下次操作时结算 / bob's next action settles the proceeds
    env.engine.updatecom("bob", "bob").unwrap();
    assert!(env.engine.get_order("bob").unwrap().is_none());
    assert_eq!(env.engine.get_fund("bob").unwrap().unwrap().balance, 126_666);

    env.cleanup();
}

#[test]
fn test_same_second_orders_keep_submission_order() {
    let env = create_test_engine();
    setup_blocked_pool(&env, &["carol", "alice", "bob"]);

    for seller in ["carol", "alice", "bob"] {
        env.engine.sellcom(seller, seller, &com(1_000_000_000)).unwrap();
    }
    let owners: Vec<String> = env
        .engine
        .get_orders_by_time(10)
        .unwrap()
        .into_iter()
        .map(|o| o.owner)
        .collect();
    assert_eq!(owners, vec!["carol", "alice", "bob"]);

    env.cleanup();
}

#[test]
fn test_expired_loan_unblocks_queue() {
    let env = create_test_engine();
    setup_blocked_pool(&env, &["alice"]);
    assert!(env.engine.get_resources("dave").unwrap().is_some());

    env.engine.sellcom("alice", "alice", &com(FULL)).unwrap();
    env.clock.advance(LOAN_TERM);

    let receipt = env.engine.comexec("alice", "alice", 2).unwrap();
    assert_eq!(
        receipt.events,
        vec![ComEvent::OrderResult {
            owner: "alice".to_string(),
            proceeds: 1_100_000
        }]
    );

    // 队首有未成交卖单, 贷款不续期 / Loan not renewed while an order headed the queue
    assert!(env
        .engine
        .get_loans_by_owner(ResourceType::Cpu, "dave")
        .unwrap()
        .is_empty());
    assert!(env.engine.get_resources("dave").unwrap().is_none());

    let err = env.engine.cnclcomorder("alice", "alice").unwrap_err();
    assert!(matches!(err, ComError::InvalidState(_)));

    env.engine
        .withdraw("alice", "alice", &rix(1_100_000))
        .unwrap();
    assert_eq!(env.engine.get_token_balance("alice").unwrap(), 1_100_000);
    assert!(env.engine.get_order("alice").unwrap().is_none());

    env.cleanup();
}

#[test]
fn test_cancel_without_order() {
    let env = create_test_engine();
    let err = env.engine.cnclcomorder("alice", "alice").unwrap_err();
    assert!(matches!(err, ComError::NotFound(_)));
    env.cleanup();
}
