// COM 交易所集成测试
// COM Exchange Integration Test
//
// 只通过库的公开接口驱动引擎和 HTTP 路由
// Drives the engine and the HTTP router through the public library API only

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use com_exchange::com::{maturity_time, Asset, ComEngine, ManualClock};
use com_exchange::config::ComConfig;
use com_exchange::router::create_router;
use rocksdb::{Options, DB};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const NOW: u32 = 1_735_693_200;

/// 创建临时测试数据库
fn create_test_db() -> (Arc<DB>, String) {
    let temp_dir = std::env::temp_dir().join(format!("com_it_{}", Uuid::new_v4()));
    let mut opts = Options::default();
    opts.create_if_missing(true);
    let db = DB::open(&opts, &temp_dir).expect("Failed to open test DB");
    (Arc::new(db), temp_dir.to_string_lossy().to_string())
}

/// 清理临时测试数据库
fn cleanup_test_db(path: &str) {
    let _ = std::fs::remove_dir_all(path);
}

fn create_test_engine() -> (Arc<ComEngine>, String) {
    let (db, path) = create_test_db();
    let engine = ComEngine::new(db, ComConfig::default())
        .with_clock(Arc::new(ManualClock::new(NOW)));
    (Arc::new(engine), path)
}

fn producers() -> Vec<String> {
    (0..21).map(|i| format!("producer{}", i)).collect()
}

#[test]
fn test_first_purchase_end_to_end() {
    let (engine, path) = create_test_engine();

    engine.vote("alice", "alice", None, producers()).unwrap();
    engine.issue("arisen", "alice", &Asset::new(100, "RIX")).unwrap();
    engine.deposit("alice", "alice", &Asset::new(100, "RIX")).unwrap();
    engine.buycom("alice", "alice", &Asset::new(100, "RIX")).unwrap();

    let balance = engine.get_balance("alice").unwrap().unwrap();
    assert_eq!(balance.com_balance, 1_000_000);
    assert_eq!(balance.vote_stake, 100);
    assert_eq!(balance.matured_com, 0);
    let buckets: Vec<(u32, i64)> = balance
        .com_maturities
        .iter()
        .map(|b| (b.time, b.amount))
        .collect();
    assert_eq!(buckets, vec![(maturity_time(NOW), 1_000_000)]);
    assert_eq!(maturity_time(NOW), NOW - NOW % 86_400 + 5 * 86_400);

    let pool = engine.get_pool().unwrap().unwrap();
    assert_eq!(pool.total_com, 1_000_000);
    assert_eq!(pool.total_lendable, 100);
    assert_eq!(engine.get_voter("alice").unwrap().unwrap().staked, 100);
    assert_eq!(engine.get_fund("alice").unwrap().unwrap().balance, 0);
    assert_eq!(engine.get_token_balance("arisen.com").unwrap(), 100);

    drop(engine);
    cleanup_test_db(&path);
}

async fn call(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_http_buy_and_query() {
    let (engine, path) = create_test_engine();
    let app = create_router(engine.clone());

    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pool_initialized"], json!(false));

    let (status, _) = call(
        &app,
        "POST",
        "/api/com/ledger/vote",
        Some(json!({"signer": "alice", "voter": "alice", "producers": producers()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    call(
        &app,
        "POST",
        "/api/com/ledger/issue",
        Some(json!({"signer": "arisen", "to": "alice", "amount": "100.0000 RIX"})),
    )
    .await;
    call(
        &app,
        "POST",
        "/api/com/deposit",
        Some(json!({"signer": "alice", "owner": "alice", "amount": "100.0000 RIX"})),
    )
    .await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/com/buycom",
        Some(json!({"signer": "alice", "from": "alice", "amount": "100.0000 RIX"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["action"], json!("buycom"));
    assert_eq!(
        body["data"]["events"][0],
        json!({"type": "buy_result", "com_received": 10_000_000_000_i64})
    );

    let (status, body) = call(&app, "GET", "/api/com/balance/alice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["com_balance"], json!(10_000_000_000_i64));
    assert_eq!(body["data"]["vote_stake"], json!(1_000_000));

    // 签名不符 / Wrong signer
    let (status, body) = call(
        &app,
        "POST",
        "/api/com/setcom",
        Some(json!({"signer": "alice", "balance": "1.0000 RIX"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], json!(401));

    // 错误币种 / Wrong currency
    let (status, _) = call(
        &app,
        "POST",
        "/api/com/sellcom",
        Some(json!({"signer": "alice", "from": "alice", "com": "1.0000 RIX"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "GET", "/api/com/balance/bob", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, "GET", "/api/com/orders", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["orders"], json!([]));

    let (status, body) = call(&app, "GET", "/api/com/token/arisen.com", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["balance"], json!(1_000_000));

    drop(app);
    drop(engine);
    cleanup_test_db(&path);
}

#[tokio::test]
async fn test_http_unstake_to_com() {
    let (engine, path) = create_test_engine();
    let app = create_router(engine.clone());

    call(
        &app,
        "POST",
        "/api/com/ledger/vote",
        Some(json!({"signer": "alice", "voter": "alice", "producers": producers()})),
    )
    .await;
    call(
        &app,
        "POST",
        "/api/com/ledger/issue",
        Some(json!({"signer": "arisen", "to": "alice", "amount": "100.0000 RIX"})),
    )
    .await;
    let (status, _) = call(
        &app,
        "POST",
        "/api/com/ledger/delegatebw",
        Some(json!({
            "signer": "alice",
            "from": "alice",
            "receiver": "bob",
            "stake_net": "30.0000 RIX",
            "stake_cpu": "20.0000 RIX"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        "POST",
        "/api/com/unstaketocom",
        Some(json!({
            "signer": "alice",
            "owner": "alice",
            "receiver": "bob",
            "from_net": "10.0000 RIX",
            "from_cpu": "5.0000 RIX"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["events"][0],
        json!({"type": "buy_result", "com_received": 1_500_000_000_i64})
    );

    let (status, body) = call(&app, "GET", "/api/com/delegated/alice/bob", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["net_weight"], json!(200_000));
    assert_eq!(body["data"]["cpu_weight"], json!(150_000));

    let (status, _) = call(&app, "GET", "/api/com/delegated/alice/carol", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    drop(app);
    drop(engine);
    cleanup_test_db(&path);
}

#[tokio::test]
async fn test_http_rejects_out_of_range_asset() {
    let (engine, path) = create_test_engine();
    let app = create_router(engine.clone());

    // 超过 2^62 - 1 的数量在反序列化时被拒绝
    // Amounts above 2^62 - 1 are rejected while deserializing
    let request = Request::builder()
        .method("POST")
        .uri("/api/com/ledger/issue")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"signer": "arisen", "to": "alice", "amount": "461168601842738.7904 RIX"})
                .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(engine.get_token_balance("alice").unwrap(), 0);

    drop(app);
    drop(engine);
    cleanup_test_db(&path);
}
