// COM 交易所接口 / COM exchange endpoints
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::com::{
    ActionReceipt, Asset, ComBalance, ComEngine, ComFund, ComLoan, ComPool, DelegatedBandwidth,
    ResourceType, SellOrder, UserResources, VoterInfo,
};
use crate::util::{ok_result, ApiError, ApiResult};

/// 创建 COM 路由 / Create COM routes
pub fn routes() -> Router<Arc<ComEngine>> {
    Router::new()
        // 操作 / Actions
        .route("/api/com/deposit", post(deposit))
        .route("/api/com/withdraw", post(withdraw))
        .route("/api/com/buycom", post(buycom))
        .route("/api/com/unstaketocom", post(unstaketocom))
        .route("/api/com/sellcom", post(sellcom))
        .route("/api/com/cnclcomorder", post(cnclcomorder))
        .route("/api/com/rent/:kind", post(rent))
        .route("/api/com/loan/:kind/fund", post(fund_loan))
        .route("/api/com/loan/:kind/defund", post(defund_loan))
        .route("/api/com/updatecom", post(updatecom))
        .route("/api/com/setcom", post(setcom))
        .route("/api/com/comexec", post(comexec))
        .route("/api/com/consolidate", post(consolidate))
        .route("/api/com/mvtosavings", post(mvtosavings))
        .route("/api/com/mvfrsavings", post(mvfrsavings))
        .route("/api/com/closecom", post(closecom))
        .route("/api/com/channel/fees", post(channel_to_com))
        .route("/api/com/channel/namebid", post(channel_namebid_to_com))
        .route("/api/com/stake/update", post(update_com_stake))
        .route("/api/com/ledger/issue", post(issue))
        .route("/api/com/ledger/vote", post(vote))
        .route("/api/com/ledger/delegatebw", post(delegatebw))
        // 查询 / Queries
        .route("/api/com/pool", get(get_pool))
        .route("/api/com/fund/:owner", get(get_fund))
        .route("/api/com/balance/:owner", get(get_balance))
        .route("/api/com/order/:owner", get(get_order))
        .route("/api/com/orders", get(get_orders))
        .route("/api/com/loan/:kind/:loan_num", get(get_loan))
        .route("/api/com/loans/:kind/:owner", get(get_loans_by_owner))
        .route("/api/com/token/:account", get(get_token_balance))
        .route("/api/com/resources/:account", get(get_resources))
        .route("/api/com/voter/:account", get(get_voter))
        .route("/api/com/delegated/:from/:to", get(get_delegated))
}

/// 在阻塞线程池中执行引擎调用, 引擎持有同步锁并直接读写 RocksDB
/// Run an engine call on the blocking pool, the engine holds a sync lock and does RocksDB I/O
async fn blocking<T, F>(engine: Arc<ComEngine>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ComEngine) -> crate::com::Result<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| ApiError::InternalError(format!("engine task failed: {}", e)))?;
    Ok(result?)
}

fn found<T>(value: Option<T>, what: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::NotFound(format!("{} not found", what)))
}

// ==================== 请求体 / Request bodies ====================

/// 基金存取请求 / Fund deposit or withdraw request
#[serde_as]
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FundRequest {
    /// 签名账户 / Signing account
    #[schema(example = "alice")]
    pub signer: String,
    #[schema(example = "alice")]
    pub owner: String,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "100.0000 RIX")]
    pub amount: Asset,
}

/// 购买 COM 请求 / Buy COM request
#[serde_as]
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BuyComRequest {
    #[schema(example = "alice")]
    pub signer: String,
    #[schema(example = "alice")]
    pub from: String,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "100.0000 RIX")]
    pub amount: Asset,
}

/// 用委托抵押购买 COM 请求 / Buy COM with delegated stake request
#[serde_as]
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnstakeToComRequest {
    #[schema(example = "alice")]
    pub signer: String,
    #[schema(example = "alice")]
    pub owner: String,
    /// 委托接收方 / Delegation receiver
    #[schema(example = "bob")]
    pub receiver: String,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "10.0000 RIX")]
    pub from_net: Asset,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "10.0000 RIX")]
    pub from_cpu: Asset,
}

/// 卖出 COM 请求 / Sell COM request
#[serde_as]
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SellComRequest {
    #[schema(example = "alice")]
    pub signer: String,
    #[schema(example = "alice")]
    pub from: String,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "50.0000 COM")]
    pub com: Asset,
}

/// 只需账户的请求 / Request carrying only the account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OwnerRequest {
    #[schema(example = "alice")]
    pub signer: String,
    #[schema(example = "alice")]
    pub owner: String,
}

/// 储蓄桶移动请求 / Savings move request
#[serde_as]
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SavingsRequest {
    #[schema(example = "alice")]
    pub signer: String,
    #[schema(example = "alice")]
    pub owner: String,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "10.0000 COM")]
    pub com: Asset,
}

/// 租赁请求 / Rental request
#[serde_as]
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RentRequest {
    #[schema(example = "dave")]
    pub signer: String,
    /// 付款人 / Payer
    #[schema(example = "dave")]
    pub from: String,
    /// 资源受益人 / Beneficiary
    #[schema(example = "erin")]
    pub receiver: String,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "1.0000 RIX")]
    pub loan_payment: Asset,
    /// 续期预付 / Renewal reserve
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "3.0000 RIX")]
    pub loan_fund: Asset,
}

/// 贷款余额调整请求 / Loan balance adjustment request
#[serde_as]
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoanFundRequest {
    #[schema(example = "dave")]
    pub signer: String,
    #[schema(example = "dave")]
    pub from: String,
    #[schema(example = 1)]
    pub loan_num: u64,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "0.5000 RIX")]
    pub amount: Asset,
}

/// 设置虚拟租金储备 / Set the virtual rent reserve
#[serde_as]
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetComRequest {
    #[schema(example = "arisen")]
    pub signer: String,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "10.0000 RIX")]
    pub balance: Asset,
}

/// 维护扫描请求 / Maintenance sweep request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComExecRequest {
    #[schema(example = "alice")]
    pub signer: String,
    #[schema(example = "alice")]
    pub user: String,
    /// 每类工作最多处理数量 / Upper bound per work category
    #[schema(example = 2)]
    pub max: u16,
}

/// 手续费导入请求 / Fee inflow request
#[serde_as]
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChannelRequest {
    #[schema(example = "arisen")]
    pub signer: String,
    #[schema(example = "arisen.ramfee")]
    pub from: String,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "1.0000 RIX")]
    pub amount: Asset,
}

/// 名字竞拍收入请求 / Name-bid proceeds request
#[serde_as]
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NameBidRequest {
    #[schema(example = "arisen")]
    pub signer: String,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "5.0000 RIX")]
    pub highest_bid: Asset,
}

/// 投票权重更新请求 / Vote stake refresh request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateStakeRequest {
    #[schema(example = "alice")]
    pub signer: String,
    #[schema(example = "alice")]
    pub voter: String,
}

/// 发行请求 / Issue request
#[serde_as]
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssueRequest {
    #[schema(example = "arisen")]
    pub signer: String,
    #[schema(example = "alice")]
    pub to: String,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "1000.0000 RIX")]
    pub amount: Asset,
}

/// 投票请求 / Vote request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VoteRequest {
    #[schema(example = "alice")]
    pub signer: String,
    #[schema(example = "alice")]
    pub voter: String,
    pub proxy: Option<String>,
    #[serde(default)]
    pub producers: Vec<String>,
}

/// 抵押委托请求 / Delegate stake request
#[serde_as]
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DelegateRequest {
    #[schema(example = "alice")]
    pub signer: String,
    #[schema(example = "alice")]
    pub from: String,
    #[schema(example = "bob")]
    pub receiver: String,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "10.0000 RIX")]
    pub stake_net: Asset,
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String, example = "10.0000 RIX")]
    pub stake_cpu: Asset,
}

/// 卖单队列查询参数 / Sell queue query parameters
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrdersQuery {
    /// 返回数量(默认 100) / Result limit (default 100)
    #[param(example = 100, minimum = 1, maximum = 1000)]
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

/// 卖单列表 / Sell order list
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderList {
    pub orders: Vec<SellOrder>,
}

/// 贷款列表 / Loan list
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoanList {
    pub loans: Vec<ComLoan>,
}

/// 代币余额 / Token balance
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenBalanceResponse {
    #[schema(example = "alice")]
    pub account: String,
    /// 最小单位 / Smallest units
    #[schema(example = 1_000_000)]
    pub balance: i64,
}

// ==================== 操作 / Actions ====================

/// 存入基金 / Deposit into the COM fund
#[utoipa::path(
    post,
    path = "/api/com/deposit",
    tag = "com",
    request_body = FundRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 400, description = "被拒绝 / Rejected", body = crate::docs::ErrorApiResponse),
        (status = 401, description = "未授权 / Unauthorized", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn deposit(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<FundRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.deposit(&req.signer, &req.owner, &req.amount)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 取回基金 / Withdraw from the COM fund
#[utoipa::path(
    post,
    path = "/api/com/withdraw",
    tag = "com",
    request_body = FundRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 400, description = "被拒绝 / Rejected", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn withdraw(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<FundRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.withdraw(&req.signer, &req.owner, &req.amount)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 购买 COM / Buy COM
///
/// 需要先投票给代理或至少 21 个生产者
/// Requires a vote for a proxy or at least 21 producers
#[utoipa::path(
    post,
    path = "/api/com/buycom",
    tag = "com",
    request_body = BuyComRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 400, description = "被拒绝 / Rejected", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn buycom(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<BuyComRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.buycom(&req.signer, &req.from, &req.amount)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 用委托抵押购买 COM / Buy COM with delegated stake
#[utoipa::path(
    post,
    path = "/api/com/unstaketocom",
    tag = "com",
    request_body = UnstakeToComRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 400, description = "被拒绝 / Rejected", body = crate::docs::ErrorApiResponse),
        (status = 404, description = "没有委托 / No delegation", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn unstaketocom(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<UnstakeToComRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.unstaketocom(
            &req.signer,
            &req.owner,
            &req.receiver,
            &req.from_net,
            &req.from_cpu,
        )
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 卖出 COM, 流动性不足时排队 / Sell COM, queued when liquidity is short
#[utoipa::path(
    post,
    path = "/api/com/sellcom",
    tag = "com",
    request_body = SellComRequest,
    responses(
        (status = 200, description = "成交或已排队 / Filled or queued", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 400, description = "被拒绝 / Rejected", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn sellcom(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<SellComRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.sellcom(&req.signer, &req.from, &req.com)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 取消未成交卖单 / Cancel an open sell order
#[utoipa::path(
    post,
    path = "/api/com/cnclcomorder",
    tag = "com",
    request_body = OwnerRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 404, description = "没有卖单 / No order", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn cnclcomorder(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<OwnerRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.cnclcomorder(&req.signer, &req.owner)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 租用 CPU 或 NET / Rent CPU or NET
#[utoipa::path(
    post,
    path = "/api/com/rent/{kind}",
    tag = "com",
    params(("kind" = ResourceType, Path, description = "cpu 或 net / cpu or net")),
    request_body = RentRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 400, description = "被拒绝 / Rejected", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn rent(
    State(engine): State<Arc<ComEngine>>,
    Path(kind): Path<ResourceType>,
    Json(req): Json<RentRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.rent(
            &req.signer,
            kind,
            &req.from,
            &req.receiver,
            &req.loan_payment,
            &req.loan_fund,
        )
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 向贷款充值 / Top up a loan
#[utoipa::path(
    post,
    path = "/api/com/loan/{kind}/fund",
    tag = "com",
    params(("kind" = ResourceType, Path, description = "cpu 或 net / cpu or net")),
    request_body = LoanFundRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 404, description = "贷款不存在 / Loan not found", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn fund_loan(
    State(engine): State<Arc<ComEngine>>,
    Path(kind): Path<ResourceType>,
    Json(req): Json<LoanFundRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.fund_loan(&req.signer, kind, &req.from, req.loan_num, &req.amount)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 从贷款取回 / Withdraw from a loan
#[utoipa::path(
    post,
    path = "/api/com/loan/{kind}/defund",
    tag = "com",
    params(("kind" = ResourceType, Path, description = "cpu 或 net / cpu or net")),
    request_body = LoanFundRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 404, description = "贷款不存在 / Loan not found", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn defund_loan(
    State(engine): State<Arc<ComEngine>>,
    Path(kind): Path<ResourceType>,
    Json(req): Json<LoanFundRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.defund_loan(&req.signer, kind, &req.from, req.loan_num, &req.amount)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 重估投票权重 / Revalue vote stake
#[utoipa::path(
    post,
    path = "/api/com/updatecom",
    tag = "com",
    request_body = OwnerRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 404, description = "没有 COM 余额 / No COM balance", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn updatecom(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<OwnerRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| engine.updatecom(&req.signer, &req.owner)).await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 设置虚拟租金储备(系统账户) / Set the virtual rent reserve (system account)
#[utoipa::path(
    post,
    path = "/api/com/setcom",
    tag = "com",
    request_body = SetComRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 401, description = "未授权 / Unauthorized", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn setcom(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<SetComRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| engine.setcom(&req.signer, &req.balance)).await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 执行维护扫描 / Run the maintenance sweep
#[utoipa::path(
    post,
    path = "/api/com/comexec",
    tag = "com",
    request_body = ComExecRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>)
    )
)]
pub async fn comexec(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<ComExecRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.comexec(&req.signer, &req.user, req.max)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 合并到期桶 / Consolidate maturity buckets
#[utoipa::path(
    post,
    path = "/api/com/consolidate",
    tag = "com",
    request_body = OwnerRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>)
    )
)]
pub async fn consolidate(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<OwnerRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.consolidate(&req.signer, &req.owner)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 移入储蓄 / Move into savings
#[utoipa::path(
    post,
    path = "/api/com/mvtosavings",
    tag = "com",
    request_body = SavingsRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 400, description = "被拒绝 / Rejected", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn mvtosavings(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<SavingsRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.mvtosavings(&req.signer, &req.owner, &req.com)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 移出储蓄 / Move out of savings
#[utoipa::path(
    post,
    path = "/api/com/mvfrsavings",
    tag = "com",
    request_body = SavingsRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 400, description = "被拒绝 / Rejected", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn mvfrsavings(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<SavingsRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.mvfrsavings(&req.signer, &req.owner, &req.com)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 关闭空账户记录 / Close empty account records
#[utoipa::path(
    post,
    path = "/api/com/closecom",
    tag = "com",
    request_body = OwnerRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 400, description = "仍有 COM 余额 / COM balance remains", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn closecom(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<OwnerRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| engine.closecom(&req.signer, &req.owner)).await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 系统手续费导入池子 / Channel system fees into the pool
#[utoipa::path(
    post,
    path = "/api/com/channel/fees",
    tag = "com",
    request_body = ChannelRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 401, description = "未授权 / Unauthorized", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn channel_to_com(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<ChannelRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.channel_to_com(&req.signer, &req.from, &req.amount)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 记录名字竞拍收入 / Accrue name-bid proceeds
#[utoipa::path(
    post,
    path = "/api/com/channel/namebid",
    tag = "com",
    request_body = NameBidRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 401, description = "未授权 / Unauthorized", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn channel_namebid_to_com(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<NameBidRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.channel_namebid_to_com(&req.signer, &req.highest_bid)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 刷新投票者的 COM 权重 / Refresh a voter's COM weight
#[utoipa::path(
    post,
    path = "/api/com/stake/update",
    tag = "com",
    request_body = UpdateStakeRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>)
    )
)]
pub async fn update_com_stake(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<UpdateStakeRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.update_com_stake(&req.signer, &req.voter)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 发行基础货币(系统账户) / Issue base currency (system account)
#[utoipa::path(
    post,
    path = "/api/com/ledger/issue",
    tag = "ledger",
    request_body = IssueRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 401, description = "未授权 / Unauthorized", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn issue(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<IssueRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.issue(&req.signer, &req.to, &req.amount)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 记录投票 / Record a vote
#[utoipa::path(
    post,
    path = "/api/com/ledger/vote",
    tag = "ledger",
    request_body = VoteRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>)
    )
)]
pub async fn vote(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<VoteRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.vote(&req.signer, &req.voter, req.proxy, req.producers)
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

/// 抵押并委托资源 / Stake and delegate resources
#[utoipa::path(
    post,
    path = "/api/com/ledger/delegatebw",
    tag = "ledger",
    request_body = DelegateRequest,
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ActionReceipt>),
        (status = 400, description = "被拒绝 / Rejected", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn delegatebw(
    State(engine): State<Arc<ComEngine>>,
    Json(req): Json<DelegateRequest>,
) -> ApiResult {
    let receipt = blocking(engine, move |engine| {
        engine.delegatebw(
            &req.signer,
            &req.from,
            &req.receiver,
            &req.stake_net,
            &req.stake_cpu,
        )
    })
    .await?;
    Ok(ok_result::<ActionReceipt>(Ok(receipt)))
}

// ==================== 查询 / Queries ====================

/// 查询 COM 池 / Query the COM pool
#[utoipa::path(
    get,
    path = "/api/com/pool",
    tag = "com",
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ComPool>),
        (status = 404, description = "池子未初始化 / Pool not initialized", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn get_pool(State(engine): State<Arc<ComEngine>>) -> ApiResult {
    let pool = blocking(engine, move |engine| engine.get_pool()).await?;
    let pool = found(pool, "COM pool")?;
    Ok(ok_result::<ComPool>(Ok(pool)))
}

/// 查询基金 / Query a fund
#[utoipa::path(
    get,
    path = "/api/com/fund/{owner}",
    tag = "com",
    params(("owner" = String, Path, description = "账户 / Account")),
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ComFund>),
        (status = 404, description = "不存在 / Not found", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn get_fund(
    State(engine): State<Arc<ComEngine>>,
    Path(owner): Path<String>,
) -> ApiResult {
    let fund = blocking(engine, move |engine| engine.get_fund(&owner)).await?;
    let fund = found(fund, "COM fund")?;
    Ok(ok_result::<ComFund>(Ok(fund)))
}

/// 查询 COM 余额 / Query a COM balance
#[utoipa::path(
    get,
    path = "/api/com/balance/{owner}",
    tag = "com",
    params(("owner" = String, Path, description = "账户 / Account")),
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ComBalance>),
        (status = 404, description = "不存在 / Not found", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn get_balance(
    State(engine): State<Arc<ComEngine>>,
    Path(owner): Path<String>,
) -> ApiResult {
    let balance = blocking(engine, move |engine| engine.get_balance(&owner)).await?;
    let balance = found(balance, "COM balance")?;
    Ok(ok_result::<ComBalance>(Ok(balance)))
}

/// 查询账户卖单 / Query an account's sell order
#[utoipa::path(
    get,
    path = "/api/com/order/{owner}",
    tag = "com",
    params(("owner" = String, Path, description = "账户 / Account")),
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<SellOrder>),
        (status = 404, description = "不存在 / Not found", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn get_order(
    State(engine): State<Arc<ComEngine>>,
    Path(owner): Path<String>,
) -> ApiResult {
    let order = blocking(engine, move |engine| engine.get_order(&owner)).await?;
    let order = found(order, "sell order")?;
    Ok(ok_result::<SellOrder>(Ok(order)))
}

/// 按提交时间列出卖单 / List sell orders by submission time
#[utoipa::path(
    get,
    path = "/api/com/orders",
    tag = "com",
    params(OrdersQuery),
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<OrderList>)
    )
)]
pub async fn get_orders(
    State(engine): State<Arc<ComEngine>>,
    Query(params): Query<OrdersQuery>,
) -> ApiResult {
    let limit = params.limit.clamp(1, 1000);
    let orders = blocking(engine, move |engine| engine.get_orders_by_time(limit)).await?;
    Ok(ok_result::<OrderList>(Ok(OrderList { orders })))
}

/// 查询贷款 / Query a loan
#[utoipa::path(
    get,
    path = "/api/com/loan/{kind}/{loan_num}",
    tag = "com",
    params(
        ("kind" = ResourceType, Path, description = "cpu 或 net / cpu or net"),
        ("loan_num" = u64, Path, description = "贷款编号 / Loan number")
    ),
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<ComLoan>),
        (status = 404, description = "不存在 / Not found", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn get_loan(
    State(engine): State<Arc<ComEngine>>,
    Path((kind, loan_num)): Path<(ResourceType, u64)>,
) -> ApiResult {
    let loan = blocking(engine, move |engine| engine.get_loan(kind, loan_num)).await?;
    let loan = found(loan, "loan")?;
    Ok(ok_result::<ComLoan>(Ok(loan)))
}

/// 按创建者列出贷款 / List loans by creator
#[utoipa::path(
    get,
    path = "/api/com/loans/{kind}/{owner}",
    tag = "com",
    params(
        ("kind" = ResourceType, Path, description = "cpu 或 net / cpu or net"),
        ("owner" = String, Path, description = "创建者 / Creator")
    ),
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<LoanList>)
    )
)]
pub async fn get_loans_by_owner(
    State(engine): State<Arc<ComEngine>>,
    Path((kind, owner)): Path<(ResourceType, String)>,
) -> ApiResult {
    let loans = blocking(engine, move |engine| engine.get_loans_by_owner(kind, &owner)).await?;
    Ok(ok_result::<LoanList>(Ok(LoanList { loans })))
}

/// 查询代币余额 / Query a token balance
#[utoipa::path(
    get,
    path = "/api/com/token/{account}",
    tag = "ledger",
    params(("account" = String, Path, description = "账户 / Account")),
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<TokenBalanceResponse>)
    )
)]
pub async fn get_token_balance(
    State(engine): State<Arc<ComEngine>>,
    Path(account): Path<String>,
) -> ApiResult {
    let lookup = account.clone();
    let balance = blocking(engine, move |engine| engine.get_token_balance(&lookup)).await?;
    Ok(ok_result::<TokenBalanceResponse>(Ok(TokenBalanceResponse {
        account,
        balance,
    })))
}

/// 查询租到的资源 / Query rented resources
#[utoipa::path(
    get,
    path = "/api/com/resources/{account}",
    tag = "ledger",
    params(("account" = String, Path, description = "受益人 / Beneficiary")),
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<UserResources>),
        (status = 404, description = "不存在 / Not found", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn get_resources(
    State(engine): State<Arc<ComEngine>>,
    Path(account): Path<String>,
) -> ApiResult {
    let resources = blocking(engine, move |engine| engine.get_resources(&account)).await?;
    let resources = found(resources, "resources")?;
    Ok(ok_result::<UserResources>(Ok(resources)))
}

/// 查询投票者 / Query a voter
#[utoipa::path(
    get,
    path = "/api/com/voter/{account}",
    tag = "ledger",
    params(("account" = String, Path, description = "账户 / Account")),
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<VoterInfo>),
        (status = 404, description = "不存在 / Not found", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn get_voter(
    State(engine): State<Arc<ComEngine>>,
    Path(account): Path<String>,
) -> ApiResult {
    let voter = blocking(engine, move |engine| engine.get_voter(&account)).await?;
    let voter = found(voter, "voter")?;
    Ok(ok_result::<VoterInfo>(Ok(voter)))
}

/// 查询抵押委托 / Query a stake delegation
#[utoipa::path(
    get,
    path = "/api/com/delegated/{from}/{to}",
    tag = "ledger",
    params(
        ("from" = String, Path, description = "委托方 / Delegator"),
        ("to" = String, Path, description = "接收方 / Receiver")
    ),
    responses(
        (status = 200, description = "成功 / Success", body = crate::docs::ApiResponse<DelegatedBandwidth>),
        (status = 404, description = "不存在 / Not found", body = crate::docs::ErrorApiResponse)
    )
)]
pub async fn get_delegated(
    State(engine): State<Arc<ComEngine>>,
    Path((from, to)): Path<(String, String)>,
) -> ApiResult {
    let delegated = blocking(engine, move |engine| engine.get_delegated(&from, &to)).await?;
    let delegated = found(delegated, "delegated bandwidth")?;
    Ok(ok_result::<DelegatedBandwidth>(Ok(delegated)))
}
