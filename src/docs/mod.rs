use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{OpenApi, ToSchema};

/// 统一响应格式(Swagger 文档用) / Unified response envelope for Swagger
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(title = "ApiResponse", description = "统一响应格式 / Unified response envelope")]
pub struct ApiResponse<T>
where
    T: ToSchema + Serialize,
{
    /// 200=成功, 400/401/404/500=错误 / 200 on success, 400/401/404/500 on error
    #[schema(example = 200)]
    pub code: u32,

    /// 响应消息 / Message
    #[schema(example = "success")]
    pub msg: String,

    /// 成功时为数据, 失败时为 null / Payload on success, null on error
    pub data: Option<T>,
}

/// 错误响应(Swagger 文档用) / Error response for Swagger
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(title = "ErrorApiResponse", description = "错误响应格式")]
pub struct ErrorApiResponse {
    /// 错误码 / Error code
    pub code: u32,

    /// 错误消息 / Error message
    pub msg: String,

    /// 始终为 null / Always null
    pub data: Option<Value>,
}

/// OpenAPI 文档配置 / OpenAPI document
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::router::health::health,
        // 操作 / Actions
        crate::router::com::deposit,
        crate::router::com::withdraw,
        crate::router::com::buycom,
        crate::router::com::unstaketocom,
        crate::router::com::sellcom,
        crate::router::com::cnclcomorder,
        crate::router::com::rent,
        crate::router::com::fund_loan,
        crate::router::com::defund_loan,
        crate::router::com::updatecom,
        crate::router::com::setcom,
        crate::router::com::comexec,
        crate::router::com::consolidate,
        crate::router::com::mvtosavings,
        crate::router::com::mvfrsavings,
        crate::router::com::closecom,
        crate::router::com::channel_to_com,
        crate::router::com::channel_namebid_to_com,
        crate::router::com::update_com_stake,
        crate::router::com::issue,
        crate::router::com::vote,
        crate::router::com::delegatebw,
        // 查询 / Queries
        crate::router::com::get_pool,
        crate::router::com::get_fund,
        crate::router::com::get_balance,
        crate::router::com::get_order,
        crate::router::com::get_orders,
        crate::router::com::get_loan,
        crate::router::com::get_loans_by_owner,
        crate::router::com::get_token_balance,
        crate::router::com::get_resources,
        crate::router::com::get_voter,
        crate::router::com::get_delegated,
    ),
    components(
        schemas(
            crate::router::health::HealthResponse,
            crate::router::com::FundRequest,
            crate::router::com::BuyComRequest,
            crate::router::com::UnstakeToComRequest,
            crate::router::com::DelegateRequest,
            crate::router::com::SellComRequest,
            crate::router::com::OwnerRequest,
            crate::router::com::SavingsRequest,
            crate::router::com::RentRequest,
            crate::router::com::LoanFundRequest,
            crate::router::com::SetComRequest,
            crate::router::com::ComExecRequest,
            crate::router::com::ChannelRequest,
            crate::router::com::NameBidRequest,
            crate::router::com::UpdateStakeRequest,
            crate::router::com::IssueRequest,
            crate::router::com::VoteRequest,
            crate::router::com::OrderList,
            crate::router::com::LoanList,
            crate::router::com::TokenBalanceResponse,
            crate::com::ActionReceipt,
            crate::com::ComEvent,
            crate::com::ComPool,
            crate::com::ComFund,
            crate::com::ComBalance,
            crate::com::MaturityBucket,
            crate::com::Maturities,
            crate::com::SellOrder,
            crate::com::ComLoan,
            crate::com::ResourceType,
            crate::com::UserResources,
            crate::com::VoterInfo,
            crate::com::DelegatedBandwidth,
            ErrorApiResponse,
        )
    ),
    tags(
        (name = "system", description = "系统相关接口 / System endpoints"),
        (name = "com", description = "COM 交易所接口 / COM exchange endpoints"),
        (name = "ledger", description = "账本夹具接口 / Ledger fixture endpoints"),
    ),
    info(
        title = "COM Exchange API",
        version = "0.1.0",
        description = "联合曲线资源交易所 API 文档 / Bonding-curve resource exchange API"
    )
)]
pub struct ApiDoc;
