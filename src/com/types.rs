// COM 数据结构定义
// COM Data Structure Definitions

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::com::errors::ComError;

/// 资产精度(小数位数) / Asset precision (decimal places)
pub const ASSET_PRECISION: u32 = 4;

/// COM 衍生单位符号 / COM derivative unit symbol
pub const COM_SYMBOL: &str = "COM";

/// 每天秒数 / Seconds per day
pub const SECONDS_PER_DAY: u32 = 86_400;

/// 储蓄桶哨兵时间(永久锁定) / Savings bucket sentinel time (locked indefinitely)
pub const SAVINGS_MATURITY: u32 = u32::MAX;

/// 资产数量上限 2^62 - 1, 任意两个合法数量之和都不会溢出 i64
/// Asset amount bound 2^62 - 1, so the sum of any two valid amounts fits in i64
pub const MAX_ASSET_AMOUNT: i64 = (1 << 62) - 1;

/// 带符号的资产数量, 最小单位计 / Signed asset amount in smallest units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub amount: i64,
    pub symbol: String,
}

impl Asset {
    pub fn new(amount: i64, symbol: impl Into<String>) -> Self {
        Self {
            amount,
            symbol: symbol.into(),
        }
    }

    /// 数量在 ±(2^62 - 1) 之内 / Amount lies within ±(2^62 - 1)
    pub fn is_amount_within_range(&self) -> bool {
        self.amount.unsigned_abs() <= MAX_ASSET_AMOUNT as u64
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10i64.pow(ASSET_PRECISION);
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            abs / scale as u64,
            abs % scale as u64,
            self.symbol,
            width = ASSET_PRECISION as usize
        )
    }
}

impl FromStr for Asset {
    type Err = ComError;

    /// 解析 "100.0000 RIX" 格式 / Parse the "100.0000 RIX" form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ComError::InvalidAsset(s.to_string());
        let mut parts = s.split_whitespace();
        let (number, symbol) = match (parts.next(), parts.next(), parts.next()) {
            (Some(n), Some(sym), None) => (n, sym),
            _ => return Err(invalid()),
        };
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(invalid());
        }

        let (negative, digits) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty()
            || frac.len() > ASSET_PRECISION as usize
            || !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac_padded = format!("{:0<width$}", frac, width = ASSET_PRECISION as usize);
        let frac: i64 = frac_padded.parse().map_err(|_| invalid())?;
        let amount = whole
            .checked_mul(10i64.pow(ASSET_PRECISION))
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(invalid)?;

        let asset = Asset::new(if negative { -amount } else { amount }, symbol);
        if !asset.is_amount_within_range() {
            return Err(ComError::InvalidAsset(format!(
                "magnitude of asset amount must be less than 2^62: {}",
                s
            )));
        }
        Ok(asset)
    }
}

/// 资源类型 / Resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Cpu,
    Net,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Cpu => write!(f, "cpu"),
            ResourceType::Net => write!(f, "net"),
        }
    }
}

impl FromStr for ResourceType {
    type Err = ComError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(ResourceType::Cpu),
            "net" => Ok(ResourceType::Net),
            other => Err(ComError::NotFound(format!("unknown resource kind: {}", other))),
        }
    }
}

/// 账户在交易所内的基础货币基金
/// Per-account base currency fund held inside the exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComFund {
    pub owner: String,
    pub balance: i64,
}

/// COM 全局池(单例)
/// COM global pool (singleton)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComPool {
    /// 已借出的基础货币 / Base currency lent out
    pub total_lent: i64,

    /// 未借出的基础货币 / Base currency not lent
    pub total_unlent: i64,

    /// 租赁定价用的虚拟储备 / Virtual reserve used only for rental pricing
    pub total_rent: i64,

    /// 可借出总量 = total_unlent + total_lent / Total lendable
    pub total_lendable: i64,

    /// COM 总供应量 / Total COM supply
    pub total_com: i64,

    /// 待导入的名字竞拍收入 / Pending name-bid inflow
    pub namebid_proceeds: i64,

    /// 贷款编号计数器(单调递增) / Loan number counter (monotonic)
    pub loan_num: u64,
}

/// 单个到期桶 / Single maturity bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MaturityBucket {
    /// 解锁时间(秒) / Unlock time (seconds)
    pub time: u32,
    /// 锁定的 COM 数量 / Locked COM amount
    pub amount: i64,
}

/// 按解锁时间升序排列的到期桶, 储蓄桶永远在最后
/// Buckets ordered by unlock time, the savings bucket is always last
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Vec<MaturityBucket>)]
pub struct Maturities(pub VecDeque<MaturityBucket>);

/// 账户 COM 余额 / Account COM balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComBalance {
    pub owner: String,

    /// COM 当前的基础货币估值, 供投票系统使用
    /// Current base currency valuation of the COM held, used by voting
    pub vote_stake: i64,

    /// 持有的 COM 数量 / COM units held
    pub com_balance: i64,

    /// 已解锁的 COM / Matured COM
    pub matured_com: i64,

    /// 到期桶 / Maturity buckets
    pub com_maturities: Maturities,
}

impl ComBalance {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            vote_stake: 0,
            com_balance: 0,
            matured_com: 0,
            com_maturities: Maturities::default(),
        }
    }
}

/// 排队中的卖单, 每个账户最多一个
/// Queued sell order, at most one per account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SellOrder {
    /// 全局递增编号, 同一秒内保持提交顺序
    /// Globally increasing id, keeps submission order within the same second
    pub order_id: u64,
    pub owner: String,
    pub com_requested: i64,
    pub proceeds: i64,
    pub stake_change: i64,
    pub order_time: u32,
    pub is_open: bool,
}

impl SellOrder {
    /// 成交后关闭 / Close after fill
    pub fn close(&mut self) {
        self.is_open = false;
    }

    /// 时间排序键, 已成交订单排在最后
    /// Time ordering key, filled orders sort last
    pub fn by_time(&self) -> u64 {
        if self.is_open {
            self.order_time as u64
        } else {
            u64::MAX
        }
    }
}

/// 资源租赁贷款 / Resource rental loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ComLoan {
    pub loan_num: u64,

    /// 付款人/创建者 / Payer and creator
    pub from: String,

    /// 资源受益人 / Beneficiary of the rented capacity
    pub receiver: String,

    /// 每期费用 / Fee per renewal period
    pub payment: i64,

    /// 预付续期余额 / Prepaid renewal reserve
    pub balance: i64,

    /// 当前租出的数量 / Currently rented amount
    pub total_staked: i64,

    /// 到期时间(秒) / Expiration (seconds)
    pub expiration: u32,
}

/// 卖单撮合结果 / Sell order fill outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderOutcome {
    pub success: bool,
    pub proceeds: i64,
    pub stake_change: i64,
}

/// 对外通知事件, 仅供观察, 引擎内部不消费
/// Result events for observers, never consumed internally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComEvent {
    BuyResult { com_received: i64 },
    SellResult { proceeds: i64 },
    OrderResult { owner: String, proceeds: i64 },
    RentResult { rented_tokens: i64 },
}

/// 操作回执 / Action receipt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActionReceipt {
    pub action: String,
    pub events: Vec<ComEvent>,
}
