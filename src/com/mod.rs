// COM 模块 - 联合曲线资源交易引擎
// COM Module - bonding-curve resource exchange engine

pub mod balance;
pub mod collaborators;
pub mod engine;
pub mod errors;
pub mod fund;
pub mod loans;
pub mod orders;
pub mod pool;
pub mod types;

// Re-export main types
// 重导出主要类型
pub use balance::maturity_time;
pub use collaborators::{
    Authorizer, Clock, DelegatedBandwidth, DelegatedStake, ManualClock, ResourceLimits,
    SignerAuthorizer, StoreDelegatedStake, StoreResourceLimits, StoreTokenLedger, StoreVoters,
    SystemClock, TokenLedger, UserResources, VoterInfo, VotingPower,
};
pub use engine::ComEngine;
pub use errors::{ComError, Result};
pub use loans::LOAN_TERM;
pub use pool::{COM_RATIO, INIT_TOTAL_RENT};
pub use types::{
    ActionReceipt, Asset, ComBalance, ComEvent, ComFund, ComLoan, ComPool, MaturityBucket,
    Maturities, ResourceType, SellOrder, COM_SYMBOL, MAX_ASSET_AMOUNT, SAVINGS_MATURITY,
    SECONDS_PER_DAY,
};

#[cfg(test)]
mod tests;
