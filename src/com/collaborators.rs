// COM 引擎的外部协作者接口及基于存储的默认实现
// External collaborator interfaces of the COM engine and their store-backed defaults
//
// 所有会写入状态的协作者都接收同一个 LedgerTx, 操作失败时随之回滚
// Every collaborator that writes state receives the action's LedgerTx and rolls back with it

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;
use utoipa::ToSchema;

use crate::com::errors::{checked_sum, ensure, ComError, Result};
use crate::db::LedgerTx;

/// 投票资格所需的最少生产者数量 / Minimum producer votes for eligibility
pub const MIN_PRODUCER_VOTES: usize = 21;

// ==================== 时钟 / Clock ====================

/// 当前时间(秒) / Current time in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> u32;
}

/// 系统时钟 / Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u32 {
        chrono::Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32
    }
}

/// 手动推进的时钟, 用于测试和回放
/// Manually driven clock for tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU32,
}

impl ManualClock {
    pub fn new(now: u32) -> Self {
        Self {
            now: AtomicU32::new(now),
        }
    }

    pub fn set(&self, now: u32) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u32) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}

// ==================== 授权 / Authorization ====================

pub trait Authorizer: Send + Sync {
    /// 签名者无权代表 account 时返回 Unauthorized
    /// Fails with Unauthorized unless `signer` may act as `account`
    fn require_auth(&self, signer: &str, account: &str) -> Result<()>;
}

/// 签名者必须就是账户本身 / The signer must be the account itself
#[derive(Debug, Default, Clone, Copy)]
pub struct SignerAuthorizer;

impl Authorizer for SignerAuthorizer {
    fn require_auth(&self, signer: &str, account: &str) -> Result<()> {
        ensure(!signer.is_empty() && signer == account, || {
            ComError::Unauthorized(account.to_string())
        })
    }
}

// ==================== 代币转账 / Token transfers ====================

pub trait TokenLedger: Send + Sync {
    fn balance(&self, tx: &LedgerTx, account: &str) -> Result<i64>;

    fn transfer(
        &self,
        tx: &mut LedgerTx,
        from: &str,
        to: &str,
        amount: i64,
        memo: &str,
    ) -> Result<()>;

    fn issue(&self, tx: &mut LedgerTx, to: &str, amount: i64) -> Result<()>;
}

/// 与引擎共用存储的可用余额账本
/// Spendable balance ledger sharing the engine's store
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreTokenLedger;

impl StoreTokenLedger {
    fn key(account: &str) -> String {
        format!("token_balance:{}", account)
    }
}

impl TokenLedger for StoreTokenLedger {
    fn balance(&self, tx: &LedgerTx, account: &str) -> Result<i64> {
        Ok(tx.get(&Self::key(account))?.unwrap_or(0))
    }

    fn transfer(
        &self,
        tx: &mut LedgerTx,
        from: &str,
        to: &str,
        amount: i64,
        memo: &str,
    ) -> Result<()> {
        ensure(amount > 0, || {
            ComError::NonPositiveAmount("must transfer positive quantity".to_string())
        })?;
        ensure(from != to, || {
            ComError::InvalidState("cannot transfer to self".to_string())
        })?;

        let from_balance = self.balance(tx, from)?;
        ensure(from_balance >= amount, || {
            ComError::InsufficientFunds("overdrawn balance".to_string())
        })?;
        let to_balance = checked_sum(self.balance(tx, to)?, amount, "token balance")?;
        tx.put(&Self::key(from), &(from_balance - amount))?;
        tx.put(&Self::key(to), &to_balance)?;

        debug!("token transfer {} -> {}: {} ({})", from, to, amount, memo);
        Ok(())
    }

    fn issue(&self, tx: &mut LedgerTx, to: &str, amount: i64) -> Result<()> {
        ensure(amount > 0, || {
            ComError::NonPositiveAmount("must issue positive quantity".to_string())
        })?;
        let updated = checked_sum(self.balance(tx, to)?, amount, "token balance")?;
        tx.put(&Self::key(to), &updated)?;
        Ok(())
    }
}

// ==================== 资源限额 / Resource limits ====================

/// 账户累计获得的资源权重 / Cumulative resource weights of an account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResources {
    pub owner: String,
    pub net_weight: i64,
    pub cpu_weight: i64,
}

impl UserResources {
    pub fn is_empty(&self) -> bool {
        self.net_weight == 0 && self.cpu_weight == 0
    }
}

pub trait ResourceLimits: Send + Sync {
    fn get(&self, tx: &LedgerTx, receiver: &str) -> Result<Option<UserResources>>;

    fn update_limits(
        &self,
        tx: &mut LedgerTx,
        payer: &str,
        receiver: &str,
        delta_net: i64,
        delta_cpu: i64,
    ) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StoreResourceLimits;

impl StoreResourceLimits {
    fn key(account: &str) -> String {
        format!("user_resources:{}", account)
    }
}

impl ResourceLimits for StoreResourceLimits {
    fn get(&self, tx: &LedgerTx, receiver: &str) -> Result<Option<UserResources>> {
        Ok(tx.get(&Self::key(receiver))?)
    }

    fn update_limits(
        &self,
        tx: &mut LedgerTx,
        payer: &str,
        receiver: &str,
        delta_net: i64,
        delta_cpu: i64,
    ) -> Result<()> {
        if delta_net == 0 && delta_cpu == 0 {
            return Ok(());
        }

        let mut totals = match self.get(tx, receiver)? {
            Some(totals) => totals,
            None => {
                ensure(delta_net >= 0 && delta_cpu >= 0, || {
                    ComError::InvariantViolation(format!(
                        "negative limit delta for {} without resource record",
                        receiver
                    ))
                })?;
                UserResources {
                    owner: receiver.to_string(),
                    ..UserResources::default()
                }
            }
        };
        totals.net_weight = checked_sum(totals.net_weight, delta_net, "net weight")?;
        totals.cpu_weight = checked_sum(totals.cpu_weight, delta_cpu, "cpu weight")?;
        ensure(totals.net_weight >= 0, || {
            ComError::InsufficientFunds("insufficient staked total net bandwidth".to_string())
        })?;
        ensure(totals.cpu_weight >= 0, || {
            ComError::InsufficientFunds("insufficient staked total cpu bandwidth".to_string())
        })?;

        debug!(
            "resource limits {} (payer {}): net={}, cpu={}",
            receiver, payer, totals.net_weight, totals.cpu_weight
        );
        if totals.is_empty() {
            tx.delete(&Self::key(receiver));
        } else {
            tx.put(&Self::key(receiver), &totals)?;
        }
        Ok(())
    }
}

// ==================== 抵押委托 / Delegated stake ====================

/// from 委托给 to 的抵押权重 / Stake delegated by `from` to `to`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DelegatedBandwidth {
    pub from: String,
    pub to: String,
    pub net_weight: i64,
    pub cpu_weight: i64,
}

impl DelegatedBandwidth {
    pub fn is_empty(&self) -> bool {
        self.net_weight == 0 && self.cpu_weight == 0
    }
}

pub trait DelegatedStake: Send + Sync {
    fn get(&self, tx: &LedgerTx, from: &str, to: &str) -> Result<Option<DelegatedBandwidth>>;

    /// 增加委托, 不存在时创建记录 / Add to a delegation, creating the record when absent
    fn delegate(
        &self,
        tx: &mut LedgerTx,
        from: &str,
        to: &str,
        net: i64,
        cpu: i64,
    ) -> Result<()>;

    /// 撤回部分委托, 清空后删除记录
    /// Withdraw part of a delegation, erasing the record once empty
    fn undelegate(
        &self,
        tx: &mut LedgerTx,
        from: &str,
        to: &str,
        net: i64,
        cpu: i64,
    ) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StoreDelegatedStake;

impl StoreDelegatedStake {
    fn key(from: &str, to: &str) -> String {
        format!("del_bandwidth:{}:{}", from, to)
    }
}

impl DelegatedStake for StoreDelegatedStake {
    fn get(&self, tx: &LedgerTx, from: &str, to: &str) -> Result<Option<DelegatedBandwidth>> {
        Ok(tx.get(&Self::key(from, to))?)
    }

    fn delegate(
        &self,
        tx: &mut LedgerTx,
        from: &str,
        to: &str,
        net: i64,
        cpu: i64,
    ) -> Result<()> {
        let mut dbw = self.get(tx, from, to)?.unwrap_or_else(|| DelegatedBandwidth {
            from: from.to_string(),
            to: to.to_string(),
            ..DelegatedBandwidth::default()
        });
        dbw.net_weight = checked_sum(dbw.net_weight, net, "delegated net")?;
        dbw.cpu_weight = checked_sum(dbw.cpu_weight, cpu, "delegated cpu")?;
        tx.put(&Self::key(from, to), &dbw)?;
        Ok(())
    }

    fn undelegate(
        &self,
        tx: &mut LedgerTx,
        from: &str,
        to: &str,
        net: i64,
        cpu: i64,
    ) -> Result<()> {
        let mut dbw = self.get(tx, from, to)?.ok_or_else(|| {
            ComError::NotFound("delegated bandwidth record does not exist".to_string())
        })?;
        ensure(net <= dbw.net_weight, || {
            ComError::InsufficientFunds("amount exceeds tokens staked for net".to_string())
        })?;
        ensure(cpu <= dbw.cpu_weight, || {
            ComError::InsufficientFunds("amount exceeds tokens staked for cpu".to_string())
        })?;
        dbw.net_weight -= net;
        dbw.cpu_weight -= cpu;

        if dbw.is_empty() {
            tx.delete(&Self::key(from, to));
        } else {
            tx.put(&Self::key(from, to), &dbw)?;
        }
        Ok(())
    }
}

// ==================== 投票权 / Voting power ====================

/// 投票者记录 / Voter record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VoterInfo {
    pub owner: String,
    pub proxy: Option<String>,
    pub producers: Vec<String>,
    pub staked: i64,
}

impl VoterInfo {
    pub fn is_eligible(&self) -> bool {
        self.proxy.is_some() || self.producers.len() >= MIN_PRODUCER_VOTES
    }
}

pub trait VotingPower: Send + Sync {
    fn get(&self, tx: &LedgerTx, account: &str) -> Result<Option<VoterInfo>>;

    /// 投票给代理或至少 21 个生产者 / Voting for a proxy or at least 21 producers
    fn is_eligible(&self, tx: &LedgerTx, account: &str) -> Result<bool> {
        Ok(self.get(tx, account)?.is_some_and(|v| v.is_eligible()))
    }

    /// 记录投票选择, 保留已有权重 / Record vote choices, keeping existing weight
    fn vote(
        &self,
        tx: &mut LedgerTx,
        account: &str,
        proxy: Option<String>,
        producers: Vec<String>,
    ) -> Result<()>;

    /// 投票权重变化, 不存在时创建记录
    /// Vote weight delta, creating the record when absent
    fn update_voting_power(&self, tx: &mut LedgerTx, account: &str, delta: i64) -> Result<()>;

    /// 仅在投票者已存在时调整权重 / Adjust weight only for an existing voter
    fn adjust_staked(&self, tx: &mut LedgerTx, account: &str, delta: i64) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StoreVoters;

impl StoreVoters {
    fn key(account: &str) -> String {
        format!("voter:{}", account)
    }

    fn save(tx: &mut LedgerTx, voter: &VoterInfo) -> Result<()> {
        ensure(voter.staked >= 0, || {
            ComError::InvariantViolation(format!("stake for voting cannot be negative: {}", voter.owner))
        })?;
        tx.put(&Self::key(&voter.owner), voter)?;
        Ok(())
    }
}

impl VotingPower for StoreVoters {
    fn get(&self, tx: &LedgerTx, account: &str) -> Result<Option<VoterInfo>> {
        Ok(tx.get(&Self::key(account))?)
    }

    fn vote(
        &self,
        tx: &mut LedgerTx,
        account: &str,
        proxy: Option<String>,
        mut producers: Vec<String>,
    ) -> Result<()> {
        ensure(proxy.is_none() || producers.is_empty(), || {
            ComError::InvalidState("cannot vote for producers and proxy at same time".to_string())
        })?;
        producers.sort();
        producers.dedup();

        let mut voter = self.get(tx, account)?.unwrap_or_else(|| VoterInfo {
            owner: account.to_string(),
            ..VoterInfo::default()
        });
        voter.proxy = proxy;
        voter.producers = producers;
        Self::save(tx, &voter)
    }

    fn update_voting_power(&self, tx: &mut LedgerTx, account: &str, delta: i64) -> Result<()> {
        let mut voter = self.get(tx, account)?.unwrap_or_else(|| VoterInfo {
            owner: account.to_string(),
            ..VoterInfo::default()
        });
        voter.staked = checked_sum(voter.staked, delta, "voter stake")?;
        Self::save(tx, &voter)
    }

    fn adjust_staked(&self, tx: &mut LedgerTx, account: &str, delta: i64) -> Result<()> {
        if let Some(mut voter) = self.get(tx, account)? {
            voter.staked = checked_sum(voter.staked, delta, "voter stake")?;
            Self::save(tx, &voter)?;
        }
        Ok(())
    }
}
