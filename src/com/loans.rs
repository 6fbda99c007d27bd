// COM 资源租赁贷款 - CPU/NET 两张结构相同的表
// COM resource rental loans - two identical tables for CPU and NET

use std::marker::PhantomData;

use crate::com::{
    errors::{ensure, ComError, Result},
    types::{ComLoan, ComPool, ResourceType, SECONDS_PER_DAY},
};
use crate::db::LedgerTx;

/// 贷款期限: 30 天 / Loan term: 30 days
pub const LOAN_TERM: u32 = 30 * SECONDS_PER_DAY;

/// 资源种类标签 / Resource kind tag
pub trait ResourceKind {
    const KIND: ResourceType;

    /// 把租出数量变化映射为 (net, cpu) 限额变化
    /// Map a stake delta onto (net, cpu) limit deltas
    fn limit_deltas(delta: i64) -> (i64, i64);
}

/// CPU 资源 / CPU resource
pub struct Cpu;

/// NET 资源 / NET resource
pub struct Net;

impl ResourceKind for Cpu {
    const KIND: ResourceType = ResourceType::Cpu;

    fn limit_deltas(delta: i64) -> (i64, i64) {
        (0, delta)
    }
}

impl ResourceKind for Net {
    const KIND: ResourceType = ResourceType::Net;

    fn limit_deltas(delta: i64) -> (i64, i64) {
        (delta, 0)
    }
}

/// 到期贷款处理结果 / Outcome of processing an expired loan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiredLoan {
    /// 续期, 字段已改写 / Renewed with rewritten fields
    Renewed { loan: ComLoan, delta_stake: i64 },
    /// 关闭并退还余额 / Closed with remaining balance refunded
    Closed { refund: i64, delta_stake: i64 },
}

impl ExpiredLoan {
    pub fn delta_stake(&self) -> i64 {
        match self {
            ExpiredLoan::Renewed { delta_stake, .. } | ExpiredLoan::Closed { delta_stake, .. } => {
                *delta_stake
            }
        }
    }
}

/// 新建贷款: 按当前价格计算租出数量并更新池子
/// Create a loan: price the rental at the current curve and update the pool
pub fn create_loan(
    pool: &mut ComPool,
    from: &str,
    receiver: &str,
    payment: i64,
    fund: i64,
    now: u32,
) -> Result<ComLoan> {
    let rented = pool.rent_quote(payment)?;
    ensure(payment < rented, || ComError::UnfavorablePrice { payment, rented })?;
    pool.add_loan(payment, rented, true)?;

    Ok(ComLoan {
        loan_num: pool.loan_num,
        from: from.to_string(),
        receiver: receiver.to_string(),
        payment,
        balance: fund,
        total_staked: rented,
        expiration: now.saturating_add(LOAN_TERM),
    })
}

/// 处理到期贷款: 先收回, 再按重新定价决定是否续期
/// Process an expired loan: retract first, then renew at the repriced rate or close
///
/// `orders_clear` 表示队首没有未成交卖单 / `orders_clear` means no unfilled sell order heads the queue
pub fn process_expired_loan(
    pool: &mut ComPool,
    loan: &ComLoan,
    orders_clear: bool,
) -> Result<ExpiredLoan> {
    pool.remove_loan(loan.total_staked)?;
    let rented = pool.rent_quote(loan.payment)?;

    let renew = loan.payment <= loan.balance
        && loan.payment < rented
        && pool.is_available()
        && orders_clear;

    if renew {
        pool.add_loan(loan.payment, rented, false)?;
        let mut renewed = loan.clone();
        renewed.total_staked = rented;
        renewed.expiration = loan.expiration.saturating_add(LOAN_TERM);
        renewed.balance -= loan.payment;
        Ok(ExpiredLoan::Renewed {
            loan: renewed,
            delta_stake: rented - loan.total_staked,
        })
    } else {
        Ok(ExpiredLoan::Closed {
            refund: loan.balance.max(0),
            delta_stake: -loan.total_staked,
        })
    }
}

/// 贷款表, 主键为贷款编号, 附带 owner 与到期时间索引
/// Loan table keyed by loan number, indexed by owner and by expiration
pub struct LoanTable<K: ResourceKind> {
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> Default for LoanTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ResourceKind> LoanTable<K> {
    pub fn new() -> Self {
        Self { _kind: PhantomData }
    }

    pub fn kind(&self) -> ResourceType {
        K::KIND
    }

    // ==================== 键生成辅助函数 / Key Generation Helpers ====================

    fn loan_key(loan_num: u64) -> String {
        format!("com_loan:{}:{:020}", K::KIND, loan_num)
    }

    fn owner_prefix(owner: &str) -> String {
        format!("com_loan_owner:{}:{}:", K::KIND, owner)
    }

    fn owner_key(loan: &ComLoan) -> String {
        format!("{}{:020}", Self::owner_prefix(&loan.from), loan.loan_num)
    }

    fn expr_prefix() -> String {
        format!("com_loan_expr:{}:", K::KIND)
    }

    fn expr_key(loan: &ComLoan) -> String {
        format!("{}{:010}:{:020}", Self::expr_prefix(), loan.expiration, loan.loan_num)
    }

    // ==================== 查询 / Queries ====================

    pub fn get(&self, tx: &LedgerTx, loan_num: u64) -> Result<Option<ComLoan>> {
        Ok(tx.get(&Self::loan_key(loan_num))?)
    }

    pub fn require(&self, tx: &LedgerTx, loan_num: u64) -> Result<ComLoan> {
        self.get(tx, loan_num)?
            .ok_or_else(|| ComError::NotFound(format!("{} loan {} not found", K::KIND, loan_num)))
    }

    /// 最早到期的贷款 / Loan with the earliest expiration
    pub fn first_expiring(&self, tx: &LedgerTx) -> Result<Option<ComLoan>> {
        let nums: Vec<u64> = tx.scan_values(&Self::expr_prefix(), 1)?;
        match nums.first() {
            Some(&loan_num) => Ok(Some(self.require(tx, loan_num)?)),
            None => Ok(None),
        }
    }

    /// 某账户创建的全部贷款 / Every loan created by `owner`
    pub fn by_owner(&self, tx: &LedgerTx, owner: &str) -> Result<Vec<ComLoan>> {
        let nums: Vec<u64> = tx.scan_values(&Self::owner_prefix(owner), usize::MAX)?;
        nums.into_iter().map(|n| self.require(tx, n)).collect()
    }

    pub fn has_owner(&self, tx: &LedgerTx, owner: &str) -> Result<bool> {
        Ok(!tx.scan_prefix(&Self::owner_prefix(owner), 1)?.is_empty())
    }

    // ==================== 修改 / Mutations ====================

    pub fn insert(&self, tx: &mut LedgerTx, loan: &ComLoan) -> Result<()> {
        ensure(!tx.contains(&Self::loan_key(loan.loan_num))?, || {
            ComError::InvariantViolation(format!("duplicate loan number {}", loan.loan_num))
        })?;
        tx.put(&Self::loan_key(loan.loan_num), loan)?;
        tx.put(&Self::owner_key(loan), &loan.loan_num)?;
        tx.put(&Self::expr_key(loan), &loan.loan_num)?;
        Ok(())
    }

    /// 改写贷款, 到期时间变化时更新索引
    /// Rewrite a loan, reindexing when the expiration moves
    pub fn update(&self, tx: &mut LedgerTx, before: &ComLoan, after: &ComLoan) -> Result<()> {
        ensure(before.loan_num == after.loan_num && before.from == after.from, || {
            ComError::InvariantViolation("loan identity changed on update".to_string())
        })?;
        if before.expiration != after.expiration {
            tx.delete(&Self::expr_key(before));
            tx.put(&Self::expr_key(after), &after.loan_num)?;
        }
        tx.put(&Self::loan_key(after.loan_num), after)?;
        Ok(())
    }

    pub fn remove(&self, tx: &mut LedgerTx, loan: &ComLoan) {
        tx.delete(&Self::expr_key(loan));
        tx.delete(&Self::owner_key(loan));
        tx.delete(&Self::loan_key(loan.loan_num));
    }
}
