// COM 余额、到期桶与储蓄桶
// COM balances, maturity buckets and the savings bucket

use crate::com::{
    errors::{ensure, ComError, Result},
    types::{ComBalance, Maturities, MaturityBucket, SAVINGS_MATURITY, SECONDS_PER_DAY},
};
use crate::db::LedgerTx;

/// 当天 UTC 结束后再锁定 4 天, 即从当天零点起第 5 天
/// Locked until 4 days after the end of the current UTC day
pub const MATURITY_BUCKET_DAYS: u32 = 5;

/// 计算本次购买的解锁时间 / Unlock time for purchases made at `now`
pub fn maturity_time(now: u32) -> u32 {
    let start_of_day = now - now % SECONDS_PER_DAY;
    start_of_day.saturating_add(MATURITY_BUCKET_DAYS * SECONDS_PER_DAY)
}

impl Maturities {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaturityBucket> {
        self.0.iter()
    }

    /// 所有桶(含储蓄桶)的总量 / Sum of all buckets including savings
    pub fn total(&self) -> i64 {
        self.0.iter().map(|b| b.amount).sum()
    }

    /// 储蓄桶数量, 不拆下 / Savings amount without detaching it
    pub fn savings(&self) -> i64 {
        match self.0.back() {
            Some(b) if b.time == SAVINGS_MATURITY => b.amount,
            _ => 0,
        }
    }

    /// 时间相同则合并到最后一个桶, 否则追加
    /// Merge into the last bucket when times match, otherwise append
    pub fn push_or_merge(&mut self, time: u32, amount: i64) {
        match self.0.back_mut() {
            Some(last) if last.time == time => last.amount += amount,
            _ => self.0.push_back(MaturityBucket { time, amount }),
        }
    }

    /// 弹出所有已到期的桶, 返回到期总量
    /// Pop every bucket unlocked at `now`, returns the matured total
    pub fn pop_matured(&mut self, now: u32) -> i64 {
        let mut matured = 0;
        while let Some(front) = self.0.front() {
            if front.time > now || front.time == SAVINGS_MATURITY {
                break;
            }
            matured += front.amount;
            self.0.pop_front();
        }
        matured
    }

    /// 临时拆下储蓄桶 / Temporarily detach the savings bucket
    pub fn take_savings(&mut self) -> i64 {
        match self.0.back() {
            Some(b) if b.time == SAVINGS_MATURITY => {
                let amount = b.amount;
                self.0.pop_back();
                amount
            }
            _ => 0,
        }
    }

    /// 把数量放回储蓄桶 / Put an amount back into the savings bucket
    pub fn put_savings(&mut self, amount: i64) {
        if amount == 0 {
            return;
        }
        self.push_or_merge(SAVINGS_MATURITY, amount);
    }

    /// 从最早的普通桶开始扣除, 返回实际扣除量
    /// Consume from the earliest regular buckets, returns the amount moved
    pub fn consume_front(&mut self, amount: i64) -> i64 {
        let mut moved = 0;
        while moved < amount {
            let Some(front) = self.0.front_mut() else {
                break;
            };
            let take = (amount - moved).min(front.amount);
            front.amount -= take;
            moved += take;
            if front.amount == 0 {
                self.0.pop_front();
            }
        }
        moved
    }

    /// 清空所有桶, 返回总量 / Drain every bucket, returns the total
    pub fn drain_all(&mut self) -> i64 {
        self.0.drain(..).map(|b| b.amount).sum()
    }
}

impl ComBalance {
    /// 将到期桶转入已解锁余额 / Move unlocked buckets into matured_com
    pub fn process_maturities(&mut self, now: u32) {
        self.matured_com += self.com_maturities.pop_matured(now);
    }

    /// 新购买的 COM 进入当前到期桶
    /// Newly bought COM joins the current maturity bucket
    pub fn add_to_maturities(&mut self, com: i64, now: u32) {
        let savings = self.com_maturities.take_savings();
        self.process_maturities(now);
        self.com_maturities.push_or_merge(maturity_time(now), com);
        self.com_maturities.put_savings(savings);
    }

    /// 移入储蓄: 先扣普通桶, 再扣已解锁余额
    /// Move into savings: regular buckets first, then matured funds
    pub fn move_to_savings(&mut self, com: i64, com_in_sell_order: i64, now: u32) -> Result<()> {
        let savings = self.com_maturities.take_savings();
        ensure(
            com + com_in_sell_order + savings <= self.com_balance,
            || ComError::InsufficientFunds("insufficient COM balance".to_string()),
        )?;
        self.process_maturities(now);

        let mut moved = self.com_maturities.consume_front(com);
        if moved < com {
            let rest = com - moved;
            self.matured_com -= rest;
            moved += rest;
            ensure(com_in_sell_order <= self.matured_com, || {
                ComError::InvariantViolation("matured COM below queued sell order".to_string())
            })?;
        }
        ensure(moved == com, || {
            ComError::InvariantViolation(format!("moved {} of {} into savings", moved, com))
        })?;

        self.com_maturities.put_savings(savings + com);
        Ok(())
    }

    /// 移出储蓄, 重新锁定到当前到期桶
    /// Move out of savings, re-locked in the current maturity bucket
    pub fn move_from_savings(&mut self, com: i64, now: u32) -> Result<()> {
        let savings = self.com_maturities.take_savings();
        ensure(com <= savings, || {
            ComError::InsufficientFunds("insufficient COM in savings".to_string())
        })?;
        self.process_maturities(now);
        self.com_maturities.push_or_merge(maturity_time(now), com);
        self.com_maturities.put_savings(savings - com);
        Ok(())
    }

    /// 合并所有普通桶为一个当前到期桶, 排队卖单所需数量保持已解锁
    /// Merge all regular buckets into one current bucket, keeping the queued amount matured
    pub fn consolidate(&mut self, com_in_sell_order: i64, now: u32) {
        let savings = self.com_maturities.take_savings();
        let mut total = self.matured_com - com_in_sell_order;
        self.matured_com = com_in_sell_order;
        total += self.com_maturities.drain_all();
        if total > 0 {
            self.com_maturities.push_or_merge(maturity_time(now), total);
        }
        self.com_maturities.put_savings(savings);
    }

    /// 校验: 各桶之和 + 已解锁 == 持有量
    /// Check: bucket sum + matured == holdings
    pub fn check_invariants(&self) -> Result<()> {
        let sum = self.com_maturities.total() + self.matured_com;
        ensure(sum == self.com_balance, || {
            ComError::InvariantViolation(format!(
                "{}: buckets + matured = {} but com_balance = {}",
                self.owner, sum, self.com_balance
            ))
        })?;
        ensure(self.matured_com >= 0 && self.com_balance >= 0, || {
            ComError::InvariantViolation(format!("{}: negative COM balance", self.owner))
        })
    }
}

/// COM 余额表 / COM balance table
pub struct BalanceTable;

impl BalanceTable {
    fn key(owner: &str) -> String {
        format!("com_balance:{}", owner)
    }

    pub fn get(tx: &LedgerTx, owner: &str) -> Result<Option<ComBalance>> {
        Ok(tx.get(&Self::key(owner))?)
    }

    pub fn require(tx: &LedgerTx, owner: &str) -> Result<ComBalance> {
        Self::get(tx, owner)?
            .ok_or_else(|| ComError::NotFound("account has no COM balance".to_string()))
    }

    /// 校验后写回 / Verify then write back
    pub fn save(tx: &mut LedgerTx, balance: &ComBalance) -> Result<()> {
        balance.check_invariants()?;
        tx.put(&Self::key(&balance.owner), balance)?;
        Ok(())
    }

    pub fn remove(tx: &mut LedgerTx, owner: &str) {
        tx.delete(&Self::key(owner));
    }
}
