// COM 池联合曲线计算
// COM pool bonding curve arithmetic

use crate::com::{
    errors::{checked_sum, ensure, ComError, Result},
    types::ComPool,
};
use crate::db::LedgerTx;

/// 初始兑换比例: 1 基础单位 = 10000 COM 单位
/// Initial exchange rate: 1 base unit = 10000 COM units
///
/// 基础货币最大 10^14 个最小单位时, COM 最多 10^18, 仍在资产上限 2^62 之内
/// With at most 10^14 base units the COM supply stays below 10^18, within the 2^62 asset limit
pub const COM_RATIO: i64 = 10_000;

/// 初始虚拟租金储备, 流动性不足时租赁无利可图
/// Initial virtual rent reserve, renting is unprofitable until liquidity is non-trivial
pub const INIT_TOTAL_RENT: i64 = 200_000_000; // 20000.0000

/// 未借出资金至少保留 total_lent 的 2/10 作为赎回缓冲
/// Unlent funds keep 2/10 of total_lent as a redemption buffer
const UNLENT_RESERVE_NUMERATOR: i64 = 2;
const UNLENT_RESERVE_DENOMINATOR: i64 = 10;

/// 先乘后除(128 位中间值, 向下取整)
/// Multiply then divide with a 128-bit intermediate, rounding down
pub fn mul_div(x: i64, y: i64, denominator: i64) -> Result<i64> {
    ensure(denominator > 0, || {
        ComError::InvariantViolation(format!("division by non-positive {}", denominator))
    })?;
    let result = (x as i128) * (y as i128) / (denominator as i128);
    i64::try_from(result).map_err(|_| {
        ComError::InvariantViolation(format!("{} * {} / {} overflows", x, y, denominator))
    })
}

/// Bancor 双储备输出: out = out_reserve * inp / (inp_reserve + inp)
/// Bancor two-reserve output: out = out_reserve * inp / (inp_reserve + inp)
pub fn bancor_output(inp_reserve: i64, out_reserve: i64, inp: i64) -> Result<i64> {
    if inp == 0 {
        return Ok(0);
    }
    let denominator = (inp_reserve as i128) + (inp as i128);
    ensure(denominator > 0, || {
        ComError::InvariantViolation(format!(
            "bancor reserves empty: in_reserve={}, in={}",
            inp_reserve, inp
        ))
    })?;
    let out = (out_reserve as i128) * (inp as i128) / denominator;
    i64::try_from(out.max(0))
        .map_err(|_| ComError::InvariantViolation(format!("bancor output {} overflows", out)))
}

impl ComPool {
    /// 首次购买时创建池子, 返回 (池子, 铸造的 COM)
    /// Create the pool on first purchase, returns (pool, minted COM)
    pub fn seeded(payment: i64) -> Result<(ComPool, i64)> {
        let mut pool = ComPool {
            total_rent: INIT_TOTAL_RENT,
            ..ComPool::default()
        };
        let minted = pool.reseed(payment)?;
        Ok((pool, minted))
    }

    /// 池子是否有 COM 供应 / Whether the pool has COM supply
    pub fn is_available(&self) -> bool {
        self.total_com > 0
    }

    /// 按初始比例重新定价, 保留 total_rent 与 namebid_proceeds
    /// Re-establish the initial rate, keeping total_rent and namebid_proceeds
    fn reseed(&mut self, payment: i64) -> Result<i64> {
        let minted = payment
            .checked_mul(COM_RATIO)
            .ok_or_else(|| ComError::InvariantViolation("com supply overflow".to_string()))?;
        self.total_lendable = payment;
        self.total_lent = 0;
        self.total_unlent = self.total_lendable - self.total_lent;
        self.total_com = minted;
        Ok(minted)
    }

    /// 存入基础货币铸造 COM, 返回铸造数量
    /// Mint COM for a base currency payment, returns minted units
    pub fn mint(&mut self, payment: i64) -> Result<i64> {
        if !self.is_available() {
            // 池子已初始化但被赎回清空, 罕见情况
            // Pool initialized but emptied by full redemption, rare
            return self.reseed(payment);
        }
        ensure(self.total_lendable > 0, || ComError::PoolEmpty)?;

        let s0 = self.total_lendable;
        let s1 = checked_sum(s0, payment, "total_lendable")?;
        let r0 = self.total_com;
        let r1 = mul_div(s1, r0, s0)?;

        self.total_lendable = s1;
        self.total_com = r1;
        self.total_unlent = self.total_lendable - self.total_lent;
        ensure(self.total_unlent >= 0, || {
            ComError::InvariantViolation("total_unlent went negative on mint".to_string())
        })?;

        Ok(r1 - r0)
    }

    /// 以当前价格计算 COM 的基础货币价值
    /// Base currency value of `com` at the current price
    pub fn com_value(&self, com: i64) -> Result<i64> {
        ensure(self.total_com > 0, || ComError::PoolEmpty)?;
        mul_div(com, self.total_lendable, self.total_com)
    }

    /// 可用于赎回的未借出资金(可能为负)
    /// Unlent funds available for redemption (may be negative)
    pub fn available_unlent(&self) -> i64 {
        let reserve = (UNLENT_RESERVE_NUMERATOR as i128 * self.total_lent as i128
            / UNLENT_RESERVE_DENOMINATOR as i128) as i64;
        self.total_unlent - reserve
    }

    /// 赎回 COM; 流动性不足时不修改池子并返回 None
    /// Redeem COM; leaves the pool untouched and returns None when liquidity is short
    pub fn redeem(&mut self, com: i64) -> Result<Option<i64>> {
        let s0 = self.total_lendable;
        let r0 = self.total_com;
        let proceeds = self.com_value(com)?;
        if proceeds > self.available_unlent() {
            return Ok(None);
        }

        self.total_com = r0 - com;
        self.total_lendable = s0 - proceeds;
        self.total_unlent = self.total_lendable - self.total_lent;
        Ok(Some(proceeds))
    }

    /// 以当前价格计算租赁数量 / Rented amount at the current price
    pub fn rent_quote(&self, payment: i64) -> Result<i64> {
        bancor_output(self.total_rent, self.total_unlent, payment)
    }

    /// 新建或续期贷款时更新池子
    /// Update pool when a loan is created or renewed
    pub fn add_loan(&mut self, payment: i64, rented: i64, new_loan: bool) -> Result<()> {
        self.total_rent = checked_sum(self.total_rent, payment, "total_rent")?;
        self.total_unlent -= rented;
        self.total_lent = checked_sum(self.total_lent, rented, "total_lent")?;
        // 费用进入未借出资金, 提高 COM 赎回价值
        // Fee joins unlent funds, raising COM redemption value
        self.total_unlent = checked_sum(self.total_unlent, payment, "total_unlent")?;
        self.total_lendable = checked_sum(self.total_unlent, self.total_lent, "total_lendable")?;
        if new_loan {
            self.loan_num += 1;
        }
        Ok(())
    }

    /// 关闭到期贷款时收回租出数量
    /// Retract the rented amount when an expired loan is processed
    pub fn remove_loan(&mut self, total_staked: i64) -> Result<()> {
        let delta_total_rent = bancor_output(self.total_unlent, self.total_rent, total_staked)?;
        self.total_rent -= delta_total_rent;
        self.total_unlent = checked_sum(self.total_unlent, total_staked, "total_unlent")?;
        self.total_lent -= total_staked;
        self.total_lendable = self.total_unlent + self.total_lent;
        Ok(())
    }

    /// 外部费用直接进入池子 / External fee inflow into the pool
    pub fn channel(&mut self, amount: i64) -> Result<()> {
        self.total_unlent = checked_sum(self.total_unlent, amount, "total_unlent")?;
        self.total_lendable = checked_sum(self.total_lendable, amount, "total_lendable")?;
        Ok(())
    }

    /// 校验池子一致性 / Verify pool consistency
    pub fn check_invariants(&self) -> Result<()> {
        ensure(
            self.total_lendable == self.total_unlent + self.total_lent,
            || {
                ComError::InvariantViolation(format!(
                    "total_lendable {} != total_unlent {} + total_lent {}",
                    self.total_lendable, self.total_unlent, self.total_lent
                ))
            },
        )?;
        ensure(
            self.total_lendable >= 0
                && self.total_unlent >= 0
                && self.total_lent >= 0
                && self.total_rent >= 0
                && self.total_com >= 0,
            || ComError::InvariantViolation(format!("negative pool amount: {:?}", self)),
        )
    }
}

/// COM 池单例存取 / COM pool singleton access
pub struct PoolTable;

impl PoolTable {
    const KEY: &'static str = "com_pool";

    pub fn load(tx: &LedgerTx) -> Result<Option<ComPool>> {
        Ok(tx.get(Self::KEY)?)
    }

    /// 读取已初始化的池子 / Load the initialized pool
    pub fn require(tx: &LedgerTx) -> Result<ComPool> {
        Self::load(tx)?.ok_or(ComError::PoolUninitialized)
    }

    /// 校验后写回 / Verify then write back
    pub fn save(tx: &mut LedgerTx, pool: &ComPool) -> Result<()> {
        pool.check_invariants()?;
        tx.put(Self::KEY, pool)?;
        Ok(())
    }
}
