// COM 卖单队列 - 按提交时间 FIFO
// COM sell order queue - FIFO by submission time

use crate::com::{
    errors::{ComError, Result},
    types::SellOrder,
};
use crate::db::LedgerTx;

/// 卖单队列, 每个账户最多一个订单, 时间索引中已成交订单排在最后
/// Sell order queue, one order per account, filled orders sort last in the time index
pub struct OrderQueue;

impl OrderQueue {
    const COUNTER_KEY: &'static str = "com_order_counter";
    const TIME_PREFIX: &'static str = "com_order_time:";

    // ==================== 键生成辅助函数 / Key Generation Helpers ====================

    fn order_key(owner: &str) -> String {
        format!("com_order:{}", owner)
    }

    fn time_key(order: &SellOrder) -> String {
        format!(
            "{}{:020}:{:020}",
            Self::TIME_PREFIX,
            order.by_time(),
            order.order_id
        )
    }

    // ==================== 查询 / Queries ====================

    pub fn get(tx: &LedgerTx, owner: &str) -> Result<Option<SellOrder>> {
        Ok(tx.get(&Self::order_key(owner))?)
    }

    pub fn require(tx: &LedgerTx, owner: &str) -> Result<SellOrder> {
        Self::get(tx, owner)?
            .ok_or_else(|| ComError::NotFound("no sellcom order is scheduled".to_string()))
    }

    /// 按时间顺序取前 limit 个订单 / First `limit` orders in time order
    pub fn by_time(tx: &LedgerTx, limit: usize) -> Result<Vec<SellOrder>> {
        let owners: Vec<String> = tx.scan_values(Self::TIME_PREFIX, limit)?;
        owners
            .iter()
            .map(|owner| {
                Self::get(tx, owner)?.ok_or_else(|| {
                    ComError::InvariantViolation(format!("dangling order index for {}", owner))
                })
            })
            .collect()
    }

    /// 队首订单 / Head of the queue
    pub fn head(tx: &LedgerTx) -> Result<Option<SellOrder>> {
        Ok(Self::by_time(tx, 1)?.into_iter().next())
    }

    // ==================== 修改 / Mutations ====================

    /// 追加到已有的未成交订单, 不存在时新建
    /// Add to the existing open order, creating one when absent
    pub fn merge_or_create(
        tx: &mut LedgerTx,
        owner: &str,
        com: i64,
        now: u32,
    ) -> Result<SellOrder> {
        let order = match Self::get(tx, owner)? {
            Some(mut existing) => {
                existing.com_requested += com;
                existing
            }
            None => {
                let order_id: u64 = tx.get(Self::COUNTER_KEY)?.unwrap_or(0);
                tx.put(Self::COUNTER_KEY, &(order_id + 1))?;
                SellOrder {
                    order_id,
                    owner: owner.to_string(),
                    com_requested: com,
                    proceeds: 0,
                    stake_change: 0,
                    order_time: now,
                    is_open: true,
                }
            }
        };
        Self::save(tx, &order)?;
        Ok(order)
    }

    /// 写入订单并维护时间索引 / Write the order and keep the time index in sync
    pub fn save(tx: &mut LedgerTx, order: &SellOrder) -> Result<()> {
        if let Some(previous) = Self::get(tx, &order.owner)? {
            let old_key = Self::time_key(&previous);
            if old_key != Self::time_key(order) {
                tx.delete(&old_key);
            }
        }
        tx.put(&Self::order_key(&order.owner), order)?;
        tx.put(&Self::time_key(order), &order.owner)?;
        Ok(())
    }

    pub fn remove(tx: &mut LedgerTx, order: &SellOrder) {
        tx.delete(&Self::time_key(order));
        tx.delete(&Self::order_key(&order.owner));
    }
}
