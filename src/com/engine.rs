// COM 资源交易引擎 - 公共操作与维护扫描
// COM resource exchange engine - public operations and the maintenance sweep

use rocksdb::DB;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::com::{
    balance::BalanceTable,
    collaborators::{
        Authorizer, Clock, DelegatedBandwidth, DelegatedStake, ResourceLimits, SignerAuthorizer,
        StoreDelegatedStake, StoreResourceLimits, StoreTokenLedger, StoreVoters, SystemClock,
        TokenLedger, UserResources, VoterInfo, VotingPower,
    },
    errors::{checked_sum, ensure, ComError, Result},
    fund::FundTable,
    loans::{create_loan, process_expired_loan, Cpu, ExpiredLoan, LoanTable, Net, ResourceKind},
    orders::OrderQueue,
    pool::PoolTable,
    types::{
        ActionReceipt, Asset, ComBalance, ComEvent, ComFund, ComLoan, ComPool, OrderOutcome,
        ResourceType, SellOrder, COM_SYMBOL,
    },
};
use crate::config::ComConfig;
use crate::db::LedgerTx;

/// 单个操作的执行上下文: 事务覆盖层、固定的当前时间、产生的事件
/// Per-action context: transactional overlay, the frozen current time, emitted events
struct ActionCtx<'a> {
    tx: LedgerTx<'a>,
    now: u32,
    events: Vec<ComEvent>,
}

impl ActionCtx<'_> {
    fn emit(&mut self, event: ComEvent) {
        self.events.push(event);
    }
}

/// COM 引擎
/// COM engine
pub struct ComEngine {
    /// RocksDB 实例 (共享)
    /// RocksDB instance (shared)
    db: Arc<DB>,

    config: ComConfig,

    clock: Arc<dyn Clock>,
    authorizer: Arc<dyn Authorizer>,
    tokens: Arc<dyn TokenLedger>,
    limits: Arc<dyn ResourceLimits>,
    voters: Arc<dyn VotingPower>,
    delegated: Arc<dyn DelegatedStake>,

    cpu_loans: LoanTable<Cpu>,
    net_loans: LoanTable<Net>,

    /// 操作锁 - 所有操作严格串行执行
    /// Operation lock - every action runs strictly sequentially
    operation_lock: Mutex<()>,
}

impl ComEngine {
    /// 使用基于存储的默认协作者创建引擎
    /// Create an engine with store-backed default collaborators
    pub fn new(db: Arc<DB>, config: ComConfig) -> Self {
        Self {
            db,
            config,
            clock: Arc::new(SystemClock),
            authorizer: Arc::new(SignerAuthorizer),
            tokens: Arc::new(StoreTokenLedger),
            limits: Arc::new(StoreResourceLimits),
            voters: Arc::new(StoreVoters),
            delegated: Arc::new(StoreDelegatedStake),
            cpu_loans: LoanTable::new(),
            net_loans: LoanTable::new(),
            operation_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn with_token_ledger(mut self, tokens: Arc<dyn TokenLedger>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_resource_limits(mut self, limits: Arc<dyn ResourceLimits>) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_voting_power(mut self, voters: Arc<dyn VotingPower>) -> Self {
        self.voters = voters;
        self
    }

    pub fn with_delegated_stake(mut self, delegated: Arc<dyn DelegatedStake>) -> Self {
        self.delegated = delegated;
        self
    }

    pub fn config(&self) -> &ComConfig {
        &self.config
    }

    pub fn now(&self) -> u32 {
        self.clock.now()
    }

    // ==================== 执行框架 / Execution ====================

    /// 在操作锁和单个事务中执行, 成功提交, 失败整体回滚
    /// Run under the operation lock in one transaction, committed on success, rolled back on error
    fn execute<F>(&self, action: &str, f: F) -> Result<ActionReceipt>
    where
        F: FnOnce(&mut ActionCtx<'_>) -> Result<()>,
    {
        let _lock = self
            .operation_lock
            .lock()
            .map_err(|_| ComError::InvariantViolation("operation lock poisoned".to_string()))?;

        let mut ctx = ActionCtx {
            tx: LedgerTx::new(&self.db),
            now: self.clock.now(),
            events: Vec::new(),
        };

        match f(&mut ctx) {
            Ok(()) => {
                let ActionCtx { tx, events, .. } = ctx;
                let writes = tx.commit()?;
                for event in &events {
                    info!("📣 {} result: {:?}", action, event);
                }
                info!("✅ {} committed: {} writes", action, writes);
                Ok(ActionReceipt {
                    action: action.to_string(),
                    events,
                })
            }
            Err(e) => {
                warn!("❌ {} rejected: {}", action, e);
                Err(e)
            }
        }
    }

    /// 只读查询 / Read-only query
    fn read<T>(&self, f: impl FnOnce(&LedgerTx<'_>) -> Result<T>) -> Result<T> {
        let tx = LedgerTx::new(&self.db);
        f(&tx)
    }

    // ==================== 参数校验 / Argument checks ====================

    fn core_amount(&self, asset: &Asset) -> Result<i64> {
        ensure(asset.symbol == self.config.core_symbol, || ComError::WrongCurrency {
            expected: self.config.core_symbol.clone(),
            actual: asset.symbol.clone(),
        })?;
        Self::check_range(asset)?;
        Ok(asset.amount)
    }

    fn com_amount(&self, asset: &Asset) -> Result<i64> {
        ensure(asset.symbol == COM_SYMBOL, || ComError::WrongCurrency {
            expected: COM_SYMBOL.to_string(),
            actual: asset.symbol.clone(),
        })?;
        Self::check_range(asset)?;
        ensure(asset.amount > 0, || {
            ComError::NonPositiveAmount("asset must be a positive amount of (COM, 4)".to_string())
        })?;
        Ok(asset.amount)
    }

    fn check_range(asset: &Asset) -> Result<()> {
        ensure(asset.is_amount_within_range(), || {
            ComError::InvalidAsset(format!(
                "magnitude of asset amount must be less than 2^62: {}",
                asset
            ))
        })
    }

    fn check_voting_requirement(&self, ctx: &ActionCtx<'_>, owner: &str) -> Result<()> {
        ensure(self.voters.is_eligible(&ctx.tx, owner)?, || {
            ComError::NotEligible(
                "must vote for at least 21 producers or for a proxy before buying COM".to_string(),
            )
        })
    }

    // ==================== 基金 / Fund ====================

    /// 存入基础货币到 COM 基金 / Deposit base currency into the COM fund
    pub fn deposit(&self, signer: &str, owner: &str, amount: &Asset) -> Result<ActionReceipt> {
        self.execute("deposit", |ctx| {
            self.authorizer.require_auth(signer, owner)?;
            let amount = self.core_amount(amount)?;
            ensure(amount > 0, || {
                ComError::NonPositiveAmount("must deposit a positive amount".to_string())
            })?;
            self.tokens.transfer(
                &mut ctx.tx,
                owner,
                &self.config.com_account,
                amount,
                "deposit to COM fund",
            )?;
            FundTable::credit(&mut ctx.tx, owner, amount)
        })
    }

    /// 从 COM 基金取回 / Withdraw from the COM fund
    pub fn withdraw(&self, signer: &str, owner: &str, amount: &Asset) -> Result<ActionReceipt> {
        self.execute("withdraw", |ctx| {
            self.authorizer.require_auth(signer, owner)?;
            let amount = self.core_amount(amount)?;
            ensure(amount > 0, || {
                ComError::NonPositiveAmount("must withdraw a positive amount".to_string())
            })?;
            self.update_com_account(ctx, owner, 0, 0, false)?;
            FundTable::debit(&mut ctx.tx, owner, amount)?;
            self.tokens.transfer(
                &mut ctx.tx,
                &self.config.com_account,
                owner,
                amount,
                "withdraw from COM fund",
            )
        })
    }

    // ==================== 买卖 COM / Buying and selling COM ====================

    /// 用基金购买 COM / Buy COM with fund balance
    pub fn buycom(&self, signer: &str, from: &str, amount: &Asset) -> Result<ActionReceipt> {
        self.execute("buycom", |ctx| {
            self.authorizer.require_auth(signer, from)?;
            let payment = self.core_amount(amount)?;
            ensure(payment > 0, || {
                ComError::NonPositiveAmount("must use positive amount".to_string())
            })?;
            self.check_voting_requirement(ctx, from)?;
            FundTable::debit(&mut ctx.tx, from, payment)?;

            let com_received = self.add_to_com_pool(ctx, payment)?;
            let delta_stake = self.add_to_com_balance(ctx, from, payment, com_received)?;
            self.runcom(ctx, self.config.maintenance_quota)?;
            self.update_com_account(ctx, from, 0, delta_stake, false)?;

            ctx.emit(ComEvent::BuyResult { com_received });
            Ok(())
        })
    }

    /// 用委托抵押直接购买 COM / Buy COM directly with delegated stake
    pub fn unstaketocom(
        &self,
        signer: &str,
        owner: &str,
        receiver: &str,
        from_net: &Asset,
        from_cpu: &Asset,
    ) -> Result<ActionReceipt> {
        self.execute("unstaketocom", |ctx| {
            self.authorizer.require_auth(signer, owner)?;
            let from_net = self.core_amount(from_net)?;
            let from_cpu = self.core_amount(from_cpu)?;
            let positive = from_net >= 0 && from_cpu >= 0 && (from_net > 0 || from_cpu > 0);
            ensure(positive, || {
                ComError::NonPositiveAmount("must unstake a positive amount to buy com".to_string())
            })?;
            self.check_voting_requirement(ctx, owner)?;

            self.delegated
                .undelegate(&mut ctx.tx, owner, receiver, from_net, from_cpu)?;
            self.limits
                .update_limits(&mut ctx.tx, owner, receiver, -from_net, -from_cpu)?;

            let payment = checked_sum(from_net, from_cpu, "unstake amount")?;
            self.tokens.transfer(
                &mut ctx.tx,
                &self.config.stake_account,
                &self.config.com_account,
                payment,
                "buy COM with staked tokens",
            )?;
            let com_received = self.add_to_com_pool(ctx, payment)?;
            let delta_stake = self.add_to_com_balance(ctx, owner, payment, com_received)?;
            self.runcom(ctx, self.config.maintenance_quota)?;

            // 抵押权重转为 COM 权重, 只有估值差计入投票权
            // Delegated weight becomes COM weight, only the valuation gap moves voting power
            self.update_com_account(ctx, owner, 0, delta_stake - payment, true)?;

            ctx.emit(ComEvent::BuyResult { com_received });
            Ok(())
        })
    }

    /// 卖出 COM, 流动性不足时排队
    /// Sell COM, queued when liquidity is short
    pub fn sellcom(&self, signer: &str, from: &str, com: &Asset) -> Result<ActionReceipt> {
        self.execute("sellcom", |ctx| {
            self.authorizer.require_auth(signer, from)?;
            self.runcom(ctx, self.config.maintenance_quota)?;

            let mut balance = BalanceTable::get(&ctx.tx, from)?
                .ok_or_else(|| ComError::NotFound("user must first buycom".to_string()))?;
            let com = self.com_amount(com)?;
            balance.process_maturities(ctx.now);
            ensure(com <= balance.matured_com, || {
                ComError::InsufficientFunds("insufficient available com".to_string())
            })?;

            let current = self.fill_com_order(ctx, &mut balance, com)?;
            ensure(!current.success || current.proceeds > 0, || {
                ComError::InvalidState("proceeds are negligible".to_string())
            })?;
            BalanceTable::save(&mut ctx.tx, &balance)?;

            let mut pending_sell_order =
                self.update_com_account(ctx, from, current.proceeds, current.stake_change, false)?;
            if !current.success {
                ensure(from != self.config.bootstrap_account, || {
                    ComError::InvalidState(format!(
                        "{} sellcom orders should not be queued",
                        self.config.bootstrap_account
                    ))
                })?;
                let order = OrderQueue::merge_or_create(&mut ctx.tx, from, com, ctx.now)?;
                debug!("sellcom queued for {}: {} COM requested", from, order.com_requested);
                pending_sell_order = order.com_requested;
            }
            ensure(pending_sell_order <= balance.matured_com, || {
                ComError::InsufficientFunds(
                    "insufficient funds for current and scheduled orders".to_string(),
                )
            })?;

            if current.success {
                ctx.emit(ComEvent::SellResult {
                    proceeds: current.proceeds,
                });
            }
            Ok(())
        })
    }

    /// 取消未成交卖单 / Cancel an unfilled sell order
    pub fn cnclcomorder(&self, signer: &str, owner: &str) -> Result<ActionReceipt> {
        self.execute("cnclcomorder", |ctx| {
            self.authorizer.require_auth(signer, owner)?;
            let order = OrderQueue::require(&ctx.tx, owner)?;
            ensure(order.is_open, || {
                ComError::InvalidState(
                    "sellcom order has been filled and cannot be canceled".to_string(),
                )
            })?;
            OrderQueue::remove(&mut ctx.tx, &order);
            Ok(())
        })
    }

    // ==================== 资源租赁 / Resource rental ====================

    /// 租用 CPU 或 NET / Rent CPU or NET
    pub fn rent(
        &self,
        signer: &str,
        kind: ResourceType,
        from: &str,
        receiver: &str,
        payment: &Asset,
        fund: &Asset,
    ) -> Result<ActionReceipt> {
        let action = format!("rent{}", kind);
        self.execute(&action, |ctx| {
            self.authorizer.require_auth(signer, from)?;
            match kind {
                ResourceType::Cpu => {
                    self.rent_loan(ctx, &self.cpu_loans, from, receiver, payment, fund)
                }
                ResourceType::Net => {
                    self.rent_loan(ctx, &self.net_loans, from, receiver, payment, fund)
                }
            }
        })
    }

    fn rent_loan<K: ResourceKind>(
        &self,
        ctx: &mut ActionCtx<'_>,
        table: &LoanTable<K>,
        from: &str,
        receiver: &str,
        payment: &Asset,
        fund: &Asset,
    ) -> Result<()> {
        self.runcom(ctx, self.config.maintenance_quota)?;

        ensure(self.loans_available(ctx)?, || ComError::LoansUnavailable)?;
        let payment = self.core_amount(payment)?;
        let fund = self.core_amount(fund)?;
        ensure(payment > 0 && fund >= 0, || {
            ComError::NonPositiveAmount("must use positive asset amount".to_string())
        })?;
        self.check_voting_requirement(ctx, from)?;

        let total = payment
            .checked_add(fund)
            .ok_or_else(|| ComError::InvariantViolation("rent amount overflow".to_string()))?;
        FundTable::debit(&mut ctx.tx, from, total)?;

        let mut pool = PoolTable::require(&ctx.tx)?;
        let loan = create_loan(&mut pool, from, receiver, payment, fund, ctx.now)?;
        PoolTable::save(&mut ctx.tx, &pool)?;
        table.insert(&mut ctx.tx, &loan)?;
        debug!(
            "{} loan {} created: {} -> {}, rented {}",
            table.kind(),
            loan.loan_num,
            from,
            receiver,
            loan.total_staked
        );

        let (delta_net, delta_cpu) = K::limit_deltas(loan.total_staked);
        self.limits
            .update_limits(&mut ctx.tx, from, receiver, delta_net, delta_cpu)?;

        ctx.emit(ComEvent::RentResult {
            rented_tokens: loan.total_staked,
        });
        Ok(())
    }

    /// 向贷款预付余额充值 / Top up a loan's prepaid balance
    pub fn fund_loan(
        &self,
        signer: &str,
        kind: ResourceType,
        from: &str,
        loan_num: u64,
        payment: &Asset,
    ) -> Result<ActionReceipt> {
        let action = format!("fund{}loan", kind);
        self.execute(&action, |ctx| {
            self.authorizer.require_auth(signer, from)?;
            let payment = self.core_amount(payment)?;
            match kind {
                ResourceType::Cpu => self.fund_loan_in(ctx, &self.cpu_loans, from, loan_num, payment),
                ResourceType::Net => self.fund_loan_in(ctx, &self.net_loans, from, loan_num, payment),
            }
        })
    }

    fn fund_loan_in<K: ResourceKind>(
        &self,
        ctx: &mut ActionCtx<'_>,
        table: &LoanTable<K>,
        from: &str,
        loan_num: u64,
        payment: i64,
    ) -> Result<()> {
        FundTable::debit(&mut ctx.tx, from, payment)?;
        let loan = self.require_live_loan(ctx, table, from, loan_num)?;
        let mut updated = loan.clone();
        updated.balance = checked_sum(updated.balance, payment, "loan balance")?;
        table.update(&mut ctx.tx, &loan, &updated)
    }

    /// 从贷款预付余额取回到基金 / Move prepaid loan balance back into the fund
    pub fn defund_loan(
        &self,
        signer: &str,
        kind: ResourceType,
        from: &str,
        loan_num: u64,
        amount: &Asset,
    ) -> Result<ActionReceipt> {
        let action = format!("def{}loan", kind);
        self.execute(&action, |ctx| {
            self.authorizer.require_auth(signer, from)?;
            let amount = self.core_amount(amount)?;
            match kind {
                ResourceType::Cpu => self.defund_loan_in(ctx, &self.cpu_loans, from, loan_num, amount),
                ResourceType::Net => self.defund_loan_in(ctx, &self.net_loans, from, loan_num, amount),
            }
        })
    }

    fn defund_loan_in<K: ResourceKind>(
        &self,
        ctx: &mut ActionCtx<'_>,
        table: &LoanTable<K>,
        from: &str,
        loan_num: u64,
        amount: i64,
    ) -> Result<()> {
        ensure(amount > 0, || {
            ComError::NonPositiveAmount("must defund a positive amount".to_string())
        })?;
        let loan = self.require_live_loan(ctx, table, from, loan_num)?;
        ensure(loan.balance >= amount, || {
            ComError::InsufficientFunds("insufficient loan balance".to_string())
        })?;
        let mut updated = loan.clone();
        updated.balance -= amount;
        table.update(&mut ctx.tx, &loan, &updated)?;
        FundTable::credit(&mut ctx.tx, from, amount)
    }

    fn require_live_loan<K: ResourceKind>(
        &self,
        ctx: &ActionCtx<'_>,
        table: &LoanTable<K>,
        from: &str,
        loan_num: u64,
    ) -> Result<ComLoan> {
        let loan = table.require(&ctx.tx, loan_num)?;
        ensure(loan.from == from, || {
            ComError::InvalidState("user must be loan creator".to_string())
        })?;
        ensure(loan.expiration > ctx.now, || {
            ComError::InvalidState("loan has already expired".to_string())
        })?;
        Ok(loan)
    }

    // ==================== 账户维护 / Account upkeep ====================

    /// 按当前价格重估投票权重并处理到期桶
    /// Revalue vote stake at the current price and process maturities
    pub fn updatecom(&self, signer: &str, owner: &str) -> Result<ActionReceipt> {
        self.execute("updatecom", |ctx| {
            self.authorizer.require_auth(signer, owner)?;
            self.runcom(ctx, self.config.maintenance_quota)?;

            let mut balance = BalanceTable::require(&ctx.tx, owner)?;
            let init_stake = balance.vote_stake;
            let pool = PoolTable::require(&ctx.tx)?;
            let current_stake = if pool.total_com > 0 {
                pool.com_value(balance.com_balance)?
            } else {
                0
            };
            balance.vote_stake = current_stake;
            balance.process_maturities(ctx.now);
            BalanceTable::save(&mut ctx.tx, &balance)?;

            self.update_com_account(ctx, owner, 0, current_stake - init_stake, true)?;
            Ok(())
        })
    }

    /// 系统账户设置虚拟租金储备 / System account sets the virtual rent reserve
    pub fn setcom(&self, signer: &str, balance: &Asset) -> Result<ActionReceipt> {
        self.execute("setcom", |ctx| {
            self.authorizer
                .require_auth(signer, &self.config.system_account)?;
            ensure(balance.amount > 0, || {
                ComError::NonPositiveAmount(
                    "balance must be set to have a positive amount".to_string(),
                )
            })?;
            let total_rent = self.core_amount(balance)?;
            let mut pool = PoolTable::require(&ctx.tx)?;
            pool.total_rent = total_rent;
            PoolTable::save(&mut ctx.tx, &pool)
        })
    }

    /// 显式维护扫描 / Explicit maintenance sweep
    pub fn comexec(&self, signer: &str, user: &str, max: u16) -> Result<ActionReceipt> {
        self.execute("comexec", |ctx| {
            self.authorizer.require_auth(signer, user)?;
            self.runcom(ctx, max)
        })
    }

    /// 合并所有普通到期桶 / Merge every regular maturity bucket
    pub fn consolidate(&self, signer: &str, owner: &str) -> Result<ActionReceipt> {
        self.execute("consolidate", |ctx| {
            self.authorizer.require_auth(signer, owner)?;
            self.runcom(ctx, self.config.maintenance_quota)?;

            let mut balance = BalanceTable::require(&ctx.tx, owner)?;
            let com_in_sell_order = self.update_com_account(ctx, owner, 0, 0, false)?;
            balance.consolidate(com_in_sell_order, ctx.now);
            BalanceTable::save(&mut ctx.tx, &balance)
        })
    }

    /// 移入储蓄桶 / Move COM into savings
    pub fn mvtosavings(&self, signer: &str, owner: &str, com: &Asset) -> Result<ActionReceipt> {
        self.execute("mvtosavings", |ctx| {
            self.authorizer.require_auth(signer, owner)?;
            self.runcom(ctx, self.config.maintenance_quota)?;

            let mut balance = BalanceTable::require(&ctx.tx, owner)?;
            let com = self.com_amount(com)?;
            let com_in_sell_order = self.update_com_account(ctx, owner, 0, 0, false)?;
            balance.move_to_savings(com, com_in_sell_order, ctx.now)?;
            BalanceTable::save(&mut ctx.tx, &balance)
        })
    }

    /// 移出储蓄桶 / Move COM out of savings
    pub fn mvfrsavings(&self, signer: &str, owner: &str, com: &Asset) -> Result<ActionReceipt> {
        self.execute("mvfrsavings", |ctx| {
            self.authorizer.require_auth(signer, owner)?;
            self.runcom(ctx, self.config.maintenance_quota)?;

            let mut balance = BalanceTable::require(&ctx.tx, owner)?;
            let com = self.com_amount(com)?;
            balance.move_from_savings(com, ctx.now)?;
            BalanceTable::save(&mut ctx.tx, &balance)?;
            self.update_com_account(ctx, owner, 0, 0, false)?;
            Ok(())
        })
    }

    /// 关闭空的基金和余额记录 / Close empty fund and balance records
    pub fn closecom(&self, signer: &str, owner: &str) -> Result<ActionReceipt> {
        self.execute("closecom", |ctx| {
            self.authorizer.require_auth(signer, owner)?;
            if PoolTable::load(&ctx.tx)?.is_some() {
                self.runcom(ctx, self.config.maintenance_quota)?;
            }
            self.update_com_account(ctx, owner, 0, 0, false)?;

            let no_cpu_loans = !self.cpu_loans.has_owner(&ctx.tx, owner)?;
            let no_net_loans = !self.net_loans.has_owner(&ctx.tx, owner)?;
            let empty_fund = FundTable::get(&ctx.tx, owner)?.is_some_and(|f| f.balance == 0);
            if no_cpu_loans && no_net_loans && empty_fund {
                FundTable::remove(&mut ctx.tx, owner);
            }

            if let Some(balance) = BalanceTable::get(&ctx.tx, owner)? {
                ensure(balance.com_balance == 0, || {
                    ComError::InvalidState(
                        "account has remaining COM balance, must sell first".to_string(),
                    )
                })?;
                BalanceTable::remove(&mut ctx.tx, owner);
            }
            Ok(())
        })
    }

    // ==================== 外部费用通道 / External fee channels ====================

    /// 系统费用进入池子 / System fee inflow into the pool
    pub fn channel_to_com(&self, signer: &str, from: &str, amount: &Asset) -> Result<ActionReceipt> {
        self.execute("channeltocom", |ctx| {
            self.authorizer
                .require_auth(signer, &self.config.system_account)?;
            let amount = self.core_amount(amount)?;
            ensure(amount > 0, || {
                ComError::NonPositiveAmount("must channel a positive amount".to_string())
            })?;
            self.channel_fees(ctx, from, amount)
        })
    }

    /// 记录名字竞拍收入并立即转入 COM 账户, 由下次维护扫描计入池子
    /// Accrue name-bid proceeds, moving the tokens to the COM account now;
    /// the next maintenance sweep adds them to the pool
    pub fn channel_namebid_to_com(&self, signer: &str, highest_bid: &Asset) -> Result<ActionReceipt> {
        self.execute("channelnamebid", |ctx| {
            self.authorizer
                .require_auth(signer, &self.config.system_account)?;
            let bid = self.core_amount(highest_bid)?;
            ensure(bid > 0, || {
                ComError::NonPositiveAmount("highest bid must be positive".to_string())
            })?;
            if !self.config.channel_fees_to_com {
                return Ok(());
            }
            let Some(mut pool) = PoolTable::load(&ctx.tx)?.filter(ComPool::is_available) else {
                return Ok(());
            };
            pool.namebid_proceeds = checked_sum(pool.namebid_proceeds, bid, "namebid_proceeds")?;
            PoolTable::save(&mut ctx.tx, &pool)?;
            let memo = format!(
                "transfer from {} to {}",
                self.config.names_account, self.config.com_account
            );
            self.tokens.transfer(
                &mut ctx.tx,
                &self.config.names_account,
                &self.config.com_account,
                bid,
                &memo,
            )
        })
    }

    /// 把 COM 投票权重更新为当前价值 / Revalue a voter's COM stake
    pub fn update_com_stake(&self, signer: &str, voter: &str) -> Result<ActionReceipt> {
        self.execute("updatecomstake", |ctx| {
            self.authorizer.require_auth(signer, voter)?;
            let pool = PoolTable::load(&ctx.tx)?.filter(ComPool::is_available);
            let (Some(pool), Some(mut balance)) = (pool, BalanceTable::get(&ctx.tx, voter)?) else {
                return Ok(());
            };
            let init_stake = balance.vote_stake;
            balance.vote_stake = pool.com_value(balance.com_balance)?;
            BalanceTable::save(&mut ctx.tx, &balance)?;

            let delta_stake = balance.vote_stake - init_stake;
            if delta_stake != 0 {
                self.voters.adjust_staked(&mut ctx.tx, voter, delta_stake)?;
            }
            Ok(())
        })
    }

    // ==================== 账本夹具 / Ledger fixtures ====================

    /// 系统账户发行基础货币 / System account issues base currency
    pub fn issue(&self, signer: &str, to: &str, amount: &Asset) -> Result<ActionReceipt> {
        self.execute("issue", |ctx| {
            self.authorizer
                .require_auth(signer, &self.config.system_account)?;
            let amount = self.core_amount(amount)?;
            self.tokens.issue(&mut ctx.tx, to, amount)
        })
    }

    /// 记录投票选择 / Record vote choices
    pub fn vote(
        &self,
        signer: &str,
        voter: &str,
        proxy: Option<String>,
        producers: Vec<String>,
    ) -> Result<ActionReceipt> {
        self.execute("vote", |ctx| {
            self.authorizer.require_auth(signer, voter)?;
            self.voters.vote(&mut ctx.tx, voter, proxy, producers)
        })
    }

    /// 抵押代币并委托资源给 receiver / Stake tokens and delegate resources to `receiver`
    pub fn delegatebw(
        &self,
        signer: &str,
        from: &str,
        receiver: &str,
        stake_net: &Asset,
        stake_cpu: &Asset,
    ) -> Result<ActionReceipt> {
        self.execute("delegatebw", |ctx| {
            self.authorizer.require_auth(signer, from)?;
            let stake_net = self.core_amount(stake_net)?;
            let stake_cpu = self.core_amount(stake_cpu)?;
            let positive = stake_net >= 0 && stake_cpu >= 0 && (stake_net > 0 || stake_cpu > 0);
            ensure(positive, || {
                ComError::NonPositiveAmount("must stake a positive amount".to_string())
            })?;
            let total = checked_sum(stake_net, stake_cpu, "stake amount")?;

            self.tokens.transfer(
                &mut ctx.tx,
                from,
                &self.config.stake_account,
                total,
                "stake bandwidth",
            )?;
            self.delegated
                .delegate(&mut ctx.tx, from, receiver, stake_net, stake_cpu)?;
            self.limits
                .update_limits(&mut ctx.tx, from, receiver, stake_net, stake_cpu)?;
            self.voters.update_voting_power(&mut ctx.tx, from, total)
        })
    }

    // ==================== 查询 / Queries ====================

    pub fn get_pool(&self) -> Result<Option<ComPool>> {
        self.read(PoolTable::load)
    }

    pub fn get_fund(&self, owner: &str) -> Result<Option<ComFund>> {
        self.read(|tx| FundTable::get(tx, owner))
    }

    pub fn get_balance(&self, owner: &str) -> Result<Option<ComBalance>> {
        self.read(|tx| BalanceTable::get(tx, owner))
    }

    pub fn get_order(&self, owner: &str) -> Result<Option<SellOrder>> {
        self.read(|tx| OrderQueue::get(tx, owner))
    }

    /// 按提交时间排序的前 limit 个卖单 / First `limit` sell orders by submission time
    pub fn get_orders_by_time(&self, limit: usize) -> Result<Vec<SellOrder>> {
        self.read(|tx| OrderQueue::by_time(tx, limit))
    }

    pub fn get_loan(&self, kind: ResourceType, loan_num: u64) -> Result<Option<ComLoan>> {
        self.read(|tx| match kind {
            ResourceType::Cpu => self.cpu_loans.get(tx, loan_num),
            ResourceType::Net => self.net_loans.get(tx, loan_num),
        })
    }

    pub fn get_loans_by_owner(&self, kind: ResourceType, owner: &str) -> Result<Vec<ComLoan>> {
        self.read(|tx| match kind {
            ResourceType::Cpu => self.cpu_loans.by_owner(tx, owner),
            ResourceType::Net => self.net_loans.by_owner(tx, owner),
        })
    }

    pub fn get_token_balance(&self, account: &str) -> Result<i64> {
        self.read(|tx| self.tokens.balance(tx, account))
    }

    pub fn get_resources(&self, account: &str) -> Result<Option<UserResources>> {
        self.read(|tx| self.limits.get(tx, account))
    }

    pub fn get_voter(&self, account: &str) -> Result<Option<VoterInfo>> {
        self.read(|tx| self.voters.get(tx, account))
    }

    pub fn get_delegated(&self, from: &str, to: &str) -> Result<Option<DelegatedBandwidth>> {
        self.read(|tx| self.delegated.get(tx, from, to))
    }

    // ==================== 维护扫描 / Maintenance sweep ====================

    /// 有界维护扫描: 导入名字竞拍收入, 处理到期的 CPU/NET 贷款, 按 FIFO 撮合卖单
    /// Bounded sweep: deliver name-bid proceeds, process expired CPU/NET loans, fill sell orders FIFO
    fn runcom(&self, ctx: &mut ActionCtx<'_>, max: u16) -> Result<()> {
        let mut pool = PoolTable::require(&ctx.tx)?;

        // 代币在记账时已转入, 这里只更新池子
        // Tokens moved at accrual time, only the pool changes here
        if pool.namebid_proceeds > 0 && pool.is_available() {
            let proceeds = pool.namebid_proceeds;
            pool.channel(proceeds)?;
            pool.namebid_proceeds = 0;
            PoolTable::save(&mut ctx.tx, &pool)?;
            debug!("name-bid proceeds delivered: {}", proceeds);
        }

        self.process_expired_loans(ctx, &self.cpu_loans, max)?;
        self.process_expired_loans(ctx, &self.net_loans, max)?;
        self.process_sell_orders(ctx, max)
    }

    fn process_expired_loans<K: ResourceKind>(
        &self,
        ctx: &mut ActionCtx<'_>,
        table: &LoanTable<K>,
        max: u16,
    ) -> Result<()> {
        for _ in 0..max {
            let Some(loan) = table.first_expiring(&ctx.tx)? else {
                break;
            };
            if loan.expiration > ctx.now {
                break;
            }

            let orders_clear = self.orders_clear(ctx)?;
            let mut pool = PoolTable::require(&ctx.tx)?;
            let outcome = process_expired_loan(&mut pool, &loan, orders_clear)?;
            PoolTable::save(&mut ctx.tx, &pool)?;

            let delta_stake = outcome.delta_stake();
            match outcome {
                ExpiredLoan::Renewed { loan: renewed, .. } => {
                    debug!(
                        "{} loan {} renewed: staked {} -> {}",
                        table.kind(),
                        loan.loan_num,
                        loan.total_staked,
                        renewed.total_staked
                    );
                    table.update(&mut ctx.tx, &loan, &renewed)?;
                }
                ExpiredLoan::Closed { refund, .. } => {
                    debug!(
                        "{} loan {} closed, refund {} to {}",
                        table.kind(),
                        loan.loan_num,
                        refund,
                        loan.from
                    );
                    if refund > 0 {
                        FundTable::credit(&mut ctx.tx, &loan.from, refund)?;
                    }
                    table.remove(&mut ctx.tx, &loan);
                }
            }

            if delta_stake != 0 {
                let (delta_net, delta_cpu) = K::limit_deltas(delta_stake);
                self.limits.update_limits(
                    &mut ctx.tx,
                    &loan.from,
                    &loan.receiver,
                    delta_net,
                    delta_cpu,
                )?;
            }
        }
        Ok(())
    }

    /// 严格按提交时间处理, 遇到第一个无法成交的订单即停止
    /// Strict submission order, stopping at the first order that cannot fill
    fn process_sell_orders(&self, ctx: &mut ActionCtx<'_>, max: u16) -> Result<()> {
        let queued = OrderQueue::by_time(&ctx.tx, max as usize)?;
        for mut order in queued {
            if !order.is_open {
                break;
            }
            let mut balance = BalanceTable::get(&ctx.tx, &order.owner)?.ok_or_else(|| {
                ComError::InvariantViolation(format!("sell order without balance: {}", order.owner))
            })?;

            let result = self.fill_com_order(ctx, &mut balance, order.com_requested)?;
            if !result.success {
                debug!(
                    "sell order of {} still unfillable, {} COM requested",
                    order.owner, order.com_requested
                );
                break;
            }
            BalanceTable::save(&mut ctx.tx, &balance)?;

            order.proceeds = result.proceeds;
            order.stake_change = result.stake_change;
            order.close();
            OrderQueue::save(&mut ctx.tx, &order)?;

            ctx.emit(ComEvent::OrderResult {
                owner: order.owner.clone(),
                proceeds: result.proceeds,
            });
        }
        Ok(())
    }

    // ==================== 内部辅助函数 / Internal helpers ====================

    /// 池子可用且队首没有未成交卖单 / Pool available and no unfilled order heads the queue
    fn loans_available(&self, ctx: &ActionCtx<'_>) -> Result<bool> {
        match PoolTable::load(&ctx.tx)? {
            Some(pool) if pool.is_available() => self.orders_clear(ctx),
            _ => Ok(false),
        }
    }

    fn orders_clear(&self, ctx: &ActionCtx<'_>) -> Result<bool> {
        Ok(OrderQueue::head(&ctx.tx)?.map_or(true, |head| !head.is_open))
    }

    /// 尝试按当前价格赎回; 成功时更新池子和余额(余额由调用方保存)
    /// Try to redeem at the current price; on success the pool and balance change
    /// (the caller saves the balance)
    fn fill_com_order(
        &self,
        ctx: &mut ActionCtx<'_>,
        balance: &mut ComBalance,
        com: i64,
    ) -> Result<OrderOutcome> {
        let mut pool = PoolTable::require(&ctx.tx)?;
        let current_stake_value = pool.com_value(balance.com_balance)?;

        let Some(proceeds) = pool.redeem(com)? else {
            return Ok(OrderOutcome::default());
        };
        PoolTable::save(&mut ctx.tx, &pool)?;

        let init_vote_stake = balance.vote_stake;
        balance.vote_stake = current_stake_value - proceeds;
        balance.com_balance -= com;
        balance.matured_com -= com;

        Ok(OrderOutcome {
            success: true,
            proceeds,
            stake_change: balance.vote_stake - init_vote_stake,
        })
    }

    /// 结算已成交卖单并更新投票权重, 返回未成交卖单中的 COM
    /// Settle a filled sell order and update voting power, returns COM still in an open order
    fn update_com_account(
        &self,
        ctx: &mut ActionCtx<'_>,
        owner: &str,
        proceeds: i64,
        delta_stake: i64,
        force_vote_update: bool,
    ) -> Result<i64> {
        let mut to_fund = proceeds;
        let mut to_stake = delta_stake;
        let mut com_in_sell_order = 0;

        if let Some(order) = OrderQueue::get(&ctx.tx, owner)? {
            if order.is_open {
                com_in_sell_order = order.com_requested;
            } else {
                to_fund += order.proceeds;
                to_stake += order.stake_change;
                OrderQueue::remove(&mut ctx.tx, &order);
            }
        }

        if to_fund > 0 {
            FundTable::credit(&mut ctx.tx, owner, to_fund)?;
        }
        if force_vote_update || to_stake != 0 {
            self.voters
                .update_voting_power(&mut ctx.tx, owner, to_stake)?;
        }
        Ok(com_in_sell_order)
    }

    fn add_to_com_pool(&self, ctx: &mut ActionCtx<'_>, payment: i64) -> Result<i64> {
        let (pool, com_received) = match PoolTable::load(&ctx.tx)? {
            None => ComPool::seeded(payment)?,
            Some(mut pool) => {
                let minted = pool.mint(payment)?;
                (pool, minted)
            }
        };
        PoolTable::save(&mut ctx.tx, &pool)?;
        Ok(com_received)
    }

    /// 购买后更新余额与到期桶, 返回投票权重变化
    /// Update holdings and maturities after a purchase, returns the vote stake change
    fn add_to_com_balance(
        &self,
        ctx: &mut ActionCtx<'_>,
        owner: &str,
        payment: i64,
        com_received: i64,
    ) -> Result<i64> {
        let (mut balance, delta_stake) = match BalanceTable::get(&ctx.tx, owner)? {
            None => {
                let mut balance = ComBalance::new(owner);
                balance.vote_stake = payment;
                balance.com_balance = com_received;
                (balance, payment)
            }
            Some(mut balance) => {
                let init_stake = balance.vote_stake;
                balance.com_balance =
                    checked_sum(balance.com_balance, com_received, "com balance")?;
                balance.vote_stake = PoolTable::require(&ctx.tx)?.com_value(balance.com_balance)?;
                let delta = balance.vote_stake - init_stake;
                (balance, delta)
            }
        };
        balance.add_to_maturities(com_received, ctx.now);
        BalanceTable::save(&mut ctx.tx, &balance)?;
        Ok(delta_stake)
    }

    /// 费用进入池子(可配置关闭) / Fee inflow into the pool (configurable)
    fn channel_fees(&self, ctx: &mut ActionCtx<'_>, from: &str, amount: i64) -> Result<()> {
        if !self.config.channel_fees_to_com {
            return Ok(());
        }
        let Some(mut pool) = PoolTable::load(&ctx.tx)?.filter(ComPool::is_available) else {
            return Ok(());
        };
        pool.channel(amount)?;
        PoolTable::save(&mut ctx.tx, &pool)?;
        let memo = format!("transfer from {} to {}", from, self.config.com_account);
        self.tokens
            .transfer(&mut ctx.tx, from, &self.config.com_account, amount, &memo)
    }
}
