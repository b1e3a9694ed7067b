//! Lever/delever loops against the lending market.
//!
//! The market lends the same asset it takes as collateral, so levering is a
//! borrow followed by a re-supply and delevering is a collateral withdrawal
//! followed by a repay. Every loop is bounded and stops early once the
//! position is inside the drift band or a step would be dust.

use soroban_sdk::{Address, Env};

use crate::constants::*;
use crate::error::Error;
use crate::events::{LeverageIncomplete, Rebalanced};
use crate::helpers::{authorize_transfer, token_balance};
use crate::math::{ltv, min_collateral, mul_div, target_debt, within_tolerance};
use crate::storage::{get_address, get_market, DataKey, LeverageConfig, MarketAdapterClient};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Position {
    pub supplied: u128,
    pub borrowed: u128,
}

impl Position {
    pub fn equity(&self) -> u128 {
        self.supplied.saturating_sub(self.borrowed)
    }

    pub fn ltv(&self) -> Result<u128, Error> {
        ltv(self.supplied, self.borrowed)
    }
}

pub struct Leverage<'a> {
    env: &'a Env,
    market: MarketAdapterClient<'a>,
    underlying: Address,
    this: Address,
}

impl<'a> Leverage<'a> {
    pub fn load(env: &'a Env) -> Result<Self, Error> {
        Ok(Self {
            env,
            market: get_market(env)?,
            underlying: get_address(env, &DataKey::Underlying)?,
            this: env.current_contract_address(),
        })
    }

    pub fn underlying(&self) -> &Address {
        &self.underlying
    }

    pub fn market(&self) -> &MarketAdapterClient<'a> {
        &self.market
    }

    pub fn position(&self) -> Position {
        Position {
            supplied: self.market.current_supplied(&self.this),
            borrowed: self.market.current_borrowed(&self.this),
        }
    }

    pub fn idle(&self) -> u128 {
        token_balance(self.env, &self.underlying, &self.this)
    }

    /// Idle underlying plus supplied minus borrowed.
    pub fn balance(&self) -> u128 {
        self.idle().saturating_add(self.position().equity())
    }

    pub fn threshold(&self) -> u128 {
        self.market.liquidation_threshold()
    }

    pub fn safe_limit(&self, config: &LeverageConfig) -> u128 {
        self.threshold().saturating_sub(config.safety_margin)
    }

    /// Target LTV capped at the safe limit. The market may lower its
    /// threshold after the target was accepted.
    pub fn effective_target(&self, config: &LeverageConfig) -> u128 {
        config.target_ltv.min(self.safe_limit(config))
    }

    pub fn supply(&self, amount: u128) -> Result<u128, Error> {
        if amount == 0 {
            return Ok(0);
        }
        authorize_transfer(self.env, &self.underlying, &self.market.address, amount)?;
        Ok(self.market.supply(&self.this, &amount))
    }

    pub fn supply_idle(&self) -> Result<u128, Error> {
        self.supply(self.idle())
    }

    fn repay(&self, amount: u128) -> Result<u128, Error> {
        if amount == 0 {
            return Ok(0);
        }
        authorize_transfer(self.env, &self.underlying, &self.market.address, amount)?;
        Ok(self.market.repay(&self.this, &amount))
    }

    fn withdraw_collateral(&self, amount: u128, tolerance_bps: u32) -> Result<u128, Error> {
        let received = self.market.withdraw(&self.this, &amount);
        if !within_tolerance(received, amount, tolerance_bps)? {
            return Err(Error::SlippageExceeded);
        }
        Ok(received)
    }

    /// Collateral that can leave without breaching the liquidation threshold.
    fn withdraw_headroom(&self, position: &Position) -> Result<u128, Error> {
        let locked = min_collateral(position.borrowed, self.threshold())?;
        Ok(position.supplied.saturating_sub(locked))
    }

    /// Moves LTV back toward target when it left the drift band or crossed
    /// the safe limit. Returns the number of loop iterations spent.
    pub fn rebalance(&self, config: &LeverageConfig) -> Result<u32, Error> {
        let position = self.position();
        if position.supplied == 0 {
            return Ok(0);
        }
        let current = position.ltv()?;
        let safe_limit = self.safe_limit(config);
        let target_ltv = config.target_ltv.min(safe_limit);
        let upper = target_ltv.saturating_add(config.allowed_drift);
        let lower = target_ltv.saturating_sub(config.allowed_drift);

        let iterations = if current > upper || current > safe_limit {
            let target = target_debt(position.equity(), target_ltv)?;
            // Above the safe limit every unit of excess debt must go.
            let dust = if current > safe_limit {
                0
            } else {
                config.min_leverage_amount
            };
            self.lever_down(target, config.withdraw_slippage_bps, dust)?
        } else if current < lower {
            self.lever_up(config, target_ltv, safe_limit)?
        } else {
            0
        };

        if iterations > 0 {
            Rebalanced {
                ltv_before: current,
                ltv_after: self.position().ltv()?,
                iterations,
            }
            .publish(self.env);
        }
        Ok(iterations)
    }

    /// Rebalance for paths that must not fail on market depth: an exhausted
    /// iteration budget is accepted as long as the position stays under the
    /// safe limit.
    pub fn settle(&self, config: &LeverageConfig) -> Result<(), Error> {
        match self.rebalance(config) {
            Ok(_) => Ok(()),
            Err(Error::IterationLimitReached) => {
                let current = self.position().ltv()?;
                if current > self.safe_limit(config) {
                    return Err(Error::IterationLimitReached);
                }
                LeverageIncomplete {
                    ltv: current,
                    target_ltv: config.target_ltv,
                }
                .publish(self.env);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn lever_up(
        &self,
        config: &LeverageConfig,
        target_ltv: u128,
        safe_limit: u128,
    ) -> Result<u32, Error> {
        let lower = target_ltv.saturating_sub(config.allowed_drift);
        for i in 0..MAX_LEVER_ITERATIONS {
            let position = self.position();
            if position.ltv()? >= lower {
                return Ok(i);
            }
            let target = target_debt(position.equity(), target_ltv)?;
            let capacity = mul_div(position.supplied, safe_limit, WAD)?
                .saturating_sub(position.borrowed);
            let step = target.saturating_sub(position.borrowed).min(capacity);
            if step == 0 || step < config.min_leverage_amount {
                return Ok(i);
            }
            let borrowed = self.market.borrow(&self.this, &step);
            if borrowed == 0 {
                return Ok(i);
            }
            self.supply(borrowed)?;
        }
        if self.position().ltv()? >= lower {
            Ok(MAX_LEVER_ITERATIONS)
        } else {
            Err(Error::IterationLimitReached)
        }
    }

    /// Repays debt down to `target_debt` using withdrawn collateral.
    /// Excess below `dust` is left in place.
    fn lever_down(&self, target_debt: u128, tolerance_bps: u32, dust: u128) -> Result<u32, Error> {
        for i in 0..MAX_DELEVER_ITERATIONS {
            let position = self.position();
            if position.borrowed <= target_debt {
                return Ok(i);
            }
            let excess = position.borrowed - target_debt;
            if excess < dust {
                return Ok(i);
            }
            let step = excess.min(self.withdraw_headroom(&position)?);
            if step == 0 {
                return Err(Error::IterationLimitReached);
            }
            let received = self.withdraw_collateral(step, tolerance_bps)?;
            self.repay(received.min(position.borrowed))?;
        }
        if self.position().borrowed <= target_debt {
            Ok(MAX_DELEVER_ITERATIONS)
        } else {
            Err(Error::IterationLimitReached)
        }
    }

    /// Delevers and withdraws so that `amount` more underlying sits idle in
    /// the strategy, keeping the remaining equity at the target LTV.
    pub fn free_capital(&self, config: &LeverageConfig, amount: u128) -> Result<(), Error> {
        let position = self.position();
        let equity = position.equity();
        if equity == 0 || amount == 0 {
            return Ok(());
        }
        let amount = amount.min(equity);
        let remaining = equity - amount;
        let target = target_debt(remaining, self.effective_target(config))?;
        if position.borrowed > target {
            self.lever_down(target, config.withdraw_slippage_bps, 0)?;
        }
        let position = self.position();
        let request = amount.min(self.withdraw_headroom(&position)?);
        if request > 0 {
            self.withdraw_collateral(request, config.withdraw_slippage_bps)?;
        }
        Ok(())
    }

    /// Repays all debt and withdraws all collateral.
    pub fn unwind(&self, tolerance_bps: u32) -> Result<(), Error> {
        if self.position().borrowed > 0 {
            self.lever_down(0, tolerance_bps, 0)?;
        }
        let position = self.position();
        if position.supplied > 0 {
            self.withdraw_collateral(position.supplied, tolerance_bps)?;
        }
        Ok(())
    }
}
