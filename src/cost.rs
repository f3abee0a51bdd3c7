//! Trading, network and borrow cost calculator
//!
//! Network fees are quoted in lamports and micro-lamports per compute unit
//! and converted to the quote currency through the trade's native price.

use crate::validation::{check_decimal, check_range, ValidationError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const LAMPORTS_PER_NATIVE: Decimal = dec!(1000000000);
const MICRO_LAMPORTS_PER_LAMPORT: Decimal = dec!(1000000);
const BPS_DENOMINATOR: Decimal = dec!(10000);
const MS_PER_YEAR: Decimal = dec!(31536000000);

/// Upper bound on a priority price, in micro-lamports per CU
pub const MAX_PRIORITY_MICRO_LAMPORTS_PER_CU: f64 = 1e12;
/// Upper bound on compute units per transaction
pub const MAX_COMPUTE_UNITS: u64 = 1_400_000;
/// Upper bound on the per-signature base fee (one native token)
pub const MAX_BASE_FEE_LAMPORTS: u64 = 1_000_000_000;

/// Cost arithmetic left the decimal range
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CostError {
    #[error("{component} overflowed the decimal range")]
    Overflow { component: &'static str },
}

fn checked_mul(component: &'static str, a: Decimal, b: Decimal) -> Result<Decimal, CostError> {
    a.checked_mul(b).ok_or(CostError::Overflow { component })
}

fn checked_add(component: &'static str, a: Decimal, b: Decimal) -> Result<Decimal, CostError> {
    a.checked_add(b).ok_or(CostError::Overflow { component })
}

/// Priority fee parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityFeeModel {
    pub base_micro_lamports_per_cu: Decimal,
    pub congestion_multiplier: Decimal,
    pub max_micro_lamports_per_cu: Decimal,
}

/// Venue cost model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub taker_fee_bps: Decimal,
    pub maker_fee_bps: Decimal,
    /// Per-signature base fee
    pub base_fee_lamports: u64,
    pub priority_fee: PriorityFeeModel,
    pub average_compute_units: u64,
    /// Annualized borrow rate charged on short exposure
    #[serde(default)]
    pub borrow_apr: Decimal,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            taker_fee_bps: dec!(30),
            maker_fee_bps: dec!(0),
            base_fee_lamports: 5_000,
            priority_fee: PriorityFeeModel {
                base_micro_lamports_per_cu: dec!(10000),
                congestion_multiplier: dec!(1),
                max_micro_lamports_per_cu: dec!(1000000),
            },
            average_compute_units: 200_000,
            borrow_apr: dec!(0),
        }
    }
}

impl CostModel {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_decimal("cost.taker_fee_bps", self.taker_fee_bps, 0.0, 10_000.0)?;
        check_decimal("cost.maker_fee_bps", self.maker_fee_bps, 0.0, 10_000.0)?;
        let pf = &self.priority_fee;
        check_decimal(
            "cost.priority_fee.base_micro_lamports_per_cu",
            pf.base_micro_lamports_per_cu,
            0.0,
            MAX_PRIORITY_MICRO_LAMPORTS_PER_CU,
        )?;
        check_decimal(
            "cost.priority_fee.congestion_multiplier",
            pf.congestion_multiplier,
            1.0,
            1_000.0,
        )?;
        check_decimal(
            "cost.priority_fee.max_micro_lamports_per_cu",
            pf.max_micro_lamports_per_cu,
            0.0,
            MAX_PRIORITY_MICRO_LAMPORTS_PER_CU,
        )?;
        check_range(
            "cost.average_compute_units",
            self.average_compute_units as f64,
            0.0,
            MAX_COMPUTE_UNITS as f64,
        )?;
        check_range(
            "cost.base_fee_lamports",
            self.base_fee_lamports as f64,
            0.0,
            MAX_BASE_FEE_LAMPORTS as f64,
        )?;
        check_decimal("cost.borrow_apr", self.borrow_apr, 0.0, 10.0)
    }

    /// Effective priority price in micro-lamports per CU
    pub fn priority_price(&self) -> Decimal {
        let pf = &self.priority_fee;
        // an overflowing product is above any representable cap
        pf.base_micro_lamports_per_cu
            .checked_mul(pf.congestion_multiplier)
            .map_or(pf.max_micro_lamports_per_cu, |price| {
                price.min(pf.max_micro_lamports_per_cu)
            })
    }
}

/// Trade direction for cost purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
    /// Opening or holding short exposure; accrues borrow
    Short,
}

/// Liquidity role of the fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Liquidity {
    #[default]
    Taker,
    Maker,
}

/// A single fill to be costed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeCostInput {
    /// Quantity in base units
    pub size: Decimal,
    /// Fill price in quote currency
    pub price: Decimal,
    pub side: TradeSide,
    #[serde(default)]
    pub liquidity: Liquidity,
    /// Native chain token price in quote currency
    pub native_price: Decimal,
    /// Holding time; only used for short borrow
    #[serde(default)]
    pub holding_ms: u64,
}

/// Cost breakdown in quote currency
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostResult {
    pub base_fee: Decimal,
    pub priority_fee: Decimal,
    pub trading_fee: Decimal,
    pub borrow_fee: Decimal,
    pub total_cost: Decimal,
}

impl CostResult {
    /// Component-wise sum
    pub fn combine(&self, other: &CostResult) -> CostResult {
        CostResult {
            base_fee: self.base_fee + other.base_fee,
            priority_fee: self.priority_fee + other.priority_fee,
            trading_fee: self.trading_fee + other.trading_fee,
            borrow_fee: self.borrow_fee + other.borrow_fee,
            total_cost: self.total_cost + other.total_cost,
        }
    }
}

/// Cost one fill under a cost model
///
/// Priority fee is `min(max, base * congestion_multiplier) * average_cu`.
/// Trading fee is notional times the taker (or maker) fee. Inputs too large
/// for decimal arithmetic return [`CostError::Overflow`] naming the component.
pub fn apply_cost_model(model: &CostModel, trade: &TradeCostInput) -> Result<CostResult, CostError> {
    let lamports_to_quote = trade.native_price / LAMPORTS_PER_NATIVE;

    let base_fee = checked_mul(
        "base_fee",
        Decimal::from(model.base_fee_lamports),
        lamports_to_quote,
    )?;

    let priority_micro = checked_mul(
        "priority_fee",
        model.priority_price(),
        Decimal::from(model.average_compute_units),
    )?;
    let priority_fee = checked_mul(
        "priority_fee",
        priority_micro / MICRO_LAMPORTS_PER_LAMPORT,
        lamports_to_quote,
    )?;

    let notional = checked_mul("notional", trade.size, trade.price)?;
    let fee_bps = match trade.liquidity {
        Liquidity::Taker => model.taker_fee_bps,
        Liquidity::Maker => model.maker_fee_bps,
    };
    let trading_fee = checked_mul("trading_fee", notional, fee_bps)? / BPS_DENOMINATOR;

    let borrow_fee = match trade.side {
        TradeSide::Short => {
            let annual = checked_mul("borrow_fee", notional, model.borrow_apr)?;
            checked_mul("borrow_fee", annual, Decimal::from(trade.holding_ms))? / MS_PER_YEAR
        }
        TradeSide::Buy | TradeSide::Sell => Decimal::ZERO,
    };

    let total_cost = [priority_fee, trading_fee, borrow_fee]
        .into_iter()
        .try_fold(base_fee, |acc, c| checked_add("total_cost", acc, c))?;

    Ok(CostResult {
        base_fee,
        priority_fee,
        trading_fee,
        borrow_fee,
        total_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(side: TradeSide) -> TradeCostInput {
        TradeCostInput {
            size: dec!(10),
            price: dec!(100),
            side,
            liquidity: Liquidity::Taker,
            native_price: dec!(150),
            holding_ms: 0,
        }
    }

    #[test]
    fn test_trading_fee() {
        let result = apply_cost_model(&CostModel::default(), &trade(TradeSide::Buy)).unwrap();
        // 1000 notional * 30 bps
        assert_eq!(result.trading_fee, dec!(3));
    }

    #[test]
    fn test_network_fees_in_quote() {
        let result = apply_cost_model(&CostModel::default(), &trade(TradeSide::Buy)).unwrap();
        // 5000 lamports * 150 / 1e9
        assert_eq!(result.base_fee, dec!(0.00075));
        // 10_000 µL/CU * 200_000 CU = 2_000 lamports
        assert_eq!(result.priority_fee, dec!(0.0003));
        assert_eq!(
            result.total_cost,
            result.base_fee + result.priority_fee + result.trading_fee
        );
    }

    #[test]
    fn test_priority_fee_capped() {
        let mut model = CostModel::default();
        model.priority_fee.congestion_multiplier = dec!(500);
        model.priority_fee.max_micro_lamports_per_cu = dec!(1000000);
        assert_eq!(model.priority_price(), dec!(1000000));

        model.priority_fee.congestion_multiplier = dec!(3);
        assert_eq!(model.priority_price(), dec!(30000));
    }

    #[test]
    fn test_maker_fee() {
        let mut model = CostModel::default();
        model.maker_fee_bps = dec!(5);
        let mut t = trade(TradeSide::Sell);
        t.liquidity = Liquidity::Maker;
        assert_eq!(apply_cost_model(&model, &t).unwrap().trading_fee, dec!(0.5));
    }

    #[test]
    fn test_borrow_fee_only_for_short() {
        let mut model = CostModel::default();
        model.borrow_apr = dec!(0.10);
        let mut short = trade(TradeSide::Short);
        short.holding_ms = 31_536_000_000;
        assert_eq!(apply_cost_model(&model, &short).unwrap().borrow_fee, dec!(100));

        let mut long = trade(TradeSide::Buy);
        long.holding_ms = 31_536_000_000;
        assert_eq!(apply_cost_model(&model, &long).unwrap().borrow_fee, dec!(0));
    }

    #[test]
    fn test_combine() {
        let a = apply_cost_model(&CostModel::default(), &trade(TradeSide::Buy)).unwrap();
        let b = a.combine(&a);
        assert_eq!(b.total_cost, a.total_cost * dec!(2));
    }

    #[test]
    fn test_validation() {
        assert!(CostModel::default().validate().is_ok());
        let mut bad = CostModel::default();
        bad.taker_fee_bps = dec!(-1);
        assert!(bad.validate().is_err());
        let mut bad = CostModel::default();
        bad.priority_fee.congestion_multiplier = dec!(0.5);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_priority_fee_bounds_enforced() {
        let mut model = CostModel::default();
        model.priority_fee.base_micro_lamports_per_cu = dec!(1e25);
        model.priority_fee.max_micro_lamports_per_cu = dec!(1e25);
        assert!(model.validate().is_err());

        let mut model = CostModel::default();
        model.priority_fee.max_micro_lamports_per_cu = dec!(1e13);
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_compute_unit_and_base_fee_bounds_enforced() {
        let mut model = CostModel::default();
        model.average_compute_units = MAX_COMPUTE_UNITS + 1;
        assert!(model.validate().is_err());

        let mut model = CostModel::default();
        model.base_fee_lamports = u64::MAX;
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_largest_valid_model_does_not_overflow() {
        let mut model = CostModel::default();
        model.priority_fee.base_micro_lamports_per_cu = dec!(1000000000000);
        model.priority_fee.congestion_multiplier = dec!(1000);
        model.priority_fee.max_micro_lamports_per_cu = dec!(1000000000000);
        model.average_compute_units = MAX_COMPUTE_UNITS;
        model.base_fee_lamports = MAX_BASE_FEE_LAMPORTS;
        assert!(model.validate().is_ok());
        assert!(apply_cost_model(&model, &trade(TradeSide::Buy)).is_ok());
    }

    #[test]
    fn test_unvalidated_model_overflow_is_an_error() {
        let mut model = CostModel::default();
        model.priority_fee.base_micro_lamports_per_cu = dec!(1e25);
        model.priority_fee.max_micro_lamports_per_cu = dec!(1e25);
        let result = apply_cost_model(&model, &trade(TradeSide::Buy));
        assert_eq!(
            result,
            Err(CostError::Overflow {
                component: "priority_fee"
            })
        );
    }

    #[test]
    fn test_huge_notional_overflow_is_an_error() {
        let mut t = trade(TradeSide::Buy);
        t.size = Decimal::MAX;
        t.price = dec!(2);
        let err = apply_cost_model(&CostModel::default(), &t).unwrap_err();
        assert_eq!(err, CostError::Overflow { component: "notional" });
    }
}
