//! Order amount sanitation against exchange-declared increments and bounds.
//!
//! Clamping happens before a payload is signed: the signature covers the
//! final serialized amounts.

use crate::core::errors::ExchangeError;
use crate::core::types::{conversion::format_decimal, Market, OrderRequest, OrderType};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Direction a price is moved onto the exchange's tick grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundingPolicy {
    /// Nearest tick, midpoints away from zero
    #[default]
    Nearest,
    /// Truncate toward zero
    Down,
    /// Away from zero
    Up,
}

impl RoundingPolicy {
    const fn strategy(self) -> RoundingStrategy {
        match self {
            Self::Nearest => RoundingStrategy::MidpointAwayFromZero,
            Self::Down => RoundingStrategy::ToZero,
            Self::Up => RoundingStrategy::AwayFromZero,
        }
    }
}

/// Snap `value` onto the grid of `step` using `strategy`. A zero step leaves
/// the value untouched. `None` when the value is too large for the grid.
fn snap(value: Decimal, step: Decimal, strategy: RoundingStrategy) -> Option<Decimal> {
    if step.is_zero() {
        return Some(value);
    }
    let steps = value.checked_div(step)?.round_dp_with_strategy(0, strategy);
    steps.checked_mul(step).map(|d| d.normalize())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrecisionClamper {
    price_rounding: RoundingPolicy,
}

impl PrecisionClamper {
    pub const fn new(price_rounding: RoundingPolicy) -> Self {
        Self { price_rounding }
    }

    /// Round the quantity down onto the lot grid and enforce `[min_qty, max_qty]`.
    pub fn clamp_quantity(&self, market: &Market, requested: Decimal) -> Result<Decimal, ExchangeError> {
        if requested <= Decimal::ZERO {
            return Err(ExchangeError::InvalidQuantity(format!(
                "{}: quantity must be positive, got {}",
                market.symbol, requested
            )));
        }

        let clamped = snap(requested, market.quantity_increment, RoundingStrategy::ToZero)
            .ok_or_else(|| {
                ExchangeError::InvalidQuantity(format!(
                    "{}: quantity {} is out of range",
                    market.symbol, requested
                ))
            })?;

        if clamped.is_zero() || clamped < market.min_qty {
            return Err(ExchangeError::InvalidQuantity(format!(
                "{}: {} rounds to {} which is below minimum {}",
                market.symbol,
                requested,
                format_decimal(clamped),
                market.min_qty
            )));
        }
        if let Some(max_qty) = market.max_qty {
            if clamped > max_qty {
                return Err(ExchangeError::InvalidQuantity(format!(
                    "{}: {} exceeds maximum {}",
                    market.symbol,
                    format_decimal(clamped),
                    max_qty
                )));
            }
        }

        Ok(clamped)
    }

    /// Move the price onto the tick grid per the configured policy and enforce
    /// the declared price bounds.
    pub fn clamp_price(&self, market: &Market, requested: Decimal) -> Result<Decimal, ExchangeError> {
        if requested <= Decimal::ZERO {
            return Err(ExchangeError::InvalidPrice(format!(
                "{}: price must be positive, got {}",
                market.symbol, requested
            )));
        }

        let clamped = snap(requested, market.price_increment, self.price_rounding.strategy())
            .ok_or_else(|| {
                ExchangeError::InvalidPrice(format!(
                    "{}: price {} is out of range",
                    market.symbol, requested
                ))
            })?;

        if clamped.is_zero() || market.min_price.is_some_and(|min| clamped < min) {
            return Err(ExchangeError::InvalidPrice(format!(
                "{}: {} rounds to {} which is below the minimum price",
                market.symbol,
                requested,
                format_decimal(clamped)
            )));
        }
        if market.max_price.is_some_and(|max| clamped > max) {
            return Err(ExchangeError::InvalidPrice(format!(
                "{}: {} exceeds the maximum price",
                market.symbol,
                format_decimal(clamped)
            )));
        }

        Ok(clamped)
    }

    /// Reject orders whose notional value falls below the market minimum.
    pub fn check_notional(
        &self,
        market: &Market,
        price: Decimal,
        quantity: Decimal,
    ) -> Result<(), ExchangeError> {
        let notional = price.checked_mul(quantity).ok_or_else(|| {
            ExchangeError::InvalidQuantity(format!(
                "{}: notional of {} at {} is out of range",
                market.symbol, quantity, price
            ))
        })?;
        match market.min_notional {
            Some(min) if notional < min => Err(ExchangeError::InvalidQuantity(format!(
                "{}: notional {} is below minimum {}",
                market.symbol,
                format_decimal(notional),
                min
            ))),
            _ => Ok(()),
        }
    }

    /// Clamp every amount of `order` against `market` and enforce the
    /// minimum notional. Market orders keep no price.
    pub fn clamp_order(&self, market: &Market, mut order: OrderRequest) -> Result<OrderRequest, ExchangeError> {
        order.quantity = self.clamp_quantity(market, order.quantity)?;
        order.price = match order.order_type {
            OrderType::Market => None,
            OrderType::Limit | OrderType::Stop => order
                .price
                .map(|price| self.clamp_price(market, price))
                .transpose()?,
        };
        order.stop_price = order
            .stop_price
            .map(|price| self.clamp_price(market, price))
            .transpose()?;
        if let Some(price) = order.price.or(order.stop_price) {
            self.check_notional(market, price, order.quantity)?;
        }
        Ok(order)
    }
}
