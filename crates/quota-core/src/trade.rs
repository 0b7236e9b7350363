//! Inbound trade intent.

use crate::decimal::{Amount, Price, AMOUNT_SCALE};
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted length of a user id.
const MAX_USER_ID_LEN: usize = 128;

/// Opaque, stable user identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a validated user id.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = Self(id.into());
        id.validate()?;
        Ok(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(CoreError::InvalidUserId("must not be empty".to_string()));
        }
        if self.0.len() > MAX_USER_ID_LEN {
            return Err(CoreError::InvalidUserId(format!(
                "longer than {MAX_USER_ID_LEN} bytes"
            )));
        }
        if self.0.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(CoreError::InvalidUserId(
                "must not contain whitespace or control characters".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trade submitted for quota evaluation.
///
/// The wire name of `side` is `action`. Both sides consume quota; the daily
/// limit caps gross traded amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub user_id: UserId,
    pub symbol: String,
    #[serde(rename = "action")]
    pub side: TradeSide,
    pub amount: Amount,
    pub price: Price,
}

impl TradeRequest {
    /// Create a validated trade request.
    pub fn new(
        user_id: UserId,
        symbol: impl Into<String>,
        side: TradeSide,
        amount: Amount,
        price: Price,
    ) -> Result<Self> {
        let request = Self {
            user_id,
            symbol: symbol.into(),
            side,
            amount,
            price,
        };
        request.validate()?;
        Ok(request)
    }

    /// Check field constraints.
    ///
    /// Deserialized requests bypass `new`, so the boundary calls this before
    /// anything touches the store.
    pub fn validate(&self) -> Result<()> {
        self.user_id.validate()?;

        if self.symbol.trim().is_empty() {
            return Err(CoreError::InvalidSymbol("must not be empty".to_string()));
        }

        if !self.amount.is_positive() {
            return Err(CoreError::InvalidAmount(format!(
                "must be > 0, got {}",
                self.amount
            )));
        }
        if !self.amount.fits_scale() {
            return Err(CoreError::InvalidAmount(format!(
                "at most {AMOUNT_SCALE} decimal places, got {}",
                self.amount
            )));
        }
        // Must also fit the integer counter representation
        if self.amount.to_minor_units().is_none() {
            return Err(CoreError::InvalidAmount(format!(
                "out of range: {}",
                self.amount
            )));
        }

        if !self.price.is_positive() {
            return Err(CoreError::InvalidPrice(format!(
                "must be > 0, got {}",
                self.price
            )));
        }
        Ok(())
    }
}
