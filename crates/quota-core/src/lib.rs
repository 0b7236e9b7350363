//! Core domain types for the trade quota service.
//!
//! This crate provides the types shared by every other crate:
//! - `Amount`, `Price`: Precision-safe monetary types
//! - `TradingDay`: UTC calendar-day bucket for daily quotas
//! - `TradeRequest`, `TradeSide`, `UserId`: Inbound trade intent
//! - `RiskDecision`, `DecisionReason`: Verdict returned to callers
//! - `RiskEvent`: Audit record emitted for every decision

pub mod decimal;
pub mod decision;
pub mod error;
pub mod event;
pub mod future;
pub mod trade;
pub mod trading_day;

pub use decimal::{Amount, Price, AMOUNT_SCALE};
pub use decision::{DecisionReason, RiskDecision};
pub use error::{CoreError, Result};
pub use event::{EventDecision, RiskEvent};
pub use future::BoxFuture;
pub use trade::{TradeRequest, TradeSide, UserId};
pub use trading_day::TradingDay;
