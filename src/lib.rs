//! tradesim: trade-exit simulation engine for crypto signal backtests
//!
//! This library provides the core components for:
//! - Exit-policy execution over candle sequences (fixed, time, trailing, ladder)
//! - Execution reality: latency, slippage, failure, partial-fill and reorg sampling
//! - Trading, priority-fee and borrow cost calculation
//! - Circuit breakers and execution anomaly detection
//! - Calibration of execution models from live trade records
//!
//! Everything below `cli`, `config` and `telemetry` is synchronous, performs
//! no I/O, and is deterministic given its inputs and RNG seed.

pub mod calibration;
pub mod candle;
pub mod cli;
pub mod config;
pub mod cost;
pub mod execution;
pub mod policy;
pub mod risk;
pub mod telemetry;
pub mod validation;
