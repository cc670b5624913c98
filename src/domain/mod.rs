//! Core domain types and logic: bars, indicators, signals, the position
//! state machine and the trade ledger.

pub mod bar;
pub mod indicator;
pub mod strategy;
pub mod signal;
pub mod position;
pub mod event;
pub mod ledger;
pub mod engine;
pub mod backtest;
pub mod config_validation;
pub mod error;
