//! scalptrader — intraday single-instrument options strategy engine.
//!
//! Hexagonal architecture: the indicator / signal / position engine lives in
//! [`domain`], port traits in [`ports`], concrete implementations in
//! [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
