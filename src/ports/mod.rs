//! Port traits the domain talks to.

pub mod bar_source;
pub mod config_port;
pub mod trade_sink;
