//! Remit Insights - business intelligence over remittance user and
//! transaction exports.
//!
//! The library holds preprocessing, the per-page aggregators and the egui
//! dashboard; `main.rs` wires them to the command line.

pub mod charts;
pub mod config;
pub mod data;
pub mod gui;
pub mod reports;
pub mod stats;
