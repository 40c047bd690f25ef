//! Stats module - rates, growth and descriptive statistics

mod calculator;

pub use calculator::{AmountSummary, StatsCalculator};
