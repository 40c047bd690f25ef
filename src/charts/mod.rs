//! Charts module - Chart rendering

mod plotter;

pub use plotter::{ChartPlotter, LineSeries, ACCENT_COLOR, PALETTE};
