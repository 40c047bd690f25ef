//! Chart Plotter Module
//! Creates interactive dashboard visualizations using egui_plot.

use crate::reports::{FunnelReport, NamedTable};
use chrono::{Datelike, NaiveDate};
use egui::{Color32, RichText, ScrollArea};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};
use polars::prelude::AnyValue;

pub const ACCENT_COLOR: Color32 = Color32::from_rgb(52, 152, 219); // Blue

pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(52, 152, 219),  // Blue
    Color32::from_rgb(231, 76, 60),   // Red
    Color32::from_rgb(46, 204, 113),  // Green
    Color32::from_rgb(155, 89, 182),  // Purple
    Color32::from_rgb(243, 156, 18),  // Orange
    Color32::from_rgb(26, 188, 156),  // Teal
    Color32::from_rgb(233, 30, 99),   // Pink
    Color32::from_rgb(0, 188, 212),   // Cyan
    Color32::from_rgb(121, 85, 72),   // Brown
    Color32::from_rgb(96, 125, 139),  // Blue Grey
];

const CHART_HEIGHT: f32 = 240.0;
const TABLE_HEIGHT: f32 = 220.0;

/// A named line on a date axis. Missing values leave a gap in the markers.
#[derive(Debug, Clone)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
}

impl LineSeries {
    pub fn from_dates<I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Option<f64>)>,
    {
        let points = values
            .into_iter()
            .filter_map(|(date, value)| {
                value
                    .filter(|v| v.is_finite())
                    .map(|v| [ChartPlotter::date_x(date), v])
            })
            .collect();
        Self {
            name: name.into(),
            points,
        }
    }
}

/// Stateless drawing helpers for the dashboard pages.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn series_color(index: usize) -> Color32 {
        PALETTE[index % PALETTE.len()]
    }

    /// Plot x coordinate for a date: days since the common era.
    pub fn date_x(date: NaiveDate) -> f64 {
        date.num_days_from_ce() as f64
    }

    /// Inverse of [`ChartPlotter::date_x`], formatted for axis ticks.
    pub fn date_label(x: f64) -> String {
        if x.fract().abs() > 1e-6 {
            return String::new();
        }
        NaiveDate::from_num_days_from_ce_opt(x as i32)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    /// Line chart over a date x-axis, one line per series.
    pub fn draw_date_lines(ui: &mut egui::Ui, id: &str, y_label: &str, series: &[LineSeries]) {
        Plot::new(id)
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .allow_scroll(false)
            .y_axis_label(y_label)
            .x_axis_formatter(|mark, _range| Self::date_label(mark.value))
            .label_formatter(|name, value| {
                let date = Self::date_label(value.x.round());
                if name.is_empty() {
                    format!("{}\n{:.2}", date, value.y)
                } else {
                    format!("{}\n{}: {:.2}", date, name, value.y)
                }
            })
            .show(ui, |plot_ui| {
                for (i, line) in series.iter().enumerate() {
                    let color = Self::series_color(i);
                    plot_ui.line(
                        Line::new(PlotPoints::from(line.points.clone()))
                            .color(color)
                            .width(1.5)
                            .name(&line.name),
                    );
                    plot_ui.points(
                        Points::new(PlotPoints::from(line.points.clone()))
                            .radius(2.5)
                            .color(color),
                    );
                }
            });
    }

    /// Vertical bar chart over categorical labels.
    pub fn draw_bar_chart(
        ui: &mut egui::Ui,
        id: &str,
        y_label: &str,
        labels: &[String],
        values: &[f64],
    ) {
        let x_labels = labels.to_vec();
        let bars: Vec<Bar> = labels
            .iter()
            .zip(values)
            .enumerate()
            .map(|(i, (label, &value))| {
                Bar::new(i as f64, value)
                    .name(label)
                    .width(0.6)
                    .fill(Self::series_color(i))
            })
            .collect();

        Plot::new(id)
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .allow_drag(false)
            .y_axis_label(y_label)
            .x_axis_formatter(move |mark, _range| Self::category_label(&x_labels, mark.value))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars));
            });
    }

    /// Horizontal funnel: widest stage on top.
    pub fn draw_funnel(ui: &mut egui::Ui, report: &FunnelReport) {
        let n = report.stages.len();
        // Top stage gets the highest y so it is drawn first from the top.
        let labels: Vec<String> = report
            .stages
            .iter()
            .rev()
            .map(|s| s.stage.label().to_string())
            .collect();

        let bars: Vec<Bar> = report
            .stages
            .iter()
            .enumerate()
            .map(|(i, stage)| {
                Bar::new((n - 1 - i) as f64, stage.users as f64)
                    .name(format!(
                        "{}: {} users, {:.2}% convert",
                        stage.stage.label(),
                        stage.users,
                        stage.conversion_rate
                    ))
                    .width(0.7)
                    .fill(Self::series_color(i))
            })
            .collect();

        Plot::new("funnel_chart")
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .allow_drag(false)
            .x_axis_label("Users")
            .y_axis_formatter(move |mark, _range| Self::category_label(&labels, mark.value))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).horizontal());
            });
    }

    fn category_label(labels: &[String], value: f64) -> String {
        if value < 0.0 || (value - value.round()).abs() > 1e-6 {
            return String::new();
        }
        labels.get(value.round() as usize).cloned().unwrap_or_default()
    }

    /// Row of key-metric tiles.
    pub fn draw_metric_tiles(ui: &mut egui::Ui, metrics: &[(&str, String)]) {
        ui.horizontal_wrapped(|ui| {
            for (title, value) in metrics {
                egui::Frame::none()
                    .fill(ui.visuals().widgets.noninteractive.bg_fill)
                    .rounding(6.0)
                    .inner_margin(10.0)
                    .show(ui, |ui| {
                        ui.set_min_width(160.0);
                        ui.vertical(|ui| {
                            ui.label(RichText::new(*title).size(12.0).color(Color32::GRAY));
                            ui.label(
                                RichText::new(value)
                                    .size(22.0)
                                    .strong()
                                    .color(ACCENT_COLOR),
                            );
                        });
                    });
                ui.add_space(8.0);
            }
        });
    }

    /// Render any report table as a striped grid.
    pub fn draw_table(ui: &mut egui::Ui, table: &NamedTable) {
        let df = &table.frame;
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ScrollArea::both()
                    .id_salt(format!("table_scroll_{}", table.name))
                    .max_height(TABLE_HEIGHT)
                    .show(ui, |ui| {
                        egui::Grid::new(ui.make_persistent_id(format!("table_{}", table.name)))
                            .striped(true)
                            .min_col_width(70.0)
                            .spacing([10.0, 4.0])
                            .show(ui, |ui| {
                                for column in df.get_columns() {
                                    ui.label(
                                        RichText::new(column.name().as_str()).strong().size(11.0),
                                    );
                                }
                                ui.end_row();

                                for row in 0..df.height() {
                                    for column in df.get_columns() {
                                        let text = column
                                            .get(row)
                                            .map(Self::cell_text)
                                            .unwrap_or_default();
                                        ui.label(RichText::new(text).size(11.0));
                                    }
                                    ui.end_row();
                                }
                            });
                    });
            });
    }

    /// Display text for one table cell.
    pub fn cell_text(value: AnyValue) -> String {
        match value {
            AnyValue::Null => "-".to_string(),
            AnyValue::Float64(v) if v.is_nan() => "-".to_string(),
            AnyValue::Float64(v) => format!("{:.2}", v),
            AnyValue::Float32(v) => format!("{:.2}", v),
            AnyValue::String(s) => s.to_string(),
            other => other.to_string().trim_matches('"').to_string(),
        }
    }
}
