//! Chart Viewer Widget
//! Central scrollable panel that lays out the charts and tables of the
//! current page as cards.

use crate::charts::{ChartPlotter, LineSeries};
use crate::data::KycStatus;
use crate::reports::{
    FunnelReport, KycReport, NamedTable, PageReport, RetentionReport, TransactionReport,
    UserReport,
};
use egui::{Color32, RichText, ScrollArea};
use polars::prelude::PolarsResult;

const CARD_SPACING: f32 = 15.0;
const TOP_CORRIDORS: usize = 10;

/// Scrollable display of one rendered page.
#[derive(Default)]
pub struct ChartViewer {
    pub report: Option<PageReport>,
    /// Tabular form of `report`, built once per render.
    pub tables: Vec<NamedTable>,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.report = None;
        self.tables.clear();
    }

    pub fn set_report(&mut self, report: PageReport) -> PolarsResult<()> {
        self.tables = report.tables()?;
        self.report = Some(report);
        Ok(())
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        let Some(report) = &self.report else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        let page = report.page();
        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.heading(RichText::new(page.title()).size(24.0).strong());
                ui.add_space(CARD_SPACING);

                match report {
                    PageReport::Users(r) => Self::show_users(ui, r),
                    PageReport::Kyc(r) => Self::show_kyc(ui, r),
                    PageReport::Transactions(r) => Self::show_transactions(ui, r),
                    PageReport::Retention(r) => Self::show_retention(ui, r),
                    PageReport::Funnel(r) => Self::show_funnel(ui, r),
                }

                Self::card(ui, "Tables", |ui| {
                    for table in &self.tables {
                        egui::CollapsingHeader::new(table.name)
                            .id_salt(format!("{}_{}", page.slug(), table.name))
                            .show(ui, |ui| ChartPlotter::draw_table(ui, table));
                    }
                });
            });
    }

    fn card(ui: &mut egui::Ui, title: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(1.0, Color32::from_gray(90)))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(title).size(16.0).strong());
                ui.add_space(8.0);
                add_contents(ui);
            });
        ui.add_space(CARD_SPACING);
    }

    fn show_users(ui: &mut egui::Ui, r: &UserReport) {
        ChartPlotter::draw_metric_tiles(
            ui,
            &[
                ("Total Users", r.total_users.to_string()),
                ("Users with Multiple Accounts", r.multiple_accounts.to_string()),
            ],
        );
        ui.add_space(CARD_SPACING);

        Self::card(ui, "Daily Growth of Verified vs Non-Verified Users", |ui| {
            let series = [
                LineSeries::from_dates(
                    "Verified",
                    r.signups.iter().map(|s| (s.date, Some(s.verified as f64))),
                ),
                LineSeries::from_dates(
                    "Non-Verified",
                    r.signups.iter().map(|s| (s.date, Some(s.non_verified as f64))),
                ),
            ];
            ChartPlotter::draw_date_lines(ui, "users_signups", "Users", &series);
        });

        Self::card(ui, "Week-over-Week Growth of Verified Users", |ui| {
            let series = [
                LineSeries::from_dates(
                    "Verified WoW Growth",
                    r.signups.iter().map(|s| (s.date, s.verified_wow_growth)),
                ),
                LineSeries::from_dates(
                    "Non-Verified WoW Growth",
                    r.signups.iter().map(|s| (s.date, s.non_verified_wow_growth)),
                ),
            ];
            ChartPlotter::draw_date_lines(ui, "users_wow", "Growth (%)", &series);
        });

        Self::card(ui, "User Demographics", |ui| {
            ui.label(RichText::new("Age Distribution").strong());
            let labels: Vec<String> = r.age_groups.iter().map(|a| a.label.clone()).collect();
            let values: Vec<f64> = r.age_groups.iter().map(|a| a.users as f64).collect();
            ChartPlotter::draw_bar_chart(ui, "users_age", "Users", &labels, &values);

            ui.add_space(8.0);
            ui.label(RichText::new("Gender Distribution").strong());
            let labels: Vec<String> = r.genders.iter().map(|g| g.label.clone()).collect();
            let values: Vec<f64> = r.genders.iter().map(|g| g.users as f64).collect();
            ChartPlotter::draw_bar_chart(ui, "users_gender", "Users", &labels, &values);

            ui.add_space(8.0);
            ui.label(RichText::new("State Distribution").strong());
            let labels: Vec<String> = r.states.iter().map(|s| s.label.clone()).collect();
            let values: Vec<f64> = r.states.iter().map(|s| s.users as f64).collect();
            ChartPlotter::draw_bar_chart(ui, "users_state", "Users", &labels, &values);
        });

        Self::card(ui, "Daily Average Transaction Volume per User", |ui| {
            let series = [LineSeries::from_dates(
                "BaseAmount",
                r.average_volume
                    .iter()
                    .map(|a| (a.date, Some(a.average_per_user))),
            )];
            ChartPlotter::draw_date_lines(ui, "users_avg_volume", "BaseAmount", &series);
        });
    }

    fn show_kyc(ui: &mut egui::Ui, r: &KycReport) {
        Self::card(ui, "KYC Status Distribution", |ui| {
            let labels: Vec<String> = r
                .distribution
                .iter()
                .map(|s| s.status.label().to_string())
                .collect();
            let values: Vec<f64> = r.distribution.iter().map(|s| s.users as f64).collect();
            ChartPlotter::draw_bar_chart(ui, "kyc_distribution", "Users", &labels, &values);
        });

        Self::card(ui, "KYC Status Trends Over Time", |ui| {
            let series: Vec<LineSeries> = KycStatus::ALL
                .iter()
                .filter(|status| r.trend.iter().any(|p| p.status == **status))
                .map(|status| {
                    LineSeries::from_dates(
                        status.label(),
                        r.trend
                            .iter()
                            .filter(|p| p.status == *status)
                            .map(|p| (p.date, Some(p.users as f64))),
                    )
                })
                .collect();
            ChartPlotter::draw_date_lines(ui, "kyc_trend", "Users", &series);
        });
    }

    fn show_transactions(ui: &mut egui::Ui, r: &TransactionReport) {
        ChartPlotter::draw_metric_tiles(
            ui,
            &[
                ("Total Transactions", r.total_transactions.to_string()),
                ("Total Base Value", format!("{:.2}", r.total_base_value)),
                ("Mean Base Amount", format!("{:.2}", r.amount_summary.mean)),
                ("Median Base Amount", format!("{:.2}", r.amount_summary.median)),
            ],
        );
        ui.add_space(CARD_SPACING);

        Self::card(ui, "Transaction Volume by Send Currency", |ui| {
            let labels: Vec<String> = r.by_currency.iter().map(|c| c.currency.clone()).collect();
            let values: Vec<f64> = r.by_currency.iter().map(|c| c.volume).collect();
            ChartPlotter::draw_bar_chart(ui, "txn_currency", "SendAmount", &labels, &values);
        });

        Self::card(ui, "Top Currency Corridors", |ui| {
            let top = &r.by_corridor[..r.by_corridor.len().min(TOP_CORRIDORS)];
            let labels: Vec<String> = top.iter().map(|c| c.label()).collect();
            let values: Vec<f64> = top.iter().map(|c| c.volume).collect();
            ChartPlotter::draw_bar_chart(ui, "txn_corridor", "SendAmount", &labels, &values);
        });

        Self::card(ui, "Daily Transaction Volume", |ui| {
            let series = [LineSeries::from_dates(
                "Total Volume",
                r.daily_trend.iter().map(|d| (d.date, Some(d.total_volume))),
            )];
            ChartPlotter::draw_date_lines(ui, "txn_daily_volume", "SendAmount", &series);
        });

        Self::card(ui, "Volume Growth", |ui| {
            let series = [
                LineSeries::from_dates(
                    "WoW Growth",
                    r.daily_trend.iter().map(|d| (d.date, d.wow_growth)),
                ),
                LineSeries::from_dates(
                    "MoM Growth",
                    r.daily_trend.iter().map(|d| (d.date, d.mom_growth)),
                ),
            ];
            ChartPlotter::draw_date_lines(ui, "txn_growth", "Growth (%)", &series);
        });
    }

    fn show_retention(ui: &mut egui::Ui, r: &RetentionReport) {
        Self::card(ui, "Active Users", |ui| {
            let series = [
                LineSeries::from_dates(
                    "Daily",
                    r.daily.iter().map(|a| (a.period_start, Some(a.active_users as f64))),
                ),
                LineSeries::from_dates(
                    "Weekly",
                    r.weekly.iter().map(|a| (a.period_start, Some(a.active_users as f64))),
                ),
                LineSeries::from_dates(
                    "Monthly",
                    r.monthly.iter().map(|a| (a.period_start, Some(a.active_users as f64))),
                ),
            ];
            ChartPlotter::draw_date_lines(ui, "retention_active", "Active Users", &series);
        });

        Self::card(ui, "User Segmentation by Transaction Volume", |ui| {
            let labels: Vec<String> = r.segments.iter().map(|s| s.category.to_string()).collect();
            let values: Vec<f64> = r.segments.iter().map(|s| s.users as f64).collect();
            ChartPlotter::draw_bar_chart(ui, "retention_segments", "Users", &labels, &values);
        });

        Self::card(ui, "Transaction Volume Growth", |ui| {
            let series = [
                LineSeries::from_dates(
                    "WoWGrowth",
                    r.volume_trend.iter().map(|d| (d.date, d.wow_growth)),
                ),
                LineSeries::from_dates(
                    "MoMGrowth",
                    r.volume_trend.iter().map(|d| (d.date, d.mom_growth)),
                ),
            ];
            ChartPlotter::draw_date_lines(ui, "retention_growth", "Growth (%)", &series);
        });
    }

    fn show_funnel(ui: &mut egui::Ui, r: &FunnelReport) {
        Self::card(ui, "User Conversion Funnel", |ui| {
            ChartPlotter::draw_funnel(ui, r);
        });

        Self::card(ui, "Key Insights", |ui| {
            for line in r.insights() {
                ui.label(RichText::new(format!("• {}", line)).size(13.0));
            }
        });
    }
}
