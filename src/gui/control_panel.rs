//! Control Panel Widget
//! Left side panel with page selection, data source and refresh controls.

use crate::reports::Page;
use egui::{Color32, ComboBox, RichText};
use std::path::PathBuf;
use std::time::Duration;

/// Left side control panel.
pub struct ControlPanel {
    pub page: Page,
    pub data_dir: Option<PathBuf>,
    /// Time left before a requested refresh fires.
    pub refresh_remaining: Option<Duration>,
    pub status: String,
    pub has_report: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            page: Page::UserAnalysis,
            data_dir: None,
            refresh_remaining: None,
            status: "Ready".to_string(),
            has_report: false,
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("📊 Remit Insights")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Business Intelligence Dashboard")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Navigation =====
        ui.label(RichText::new("🧭 Navigation").size(14.0).strong());
        ui.add_space(5.0);

        ComboBox::from_id_salt("page_select")
            .width(220.0)
            .selected_text(self.page.title())
            .show_ui(ui, |ui| {
                for page in Page::ALL {
                    if ui.selectable_label(self.page == page, page.title()).clicked()
                        && self.page != page
                    {
                        self.page = page;
                        action = ControlPanelAction::PageChanged(page);
                    }
                }
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Data Source =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let dir_text = self
                        .data_dir
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "Configured paths".to_string());

                    ui.label(RichText::new(&dir_text).size(12.0).color(
                        if self.data_dir.is_some() {
                            Color32::WHITE
                        } else {
                            Color32::GRAY
                        },
                    ));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂 Browse").clicked() {
                            action = ControlPanelAction::BrowseDataDir;
                        }
                    });
                });
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Actions =====
        ui.vertical_centered(|ui| {
            let pending = self.refresh_remaining.is_some();
            ui.add_enabled_ui(!pending, |ui| {
                let button = egui::Button::new(RichText::new("🔄 Refresh Now").size(16.0))
                    .min_size(egui::vec2(200.0, 35.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::Refresh;
                }
            });
            ui.label(
                RichText::new(format!(
                    "Refresh interval: {} s",
                    self.page.refresh_interval().as_secs()
                ))
                .size(11.0)
                .color(Color32::GRAY),
            );

            if let Some(remaining) = self.refresh_remaining {
                let total = self.page.refresh_interval().as_secs_f32();
                let done = 1.0 - remaining.as_secs_f32() / total;
                ui.add(
                    egui::ProgressBar::new(done.clamp(0.0, 1.0))
                        .text(format!("Refreshing in {} s", remaining.as_secs() + 1))
                        .animate(true),
                );
            }

            ui.add_space(8.0);

            ui.add_enabled_ui(self.has_report, |ui| {
                let export_button = egui::Button::new(RichText::new("📄 Export CSV").size(14.0))
                    .min_size(egui::vec2(150.0, 30.0));
                if ui.add(export_button).clicked() {
                    action = ControlPanelAction::Export;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Status =====
        ui.label(RichText::new("📊 Status").size(14.0).strong());
        ui.add_space(5.0);

        let status_color = if self.status.starts_with("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.starts_with("Exported") || self.status.starts_with("Rendered") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    PageChanged(Page),
    BrowseDataDir,
    Refresh,
    Export,
}
