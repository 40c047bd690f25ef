//! Remit Insights Main Application
//! Main window with control panel and page viewer.

use crate::config::{DashboardConfig, DataPaths};
use crate::data::TableCache;
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use crate::reports::Page;
use egui::SidePanel;
use log::{error, info};
use std::time::Instant;

/// Main application window.
pub struct DashboardApp {
    config: DashboardConfig,
    cache: TableCache,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
    /// When a requested refresh fires.
    refresh_at: Option<Instant>,
}

impl DashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        let mut app = Self {
            config,
            cache: TableCache::new(),
            control_panel: ControlPanel::new(),
            chart_viewer: ChartViewer::new(),
            refresh_at: None,
        };
        app.render_page();
        app
    }

    /// Render the selected page from the cache. Errors leave the page empty.
    fn render_page(&mut self) {
        let page = self.control_panel.page;
        self.chart_viewer.clear();

        let rendered = page
            .render(&mut self.cache, &self.config.data)
            .map_err(|e| e.to_string())
            .and_then(|report| {
                self.chart_viewer
                    .set_report(report)
                    .map_err(|e| e.to_string())
            });

        match rendered {
            Ok(()) => {
                self.control_panel.has_report = true;
                self.control_panel
                    .set_status(format!("Rendered {}", page.title()));
            }
            Err(e) => {
                error!("failed to render {}: {}", page.title(), e);
                self.control_panel.has_report = false;
                self.control_panel.set_status(format!("Error: {}", e));
            }
        }
    }

    fn handle_page_changed(&mut self, page: Page) {
        // A pending refresh belongs to the page that requested it.
        self.refresh_at = None;
        self.control_panel.refresh_remaining = None;
        info!("switched to {}", page.title());
        self.render_page();
    }

    fn handle_browse_data_dir(&mut self) {
        if let Some(dir) = rfd::FileDialog::new().pick_folder() {
            self.config.data = DataPaths::in_dir(&dir);
            self.control_panel.data_dir = Some(dir);
            self.cache.clear();
            self.render_page();
        }
    }

    fn handle_refresh(&mut self) {
        let interval = self.control_panel.page.refresh_interval();
        self.refresh_at = Some(Instant::now() + interval);
        self.control_panel.refresh_remaining = Some(interval);
        self.control_panel
            .set_status(format!("Refreshing in {} s", interval.as_secs()));
    }

    /// Fire a due refresh: drop the cleaned tables from the cache and re-render.
    fn check_refresh(&mut self, ctx: &egui::Context) {
        let Some(due) = self.refresh_at else {
            return;
        };

        let now = Instant::now();
        if now >= due {
            self.refresh_at = None;
            self.control_panel.refresh_remaining = None;
            self.cache.invalidate(&self.config.data.users);
            self.cache.invalidate(&self.config.data.transactions);
            info!("refreshing {}", self.control_panel.page.title());
            self.render_page();
        } else {
            self.control_panel.refresh_remaining = Some(due - now);
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }
    }

    fn handle_export(&mut self) {
        let Some(report) = &self.chart_viewer.report else {
            self.control_panel.set_status("Error: nothing to export");
            return;
        };

        let dir = match rfd::FileDialog::new()
            .set_directory(self.config.export_dir())
            .pick_folder()
        {
            Some(dir) => dir,
            None => return,
        };

        match report.export(&dir) {
            Ok(paths) => {
                self.control_panel.set_status(format!(
                    "Exported {} tables to {}",
                    paths.len(),
                    dir.display()
                ));
            }
            Err(e) => {
                error!("export failed: {}", e);
                self.control_panel.set_status(format!("Error: {}", e));
            }
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_refresh(ctx);

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(280.0)
            .max_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::PageChanged(page) => self.handle_page_changed(page),
                        ControlPanelAction::BrowseDataDir => self.handle_browse_data_dir(),
                        ControlPanelAction::Refresh => {
                            if self.refresh_at.is_none() {
                                self.handle_refresh();
                                ctx.request_repaint();
                            }
                        }
                        ControlPanelAction::Export => self.handle_export(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Page Viewer
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ui);
        });
    }
}
