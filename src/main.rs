//! Remit Insights - user, KYC, transaction, retention and funnel dashboard.
//!
//! Usage:
//!   remit-insights                                  launch the dashboard
//!   remit-insights preprocess [--config FILE]
//!   remit-insights report <users|kyc|transactions|retention|funnel>
//!                         [--config FILE] [--export DIR]

use anyhow::{anyhow, bail, Context, Result};
use eframe::egui;
use remit_insights::config::DashboardConfig;
use remit_insights::data::{DataProcessor, TableCache};
use remit_insights::gui::DashboardApp;
use remit_insights::reports::Page;
use std::env;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config_path = flag_value(&args, "--config").map(PathBuf::from);
    let config = DashboardConfig::load(config_path.as_deref())?;

    match args.get(1).map(String::as_str) {
        Some("preprocess") => preprocess(&config),
        Some("report") => {
            let slug = args
                .get(2)
                .filter(|a| !a.starts_with("--"))
                .context("report needs a page: users, kyc, transactions, retention or funnel")?;
            let page = Page::from_slug(slug).ok_or_else(|| anyhow!("unknown page '{}'", slug))?;
            let export = flag_value(&args, "--export").map(PathBuf::from);
            report(&config, page, export.as_deref())
        }
        Some(flag) if flag.starts_with("--") => run_dashboard(config),
        None => run_dashboard(config),
        Some(other) => bail!("unknown command '{}'", other),
    }
}

fn preprocess(config: &DashboardConfig) -> Result<()> {
    let mut cache = TableCache::new();
    let summary = DataProcessor::run(&mut cache, &config.data)?;

    println!("Preprocessing complete");
    println!(
        "  users:        {} -> {} rows  ({})",
        summary.users_in,
        summary.users_out,
        config.data.users.display()
    );
    println!(
        "  transactions: {} -> {} rows  ({})",
        summary.transactions_in,
        summary.transactions_out,
        config.data.transactions.display()
    );
    Ok(())
}

fn report(config: &DashboardConfig, page: Page, export: Option<&Path>) -> Result<()> {
    let mut cache = TableCache::new();
    let rendered = page
        .render(&mut cache, &config.data)
        .with_context(|| format!("failed to render {}", page.title()))?;

    println!("{}", page.title());
    for table in rendered.tables()? {
        println!();
        println!("[{}]", table.name);
        println!("{}", table.frame);
    }

    if let Some(dir) = export {
        let written = rendered.export(dir)?;
        println!();
        for path in written {
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn run_dashboard(config: DashboardConfig) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("Remit Insights"),
        ..Default::default()
    };

    eframe::run_native(
        "Remit Insights",
        options,
        Box::new(|cc| Ok(Box::new(DashboardApp::new(cc, config)))),
    )
    .map_err(|e| anyhow!("dashboard exited with an error: {}", e))
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
