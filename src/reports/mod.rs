//! Reports module - one aggregator per dashboard page

pub mod funnel;
pub mod kyc;
pub mod retention;
pub mod transactions;
pub mod users;

use crate::config::DataPaths;
use crate::data::{DataProcessor, LoaderError, ProcessorError, TableCache};
use chrono::{Datelike, Local, NaiveDate};
use log::info;
use polars::prelude::*;
use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use funnel::{DropOff, FunnelReport, FunnelStage, FunnelStageKind};
pub use kyc::KycReport;
pub use retention::{DailyVolume, Granularity, RetentionReport};
pub use transactions::TransactionReport;
pub use users::UserReport;

/// A report table with the name it is shown and exported under.
#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: &'static str,
    pub frame: DataFrame,
}

impl NamedTable {
    pub fn new(name: &'static str, frame: DataFrame) -> Self {
        Self { name, frame }
    }
}

/// Tabular view of a computed report.
pub trait ReportTables {
    fn tables(&self) -> PolarsResult<Vec<NamedTable>>;
}

/// Dashboard pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    UserAnalysis,
    KycStatus,
    TransactionAnalysis,
    Retention,
    Funnel,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::UserAnalysis,
        Page::KycStatus,
        Page::TransactionAnalysis,
        Page::Retention,
        Page::Funnel,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Page::UserAnalysis => "User Analysis",
            Page::KycStatus => "KYC Status Analysis",
            Page::TransactionAnalysis => "Transaction Analysis",
            Page::Retention => "Retention Analysis",
            Page::Funnel => "Funnel Analysis",
        }
    }

    /// Short name used on the command line and in export file names.
    pub fn slug(self) -> &'static str {
        match self {
            Page::UserAnalysis => "users",
            Page::KycStatus => "kyc",
            Page::TransactionAnalysis => "transactions",
            Page::Retention => "retention",
            Page::Funnel => "funnel",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Page> {
        Page::ALL.into_iter().find(|p| p.slug() == slug)
    }

    /// Delay behind the page's "Refresh Now" control.
    pub fn refresh_interval(self) -> Duration {
        let secs = match self {
            Page::UserAnalysis => 10,
            Page::KycStatus => 15,
            Page::TransactionAnalysis => 10,
            Page::Retention => 12,
            Page::Funnel => 10,
        };
        Duration::from_secs(secs)
    }

    /// Load the cleaned tables this page needs and compute its report.
    pub fn render(
        self,
        cache: &mut TableCache,
        paths: &DataPaths,
    ) -> Result<PageReport, LoaderError> {
        let report = match self {
            Page::UserAnalysis => {
                let users = cache.load_users(&paths.users)?;
                let transactions = cache.load_transactions(&paths.transactions)?;
                PageReport::Users(UserReport::compute(
                    &users,
                    &transactions,
                    Local::now().year(),
                ))
            }
            Page::KycStatus => {
                let users = cache.load_users(&paths.users)?;
                PageReport::Kyc(KycReport::compute(&users))
            }
            Page::TransactionAnalysis => {
                let transactions = cache.load_transactions(&paths.transactions)?;
                PageReport::Transactions(TransactionReport::compute(&transactions))
            }
            Page::Retention => {
                let transactions = cache.load_transactions(&paths.transactions)?;
                PageReport::Retention(RetentionReport::compute(&transactions))
            }
            Page::Funnel => {
                let users = cache.load_users(&paths.users)?;
                let transactions = cache.load_transactions(&paths.transactions)?;
                PageReport::Funnel(FunnelReport::compute(&users, &transactions))
            }
        };

        info!("rendered {}", self.title());
        Ok(report)
    }
}

/// A computed page.
#[derive(Debug, Clone)]
pub enum PageReport {
    Users(UserReport),
    Kyc(KycReport),
    Transactions(TransactionReport),
    Retention(RetentionReport),
    Funnel(FunnelReport),
}

impl PageReport {
    pub fn page(&self) -> Page {
        match self {
            PageReport::Users(_) => Page::UserAnalysis,
            PageReport::Kyc(_) => Page::KycStatus,
            PageReport::Transactions(_) => Page::TransactionAnalysis,
            PageReport::Retention(_) => Page::Retention,
            PageReport::Funnel(_) => Page::Funnel,
        }
    }

    pub fn tables(&self) -> PolarsResult<Vec<NamedTable>> {
        match self {
            PageReport::Users(r) => r.tables(),
            PageReport::Kyc(r) => r.tables(),
            PageReport::Transactions(r) => r.tables(),
            PageReport::Retention(r) => r.tables(),
            PageReport::Funnel(r) => r.tables(),
        }
    }

    /// Write every table as `<page>_<table>.csv` under `dir`.
    pub fn export(&self, dir: &Path) -> Result<Vec<PathBuf>, ProcessorError> {
        let slug = self.page().slug();
        let mut written = Vec::new();

        for mut table in self.tables()? {
            let path = dir.join(format!("{}_{}.csv", slug, table.name));
            DataProcessor::write_csv(&mut table.frame, &path)?;
            written.push(path);
        }

        info!("exported {} tables to {}", written.len(), dir.display());
        Ok(written)
    }
}

/// Count occurrences, largest first; ties keep key order.
pub(crate) fn ranked_counts<K, I>(keys: I) -> Vec<(K, usize)>
where
    K: Ord + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut counts: HashMap<K, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }

    let mut ranked: Vec<(K, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

pub(crate) fn date_labels<'a, I>(dates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a NaiveDate>,
{
    dates.into_iter().map(|d| d.format("%Y-%m-%d").to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_slugs_round_trip() {
        for page in Page::ALL {
            assert_eq!(Page::from_slug(page.slug()), Some(page));
        }
        assert_eq!(Page::from_slug("nope"), None);
    }

    #[test]
    fn test_ranked_counts() {
        let ranked = ranked_counts(["b", "a", "b", "c", "a", "b"]);
        assert_eq!(ranked, vec![("b", 3), ("a", 2), ("c", 1)]);
    }
}
