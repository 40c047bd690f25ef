//! KYC Status Aggregator

use crate::data::{KycStatus, UserRecord};
use crate::reports::{date_labels, ranked_counts, NamedTable, ReportTables};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct StatusCount {
    pub status: KycStatus,
    pub users: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusTrendPoint {
    pub date: NaiveDate,
    pub status: KycStatus,
    pub users: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KycReport {
    /// Largest first; ties in status-code order.
    pub distribution: Vec<StatusCount>,
    /// Sign-ups per (creation day, status), ordered by day then label.
    pub trend: Vec<StatusTrendPoint>,
}

impl KycReport {
    pub fn compute(users: &[UserRecord]) -> Self {
        let distribution = ranked_counts(users.iter().map(|u| u.kyc_status))
            .into_iter()
            .map(|(status, users)| StatusCount { status, users })
            .collect();

        let mut per_day: BTreeMap<(NaiveDate, &'static str), (KycStatus, usize)> = BTreeMap::new();
        for user in users {
            let key = (user.date_created.date(), user.kyc_status.label());
            per_day.entry(key).or_insert((user.kyc_status, 0)).1 += 1;
        }

        let trend = per_day
            .into_iter()
            .map(|((date, _), (status, users))| StatusTrendPoint {
                date,
                status,
                users,
            })
            .collect();

        Self {
            distribution,
            trend,
        }
    }

    pub fn total(&self) -> usize {
        self.distribution.iter().map(|s| s.users).sum()
    }

    pub fn count(&self, status: KycStatus) -> usize {
        self.distribution
            .iter()
            .find(|s| s.status == status)
            .map_or(0, |s| s.users)
    }
}

impl ReportTables for KycReport {
    fn tables(&self) -> PolarsResult<Vec<NamedTable>> {
        let labels: Vec<&str> = self.distribution.iter().map(|s| s.status.label()).collect();
        let counts: Vec<u64> = self.distribution.iter().map(|s| s.users as u64).collect();
        let distribution = DataFrame::new(vec![
            Column::new("KycStatus".into(), labels),
            Column::new("Count".into(), counts),
        ])?;

        let dates = date_labels(self.trend.iter().map(|p| &p.date));
        let labels: Vec<&str> = self.trend.iter().map(|p| p.status.label()).collect();
        let counts: Vec<u64> = self.trend.iter().map(|p| p.users as u64).collect();
        let trend = DataFrame::new(vec![
            Column::new("Date".into(), dates),
            Column::new("KycStatus".into(), labels),
            Column::new("Count".into(), counts),
        ])?;

        Ok(vec![
            NamedTable::new("distribution", distribution),
            NamedTable::new("trend", trend),
        ])
    }
}
