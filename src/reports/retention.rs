//! Retention/Cohort Aggregator
//! Distinct active users per day, week and month, transaction-volume
//! segmentation, and the daily volume growth table.

use crate::data::TransactionRecord;
use crate::reports::{date_labels, NamedTable, ReportTables};
use crate::stats::StatsCalculator;
use chrono::{Datelike, Duration, NaiveDate};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Row offsets used as "week" and "month" by the growth columns.
pub const WEEK_ROWS: usize = 7;
pub const MONTH_ROWS: usize = 30;

/// Transaction-count ranges, upper bound inclusive. `None` is unbounded.
pub const SEGMENTS: [(&str, usize, Option<usize>); 5] = [
    ("1-3", 1, Some(3)),
    ("4-5", 4, Some(5)),
    ("6-10", 6, Some(10)),
    ("11-20", 11, Some(20)),
    ("20+", 21, None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    /// ISO week, starting Monday.
    Week,
    Month,
}

impl Granularity {
    /// First day of the bucket containing `date`.
    pub fn bucket(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Day => date,
            Granularity::Week => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            Granularity::Month => date.with_day(1).unwrap_or(date),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Granularity::Day => "Date",
            Granularity::Week => "Week",
            Granularity::Month => "Month",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveUsers {
    pub period_start: NaiveDate,
    pub active_users: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentCount {
    pub category: &'static str,
    pub users: usize,
}

/// One row of the daily volume table.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub total_volume: f64,
    pub transaction_count: usize,
    /// Change against 7 rows earlier; rows are days present in the data.
    pub wow_growth: Option<f64>,
    /// Change against 30 rows earlier.
    pub mom_growth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetentionReport {
    pub daily: Vec<ActiveUsers>,
    pub weekly: Vec<ActiveUsers>,
    pub monthly: Vec<ActiveUsers>,
    pub segments: Vec<SegmentCount>,
    pub volume_trend: Vec<DailyVolume>,
}

impl RetentionReport {
    pub fn compute(transactions: &[TransactionRecord]) -> Self {
        Self {
            daily: active_users(transactions, Granularity::Day),
            weekly: active_users(transactions, Granularity::Week),
            monthly: active_users(transactions, Granularity::Month),
            segments: segment_users(transactions),
            volume_trend: daily_volume(transactions),
        }
    }
}

/// Distinct transacting users per bucket, in bucket order.
pub fn active_users(transactions: &[TransactionRecord], granularity: Granularity) -> Vec<ActiveUsers> {
    let mut buckets: BTreeMap<NaiveDate, HashSet<&str>> = BTreeMap::new();
    for txn in transactions {
        buckets
            .entry(granularity.bucket(txn.date_created.date()))
            .or_default()
            .insert(txn.user_id.as_str());
    }

    buckets
        .into_iter()
        .map(|(period_start, users)| ActiveUsers {
            period_start,
            active_users: users.len(),
        })
        .collect()
}

/// Segment label for a user's total transaction count.
pub fn segment_for(count: usize) -> Option<&'static str> {
    SEGMENTS
        .iter()
        .find(|(_, low, high)| count >= *low && high.map_or(true, |h| count <= h))
        .map(|(label, _, _)| *label)
}

/// Users per transaction-count segment, every segment listed in range order.
pub fn segment_users(transactions: &[TransactionRecord]) -> Vec<SegmentCount> {
    let mut per_user: HashMap<&str, usize> = HashMap::new();
    for txn in transactions {
        *per_user.entry(txn.user_id.as_str()).or_default() += 1;
    }

    let mut tally: HashMap<&'static str, usize> = HashMap::new();
    for count in per_user.into_values() {
        if let Some(label) = segment_for(count) {
            *tally.entry(label).or_default() += 1;
        }
    }

    SEGMENTS
        .iter()
        .map(|(label, _, _)| SegmentCount {
            category: label,
            users: tally.get(label).copied().unwrap_or(0),
        })
        .collect()
}

/// Send volume and transaction count per calendar day present in the data,
/// with 7- and 30-row percent change of the volume.
pub fn daily_volume(transactions: &[TransactionRecord]) -> Vec<DailyVolume> {
    let mut days: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for txn in transactions {
        let entry = days.entry(txn.date_created.date()).or_default();
        entry.0 += txn.send_amount.unwrap_or(0.0);
        entry.1 += 1;
    }

    let volumes: Vec<f64> = days.values().map(|(volume, _)| *volume).collect();
    let wow = StatsCalculator::pct_change(&volumes, WEEK_ROWS);
    let mom = StatsCalculator::pct_change(&volumes, MONTH_ROWS);

    days.into_iter()
        .zip(wow.into_iter().zip(mom))
        .map(|((date, (total_volume, transaction_count)), (wow_growth, mom_growth))| {
            DailyVolume {
                date,
                total_volume,
                transaction_count,
                wow_growth,
                mom_growth,
            }
        })
        .collect()
}

pub(crate) fn active_users_frame(
    series: &[ActiveUsers],
    granularity: Granularity,
) -> PolarsResult<DataFrame> {
    let periods = date_labels(series.iter().map(|a| &a.period_start));
    let counts: Vec<u64> = series.iter().map(|a| a.active_users as u64).collect();

    DataFrame::new(vec![
        Column::new(granularity.label().into(), periods),
        Column::new("Active Users".into(), counts),
    ])
}

pub(crate) fn volume_trend_frame(trend: &[DailyVolume]) -> PolarsResult<DataFrame> {
    let dates = date_labels(trend.iter().map(|d| &d.date));
    let volume: Vec<f64> = trend.iter().map(|d| d.total_volume).collect();
    let count: Vec<u64> = trend.iter().map(|d| d.transaction_count as u64).collect();
    let wow: Vec<Option<f64>> = trend.iter().map(|d| d.wow_growth).collect();
    let mom: Vec<Option<f64>> = trend.iter().map(|d| d.mom_growth).collect();

    DataFrame::new(vec![
        Column::new("Transaction Date".into(), dates),
        Column::new("Total Volume".into(), volume),
        Column::new("Transaction Count".into(), count),
        Column::new("WoWGrowth".into(), wow),
        Column::new("MoMGrowth".into(), mom),
    ])
}

impl ReportTables for RetentionReport {
    fn tables(&self) -> PolarsResult<Vec<NamedTable>> {
        let categories: Vec<&str> = self.segments.iter().map(|s| s.category).collect();
        let users: Vec<u64> = self.segments.iter().map(|s| s.users as u64).collect();
        let segments = DataFrame::new(vec![
            Column::new("Transaction Volume Category".into(), categories),
            Column::new("User Count".into(), users),
        ])?;

        Ok(vec![
            NamedTable::new("daily_active_users", active_users_frame(&self.daily, Granularity::Day)?),
            NamedTable::new("weekly_active_users", active_users_frame(&self.weekly, Granularity::Week)?),
            NamedTable::new("monthly_active_users", active_users_frame(&self.monthly, Granularity::Month)?),
            NamedTable::new("segmentation", segments),
            NamedTable::new("volume_growth", volume_trend_frame(&self.volume_trend)?),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(user_id: &str, date: &str, amount: f64) -> TransactionRecord {
        TransactionRecord {
            id: format!("{}-{}", user_id, date),
            user_id: user_id.to_string(),
            send_currency: Some("CAD".to_string()),
            receive_currency: Some("NGN".to_string()),
            send_amount: Some(amount),
            base_amount: Some(amount),
            date_created: NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            narration: "Unspecified".to_string(),
        }
    }

    #[test]
    fn test_daily_active_users_are_distinct() {
        let transactions = vec![
            txn("u1", "2024-03-04", 10.0),
            txn("u1", "2024-03-04", 15.0),
            txn("u1", "2024-03-04", 20.0),
            txn("u2", "2024-03-04", 5.0),
        ];

        let daily = active_users(&transactions, Granularity::Day);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].active_users, 2);
    }

    #[test]
    fn test_week_and_month_buckets() {
        // 2024-03-03 is a Sunday, 2024-03-04 a Monday.
        let sunday = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(
            Granularity::Week.bucket(sunday),
            NaiveDate::from_ymd_opt(2024, 2, 26).unwrap()
        );
        assert_eq!(Granularity::Week.bucket(monday), monday);
        assert_eq!(
            Granularity::Month.bucket(sunday),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );

        let transactions = vec![
            txn("u1", "2024-03-03", 1.0),
            txn("u2", "2024-03-04", 1.0),
            txn("u1", "2024-03-05", 1.0),
        ];
        let weekly = active_users(&transactions, Granularity::Week);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[1].active_users, 2);

        let monthly = active_users(&transactions, Granularity::Month);
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].active_users, 2);
    }

    #[test]
    fn test_offset_timestamp_near_midnight_keeps_month() {
        let stamp = crate::data::schema::parse_timestamp("2024-03-01 00:30:00+01:00").unwrap();
        let march = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(Granularity::Day.bucket(stamp.date()), march);
        assert_eq!(Granularity::Month.bucket(stamp.date()), march);

        let mut late = txn("u1", "2024-03-01", 1.0);
        late.date_created = stamp;
        let monthly = active_users(&[late], Granularity::Month);
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly[0].period_start, march);
    }

    #[test]
    fn test_segment_boundaries() {
        assert_eq!(segment_for(0), None);
        assert_eq!(segment_for(1), Some("1-3"));
        assert_eq!(segment_for(3), Some("1-3"));
        assert_eq!(segment_for(4), Some("4-5"));
        assert_eq!(segment_for(10), Some("6-10"));
        assert_eq!(segment_for(20), Some("11-20"));
        assert_eq!(segment_for(21), Some("20+"));
    }

    #[test]
    fn test_segment_users_lists_every_range() {
        let mut transactions: Vec<TransactionRecord> =
            (0..3).map(|_| txn("u1", "2024-01-01", 1.0)).collect();
        transactions.extend((0..4).map(|_| txn("u2", "2024-01-01", 1.0)));

        let segments = segment_users(&transactions);
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[0].users, 1);
        assert_eq!(segments[1].users, 1);
        assert!(segments[2..].iter().all(|s| s.users == 0));
    }

    #[test]
    fn test_daily_volume_growth_uses_row_offsets() {
        // Eight distinct days with a gap: row 7 compares against row 0.
        let days = [
            "2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04",
            "2024-01-05", "2024-01-06", "2024-01-08", "2024-01-20",
        ];
        let transactions: Vec<TransactionRecord> = days
            .iter()
            .enumerate()
            .map(|(i, d)| txn("u1", d, if i == 7 { 150.0 } else { 100.0 }))
            .collect();

        let trend = daily_volume(&transactions);
        assert_eq!(trend.len(), 8);
        assert!(trend[..7].iter().all(|d| d.wow_growth.is_none()));
        assert_eq!(trend[7].wow_growth, Some(50.0));
        assert!(trend.iter().all(|d| d.mom_growth.is_none()));
    }
}
