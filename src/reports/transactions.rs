//! Transaction Aggregator
//! Key metrics, currency and corridor volume, monthly corridor growth and
//! the daily volume trend.

use crate::data::TransactionRecord;
use crate::reports::retention::{daily_volume, volume_trend_frame, Granularity};
use crate::reports::{date_labels, DailyVolume, NamedTable, ReportTables};
use crate::stats::{AmountSummary, StatsCalculator};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};

const UNKNOWN_CURRENCY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyVolume {
    pub currency: String,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorridorVolume {
    pub send_currency: String,
    pub receive_currency: String,
    pub volume: f64,
}

impl CorridorVolume {
    pub fn label(&self) -> String {
        format!("{} → {}", self.send_currency, self.receive_currency)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyCorridorVolume {
    pub month: NaiveDate,
    pub send_currency: String,
    pub receive_currency: String,
    pub volume: f64,
    /// Change against the previous month present for the same corridor.
    pub mom_growth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionReport {
    pub total_transactions: usize,
    pub total_base_value: f64,
    pub amount_summary: AmountSummary,
    pub by_currency: Vec<CurrencyVolume>,
    pub by_corridor: Vec<CorridorVolume>,
    pub monthly_corridors: Vec<MonthlyCorridorVolume>,
    pub daily_trend: Vec<DailyVolume>,
}

impl TransactionReport {
    pub fn compute(transactions: &[TransactionRecord]) -> Self {
        let base_amounts: Vec<f64> = transactions.iter().filter_map(|t| t.base_amount).collect();

        Self {
            total_transactions: transactions.len(),
            total_base_value: base_amounts.iter().sum(),
            amount_summary: StatsCalculator::summarize(&base_amounts),
            by_currency: volume_by_currency(transactions),
            by_corridor: volume_by_corridor(transactions),
            monthly_corridors: monthly_corridor_growth(transactions),
            daily_trend: daily_volume(transactions),
        }
    }
}

fn currency(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNKNOWN_CURRENCY)
}

/// Sort descending by volume; ties keep key order.
fn sort_by_volume<T>(rows: &mut [T], volume: impl Fn(&T) -> f64) {
    rows.sort_by(|a, b| {
        volume(b)
            .partial_cmp(&volume(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

pub fn volume_by_currency(transactions: &[TransactionRecord]) -> Vec<CurrencyVolume> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for txn in transactions {
        *totals.entry(currency(&txn.send_currency)).or_default() += txn.send_amount.unwrap_or(0.0);
    }

    let mut rows: Vec<CurrencyVolume> = totals
        .into_iter()
        .map(|(currency, volume)| CurrencyVolume {
            currency: currency.to_string(),
            volume,
        })
        .collect();
    sort_by_volume(&mut rows, |r| r.volume);
    rows
}

pub fn volume_by_corridor(transactions: &[TransactionRecord]) -> Vec<CorridorVolume> {
    let mut totals: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    for txn in transactions {
        let key = (currency(&txn.send_currency), currency(&txn.receive_currency));
        *totals.entry(key).or_default() += txn.send_amount.unwrap_or(0.0);
    }

    let mut rows: Vec<CorridorVolume> = totals
        .into_iter()
        .map(|((send, receive), volume)| CorridorVolume {
            send_currency: send.to_string(),
            receive_currency: receive.to_string(),
            volume,
        })
        .collect();
    sort_by_volume(&mut rows, |r| r.volume);
    rows
}

/// Send volume per (month, corridor), ordered by month then corridor.
pub fn monthly_corridor_growth(transactions: &[TransactionRecord]) -> Vec<MonthlyCorridorVolume> {
    let mut totals: BTreeMap<(NaiveDate, &str, &str), f64> = BTreeMap::new();
    for txn in transactions {
        let month = Granularity::Month.bucket(txn.date_created.date());
        let key = (month, currency(&txn.send_currency), currency(&txn.receive_currency));
        *totals.entry(key).or_default() += txn.send_amount.unwrap_or(0.0);
    }

    // Series per corridor, already in month order.
    let mut series: HashMap<(&str, &str), Vec<f64>> = HashMap::new();
    for ((_, send, receive), volume) in &totals {
        series.entry((*send, *receive)).or_default().push(*volume);
    }
    let mut growth: HashMap<(&str, &str), std::vec::IntoIter<Option<f64>>> = series
        .iter()
        .map(|(key, volumes)| (*key, StatsCalculator::pct_change(volumes, 1).into_iter()))
        .collect();

    totals
        .into_iter()
        .map(|((month, send, receive), volume)| MonthlyCorridorVolume {
            month,
            send_currency: send.to_string(),
            receive_currency: receive.to_string(),
            volume,
            mom_growth: growth
                .get_mut(&(send, receive))
                .and_then(|changes| changes.next())
                .flatten(),
        })
        .collect()
}

impl ReportTables for TransactionReport {
    fn tables(&self) -> PolarsResult<Vec<NamedTable>> {
        let s = &self.amount_summary;
        let metrics = DataFrame::new(vec![
            Column::new(
                "Metric".into(),
                vec![
                    "Total Transactions",
                    "Total Base Value",
                    "Mean",
                    "Median",
                    "Std",
                    "P05",
                    "P95",
                ],
            ),
            Column::new(
                "Value".into(),
                vec![
                    self.total_transactions as f64,
                    self.total_base_value,
                    s.mean,
                    s.median,
                    s.std,
                    s.p05,
                    s.p95,
                ],
            ),
        ])?;

        let currencies: Vec<&str> = self.by_currency.iter().map(|c| c.currency.as_str()).collect();
        let volumes: Vec<f64> = self.by_currency.iter().map(|c| c.volume).collect();
        let by_currency = DataFrame::new(vec![
            Column::new("SendCurrencyId".into(), currencies),
            Column::new("SendAmount".into(), volumes),
        ])?;

        let send: Vec<&str> = self.by_corridor.iter().map(|c| c.send_currency.as_str()).collect();
        let receive: Vec<&str> = self
            .by_corridor
            .iter()
            .map(|c| c.receive_currency.as_str())
            .collect();
        let volumes: Vec<f64> = self.by_corridor.iter().map(|c| c.volume).collect();
        let by_corridor = DataFrame::new(vec![
            Column::new("SendCurrencyId".into(), send),
            Column::new("ReceiveCurrencyId".into(), receive),
            Column::new("SendAmount".into(), volumes),
        ])?;

        let months = date_labels(self.monthly_corridors.iter().map(|m| &m.month));
        let send: Vec<&str> = self
            .monthly_corridors
            .iter()
            .map(|m| m.send_currency.as_str())
            .collect();
        let receive: Vec<&str> = self
            .monthly_corridors
            .iter()
            .map(|m| m.receive_currency.as_str())
            .collect();
        let volumes: Vec<f64> = self.monthly_corridors.iter().map(|m| m.volume).collect();
        let growth: Vec<Option<f64>> = self.monthly_corridors.iter().map(|m| m.mom_growth).collect();
        let monthly = DataFrame::new(vec![
            Column::new("Month".into(), months),
            Column::new("SendCurrencyId".into(), send),
            Column::new("ReceiveCurrencyId".into(), receive),
            Column::new("SendAmount".into(), volumes),
            Column::new("MoMGrowth".into(), growth),
        ])?;

        Ok(vec![
            NamedTable::new("metrics", metrics),
            NamedTable::new("volume_by_currency", by_currency),
            NamedTable::new("volume_by_corridor", by_corridor),
            NamedTable::new("monthly_corridor_growth", monthly),
            NamedTable::new("daily_trend", volume_trend_frame(&self.daily_trend)?),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(send: &str, receive: &str, date: &str, amount: f64) -> TransactionRecord {
        TransactionRecord {
            id: format!("{}{}{}{}", send, receive, date, amount),
            user_id: "u1".to_string(),
            send_currency: Some(send.to_string()),
            receive_currency: Some(receive.to_string()),
            send_amount: Some(amount),
            base_amount: Some(amount * 2.0),
            date_created: NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            narration: "Unspecified".to_string(),
        }
    }

    fn sample() -> Vec<TransactionRecord> {
        vec![
            txn("CAD", "NGN", "2024-01-05", 100.0),
            txn("CAD", "NGN", "2024-02-05", 150.0),
            txn("GBP", "NGN", "2024-01-10", 300.0),
            txn("CAD", "GHS", "2024-02-11", 20.0),
        ]
    }

    #[test]
    fn test_key_metrics() {
        let report = TransactionReport::compute(&sample());
        assert_eq!(report.total_transactions, 4);
        assert_eq!(report.total_base_value, 1140.0);
        assert_eq!(report.amount_summary.count, 4);
        assert_eq!(report.amount_summary.median, 250.0);
    }

    #[test]
    fn test_volume_sorted_descending() {
        let report = TransactionReport::compute(&sample());
        let currencies: Vec<(&str, f64)> = report
            .by_currency
            .iter()
            .map(|c| (c.currency.as_str(), c.volume))
            .collect();
        assert_eq!(currencies, vec![("GBP", 300.0), ("CAD", 270.0)]);

        assert_eq!(report.by_corridor[0].label(), "GBP → NGN");
        assert_eq!(report.by_corridor[1].volume, 250.0);
        assert_eq!(report.by_corridor[2].volume, 20.0);
    }

    #[test]
    fn test_monthly_corridor_growth_per_corridor() {
        let monthly = monthly_corridor_growth(&sample());
        let cad_ngn: Vec<&MonthlyCorridorVolume> = monthly
            .iter()
            .filter(|m| m.send_currency == "CAD" && m.receive_currency == "NGN")
            .collect();
        assert_eq!(cad_ngn.len(), 2);
        assert_eq!(cad_ngn[0].mom_growth, None);
        assert_eq!(cad_ngn[1].mom_growth, Some(50.0));

        // A corridor's first month has no growth even if other corridors precede it.
        let cad_ghs = monthly
            .iter()
            .find(|m| m.receive_currency == "GHS")
            .unwrap();
        assert_eq!(cad_ghs.mom_growth, None);
    }

    #[test]
    fn test_empty_input() {
        let report = TransactionReport::compute(&[]);
        assert_eq!(report.total_transactions, 0);
        assert_eq!(report.total_base_value, 0.0);
        assert!(report.by_currency.is_empty());
        assert!(report.daily_trend.is_empty());

        let tables = report.tables().unwrap();
        assert_eq!(tables.len(), 5);
        assert_eq!(tables[0].frame.height(), 7);
    }
}
