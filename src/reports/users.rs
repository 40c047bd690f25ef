//! User Aggregator
//! Key metrics, verification sign-up trend, demographics and average
//! daily volume per user.

use crate::data::{TransactionRecord, UserRecord};
use crate::reports::{date_labels, ranked_counts, NamedTable, ReportTables};
use crate::stats::StatsCalculator;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Age groups with inclusive upper bounds; lower bounds are exclusive.
pub const AGE_GROUPS: [(&str, i32, i32); 7] = [
    ("<18", 0, 17),
    ("18-25", 17, 25),
    ("26-35", 25, 35),
    ("36-45", 35, 45),
    ("46-55", 45, 55),
    ("56-65", 55, 65),
    ("65+", 65, 100),
];

const WEEK_ROWS: usize = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct DailySignups {
    pub date: NaiveDate,
    pub verified: usize,
    pub non_verified: usize,
    pub verified_wow_growth: Option<f64>,
    pub non_verified_wow_growth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelCount {
    pub label: String,
    pub users: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyAverageVolume {
    pub date: NaiveDate,
    pub average_per_user: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserReport {
    pub total_users: usize,
    /// Display names shared by more than one distinct id.
    pub multiple_accounts: usize,
    pub signups: Vec<DailySignups>,
    /// Every group in age order, including empty ones.
    pub age_groups: Vec<LabelCount>,
    pub genders: Vec<LabelCount>,
    pub states: Vec<LabelCount>,
    pub average_volume: Vec<DailyAverageVolume>,
}

impl UserReport {
    /// `reference_year` is the year ages are computed against.
    pub fn compute(
        users: &[UserRecord],
        transactions: &[TransactionRecord],
        reference_year: i32,
    ) -> Self {
        let total_users = users.iter().map(|u| u.id.as_str()).collect::<HashSet<_>>().len();

        Self {
            total_users,
            multiple_accounts: multiple_accounts(users),
            signups: daily_signups(users),
            age_groups: age_distribution(users, reference_year),
            genders: label_counts(users.iter().filter_map(|u| u.gender.as_deref())),
            states: label_counts(users.iter().filter_map(|u| u.state.as_deref())),
            average_volume: daily_average_volume(transactions),
        }
    }
}

pub fn multiple_accounts(users: &[UserRecord]) -> usize {
    let mut ids_per_name: HashMap<&str, HashSet<&str>> = HashMap::new();
    for user in users {
        if let Some(name) = user.user_name.as_deref() {
            ids_per_name.entry(name).or_default().insert(user.id.as_str());
        }
    }
    ids_per_name.values().filter(|ids| ids.len() > 1).count()
}

/// Verified and non-verified sign-ups per creation day.
pub fn daily_signups(users: &[UserRecord]) -> Vec<DailySignups> {
    let mut days: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    for user in users {
        let entry = days.entry(user.date_created.date()).or_default();
        if user.is_kyc_verified {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    let verified: Vec<f64> = days.values().map(|(v, _)| *v as f64).collect();
    let non_verified: Vec<f64> = days.values().map(|(_, n)| *n as f64).collect();
    let verified_growth = StatsCalculator::pct_change(&verified, WEEK_ROWS);
    let non_verified_growth = StatsCalculator::pct_change(&non_verified, WEEK_ROWS);

    days.into_iter()
        .zip(verified_growth.into_iter().zip(non_verified_growth))
        .map(|((date, (verified, non_verified)), (vg, ng))| DailySignups {
            date,
            verified,
            non_verified,
            verified_wow_growth: vg,
            non_verified_wow_growth: ng,
        })
        .collect()
}

pub fn age_group(age: i32) -> Option<&'static str> {
    AGE_GROUPS
        .iter()
        .find(|(_, low, high)| age > *low && age <= *high)
        .map(|(label, _, _)| *label)
}

pub fn age_distribution(users: &[UserRecord], reference_year: i32) -> Vec<LabelCount> {
    let mut tally: HashMap<&'static str, usize> = HashMap::new();
    for dob in users.iter().filter_map(|u| u.date_of_birth) {
        if let Some(group) = age_group(reference_year - dob.year()) {
            *tally.entry(group).or_default() += 1;
        }
    }

    AGE_GROUPS
        .iter()
        .map(|(label, _, _)| LabelCount {
            label: label.to_string(),
            users: tally.get(label).copied().unwrap_or(0),
        })
        .collect()
}

fn label_counts<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<LabelCount> {
    ranked_counts(labels)
        .into_iter()
        .map(|(label, users)| LabelCount {
            label: label.to_string(),
            users,
        })
        .collect()
}

/// Per day: sum `BaseAmount` per user, then average across that day's users.
pub fn daily_average_volume(transactions: &[TransactionRecord]) -> Vec<DailyAverageVolume> {
    let mut per_user: BTreeMap<NaiveDate, HashMap<&str, f64>> = BTreeMap::new();
    for txn in transactions {
        *per_user
            .entry(txn.date_created.date())
            .or_default()
            .entry(txn.user_id.as_str())
            .or_default() += txn.base_amount.unwrap_or(0.0);
    }

    per_user
        .into_iter()
        .map(|(date, totals)| {
            let sums: Vec<f64> = totals.into_values().collect();
            DailyAverageVolume {
                date,
                average_per_user: StatsCalculator::mean(&sums),
            }
        })
        .collect()
}

fn label_frame(header: &str, rows: &[LabelCount]) -> PolarsResult<DataFrame> {
    let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
    let counts: Vec<u64> = rows.iter().map(|r| r.users as u64).collect();
    DataFrame::new(vec![
        Column::new(header.into(), labels),
        Column::new("Count".into(), counts),
    ])
}

impl ReportTables for UserReport {
    fn tables(&self) -> PolarsResult<Vec<NamedTable>> {
        let metrics = DataFrame::new(vec![
            Column::new(
                "Metric".into(),
                vec!["Total Users", "Users with Multiple Accounts"],
            ),
            Column::new(
                "Value".into(),
                vec![self.total_users as u64, self.multiple_accounts as u64],
            ),
        ])?;

        let dates = date_labels(self.signups.iter().map(|s| &s.date));
        let verified: Vec<u64> = self.signups.iter().map(|s| s.verified as u64).collect();
        let non_verified: Vec<u64> = self.signups.iter().map(|s| s.non_verified as u64).collect();
        let vg: Vec<Option<f64>> = self.signups.iter().map(|s| s.verified_wow_growth).collect();
        let ng: Vec<Option<f64>> = self.signups.iter().map(|s| s.non_verified_wow_growth).collect();
        let signups = DataFrame::new(vec![
            Column::new("DateCreated".into(), dates),
            Column::new("Verified".into(), verified),
            Column::new("Non-Verified".into(), non_verified),
            Column::new("Verified WoW Growth".into(), vg),
            Column::new("Non-Verified WoW Growth".into(), ng),
        ])?;

        let dates = date_labels(self.average_volume.iter().map(|a| &a.date));
        let averages: Vec<f64> = self.average_volume.iter().map(|a| a.average_per_user).collect();
        let average_volume = DataFrame::new(vec![
            Column::new("DateCreated".into(), dates),
            Column::new("BaseAmount".into(), averages),
        ])?;

        Ok(vec![
            NamedTable::new("metrics", metrics),
            NamedTable::new("verification_trend", signups),
            NamedTable::new("age_distribution", label_frame("AgeGroup", &self.age_groups)?),
            NamedTable::new("gender_distribution", label_frame("Gender", &self.genders)?),
            NamedTable::new("state_distribution", label_frame("State", &self.states)?),
            NamedTable::new("daily_average_volume", average_volume),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::KycStatus;

    fn user(id: &str, name: &str, verified: bool, day: u32, birth_year: Option<i32>) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            user_name: Some(name.to_string()),
            completed_profile: true,
            is_kyc_verified: verified,
            kyc_status: KycStatus::from_code(Some(if verified { 3 } else { 1 })),
            date_created: NaiveDate::from_ymd_opt(2024, 6, day)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            date_of_birth: birth_year.and_then(|y| NaiveDate::from_ymd_opt(y, 7, 1)),
            gender: Some(if id.len() % 2 == 0 { "Male" } else { "Female" }.to_string()),
            residence_country: Some("Nigeria".to_string()),
            state: Some("Lagos State".to_string()),
            occupation: None,
        }
    }

    fn txn(user_id: &str, day: u32, base: f64) -> TransactionRecord {
        TransactionRecord {
            id: format!("{}-{}-{}", user_id, day, base),
            user_id: user_id.to_string(),
            send_currency: Some("CAD".to_string()),
            receive_currency: Some("NGN".to_string()),
            send_amount: Some(base),
            base_amount: Some(base),
            date_created: NaiveDate::from_ymd_opt(2024, 6, day)
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
            narration: "Unspecified".to_string(),
        }
    }

    #[test]
    fn test_key_metrics() {
        let users = vec![
            user("1", "ada", true, 1, None),
            user("2", "ada", false, 1, None),
            user("3", "bola", true, 2, None),
        ];
        let report = UserReport::compute(&users, &[], 2024);
        assert_eq!(report.total_users, 3);
        assert_eq!(report.multiple_accounts, 1);
        assert_eq!(report.states[0].label, "Lagos State");
        assert_eq!(report.states[0].users, 3);
    }

    #[test]
    fn test_daily_signups_split_by_verification() {
        let users = vec![
            user("1", "a", true, 1, None),
            user("2", "b", false, 1, None),
            user("3", "c", false, 1, None),
            user("4", "d", true, 3, None),
        ];
        let signups = daily_signups(&users);
        assert_eq!(signups.len(), 2);
        assert_eq!((signups[0].verified, signups[0].non_verified), (1, 2));
        assert_eq!((signups[1].verified, signups[1].non_verified), (1, 0));
        assert!(signups.iter().all(|s| s.verified_wow_growth.is_none()));
    }

    #[test]
    fn test_age_groups_are_right_inclusive() {
        assert_eq!(age_group(0), None);
        assert_eq!(age_group(17), Some("<18"));
        assert_eq!(age_group(18), Some("18-25"));
        assert_eq!(age_group(25), Some("18-25"));
        assert_eq!(age_group(65), Some("56-65"));
        assert_eq!(age_group(100), Some("65+"));
        assert_eq!(age_group(101), None);

        let users = vec![
            user("1", "a", true, 1, Some(2000)),
            user("2", "b", true, 1, Some(1999)),
            user("3", "c", true, 1, None),
            user("4", "d", true, 1, Some(1900)),
        ];
        let dist = age_distribution(&users, 2024);
        assert_eq!(dist.len(), 7);
        assert_eq!(dist[1].label, "18-25");
        assert_eq!(dist[1].users, 2);
        assert_eq!(dist.iter().map(|d| d.users).sum::<usize>(), 2);
    }

    #[test]
    fn test_daily_average_volume_per_user() {
        let transactions = vec![
            txn("u1", 1, 100.0),
            txn("u1", 1, 50.0),
            txn("u2", 1, 50.0),
            txn("u2", 2, 10.0),
        ];
        let averages = daily_average_volume(&transactions);
        assert_eq!(averages.len(), 2);
        assert_eq!(averages[0].average_per_user, 100.0);
        assert_eq!(averages[1].average_per_user, 10.0);
    }
}
