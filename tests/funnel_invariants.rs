//! Property tests for the funnel and retention aggregators.

use chrono::NaiveDate;
use proptest::prelude::*;
use remit_insights::data::{KycStatus, TransactionRecord, UserRecord};
use remit_insights::reports::retention::{segment_for, segment_users, SEGMENTS};
use remit_insights::reports::{DropOff, FunnelReport};

fn user(i: usize, completed: bool, verified: bool) -> UserRecord {
    UserRecord {
        id: format!("u{i}"),
        user_name: None,
        completed_profile: completed,
        is_kyc_verified: verified,
        kyc_status: KycStatus::from_code(Some(if verified { 3 } else { 2 })),
        date_created: NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date"),
        date_of_birth: None,
        gender: None,
        residence_country: None,
        state: None,
        occupation: None,
    }
}

fn txn(user_id: &str, n: usize) -> TransactionRecord {
    TransactionRecord {
        id: format!("{user_id}-t{n}"),
        user_id: user_id.to_string(),
        send_currency: Some("CAD".to_string()),
        receive_currency: Some("NGN".to_string()),
        send_amount: Some(1.0),
        base_amount: Some(1.0),
        date_created: NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date"),
        narration: "Unspecified".to_string(),
    }
}

/// (completed, verified, transaction count) per user, plus dangling transactions.
fn population() -> impl Strategy<Value = (Vec<(bool, bool, usize)>, usize)> {
    (
        prop::collection::vec((any::<bool>(), any::<bool>(), 0usize..6), 0..40),
        0usize..5,
    )
}

fn build(profiles: &[(bool, bool, usize)], dangling: usize) -> (Vec<UserRecord>, Vec<TransactionRecord>) {
    let users: Vec<UserRecord> = profiles
        .iter()
        .enumerate()
        .map(|(i, &(completed, verified, _))| user(i, completed, verified))
        .collect();
    let mut transactions: Vec<TransactionRecord> = profiles
        .iter()
        .enumerate()
        .flat_map(|(i, &(_, _, count))| (0..count).map(move |n| txn(&format!("u{i}"), n)))
        .collect();
    transactions.extend((0..dangling).map(|n| txn("ghost", n)));
    (users, transactions)
}

proptest! {
    #[test]
    fn funnel_stage_counts_are_bounded((profiles, dangling) in population()) {
        let (users, transactions) = build(&profiles, dangling);
        let report = FunnelReport::compute(&users, &transactions);
        let counts: Vec<usize> = report.stages.iter().map(|s| s.users).collect();

        prop_assert_eq!(counts[0], users.len());
        prop_assert!(counts[0] >= counts[1]);
        prop_assert!(counts[0] >= counts[2]);
        // Transacting users are drawn from verified users here.
        prop_assert!(counts[3] <= counts[2]);
    }

    #[test]
    fn funnel_rates_are_finite_percentages((profiles, dangling) in population()) {
        let (users, transactions) = build(&profiles, dangling);
        let report = FunnelReport::compute(&users, &transactions);

        prop_assert_eq!(report.stages[0].drop_off, DropOff::NoDropOff);
        for stage in &report.stages[1..3] {
            let drop = stage.drop_off.percent().unwrap_or(f64::NAN);
            prop_assert!(stage.conversion_rate.is_finite());
            prop_assert!(drop.is_finite());
            prop_assert!((0.0..=100.0).contains(&drop));
        }
        for stage in &report.stages {
            prop_assert!((0.0..=100.0).contains(&stage.conversion_rate));
        }
        prop_assert_eq!(report.stages[3].drop_off.percent(), Some(100.0));
    }

    #[test]
    fn every_positive_count_has_one_segment(count in 1usize..500) {
        let label = segment_for(count);
        prop_assert!(label.is_some());
        let matching = SEGMENTS
            .iter()
            .filter(|(_, low, high)| count >= *low && high.map_or(true, |h| count <= h))
            .count();
        prop_assert_eq!(matching, 1);
    }

    #[test]
    fn segments_cover_every_transacting_user((profiles, dangling) in population()) {
        let (_, transactions) = build(&profiles, dangling);
        let transacting = profiles.iter().filter(|(_, _, n)| *n > 0).count()
            + usize::from(dangling > 0);

        let segments = segment_users(&transactions);
        prop_assert_eq!(segments.len(), SEGMENTS.len());
        prop_assert_eq!(segments.iter().map(|s| s.users).sum::<usize>(), transacting);
    }
}
