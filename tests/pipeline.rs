//! End-to-end: raw exports -> preprocessing -> every page -> CSV export.

use remit_insights::config::{DashboardConfig, DataPaths};
use remit_insights::data::{DataProcessor, TableCache};
use remit_insights::reports::{FunnelStageKind, Page, PageReport};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const RAW_USERS: &str = "\
Id,UserName,CompletedProfile,IsKYCVerified,KycStatus,DateCreated,DateOfBirth,Gender,ResidenceCountry,State,Occupation,ReferralCode,ReferredBy
u1,ada,True,True,3.0,2024-01-01 09:00:00,1990-05-04,Female,Nigeria,lagos,software engineer,R1,
u2,ada,True,True,3,2024-01-01 10:15:00,1985-01-20,Male,Nigeria,Abuja,,R2,u1
u3,bola,False,False,1,2024-01-02 12:00:00,,Male,Nigeria,,trader,R3,
u4,chi,True,False,,2024-01-09 08:30:00,2001-11-11,Female,Nigeria,ENUGU STATE,nurse,R4,u2
";

const RAW_TRANSACTIONS: &str = "\
Id,UserId,SendCurrencyId,ReceiveCurrencyId,SendAmount,BaseAmount,DateCreated,Narration
t1,u1,CAD,NGN,100.00,100.00,2024-01-03 10:00:00,rent
t2,u1,CAD,NGN,50.00,50.00,2024-01-03 18:00:00,
t3,u3,GBP,NGN,200.00,340.00,2024-02-10 08:00:00,school fees
t4,,CAD,GHS,10.00,10.00,2024-02-11 08:00:00,gift
";

fn write_raw(dir: &Path) -> DataPaths {
    let paths = DataPaths::in_dir(dir);
    fs::create_dir_all(dir.join("raw")).expect("raw dir");
    fs::write(&paths.raw_users, RAW_USERS).expect("raw users");
    fs::write(&paths.raw_transactions, RAW_TRANSACTIONS).expect("raw transactions");
    paths
}

#[test]
fn preprocessing_twice_is_byte_identical() {
    let dir = tempdir().expect("tempdir");
    let paths = write_raw(dir.path());

    let mut cache = TableCache::new();
    let summary = DataProcessor::run(&mut cache, &paths).expect("first run");
    assert_eq!(summary.users_in, 4);
    assert_eq!(summary.users_out, 4);
    assert_eq!(summary.transactions_in, 4);
    assert_eq!(summary.transactions_out, 3);

    let users_a = fs::read(&paths.users).expect("users a");
    let txns_a = fs::read(&paths.transactions).expect("transactions a");

    let mut fresh = TableCache::new();
    DataProcessor::run(&mut fresh, &paths).expect("second run");
    assert_eq!(users_a, fs::read(&paths.users).expect("users b"));
    assert_eq!(txns_a, fs::read(&paths.transactions).expect("transactions b"));

    let users_text = String::from_utf8(users_a).expect("utf8");
    assert!(!users_text.contains("ReferralCode"));
    assert!(users_text.contains("Federal Capital Territory"));
    assert!(users_text.contains("Enugu State"));
    assert!(users_text.contains("Software Engineer"));
}

#[test]
fn every_page_renders_from_cleaned_files() {
    let dir = tempdir().expect("tempdir");
    let paths = write_raw(dir.path());
    let mut cache = TableCache::new();
    DataProcessor::run(&mut cache, &paths).expect("preprocess");

    for page in Page::ALL {
        let report = page.render(&mut cache, &paths).expect("render");
        assert_eq!(report.page(), page);
        let tables = report.tables().expect("tables");
        assert!(!tables.is_empty(), "{} has no tables", page.title());
    }

    // Both cleaned files were read once and then served from the cache.
    assert!(cache.is_cached(&paths.users));
    assert!(cache.is_cached(&paths.transactions));
}

#[test]
fn funnel_page_counts_and_export() {
    let dir = tempdir().expect("tempdir");
    let paths = write_raw(dir.path());
    let mut cache = TableCache::new();
    DataProcessor::run(&mut cache, &paths).expect("preprocess");

    let report = Page::Funnel.render(&mut cache, &paths).expect("render");
    let PageReport::Funnel(funnel) = &report else {
        panic!("expected funnel report");
    };
    let counts: Vec<usize> = funnel.stages.iter().map(|s| s.users).collect();
    assert_eq!(counts, vec![4, 3, 2, 1]);
    assert_eq!(
        funnel
            .stage(FunnelStageKind::Transaction)
            .and_then(|s| s.drop_off.percent()),
        Some(100.0)
    );

    let export_dir = dir.path().join("exports");
    let written = report.export(&export_dir).expect("export");
    assert_eq!(written, vec![export_dir.join("funnel_funnel.csv")]);
    let csv = fs::read_to_string(&written[0]).expect("exported csv");
    assert!(csv.starts_with("Stage,Users,Conversion Rate,Drop Off,Drop Off Basis"));
    assert!(csv.contains("No drop off"));
}

#[test]
fn refresh_rereads_invalidated_files() {
    let dir = tempdir().expect("tempdir");
    let paths = write_raw(dir.path());
    let mut cache = TableCache::new();
    DataProcessor::run(&mut cache, &paths).expect("preprocess");

    let before = match Page::KycStatus.render(&mut cache, &paths).expect("render") {
        PageReport::Kyc(kyc) => kyc.total(),
        _ => unreachable!(),
    };
    assert_eq!(before, 4);

    // Append a user to the cleaned file; the cache still serves the old table.
    let mut text = fs::read_to_string(&paths.users).expect("cleaned users");
    let columns = text.lines().next().expect("header").split(',').count();
    let mut row = vec![""; columns];
    row[0] = "u5";
    row[1] = "eze";
    row[2] = "true";
    row[3] = "false";
    row[5] = "2024-03-01 00:00:00";
    text.push_str(&row.join(","));
    text.push('\n');
    fs::write(&paths.users, text).expect("rewrite users");

    let stale = match Page::KycStatus.render(&mut cache, &paths).expect("render") {
        PageReport::Kyc(kyc) => kyc.total(),
        _ => unreachable!(),
    };
    assert_eq!(stale, 4);

    assert!(cache.invalidate(&paths.users));
    let fresh = match Page::KycStatus.render(&mut cache, &paths).expect("render") {
        PageReport::Kyc(kyc) => kyc.total(),
        _ => unreachable!(),
    };
    assert_eq!(fresh, 5);
}

#[test]
fn missing_cleaned_file_fails_the_page() {
    let dir = tempdir().expect("tempdir");
    let config = DashboardConfig {
        data: DataPaths::in_dir(dir.path()),
        export_dir: None,
    };
    let mut cache = TableCache::new();
    assert!(Page::Retention.render(&mut cache, &config.data).is_err());
    assert!(cache.is_empty());
}
