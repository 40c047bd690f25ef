//! Typed Records Module
//! Validates loaded tables and converts them into typed user and transaction rows.
//!
//! Tables arrive from the loader as text columns. Everything a report relies on is
//! parsed here once, so a malformed file fails with a row/column-specific error at
//! the load boundary instead of somewhere inside an aggregation.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("{table} table is missing required column '{column}'")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
    #[error("{table}.{column} row {row}: value is required")]
    MissingValue {
        table: &'static str,
        column: &'static str,
        row: usize,
    },
    #[error("{table}.{column} row {row}: expected {expected}, got '{value}'")]
    InvalidValue {
        table: &'static str,
        column: &'static str,
        row: usize,
        value: String,
        expected: &'static str,
    },
    #[error("Duplicate user id '{0}'")]
    DuplicateId(String),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Column names of the user export.
pub mod user_cols {
    pub const ID: &str = "Id";
    pub const USER_NAME: &str = "UserName";
    pub const COMPLETED_PROFILE: &str = "CompletedProfile";
    pub const IS_KYC_VERIFIED: &str = "IsKYCVerified";
    pub const KYC_STATUS: &str = "KycStatus";
    pub const DATE_CREATED: &str = "DateCreated";
    pub const DATE_OF_BIRTH: &str = "DateOfBirth";
    pub const GENDER: &str = "Gender";
    pub const RESIDENCE_COUNTRY: &str = "ResidenceCountry";
    pub const STATE: &str = "State";
    pub const OCCUPATION: &str = "Occupation";
    pub const REFERRAL_CODE: &str = "ReferralCode";
    pub const REFERRED_BY: &str = "ReferredBy";
}

/// Column names of the transaction export.
pub mod txn_cols {
    pub const ID: &str = "Id";
    pub const USER_ID: &str = "UserId";
    pub const SEND_CURRENCY: &str = "SendCurrencyId";
    pub const RECEIVE_CURRENCY: &str = "ReceiveCurrencyId";
    pub const SEND_AMOUNT: &str = "SendAmount";
    pub const BASE_AMOUNT: &str = "BaseAmount";
    pub const DATE_CREATED: &str = "DateCreated";
    pub const NARRATION: &str = "Narration";
}

/// Sentinel written in place of missing free-text values.
pub const UNSPECIFIED: &str = "Unspecified";

/// KYC verification status, decoded from the integer code in the user export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KycStatus {
    NotStarted,
    Pending,
    Passed,
    InReview,
    Unspecified,
    Failed,
}

impl KycStatus {
    pub const ALL: [KycStatus; 6] = [
        KycStatus::NotStarted,
        KycStatus::Pending,
        KycStatus::Passed,
        KycStatus::InReview,
        KycStatus::Unspecified,
        KycStatus::Failed,
    ];

    /// Map a raw code to a status. Unknown and missing codes are `Unspecified`.
    pub fn from_code(code: Option<i16>) -> Self {
        match code {
            Some(1) => KycStatus::NotStarted,
            Some(2) => KycStatus::Pending,
            Some(3) => KycStatus::Passed,
            Some(4) => KycStatus::InReview,
            Some(6) => KycStatus::Failed,
            _ => KycStatus::Unspecified,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            KycStatus::NotStarted => "Not Started",
            KycStatus::Pending => "Pending",
            KycStatus::Passed => "Passed",
            KycStatus::InReview => "In Review",
            KycStatus::Unspecified => "Unspecified",
            KycStatus::Failed => "Failed",
        }
    }
}

/// One row of the cleaned user table.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: String,
    /// Display name; several ids may share one.
    pub user_name: Option<String>,
    pub completed_profile: bool,
    pub is_kyc_verified: bool,
    pub kyc_status: KycStatus,
    pub date_created: NaiveDateTime,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub residence_country: Option<String>,
    pub state: Option<String>,
    pub occupation: Option<String>,
}

/// One row of the cleaned transaction table.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: String,
    pub user_id: String,
    pub send_currency: Option<String>,
    pub receive_currency: Option<String>,
    pub send_amount: Option<f64>,
    pub base_amount: Option<f64>,
    pub date_created: NaiveDateTime,
    pub narration: String,
}

impl UserRecord {
    /// Validate a user table and convert every row.
    pub fn from_frame(df: &DataFrame) -> Result<Vec<Self>, SchemaError> {
        let table = TextTable::new(df, "users");

        let ids = table.required(user_cols::ID)?;
        let names = table.required(user_cols::USER_NAME)?;
        let completed = table.required(user_cols::COMPLETED_PROFILE)?;
        let verified = table.required(user_cols::IS_KYC_VERIFIED)?;
        let statuses = table.required(user_cols::KYC_STATUS)?;
        let created = table.required(user_cols::DATE_CREATED)?;
        let births = table.optional(user_cols::DATE_OF_BIRTH)?;
        let genders = table.optional(user_cols::GENDER)?;
        let countries = table.optional(user_cols::RESIDENCE_COUNTRY)?;
        let states = table.optional(user_cols::STATE)?;
        let occupations = table.optional(user_cols::OCCUPATION)?;

        let mut seen: HashSet<String> = HashSet::with_capacity(df.height());
        let mut records = Vec::with_capacity(df.height());

        for row in 0..df.height() {
            let id = table.value(user_cols::ID, row, &ids[row])?;
            if !seen.insert(id.clone()) {
                return Err(SchemaError::DuplicateId(id));
            }

            let kyc_code = match non_blank(&statuses[row]) {
                Some(text) => Some(parse_code(text).ok_or_else(|| {
                    table.invalid(user_cols::KYC_STATUS, row, text, "integer status code")
                })?),
                None => None,
            };

            let created_text = table.value(user_cols::DATE_CREATED, row, &created[row])?;
            let date_created = parse_timestamp(&created_text).ok_or_else(|| {
                table.invalid(user_cols::DATE_CREATED, row, &created_text, "timestamp")
            })?;

            records.push(UserRecord {
                id,
                user_name: non_blank(&names[row]).map(str::to_string),
                completed_profile: table.flag(user_cols::COMPLETED_PROFILE, row, &completed[row])?,
                is_kyc_verified: table.flag(user_cols::IS_KYC_VERIFIED, row, &verified[row])?,
                kyc_status: KycStatus::from_code(kyc_code),
                date_created,
                // Unparsable birth dates count as unknown rather than failing the load.
                date_of_birth: non_blank(&births[row])
                    .and_then(parse_timestamp)
                    .map(|dt| dt.date()),
                gender: non_blank(&genders[row]).map(str::to_string),
                residence_country: non_blank(&countries[row]).map(str::to_string),
                state: non_blank(&states[row]).map(str::to_string),
                occupation: non_blank(&occupations[row]).map(str::to_string),
            });
        }

        Ok(records)
    }
}

impl TransactionRecord {
    /// Validate a transaction table and convert every row.
    pub fn from_frame(df: &DataFrame) -> Result<Vec<Self>, SchemaError> {
        let table = TextTable::new(df, "transactions");

        let ids = table.required(txn_cols::ID)?;
        let user_ids = table.required(txn_cols::USER_ID)?;
        let send_currencies = table.required(txn_cols::SEND_CURRENCY)?;
        let receive_currencies = table.required(txn_cols::RECEIVE_CURRENCY)?;
        let send_amounts = table.required(txn_cols::SEND_AMOUNT)?;
        let base_amounts = table.required(txn_cols::BASE_AMOUNT)?;
        let created = table.required(txn_cols::DATE_CREATED)?;
        let narrations = table.optional(txn_cols::NARRATION)?;

        let mut records = Vec::with_capacity(df.height());

        for row in 0..df.height() {
            let created_text = table.value(txn_cols::DATE_CREATED, row, &created[row])?;
            let date_created = parse_timestamp(&created_text).ok_or_else(|| {
                table.invalid(txn_cols::DATE_CREATED, row, &created_text, "timestamp")
            })?;

            records.push(TransactionRecord {
                id: table.value(txn_cols::ID, row, &ids[row])?,
                user_id: table.value(txn_cols::USER_ID, row, &user_ids[row])?,
                send_currency: non_blank(&send_currencies[row]).map(str::to_string),
                receive_currency: non_blank(&receive_currencies[row]).map(str::to_string),
                send_amount: table.amount(txn_cols::SEND_AMOUNT, row, &send_amounts[row])?,
                base_amount: table.amount(txn_cols::BASE_AMOUNT, row, &base_amounts[row])?,
                date_created,
                narration: non_blank(&narrations[row])
                    .unwrap_or(UNSPECIFIED)
                    .to_string(),
            });
        }

        Ok(records)
    }
}

/// Parse the timestamp layouts found in the exports.
///
/// Offset-carrying values keep the wall-clock time written in the export
/// (the offset is dropped, not applied); a bare date becomes midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];
    const NAIVE_FORMATS: [&str; 3] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];

    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a boolean flag. Empty text is `false`.
pub fn parse_flag(text: Option<&str>) -> Option<bool> {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return Some(false);
    };

    match text.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "t" => Some(true),
        "false" | "0" | "no" | "n" | "f" => Some(false),
        _ => None,
    }
}

/// Parse an integer code written either as `3` or `3.0`.
pub fn parse_code(text: &str) -> Option<i16> {
    let text = text.trim();
    if let Ok(code) = text.parse::<i16>() {
        return Some(code);
    }

    let value = text.parse::<f64>().ok()?;
    let in_range = value >= i16::MIN as f64 && value <= i16::MAX as f64;
    (value.fract() == 0.0 && in_range).then_some(value as i16)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Read access to a loaded table with row-level error reporting.
struct TextTable<'a> {
    df: &'a DataFrame,
    table: &'static str,
}

impl<'a> TextTable<'a> {
    fn new(df: &'a DataFrame, table: &'static str) -> Self {
        Self { df, table }
    }

    fn required(&self, column: &'static str) -> Result<Vec<Option<String>>, SchemaError> {
        let col = self
            .df
            .column(column)
            .map_err(|_| SchemaError::MissingColumn {
                table: self.table,
                column,
            })?;
        Ok(text_values(col)?)
    }

    fn optional(&self, column: &'static str) -> Result<Vec<Option<String>>, SchemaError> {
        match self.df.column(column) {
            Ok(col) => Ok(text_values(col)?),
            Err(_) => Ok(vec![None; self.df.height()]),
        }
    }

    fn value(
        &self,
        column: &'static str,
        row: usize,
        value: &Option<String>,
    ) -> Result<String, SchemaError> {
        non_blank(value)
            .map(str::to_string)
            .ok_or(SchemaError::MissingValue {
                table: self.table,
                column,
                row,
            })
    }

    fn flag(
        &self,
        column: &'static str,
        row: usize,
        value: &Option<String>,
    ) -> Result<bool, SchemaError> {
        parse_flag(value.as_deref())
            .ok_or_else(|| self.invalid(column, row, value.as_deref().unwrap_or(""), "boolean"))
    }

    fn amount(
        &self,
        column: &'static str,
        row: usize,
        value: &Option<String>,
    ) -> Result<Option<f64>, SchemaError> {
        match non_blank(value) {
            None => Ok(None),
            Some(text) => text
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| self.invalid(column, row, text, "number")),
        }
    }

    fn invalid(
        &self,
        column: &'static str,
        row: usize,
        value: &str,
        expected: &'static str,
    ) -> SchemaError {
        SchemaError::InvalidValue {
            table: self.table,
            column,
            row,
            value: value.to_string(),
            expected,
        }
    }
}

/// Extract a column as owned optional strings, whatever its loaded dtype.
pub fn text_values(column: &Column) -> PolarsResult<Vec<Option<String>>> {
    let text = column.cast(&DataType::String)?;
    Ok(text
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}
