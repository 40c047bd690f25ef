//! Data Processor Module
//! Cleans the raw user and transaction exports into the tables every report reads.

use crate::config::DataPaths;
use crate::data::loader::{LoaderError, TableCache};
use crate::data::schema::{parse_code, text_values, txn_cols, user_cols, UNSPECIFIED};
use log::{info, warn};
use polars::prelude::*;
use rayon::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Raw export is missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("{column} row {row}: cannot coerce '{value}' to an integer")]
    InvalidValue {
        column: &'static str,
        row: usize,
        value: String,
    },
}

/// Row counts before and after cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub users_in: usize,
    pub users_out: usize,
    pub transactions_in: usize,
    pub transactions_out: usize,
}

/// Handles data cleaning and the cleaned-file round trip.
pub struct DataProcessor;

impl DataProcessor {
    /// Run the whole batch job: load both raw exports, clean them, write the
    /// cleaned files and evict any stale cached copies of them.
    pub fn run(
        cache: &mut TableCache,
        paths: &DataPaths,
    ) -> Result<PreprocessSummary, ProcessorError> {
        let (_, raw_users) = cache.load(&paths.raw_users)?;
        let (_, raw_transactions) = cache.load(&paths.raw_transactions)?;

        let users_in = raw_users.height();
        let transactions_in = raw_transactions.height();

        let mut users = Self::clean_users(raw_users)?;
        let mut transactions = Self::clean_transactions(raw_transactions)?;

        Self::write_csv(&mut users, &paths.users)?;
        Self::write_csv(&mut transactions, &paths.transactions)?;
        cache.invalidate(&paths.users);
        cache.invalidate(&paths.transactions);

        let summary = PreprocessSummary {
            users_in,
            users_out: users.height(),
            transactions_in,
            transactions_out: transactions.height(),
        };

        let dropped = summary.transactions_in - summary.transactions_out;
        if dropped > 0 {
            warn!("dropped {} transactions without a UserId", dropped);
        }
        info!("processed user data saved to {}", paths.users.display());
        info!(
            "processed transaction data saved to {}",
            paths.transactions.display()
        );

        Ok(summary)
    }

    /// Drop referral columns, coerce KYC codes and normalize state/occupation.
    pub fn clean_users(mut df: DataFrame) -> Result<DataFrame, ProcessorError> {
        for name in [user_cols::REFERRAL_CODE, user_cols::REFERRED_BY] {
            if df.get_column_index(name).is_some() {
                df = df.drop(name)?;
            }
        }

        let codes = Self::coerce_codes(Self::require(&df, user_cols::KYC_STATUS)?)?;
        df.with_column(codes)?;

        Self::map_text_column(&mut df, user_cols::STATE, standardize_state)?;
        Self::map_text_column(&mut df, user_cols::OCCUPATION, standardize_occupation)?;

        Ok(df)
    }

    /// Drop transactions without an owner and default missing narrations.
    pub fn clean_transactions(df: DataFrame) -> Result<DataFrame, ProcessorError> {
        Self::require(&df, txn_cols::USER_ID)?;

        let narration = if df.get_column_index(txn_cols::NARRATION).is_some() {
            col(txn_cols::NARRATION).fill_null(lit(UNSPECIFIED))
        } else {
            lit(UNSPECIFIED).alias(txn_cols::NARRATION)
        };

        let cleaned = df
            .lazy()
            .filter(col(txn_cols::USER_ID).is_not_null())
            .with_column(narration)
            .collect()?;

        Ok(cleaned)
    }

    /// Write a table as CSV with a header row, creating parent directories.
    pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<(), ProcessorError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).include_header(true).finish(df)?;
        Ok(())
    }

    fn require<'a>(df: &'a DataFrame, name: &'static str) -> Result<&'a Column, ProcessorError> {
        df.column(name)
            .map_err(|_| ProcessorError::MissingColumn(name))
    }

    /// Integer coercion of the status code; missing values stay missing.
    fn coerce_codes(column: &Column) -> Result<Column, ProcessorError> {
        let codes = text_values(column)?
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(text) => parse_code(text)
                    .map(|code| Some(code.to_string()))
                    .ok_or_else(|| ProcessorError::InvalidValue {
                        column: user_cols::KYC_STATUS,
                        row,
                        value: text.to_string(),
                    }),
            })
            .collect::<Result<Vec<Option<String>>, _>>()?;

        Ok(Column::new(user_cols::KYC_STATUS.into(), codes))
    }

    /// Replace a text column with `normalize` applied to every row.
    fn map_text_column(
        df: &mut DataFrame,
        name: &'static str,
        normalize: fn(Option<&str>) -> String,
    ) -> Result<(), ProcessorError> {
        let values = text_values(Self::require(df, name)?)?;
        let normalized: Vec<String> = values
            .par_iter()
            .map(|value| normalize(value.as_deref()))
            .collect();

        df.with_column(Column::new(name.into(), normalized))?;
        Ok(())
    }
}

/// Canonical Nigerian state name for a free-text `State` value.
pub fn standardize_state(value: Option<&str>) -> String {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return UNSPECIFIED.to_string();
    };

    let lower = value.to_lowercase();
    if lower == "abuja" || lower == "fct" {
        return "Federal Capital Territory".to_string();
    }
    if !lower.contains("state") {
        return format!("{} State", capitalize(&lower));
    }

    title_case(&lower.replace("state", "State"))
}

/// Title-cased occupation, or the sentinel when blank.
pub fn standardize_occupation(value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => title_case(value),
        None => UNSPECIFIED.to_string(),
    }
}

/// First character upper case, the rest lower case.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Upper-case the first letter of every run of letters, lower-case the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_cased = false;

    for c in text.chars() {
        if prev_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_cased = c.is_alphabetic();
    }

    out
}
