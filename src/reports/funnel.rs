//! Funnel Aggregator
//! Acquisition → Complete Profile → KYC Verified → Transaction conversion table.

use crate::data::{TransactionRecord, UserRecord};
use crate::reports::{NamedTable, ReportTables};
use crate::stats::StatsCalculator;
use log::debug;
use polars::prelude::*;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunnelStageKind {
    Acquisition,
    CompleteProfile,
    KycVerified,
    Transaction,
}

impl FunnelStageKind {
    pub const ALL: [FunnelStageKind; 4] = [
        FunnelStageKind::Acquisition,
        FunnelStageKind::CompleteProfile,
        FunnelStageKind::KycVerified,
        FunnelStageKind::Transaction,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FunnelStageKind::Acquisition => "Acquisition",
            FunnelStageKind::CompleteProfile => "Complete Profile",
            FunnelStageKind::KycVerified => "KYC Verified",
            FunnelStageKind::Transaction => "Transaction",
        }
    }
}

/// Share of the previous stage's users that did not reach this stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropOff {
    /// First stage: there is no earlier stage to drop from.
    NoDropOff,
    Measured(f64),
    /// Last stage: always reported as 100 so the funnel closes at the bottom.
    /// `measured` is the actual drop from the previous stage.
    DisplayTerminal { measured: f64 },
}

impl DropOff {
    /// Percentage shown for this stage; `None` for the first stage.
    pub fn percent(self) -> Option<f64> {
        match self {
            DropOff::NoDropOff => None,
            DropOff::Measured(value) => Some(value),
            DropOff::DisplayTerminal { .. } => Some(100.0),
        }
    }

    pub fn basis(self) -> &'static str {
        match self {
            DropOff::NoDropOff => "n/a",
            DropOff::Measured(_) => "measured",
            DropOff::DisplayTerminal { .. } => "display convention",
        }
    }
}

impl fmt::Display for DropOff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percent() {
            Some(value) => write!(f, "{:.2}", value),
            None => f.write_str("No drop off"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunnelStage {
    pub stage: FunnelStageKind,
    pub users: usize,
    /// Percent of this stage's users reaching the next stage; 0 for the last stage.
    pub conversion_rate: f64,
    pub drop_off: DropOff,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunnelReport {
    pub stages: Vec<FunnelStage>,
}

impl FunnelReport {
    /// Count each stage and derive the rates.
    ///
    /// The Transaction stage is KYC-verified users with at least one
    /// transaction. Transactions whose user is not in the user table are
    /// excluded.
    pub fn compute(users: &[UserRecord], transactions: &[TransactionRecord]) -> Self {
        let known: HashSet<&str> = users.iter().map(|u| u.id.as_str()).collect();
        let verified: HashSet<&str> = users
            .iter()
            .filter(|u| u.is_kyc_verified)
            .map(|u| u.id.as_str())
            .collect();
        let completed = users.iter().filter(|u| u.completed_profile).count();

        let mut transacting: HashSet<&str> = HashSet::new();
        let mut dangling = 0usize;
        for txn in transactions {
            let user_id = txn.user_id.as_str();
            if verified.contains(user_id) {
                transacting.insert(user_id);
            } else if !known.contains(user_id) {
                dangling += 1;
            }
        }
        if dangling > 0 {
            debug!(
                "{} transactions reference users missing from the user table",
                dangling
            );
        }

        Self::from_counts([known.len(), completed, verified.len(), transacting.len()])
    }

    /// Build the table from stage counts in funnel order.
    pub fn from_counts(counts: [usize; 4]) -> Self {
        // Conversion from stage i into stage i + 1, before normalization.
        let raw: Vec<f64> = counts
            .windows(2)
            .map(|pair| pair[1] as f64 / pair[0] as f64 * 100.0)
            .collect();

        if raw.iter().any(|&r| r > 100.0) {
            debug!("funnel stage counts {:?} are not monotonic; rates clamped", counts);
        }

        let last = counts.len() - 1;
        let stages = FunnelStageKind::ALL
            .iter()
            .enumerate()
            .map(|(i, &stage)| {
                let conversion_rate = raw
                    .get(i)
                    .map_or(0.0, |&r| StatsCalculator::clamp_percent(r));

                let drop_off = match i {
                    0 => DropOff::NoDropOff,
                    _ => {
                        let measured = StatsCalculator::clamp_percent(100.0 - raw[i - 1]);
                        if i == last {
                            DropOff::DisplayTerminal { measured }
                        } else {
                            DropOff::Measured(measured)
                        }
                    }
                };

                FunnelStage {
                    stage,
                    users: counts[i],
                    conversion_rate,
                    drop_off,
                }
            })
            .collect();

        Self { stages }
    }

    pub fn stage(&self, kind: FunnelStageKind) -> Option<&FunnelStage> {
        self.stages.iter().find(|s| s.stage == kind)
    }

    /// One line per stage after the first, e.g. `Complete Profile: 20.00% drop-off`.
    pub fn insights(&self) -> Vec<String> {
        self.stages
            .iter()
            .skip(1)
            .map(|s| match s.drop_off {
                DropOff::DisplayTerminal { measured } => format!(
                    "{}: {}% drop-off (display convention; measured {:.2}%)",
                    s.stage.label(),
                    s.drop_off,
                    measured
                ),
                _ => format!("{}: {}% drop-off", s.stage.label(), s.drop_off),
            })
            .collect()
    }
}

impl ReportTables for FunnelReport {
    fn tables(&self) -> PolarsResult<Vec<NamedTable>> {
        let stages: Vec<&str> = self.stages.iter().map(|s| s.stage.label()).collect();
        let users: Vec<u64> = self.stages.iter().map(|s| s.users as u64).collect();
        let conversion: Vec<f64> = self.stages.iter().map(|s| s.conversion_rate).collect();
        let drop_off: Vec<String> = self.stages.iter().map(|s| s.drop_off.to_string()).collect();
        let basis: Vec<&str> = self.stages.iter().map(|s| s.drop_off.basis()).collect();

        let df = DataFrame::new(vec![
            Column::new("Stage".into(), stages),
            Column::new("Users".into(), users),
            Column::new("Conversion Rate".into(), conversion),
            Column::new("Drop Off".into(), drop_off),
            Column::new("Drop Off Basis".into(), basis),
        ])?;

        Ok(vec![NamedTable::new("funnel", df)])
    }
}
