//! Escalating confirmation for destructive statements.
//!
//! The server keeps nothing between requests. Each call receives the level
//! the client reached so far and answers with either "execute" or the next
//! level plus its warning. Dangerous statements run only at `FinalWarning`.

use serde::{Deserialize, Serialize};

use crate::query::QueryError;
use crate::query::classifier::Classification;

pub const FIRST_WARNING: &str =
    "⚠️ This query will modify or delete data permanently. Are you sure you want to proceed?";

pub const FINAL_WARNING: &str = "🚨 FINAL WARNING: This action cannot be undone. \
     The affected data will be permanently lost. This is your last chance to cancel.";

/// Caller-held escalation state, sent as 0, 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ConfirmationLevel {
    #[default]
    Unconfirmed,
    FirstWarning,
    FinalWarning,
}

impl TryFrom<u8> for ConfirmationLevel {
    type Error = QueryError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ConfirmationLevel::Unconfirmed),
            1 => Ok(ConfirmationLevel::FirstWarning),
            2 => Ok(ConfirmationLevel::FinalWarning),
            other => Err(QueryError::InvalidConfirmationLevel(other)),
        }
    }
}

impl From<ConfirmationLevel> for u8 {
    fn from(level: ConfirmationLevel) -> Self {
        match level {
            ConfirmationLevel::Unconfirmed => 0,
            ConfirmationLevel::FirstWarning => 1,
            ConfirmationLevel::FinalWarning => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Execute,
    Warn {
        level: ConfirmationLevel,
        message: &'static str,
    },
}

/// Runs before any confirmation logic; no level bypasses it.
pub fn check_analyst_mode(
    classification: &Classification,
    analyst_mode: bool,
) -> Result<(), QueryError> {
    if analyst_mode && !classification.is_read_only {
        return Err(QueryError::AnalystModeViolation);
    }
    Ok(())
}

pub fn next_step(classification: &Classification, level: ConfirmationLevel) -> ConfirmationOutcome {
    if !classification.is_dangerous {
        return ConfirmationOutcome::Execute;
    }

    match level {
        ConfirmationLevel::Unconfirmed => ConfirmationOutcome::Warn {
            level: ConfirmationLevel::FirstWarning,
            message: FIRST_WARNING,
        },
        ConfirmationLevel::FirstWarning => ConfirmationOutcome::Warn {
            level: ConfirmationLevel::FinalWarning,
            message: FINAL_WARNING,
        },
        ConfirmationLevel::FinalWarning => ConfirmationOutcome::Execute,
    }
}
