use std::fmt;
use std::str::FromStr;

use chrono::{Months, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::EnaError;

/// Submission action understood by the archive. Cancellation goes through
/// its own envelope and is deliberately not part of this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Add,
    Modify,
}

impl Action {
    pub fn tag(&self) -> &'static str {
        match self {
            Action::Add => "ADD",
            Action::Modify => "MODIFY",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Action {
    type Err = EnaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_uppercase().as_str() {
            "ADD" => Ok(Action::Add),
            "MODIFY" => Ok(Action::Modify),
            _ => Err(EnaError::UnknownAction(value.to_string())),
        }
    }
}

/// A `left|right` compound cell value, used for url links (`label|url`),
/// xref links (`db|id`) and free-form attributes (`tag|value`). Exactly one
/// pipe separator is required; anything else is rejected instead of being
/// silently truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipePair {
    pub left: String,
    pub right: String,
}

impl PipePair {
    pub fn parse(value: &str) -> Result<Self, EnaError> {
        let mut parts = value.split('|');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(left), Some(right), None) => Ok(Self {
                left: left.to_string(),
                right: right.to_string(),
            }),
            _ => Err(EnaError::MalformedPair {
                value: value.to_string(),
            }),
        }
    }
}

/// An attribute cell value, optionally carrying a unit suffix after a pipe
/// (`37|celsius`). A bare value is valid; more than one pipe is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub value: String,
    pub units: Option<String>,
}

impl AttributeValue {
    pub fn parse(value: &str) -> Result<Self, EnaError> {
        if !value.contains('|') {
            return Ok(Self {
                value: value.to_string(),
                units: None,
            });
        }
        let pair = PipePair::parse(value)?;
        Ok(Self {
            value: pair.left,
            units: Some(pair.right),
        })
    }
}

/// Checks a submission hold date. An empty string means "no hold" and is
/// accepted; otherwise the date must be `YYYY-MM-DD` and fall within two
/// years of today, the window the archive accepts.
pub fn validate_hold_date(hold_date: &str) -> Result<(), EnaError> {
    if hold_date.is_empty() {
        return Ok(());
    }
    let parsed = NaiveDate::parse_from_str(hold_date, "%Y-%m-%d")
        .map_err(|_| EnaError::InvalidHoldDate(hold_date.to_string()))?;
    let today = Utc::now().date_naive();
    let limit = today
        .checked_add_months(Months::new(24))
        .unwrap_or(NaiveDate::MAX);
    if parsed < today || parsed > limit {
        return Err(EnaError::InvalidHoldDate(hold_date.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_action_case_insensitive() {
        assert_eq!("add".parse::<Action>().unwrap(), Action::Add);
        assert_eq!("MODIFY".parse::<Action>().unwrap(), Action::Modify);
    }

    #[test]
    fn parse_action_unknown() {
        let err = "CANCEL".parse::<Action>().unwrap_err();
        assert_matches!(err, EnaError::UnknownAction(_));
    }

    #[test]
    fn parse_pipe_pair() {
        let pair = PipePair::parse("NCBI|https://ncbi.nlm.nih.gov").unwrap();
        assert_eq!(pair.left, "NCBI");
        assert_eq!(pair.right, "https://ncbi.nlm.nih.gov");
    }

    #[test]
    fn parse_pipe_pair_wrong_arity() {
        assert_matches!(
            PipePair::parse("no separator"),
            Err(EnaError::MalformedPair { .. })
        );
        assert_matches!(
            PipePair::parse("a|b|c"),
            Err(EnaError::MalformedPair { .. })
        );
    }

    #[test]
    fn parse_attribute_value_with_units() {
        let plain = AttributeValue::parse("37").unwrap();
        assert_eq!(plain.value, "37");
        assert_eq!(plain.units, None);

        let with_units = AttributeValue::parse("37|celsius").unwrap();
        assert_eq!(with_units.value, "37");
        assert_eq!(with_units.units.as_deref(), Some("celsius"));
    }

    #[test]
    fn hold_date_rules() {
        assert!(validate_hold_date("").is_ok());
        assert_matches!(
            validate_hold_date("not-a-date"),
            Err(EnaError::InvalidHoldDate(_))
        );
        assert_matches!(
            validate_hold_date("2020-01-01"),
            Err(EnaError::InvalidHoldDate(_))
        );
    }
}
