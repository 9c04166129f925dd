//! Pseudo-sample label grammar
//!
//! Pseudo-sample labels have the form `<celltype>_<CONDITION>_<digits>`,
//! e.g. `Mono_CTRL_101` or `B cells_STIM_1016`. The cell-type part may itself
//! contain separators; the condition token is the last recognized token before
//! the numeral suffix, and the numeral suffix is the entire trailing digit run
//! (exactly 3 or 4 digits). Labels that do not decompose this way are
//! rejected, never guessed at.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PseudobulkError, Result};

/// Separator between label parts
pub const LABEL_SEPARATOR: char = '_';

/// Stimulation condition of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "CTRL")]
    Ctrl,
    #[serde(rename = "STIM")]
    Stim,
}

impl Condition {
    /// All recognized conditions, in contrast order (numerator first)
    pub const ALL: [Condition; 2] = [Condition::Stim, Condition::Ctrl];

    /// The token this condition uses inside sample labels
    pub fn token(self) -> &'static str {
        match self {
            Condition::Ctrl => "CTRL",
            Condition::Stim => "STIM",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Condition {
    type Err = PseudobulkError;

    fn from_str(s: &str) -> Result<Self> {
        Condition::ALL
            .into_iter()
            .find(|c| c.token() == s)
            .ok_or_else(|| PseudobulkError::InvalidInput {
                reason: format!("unknown condition token '{}'", s),
            })
    }
}

/// A decomposed pseudo-sample label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleLabel {
    /// Full label, e.g. `Mono_CTRL_101`
    pub label: String,
    /// Cell-type part, e.g. `Mono`
    pub cell_type: String,
    /// Condition token, e.g. `CTRL`
    pub condition: Condition,
}

/// Grammar for the trailing numeral suffix: the label body, a separator, and
/// the entire trailing digit run. Suffix length is validated separately so
/// that failures name the exact rule violated.
fn suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<group>.+?)_(?P<sample>[0-9]+)$").unwrap()
    })
}

impl SampleLabel {
    /// Parse a pseudo-sample label into its cell-type and condition parts.
    ///
    /// Fails with `InvalidSampleLabel` when the trailing digit run is not
    /// exactly 3 or 4 digits, when the remainder does not end in a recognized
    /// condition token, or when the cell-type part is empty.
    pub fn parse(label: &str) -> Result<Self> {
        let caps = suffix_regex().captures(label).ok_or_else(|| {
            PseudobulkError::InvalidSampleLabel {
                label: label.to_string(),
                reason: "expected '<celltype>_<CONDITION>_<digits>'".to_string(),
            }
        })?;

        let digits = &caps["sample"];
        if digits.len() < 3 || digits.len() > 4 {
            return Err(PseudobulkError::InvalidSampleLabel {
                label: label.to_string(),
                reason: format!(
                    "sample number '{}' must be 3 or 4 digits, got {}",
                    digits,
                    digits.len()
                ),
            });
        }

        let group = &caps["group"];
        let (cell_type, condition) = Condition::ALL
            .into_iter()
            .find_map(|c| {
                group
                    .strip_suffix(c.token())
                    .and_then(|rest| rest.strip_suffix(LABEL_SEPARATOR))
                    .map(|cell_type| (cell_type, c))
            })
            .ok_or_else(|| PseudobulkError::InvalidSampleLabel {
                label: label.to_string(),
                reason: format!(
                    "'{}' does not end in a recognized condition token",
                    group
                ),
            })?;

        if cell_type.is_empty() {
            return Err(PseudobulkError::InvalidSampleLabel {
                label: label.to_string(),
                reason: "cell-type part is empty".to_string(),
            });
        }

        Ok(SampleLabel {
            label: label.to_string(),
            cell_type: cell_type.to_string(),
            condition,
        })
    }

    /// Composite group label: cell type + condition, e.g. `Mono_CTRL`
    pub fn group(&self) -> String {
        format!("{}{}{}", self.cell_type, LABEL_SEPARATOR, self.condition)
    }
}

/// Composite group label for a (cell type, condition) pair
pub fn group_label(cell_type: &str, condition: Condition) -> String {
    format!("{}{}{}", cell_type, LABEL_SEPARATOR, condition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_digit_label() {
        let parsed = SampleLabel::parse("Mono_CTRL_101").unwrap();
        assert_eq!(parsed.cell_type, "Mono");
        assert_eq!(parsed.condition, Condition::Ctrl);
        assert_eq!(parsed.group(), "Mono_CTRL");
    }

    #[test]
    fn test_parse_four_digit_label() {
        let parsed = SampleLabel::parse("DC_STIM_1016").unwrap();
        assert_eq!(parsed.cell_type, "DC");
        assert_eq!(parsed.condition, Condition::Stim);
        assert_eq!(parsed.group(), "DC_STIM");
    }

    #[test]
    fn test_cell_type_may_contain_separators() {
        let parsed = SampleLabel::parse("CD14+ Mono_cyte_STIM_101").unwrap();
        assert_eq!(parsed.cell_type, "CD14+ Mono_cyte");
        assert_eq!(parsed.condition, Condition::Stim);
    }

    #[test]
    fn test_two_digit_suffix_rejected() {
        let err = SampleLabel::parse("Bcell_STIM_12").unwrap_err();
        assert!(matches!(
            err,
            PseudobulkError::InvalidSampleLabel { .. }
        ));
    }

    #[test]
    fn test_five_digit_suffix_rejected() {
        assert!(SampleLabel::parse("Mono_CTRL_12345").is_err());
    }

    #[test]
    fn test_unknown_condition_rejected() {
        let err = SampleLabel::parse("Mono_MOCK_101").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("condition token"), "unexpected message: {}", msg);
    }

    #[test]
    fn test_empty_cell_type_rejected() {
        assert!(SampleLabel::parse("_CTRL_101").is_err());
    }

    #[test]
    fn test_missing_suffix_rejected() {
        assert!(SampleLabel::parse("Mono_CTRL").is_err());
        assert!(SampleLabel::parse("").is_err());
    }

    #[test]
    fn test_condition_roundtrip() {
        for c in Condition::ALL {
            assert_eq!(c.token().parse::<Condition>().unwrap(), c);
        }
        assert!("ctrl".parse::<Condition>().is_err());
    }
}
