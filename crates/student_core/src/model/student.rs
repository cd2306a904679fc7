//! Student record and insert payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned integer identity.
pub type StudentId = i64;

/// One persisted row of the `students` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub registration_no: String,
    pub name: String,
    pub marks: i32,
    /// Assigned at insertion; drives list order.
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// Calendar date of insertion, e.g. `2025-03-14`.
    pub fn added_on(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }
}

/// Caller-supplied columns of a new row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewStudent {
    pub registration_no: String,
    pub name: String,
    pub marks: i32,
}

impl NewStudent {
    /// Builds an insert payload from raw form text.
    ///
    /// Fields are trimmed; all three must be non-empty and `marks` must
    /// parse as a whole number.
    pub fn from_form(registration_no: &str, name: &str, marks: &str) -> Result<Self, FieldError> {
        let registration_no = registration_no.trim();
        let name = name.trim();
        let marks = marks.trim();
        if registration_no.is_empty() || name.is_empty() || marks.is_empty() {
            return Err(FieldError::MissingFields);
        }

        Ok(Self {
            registration_no: registration_no.to_string(),
            name: name.to_string(),
            marks: parse_marks(marks)?,
        })
    }
}

/// Form validation failure. `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    MissingFields,
    MissingRegistrationNo,
    InvalidMarks(String),
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFields => write!(f, "Please fill in all fields"),
            Self::MissingRegistrationNo => write!(f, "Please enter a registration number"),
            Self::InvalidMarks(_) => write!(f, "Marks must be a valid number"),
        }
    }
}

impl Error for FieldError {}

/// Reads the leading integer of `raw`: an optional sign followed by digits.
///
/// Anything after the digits is ignored, so `"7.5"` is 7 and `"77abc"` is 77.
/// Input with no leading digits, or a value outside `i32`, is rejected.
pub fn parse_marks(raw: &str) -> Result<i32, FieldError> {
    let trimmed = raw.trim();
    let invalid = || FieldError::InvalidMarks(trimmed.to_string());

    let unsigned = trimmed.trim_start_matches(['+', '-']);
    let sign_len = trimmed.len() - unsigned.len();
    if sign_len > 1 {
        return Err(invalid());
    }
    let digits_len = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    if digits_len == 0 {
        return Err(invalid());
    }

    trimmed[..sign_len + digits_len]
        .parse::<i32>()
        .map_err(|_| invalid())
}

/// Returns the trimmed registration number, rejecting blank input.
pub fn require_registration_no(raw: &str) -> Result<String, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldError::MissingRegistrationNo);
    }
    Ok(trimmed.to_string())
}
