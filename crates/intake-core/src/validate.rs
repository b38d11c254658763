//! Pure field validators.
//!
//! Every validator is a total function from raw user input to either a
//! normalized value or a [`ValidationError`]. Malformed input is expected and
//! is represented as data, never as a panic.

use crate::form::DeliveryMethod;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Phrases (compared case-insensitively) that close the receipt collection loop.
pub const TERMINATOR_PHRASES: [&str; 6] = [
    "чеков нет",
    "нет чеков",
    "готово",
    "нет",
    "no receipts",
    "done",
];

/// The terminator phrase offered on the receipts keyboard.
pub const DEFAULT_TERMINATOR: &str = "Чеков нет";

const DATE_FORMAT: &str = "%d.%m.%Y";

/// Why a raw field value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    /// Nothing but whitespace was sent.
    #[error("input is empty")]
    EmptyInput,
    /// Not a real calendar date in zero-padded `DD.MM.YYYY` form.
    #[error("date must be DD.MM.YYYY")]
    BadDateFormat,
    /// The tax id contains something other than digits.
    #[error("tax id must contain digits only")]
    BadTaxIdDigits,
    /// The tax id is neither 10 nor 12 digits long.
    #[error("tax id must be 10 or 12 digits")]
    BadTaxIdLength,
    /// No `@`, or no `.` after it.
    #[error("e-mail address is malformed")]
    BadEmailSyntax,
    /// Not one of the offered options.
    #[error("unrecognized option")]
    UnrecognizedOption,
    /// Text in the receipts step that is not a terminator phrase.
    #[error("unrecognized terminator phrase")]
    UnrecognizedTerminator,
    /// The current step needs text but got something else.
    #[error("text expected")]
    ExpectedText,
}

/// Full name: any non-empty text, trimmed.
pub fn full_name(raw: &str) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    Ok(name.to_string())
}

/// Birth date: a real calendar date written as zero-padded `DD.MM.YYYY`.
pub fn birthdate(raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b'.',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err(ValidationError::BadDateFormat);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| ValidationError::BadDateFormat)
}

/// Formats a birth date back into the form it was accepted in.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Tax id: digits only, 10 (organisation) or 12 (individual) of them.
pub fn tax_id(raw: &str) -> Result<String, ValidationError> {
    let digits = raw.trim();
    if digits.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::BadTaxIdDigits);
    }
    match digits.len() {
        10 | 12 => Ok(digits.to_string()),
        _ => Err(ValidationError::BadTaxIdLength),
    }
}

/// Delivery method: exact match against one of the offered labels.
pub fn delivery_method(raw: &str) -> Result<DeliveryMethod, ValidationError> {
    let choice = raw.trim();
    if choice.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    DeliveryMethod::from_label(choice).ok_or(ValidationError::UnrecognizedOption)
}

/// E-mail: an `@` followed somewhere by a `.`. Deliberately naive.
pub fn email(raw: &str) -> Result<String, ValidationError> {
    let address = raw.trim();
    if address.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    match address.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {
            Ok(address.to_string())
        }
        _ => Err(ValidationError::BadEmailSyntax),
    }
}

/// Receipts terminator: one of [`TERMINATOR_PHRASES`], case-insensitive,
/// optionally wrapped in quotes.
pub fn terminator(raw: &str) -> Result<(), ValidationError> {
    let phrase = raw
        .trim()
        .trim_matches(|c| matches!(c, '«' | '»' | '"' | '\''))
        .trim()
        .to_lowercase();
    if phrase.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    if TERMINATOR_PHRASES.contains(&phrase.as_str()) {
        Ok(())
    } else {
        Err(ValidationError::UnrecognizedTerminator)
    }
}
