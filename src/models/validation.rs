//! Field checks shared by every inbound form. Messages name the offending
//! field in quotes so clients can show them as-is.

use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use crate::error::{Result, TransportError};

lazy_static! {
    static ref MOBILE: Regex = Regex::new(r"^[0-9]{10}$").unwrap();
    static ref EMAIL: Regex =
        Regex::new(r"^[\w.+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").unwrap();
}

pub fn required(field: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(TransportError::validation(format!("\"{field}\" is required"))),
    }
}

pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn mobile(field: &str, value: Option<&str>) -> Result<String> {
    let value = required(field, value)?;
    if !MOBILE.is_match(&value) {
        return Err(TransportError::validation(format!(
            "\"{field}\" must be a valid 10-digit number"
        )));
    }
    Ok(value)
}

pub fn email(field: &str, value: Option<&str>) -> Result<String> {
    let value = required(field, value)?.to_lowercase();
    if !EMAIL.is_match(&value) {
        return Err(TransportError::validation(format!(
            "\"{field}\" must be a valid email"
        )));
    }
    Ok(value)
}

pub fn one_of(field: &str, value: Option<&str>, allowed: &[&str]) -> Result<String> {
    let value = required(field, value)?;
    if !allowed.contains(&value.as_str()) {
        return Err(TransportError::validation(format!(
            "\"{field}\" must be one of [{}]",
            allowed.join(", ")
        )));
    }
    Ok(value)
}

pub fn id(field: &str, value: Option<&str>) -> Result<Uuid> {
    let value = required(field, value)?;
    Uuid::parse_str(&value)
        .map_err(|_| TransportError::validation(format!("\"{field}\" must be a valid id")))
}

pub fn min_length(field: &str, value: Option<&str>, min: usize) -> Result<String> {
    let value = value.unwrap_or_default();
    if value.is_empty() {
        return Err(TransportError::validation(format!("\"{field}\" is required")));
    }
    if value.chars().count() < min {
        return Err(TransportError::validation(format!(
            "\"{field}\" length must be at least {min} characters long"
        )));
    }
    Ok(value.to_string())
}

pub fn not_negative(field: &str, value: f64) -> Result<f64> {
    if value < 0.0 || value.is_nan() {
        return Err(TransportError::validation(format!(
            "\"{field}\" must be greater than or equal to 0"
        )));
    }
    Ok(value)
}
