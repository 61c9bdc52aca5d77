use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TransportError};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Info,
    Success,
    Warning,
    Error,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Info => "info",
            Category::Success => "success",
            Category::Warning => "warning",
            Category::Error => "error",
        }
    }
}

impl FromStr for Category {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "info" => Ok(Category::Info),
            "success" => Ok(Category::Success),
            "warning" => Ok(Category::Warning),
            "error" => Ok(Category::Error),
            other => Err(TransportError::Internal(format!(
                "unknown notification category {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub account_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
