use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEPARTMENTS: [&str; 16] = [
    "B.Sc CS",
    "B.Sc IT",
    "B.Com",
    "BBA",
    "BCA",
    "B.A English",
    "B.Sc Maths",
    "B.Sc Physics",
    "B.Sc Chemistry",
    "M.Sc CS",
    "M.Sc IT",
    "M.Com",
    "MBA",
    "MCA",
    "M.A English",
    "M.Sc Maths",
];

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "admin")]
    Administrator = 0,
    #[serde(rename = "student")]
    Student = 6,
}

impl Role {
    pub fn from(role: i32) -> Role {
        match role {
            0 => Role::Administrator,
            _ => Role::Student,
        }
    }

    pub fn as_int(&self) -> i32 {
        match self {
            Role::Administrator => 0,
            _ => 6,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub register_number: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub mobile: String,
    pub department: String,
    pub city: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }
}

/// The slice of an account shown next to applications.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub register_number: String,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        AccountSummary {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            register_number: account.register_number.clone(),
        }
    }
}
