use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountSummary;
use super::route::RouteSummary;
use crate::error::{Result, TransportError};

pub const ACADEMIC_YEARS: [&str; 3] = ["I Year", "II Year", "III Year"];
pub const DEFAULT_REJECTION_REASON: &str = "No reason provided";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationType {
    New,
    Change,
    Cancel,
}

impl ApplicationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationType::New => "new",
            ApplicationType::Change => "change",
            ApplicationType::Cancel => "cancel",
        }
    }
}

impl FromStr for ApplicationType {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new" => Ok(ApplicationType::New),
            "change" => Ok(ApplicationType::Change),
            "cancel" => Ok(ApplicationType::Cancel),
            _ => Err(TransportError::validation(
                "\"applicationType\" must be one of [new, change, cancel]",
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(TransportError::validation(
                "\"status\" must be one of [pending, approved, rejected]",
            )),
        }
    }
}

/// Contact details as the student typed them when applying. They are not
/// refreshed when the account changes later on.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub name: String,
    pub register_number: String,
    pub department: String,
    pub academic_year: String,
    pub mobile: String,
    pub email: String,
    pub address: String,
}

/// Routes an application refers to, shaped by its type.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "applicationType", rename_all = "lowercase")]
pub enum RouteRequest {
    New {
        route: Uuid,
    },
    Change {
        #[serde(rename = "currentRoute")]
        current_route: Uuid,
        #[serde(rename = "newRoute")]
        new_route: Uuid,
    },
    Cancel {
        #[serde(rename = "currentRoute")]
        current_route: Uuid,
    },
}

impl RouteRequest {
    pub fn kind(&self) -> ApplicationType {
        match self {
            RouteRequest::New { .. } => ApplicationType::New,
            RouteRequest::Change { .. } => ApplicationType::Change,
            RouteRequest::Cancel { .. } => ApplicationType::Cancel,
        }
    }

    /// The route the student ends up riding (or leaving, for a cancellation).
    pub fn effective_route(&self) -> Uuid {
        match *self {
            RouteRequest::New { route } => route,
            RouteRequest::Change { new_route, .. } => new_route,
            RouteRequest::Cancel { current_route } => current_route,
        }
    }

    pub fn route_ids(&self) -> Vec<Uuid> {
        match *self {
            RouteRequest::New { route } => vec![route],
            RouteRequest::Change {
                current_route,
                new_route,
            } => vec![current_route, new_route],
            RouteRequest::Cancel { current_route } => vec![current_route],
        }
    }

    /// Column triple `(route, current_route, new_route)` as stored.
    pub fn columns(&self) -> (Option<Uuid>, Option<Uuid>, Option<Uuid>) {
        match *self {
            RouteRequest::New { route } => (Some(route), None, None),
            RouteRequest::Change {
                current_route,
                new_route,
            } => (None, Some(current_route), Some(new_route)),
            RouteRequest::Cancel { current_route } => (None, Some(current_route), None),
        }
    }

    pub fn from_columns(
        kind: ApplicationType,
        route: Option<Uuid>,
        current_route: Option<Uuid>,
        new_route: Option<Uuid>,
    ) -> Result<RouteRequest> {
        match (kind, route, current_route, new_route) {
            (ApplicationType::New, Some(route), None, None) => Ok(RouteRequest::New { route }),
            (ApplicationType::Change, None, Some(current_route), Some(new_route)) => {
                Ok(RouteRequest::Change {
                    current_route,
                    new_route,
                })
            }
            (ApplicationType::Cancel, None, Some(current_route), None) => {
                Ok(RouteRequest::Cancel { current_route })
            }
            _ => Err(TransportError::Internal(format!(
                "stored {} application has inconsistent route references",
                kind.as_str()
            ))),
        }
    }
}

/// Where an application is in its pending -> approved | rejected life.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApplicationState {
    Pending,
    Approved {
        #[serde(rename = "approvedBy")]
        approved_by: Uuid,
        #[serde(rename = "approvedAt")]
        approved_at: DateTime<Utc>,
        #[serde(rename = "qrCode")]
        qr_code: String,
    },
    Rejected {
        #[serde(rename = "approvedBy")]
        approved_by: Uuid,
        #[serde(rename = "approvedAt")]
        approved_at: DateTime<Utc>,
        #[serde(rename = "rejectionReason")]
        rejection_reason: String,
    },
}

impl ApplicationState {
    pub fn status(&self) -> ApplicationStatus {
        match self {
            ApplicationState::Pending => ApplicationStatus::Pending,
            ApplicationState::Approved { .. } => ApplicationStatus::Approved,
            ApplicationState::Rejected { .. } => ApplicationStatus::Rejected,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationState::Pending)
    }

    pub fn qr_code(&self) -> Option<&str> {
        match self {
            ApplicationState::Approved { qr_code, .. } => Some(qr_code),
            _ => None,
        }
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            ApplicationState::Rejected {
                rejection_reason, ..
            } => Some(rejection_reason),
            _ => None,
        }
    }

    /// Column tuple `(status, decided_by, decided_at, rejection_reason, qr_code)`.
    #[allow(clippy::type_complexity)]
    pub fn columns(
        &self,
    ) -> (
        &'static str,
        Option<Uuid>,
        Option<DateTime<Utc>>,
        Option<String>,
        Option<String>,
    ) {
        match self {
            ApplicationState::Pending => ("pending", None, None, None, None),
            ApplicationState::Approved {
                approved_by,
                approved_at,
                qr_code,
            } => (
                "approved",
                Some(*approved_by),
                Some(*approved_at),
                None,
                Some(qr_code.clone()),
            ),
            ApplicationState::Rejected {
                approved_by,
                approved_at,
                rejection_reason,
            } => (
                "rejected",
                Some(*approved_by),
                Some(*approved_at),
                Some(rejection_reason.clone()),
                None,
            ),
        }
    }

    pub fn from_columns(
        status: ApplicationStatus,
        decided_by: Option<Uuid>,
        decided_at: Option<DateTime<Utc>>,
        rejection_reason: Option<String>,
        qr_code: Option<String>,
    ) -> Result<ApplicationState> {
        match (status, decided_by, decided_at, rejection_reason, qr_code) {
            (ApplicationStatus::Pending, None, None, None, None) => Ok(ApplicationState::Pending),
            (ApplicationStatus::Approved, Some(approved_by), Some(approved_at), None, Some(qr_code)) => {
                Ok(ApplicationState::Approved {
                    approved_by,
                    approved_at,
                    qr_code,
                })
            }
            (
                ApplicationStatus::Rejected,
                Some(approved_by),
                Some(approved_at),
                Some(rejection_reason),
                None,
            ) => Ok(ApplicationState::Rejected {
                approved_by,
                approved_at,
                rejection_reason,
            }),
            (status, ..) => Err(TransportError::Internal(format!(
                "stored {} application has inconsistent decision fields",
                status.as_str()
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub account_id: Uuid,
    #[serde(flatten)]
    pub applicant: Applicant,
    #[serde(flatten)]
    pub request: RouteRequest,
    pub reason: Option<String>,
    #[serde(flatten)]
    pub state: ApplicationState,
    pub created_at: DateTime<Utc>,
}

impl Application {
    pub fn status(&self) -> ApplicationStatus {
        self.state.status()
    }

    pub fn kind(&self) -> ApplicationType {
        self.request.kind()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    #[serde(rename = "type")]
    pub application_type: Option<ApplicationType>,
    #[serde(skip)]
    pub account_id: Option<Uuid>,
    #[serde(skip)]
    pub limit: Option<usize>,
}

impl ApplicationFilter {
    pub fn matches(&self, application: &Application) -> bool {
        self.status.map_or(true, |s| application.status() == s)
            && self
                .application_type
                .map_or(true, |t| application.kind() == t)
            && self
                .account_id
                .map_or(true, |id| application.account_id == id)
    }
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRoutes {
    pub route: Option<RouteSummary>,
    pub current_route: Option<RouteSummary>,
    pub new_route: Option<RouteSummary>,
}

/// Application with the account and routes it points at looked up.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDetails {
    #[serde(flatten)]
    pub application: Application,
    pub applicant_account: Option<AccountSummary>,
    pub route_details: ResolvedRoutes,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applicant() -> Applicant {
        Applicant {
            name: String::from("Asha"),
            register_number: String::from("22BCA001"),
            department: String::from("BCA"),
            academic_year: String::from("II Year"),
            mobile: String::from("9876543210"),
            email: String::from("asha@kasc.edu"),
            address: String::from("12, Race Course Road"),
        }
    }

    #[test]
    fn change_request_serializes_both_routes() {
        let current_route = Uuid::new_v4();
        let new_route = Uuid::new_v4();
        let application = Application {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            applicant: applicant(),
            request: RouteRequest::Change {
                current_route,
                new_route,
            },
            reason: Some(String::from("Moved house")),
            state: ApplicationState::Pending,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&application).unwrap();
        assert_eq!(json["applicationType"], "change");
        assert_eq!(json["currentRoute"], current_route.to_string());
        assert_eq!(json["newRoute"], new_route.to_string());
        assert!(json.get("route").is_none());
        assert_eq!(json["status"], "pending");
        assert!(json.get("qrCode").is_none());
        assert_eq!(json["registerNumber"], "22BCA001");
    }

    #[test]
    fn route_columns_round_trip_and_reject_mixups() {
        let request = RouteRequest::Cancel {
            current_route: Uuid::new_v4(),
        };
        let (route, current, new) = request.columns();
        assert_eq!(
            RouteRequest::from_columns(ApplicationType::Cancel, route, current, new).unwrap(),
            request
        );
        assert!(
            RouteRequest::from_columns(ApplicationType::New, None, current, None).is_err()
        );
    }

    #[test]
    fn approved_rows_need_a_credential() {
        let by = Some(Uuid::new_v4());
        let at = Some(Utc::now());
        assert!(ApplicationState::from_columns(ApplicationStatus::Approved, by, at, None, None)
            .is_err());
        assert!(ApplicationState::from_columns(
            ApplicationStatus::Rejected,
            by,
            at,
            None,
            Some(String::from("data:"))
        )
        .is_err());
    }

    #[test]
    fn effective_route_follows_the_type() {
        let current_route = Uuid::new_v4();
        let new_route = Uuid::new_v4();
        assert_eq!(
            RouteRequest::Change {
                current_route,
                new_route
            }
            .effective_route(),
            new_route
        );
        assert_eq!(
            RouteRequest::Cancel { current_route }.effective_route(),
            current_route
        );
    }
}
