//! Submission and decision of transport applications.
//!
//! An application starts `pending` and is moved exactly once, either to
//! `approved` (with a QR credential) or to `rejected` (with a reason). Every
//! step leaves a notification for the student and a live event for the
//! admin dashboards.

pub mod credential;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{Result, TransportError};
use crate::live::Broadcaster;
use crate::models::validation::{email, id, mobile, one_of, optional, required};
use crate::models::{
    AccountSummary, Applicant, Application, ApplicationDetails, ApplicationFilter,
    ApplicationState, ApplicationType, Category, ResolvedRoutes, RouteRequest, RouteSummary,
    ACADEMIC_YEARS, DEFAULT_REJECTION_REASON,
};
use crate::notifications::NotificationFeed;
use crate::storage::Storage;

/// Body of apply, change and cancel requests. Which route fields matter
/// depends on the application type.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationForm {
    pub name: Option<String>,
    pub register_number: Option<String>,
    pub department: Option<String>,
    pub academic_year: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub route: Option<String>,
    pub current_route: Option<String>,
    pub new_route: Option<String>,
    pub reason: Option<String>,
}

impl ApplicationForm {
    /// Checks fields in form order and reports the first one that is off.
    pub fn validate(
        &self,
        kind: ApplicationType,
    ) -> Result<(Applicant, RouteRequest, Option<String>)> {
        let applicant = Applicant {
            name: required("name", self.name.as_deref())?,
            register_number: required("registerNumber", self.register_number.as_deref())?
                .to_uppercase(),
            department: required("department", self.department.as_deref())?,
            academic_year: one_of("academicYear", self.academic_year.as_deref(), &ACADEMIC_YEARS)?,
            mobile: mobile("mobile", self.mobile.as_deref())?,
            email: email("email", self.email.as_deref())?,
            address: required("address", self.address.as_deref())?,
        };

        let request = match kind {
            ApplicationType::New => RouteRequest::New {
                route: id("route", self.route.as_deref())?,
            },
            ApplicationType::Change => RouteRequest::Change {
                current_route: id("currentRoute", self.current_route.as_deref())?,
                new_route: id("newRoute", self.new_route.as_deref())?,
            },
            ApplicationType::Cancel => RouteRequest::Cancel {
                current_route: id("currentRoute", self.current_route.as_deref())?,
            },
        };

        let reason = match kind {
            ApplicationType::New => optional(self.reason.as_deref()),
            ApplicationType::Change | ApplicationType::Cancel => {
                Some(required("reason", self.reason.as_deref())?)
            }
        };

        Ok((applicant, request, reason))
    }
}

struct Submission {
    title: &'static str,
    message: &'static str,
    event: &'static str,
}

fn submission(kind: ApplicationType) -> Submission {
    match kind {
        ApplicationType::New => Submission {
            title: "Application Submitted",
            message: "Your transport application has been submitted successfully and is pending approval.",
            event: "newApplication",
        },
        ApplicationType::Change => Submission {
            title: "Route Change Request Submitted",
            message: "Your route change request has been submitted and is pending approval.",
            event: "routeChangeRequest",
        },
        ApplicationType::Cancel => Submission {
            title: "Cancellation Request Submitted",
            message: "Your route cancellation request has been submitted and is pending approval.",
            event: "cancellationRequest",
        },
    }
}

pub struct Lifecycle {
    storage: Arc<dyn Storage>,
    feed: Arc<NotificationFeed>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl Lifecycle {
    pub fn new(
        storage: Arc<dyn Storage>,
        feed: Arc<NotificationFeed>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Lifecycle {
        Lifecycle {
            storage,
            feed,
            broadcaster,
        }
    }

    pub fn submit(
        &self,
        account_id: Uuid,
        kind: ApplicationType,
        form: ApplicationForm,
    ) -> Result<Application> {
        let (applicant, request, reason) = form.validate(kind)?;
        self.ensure_routes_exist(&request)?;

        let application = self.storage.insert_application(Application {
            id: Uuid::new_v4(),
            account_id,
            applicant,
            request,
            reason,
            state: ApplicationState::Pending,
            created_at: Utc::now(),
        })?;
        info!(
            "[Lifecycle] {} application {} submitted by {}",
            kind.as_str(),
            application.id,
            account_id
        );

        let notice = submission(kind);
        self.feed
            .emit(account_id, notice.title, notice.message, Category::Info);

        let record = serde_json::to_value(&application).unwrap_or_default();
        let payload = match kind {
            ApplicationType::New => json!({
                "message": "New transport application received",
                "application": record,
            }),
            _ => json!({ "application": record }),
        };
        self.broadcaster.broadcast(notice.event, payload);

        Ok(application)
    }

    pub fn approve(&self, id: Uuid, admin_id: Uuid) -> Result<Application> {
        let application = self.pending(id)?;
        let state = ApplicationState::Approved {
            approved_by: admin_id,
            approved_at: Utc::now(),
            qr_code: credential::issue(&application)?,
        };

        let decided = self.storage.decide_application(id, state)?;
        info!("[Lifecycle] application {} approved by {}", id, admin_id);

        self.feed.emit(
            decided.account_id,
            "Application Approved",
            &format!(
                "Your transport application has been approved. Application Type: {}",
                decided.kind().as_str()
            ),
            Category::Success,
        );
        self.announce("applicationApproved", &decided);

        Ok(decided)
    }

    pub fn reject(&self, id: Uuid, admin_id: Uuid, reason: Option<&str>) -> Result<Application> {
        self.pending(id)?;
        let rejection_reason =
            optional(reason).unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());
        let state = ApplicationState::Rejected {
            approved_by: admin_id,
            approved_at: Utc::now(),
            rejection_reason: rejection_reason.clone(),
        };

        let decided = self.storage.decide_application(id, state)?;
        info!("[Lifecycle] application {} rejected by {}", id, admin_id);

        self.feed.emit(
            decided.account_id,
            "Application Rejected",
            &format!("Your transport application has been rejected. Reason: {rejection_reason}"),
            Category::Error,
        );
        self.announce("applicationRejected", &decided);

        Ok(decided)
    }

    pub fn list_by_filter(&self, filter: &ApplicationFilter) -> Result<Vec<ApplicationDetails>> {
        let applications = self.storage.list_applications(filter)?;
        resolve_details(self.storage.as_ref(), applications)
    }

    pub fn list_for_account(&self, account_id: Uuid) -> Result<Vec<ApplicationDetails>> {
        self.list_by_filter(&ApplicationFilter {
            account_id: Some(account_id),
            ..ApplicationFilter::default()
        })
    }

    /// Loads the application and refuses anything already decided.
    fn pending(&self, id: Uuid) -> Result<Application> {
        let application = self
            .storage
            .find_application(id)?
            .ok_or_else(|| TransportError::not_found("Application"))?;
        if application.state.is_terminal() {
            warn!(
                "[Lifecycle] refusing to decide application {} twice, it is {}",
                id,
                application.status().as_str()
            );
            return Err(TransportError::Conflict(format!(
                "Application has already been {}",
                application.status().as_str()
            )));
        }
        Ok(application)
    }

    fn ensure_routes_exist(&self, request: &RouteRequest) -> Result<()> {
        let wanted = request.route_ids();
        let found = self.storage.find_routes(&wanted)?;
        if wanted.iter().all(|id| found.iter().any(|r| r.id == *id)) {
            Ok(())
        } else {
            Err(TransportError::not_found("Route"))
        }
    }

    fn announce(&self, event: &str, application: &Application) {
        self.broadcaster.broadcast(
            event,
            json!({
                "userId": application.account_id,
                "application": serde_json::to_value(application).unwrap_or_default(),
            }),
        );
    }
}

/// Looks up submitters and routes for a batch of applications in two queries.
/// References that no longer resolve come back empty.
pub fn resolve_details(
    storage: &dyn Storage,
    applications: Vec<Application>,
) -> Result<Vec<ApplicationDetails>> {
    let mut account_ids: Vec<Uuid> = applications.iter().map(|a| a.account_id).collect();
    account_ids.sort();
    account_ids.dedup();
    let mut route_ids: Vec<Uuid> = applications
        .iter()
        .flat_map(|a| a.request.route_ids())
        .collect();
    route_ids.sort();
    route_ids.dedup();

    let accounts: HashMap<Uuid, AccountSummary> = storage
        .find_accounts(&account_ids)?
        .iter()
        .map(|a| (a.id, AccountSummary::from(a)))
        .collect();
    let routes: HashMap<Uuid, RouteSummary> = storage
        .find_routes(&route_ids)?
        .iter()
        .map(|r| (r.id, RouteSummary::from(r)))
        .collect();
    let route = |id: Uuid| routes.get(&id).cloned();

    Ok(applications
        .into_iter()
        .map(|application| {
            let route_details = match application.request {
                RouteRequest::New { route: route_id } => ResolvedRoutes {
                    route: route(route_id),
                    ..ResolvedRoutes::default()
                },
                RouteRequest::Change {
                    current_route,
                    new_route,
                } => ResolvedRoutes {
                    route: route(new_route),
                    current_route: route(current_route),
                    new_route: route(new_route),
                },
                RouteRequest::Cancel { current_route } => ResolvedRoutes {
                    route: route(current_route),
                    current_route: route(current_route),
                    new_route: None,
                },
            };
            ApplicationDetails {
                applicant_account: accounts.get(&application.account_id).cloned(),
                route_details,
                application,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::testing::RecordingBroadcaster;
    use crate::models::{ApplicationStatus, Route};
    use crate::storage::MemoryStorage;

    struct Harness {
        storage: Arc<MemoryStorage>,
        broadcaster: Arc<RecordingBroadcaster>,
        feed: Arc<NotificationFeed>,
        lifecycle: Lifecycle,
    }

    fn harness() -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let feed = Arc::new(NotificationFeed::new(storage.clone()));
        let lifecycle = Lifecycle::new(storage.clone(), feed.clone(), broadcaster.clone());
        Harness {
            storage,
            broadcaster,
            feed,
            lifecycle,
        }
    }

    fn route(storage: &MemoryStorage, name: &str) -> Uuid {
        let route = Route {
            id: Uuid::new_v4(),
            route_name: name.to_string(),
            route_number: format!("R-{name}"),
            starting_point: String::from("Town Hall"),
            ending_point: String::from("KASC Campus"),
            stops: Vec::new(),
            start_time: String::from("07:30"),
            end_time: String::from("08:45"),
            distance: 14.0,
            estimated_duration: None,
            fare: 900.0,
            is_active: true,
            created_at: Utc::now(),
        };
        storage.insert_route(route).unwrap().id
    }

    fn form() -> ApplicationForm {
        ApplicationForm {
            name: Some(String::from("Divya")),
            register_number: Some(String::from("22bsc014")),
            department: Some(String::from("B.Sc CS")),
            academic_year: Some(String::from("II Year")),
            mobile: Some(String::from("9876501234")),
            email: Some(String::from("Divya@kasc.edu")),
            address: Some(String::from("4, Avinashi Road")),
            ..ApplicationForm::default()
        }
    }

    fn new_form(route: Uuid) -> ApplicationForm {
        ApplicationForm {
            route: Some(route.to_string()),
            ..form()
        }
    }

    #[test]
    fn submission_starts_pending_with_info_notification() {
        let h = harness();
        let r1 = route(&h.storage, "Peelamedu");
        let student = Uuid::new_v4();

        let application = h
            .lifecycle
            .submit(student, ApplicationType::New, new_form(r1))
            .unwrap();

        assert_eq!(application.status(), ApplicationStatus::Pending);
        assert_eq!(application.applicant.register_number, "22BSC014");
        assert_eq!(application.applicant.email, "divya@kasc.edu");
        let inbox = h.feed.list_recent(student).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].category, Category::Info);
        assert_eq!(inbox[0].title, "Application Submitted");
        assert_eq!(h.broadcaster.names(), vec!["newApplication"]);
    }

    #[test]
    fn approval_issues_credential_and_success_notification() {
        let h = harness();
        let r1 = route(&h.storage, "Peelamedu");
        let student = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let submitted = h
            .lifecycle
            .submit(student, ApplicationType::New, new_form(r1))
            .unwrap();

        let approved = h.lifecycle.approve(submitted.id, admin).unwrap();

        assert_eq!(approved.status(), ApplicationStatus::Approved);
        assert!(approved
            .state
            .qr_code()
            .unwrap()
            .starts_with("data:image/svg+xml;base64,"));
        match approved.state {
            ApplicationState::Approved { approved_by, .. } => assert_eq!(approved_by, admin),
            _ => panic!("expected approved state"),
        }

        let inbox = h.feed.list_recent(student).unwrap();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].category, Category::Success);
        assert!(inbox[0].message.ends_with("Application Type: new"));
        assert_eq!(
            h.broadcaster.names(),
            vec!["newApplication", "applicationApproved"]
        );
        let event = h.broadcaster.events().pop().unwrap();
        assert_eq!(event.payload["userId"], json!(student));
    }

    #[test]
    fn rejection_carries_reason_into_notification() {
        let h = harness();
        let r1 = route(&h.storage, "Peelamedu");
        let student = Uuid::new_v4();
        let submitted = h
            .lifecycle
            .submit(student, ApplicationType::New, new_form(r1))
            .unwrap();

        let rejected = h
            .lifecycle
            .reject(submitted.id, Uuid::new_v4(), Some("  Incomplete address "))
            .unwrap();

        assert_eq!(rejected.status(), ApplicationStatus::Rejected);
        assert_eq!(rejected.state.rejection_reason(), Some("Incomplete address"));
        assert!(rejected.state.qr_code().is_none());
        let inbox = h.feed.list_recent(student).unwrap();
        assert_eq!(inbox[0].category, Category::Error);
        assert!(inbox[0].message.contains("Incomplete address"));
        assert_eq!(h.broadcaster.names().last().unwrap(), "applicationRejected");
    }

    #[test]
    fn rejection_without_reason_uses_default() {
        let h = harness();
        let r1 = route(&h.storage, "Peelamedu");
        let submitted = h
            .lifecycle
            .submit(Uuid::new_v4(), ApplicationType::New, new_form(r1))
            .unwrap();

        let rejected = h.lifecycle.reject(submitted.id, Uuid::new_v4(), Some("   ")).unwrap();
        assert_eq!(
            rejected.state.rejection_reason(),
            Some(DEFAULT_REJECTION_REASON)
        );
    }

    #[test]
    fn decided_application_cannot_be_decided_again() {
        let h = harness();
        let r1 = route(&h.storage, "Peelamedu");
        let student = Uuid::new_v4();
        let submitted = h
            .lifecycle
            .submit(student, ApplicationType::New, new_form(r1))
            .unwrap();
        h.lifecycle.approve(submitted.id, Uuid::new_v4()).unwrap();

        assert!(matches!(
            h.lifecycle.approve(submitted.id, Uuid::new_v4()),
            Err(TransportError::Conflict(_))
        ));
        assert!(matches!(
            h.lifecycle.reject(submitted.id, Uuid::new_v4(), None),
            Err(TransportError::Conflict(_))
        ));

        let stored = h.storage.find_application(submitted.id).unwrap().unwrap();
        assert_eq!(stored.status(), ApplicationStatus::Approved);
        assert_eq!(h.feed.list_recent(student).unwrap().len(), 2);
        assert_eq!(h.broadcaster.names().len(), 2);
    }

    #[test]
    fn deciding_unknown_application_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.lifecycle.approve(Uuid::new_v4(), Uuid::new_v4()),
            Err(TransportError::NotFound(_))
        ));
        assert!(matches!(
            h.lifecycle.reject(Uuid::new_v4(), Uuid::new_v4(), None),
            Err(TransportError::NotFound(_))
        ));
    }

    #[test]
    fn new_application_needs_route() {
        let h = harness();
        match h
            .lifecycle
            .submit(Uuid::new_v4(), ApplicationType::New, form())
        {
            Err(TransportError::Validation(message)) => {
                assert_eq!(message, "\"route\" is required")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(h.broadcaster.names().is_empty());
    }

    #[test]
    fn change_needs_reason() {
        let h = harness();
        let from = route(&h.storage, "Peelamedu");
        let to = route(&h.storage, "Saibaba Colony");
        let change = ApplicationForm {
            current_route: Some(from.to_string()),
            new_route: Some(to.to_string()),
            ..form()
        };

        match h
            .lifecycle
            .submit(Uuid::new_v4(), ApplicationType::Change, change)
        {
            Err(TransportError::Validation(message)) => {
                assert_eq!(message, "\"reason\" is required")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn first_violation_is_reported() {
        let h = harness();
        let broken = ApplicationForm {
            mobile: Some(String::from("12345")),
            email: Some(String::from("not-an-email")),
            ..form()
        };

        match h
            .lifecycle
            .submit(Uuid::new_v4(), ApplicationType::New, broken)
        {
            Err(TransportError::Validation(message)) => assert!(message.contains("mobile")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_route_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.lifecycle
                .submit(Uuid::new_v4(), ApplicationType::New, new_form(Uuid::new_v4())),
            Err(TransportError::NotFound(_))
        ));
    }

    #[test]
    fn change_request_resolves_both_routes() {
        let h = harness();
        let from = route(&h.storage, "Peelamedu");
        let to = route(&h.storage, "Saibaba Colony");
        let student = Uuid::new_v4();
        let change = ApplicationForm {
            current_route: Some(from.to_string()),
            new_route: Some(to.to_string()),
            reason: Some(String::from("Shifted to a new house")),
            ..form()
        };
        h.lifecycle
            .submit(student, ApplicationType::Change, change)
            .unwrap();
        assert_eq!(h.broadcaster.names(), vec!["routeChangeRequest"]);
        assert_eq!(h.feed.list_recent(student).unwrap()[0].title, "Route Change Request Submitted");

        let listed = h.lifecycle.list_for_account(student).unwrap();
        assert_eq!(listed.len(), 1);
        let routes = &listed[0].route_details;
        assert_eq!(routes.current_route.as_ref().unwrap().id, from);
        assert_eq!(routes.new_route.as_ref().unwrap().id, to);
        assert_eq!(routes.route.as_ref().unwrap().id, to);
    }

    #[test]
    fn filter_narrows_by_status_and_type() {
        let h = harness();
        let r1 = route(&h.storage, "Peelamedu");
        let first = h
            .lifecycle
            .submit(Uuid::new_v4(), ApplicationType::New, new_form(r1))
            .unwrap();
        h.lifecycle
            .submit(Uuid::new_v4(), ApplicationType::New, new_form(r1))
            .unwrap();
        let cancel = ApplicationForm {
            current_route: Some(r1.to_string()),
            reason: Some(String::from("Graduating")),
            ..form()
        };
        h.lifecycle
            .submit(Uuid::new_v4(), ApplicationType::Cancel, cancel)
            .unwrap();
        h.lifecycle.approve(first.id, Uuid::new_v4()).unwrap();

        let pending_new = h
            .lifecycle
            .list_by_filter(&ApplicationFilter {
                status: Some(ApplicationStatus::Pending),
                application_type: Some(ApplicationType::New),
                ..ApplicationFilter::default()
            })
            .unwrap();
        assert_eq!(pending_new.len(), 1);

        let all = h
            .lifecycle
            .list_by_filter(&ApplicationFilter::default())
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].application.kind(), ApplicationType::Cancel);
    }
}
