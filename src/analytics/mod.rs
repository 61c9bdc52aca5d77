use std::sync::Arc;

use chrono::{Duration, Utc};
use log::debug;
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::lifecycle::resolve_details;
use crate::models::{
    ApplicationDetails, ApplicationFilter, ApplicationStatus, ApplicationType, Role,
};
use crate::storage::Storage;

const RECENT_APPLICATIONS: usize = 5;

#[derive(Serialize, Debug, PartialEq)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub application_type: ApplicationType,
    pub count: i64,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteRidership {
    pub route: Uuid,
    pub route_name: String,
    pub route_number: String,
    pub students: i64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAnalytics {
    pub total_students: i64,
    pub active_students: i64,
    pub total_applications: i64,
    pub pending_applications: i64,
    pub approved_applications: i64,
    pub rejected_applications: i64,
    pub total_buses: i64,
    pub active_buses: i64,
    pub total_drivers: i64,
    pub total_routes: i64,
    pub applications_by_type: Vec<TypeCount>,
    pub students_per_route: Vec<RouteRidership>,
    pub recent_applications: Vec<ApplicationDetails>,
}

/// Builds the admin dashboard numbers straight from storage on every call.
pub struct Analytics {
    storage: Arc<dyn Storage>,
}

impl Analytics {
    pub fn new(storage: Arc<dyn Storage>) -> Analytics {
        Analytics { storage }
    }

    pub fn compute(&self) -> Result<DashboardAnalytics> {
        let storage = self.storage.as_ref();
        let active_since = Utc::now() - Duration::hours(24);

        let mut applications_by_type: Vec<TypeCount> = storage
            .count_applications_by_type()?
            .into_iter()
            .map(|(application_type, count)| TypeCount {
                application_type,
                count,
            })
            .collect();
        applications_by_type.sort_by_key(|c| c.application_type.as_str());

        let approved_by_route = storage.count_approved_by_route()?;
        let route_ids: Vec<Uuid> = approved_by_route.iter().map(|(id, _)| *id).collect();
        let routes = storage.find_routes(&route_ids)?;
        // approvals pointing at deleted routes are left out
        let mut students_per_route: Vec<RouteRidership> = approved_by_route
            .into_iter()
            .filter_map(|(id, students)| {
                routes.iter().find(|r| r.id == id).map(|r| RouteRidership {
                    route: id,
                    route_name: r.route_name.clone(),
                    route_number: r.route_number.clone(),
                    students,
                })
            })
            .collect();
        students_per_route.sort_by(|a, b| {
            b.students
                .cmp(&a.students)
                .then_with(|| a.route_name.cmp(&b.route_name))
        });

        let recent = storage.list_applications(&ApplicationFilter {
            limit: Some(RECENT_APPLICATIONS),
            ..ApplicationFilter::default()
        })?;

        let analytics = DashboardAnalytics {
            total_students: storage.count_accounts(Role::Student, None)?,
            active_students: storage.count_accounts(Role::Student, Some(active_since))?,
            total_applications: storage.count_applications(None)?,
            pending_applications: storage.count_applications(Some(ApplicationStatus::Pending))?,
            approved_applications: storage.count_applications(Some(ApplicationStatus::Approved))?,
            rejected_applications: storage.count_applications(Some(ApplicationStatus::Rejected))?,
            total_buses: storage.count_buses(false)?,
            active_buses: storage.count_buses(true)?,
            total_drivers: storage.count_drivers()?,
            total_routes: storage.count_routes()?,
            applications_by_type,
            students_per_route,
            recent_applications: resolve_details(storage, recent)?,
        };
        debug!(
            "[Analytics] {} applications, {} students",
            analytics.total_applications, analytics.total_students
        );
        Ok(analytics)
    }
}
