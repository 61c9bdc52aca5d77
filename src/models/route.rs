use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{not_negative, optional, required};
use crate::error::{Result, TransportError};

pub const DEFAULT_ENDING_POINT: &str = "KASC Campus";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub stop_name: String,
    pub arrival_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub route_name: String,
    pub route_number: String,
    pub starting_point: String,
    pub ending_point: String,
    pub stops: Vec<Stop>,
    pub start_time: String,
    pub end_time: String,
    pub distance: f64,
    pub estimated_duration: Option<String>,
    pub fare: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub id: Uuid,
    pub route_name: String,
    pub route_number: String,
    pub starting_point: String,
}

impl From<&Route> for RouteSummary {
    fn from(route: &Route) -> Self {
        RouteSummary {
            id: route.id,
            route_name: route.route_name.clone(),
            route_number: route.route_number.clone(),
            starting_point: route.starting_point.clone(),
        }
    }
}

/// What an administrator sends to create or replace a route.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RouteForm {
    pub route_name: Option<String>,
    pub route_number: Option<String>,
    pub starting_point: Option<String>,
    pub ending_point: Option<String>,
    #[serde(default)]
    pub stops: Vec<Stop>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub distance: Option<f64>,
    pub estimated_duration: Option<String>,
    pub fare: Option<f64>,
    pub is_active: Option<bool>,
}

impl RouteForm {
    pub fn into_route(self, id: Uuid, created_at: DateTime<Utc>) -> Result<Route> {
        let route_name = required("routeName", self.route_name.as_deref())?;
        let route_number = required("routeNumber", self.route_number.as_deref())?;
        let starting_point = required("startingPoint", self.starting_point.as_deref())?;
        let ending_point = optional(self.ending_point.as_deref())
            .unwrap_or_else(|| DEFAULT_ENDING_POINT.to_string());

        let mut stops = Vec::with_capacity(self.stops.len());
        for (index, stop) in self.stops.into_iter().enumerate() {
            let stop_name = required(&format!("stops[{index}].stopName"), Some(stop.stop_name.as_str()))?;
            let arrival_time =
                required(&format!("stops[{index}].arrivalTime"), Some(stop.arrival_time.as_str()))?;
            stops.push(Stop {
                stop_name,
                arrival_time,
                landmark: optional(stop.landmark.as_deref()),
                ..stop
            });
        }

        let start_time = required("startTime", self.start_time.as_deref())?;
        let end_time = required("endTime", self.end_time.as_deref())?;

        Ok(Route {
            id,
            route_name,
            route_number,
            starting_point,
            ending_point,
            stops,
            start_time,
            end_time,
            distance: not_negative("distance", self.distance.unwrap_or(0.0))?,
            estimated_duration: optional(self.estimated_duration.as_deref()),
            fare: not_negative("fare", self.fare.unwrap_or(0.0))?,
            is_active: self.is_active.unwrap_or(true),
            created_at,
        })
    }
}

/// Route plus whatever bus currently serves it.
#[derive(Clone, Debug, Serialize)]
pub struct RouteDetails {
    pub route: Route,
    pub bus: Option<super::fleet::BusDetails>,
}

pub(crate) fn stops_from_json(value: serde_json::Value) -> Result<Vec<Stop>> {
    serde_json::from_value(value)
        .map_err(|e| TransportError::Internal(format!("stored stops unreadable: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RouteForm {
        RouteForm {
            route_name: Some(String::from("Gandhipuram Route")),
            route_number: Some(String::from("101")),
            starting_point: Some(String::from("Gandhipuram")),
            start_time: Some(String::from("08:00 AM")),
            end_time: Some(String::from("09:00 AM")),
            stops: vec![Stop {
                stop_name: String::from("Saibaba Colony"),
                arrival_time: String::from("08:30 AM"),
                landmark: Some(String::from("  ")),
                latitude: None,
                longitude: None,
            }],
            ..RouteForm::default()
        }
    }

    #[test]
    fn defaults_fill_in_campus_and_activity() {
        let route = form().into_route(Uuid::new_v4(), Utc::now()).unwrap();
        assert_eq!(route.ending_point, DEFAULT_ENDING_POINT);
        assert!(route.is_active);
        assert_eq!(route.fare, 0.0);
        assert_eq!(route.stops[0].landmark, None);
    }

    #[test]
    fn stop_without_arrival_time_is_rejected() {
        let mut form = form();
        form.stops[0].arrival_time = String::new();
        let err = form.into_route(Uuid::new_v4(), Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "\"stops[0].arrivalTime\" is required");
    }

    #[test]
    fn negative_fare_is_rejected() {
        let mut form = form();
        form.fare = Some(-5.0);
        assert!(form.into_route(Uuid::new_v4(), Utc::now()).is_err());
    }
}
