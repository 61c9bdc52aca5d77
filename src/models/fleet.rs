use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::route::RouteSummary;
use super::validation::{mobile, not_negative, optional, required};
use crate::error::{Result, TransportError};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum BusType {
    #[serde(rename = "AC")]
    Ac,
    #[serde(rename = "Non-AC")]
    #[default]
    NonAc,
}

impl BusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusType::Ac => "AC",
            BusType::NonAc => "Non-AC",
        }
    }
}

impl FromStr for BusType {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AC" => Ok(BusType::Ac),
            "Non-AC" => Ok(BusType::NonAc),
            other => Err(TransportError::Internal(format!("unknown bus type {other}"))),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub id: Uuid,
    pub bus_number: String,
    pub registration_number: String,
    pub capacity: i32,
    pub current_occupancy: i32,
    #[serde(rename = "type")]
    pub bus_type: BusType,
    pub insurance_expiry: NaiveDate,
    pub fitness_expiry: NaiveDate,
    pub last_service_date: Option<NaiveDate>,
    pub next_service_date: Option<NaiveDate>,
    #[serde(rename = "route")]
    pub route_id: Option<Uuid>,
    #[serde(rename = "driver")]
    pub driver_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct BusForm {
    pub bus_number: Option<String>,
    pub registration_number: Option<String>,
    pub capacity: Option<i32>,
    pub current_occupancy: Option<i32>,
    #[serde(rename = "type", default)]
    pub bus_type: BusType,
    pub insurance_expiry: Option<NaiveDate>,
    pub fitness_expiry: Option<NaiveDate>,
    pub last_service_date: Option<NaiveDate>,
    pub next_service_date: Option<NaiveDate>,
    pub route: Option<Uuid>,
    pub driver: Option<Uuid>,
    pub is_active: Option<bool>,
}

impl BusForm {
    pub fn into_bus(self, id: Uuid, created_at: DateTime<Utc>) -> Result<Bus> {
        let bus_number = required("busNumber", self.bus_number.as_deref())?.to_uppercase();
        let capacity = self
            .capacity
            .ok_or_else(|| TransportError::validation("\"capacity\" is required"))?;
        if capacity < 1 {
            return Err(TransportError::validation(
                "\"capacity\" must be greater than or equal to 1",
            ));
        }
        let registration_number =
            required("registrationNumber", self.registration_number.as_deref())?.to_uppercase();
        let insurance_expiry = self
            .insurance_expiry
            .ok_or_else(|| TransportError::validation("\"insuranceExpiry\" is required"))?;
        let fitness_expiry = self
            .fitness_expiry
            .ok_or_else(|| TransportError::validation("\"fitnessExpiry\" is required"))?;

        Ok(Bus {
            id,
            bus_number,
            registration_number,
            capacity,
            current_occupancy: self.current_occupancy.unwrap_or(0).max(0),
            bus_type: self.bus_type,
            insurance_expiry,
            fitness_expiry,
            last_service_date: self.last_service_date,
            next_service_date: self.next_service_date,
            route_id: self.route,
            driver_id: self.driver,
            is_active: self.is_active.unwrap_or(true),
            created_at,
        })
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub license_number: String,
    pub phone: String,
    pub address: String,
    pub experience: i32,
    pub assigned_bus: Option<Uuid>,
    pub is_active: bool,
    pub joining_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Driver input. The bus assignment is owned by bus writes, so it is not accepted here.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct DriverForm {
    pub name: Option<String>,
    pub license_number: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub experience: Option<i32>,
    pub is_active: Option<bool>,
    pub joining_date: Option<NaiveDate>,
}

impl DriverForm {
    pub fn into_driver(
        self,
        id: Uuid,
        assigned_bus: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> Result<Driver> {
        let experience = self.experience.unwrap_or(0);
        if experience < 0 {
            return Err(TransportError::validation(
                "\"experience\" must be greater than or equal to 0",
            ));
        }

        Ok(Driver {
            id,
            name: required("name", self.name.as_deref())?,
            license_number: required("licenseNumber", self.license_number.as_deref())?
                .to_uppercase(),
            phone: mobile("phone", self.phone.as_deref())?,
            address: required("address", self.address.as_deref())?,
            experience,
            assigned_bus,
            is_active: self.is_active.unwrap_or(true),
            joining_date: self.joining_date.unwrap_or_else(|| created_at.date_naive()),
            created_at,
        })
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum MaintenanceType {
    Service,
    Repair,
    #[serde(rename = "Insurance Renewal")]
    InsuranceRenewal,
    #[serde(rename = "Fitness Check")]
    FitnessCheck,
    Other,
}

impl MaintenanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceType::Service => "Service",
            MaintenanceType::Repair => "Repair",
            MaintenanceType::InsuranceRenewal => "Insurance Renewal",
            MaintenanceType::FitnessCheck => "Fitness Check",
            MaintenanceType::Other => "Other",
        }
    }
}

impl FromStr for MaintenanceType {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Service" => Ok(MaintenanceType::Service),
            "Repair" => Ok(MaintenanceType::Repair),
            "Insurance Renewal" => Ok(MaintenanceType::InsuranceRenewal),
            "Fitness Check" => Ok(MaintenanceType::FitnessCheck),
            "Other" => Ok(MaintenanceType::Other),
            other => Err(TransportError::Internal(format!(
                "unknown maintenance type {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MaintenanceStatus {
    #[default]
    Scheduled,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl MaintenanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceStatus::Scheduled => "Scheduled",
            MaintenanceStatus::InProgress => "In Progress",
            MaintenanceStatus::Completed => "Completed",
        }
    }
}

impl FromStr for MaintenanceStatus {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Scheduled" => Ok(MaintenanceStatus::Scheduled),
            "In Progress" => Ok(MaintenanceStatus::InProgress),
            "Completed" => Ok(MaintenanceStatus::Completed),
            other => Err(TransportError::Internal(format!(
                "unknown maintenance status {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRecord {
    pub id: Uuid,
    #[serde(rename = "bus")]
    pub bus_id: Uuid,
    pub maintenance_type: MaintenanceType,
    pub description: String,
    pub cost: f64,
    pub service_date: NaiveDate,
    pub next_service_date: Option<NaiveDate>,
    pub serviced_by: Option<String>,
    pub status: MaintenanceStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceForm {
    pub bus: Option<Uuid>,
    pub maintenance_type: Option<MaintenanceType>,
    pub description: Option<String>,
    pub cost: Option<f64>,
    pub service_date: Option<NaiveDate>,
    pub next_service_date: Option<NaiveDate>,
    pub serviced_by: Option<String>,
    #[serde(default)]
    pub status: MaintenanceStatus,
    pub notes: Option<String>,
}

impl MaintenanceForm {
    pub fn into_record(self, id: Uuid, created_at: DateTime<Utc>) -> Result<MaintenanceRecord> {
        Ok(MaintenanceRecord {
            id,
            bus_id: self
                .bus
                .ok_or_else(|| TransportError::validation("\"bus\" is required"))?,
            maintenance_type: self
                .maintenance_type
                .ok_or_else(|| TransportError::validation("\"maintenanceType\" is required"))?,
            description: required("description", self.description.as_deref())?,
            cost: not_negative("cost", self.cost.unwrap_or(0.0))?,
            service_date: self
                .service_date
                .ok_or_else(|| TransportError::validation("\"serviceDate\" is required"))?,
            next_service_date: self.next_service_date,
            serviced_by: optional(self.serviced_by.as_deref()),
            status: self.status,
            notes: optional(self.notes.as_deref()),
            created_at,
        })
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusSummary {
    pub id: Uuid,
    pub bus_number: String,
    pub registration_number: String,
}

impl From<&Bus> for BusSummary {
    fn from(bus: &Bus) -> Self {
        BusSummary {
            id: bus.id,
            bus_number: bus.bus_number.clone(),
            registration_number: bus.registration_number.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSummary {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub license_number: String,
}

impl From<&Driver> for DriverSummary {
    fn from(driver: &Driver) -> Self {
        DriverSummary {
            id: driver.id,
            name: driver.name.clone(),
            phone: driver.phone.clone(),
            license_number: driver.license_number.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusDetails {
    #[serde(flatten)]
    pub bus: Bus,
    pub driver_details: Option<DriverSummary>,
    pub route_details: Option<RouteSummary>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverDetails {
    #[serde(flatten)]
    pub driver: Driver,
    pub bus_details: Option<BusSummary>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceDetails {
    #[serde(flatten)]
    pub record: MaintenanceRecord,
    pub bus_details: Option<BusSummary>,
}
