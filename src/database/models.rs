use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::error::{Result, TransportError};
use crate::models::route::stops_from_json;
use crate::models::{
    Account, Applicant, Application, ApplicationState, Bus, Driver, MaintenanceRecord,
    Notification, Role, Route, RouteRequest,
};
use crate::schema::{
    accounts, applications, buses, drivers, maintenance_records, notifications, routes,
};

// Field order of every row struct follows the column order in schema.rs.

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = accounts)]
pub struct AccountRow {
    pub id: Uuid,
    pub name: String,
    pub register_number: String,
    pub email: String,
    pub password_hash: String,
    pub mobile: String,
    pub department: String,
    pub city: String,
    pub role: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<Account> for AccountRow {
    fn from(account: Account) -> Self {
        AccountRow {
            id: account.id,
            name: account.name,
            register_number: account.register_number,
            email: account.email,
            password_hash: account.password_hash,
            mobile: account.mobile,
            department: account.department,
            city: account.city,
            role: account.role.as_int(),
            is_active: account.is_active,
            created_at: account.created_at,
            last_login: account.last_login,
        }
    }
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            name: row.name,
            register_number: row.register_number,
            email: row.email,
            password_hash: row.password_hash,
            mobile: row.mobile,
            department: row.department,
            city: row.city,
            role: Role::from(row.role),
            is_active: row.is_active,
            created_at: row.created_at,
            last_login: row.last_login,
        }
    }
}

#[derive(Queryable, Insertable, AsChangeset, Debug)]
#[diesel(table_name = routes)]
#[diesel(treat_none_as_null = true)]
pub struct RouteRow {
    pub id: Uuid,
    pub route_name: String,
    pub route_number: String,
    pub starting_point: String,
    pub ending_point: String,
    pub stops: serde_json::Value,
    pub start_time: String,
    pub end_time: String,
    pub distance: f64,
    pub estimated_duration: Option<String>,
    pub fare: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Route> for RouteRow {
    type Error = TransportError;

    fn try_from(route: Route) -> Result<Self> {
        Ok(RouteRow {
            id: route.id,
            route_name: route.route_name,
            route_number: route.route_number,
            starting_point: route.starting_point,
            ending_point: route.ending_point,
            stops: serde_json::to_value(&route.stops)?,
            start_time: route.start_time,
            end_time: route.end_time,
            distance: route.distance,
            estimated_duration: route.estimated_duration,
            fare: route.fare,
            is_active: route.is_active,
            created_at: route.created_at,
        })
    }
}

impl TryFrom<RouteRow> for Route {
    type Error = TransportError;

    fn try_from(row: RouteRow) -> Result<Self> {
        Ok(Route {
            id: row.id,
            route_name: row.route_name,
            route_number: row.route_number,
            starting_point: row.starting_point,
            ending_point: row.ending_point,
            stops: stops_from_json(row.stops)?,
            start_time: row.start_time,
            end_time: row.end_time,
            distance: row.distance,
            estimated_duration: row.estimated_duration,
            fare: row.fare,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(Queryable, Insertable, AsChangeset, Debug)]
#[diesel(table_name = buses)]
#[diesel(treat_none_as_null = true)]
pub struct BusRow {
    pub id: Uuid,
    pub bus_number: String,
    pub registration_number: String,
    pub capacity: i32,
    pub current_occupancy: i32,
    pub bus_type: String,
    pub insurance_expiry: NaiveDate,
    pub fitness_expiry: NaiveDate,
    pub last_service_date: Option<NaiveDate>,
    pub next_service_date: Option<NaiveDate>,
    pub route_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Bus> for BusRow {
    fn from(bus: Bus) -> Self {
        BusRow {
            id: bus.id,
            bus_number: bus.bus_number,
            registration_number: bus.registration_number,
            capacity: bus.capacity,
            current_occupancy: bus.current_occupancy,
            bus_type: bus.bus_type.as_str().to_string(),
            insurance_expiry: bus.insurance_expiry,
            fitness_expiry: bus.fitness_expiry,
            last_service_date: bus.last_service_date,
            next_service_date: bus.next_service_date,
            route_id: bus.route_id,
            driver_id: bus.driver_id,
            is_active: bus.is_active,
            created_at: bus.created_at,
        }
    }
}

impl TryFrom<BusRow> for Bus {
    type Error = TransportError;

    fn try_from(row: BusRow) -> Result<Self> {
        Ok(Bus {
            id: row.id,
            bus_number: row.bus_number,
            registration_number: row.registration_number,
            capacity: row.capacity,
            current_occupancy: row.current_occupancy,
            bus_type: row.bus_type.parse()?,
            insurance_expiry: row.insurance_expiry,
            fitness_expiry: row.fitness_expiry,
            last_service_date: row.last_service_date,
            next_service_date: row.next_service_date,
            route_id: row.route_id,
            driver_id: row.driver_id,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = drivers)]
pub struct DriverRow {
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

/// Driver columns an update may touch. `assigned_bus` is only written by bus writes.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = drivers)]
pub struct DriverChanges {
    pub name: String,
    pub license_number: String,
    pub phone: String,
    pub address: String,
    pub experience: i32,
    pub is_active: bool,
    pub joining_date: NaiveDate,
}

impl From<Driver> for DriverRow {
    fn from(driver: Driver) -> Self {
        DriverRow {
            id: driver.id,
            name: driver.name,
            license_number: driver.license_number,
            phone: driver.phone,
            address: driver.address,
            experience: driver.experience,
            assigned_bus: driver.assigned_bus,
            is_active: driver.is_active,
            joining_date: driver.joining_date,
            created_at: driver.created_at,
        }
    }
}

impl From<Driver> for DriverChanges {
    fn from(driver: Driver) -> Self {
        DriverChanges {
            name: driver.name,
            license_number: driver.license_number,
            phone: driver.phone,
            address: driver.address,
            experience: driver.experience,
            is_active: driver.is_active,
            joining_date: driver.joining_date,
        }
    }
}

impl From<DriverRow> for Driver {
    fn from(row: DriverRow) -> Self {
        Driver {
            id: row.id,
            name: row.name,
            license_number: row.license_number,
            phone: row.phone,
            address: row.address,
            experience: row.experience,
            assigned_bus: row.assigned_bus,
            is_active: row.is_active,
            joining_date: row.joining_date,
            created_at: row.created_at,
        }
    }
}

#[derive(Queryable, Insertable, AsChangeset, Debug)]
#[diesel(table_name = maintenance_records)]
#[diesel(treat_none_as_null = true)]
pub struct MaintenanceRow {
    pub id: Uuid,
    pub bus_id: Uuid,
    pub maintenance_type: String,
    pub description: String,
    pub cost: f64,
    pub service_date: NaiveDate,
    pub next_service_date: Option<NaiveDate>,
    pub serviced_by: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<MaintenanceRecord> for MaintenanceRow {
    fn from(record: MaintenanceRecord) -> Self {
        MaintenanceRow {
            id: record.id,
            bus_id: record.bus_id,
            maintenance_type: record.maintenance_type.as_str().to_string(),
            description: record.description,
            cost: record.cost,
            service_date: record.service_date,
            next_service_date: record.next_service_date,
            serviced_by: record.serviced_by,
            status: record.status.as_str().to_string(),
            notes: record.notes,
            created_at: record.created_at,
        }
    }
}

impl TryFrom<MaintenanceRow> for MaintenanceRecord {
    type Error = TransportError;

    fn try_from(row: MaintenanceRow) -> Result<Self> {
        Ok(MaintenanceRecord {
            id: row.id,
            bus_id: row.bus_id,
            maintenance_type: row.maintenance_type.parse()?,
            description: row.description,
            cost: row.cost,
            service_date: row.service_date,
            next_service_date: row.next_service_date,
            serviced_by: row.serviced_by,
            status: row.status.parse()?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = applications)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub register_number: String,
    pub department: String,
    pub academic_year: String,
    pub mobile: String,
    pub email: String,
    pub address: String,
    pub application_type: String,
    pub route_id: Option<Uuid>,
    pub current_route_id: Option<Uuid>,
    pub new_route_id: Option<Uuid>,
    pub reason: Option<String>,
    pub status: String,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub qr_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Application> for ApplicationRow {
    fn from(application: Application) -> Self {
        let (route_id, current_route_id, new_route_id) = application.request.columns();
        let (status, decided_by, decided_at, rejection_reason, qr_code) =
            application.state.columns();
        let applicant = application.applicant;

        ApplicationRow {
            id: application.id,
            account_id: application.account_id,
            name: applicant.name,
            register_number: applicant.register_number,
            department: applicant.department,
            academic_year: applicant.academic_year,
            mobile: applicant.mobile,
            email: applicant.email,
            address: applicant.address,
            application_type: application.request.kind().as_str().to_string(),
            route_id,
            current_route_id,
            new_route_id,
            reason: application.reason,
            status: status.to_string(),
            decided_by,
            decided_at,
            rejection_reason,
            qr_code,
            created_at: application.created_at,
        }
    }
}

impl TryFrom<ApplicationRow> for Application {
    type Error = TransportError;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        let request = RouteRequest::from_columns(
            row.application_type.parse()?,
            row.route_id,
            row.current_route_id,
            row.new_route_id,
        )?;
        let state = ApplicationState::from_columns(
            row.status.parse()?,
            row.decided_by,
            row.decided_at,
            row.rejection_reason,
            row.qr_code,
        )?;

        Ok(Application {
            id: row.id,
            account_id: row.account_id,
            applicant: Applicant {
                name: row.name,
                register_number: row.register_number,
                department: row.department,
                academic_year: row.academic_year,
                mobile: row.mobile,
                email: row.email,
                address: row.address,
            },
            request,
            reason: row.reason,
            state,
            created_at: row.created_at,
        })
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = notifications)]
pub struct NotificationRow {
    pub id: Uuid,
    pub account_id: Uuid,
    pub title: String,
    pub message: String,
    pub category: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationRow {
    fn from(notification: Notification) -> Self {
        NotificationRow {
            id: notification.id,
            account_id: notification.account_id,
            title: notification.title,
            message: notification.message,
            category: notification.category.as_str().to_string(),
            is_read: notification.is_read,
            created_at: notification.created_at,
        }
    }
}

impl TryFrom<NotificationRow> for Notification {
    type Error = TransportError;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Notification {
            id: row.id,
            account_id: row.account_id,
            title: row.title,
            message: row.message,
            category: row.category.parse()?,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

#[derive(QueryableByName, Debug)]
pub struct RouteCount {
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub route: Uuid,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub students: i64,
}
