pub mod memory;

pub use memory::MemoryStorage;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Account, Application, ApplicationFilter, ApplicationState, ApplicationStatus,
    ApplicationType, Bus, Driver, MaintenanceRecord, Notification, Role, Route,
};

/// Everything the service keeps durably. `PostgresDatabase` is the real
/// backend, `MemoryStorage` backs offline mode and the tests.
///
/// Writes that touch two records (bus <-> driver, service maintenance -> bus,
/// application decisions) are atomic inside one call.
pub trait Storage: Send + Sync {
    fn insert_account(&self, account: Account) -> Result<Account>;
    fn find_account(&self, id: Uuid) -> Result<Option<Account>>;
    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;
    fn find_account_by_register_number(&self, register_number: &str) -> Result<Option<Account>>;
    fn find_accounts(&self, ids: &[Uuid]) -> Result<Vec<Account>>;
    /// Newest first.
    fn list_accounts(&self, role: Role) -> Result<Vec<Account>>;
    fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
    fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()>;
    fn count_accounts(&self, role: Role, logged_in_since: Option<DateTime<Utc>>) -> Result<i64>;
    fn has_accounts(&self) -> Result<bool>;

    fn insert_route(&self, route: Route) -> Result<Route>;
    fn update_route(&self, route: Route) -> Result<Route>;
    /// Also detaches every bus serving the route.
    fn delete_route(&self, id: Uuid) -> Result<()>;
    fn find_route(&self, id: Uuid) -> Result<Option<Route>>;
    fn find_routes(&self, ids: &[Uuid]) -> Result<Vec<Route>>;
    /// Sorted by route name.
    fn list_routes(&self, active_only: bool) -> Result<Vec<Route>>;
    fn count_routes(&self) -> Result<i64>;

    /// Links the driver (if any) to the new bus and detaches it from its previous bus.
    fn insert_bus(&self, bus: Bus) -> Result<Bus>;
    /// Same driver bookkeeping as `insert_bus`, plus releasing the previous driver.
    fn update_bus(&self, bus: Bus) -> Result<Bus>;
    /// Clears the back reference on the assigned driver.
    fn delete_bus(&self, id: Uuid) -> Result<()>;
    fn find_bus(&self, id: Uuid) -> Result<Option<Bus>>;
    fn find_bus_by_route(&self, route_id: Uuid) -> Result<Option<Bus>>;
    /// Newest first.
    fn list_buses(&self) -> Result<Vec<Bus>>;
    fn count_buses(&self, active_only: bool) -> Result<i64>;

    fn insert_driver(&self, driver: Driver) -> Result<Driver>;
    fn update_driver(&self, driver: Driver) -> Result<Driver>;
    /// Clears the driver on the bus it was assigned to.
    fn delete_driver(&self, id: Uuid) -> Result<()>;
    fn find_driver(&self, id: Uuid) -> Result<Option<Driver>>;
    /// Newest first.
    fn list_drivers(&self) -> Result<Vec<Driver>>;
    fn count_drivers(&self) -> Result<i64>;

    /// A `Service` record also moves the bus service dates.
    fn insert_maintenance(&self, record: MaintenanceRecord) -> Result<MaintenanceRecord>;
    fn update_maintenance(&self, record: MaintenanceRecord) -> Result<MaintenanceRecord>;
    /// Latest service date first.
    fn list_maintenance(&self) -> Result<Vec<MaintenanceRecord>>;

    fn insert_application(&self, application: Application) -> Result<Application>;
    fn find_application(&self, id: Uuid) -> Result<Option<Application>>;
    /// Moves a pending application into `state`. Fails with `Conflict` when the
    /// application was decided in the meantime.
    fn decide_application(&self, id: Uuid, state: ApplicationState) -> Result<Application>;
    /// Newest first.
    fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>>;
    fn count_applications(&self, status: Option<ApplicationStatus>) -> Result<i64>;
    fn count_applications_by_type(&self) -> Result<Vec<(ApplicationType, i64)>>;
    /// Approved applications grouped by effective route.
    fn count_approved_by_route(&self) -> Result<Vec<(Uuid, i64)>>;

    fn insert_notification(&self, notification: Notification) -> Result<Notification>;
    /// Newest first.
    fn list_notifications(&self, account_id: Uuid, limit: i64) -> Result<Vec<Notification>>;
    fn mark_notification_read(&self, id: Uuid) -> Result<Notification>;
}
