use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Storage;
use crate::error::{Result, TransportError};
use crate::models::{
    Account, Application, ApplicationFilter, ApplicationState, ApplicationStatus,
    ApplicationType, Bus, Driver, MaintenanceRecord, MaintenanceType, Notification, Role, Route,
};

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    routes: Vec<Route>,
    buses: Vec<Bus>,
    drivers: Vec<Driver>,
    maintenance: Vec<MaintenanceRecord>,
    applications: Vec<Application>,
    notifications: Vec<Notification>,
}

/// Keeps every table in process memory behind one lock, so multi-record
/// writes are atomic the same way a transaction is.
#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| TransportError::Internal(String::from("memory storage lock poisoned")))
    }
}

fn duplicate(column: &str, value: &str) -> TransportError {
    TransportError::Conflict(format!(
        "Duplicate value: Key ({column})=({value}) already exists."
    ))
}

/// Insertion order reversed, then a stable sort, so equal timestamps keep
/// the later insert in front.
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut rows: Vec<T> = rows.iter().rev().cloned().collect();
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    rows
}

impl Tables {
    fn check_account_keys(&self, account: &Account) -> Result<()> {
        for other in self.accounts.iter().filter(|a| a.id != account.id) {
            if other.email == account.email {
                return Err(duplicate("email", &account.email));
            }
            if other.register_number == account.register_number {
                return Err(duplicate("register_number", &account.register_number));
            }
        }
        Ok(())
    }

    fn check_route_keys(&self, route: &Route) -> Result<()> {
        for other in self.routes.iter().filter(|r| r.id != route.id) {
            if other.route_name == route.route_name {
                return Err(duplicate("route_name", &route.route_name));
            }
            if other.route_number == route.route_number {
                return Err(duplicate("route_number", &route.route_number));
            }
        }
        Ok(())
    }

    fn check_bus(&self, bus: &Bus) -> Result<()> {
        for other in self.buses.iter().filter(|b| b.id != bus.id) {
            if other.bus_number == bus.bus_number {
                return Err(duplicate("bus_number", &bus.bus_number));
            }
            if other.registration_number == bus.registration_number {
                return Err(duplicate("registration_number", &bus.registration_number));
            }
        }
        if let Some(route_id) = bus.route_id {
            if !self.routes.iter().any(|r| r.id == route_id) {
                return Err(TransportError::not_found("Route"));
            }
        }
        if let Some(driver_id) = bus.driver_id {
            if !self.drivers.iter().any(|d| d.id == driver_id) {
                return Err(TransportError::not_found("Driver"));
            }
        }
        Ok(())
    }

    fn check_driver_keys(&self, driver: &Driver) -> Result<()> {
        if self
            .drivers
            .iter()
            .any(|d| d.id != driver.id && d.license_number == driver.license_number)
        {
            return Err(duplicate("license_number", &driver.license_number));
        }
        Ok(())
    }

    /// Moves `next` onto `bus_id`, releasing `previous` and any other bus `next` drove.
    fn reassign_driver(&mut self, bus_id: Uuid, previous: Option<Uuid>, next: Option<Uuid>) {
        if let Some(previous) = previous.filter(|p| Some(*p) != next) {
            if let Some(driver) = self.drivers.iter_mut().find(|d| d.id == previous) {
                driver.assigned_bus = None;
            }
        }

        if let Some(next) = next {
            for other in self
                .buses
                .iter_mut()
                .filter(|b| b.id != bus_id && b.driver_id == Some(next))
            {
                other.driver_id = None;
            }
            if let Some(driver) = self.drivers.iter_mut().find(|d| d.id == next) {
                driver.assigned_bus = Some(bus_id);
            }
        }
    }

    fn apply_service(&mut self, record: &MaintenanceRecord) {
        if record.maintenance_type != MaintenanceType::Service {
            return;
        }
        if let Some(bus) = self.buses.iter_mut().find(|b| b.id == record.bus_id) {
            bus.last_service_date = Some(record.service_date);
            bus.next_service_date = record.next_service_date;
        }
    }
}

impl Storage for MemoryStorage {
    fn insert_account(&self, account: Account) -> Result<Account> {
        let mut tables = self.tables()?;
        tables.check_account_keys(&account)?;
        tables.accounts.push(account.clone());
        Ok(account)
    }

    fn find_account(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.tables()?.accounts.iter().find(|a| a.id == id).cloned())
    }

    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .tables()?
            .accounts
            .iter()
            .find(|a| a.email == email)
            .cloned())
    }

    fn find_account_by_register_number(&self, register_number: &str) -> Result<Option<Account>> {
        Ok(self
            .tables()?
            .accounts
            .iter()
            .find(|a| a.register_number == register_number)
            .cloned())
    }

    fn find_accounts(&self, ids: &[Uuid]) -> Result<Vec<Account>> {
        Ok(self
            .tables()?
            .accounts
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    fn list_accounts(&self, role: Role) -> Result<Vec<Account>> {
        let tables = self.tables()?;
        let accounts: Vec<Account> = tables
            .accounts
            .iter()
            .filter(|a| a.role == role)
            .cloned()
            .collect();
        Ok(newest_first(&accounts, |a| a.created_at))
    }

    fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables()?;
        let account = tables
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| TransportError::not_found("Account"))?;
        account.last_login = Some(at);
        Ok(())
    }

    fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let mut tables = self.tables()?;
        let account = tables
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| TransportError::not_found("Account"))?;
        account.password_hash = password_hash.to_string();
        Ok(())
    }

    fn count_accounts(&self, role: Role, logged_in_since: Option<DateTime<Utc>>) -> Result<i64> {
        Ok(self
            .tables()?
            .accounts
            .iter()
            .filter(|a| a.role == role)
            .filter(|a| match logged_in_since {
                Some(since) => a.last_login.map_or(false, |at| at >= since),
                None => true,
            })
            .count() as i64)
    }

    fn has_accounts(&self) -> Result<bool> {
        Ok(!self.tables()?.accounts.is_empty())
    }

    fn insert_route(&self, route: Route) -> Result<Route> {
        let mut tables = self.tables()?;
        tables.check_route_keys(&route)?;
        tables.routes.push(route.clone());
        Ok(route)
    }

    fn update_route(&self, route: Route) -> Result<Route> {
        let mut tables = self.tables()?;
        tables.check_route_keys(&route)?;
        let slot = tables
            .routes
            .iter_mut()
            .find(|r| r.id == route.id)
            .ok_or_else(|| TransportError::not_found("Route"))?;
        *slot = route.clone();
        Ok(route)
    }

    fn delete_route(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables()?;
        let before = tables.routes.len();
        tables.routes.retain(|r| r.id != id);
        if tables.routes.len() == before {
            return Err(TransportError::not_found("Route"));
        }
        for bus in tables.buses.iter_mut().filter(|b| b.route_id == Some(id)) {
            bus.route_id = None;
        }
        Ok(())
    }

    fn find_route(&self, id: Uuid) -> Result<Option<Route>> {
        Ok(self.tables()?.routes.iter().find(|r| r.id == id).cloned())
    }

    fn find_routes(&self, ids: &[Uuid]) -> Result<Vec<Route>> {
        Ok(self
            .tables()?
            .routes
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }

    fn list_routes(&self, active_only: bool) -> Result<Vec<Route>> {
        let mut routes: Vec<Route> = self
            .tables()?
            .routes
            .iter()
            .filter(|r| !active_only || r.is_active)
            .cloned()
            .collect();
        routes.sort_by(|a, b| a.route_name.cmp(&b.route_name));
        Ok(routes)
    }

    fn count_routes(&self) -> Result<i64> {
        Ok(self.tables()?.routes.len() as i64)
    }

    fn insert_bus(&self, bus: Bus) -> Result<Bus> {
        let mut tables = self.tables()?;
        tables.check_bus(&bus)?;
        tables.buses.push(bus.clone());
        tables.reassign_driver(bus.id, None, bus.driver_id);
        Ok(bus)
    }

    fn update_bus(&self, bus: Bus) -> Result<Bus> {
        let mut tables = self.tables()?;
        tables.check_bus(&bus)?;
        let index = tables
            .buses
            .iter()
            .position(|b| b.id == bus.id)
            .ok_or_else(|| TransportError::not_found("Bus"))?;
        let previous = tables.buses[index].driver_id;
        tables.buses[index] = bus.clone();
        tables.reassign_driver(bus.id, previous, bus.driver_id);
        Ok(bus)
    }

    fn delete_bus(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables()?;
        let index = tables
            .buses
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| TransportError::not_found("Bus"))?;
        let bus = tables.buses.remove(index);
        tables.reassign_driver(bus.id, bus.driver_id, None);
        Ok(())
    }

    fn find_bus(&self, id: Uuid) -> Result<Option<Bus>> {
        Ok(self.tables()?.buses.iter().find(|b| b.id == id).cloned())
    }

    fn find_bus_by_route(&self, route_id: Uuid) -> Result<Option<Bus>> {
        Ok(self
            .tables()?
            .buses
            .iter()
            .find(|b| b.route_id == Some(route_id))
            .cloned())
    }

    fn list_buses(&self) -> Result<Vec<Bus>> {
        Ok(newest_first(&self.tables()?.buses, |b| b.created_at))
    }

    fn count_buses(&self, active_only: bool) -> Result<i64> {
        Ok(self
            .tables()?
            .buses
            .iter()
            .filter(|b| !active_only || b.is_active)
            .count() as i64)
    }

    fn insert_driver(&self, driver: Driver) -> Result<Driver> {
        let mut tables = self.tables()?;
        tables.check_driver_keys(&driver)?;
        tables.drivers.push(driver.clone());
        Ok(driver)
    }

    fn update_driver(&self, driver: Driver) -> Result<Driver> {
        let mut tables = self.tables()?;
        tables.check_driver_keys(&driver)?;
        let slot = tables
            .drivers
            .iter_mut()
            .find(|d| d.id == driver.id)
            .ok_or_else(|| TransportError::not_found("Driver"))?;
        // the bus link is owned by bus writes
        let driver = Driver {
            assigned_bus: slot.assigned_bus,
            ..driver
        };
        *slot = driver.clone();
        Ok(driver)
    }

    fn delete_driver(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables()?;
        let before = tables.drivers.len();
        tables.drivers.retain(|d| d.id != id);
        if tables.drivers.len() == before {
            return Err(TransportError::not_found("Driver"));
        }
        for bus in tables.buses.iter_mut().filter(|b| b.driver_id == Some(id)) {
            bus.driver_id = None;
        }
        Ok(())
    }

    fn find_driver(&self, id: Uuid) -> Result<Option<Driver>> {
        Ok(self.tables()?.drivers.iter().find(|d| d.id == id).cloned())
    }

    fn list_drivers(&self) -> Result<Vec<Driver>> {
        Ok(newest_first(&self.tables()?.drivers, |d| d.created_at))
    }

    fn count_drivers(&self) -> Result<i64> {
        Ok(self.tables()?.drivers.len() as i64)
    }

    fn insert_maintenance(&self, record: MaintenanceRecord) -> Result<MaintenanceRecord> {
        let mut tables = self.tables()?;
        if !tables.buses.iter().any(|b| b.id == record.bus_id) {
            return Err(TransportError::not_found("Bus"));
        }
        tables.maintenance.push(record.clone());
        tables.apply_service(&record);
        Ok(record)
    }

    fn update_maintenance(&self, record: MaintenanceRecord) -> Result<MaintenanceRecord> {
        let mut tables = self.tables()?;
        if !tables.buses.iter().any(|b| b.id == record.bus_id) {
            return Err(TransportError::not_found("Bus"));
        }
        let slot = tables
            .maintenance
            .iter_mut()
            .find(|m| m.id == record.id)
            .ok_or_else(|| TransportError::not_found("Maintenance record"))?;
        *slot = record.clone();
        Ok(record)
    }

    fn list_maintenance(&self) -> Result<Vec<MaintenanceRecord>> {
        let mut records = newest_first(&self.tables()?.maintenance, |m| m.created_at);
        records.sort_by(|a, b| b.service_date.cmp(&a.service_date));
        Ok(records)
    }

    fn insert_application(&self, application: Application) -> Result<Application> {
        self.tables()?.applications.push(application.clone());
        Ok(application)
    }

    fn find_application(&self, id: Uuid) -> Result<Option<Application>> {
        Ok(self
            .tables()?
            .applications
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    fn decide_application(&self, id: Uuid, state: ApplicationState) -> Result<Application> {
        let mut tables = self.tables()?;
        let application = tables
            .applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| TransportError::not_found("Application"))?;
        if application.state.is_terminal() {
            return Err(TransportError::Conflict(format!(
                "Application has already been {}",
                application.status().as_str()
            )));
        }
        application.state = state;
        Ok(application.clone())
    }

    fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>> {
        let tables = self.tables()?;
        let matching: Vec<Application> = tables
            .applications
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        let mut applications = newest_first(&matching, |a| a.created_at);
        if let Some(limit) = filter.limit {
            applications.truncate(limit);
        }
        Ok(applications)
    }

    fn count_applications(&self, status: Option<ApplicationStatus>) -> Result<i64> {
        Ok(self
            .tables()?
            .applications
            .iter()
            .filter(|a| status.map_or(true, |s| a.status() == s))
            .count() as i64)
    }

    fn count_applications_by_type(&self) -> Result<Vec<(ApplicationType, i64)>> {
        let tables = self.tables()?;
        let mut counts: Vec<(ApplicationType, i64)> = Vec::new();
        for application in tables.applications.iter() {
            match counts.iter_mut().find(|(kind, _)| *kind == application.kind()) {
                Some((_, count)) => *count += 1,
                None => counts.push((application.kind(), 1)),
            }
        }
        Ok(counts)
    }

    fn count_approved_by_route(&self) -> Result<Vec<(Uuid, i64)>> {
        let tables = self.tables()?;
        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for application in tables
            .applications
            .iter()
            .filter(|a| a.status() == ApplicationStatus::Approved)
        {
            *counts.entry(application.request.effective_route()).or_insert(0) += 1;
        }
        Ok(counts.into_iter().collect())
    }

    fn insert_notification(&self, notification: Notification) -> Result<Notification> {
        self.tables()?.notifications.push(notification.clone());
        Ok(notification)
    }

    fn list_notifications(&self, account_id: Uuid, limit: i64) -> Result<Vec<Notification>> {
        let tables = self.tables()?;
        let owned: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.account_id == account_id)
            .cloned()
            .collect();
        let mut notifications = newest_first(&owned, |n| n.created_at);
        notifications.truncate(limit.max(0) as usize);
        Ok(notifications)
    }

    fn mark_notification_read(&self, id: Uuid) -> Result<Notification> {
        let mut tables = self.tables()?;
        let notification = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| TransportError::not_found("Notification"))?;
        notification.is_read = true;
        Ok(notification.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BusType, MaintenanceStatus};
    use chrono::NaiveDate;

    fn route(name: &str, number: &str) -> Route {
        Route {
            id: Uuid::new_v4(),
            route_name: name.to_string(),
            route_number: number.to_string(),
            starting_point: String::from("Gandhipuram"),
            ending_point: String::from("KASC Campus"),
            stops: Vec::new(),
            start_time: String::from("08:00 AM"),
            end_time: String::from("09:00 AM"),
            distance: 12.0,
            estimated_duration: None,
            fare: 0.0,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn driver(license: &str) -> Driver {
        Driver {
            id: Uuid::new_v4(),
            name: String::from("Murugan"),
            license_number: license.to_string(),
            phone: String::from("9876543210"),
            address: String::from("Peelamedu"),
            experience: 8,
            assigned_bus: None,
            is_active: true,
            joining_date: NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
            created_at: Utc::now(),
        }
    }

    fn bus(number: &str, driver_id: Option<Uuid>) -> Bus {
        Bus {
            id: Uuid::new_v4(),
            bus_number: number.to_string(),
            registration_number: format!("REG-{number}"),
            capacity: 40,
            current_occupancy: 0,
            bus_type: BusType::Ac,
            insurance_expiry: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            fitness_expiry: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            last_service_date: None,
            next_service_date: None,
            route_id: None,
            driver_id,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_route_numbers_conflict() {
        let storage = MemoryStorage::new();
        storage.insert_route(route("Gandhipuram", "101")).unwrap();
        let err = storage.insert_route(route("Ukkadam", "101")).unwrap_err();
        assert!(matches!(err, TransportError::Conflict(_)));
    }

    #[test]
    fn driver_follows_the_bus_it_was_moved_to() {
        let storage = MemoryStorage::new();
        let murugan = storage.insert_driver(driver("DL001")).unwrap();
        let first = storage.insert_bus(bus("B1", Some(murugan.id))).unwrap();
        assert_eq!(
            storage.find_driver(murugan.id).unwrap().unwrap().assigned_bus,
            Some(first.id)
        );

        let second = storage.insert_bus(bus("B2", Some(murugan.id))).unwrap();
        assert_eq!(
            storage.find_driver(murugan.id).unwrap().unwrap().assigned_bus,
            Some(second.id)
        );
        assert_eq!(storage.find_bus(first.id).unwrap().unwrap().driver_id, None);
    }

    #[test]
    fn replacing_a_driver_releases_the_old_one() {
        let storage = MemoryStorage::new();
        let old = storage.insert_driver(driver("DL001")).unwrap();
        let new = storage.insert_driver(driver("DL002")).unwrap();
        let mut assigned = storage.insert_bus(bus("B1", Some(old.id))).unwrap();

        assigned.driver_id = Some(new.id);
        storage.update_bus(assigned.clone()).unwrap();

        assert_eq!(storage.find_driver(old.id).unwrap().unwrap().assigned_bus, None);
        assert_eq!(
            storage.find_driver(new.id).unwrap().unwrap().assigned_bus,
            Some(assigned.id)
        );

        storage.delete_bus(assigned.id).unwrap();
        assert_eq!(storage.find_driver(new.id).unwrap().unwrap().assigned_bus, None);
    }

    #[test]
    fn deleting_a_driver_clears_the_bus() {
        let storage = MemoryStorage::new();
        let murugan = storage.insert_driver(driver("DL001")).unwrap();
        let assigned = storage.insert_bus(bus("B1", Some(murugan.id))).unwrap();
        storage.delete_driver(murugan.id).unwrap();
        assert_eq!(storage.find_bus(assigned.id).unwrap().unwrap().driver_id, None);
    }

    #[test]
    fn unknown_driver_is_not_found() {
        let storage = MemoryStorage::new();
        let err = storage.insert_bus(bus("B1", Some(Uuid::new_v4()))).unwrap_err();
        assert!(matches!(err, TransportError::NotFound(_)));
        assert_eq!(storage.count_buses(false).unwrap(), 0);
    }

    #[test]
    fn service_records_move_bus_dates() {
        let storage = MemoryStorage::new();
        let serviced = storage.insert_bus(bus("B1", None)).unwrap();
        let service_date = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        let next = NaiveDate::from_ymd_opt(2027, 3, 1).unwrap();
        storage
            .insert_maintenance(MaintenanceRecord {
                id: Uuid::new_v4(),
                bus_id: serviced.id,
                maintenance_type: MaintenanceType::Service,
                description: String::from("Oil change"),
                cost: 2500.0,
                service_date,
                next_service_date: Some(next),
                serviced_by: None,
                status: MaintenanceStatus::Completed,
                notes: None,
                created_at: Utc::now(),
            })
            .unwrap();

        let serviced = storage.find_bus(serviced.id).unwrap().unwrap();
        assert_eq!(serviced.last_service_date, Some(service_date));
        assert_eq!(serviced.next_service_date, Some(next));
    }

    #[test]
    fn deleting_a_route_detaches_its_bus() {
        let storage = MemoryStorage::new();
        let served = storage.insert_route(route("Gandhipuram", "101")).unwrap();
        let mut serving = bus("B1", None);
        serving.route_id = Some(served.id);
        let serving = storage.insert_bus(serving).unwrap();

        storage.delete_route(served.id).unwrap();
        assert_eq!(storage.find_bus(serving.id).unwrap().unwrap().route_id, None);
        assert!(storage.delete_route(served.id).is_err());
    }
}
