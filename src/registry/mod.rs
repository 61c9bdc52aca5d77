use std::sync::Arc;

use chrono::Utc;
use log::info;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{Result, TransportError};
use crate::models::validation::optional;
use crate::models::{
    Bus, BusDetails, BusForm, BusSummary, DriverDetails, DriverForm, DriverSummary,
    MaintenanceDetails, MaintenanceForm, MaintenanceRecord, Route, RouteDetails, RouteForm,
    RouteSummary,
};
use crate::storage::Storage;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct RouteSearch {
    pub bus_number: Option<String>,
    pub driver_name: Option<String>,
}

/// Routes, buses, drivers and maintenance records.
pub struct Registry {
    storage: Arc<dyn Storage>,
}

impl Registry {
    pub fn new(storage: Arc<dyn Storage>) -> Registry {
        Registry { storage }
    }

    pub fn get_active_routes(&self) -> Result<Vec<Route>> {
        self.storage.list_routes(true)
    }

    /// Includes inactive routes.
    pub fn list_routes(&self) -> Result<Vec<Route>> {
        self.storage.list_routes(false)
    }

    pub fn get_route(&self, id: Uuid) -> Result<Route> {
        self.storage
            .find_route(id)?
            .ok_or_else(|| TransportError::not_found("Route"))
    }

    pub fn get_route_with_assigned_bus(&self, id: Uuid) -> Result<RouteDetails> {
        let route = self.get_route(id)?;
        let bus = match self.storage.find_bus_by_route(id)? {
            Some(bus) => Some(self.bus_details(bus)?),
            None => None,
        };
        Ok(RouteDetails { route, bus })
    }

    /// Active routes served by a bus matching both criteria. Matching is a
    /// case-insensitive substring test. No criteria means every active route.
    pub fn search_routes(&self, search: &RouteSearch) -> Result<Vec<Route>> {
        let bus_number = optional(search.bus_number.as_deref()).map(|s| s.to_lowercase());
        let driver_name = optional(search.driver_name.as_deref()).map(|s| s.to_lowercase());
        let routes = self.storage.list_routes(true)?;
        if bus_number.is_none() && driver_name.is_none() {
            return Ok(routes);
        }

        let mut served = Vec::new();
        for bus in self.storage.list_buses()? {
            let Some(route_id) = bus.route_id else {
                continue;
            };
            if let Some(wanted) = &bus_number {
                if !bus.bus_number.to_lowercase().contains(wanted) {
                    continue;
                }
            }
            if let Some(wanted) = &driver_name {
                let driver = match bus.driver_id {
                    Some(driver_id) => self.storage.find_driver(driver_id)?,
                    None => None,
                };
                if !driver.map_or(false, |d| d.name.to_lowercase().contains(wanted)) {
                    continue;
                }
            }
            served.push(route_id);
        }

        Ok(routes
            .into_iter()
            .filter(|route| served.contains(&route.id))
            .collect())
    }

    pub fn create_route(&self, form: RouteForm) -> Result<Route> {
        let route = self
            .storage
            .insert_route(form.into_route(Uuid::new_v4(), Utc::now())?)?;
        info!("[Registry] route {} ({}) created", route.route_number, route.id);
        Ok(route)
    }

    pub fn update_route(&self, id: Uuid, form: RouteForm) -> Result<Route> {
        let existing = self.get_route(id)?;
        self.storage
            .update_route(form.into_route(id, existing.created_at)?)
    }

    pub fn delete_route(&self, id: Uuid) -> Result<()> {
        self.storage.delete_route(id)?;
        info!("[Registry] route {} deleted", id);
        Ok(())
    }

    pub fn list_buses(&self) -> Result<Vec<BusDetails>> {
        self.storage
            .list_buses()?
            .into_iter()
            .map(|bus| self.bus_details(bus))
            .collect()
    }

    pub fn create_bus(&self, form: BusForm) -> Result<BusDetails> {
        let bus = self
            .storage
            .insert_bus(form.into_bus(Uuid::new_v4(), Utc::now())?)?;
        info!("[Registry] bus {} ({}) created", bus.bus_number, bus.id);
        self.bus_details(bus)
    }

    pub fn update_bus(&self, id: Uuid, form: BusForm) -> Result<BusDetails> {
        let existing = self
            .storage
            .find_bus(id)?
            .ok_or_else(|| TransportError::not_found("Bus"))?;
        let bus = self
            .storage
            .update_bus(form.into_bus(id, existing.created_at)?)?;
        self.bus_details(bus)
    }

    pub fn delete_bus(&self, id: Uuid) -> Result<()> {
        self.storage.delete_bus(id)?;
        info!("[Registry] bus {} deleted", id);
        Ok(())
    }

    pub fn list_drivers(&self) -> Result<Vec<DriverDetails>> {
        let buses = self.storage.list_buses()?;
        Ok(self
            .storage
            .list_drivers()?
            .into_iter()
            .map(|driver| DriverDetails {
                bus_details: driver
                    .assigned_bus
                    .and_then(|id| buses.iter().find(|b| b.id == id))
                    .map(BusSummary::from),
                driver,
            })
            .collect())
    }

    pub fn create_driver(&self, form: DriverForm) -> Result<DriverDetails> {
        let driver = self
            .storage
            .insert_driver(form.into_driver(Uuid::new_v4(), None, Utc::now())?)?;
        info!("[Registry] driver {} ({}) created", driver.license_number, driver.id);
        Ok(DriverDetails {
            driver,
            bus_details: None,
        })
    }

    pub fn update_driver(&self, id: Uuid, form: DriverForm) -> Result<DriverDetails> {
        let existing = self
            .storage
            .find_driver(id)?
            .ok_or_else(|| TransportError::not_found("Driver"))?;
        let driver = self.storage.update_driver(form.into_driver(
            id,
            existing.assigned_bus,
            existing.created_at,
        )?)?;
        let bus_details = match driver.assigned_bus {
            Some(bus_id) => self.storage.find_bus(bus_id)?.as_ref().map(BusSummary::from),
            None => None,
        };
        Ok(DriverDetails {
            driver,
            bus_details,
        })
    }

    pub fn delete_driver(&self, id: Uuid) -> Result<()> {
        self.storage.delete_driver(id)?;
        info!("[Registry] driver {} deleted", id);
        Ok(())
    }

    /// Newest service date first.
    pub fn list_maintenance(&self) -> Result<Vec<MaintenanceDetails>> {
        let buses = self.storage.list_buses()?;
        Ok(self
            .storage
            .list_maintenance()?
            .into_iter()
            .map(|record| MaintenanceDetails {
                bus_details: buses
                    .iter()
                    .find(|b| b.id == record.bus_id)
                    .map(BusSummary::from),
                record,
            })
            .collect())
    }

    pub fn create_maintenance(&self, form: MaintenanceForm) -> Result<MaintenanceDetails> {
        let record = self
            .storage
            .insert_maintenance(form.into_record(Uuid::new_v4(), Utc::now())?)?;
        info!(
            "[Registry] {} recorded for bus {}",
            record.maintenance_type.as_str(),
            record.bus_id
        );
        self.maintenance_details(record)
    }

    pub fn update_maintenance(&self, id: Uuid, form: MaintenanceForm) -> Result<MaintenanceDetails> {
        let existing = self
            .storage
            .list_maintenance()?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or_else(|| TransportError::not_found("Maintenance record"))?;
        let record = self
            .storage
            .update_maintenance(form.into_record(id, existing.created_at)?)?;
        self.maintenance_details(record)
    }

    fn maintenance_details(&self, record: MaintenanceRecord) -> Result<MaintenanceDetails> {
        let bus_details = self
            .storage
            .find_bus(record.bus_id)?
            .as_ref()
            .map(BusSummary::from);
        Ok(MaintenanceDetails {
            record,
            bus_details,
        })
    }

    fn bus_details(&self, bus: Bus) -> Result<BusDetails> {
        let driver_details = match bus.driver_id {
            Some(id) => self.storage.find_driver(id)?.as_ref().map(DriverSummary::from),
            None => None,
        };
        let route_details = match bus.route_id {
            Some(id) => self.storage.find_route(id)?.as_ref().map(RouteSummary::from),
            None => None,
        };
        Ok(BusDetails {
            bus,
            driver_details,
            route_details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MaintenanceStatus, MaintenanceType, Stop};
    use crate::storage::MemoryStorage;
    use chrono::NaiveDate;

    fn registry() -> Registry {
        Registry::new(Arc::new(MemoryStorage::new()))
    }

    fn route_form(name: &str, number: &str) -> RouteForm {
        RouteForm {
            route_name: Some(name.to_string()),
            route_number: Some(number.to_string()),
            starting_point: Some(String::from("Singanallur")),
            stops: vec![Stop {
                stop_name: String::from("Ramanathapuram"),
                arrival_time: String::from("07:50"),
                landmark: None,
                latitude: None,
                longitude: None,
            }],
            start_time: Some(String::from("07:30")),
            end_time: Some(String::from("08:40")),
            fare: Some(1200.0),
            ..RouteForm::default()
        }
    }

    fn driver_form(name: &str, license: &str) -> DriverForm {
        DriverForm {
            name: Some(name.to_string()),
            license_number: Some(license.to_string()),
            phone: Some(String::from("9443012345")),
            address: Some(String::from("Hopes College")),
            experience: Some(12),
            ..DriverForm::default()
        }
    }

    fn bus_form(number: &str, route: Option<Uuid>, driver: Option<Uuid>) -> BusForm {
        BusForm {
            bus_number: Some(number.to_string()),
            registration_number: Some(format!("TN38-{number}")),
            capacity: Some(52),
            insurance_expiry: NaiveDate::from_ymd_opt(2027, 5, 1),
            fitness_expiry: NaiveDate::from_ymd_opt(2027, 2, 1),
            route,
            driver,
            ..BusForm::default()
        }
    }

    #[test]
    fn active_routes_skip_inactive_ones() {
        let registry = registry();
        registry.create_route(route_form("Singanallur", "S1")).unwrap();
        registry
            .create_route(RouteForm {
                is_active: Some(false),
                ..route_form("Ondipudur", "O1")
            })
            .unwrap();

        let active = registry.get_active_routes().unwrap();
        assert_eq!(active.len(), 1);
        assert!(active.iter().all(|r| r.is_active));
        assert_eq!(registry.list_routes().unwrap().len(), 2);
    }

    #[test]
    fn route_defaults_to_campus_destination() {
        let route = registry()
            .create_route(route_form("Singanallur", "S1"))
            .unwrap();
        assert_eq!(route.ending_point, "KASC Campus");
        assert_eq!(route.stops.len(), 1);
    }

    #[test]
    fn duplicate_route_conflicts() {
        let registry = registry();
        registry.create_route(route_form("Singanallur", "S1")).unwrap();
        assert!(matches!(
            registry.create_route(route_form("Singanallur", "S2")),
            Err(TransportError::Conflict(_))
        ));
    }

    #[test]
    fn update_keeps_creation_time() {
        let registry = registry();
        let created = registry.create_route(route_form("Singanallur", "S1")).unwrap();
        let updated = registry
            .update_route(
                created.id,
                RouteForm {
                    fare: Some(1500.0),
                    ..route_form("Singanallur", "S1")
                },
            )
            .unwrap();
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.fare, 1500.0);
        assert!(matches!(
            registry.update_route(Uuid::new_v4(), route_form("X", "X1")),
            Err(TransportError::NotFound(_))
        ));
    }

    #[test]
    fn route_details_include_bus_and_driver() {
        let registry = registry();
        let route = registry.create_route(route_form("Singanallur", "S1")).unwrap();
        let driver = registry.create_driver(driver_form("Selvam", "tn3820200001")).unwrap();
        registry
            .create_bus(bus_form("kasc-07", Some(route.id), Some(driver.driver.id)))
            .unwrap();

        let details = registry.get_route_with_assigned_bus(route.id).unwrap();
        let bus = details.bus.unwrap();
        assert_eq!(bus.bus.bus_number, "KASC-07");
        assert_eq!(bus.driver_details.unwrap().name, "Selvam");
        assert_eq!(bus.route_details.unwrap().id, route.id);

        let drivers = registry.list_drivers().unwrap();
        assert_eq!(drivers[0].driver.license_number, "TN3820200001");
        assert_eq!(drivers[0].bus_details.as_ref().unwrap().bus_number, "KASC-07");
    }

    #[test]
    fn search_matches_bus_number_and_driver_name() {
        let registry = registry();
        let north = registry.create_route(route_form("Thudiyalur", "T1")).unwrap();
        let south = registry.create_route(route_form("Podanur", "P1")).unwrap();
        registry.create_route(route_form("Vadavalli", "V1")).unwrap();
        let selvam = registry.create_driver(driver_form("Selvam", "DL1")).unwrap();
        let ravi = registry.create_driver(driver_form("Ravi Kumar", "DL2")).unwrap();
        registry
            .create_bus(bus_form("KASC-11", Some(north.id), Some(selvam.driver.id)))
            .unwrap();
        registry
            .create_bus(bus_form("KASC-12", Some(south.id), Some(ravi.driver.id)))
            .unwrap();

        let by_bus = registry
            .search_routes(&RouteSearch {
                bus_number: Some(String::from("kasc-1")),
                driver_name: None,
            })
            .unwrap();
        assert_eq!(by_bus.len(), 2);

        let by_driver = registry
            .search_routes(&RouteSearch {
                bus_number: None,
                driver_name: Some(String::from("RAVI")),
            })
            .unwrap();
        assert_eq!(by_driver.len(), 1);
        assert_eq!(by_driver[0].id, south.id);

        let both = registry
            .search_routes(&RouteSearch {
                bus_number: Some(String::from("11")),
                driver_name: Some(String::from("ravi")),
            })
            .unwrap();
        assert!(both.is_empty());

        assert_eq!(registry.search_routes(&RouteSearch::default()).unwrap().len(), 3);
    }

    #[test]
    fn driver_update_keeps_bus_assignment() {
        let registry = registry();
        let driver = registry.create_driver(driver_form("Selvam", "DL1")).unwrap();
        let bus = registry
            .create_bus(bus_form("KASC-07", None, Some(driver.driver.id)))
            .unwrap();

        let updated = registry
            .update_driver(driver.driver.id, driver_form("Selvam R", "DL1"))
            .unwrap();
        assert_eq!(updated.driver.assigned_bus, Some(bus.bus.id));
        assert_eq!(updated.bus_details.unwrap().id, bus.bus.id);
    }

    #[test]
    fn maintenance_lists_latest_service_first_with_bus() {
        let registry = registry();
        let bus = registry.create_bus(bus_form("KASC-07", None, None)).unwrap();
        let record = |day: u32, kind: MaintenanceType| MaintenanceForm {
            bus: Some(bus.bus.id),
            maintenance_type: Some(kind),
            description: Some(String::from("Brake pads")),
            cost: Some(4000.0),
            service_date: NaiveDate::from_ymd_opt(2026, 8, day),
            status: MaintenanceStatus::Completed,
            ..MaintenanceForm::default()
        };
        registry.create_maintenance(record(3, MaintenanceType::Repair)).unwrap();
        let service = registry
            .create_maintenance(record(20, MaintenanceType::Service))
            .unwrap();

        let listed = registry.list_maintenance().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].record.id, service.record.id);
        assert_eq!(listed[0].bus_details.as_ref().unwrap().bus_number, "KASC-07");

        let buses = registry.list_buses().unwrap();
        assert_eq!(
            buses[0].bus.last_service_date,
            NaiveDate::from_ymd_opt(2026, 8, 20)
        );
    }

    #[test]
    fn maintenance_for_unknown_bus_is_not_found() {
        let form = MaintenanceForm {
            bus: Some(Uuid::new_v4()),
            maintenance_type: Some(MaintenanceType::Other),
            description: Some(String::from("Seat covers")),
            service_date: NaiveDate::from_ymd_opt(2026, 8, 1),
            ..MaintenanceForm::default()
        };
        assert!(matches!(
            registry().create_maintenance(form),
            Err(TransportError::NotFound(_))
        ));
    }
}
