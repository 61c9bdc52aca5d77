pub mod account;
pub mod application;
pub mod fleet;
pub mod notification;
pub mod route;
pub mod validation;

pub use account::{Account, AccountSummary, Role, DEPARTMENTS};
pub use application::{
    Applicant, Application, ApplicationDetails, ApplicationFilter, ApplicationState,
    ApplicationStatus, ApplicationType, ResolvedRoutes, RouteRequest, ACADEMIC_YEARS,
    DEFAULT_REJECTION_REASON,
};
pub use fleet::{
    Bus, BusDetails, BusForm, BusSummary, BusType, Driver, DriverDetails, DriverForm,
    DriverSummary, MaintenanceDetails, MaintenanceForm, MaintenanceRecord, MaintenanceStatus,
    MaintenanceType,
};
pub use notification::{Category, Notification};
pub use route::{Route, RouteDetails, RouteForm, RouteSummary, Stop};
