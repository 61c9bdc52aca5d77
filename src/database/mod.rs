pub mod models;

use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use log::info;
use uuid::Uuid;

use self::models::{
    AccountRow, ApplicationRow, BusRow, DriverChanges, DriverRow, MaintenanceRow,
    NotificationRow, RouteCount, RouteRow,
};
use crate::error::{Result, TransportError};
use crate::models::{
    Account, Application, ApplicationFilter, ApplicationState, ApplicationStatus,
    ApplicationType, Bus, Driver, MaintenanceRecord, MaintenanceType, Notification, Role, Route,
};
use crate::schema::{
    accounts, applications, buses, drivers, maintenance_records, notifications, routes,
};
use crate::storage::Storage;

type PgPool = Pool<ConnectionManager<PgConnection>>;
type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

const CREATE_TABLES: [&str; 9] = [
    "CREATE TABLE IF NOT EXISTS accounts (
        id              UUID PRIMARY KEY,
        name            TEXT NOT NULL,
        register_number TEXT NOT NULL UNIQUE,
        email           TEXT NOT NULL UNIQUE,
        password_hash   TEXT NOT NULL,
        mobile          TEXT NOT NULL,
        department      TEXT NOT NULL,
        city            TEXT NOT NULL,
        role            INT NOT NULL,
        is_active       BOOLEAN NOT NULL DEFAULT TRUE,
        created_at      TIMESTAMPTZ NOT NULL,
        last_login      TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS routes (
        id                 UUID PRIMARY KEY,
        route_name         TEXT NOT NULL UNIQUE,
        route_number       TEXT NOT NULL UNIQUE,
        starting_point     TEXT NOT NULL,
        ending_point       TEXT NOT NULL,
        stops              JSONB NOT NULL DEFAULT '[]',
        start_time         TEXT NOT NULL,
        end_time           TEXT NOT NULL,
        distance           DOUBLE PRECISION NOT NULL DEFAULT 0,
        estimated_duration TEXT,
        fare               DOUBLE PRECISION NOT NULL DEFAULT 0,
        is_active          BOOLEAN NOT NULL DEFAULT TRUE,
        created_at         TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS drivers (
        id             UUID PRIMARY KEY,
        name           TEXT NOT NULL,
        license_number TEXT NOT NULL UNIQUE,
        phone          TEXT NOT NULL,
        address        TEXT NOT NULL,
        experience     INT NOT NULL DEFAULT 0,
        assigned_bus   UUID,
        is_active      BOOLEAN NOT NULL DEFAULT TRUE,
        joining_date   DATE NOT NULL,
        created_at     TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS buses (
        id                  UUID PRIMARY KEY,
        bus_number          TEXT NOT NULL UNIQUE,
        registration_number TEXT NOT NULL UNIQUE,
        capacity            INT NOT NULL CHECK (capacity >= 1),
        current_occupancy   INT NOT NULL DEFAULT 0,
        bus_type            TEXT NOT NULL,
        insurance_expiry    DATE NOT NULL,
        fitness_expiry      DATE NOT NULL,
        last_service_date   DATE,
        next_service_date   DATE,
        route_id            UUID REFERENCES routes (id) ON DELETE SET NULL,
        driver_id           UUID REFERENCES drivers (id) ON DELETE SET NULL,
        is_active           BOOLEAN NOT NULL DEFAULT TRUE,
        created_at          TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS maintenance_records (
        id                UUID PRIMARY KEY,
        bus_id            UUID NOT NULL,
        maintenance_type  TEXT NOT NULL,
        description       TEXT NOT NULL,
        cost              DOUBLE PRECISION NOT NULL DEFAULT 0,
        service_date      DATE NOT NULL,
        next_service_date DATE,
        serviced_by       TEXT,
        status            TEXT NOT NULL,
        notes             TEXT,
        created_at        TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS applications (
        id               UUID PRIMARY KEY,
        account_id       UUID NOT NULL REFERENCES accounts (id),
        name             TEXT NOT NULL,
        register_number  TEXT NOT NULL,
        department       TEXT NOT NULL,
        academic_year    TEXT NOT NULL,
        mobile           TEXT NOT NULL,
        email            TEXT NOT NULL,
        address          TEXT NOT NULL,
        application_type TEXT NOT NULL,
        route_id         UUID,
        current_route_id UUID,
        new_route_id     UUID,
        reason           TEXT,
        status           TEXT NOT NULL,
        decided_by       UUID,
        decided_at       TIMESTAMPTZ,
        rejection_reason TEXT,
        qr_code          TEXT,
        created_at       TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS notifications (
        id         UUID PRIMARY KEY,
        account_id UUID NOT NULL REFERENCES accounts (id),
        title      TEXT NOT NULL,
        message    TEXT NOT NULL,
        category   TEXT NOT NULL,
        is_read    BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS applications_account_idx ON applications (account_id, created_at)",
    "CREATE INDEX IF NOT EXISTS notifications_account_idx ON notifications (account_id, created_at)",
];

pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub fn connect(url: &str) -> Result<PostgresDatabase> {
        info!("Connecting to postgres database");
        let manager = ConnectionManager::<PgConnection>::new(url);
        let pool = Pool::builder().build(manager)?;

        let database = PostgresDatabase { pool };
        database.create_tables()?;
        Ok(database)
    }

    fn connection(&self) -> Result<PgPooled> {
        Ok(self.pool.get()?)
    }

    pub fn create_tables(&self) -> Result<()> {
        let mut conn = self.connection()?;
        for statement in CREATE_TABLES {
            diesel::sql_query(statement).execute(&mut conn)?;
        }
        Ok(())
    }
}

fn ensure_bus_references(conn: &mut PgConnection, bus: &Bus) -> Result<()> {
    if let Some(route_id) = bus.route_id {
        let found: i64 = routes::table
            .filter(routes::id.eq(route_id))
            .count()
            .get_result(conn)?;
        if found == 0 {
            return Err(TransportError::not_found("Route"));
        }
    }
    if let Some(driver_id) = bus.driver_id {
        let found: i64 = drivers::table
            .filter(drivers::id.eq(driver_id))
            .count()
            .get_result(conn)?;
        if found == 0 {
            return Err(TransportError::not_found("Driver"));
        }
    }
    Ok(())
}

/// Takes `next` off every other bus before the bus row itself is written.
fn release_driver_elsewhere(conn: &mut PgConnection, bus_id: Uuid, next: Option<Uuid>) -> Result<()> {
    if let Some(next) = next {
        diesel::update(
            buses::table
                .filter(buses::driver_id.eq(next))
                .filter(buses::id.ne(bus_id)),
        )
        .set(buses::driver_id.eq(None::<Uuid>))
        .execute(conn)?;
    }
    Ok(())
}

fn link_driver(
    conn: &mut PgConnection,
    bus_id: Uuid,
    previous: Option<Uuid>,
    next: Option<Uuid>,
) -> Result<()> {
    if let Some(previous) = previous.filter(|p| Some(*p) != next) {
        diesel::update(drivers::table.find(previous))
            .set(drivers::assigned_bus.eq(None::<Uuid>))
            .execute(conn)?;
    }
    if let Some(next) = next {
        diesel::update(drivers::table.find(next))
            .set(drivers::assigned_bus.eq(Some(bus_id)))
            .execute(conn)?;
    }
    Ok(())
}

fn ensure_bus_exists(conn: &mut PgConnection, bus_id: Uuid) -> Result<()> {
    let found: i64 = buses::table
        .filter(buses::id.eq(bus_id))
        .count()
        .get_result(conn)?;
    if found == 0 {
        return Err(TransportError::not_found("Bus"));
    }
    Ok(())
}

impl Storage for PostgresDatabase {
    fn insert_account(&self, account: Account) -> Result<Account> {
        let row = diesel::insert_into(accounts::table)
            .values(AccountRow::from(account))
            .get_result::<AccountRow>(&mut self.connection()?)?;
        Ok(row.into())
    }

    fn find_account(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(accounts::table
            .find(id)
            .first::<AccountRow>(&mut self.connection()?)
            .optional()?
            .map(Account::from))
    }

    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(accounts::table
            .filter(accounts::email.eq(email))
            .first::<AccountRow>(&mut self.connection()?)
            .optional()?
            .map(Account::from))
    }

    fn find_account_by_register_number(&self, register_number: &str) -> Result<Option<Account>> {
        Ok(accounts::table
            .filter(accounts::register_number.eq(register_number))
            .first::<AccountRow>(&mut self.connection()?)
            .optional()?
            .map(Account::from))
    }

    fn find_accounts(&self, ids: &[Uuid]) -> Result<Vec<Account>> {
        Ok(accounts::table
            .filter(accounts::id.eq_any(ids.to_vec()))
            .load::<AccountRow>(&mut self.connection()?)?
            .into_iter()
            .map(Account::from)
            .collect())
    }

    fn list_accounts(&self, role: Role) -> Result<Vec<Account>> {
        Ok(accounts::table
            .filter(accounts::role.eq(role.as_int()))
            .order(accounts::created_at.desc())
            .load::<AccountRow>(&mut self.connection()?)?
            .into_iter()
            .map(Account::from)
            .collect())
    }

    fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let updated = diesel::update(accounts::table.find(id))
            .set(accounts::last_login.eq(Some(at)))
            .execute(&mut self.connection()?)?;
        if updated == 0 {
            return Err(TransportError::not_found("Account"));
        }
        Ok(())
    }

    fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let updated = diesel::update(accounts::table.find(id))
            .set(accounts::password_hash.eq(password_hash))
            .execute(&mut self.connection()?)?;
        if updated == 0 {
            return Err(TransportError::not_found("Account"));
        }
        Ok(())
    }

    fn count_accounts(&self, role: Role, logged_in_since: Option<DateTime<Utc>>) -> Result<i64> {
        let mut query = accounts::table
            .filter(accounts::role.eq(role.as_int()))
            .into_boxed();
        if let Some(since) = logged_in_since {
            query = query.filter(accounts::last_login.ge(since));
        }
        Ok(query.count().get_result(&mut self.connection()?)?)
    }

    fn has_accounts(&self) -> Result<bool> {
        let count: i64 = accounts::table
            .count()
            .get_result(&mut self.connection()?)?;
        Ok(count > 0)
    }

    fn insert_route(&self, route: Route) -> Result<Route> {
        diesel::insert_into(routes::table)
            .values(RouteRow::try_from(route)?)
            .get_result::<RouteRow>(&mut self.connection()?)?
            .try_into()
    }

    fn update_route(&self, route: Route) -> Result<Route> {
        let id = route.id;
        diesel::update(routes::table.find(id))
            .set(RouteRow::try_from(route)?)
            .get_result::<RouteRow>(&mut self.connection()?)
            .optional()?
            .ok_or_else(|| TransportError::not_found("Route"))?
            .try_into()
    }

    fn delete_route(&self, id: Uuid) -> Result<()> {
        self.connection()?.transaction::<_, TransportError, _>(|conn| {
            diesel::update(buses::table.filter(buses::route_id.eq(id)))
                .set(buses::route_id.eq(None::<Uuid>))
                .execute(conn)?;
            let deleted = diesel::delete(routes::table.find(id)).execute(conn)?;
            if deleted == 0 {
                return Err(TransportError::not_found("Route"));
            }
            Ok(())
        })
    }

    fn find_route(&self, id: Uuid) -> Result<Option<Route>> {
        routes::table
            .find(id)
            .first::<RouteRow>(&mut self.connection()?)
            .optional()?
            .map(Route::try_from)
            .transpose()
    }

    fn find_routes(&self, ids: &[Uuid]) -> Result<Vec<Route>> {
        routes::table
            .filter(routes::id.eq_any(ids.to_vec()))
            .load::<RouteRow>(&mut self.connection()?)?
            .into_iter()
            .map(Route::try_from)
            .collect()
    }

    fn list_routes(&self, active_only: bool) -> Result<Vec<Route>> {
        let mut query = routes::table.order(routes::route_name.asc()).into_boxed();
        if active_only {
            query = query.filter(routes::is_active.eq(true));
        }
        query
            .load::<RouteRow>(&mut self.connection()?)?
            .into_iter()
            .map(Route::try_from)
            .collect()
    }

    fn count_routes(&self) -> Result<i64> {
        Ok(routes::table.count().get_result(&mut self.connection()?)?)
    }

    fn insert_bus(&self, bus: Bus) -> Result<Bus> {
        self.connection()?.transaction::<_, TransportError, _>(|conn| {
            ensure_bus_references(conn, &bus)?;
            release_driver_elsewhere(conn, bus.id, bus.driver_id)?;
            let row = diesel::insert_into(buses::table)
                .values(BusRow::from(bus))
                .get_result::<BusRow>(conn)?;
            link_driver(conn, row.id, None, row.driver_id)?;
            row.try_into()
        })
    }

    fn update_bus(&self, bus: Bus) -> Result<Bus> {
        self.connection()?.transaction::<_, TransportError, _>(|conn| {
            let previous: Option<Uuid> = buses::table
                .find(bus.id)
                .select(buses::driver_id)
                .for_update()
                .first::<Option<Uuid>>(conn)
                .optional()?
                .ok_or_else(|| TransportError::not_found("Bus"))?;
            ensure_bus_references(conn, &bus)?;
            release_driver_elsewhere(conn, bus.id, bus.driver_id)?;
            let row = diesel::update(buses::table.find(bus.id))
                .set(BusRow::from(bus))
                .get_result::<BusRow>(conn)?;
            link_driver(conn, row.id, previous, row.driver_id)?;
            row.try_into()
        })
    }

    fn delete_bus(&self, id: Uuid) -> Result<()> {
        self.connection()?.transaction::<_, TransportError, _>(|conn| {
            let deleted = diesel::delete(buses::table.find(id)).execute(conn)?;
            if deleted == 0 {
                return Err(TransportError::not_found("Bus"));
            }
            diesel::update(drivers::table.filter(drivers::assigned_bus.eq(id)))
                .set(drivers::assigned_bus.eq(None::<Uuid>))
                .execute(conn)?;
            Ok(())
        })
    }

    fn find_bus(&self, id: Uuid) -> Result<Option<Bus>> {
        buses::table
            .find(id)
            .first::<BusRow>(&mut self.connection()?)
            .optional()?
            .map(Bus::try_from)
            .transpose()
    }

    fn find_bus_by_route(&self, route_id: Uuid) -> Result<Option<Bus>> {
        buses::table
            .filter(buses::route_id.eq(route_id))
            .order(buses::created_at.asc())
            .first::<BusRow>(&mut self.connection()?)
            .optional()?
            .map(Bus::try_from)
            .transpose()
    }

    fn list_buses(&self) -> Result<Vec<Bus>> {
        buses::table
            .order(buses::created_at.desc())
            .load::<BusRow>(&mut self.connection()?)?
            .into_iter()
            .map(Bus::try_from)
            .collect()
    }

    fn count_buses(&self, active_only: bool) -> Result<i64> {
        let mut query = buses::table.into_boxed();
        if active_only {
            query = query.filter(buses::is_active.eq(true));
        }
        Ok(query.count().get_result(&mut self.connection()?)?)
    }

    fn insert_driver(&self, driver: Driver) -> Result<Driver> {
        let row = diesel::insert_into(drivers::table)
            .values(DriverRow::from(driver))
            .get_result::<DriverRow>(&mut self.connection()?)?;
        Ok(row.into())
    }

    fn update_driver(&self, driver: Driver) -> Result<Driver> {
        let id = driver.id;
        diesel::update(drivers::table.find(id))
            .set(DriverChanges::from(driver))
            .get_result::<DriverRow>(&mut self.connection()?)
            .optional()?
            .map(Driver::from)
            .ok_or_else(|| TransportError::not_found("Driver"))
    }

    fn delete_driver(&self, id: Uuid) -> Result<()> {
        self.connection()?.transaction::<_, TransportError, _>(|conn| {
            diesel::update(buses::table.filter(buses::driver_id.eq(id)))
                .set(buses::driver_id.eq(None::<Uuid>))
                .execute(conn)?;
            let deleted = diesel::delete(drivers::table.find(id)).execute(conn)?;
            if deleted == 0 {
                return Err(TransportError::not_found("Driver"));
            }
            Ok(())
        })
    }

    fn find_driver(&self, id: Uuid) -> Result<Option<Driver>> {
        Ok(drivers::table
            .find(id)
            .first::<DriverRow>(&mut self.connection()?)
            .optional()?
            .map(Driver::from))
    }

    fn list_drivers(&self) -> Result<Vec<Driver>> {
        Ok(drivers::table
            .order(drivers::created_at.desc())
            .load::<DriverRow>(&mut self.connection()?)?
            .into_iter()
            .map(Driver::from)
            .collect())
    }

    fn count_drivers(&self) -> Result<i64> {
        Ok(drivers::table.count().get_result(&mut self.connection()?)?)
    }

    fn insert_maintenance(&self, record: MaintenanceRecord) -> Result<MaintenanceRecord> {
        self.connection()?.transaction::<_, TransportError, _>(|conn| {
            ensure_bus_exists(conn, record.bus_id)?;
            if record.maintenance_type == MaintenanceType::Service {
                diesel::update(buses::table.find(record.bus_id))
                    .set((
                        buses::last_service_date.eq(Some(record.service_date)),
                        buses::next_service_date.eq(record.next_service_date),
                    ))
                    .execute(conn)?;
            }
            diesel::insert_into(maintenance_records::table)
                .values(MaintenanceRow::from(record))
                .get_result::<MaintenanceRow>(conn)?
                .try_into()
        })
    }

    fn update_maintenance(&self, record: MaintenanceRecord) -> Result<MaintenanceRecord> {
        self.connection()?.transaction::<_, TransportError, _>(|conn| {
            ensure_bus_exists(conn, record.bus_id)?;
            let id = record.id;
            diesel::update(maintenance_records::table.find(id))
                .set(MaintenanceRow::from(record))
                .get_result::<MaintenanceRow>(conn)
                .optional()?
                .ok_or_else(|| TransportError::not_found("Maintenance record"))?
                .try_into()
        })
    }

    fn list_maintenance(&self) -> Result<Vec<MaintenanceRecord>> {
        maintenance_records::table
            .order((
                maintenance_records::service_date.desc(),
                maintenance_records::created_at.desc(),
            ))
            .load::<MaintenanceRow>(&mut self.connection()?)?
            .into_iter()
            .map(MaintenanceRecord::try_from)
            .collect()
    }

    fn insert_application(&self, application: Application) -> Result<Application> {
        diesel::insert_into(applications::table)
            .values(ApplicationRow::from(application))
            .get_result::<ApplicationRow>(&mut self.connection()?)?
            .try_into()
    }

    fn find_application(&self, id: Uuid) -> Result<Option<Application>> {
        applications::table
            .find(id)
            .first::<ApplicationRow>(&mut self.connection()?)
            .optional()?
            .map(Application::try_from)
            .transpose()
    }

    fn decide_application(&self, id: Uuid, state: ApplicationState) -> Result<Application> {
        let mut conn = self.connection()?;
        let (status, decided_by, decided_at, rejection_reason, qr_code) = state.columns();

        // the status guard makes a lost race look like an already decided row
        let updated = diesel::update(
            applications::table
                .find(id)
                .filter(applications::status.eq(ApplicationStatus::Pending.as_str())),
        )
        .set((
            applications::status.eq(status),
            applications::decided_by.eq(decided_by),
            applications::decided_at.eq(decided_at),
            applications::rejection_reason.eq(rejection_reason),
            applications::qr_code.eq(qr_code),
        ))
        .get_result::<ApplicationRow>(&mut conn)
        .optional()?;

        match updated {
            Some(row) => row.try_into(),
            None => {
                let current = applications::table
                    .find(id)
                    .select(applications::status)
                    .first::<String>(&mut conn)
                    .optional()?;
                match current {
                    Some(status) => Err(TransportError::Conflict(format!(
                        "Application has already been {status}"
                    ))),
                    None => Err(TransportError::not_found("Application")),
                }
            }
        }
    }

    fn list_applications(&self, filter: &ApplicationFilter) -> Result<Vec<Application>> {
        let mut query = applications::table
            .order(applications::created_at.desc())
            .into_boxed();
        if let Some(status) = filter.status {
            query = query.filter(applications::status.eq(status.as_str()));
        }
        if let Some(kind) = filter.application_type {
            query = query.filter(applications::application_type.eq(kind.as_str()));
        }
        if let Some(account_id) = filter.account_id {
            query = query.filter(applications::account_id.eq(account_id));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit as i64);
        }

        query
            .load::<ApplicationRow>(&mut self.connection()?)?
            .into_iter()
            .map(Application::try_from)
            .collect()
    }

    fn count_applications(&self, status: Option<ApplicationStatus>) -> Result<i64> {
        let mut query = applications::table.into_boxed();
        if let Some(status) = status {
            query = query.filter(applications::status.eq(status.as_str()));
        }
        Ok(query.count().get_result(&mut self.connection()?)?)
    }

    fn count_applications_by_type(&self) -> Result<Vec<(ApplicationType, i64)>> {
        applications::table
            .group_by(applications::application_type)
            .select((applications::application_type, count_star()))
            .load::<(String, i64)>(&mut self.connection()?)?
            .into_iter()
            .map(|(kind, count)| Ok((kind.parse()?, count)))
            .collect()
    }

    fn count_approved_by_route(&self) -> Result<Vec<(Uuid, i64)>> {
        let counts = diesel::sql_query(
            "SELECT COALESCE(route_id, new_route_id, current_route_id) AS route, \
             COUNT(*) AS students \
             FROM applications WHERE status = 'approved' GROUP BY 1",
        )
        .load::<RouteCount>(&mut self.connection()?)?;
        Ok(counts.into_iter().map(|c| (c.route, c.students)).collect())
    }

    fn insert_notification(&self, notification: Notification) -> Result<Notification> {
        diesel::insert_into(notifications::table)
            .values(NotificationRow::from(notification))
            .get_result::<NotificationRow>(&mut self.connection()?)?
            .try_into()
    }

    fn list_notifications(&self, account_id: Uuid, limit: i64) -> Result<Vec<Notification>> {
        notifications::table
            .filter(notifications::account_id.eq(account_id))
            .order(notifications::created_at.desc())
            .limit(limit)
            .load::<NotificationRow>(&mut self.connection()?)?
            .into_iter()
            .map(Notification::try_from)
            .collect()
    }

    fn mark_notification_read(&self, id: Uuid) -> Result<Notification> {
        diesel::update(notifications::table.find(id))
            .set(notifications::is_read.eq(true))
            .get_result::<NotificationRow>(&mut self.connection()?)
            .optional()?
            .ok_or_else(|| TransportError::not_found("Notification"))?
            .try_into()
    }
}
