use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use super::{blocking, path_id, AppState};
use crate::auth::AdminSession;
use crate::error::{Result, TransportError};
use crate::models::{ApplicationFilter, BusForm, DriverForm, MaintenanceForm, Role, RouteForm};
use crate::structs::Envelope;

#[derive(Deserialize, Debug, Default)]
pub struct Rejection {
    pub reason: Option<String>,
}

// /api/admin/students
pub async fn students(state: web::Data<AppState>, _admin: AdminSession) -> Result<HttpResponse> {
    let students = blocking(move || state.storage.list_accounts(Role::Student)).await?;
    Ok(HttpResponse::Ok().json(Envelope::list(students)))
}

// /api/admin/students/search/{reg_no}
pub async fn student_search(
    state: web::Data<AppState>,
    _admin: AdminSession,
    reg_no: web::Path<String>,
) -> Result<HttpResponse> {
    let register_number = reg_no.trim().to_uppercase();
    let found = blocking(move || {
        let student = state
            .storage
            .find_account_by_register_number(&register_number)?
            .filter(|account| account.role == Role::Student)
            .ok_or_else(|| TransportError::NotFound(String::from("Student not found")))?;
        let applications = state.lifecycle.list_for_account(student.id)?;
        Ok(json!({
            "student": student,
            "applications": applications,
        }))
    })
    .await?;
    Ok(HttpResponse::Ok().json(Envelope::data(found)))
}

// /api/admin/applications
pub async fn applications(
    state: web::Data<AppState>,
    _admin: AdminSession,
    filter: web::Query<ApplicationFilter>,
) -> Result<HttpResponse> {
    let filter = filter.into_inner();
    let applications = blocking(move || state.lifecycle.list_by_filter(&filter)).await?;
    Ok(HttpResponse::Ok().json(Envelope::list(applications)))
}

// /api/admin/applications/{id}/approve
pub async fn approve(
    state: web::Data<AppState>,
    AdminSession(admin): AdminSession,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path_id(&id)?;
    let application = blocking(move || state.lifecycle.approve(id, admin.id)).await?;
    Ok(HttpResponse::Ok()
        .json(Envelope::data(application).with_message("Application approved successfully")))
}

// /api/admin/applications/{id}/reject
pub async fn reject(
    state: web::Data<AppState>,
    AdminSession(admin): AdminSession,
    id: web::Path<String>,
    body: Option<web::Json<Rejection>>,
) -> Result<HttpResponse> {
    let id = path_id(&id)?;
    let reason = body.and_then(|body| body.into_inner().reason);
    let application =
        blocking(move || state.lifecycle.reject(id, admin.id, reason.as_deref())).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(application).with_message("Application rejected")))
}

// /api/admin/analytics
pub async fn analytics(state: web::Data<AppState>, _admin: AdminSession) -> Result<HttpResponse> {
    let dashboard = blocking(move || state.analytics.compute()).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(dashboard)))
}

// /api/admin/drivers
pub async fn drivers(state: web::Data<AppState>, _admin: AdminSession) -> Result<HttpResponse> {
    let drivers = blocking(move || state.registry.list_drivers()).await?;
    Ok(HttpResponse::Ok().json(Envelope::list(drivers)))
}

pub async fn create_driver(
    state: web::Data<AppState>,
    _admin: AdminSession,
    form: web::Json<DriverForm>,
) -> Result<HttpResponse> {
    let driver = blocking(move || state.registry.create_driver(form.into_inner())).await?;
    Ok(HttpResponse::Created()
        .json(Envelope::data(driver).with_message("Driver created successfully")))
}

pub async fn update_driver(
    state: web::Data<AppState>,
    _admin: AdminSession,
    id: web::Path<String>,
    form: web::Json<DriverForm>,
) -> Result<HttpResponse> {
    let id = path_id(&id)?;
    let driver = blocking(move || state.registry.update_driver(id, form.into_inner())).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(driver).with_message("Driver updated successfully")))
}

pub async fn delete_driver(
    state: web::Data<AppState>,
    _admin: AdminSession,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path_id(&id)?;
    blocking(move || state.registry.delete_driver(id)).await?;
    Ok(HttpResponse::Ok().json(Envelope::<()>::message("Driver deleted successfully")))
}

// /api/admin/buses
pub async fn buses(state: web::Data<AppState>, _admin: AdminSession) -> Result<HttpResponse> {
    let buses = blocking(move || state.registry.list_buses()).await?;
    Ok(HttpResponse::Ok().json(Envelope::list(buses)))
}

pub async fn create_bus(
    state: web::Data<AppState>,
    _admin: AdminSession,
    form: web::Json<BusForm>,
) -> Result<HttpResponse> {
    let bus = blocking(move || state.registry.create_bus(form.into_inner())).await?;
    Ok(HttpResponse::Created().json(Envelope::data(bus).with_message("Bus created successfully")))
}

pub async fn update_bus(
    state: web::Data<AppState>,
    _admin: AdminSession,
    id: web::Path<String>,
    form: web::Json<BusForm>,
) -> Result<HttpResponse> {
    let id = path_id(&id)?;
    let bus = blocking(move || state.registry.update_bus(id, form.into_inner())).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(bus).with_message("Bus updated successfully")))
}

pub async fn delete_bus(
    state: web::Data<AppState>,
    _admin: AdminSession,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path_id(&id)?;
    blocking(move || state.registry.delete_bus(id)).await?;
    Ok(HttpResponse::Ok().json(Envelope::<()>::message("Bus deleted successfully")))
}

// /api/admin/routes
pub async fn routes(state: web::Data<AppState>, _admin: AdminSession) -> Result<HttpResponse> {
    let routes = blocking(move || state.registry.list_routes()).await?;
    Ok(HttpResponse::Ok().json(Envelope::list(routes)))
}

pub async fn create_route(
    state: web::Data<AppState>,
    _admin: AdminSession,
    form: web::Json<RouteForm>,
) -> Result<HttpResponse> {
    let route = blocking(move || state.registry.create_route(form.into_inner())).await?;
    Ok(HttpResponse::Created()
        .json(Envelope::data(route).with_message("Route created successfully")))
}

pub async fn update_route(
    state: web::Data<AppState>,
    _admin: AdminSession,
    id: web::Path<String>,
    form: web::Json<RouteForm>,
) -> Result<HttpResponse> {
    let id = path_id(&id)?;
    let route = blocking(move || state.registry.update_route(id, form.into_inner())).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(route).with_message("Route updated successfully")))
}

pub async fn delete_route(
    state: web::Data<AppState>,
    _admin: AdminSession,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path_id(&id)?;
    blocking(move || state.registry.delete_route(id)).await?;
    Ok(HttpResponse::Ok().json(Envelope::<()>::message("Route deleted successfully")))
}

// /api/admin/maintenance
pub async fn maintenance(state: web::Data<AppState>, _admin: AdminSession) -> Result<HttpResponse> {
    let records = blocking(move || state.registry.list_maintenance()).await?;
    Ok(HttpResponse::Ok().json(Envelope::list(records)))
}

pub async fn create_maintenance(
    state: web::Data<AppState>,
    _admin: AdminSession,
    form: web::Json<MaintenanceForm>,
) -> Result<HttpResponse> {
    let record = blocking(move || state.registry.create_maintenance(form.into_inner())).await?;
    Ok(HttpResponse::Created()
        .json(Envelope::data(record).with_message("Maintenance record created successfully")))
}

pub async fn update_maintenance(
    state: web::Data<AppState>,
    _admin: AdminSession,
    id: web::Path<String>,
    form: web::Json<MaintenanceForm>,
) -> Result<HttpResponse> {
    let id = path_id(&id)?;
    let record =
        blocking(move || state.registry.update_maintenance(id, form.into_inner())).await?;
    Ok(HttpResponse::Ok()
        .json(Envelope::data(record).with_message("Maintenance record updated successfully")))
}
