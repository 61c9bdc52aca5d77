pub mod admin;
pub mod auth;
pub mod catalog;
pub mod events;
pub mod transport;

use std::sync::Arc;

use actix_web::web;
use uuid::Uuid;

use crate::analytics::Analytics;
use crate::auth::AuthService;
use crate::error::{Result, TransportError};
use crate::lifecycle::Lifecycle;
use crate::live::EventHub;
use crate::notifications::NotificationFeed;
use crate::registry::Registry;
use crate::storage::Storage;

/// Everything the handlers reach for. Cloning shares the services.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub auth: Arc<AuthService>,
    pub lifecycle: Arc<Lifecycle>,
    pub feed: Arc<NotificationFeed>,
    pub analytics: Arc<Analytics>,
    pub registry: Arc<Registry>,
    pub hub: Arc<EventHub>,
}

/// Runs storage work on the blocking pool.
pub async fn blocking<F, T>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    web::block(work).await?
}

/// Path ids that do not parse are treated like ids that do not exist.
pub fn path_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| TransportError::NotFound(String::from("Resource not found")))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
        TransportError::validation(err.to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _| {
        TransportError::validation(err.to_string()).into()
    }))
    .route("/api/health", web::get().to(catalog::health))
    .route("/api/events", web::get().to(events::stream))
    .service(
        web::scope("/api/routes")
            .route("", web::get().to(catalog::active_routes))
            .route("/search", web::get().to(catalog::search_routes))
            .route("/{id}", web::get().to(catalog::route))
            .route("/{id}/details", web::get().to(catalog::route_details)),
    )
    .service(
        web::scope("/api/auth")
            .route("/register", web::post().to(auth::register))
            .route("/login", web::post().to(auth::login))
            .route("/me", web::get().to(auth::me))
            .route("/password", web::put().to(auth::change_password)),
    )
    .service(
        web::scope("/api/transport")
            .route("/apply", web::post().to(transport::apply))
            .route("/change", web::post().to(transport::change))
            .route("/cancel", web::post().to(transport::cancel))
            .route("/status", web::get().to(transport::status))
            .route("/notifications", web::get().to(transport::notifications))
            .route(
                "/notifications/{id}/read",
                web::put().to(transport::mark_notification_read),
            ),
    )
    .service(
        web::scope("/api/admin")
            .route("/students", web::get().to(admin::students))
            .route("/students/search/{reg_no}", web::get().to(admin::student_search))
            .route("/applications", web::get().to(admin::applications))
            .route("/applications/{id}/approve", web::put().to(admin::approve))
            .route("/applications/{id}/reject", web::put().to(admin::reject))
            .route("/analytics", web::get().to(admin::analytics))
            .route("/drivers", web::get().to(admin::drivers))
            .route("/drivers", web::post().to(admin::create_driver))
            .route("/drivers/{id}", web::put().to(admin::update_driver))
            .route("/drivers/{id}", web::delete().to(admin::delete_driver))
            .route("/buses", web::get().to(admin::buses))
            .route("/buses", web::post().to(admin::create_bus))
            .route("/buses/{id}", web::put().to(admin::update_bus))
            .route("/buses/{id}", web::delete().to(admin::delete_bus))
            .route("/routes", web::get().to(admin::routes))
            .route("/routes", web::post().to(admin::create_route))
            .route("/routes/{id}", web::put().to(admin::update_route))
            .route("/routes/{id}", web::delete().to(admin::delete_route))
            .route("/maintenance", web::get().to(admin::maintenance))
            .route("/maintenance", web::post().to(admin::create_maintenance))
            .route("/maintenance/{id}", web::put().to(admin::update_maintenance)),
    );
}
