use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;

use super::{blocking, path_id, AppState};
use crate::error::Result;
use crate::registry::RouteSearch;
use crate::structs::Envelope;

// /api/health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Transport office API is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// /api/routes
pub async fn active_routes(state: web::Data<AppState>) -> Result<HttpResponse> {
    let routes = blocking(move || state.registry.get_active_routes()).await?;
    Ok(HttpResponse::Ok().json(Envelope::list(routes)))
}

// /api/routes/search
pub async fn search_routes(
    state: web::Data<AppState>,
    search: web::Query<RouteSearch>,
) -> Result<HttpResponse> {
    let routes = blocking(move || state.registry.search_routes(&search)).await?;
    Ok(HttpResponse::Ok().json(Envelope::list(routes)))
}

// /api/routes/{id}
pub async fn route(state: web::Data<AppState>, id: web::Path<String>) -> Result<HttpResponse> {
    let id = path_id(&id)?;
    let route = blocking(move || state.registry.get_route(id)).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(route)))
}

// /api/routes/{id}/details
pub async fn route_details(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path_id(&id)?;
    let details = blocking(move || state.registry.get_route_with_assigned_bus(id)).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(details)))
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use serde_json::Value;

    use super::super::{configure, testing};
    use crate::models::RouteForm;

    fn form(name: &str, active: bool) -> RouteForm {
        RouteForm {
            route_name: Some(name.to_string()),
            route_number: Some(format!("{name}-R")),
            starting_point: Some(String::from("Ganapathy")),
            start_time: Some(String::from("07:40")),
            end_time: Some(String::from("08:50")),
            is_active: Some(active),
            ..RouteForm::default()
        }
    }

    #[actix_web::test]
    async fn health_reports_running() {
        let state = testing::state();
        let (data, auth) = testing::data(&state);
        let app =
            test::init_service(App::new().app_data(data).app_data(auth).configure(configure))
                .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "success");
    }

    #[actix_web::test]
    async fn public_listing_hides_inactive_routes() {
        let state = testing::state();
        state.registry.create_route(form("Ganapathy", true)).unwrap();
        let hidden = state.registry.create_route(form("Kovaipudur", false)).unwrap();
        let (data, auth) = testing::data(&state);
        let app =
            test::init_service(App::new().app_data(data).app_data(auth).configure(configure))
                .await;

        let req = test::TestRequest::get().uri("/api/routes").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["routeName"], "Ganapathy");

        // inactive routes can still be opened directly
        let req = test::TestRequest::get()
            .uri(&format!("/api/routes/{}", hidden.id))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["isActive"], false);
    }

    #[actix_web::test]
    async fn unknown_route_is_404_envelope() {
        let state = testing::state();
        let (data, auth) = testing::data(&state);
        let app =
            test::init_service(App::new().app_data(data).app_data(auth).configure(configure))
                .await;

        for uri in [
            format!("/api/routes/{}", uuid::Uuid::new_v4()),
            String::from("/api/routes/not-an-id/details"),
        ] {
            let req = test::TestRequest::get().uri(&uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), 404);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], false);
        }
    }
}
