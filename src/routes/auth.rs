use actix_web::{web, HttpResponse};

use super::{blocking, AppState};
use crate::auth::{AuthSession, LoginForm, PasswordChange, RegistrationForm};
use crate::error::Result;
use crate::structs::Envelope;

// /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    form: web::Json<RegistrationForm>,
) -> Result<HttpResponse> {
    let session = blocking(move || state.auth.register(form.into_inner())).await?;
    Ok(HttpResponse::Created().json(Envelope::data(session)))
}

// /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    form: web::Json<LoginForm>,
) -> Result<HttpResponse> {
    let session = blocking(move || state.auth.login(form.into_inner())).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(session)))
}

// /api/auth/me
pub async fn me(AuthSession(account): AuthSession) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(Envelope::data(account)))
}

// /api/auth/password
pub async fn change_password(
    state: web::Data<AppState>,
    AuthSession(account): AuthSession,
    change: web::Json<PasswordChange>,
) -> Result<HttpResponse> {
    blocking(move || state.auth.change_password(account.id, change.into_inner())).await?;
    Ok(HttpResponse::Ok().json(Envelope::message("Password updated successfully")))
}

#[cfg(test)]
mod tests {
    use actix_web::http::header::AUTHORIZATION;
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use super::super::{configure, testing};

    fn registration() -> Value {
        json!({
            "name": "Harini",
            "registerNumber": "24bba019",
            "email": "harini@kasc.edu",
            "password": "harini-pass",
            "mobile": "9360012345",
            "department": "BBA",
            "city": "Pollachi",
        })
    }

    #[actix_web::test]
    async fn register_login_and_me() {
        let state = testing::state();
        let (data, auth) = testing::data(&state);
        let app =
            test::init_service(App::new().app_data(data).app_data(auth).configure(configure))
                .await;

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(registration())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["user"]["registerNumber"], "24BBA019");
        assert!(body["data"]["user"].get("passwordHash").is_none());

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"email": "harini@kasc.edu", "password": "harini-pass"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header((AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["email"], "harini@kasc.edu");
        assert!(body["data"]["lastLogin"].is_string());
    }

    #[actix_web::test]
    async fn validation_and_auth_failures_use_envelope() {
        let state = testing::state();
        let (data, auth) = testing::data(&state);
        let app =
            test::init_service(App::new().app_data(data).app_data(auth).configure(configure))
                .await;

        let mut incomplete = registration();
        incomplete["mobile"] = json!("123");
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(incomplete)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("mobile"));

        let req = test::TestRequest::get().uri("/api/auth/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);

        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header((AUTHORIZATION, "Bearer garbage"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn password_can_be_changed() {
        let state = testing::state();
        let (data, auth) = testing::data(&state);
        let app =
            test::init_service(App::new().app_data(data).app_data(auth).configure(configure))
                .await;

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(registration())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::put()
            .uri("/api/auth/password")
            .insert_header((AUTHORIZATION, format!("Bearer {token}")))
            .set_json(json!({"currentPassword": "harini-pass", "newPassword": "another-pass"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"email": "harini@kasc.edu", "password": "harini-pass"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }
}
