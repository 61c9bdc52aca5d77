use actix_web::{web, HttpResponse};

use super::{blocking, path_id, AppState};
use crate::auth::AuthSession;
use crate::error::Result;
use crate::lifecycle::ApplicationForm;
use crate::models::ApplicationType;
use crate::structs::Envelope;

async fn submit(
    state: web::Data<AppState>,
    account_id: uuid::Uuid,
    kind: ApplicationType,
    form: ApplicationForm,
    message: &str,
) -> Result<HttpResponse> {
    let application = blocking(move || state.lifecycle.submit(account_id, kind, form)).await?;
    Ok(HttpResponse::Created().json(Envelope::data(application).with_message(message)))
}

// /api/transport/apply
pub async fn apply(
    state: web::Data<AppState>,
    AuthSession(account): AuthSession,
    form: web::Json<ApplicationForm>,
) -> Result<HttpResponse> {
    submit(
        state,
        account.id,
        ApplicationType::New,
        form.into_inner(),
        "Transport application submitted successfully",
    )
    .await
}

// /api/transport/change
pub async fn change(
    state: web::Data<AppState>,
    AuthSession(account): AuthSession,
    form: web::Json<ApplicationForm>,
) -> Result<HttpResponse> {
    submit(
        state,
        account.id,
        ApplicationType::Change,
        form.into_inner(),
        "Route change request submitted successfully",
    )
    .await
}

// /api/transport/cancel
pub async fn cancel(
    state: web::Data<AppState>,
    AuthSession(account): AuthSession,
    form: web::Json<ApplicationForm>,
) -> Result<HttpResponse> {
    submit(
        state,
        account.id,
        ApplicationType::Cancel,
        form.into_inner(),
        "Route cancellation request submitted successfully",
    )
    .await
}

// /api/transport/status
pub async fn status(
    state: web::Data<AppState>,
    AuthSession(account): AuthSession,
) -> Result<HttpResponse> {
    let applications = blocking(move || state.lifecycle.list_for_account(account.id)).await?;
    Ok(HttpResponse::Ok().json(Envelope::list(applications)))
}

// /api/transport/notifications
pub async fn notifications(
    state: web::Data<AppState>,
    AuthSession(account): AuthSession,
) -> Result<HttpResponse> {
    let notifications = blocking(move || state.feed.list_recent(account.id)).await?;
    Ok(HttpResponse::Ok().json(Envelope::list(notifications)))
}

// /api/transport/notifications/{id}/read
pub async fn mark_notification_read(
    state: web::Data<AppState>,
    _session: AuthSession,
    id: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path_id(&id)?;
    let notification = blocking(move || state.feed.mark_read(id)).await?;
    Ok(HttpResponse::Ok().json(Envelope::data(notification)))
}
