use std::convert::Infallible;

use actix_web::http::header::CACHE_CONTROL;
use actix_web::{web, HttpResponse};
use log::warn;
use tokio::sync::broadcast::error::RecvError;

use super::AppState;

// /api/events
pub async fn stream(state: web::Data<AppState>) -> HttpResponse {
    let receiver = state.hub.subscribe();

    let frames = futures::stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let frame = web::Bytes::from(event.to_frame());
                    return Some((Ok::<_, Infallible>(frame), receiver));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("[Events] live session fell behind, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((CACHE_CONTROL, "no-cache"))
        .streaming(frames)
}

#[cfg(test)]
mod tests {
    use actix_web::body::MessageBody;
    use actix_web::http::header::CONTENT_TYPE;
    use actix_web::{test, web, App};
    use futures::future::poll_fn;
    use serde_json::json;

    use super::super::{configure, testing};
    use crate::live::Broadcaster;

    #[actix_web::test]
    async fn connected_session_receives_frames() {
        let state = testing::state();
        let (data, auth) = testing::data(&state);
        let app =
            test::init_service(App::new().app_data(data).app_data(auth).configure(configure))
                .await;

        let req = test::TestRequest::get().uri("/api/events").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get(CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );

        state
            .hub
            .broadcast("applicationApproved", json!({"userId": "42"}));

        let mut body = Box::pin(resp.into_body());
        let chunk = poll_fn(|cx| body.as_mut().poll_next(cx))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            chunk,
            web::Bytes::from("event: applicationApproved\ndata: {\"userId\":\"42\"}\n\n")
        );
    }
}
