use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use qrcode::render::svg;
use qrcode::QrCode;
use serde::Serialize;

use crate::error::{Result, TransportError};
use crate::models::Application;

const DATA_URL_PREFIX: &str = "data:image/svg+xml;base64,";

/// What the QR code encodes. Scanning it tells a conductor who may board and on which route.
#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPayload {
    pub application_id: String,
    pub student_name: String,
    pub register_number: String,
    pub route: String,
}

impl From<&Application> for CredentialPayload {
    fn from(application: &Application) -> Self {
        CredentialPayload {
            application_id: application.id.to_string(),
            student_name: application.applicant.name.clone(),
            register_number: application.applicant.register_number.clone(),
            route: application.request.effective_route().to_string(),
        }
    }
}

/// Renders the payload as an SVG QR code packed into a data URL.
pub fn issue(application: &Application) -> Result<String> {
    let payload = serde_json::to_string(&CredentialPayload::from(application))?;
    let code = QrCode::new(payload.as_bytes())
        .map_err(|e| TransportError::Internal(format!("qr encoding: {e}")))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .build();

    Ok(format!("{DATA_URL_PREFIX}{}", STANDARD.encode(image)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Applicant, ApplicationState, RouteRequest};
    use chrono::Utc;
    use uuid::Uuid;

    fn application(request: RouteRequest) -> Application {
        Application {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            applicant: Applicant {
                name: String::from("Kavin"),
                register_number: String::from("23BCOM045"),
                department: String::from("B.Com"),
                academic_year: String::from("I Year"),
                mobile: String::from("9000000001"),
                email: String::from("kavin@kasc.edu"),
                address: String::from("Gandhipuram"),
            },
            request,
            reason: None,
            state: ApplicationState::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn credential_is_svg_data_url() {
        let credential = issue(&application(RouteRequest::New {
            route: Uuid::new_v4(),
        }))
        .unwrap();

        let encoded = credential.strip_prefix(DATA_URL_PREFIX).unwrap();
        let svg = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn payload_points_at_new_route_for_changes() {
        let new_route = Uuid::new_v4();
        let application = application(RouteRequest::Change {
            current_route: Uuid::new_v4(),
            new_route,
        });

        let payload = CredentialPayload::from(&application);
        assert_eq!(payload.route, new_route.to_string());
        assert_eq!(payload.student_name, "Kavin");

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("applicationId").is_some());
        assert!(json.get("registerNumber").is_some());
    }
}
