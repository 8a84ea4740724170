use actix_web::{http::StatusCode, post, web, HttpRequest, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::account::AccountId;
use crate::api::executor::{execute_clear, ClearCommand, ClearError};
use crate::api::routes::AppData;

/// Header carrying the authenticated account id, filled in by the identity
/// provider at the trust boundary. The handler never derives authorization
/// from the JSON payload.
pub const SESSION_HEADER: &str = "x-session-account";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearMessagesRequest {
    #[serde(default)]
    pub clear_request_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub partner_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearMessagesResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_count: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ClearMessagesError {
    #[error("missing required parameters")]
    MissingParameters,
    #[error("malformed request body: {0}")]
    BadPayload(#[source] serde_json::Error),
    #[error("{0} is not a valid identifier")]
    BadIdentifier(&'static str),
    #[error("no authenticated session")]
    NoSession,
    #[error(transparent)]
    Clear(#[from] ClearError),
}

impl ResponseError for ClearMessagesError {
    fn status_code(&self) -> StatusCode {
        match self {
            ClearMessagesError::MissingParameters
            | ClearMessagesError::BadPayload(_)
            | ClearMessagesError::BadIdentifier(_) => StatusCode::BAD_REQUEST,
            ClearMessagesError::NoSession => StatusCode::FORBIDDEN,
            ClearMessagesError::Clear(e) => match e {
                ClearError::NotFound => StatusCode::NOT_FOUND,
                ClearError::NotAccepted | ClearError::Unauthorized => StatusCode::FORBIDDEN,
                ClearError::PartnerMismatch => StatusCode::BAD_REQUEST,
                ClearError::Deletion(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ClearMessagesResponse {
            success: false,
            message: self.to_string(),
            deleted_count: None,
        })
    }
}

/// The privileged clear-messages function. The body is parsed by hand so
/// that malformed or incomplete payloads still produce the structured
/// `{success:false, ...}` envelope instead of a bare 400.
#[post("/functions/clear-messages")]
pub async fn clear_messages(
    request: HttpRequest,
    body: web::Bytes,
    data: web::Data<AppData>,
) -> Result<HttpResponse, ClearMessagesError> {
    let caller = session_account(&request)?;
    let payload: ClearMessagesRequest =
        serde_json::from_slice(&body).map_err(ClearMessagesError::BadPayload)?;
    let command = payload.into_command()?;
    log::debug!(
        "clear-messages invoked by {} for request {}",
        caller.short(),
        command.clear_request_id
    );

    let outcome = execute_clear(&data.store, caller, &command)?;
    Ok(HttpResponse::Ok().json(ClearMessagesResponse {
        success: true,
        message: format!(
            "messages cleared successfully, total deleted: {}",
            outcome.deleted
        ),
        deleted_count: Some(outcome.deleted),
    }))
}

fn session_account(request: &HttpRequest) -> Result<AccountId, ClearMessagesError> {
    request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .ok_or(ClearMessagesError::NoSession)
}

impl ClearMessagesRequest {
    fn into_command(self) -> Result<ClearCommand, ClearMessagesError> {
        let clear_request_id = required(self.clear_request_id)?;
        let user_id = required(self.user_id)?;
        let partner_id = required(self.partner_id)?;
        Ok(ClearCommand {
            clear_request_id: clear_request_id
                .parse::<Uuid>()
                .map_err(|_| ClearMessagesError::BadIdentifier("clearRequestId"))?,
            user_id: user_id
                .parse()
                .map_err(|_| ClearMessagesError::BadIdentifier("userId"))?,
            partner_id: partner_id
                .parse()
                .map_err(|_| ClearMessagesError::BadIdentifier("partnerId"))?,
        })
    }
}

/// Treats absent and empty fields the same way, like the hosted function
/// this endpoint replaces.
fn required(field: Option<String>) -> Result<String, ClearMessagesError> {
    field
        .filter(|value| !value.is_empty())
        .ok_or(ClearMessagesError::MissingParameters)
}

#[cfg(test)]
mod tests {
    use actix_cors::Cors;
    use actix_web::http::header;
    use actix_web::{test, App};

    use super::*;
    use crate::account::Profile;
    use crate::records::clear_request::ClearStatus;
    use crate::records::message::MessageDraft;
    use crate::store::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        ana: AccountId,
        bo: AccountId,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let ana = store
            .register(Profile::new("ana@example.com").with_partner_email("bo@example.com"))
            .id;
        let bo = store
            .register(Profile::new("bo@example.com").with_partner_email("ana@example.com"))
            .id;
        for _ in 0..2 {
            store
                .send_message(ana, MessageDraft::new(bo, "hi"))
                .unwrap();
            store
                .send_message(bo, MessageDraft::new(ana, "hi back"))
                .unwrap();
        }
        Fixture { store, ana, bo }
    }

    fn accepted_request(fixture: &Fixture) -> Uuid {
        let request = fixture
            .store
            .open_request(fixture.ana, fixture.bo, None)
            .unwrap();
        fixture
            .store
            .respond(fixture.bo, request.id, true, Some("ok".into()))
            .unwrap();
        request.id
    }

    fn payload(request_id: Uuid, user: AccountId, partner: AccountId) -> ClearMessagesRequest {
        ClearMessagesRequest {
            clear_request_id: Some(request_id.to_string()),
            user_id: Some(user.to_string()),
            partner_id: Some(partner.to_string()),
        }
    }

    #[actix_web::test]
    async fn accepted_request_clears_and_reports_the_count() {
        let fixture = fixture();
        let request_id = accepted_request(&fixture);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppData {
                    store: fixture.store.clone(),
                }))
                .service(clear_messages),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/functions/clear-messages")
            .insert_header((SESSION_HEADER, fixture.ana.to_string()))
            .set_json(payload(request_id, fixture.ana, fixture.bo))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: ClearMessagesResponse = test::read_body_json(response).await;
        assert!(body.success);
        assert_eq!(body.deleted_count, Some(4));
        assert_eq!(
            fixture.store.clear_request(request_id).unwrap().status,
            ClearStatus::Completed
        );
    }

    #[actix_web::test]
    async fn missing_fields_produce_a_structured_bad_request() {
        let fixture = fixture();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppData {
                    store: fixture.store.clone(),
                }))
                .service(clear_messages),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/functions/clear-messages")
            .insert_header((SESSION_HEADER, fixture.ana.to_string()))
            .set_json(ClearMessagesRequest {
                clear_request_id: None,
                user_id: Some(fixture.ana.to_string()),
                partner_id: Some(String::new()),
            })
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: ClearMessagesResponse = test::read_body_json(response).await;
        assert!(!body.success);
        assert!(body.deleted_count.is_none());
    }

    #[actix_web::test]
    async fn an_unauthenticated_call_is_forbidden() {
        let fixture = fixture();
        let request_id = accepted_request(&fixture);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppData {
                    store: fixture.store.clone(),
                }))
                .service(clear_messages),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/functions/clear-messages")
            .set_json(payload(request_id, fixture.ana, fixture.bo))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(fixture.store.conversation_len(fixture.ana, fixture.bo).unwrap(), 4);
    }

    #[actix_web::test]
    async fn an_unknown_request_is_not_found() {
        let fixture = fixture();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppData {
                    store: fixture.store.clone(),
                }))
                .service(clear_messages),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/functions/clear-messages")
            .insert_header((SESSION_HEADER, fixture.ana.to_string()))
            .set_json(payload(Uuid::new_v4(), fixture.ana, fixture.bo))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn a_pending_request_is_forbidden_and_deletes_nothing() {
        let fixture = fixture();
        let pending = fixture
            .store
            .open_request(fixture.ana, fixture.bo, None)
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppData {
                    store: fixture.store.clone(),
                }))
                .service(clear_messages),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/functions/clear-messages")
            .insert_header((SESSION_HEADER, fixture.ana.to_string()))
            .set_json(payload(pending.id, fixture.ana, fixture.bo))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(fixture.store.conversation_len(fixture.ana, fixture.bo).unwrap(), 4);
    }

    #[actix_web::test]
    async fn preflight_and_responses_carry_permissive_cors() {
        let fixture = fixture();
        let app = test::init_service(
            App::new()
                .wrap(Cors::permissive())
                .app_data(web::Data::new(AppData {
                    store: fixture.store.clone(),
                }))
                .service(clear_messages),
        )
        .await;

        let preflight = test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/functions/clear-messages")
            .insert_header((header::ORIGIN, "http://localhost:5173"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .to_request();
        let response = test::call_service(&app, preflight).await;
        assert!(response.status().is_success());
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));

        let request_id = accepted_request(&fixture);
        let request = test::TestRequest::post()
            .uri("/functions/clear-messages")
            .insert_header((header::ORIGIN, "http://localhost:5173"))
            .insert_header((SESSION_HEADER, fixture.ana.to_string()))
            .set_json(payload(request_id, fixture.ana, fixture.bo))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
