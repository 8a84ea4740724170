use url::Url;

use crate::account::AccountId;
use crate::api::executor::ClearCommand;
use crate::api::routes::clear::{ClearMessagesRequest, ClearMessagesResponse, SESSION_HEADER};

/// Client-side invoker for the privileged endpoint. Carries the caller's
/// session so the server can authenticate the invocation.
pub struct ExecutorClient {
    endpoint: Url,
    session: AccountId,
    http: reqwest::blocking::Client,
}

impl ExecutorClient {
    pub fn new(base: &str, session: AccountId) -> Result<Self, url::ParseError> {
        let endpoint = Url::parse(base)?.join("functions/clear-messages")?;
        Ok(Self {
            endpoint,
            session,
            http: reqwest::blocking::Client::new(),
        })
    }

    pub fn invoke(&self, command: &ClearCommand) -> anyhow::Result<ClearMessagesResponse> {
        let payload = ClearMessagesRequest {
            clear_request_id: Some(command.clear_request_id.to_string()),
            user_id: Some(command.user_id.to_string()),
            partner_id: Some(command.partner_id.to_string()),
        };
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(SESSION_HEADER, self.session.to_string())
            .json(&payload)
            .send()?;
        Ok(response.json()?)
    }
}
