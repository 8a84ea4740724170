use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier handed out by the identity provider for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Sentinel used to tag events injected by local user input rather than
    /// a row change performed by an account.
    pub fn local_input() -> Self {
        Self(Uuid::nil())
    }

    /// Shortened form used in log targets.
    pub fn short(&self) -> String {
        self.0.to_string().chars().take(8).collect()
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AccountId(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for AccountId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Profile attributes mirrored from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: AccountId,
    pub username: Option<String>,
    pub email: String,
    /// Email of the paired partner account; pairing with one's own email is
    /// allowed and produces the self-messaging configuration.
    pub partner_email: Option<String>,
}

impl Profile {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: AccountId::random(),
            username: None,
            email: email.into(),
            partner_email: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_partner_email(mut self, partner_email: impl Into<String>) -> Self {
        self.partner_email = Some(partner_email.into());
        self
    }

    /// Name shown to the counterparty, falling back to the account email.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.email)
    }
}
