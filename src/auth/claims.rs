use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which cookie a session token was issued for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionScope {
    User,
    Admin,
    Organization,
}

impl SessionScope {
    pub fn cookie_name(self) -> &'static str {
        match self {
            SessionScope::User => "token",
            SessionScope::Admin => "admin_token",
            SessionScope::Organization => "org_token",
        }
    }
}

/// JWT payload used for sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,             // user ID
    pub iat: usize,            // issued at (unix timestamp)
    pub exp: usize,            // expires at (unix timestamp)
    pub iss: String,           // issuer
    pub aud: String,           // audience
    pub scope: SessionScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<Uuid>,     // organization, for organization sessions
}
