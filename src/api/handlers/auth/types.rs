//! Request and response bodies for the auth endpoints.

use crate::api::handlers::auth::tokens::IssuedTokens;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserPublic {
    pub id: String,
    pub email: String,
    pub role: String,
}

/// Token pair plus the identity it was issued to, returned by login,
/// register and refresh.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub user: UserPublic,
}

impl From<IssuedTokens> for TokenResponse {
    fn from(issued: IssuedTokens) -> Self {
        Self {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            user_id: issued.user.id.to_string(),
            user: UserPublic {
                id: issued.user.id.to_string(),
                email: issued.user.email,
                role: issued.user.role,
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub(super) fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::storage::UserRecord;
    use uuid::Uuid;

    #[test]
    fn refresh_request_uses_camel_case_field() {
        let request: RefreshRequest =
            serde_json::from_str(r#"{"refreshToken":"abc"}"#).expect("parse");
        assert_eq!(request.refresh_token, "abc");

        assert!(serde_json::from_str::<RefreshRequest>(r#"{"refresh_token":"abc"}"#).is_err());
    }

    #[test]
    fn register_request_name_is_optional() {
        let request: RegisterRequest =
            serde_json::from_str(r#"{"email":"a@example.com","password":"longenough"}"#)
                .expect("parse");
        assert_eq!(request.name, None);
    }

    #[test]
    fn token_response_serializes_mixed_case_fields() {
        let issued = IssuedTokens {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            user: UserRecord {
                id: Uuid::nil(),
                email: "alice@example.com".to_string(),
                role: "student".to_string(),
            },
        };

        let value = serde_json::to_value(TokenResponse::from(issued)).expect("serialize");
        assert_eq!(value["access_token"], "access");
        assert_eq!(value["refresh_token"], "refresh");
        assert_eq!(value["userId"], Uuid::nil().to_string());
        assert_eq!(value["user"]["email"], "alice@example.com");
        assert_eq!(value["user"]["role"], "student");
        assert!(value.get("user_id").is_none());
    }
}
