use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::error;
use utoipa::ToSchema;

use crate::{
    gate::{
        cookies::{extract_cookie, SESSION_COOKIE_NAME},
        GateState,
    },
    handshake::SessionRecord,
    oidc::{ProviderConfig, PROVIDER_TYPE},
};

/// Sessions are only ever created from identity tokens.
const AUTHENTICATION_TYPE: &str = "token";

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Realm {
    pub name: String,
    #[serde(rename = "type")]
    pub realm_type: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthenticationProvider {
    #[serde(rename = "type")]
    pub provider_type: String,
    pub name: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CurrentUser {
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub enabled: bool,
    pub authentication_realm: Realm,
    pub lookup_realm: Realm,
    pub authentication_provider: AuthenticationProvider,
    pub authentication_type: String,
}

impl CurrentUser {
    fn new(session: SessionRecord, provider: &ProviderConfig) -> Self {
        let realm = Realm {
            name: provider.realm.clone(),
            realm_type: PROVIDER_TYPE.to_string(),
        };
        Self {
            username: session.subject.username,
            full_name: session.subject.full_name,
            email: session.subject.email,
            roles: session.subject.roles,
            metadata: BTreeMap::new(),
            enabled: true,
            authentication_realm: realm.clone(),
            lookup_realm: realm,
            authentication_provider: AuthenticationProvider {
                provider_type: PROVIDER_TYPE.to_string(),
                name: provider.name.clone(),
            },
            authentication_type: AUTHENTICATION_TYPE.to_string(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/internal/security/me",
    responses(
        (status = 200, description = "Current session user", body = CurrentUser),
        (status = 401, description = "No active session")
    ),
    tag = "oidc"
)]
pub async fn me(headers: HeaderMap, gate: Extension<Arc<GateState>>) -> impl IntoResponse {
    let Some(token) = extract_cookie(&headers, SESSION_COOKIE_NAME) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match gate.validator().resolve_session(&token).await {
        Ok(Some(session)) => {
            (StatusCode::OK, Json(CurrentUser::new(session, gate.provider()))).into_response()
        }
        Ok(None) => StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Failed to lookup session: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
