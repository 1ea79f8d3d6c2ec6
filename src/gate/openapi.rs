use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    callback, health, implicit, login,
    login::{LoginRequest, LoginResponse},
    logout, me,
    me::{AuthenticationProvider, CurrentUser, Realm},
};

#[derive(OpenApi)]
#[openapi(
    info(description = "OpenID Connect implicit-flow login gateway"),
    paths(
        health::health,
        login::login,
        implicit::implicit_page,
        implicit::implicit_script,
        callback::callback,
        me::me,
        logout::logout,
    ),
    components(schemas(
        health::Health,
        LoginRequest,
        LoginResponse,
        CurrentUser,
        Realm,
        AuthenticationProvider,
    )),
    tags(
        (name = "oidc", description = "Login handshake and session endpoints"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

pub fn swagger() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_flow_endpoint() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/internal/security/login",
            "/api/security/oidc/implicit",
            "/internal/security/oidc/implicit.js",
            "/api/security/oidc/callback",
            "/internal/security/me",
            "/api/security/logout",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
