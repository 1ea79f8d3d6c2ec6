pub mod callback;
pub mod health;
pub mod implicit;
pub mod login;
pub mod logout;
pub mod me;

pub use self::{
    callback::callback,
    health::health,
    implicit::{implicit_page, implicit_script},
    login::login,
    logout::logout,
    me::me,
};

use axum::http::HeaderMap;

/// Header every state-changing internal request must carry.
pub const XSRF_HEADER: &str = "kbn-xsrf";

pub(crate) fn has_xsrf_header(headers: &HeaderMap) -> bool {
    headers.contains_key(XSRF_HEADER)
}
