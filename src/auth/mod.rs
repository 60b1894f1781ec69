use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod policy;

pub use jwt::AuthUser;
pub use policy::Principal;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
