mod dto;
pub mod handlers;
mod repo;
mod repo_types;
pub mod services;
mod validation;

pub use dto::{ProfilePatch, Registration, UserDto};
pub use repo::{PgUserStore, StoreError, UserStore};
pub use repo_types::{Lookup, NewUser, ProfilePicture, User};
pub use validation::FieldError;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
