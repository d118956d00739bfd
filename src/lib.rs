pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod mailer;
pub mod metrics;
pub mod notify;
pub mod pictures;
pub mod state;
pub mod storage;
pub mod users;

#[cfg(test)]
mod testing;

pub use app::build_app;
pub use state::AppState;
