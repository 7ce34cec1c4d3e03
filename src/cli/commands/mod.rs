//! CLI command implementations.

mod config;
mod doctor;
mod serve;
mod token;

pub use config::run_config;
pub use doctor::run_doctor;
pub use serve::{run_serve, serve_with};
pub use token::run_token;
