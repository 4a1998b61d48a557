mod booking_routes;
mod calendar_routes;
pub mod config;
mod error_response;
mod http_layers;
pub mod metrics;
mod profile_routes;
pub mod server;
pub(self) mod session;
pub mod state;
mod timeslot_routes;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
