//! TimeSlot Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod auth;
pub mod backend;
pub mod booking;
pub mod calendar;
pub mod config;
pub mod error;
pub mod follow;
pub mod profile;
pub mod server;
pub mod supabase;
pub mod timeslot;

// Re-export commonly used types for convenience
pub use backend::{Backend, MemoryBackend};
pub use error::{ServiceError, ServiceResult};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use supabase::SupabaseBackend;
