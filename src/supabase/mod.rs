//! Supabase-backed implementation of the [`crate::backend`] traits.

mod backend;
mod client;
mod query;

pub use backend::SupabaseBackend;
