//! HTTP ingress: receives job events and exposes offering and operator views.

mod error;
pub mod models;
mod server;
pub mod services;
pub mod state;
pub(crate) mod utils;
mod validation;

pub use error::ApiError;
pub use server::{build_state, router, run};
