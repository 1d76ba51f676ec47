//! # Responses Module
//!
//! Response intake with duplicate-submission prevention, owner-side
//! listing, and CSV export.

pub mod export;
pub mod handlers;
pub mod models;
pub mod routes;

#[cfg(test)]
mod tests;

pub use models::{Answer, AnswerValue, ResponseView};
pub use routes::response_routes;
