//! # Surveys Module
//!
//! Survey lifecycle management: owner CRUD, active/expired state
//! transitions, and the public-read exposure rules.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod validators;


pub use models::{Survey, SurveyView};
pub use routes::survey_routes;
