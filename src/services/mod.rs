// Services module - external collaborators

pub mod email;

pub use email::EmailService;
