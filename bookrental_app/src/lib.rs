pub mod admin;
pub mod api;
pub mod auth;
pub mod catalog;
pub mod covers;
pub mod rentals;
pub mod session;
pub mod validate;
