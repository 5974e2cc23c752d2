pub mod admin;
pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod payments;
pub mod state;
pub mod store;
pub mod util;
