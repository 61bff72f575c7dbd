// src/lib.rs

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod ledger;
pub mod mailer;
pub mod models;
pub mod oauth;
pub mod ranking;
pub mod report;
pub mod routes;
pub mod state;
pub mod store;
pub mod sweep;
pub mod utils;

pub use routes::create_router;
