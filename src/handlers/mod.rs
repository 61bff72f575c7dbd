// src/handlers/mod.rs

pub mod auth;
pub mod google;
pub mod quiz;
