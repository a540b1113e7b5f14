//! Route handlers organized by resource

pub mod analytics;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod labs;
pub mod orders;
pub mod services;
