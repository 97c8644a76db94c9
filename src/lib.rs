pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod race;
pub mod scaler;
pub mod state;
pub mod validator;
