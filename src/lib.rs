pub mod api;
pub mod card_service;
pub mod config;
pub mod database;
pub mod errors;
pub mod logging;
pub mod models;
pub mod srs_scheduler;
pub mod study_planner;

pub use card_service::CardService;
pub use config::Config;
pub use database::Database;
pub use errors::*;
pub use models::*;
pub use srs_scheduler::{SchedulerParams, SrsScheduler};
