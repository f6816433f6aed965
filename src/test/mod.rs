mod config;
mod content;
mod gamification;
mod migrations;
mod practice;
mod sessions;
mod utils;

pub use utils::{test_db, test_utils};
