pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

#[cfg(test)]
pub mod test_utils;

pub use startup::{build_router, AppState};
