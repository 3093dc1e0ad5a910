pub mod commands;
pub mod components;
pub mod config;
pub mod error;
pub mod models;
pub mod reservation;
pub mod shutdown;
pub mod startup;
pub mod sync;
pub mod utils;
