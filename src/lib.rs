pub mod api;
pub mod chains;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod core;
pub mod kvdb;
pub mod store;
pub mod utils;
