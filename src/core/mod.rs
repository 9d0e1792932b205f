pub mod driver;
pub mod partition;
pub mod registry;
pub mod tracker;
pub mod types;
