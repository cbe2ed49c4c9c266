pub mod api;
pub mod board;
pub mod config;
pub mod control;
pub mod dashboard;
pub mod devices;
pub mod sensors;
pub mod store;
