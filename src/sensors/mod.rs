pub mod demo;
pub mod service;
pub mod update;

pub use service::{LatestReading, SensorService};
pub use update::{Esp32Update, Esp8266Update, Payload};
