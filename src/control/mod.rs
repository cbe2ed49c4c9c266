pub mod patch;
pub mod service;

pub use patch::{Esp32ConfigPatch, Esp8266ConfigPatch};
pub use service::{ConfigError, ControlService};
