//! Headless dashboard consumer: polls the backend, keeps short trend
//! buffers, and pushes operator config changes.

pub mod poller;
pub mod trend;

pub use poller::{DashboardPoller, MutationState, PollerState};
pub use trend::{TrendBuffer, TrendSample, TREND_CAPACITY};
