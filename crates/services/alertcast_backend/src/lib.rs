// Startup wiring and batch dispatch for alertcast.

pub mod app_state;
pub mod dispatch;

pub use app_state::AppState;
pub use dispatch::{destroy_channels, dispatch_batch, setup_channels, write_metrics};
