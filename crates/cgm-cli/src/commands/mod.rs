//! Command implementations for the CLI.

mod config;
mod devices;
mod forecast;
mod watch;

pub use config::cmd_config;
pub use devices::cmd_devices;
pub use forecast::{ForecastArgs, cmd_forecast};
pub use watch::{WatchArgs, cmd_watch};
