//! ## Logging Configuration
//!
//! This module sets up logging automatically at program startup using the `ctor` crate.
//! Logging behavior is controlled by the `DEBUG_CATEGORY_CODEC` environment variable:
//!
//! - **Disabled** (default): If the variable is unset, empty, or explicitly set to `"0"` or `"false"`,
//!   no logging will be initialized.
//! - **Enabled**: Any other value enables logging with a maximum log level of `DEBUG`.
//!
//! The codec reports resolved variables and mapping sizes at `DEBUG` level, and warns when a
//! transform introduced null values for categories that were not seen during fit.
//!
//! ### Usage Example
//!
//! ```sh
//! export DEBUG_CATEGORY_CODEC=true
//! ```

use ctor::ctor;
use tracing::Level;

/// Name of the environment variable that turns on debug logging.
pub const DEBUG_ENV_VAR: &str = "DEBUG_CATEGORY_CODEC";

/// Returns true if the given value of [`DEBUG_ENV_VAR`] enables logging.
fn logging_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| !(v == "0" || v == "false" || v.is_empty()))
}

#[ctor]
fn set_debug_level() {
    let value = std::env::var(DEBUG_ENV_VAR).ok();
    if logging_enabled(value.as_deref()) {
        // Another subscriber may already be installed by the host application.
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    }
}
