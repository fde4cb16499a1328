use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{config, Environment};

/// Install the global fmt subscriber. `RUST_LOG` wins over the per-environment default.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives()));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

fn default_directives() -> String {
    let cfg = config();
    let base = match cfg.environment {
        Environment::Development => "info,devhub_api=debug",
        Environment::Staging | Environment::Production => "info",
    };

    if cfg.api.enable_request_logging {
        format!("{},tower_http=debug", base)
    } else {
        base.to_string()
    }
}
