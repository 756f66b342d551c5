//! Tracing setup for embedding applications.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing. Honors `RUST_LOG`; defaults to `info` for this
/// workspace. Set `LOG_FORMAT=json` for machine-readable output.
///
/// Call once at process start; later calls are ignored.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vchop_core=info,vchop_media=info"));

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let result = if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!("tracing already initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent_across_formats() {
        // Exercises both layer configurations; the second call lands on
        // the already-initialized path instead of panicking.
        std::env::set_var("LOG_FORMAT", "json");
        init_tracing();
        std::env::remove_var("LOG_FORMAT");
        init_tracing();
    }
}
