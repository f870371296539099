pub mod log {
    use std::sync::Once;

    use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

    /// Install the global subscriber. `RUST_LOG` wins over `default_directive`.
    ///
    /// Later calls are no-ops.
    pub fn init(default_directive: &str) {
        static ONCE: Once = Once::new();
        ONCE.call_once(|| {
            let builder = tracing_subscriber::fmt()
                .with_span_events(FmtSpan::CLOSE)
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new(default_directive)),
                );

            // Local offset can only be read while the process is single threaded.
            match tracing_subscriber::fmt::time::OffsetTime::local_rfc_3339() {
                Ok(timer) => {
                    let _ = tracing::subscriber::set_global_default(
                        builder.with_timer(timer).finish(),
                    );
                }
                Err(_) => {
                    let _ = tracing::subscriber::set_global_default(builder.finish());
                }
            }
        })
    }
}
