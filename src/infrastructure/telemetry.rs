use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global tracing subscriber. The embedding application calls
/// this once at startup; `RUST_LOG` overrides the default filter.
pub fn init() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stockbill=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();
}
