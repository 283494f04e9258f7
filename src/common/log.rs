use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, registry};
use tracing_tree::HierarchicalLayer;
use tracing_tree::time::Uptime;

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let tree = HierarchicalLayer::new(2)
        .with_writer(std::io::stderr)
        .with_targets(true)
        .with_deferred_spans(true)
        .with_timer(Uptime::default());

    // a second init (tests, embedding) keeps the first subscriber
    _ = registry().with(filter).with(tree).try_init();
}
