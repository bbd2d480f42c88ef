use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

/// Handle to the installed log filter.
///
/// Logging starts before the config file is read, so a `verbose` setting
/// found there is applied afterwards through [`Logging::set_verbose`].
pub struct Logging {
    filter: reload::Handle<EnvFilter, Registry>,
}

/// Install the global subscriber: stderr, no timestamps or targets.
/// `RUST_LOG` takes precedence over `verbose`.
pub fn init_logging(verbose: bool) -> Logging {
    let (filter, handle) = reload::Layer::new(env_filter(verbose));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
    Logging { filter: handle }
}

impl Logging {
    pub fn set_verbose(&self, verbose: bool) {
        let _ = self.filter.reload(env_filter(verbose));
    }
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "ruleforge=debug"
    } else {
        "ruleforge=warn"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}
