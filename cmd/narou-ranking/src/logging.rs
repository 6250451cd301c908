use configs::LogSettings;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` wins over `--verbose`, which wins over the configured filter.
fn build_filter(settings: &LogSettings, verbose: bool) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = if verbose { "debug" } else { settings.filter.as_str() };
    Ok(EnvFilter::try_new(directive)?)
}

pub fn init(settings: &LogSettings, verbose: bool) -> anyhow::Result<()> {
    let filter = build_filter(settings, verbose)?;
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let registry = tracing_subscriber::registry().with(filter);
    if settings.json {
        registry.with(fmt_layer.json()).try_init()?;
    } else {
        registry.with(fmt_layer.compact()).try_init()?;
    }
    Ok(())
}
