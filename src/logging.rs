use anyhow::{anyhow, Result};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Overrides the verbosity-derived filter when set.
pub const LOG_ENV: &str = "USDA_IMPORT_LOG";

/// Filter directives for a CLI verbosity level.
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "usda_import=warn,sqlx=warn",
        1 => "usda_import=info,sqlx=warn",
        2 => "usda_import=debug,sqlx=warn",
        _ => "usda_import=trace,sqlx=debug",
    }
}

fn filter_for(verbosity: u8) -> EnvFilter {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter(verbosity)))
}

/// Install the global subscriber and bridge `log` records into it.
///
/// Output goes to stderr so `foods` subcommands keep stdout clean JSON.
pub fn init_logging(verbosity: u8, json: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbosity))
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.map_err(|err| anyhow!("install tracing subscriber: {err}"))?;

    tracing_log::LogTracer::init().map_err(|err| anyhow!("install log bridge: {err}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert!(default_filter(0).contains("usda_import=warn"));
        assert!(default_filter(1).contains("usda_import=info"));
        assert!(default_filter(2).contains("usda_import=debug"));
        assert!(default_filter(9).contains("usda_import=trace"));
    }
}
