use tracing_subscriber::EnvFilter;

/// Our crates log at info (debug with `-v`, trace with `-vv`), everything else at warn.
fn default_filter(verbose: u8) -> String {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!(
        "warn,prism_demo={level},prism_kernel={level},prism_imgui={level},prism_headless={level}"
    )
}

/// Install the global subscriber. `RUST_LOG` directives are appended to the
/// defaults, so they win.
pub fn setup_logging(verbose: u8) {
    let mut filter = default_filter(verbose);
    if let Ok(env_filter) = std::env::var(EnvFilter::DEFAULT_ENV) {
        filter.push(',');
        filter.push_str(&env_filter);
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .compact()
        .init();
}
