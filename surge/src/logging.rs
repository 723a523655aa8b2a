use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset. Each `-v` raises the level one step.
pub(crate) fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "surge=warn",
        1 => "surge=info",
        2 => "surge=debug",
        _ => "surge=trace",
    }
}

/// Installs a stderr `fmt` subscriber so stdout stays reserved for results.
pub(crate) fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .try_init();
}
