//! Diagnostic logging
//!
//! Events go to stderr so they never interleave with the interactive
//! prompts on stdout. `RUST_LOG` wins over `--verbose`.

use tracing_subscriber::EnvFilter;

pub fn init(verbose: bool) {
    let default_level = if verbose { "robodoc=debug,robodoc_common=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // a second init (tests, embedding) is not an error worth reporting
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
