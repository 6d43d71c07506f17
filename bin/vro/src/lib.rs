//! vro CLI library
//!
//! Command implementations and the live HTTP server, exposed as a library so
//! they can be driven from tests.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, serve)
//! - [`server`] - Live server resolving requests against the source tree
//!
//! # Example
//!
//! ```no_run
//! use vro::{Config, cmd};
//!
//! let config = Config::from_env().unwrap();
//! cmd::build::run(&config, None).unwrap();
//! ```

pub mod cmd;
pub mod error;
pub mod server;

pub use vro_core::Config;
pub use vro_generator::{BuildStats, Builder, Resolver, Site};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
///
/// `RUST_LOG` directives are honoured on top of the level.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
