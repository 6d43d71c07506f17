//! Build command - renders the whole site to disk

use std::{path::Path, sync::Arc, time::Instant};

use color_eyre::eyre::{Result, WrapErr};
use vro_core::Config;
use vro_generator::{BuildStats, Builder, Site};

/// Run the build command.
///
/// Renders `config.path` into `output`, or into `config.out` when no
/// output directory is given.
pub fn run(config: &Config, output: Option<&Path>) -> Result<BuildStats> {
    let start = Instant::now();
    let output = output.unwrap_or(&config.out);
    tracing::info!(source = ?config.path, ?output, "Starting build");
    tracing::debug!(?config, "Loaded configuration");

    let site = Site::from_config(config).wrap_err("Failed to open source tree")?;
    let builder = Builder::new(Arc::new(site), output)
        .with_static_errors(config.static_errors)
        .with_content_errors(config.content_errors);

    let stats = builder.build().wrap_err("Build failed")?;

    let duration = start.elapsed();

    println!();
    println!("  Build completed successfully!");
    println!();
    println!("  Pages:      {}", stats.pages);
    println!("  Fragments:  {}", stats.fragments);
    println!("  Files:      {}", stats.files);
    println!("  Assets:     {}", stats.assets);
    if stats.skipped > 0 {
        println!("  Skipped:    {}", stats.skipped);
    }
    println!();
    println!("  Duration:   {:.2}s", duration.as_secs_f64());
    println!("  Output:     {}", output.display());
    println!();

    tracing::info!(?stats, ?duration, "Build completed successfully");

    Ok(stats)
}
