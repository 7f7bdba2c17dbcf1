//! File logging example
//!
//! Demonstrates logging to the console and a size-rotated, compressed
//! JSON file at the same time.
//!
//! Run with: cargo run --example file_logging

use std::path::PathBuf;
use std::sync::Arc;
use vlog::prelude::*;

fn main() -> Result<()> {
    println!("=== vlog - File Logging Example ===\n");

    let file = RotatingFileSink::with_policy(
        "logs/application.log",
        RotationPolicy::new().with_max_size(4 * 1024).with_compression(true),
    )?
    .with_format(OutputFormat::Json)
    .on_rotate(Arc::new(|rotated: PathBuf| {
        println!("   rotated to {}", rotated.display());
    }));

    let logger = Logger::builder()
        .sink(ConsoleSink::stdout())
        .sink(file)
        .field("service", "file-logging-demo")
        .build();

    println!("1. Logging to both console and file:");
    logger.info("Application started");
    logger.debug("Loading configuration...");
    logger.info("Configuration loaded successfully");
    logger.warning("Using default settings for some options");
    logger.info("Database connection established");
    logger.error("Failed to load optional plugin");
    logger.flush();

    println!("\n2. Writing enough entries to rotate the file:");
    let worker = logger.with_component("worker");
    for i in 1..=100 {
        worker.info_with(
            format!("Processing item {}/100", i),
            LogContext::new().with_field("item", i),
        );
        if i % 25 == 0 {
            worker.warning(format!("Item {} took longer than expected", i));
        }
    }

    logger.info("All operations completed");

    // drains the queue, closes the file and waits for compression
    logger.close()?;

    println!("\n=== Example completed successfully! ===");
    println!("Check 'logs/' for the active and rotated log files");

    Ok(())
}
