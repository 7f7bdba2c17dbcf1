//! Basic logger usage example
//!
//! Demonstrates console logging, the ten levels, component overrides,
//! structured fields and sampling.
//!
//! Run with: cargo run --example basic_usage

use vlog::prelude::*;
use vlog::{fields, info, trace};

fn main() -> Result<()> {
    println!("=== vlog - Basic Usage Example ===\n");

    let logger = Logger::builder()
        .level(LogLevel::Trace)
        .sink(ConsoleSink::stdout().with_colors(true))
        .build();

    println!("1. Logging at different levels:");
    logger.emergency("This is an emergency message");
    logger.alert("This is an alert message");
    logger.critical("This is a critical message");
    logger.error("This is an error message");
    logger.warning("This is a warning message");
    logger.notice("This is a notice message");
    logger.info("This is an info message");
    logger.debug("This is a debug message");
    logger.verbose("This is a verbose message");
    trace!(logger, "This trace message carries the calling function");
    logger.flush();

    println!("\n2. Raising the threshold to INFO:");
    logger.set_level(LogLevel::Info);
    logger.debug("Debug message (hidden)");
    info!(logger, "Info message (visible), {} of {}", 1, 2);
    logger.flush();

    println!("\n3. Component override and fields:");
    let db = logger.with_component("db").with_field("pool", "primary");
    logger.set_component_level("db", LogLevel::Debug);
    db.debug("Debug message from db (visible through the override)");
    db.info_with("query finished", fields! { "rows" => 42, "ms" => 3.5 });
    logger.flush();

    println!("\n4. Sampling one in five retries:");
    for attempt in 1..=10 {
        logger.sampled_warning("retry", 5, format!("retry attempt {}", attempt));
    }

    logger.close()?;
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
