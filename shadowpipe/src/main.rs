//! Entry point wiring the ambient stack (configuration, logging) to the
//! proxy core.
//!
//! What actually drives bytes through [`shadowpipe_core::Pipeline`] — an
//! accept loop, the channel's own framing, a real socket pair — is the
//! surrounding deployment's job, not this crate's. This binary parses
//! configuration, starts logging, and constructs the core so an embedder has
//! a concrete example of how the pieces fit together.

use anyhow::Result;
use clap::Parser;
use shadowpipe_core::{logging, Config, Pipeline};

fn main() -> Result<()> {
    let config = Config::parse();
    logging::init_logging(config.log_level())?;

    tracing::info!(
        side = ?config.side(),
        worker_count = config.worker_count(),
        compression = %config.compression(),
        gpu_enabled = config.gpu_enabled(),
        "starting shadowpipe core"
    );

    let pipeline = Pipeline::new(&config);
    tracing::info!(
        display_object_bound = pipeline.registry().contains(1),
        "proxy core initialized"
    );
    drop(pipeline);

    Ok(())
}
