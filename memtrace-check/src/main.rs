// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Check the debug log of a memory-hierarchy simulation.
//!
//! For latest usage run:
//! ```bash
//! cargo run --bin memtrace-check -- --help
//! ```
//!
//! # Example
//!
//! Report requests which never received a response, and responses whose
//! request was never seen:
//! ```bash
//! $ cargo run --bin memtrace-check -- sim.log
//! Found response for missing request: l2cache (7, 1)
//! Incomplete request:   l1cache (12, 34)
//! ```
//!
//! Check that every load returns the last value stored to its address:
//! ```bash
//! $ cargo run --bin memtrace-check -- --check vals sim.log
//! Read (40, 0) of address 0x1f00 has value 0x2. Does not match old value of 0x1.
//! Checked 120 stores, matched 97 loads (130 total)
//! ```
//!
//! Findings are informational and do not change the exit status unless
//! `--strict true` is given.

use std::io::{self, BufWriter, Write};
use std::process::exit;
use std::str::FromStr;

use color_eyre::Result;
use color_eyre::eyre::bail;
use log::{LevelFilter, debug};
use memtrace::scan_file;
use simplelog::{ConfigBuilder, SimpleLogger};

mod config;

use crate::config::Config;

const FAILURE_STATUS: i32 = 1;

/// Take the command-line string and convert it to a Level
fn choose_level(lvl: &str) -> LevelFilter {
    match LevelFilter::from_str(lvl) {
        Ok(level) => level,
        Err(_) => {
            let default = LevelFilter::Error;
            eprintln!("Unable to parse level string '{lvl}', defaulting to {default}");
            default
        }
    }
}

fn setup_logger(lvl: &str) -> Result<()> {
    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off) // No timestamps are printed
        .set_location_level(LevelFilter::Off) // No file locations are printed
        .set_thread_level(LevelFilter::Off) // No thread information is printed
        .set_target_level(LevelFilter::Off) // No target is printed
        .build();
    SimpleLogger::init(choose_level(lvl), config)?;
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let config = Config::parse_all_sources()?;
    setup_logger(config.log.as_deref().unwrap_or("warn"))?;
    debug!("{config:?}");

    let log_file = config.log_file.unwrap_or_default();
    if log_file.as_os_str().is_empty() {
        bail!("No log file given");
    }

    let report = scan_file(&log_file, config.check.unwrap_or_default())?;

    let mut out = BufWriter::new(io::stdout().lock());
    report.write_to(&mut out)?;
    out.flush()?;

    if config.strict.unwrap_or(false) && report.has_findings() {
        exit(FAILURE_STATUS);
    }

    Ok(())
}
