// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Layered configuration for `memtrace-check`.
//!
//! Every setting can come from several sources. Where the same setting is
//! supplied more than once the following priority order is applied:
//!  1. Command-line interface.
//!  1. Environment variables prefixed with `MEMTRACE_` (e.g. `MEMTRACE_CHECK`).
//!  1. The run-time configuration file given with `--conf-file`.
//!  1. The compile-time configuration file next to this source file.
//!  1. Default values.
//!
//! All fields are `Option`s so that a value missing from the command line does
//! not hide a value set by a lower priority source.

use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::bail;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use memtrace::CheckMode;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "MEMTRACE_";

/// Command-line arguments.
#[derive(Debug, Deserialize, Parser, PartialEq, Serialize)]
#[command(
    name = "memtrace-check",
    about = "Check a memory-hierarchy simulation log for unanswered requests and stale loads"
)]
pub struct Config {
    /// Log file to check. Use '-' to read standard input.
    #[arg(value_name = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Which checks to run: 'reqs', 'vals' or 'all'
    #[arg(long)]
    pub check: Option<CheckMode>,

    /// Logging level for diagnostic messages
    #[arg(long)]
    pub log: Option<String>,

    /// Exit with a failure status if anything is reported
    #[arg(long)]
    pub strict: Option<bool>,

    /// Path to additional configuration file
    ///
    /// This additional configuration file must contain TOML, and set values for
    /// fields of this struct.
    #[arg(long)]
    pub conf_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: Some(Default::default()),
            check: Some(CheckMode::default()),
            log: Some("warn".to_string()),
            strict: Some(false),
            conf_file: Some(Default::default()),
        }
    }
}

impl Config {
    /// Parse the command line and merge it with every other source.
    pub fn parse_all_sources() -> Result<Self> {
        Self::merge_sources(Self::parse())
    }

    /// Merge already parsed command-line arguments with every other source.
    pub fn merge_sources(cli: Config) -> Result<Self> {
        let config = Self::figment(None).extract()?;
        let config = Self::clap_merge(config, &cli);

        let extra_conf_file = config.conf_file.clone().unwrap_or_default();
        if extra_conf_file.as_os_str().is_empty() {
            return Ok(config);
        }

        check_conf_file(&extra_conf_file)?;
        let config = Self::figment(Some(&extra_conf_file)).extract()?;
        Ok(Self::clap_merge(config, &cli))
    }

    /// Build the non command-line sources in increasing priority.
    fn figment(extra_conf_file: Option<&Path>) -> Figment {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(static_conf_file_path()));
        if let Some(extra_conf_file) = extra_conf_file {
            figment = figment.merge(Toml::file(extra_conf_file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    fn clap_merge(mut config: Config, cli: &Config) -> Config {
        if cli.log_file.is_some() {
            config.log_file.clone_from(&cli.log_file);
        }
        if cli.check.is_some() {
            config.check = cli.check;
        }
        if cli.log.is_some() {
            config.log.clone_from(&cli.log);
        }
        if cli.strict.is_some() {
            config.strict = cli.strict;
        }
        if cli.conf_file.is_some() {
            config.conf_file.clone_from(&cli.conf_file);
        }

        config
    }
}

/// The compile-time configuration file, `config.toml` beside this file.
fn static_conf_file_path() -> PathBuf {
    let mut conf_file = PathBuf::from(file!());
    conf_file.set_extension("toml");
    conf_file
}

fn check_conf_file(conf_file: &Path) -> Result<()> {
    if conf_file.is_dir() {
        bail!("{} is not a file path", conf_file.display());
    }
    if !conf_file.exists() {
        bail!("{} not found", conf_file.display());
    }
    Ok(())
}
