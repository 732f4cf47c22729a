//! Configuration management for the CSTI scanner

use crate::engines::Engine;
use crate::error::{CstiError, Result};
use crate::models::{ScanConfig, Timeouts};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File-based configuration structure matching default.toml
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    scan: Option<ScanSection>,
    timeouts: Option<Timeouts>,
    browser: Option<BrowserSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScanSection {
    engine: Option<String>,
    crawl: Option<bool>,
    crawl_depth: Option<u32>,
    crawl_subdomains: Option<bool>,
    skip_forms: Option<bool>,
    skip_inputs: Option<bool>,
    skip_buttons: Option<bool>,
    skip_links: Option<bool>,
    check_class: Option<bool>,
    continue_when_positive: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BrowserSection {
    headless: Option<bool>,
    executable: Option<PathBuf>,
    extra_args: Option<Vec<String>>,
}

/// Values taken from the command line; `None`/`false` leaves the file value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub target: String,
    pub engine: Option<String>,
    pub crawl: bool,
    pub crawl_depth: Option<u32>,
    pub crawl_subdomains: bool,
    pub skip_forms: bool,
    pub skip_inputs: bool,
    pub skip_buttons: bool,
    pub skip_links: bool,
    pub check_class: bool,
    pub continue_when_positive: bool,
    pub headful: bool,
}

/// Parses an engine hint, rejecting ids outside the catalog
pub fn parse_engine(id: &str) -> Result<Engine> {
    id.parse()
}

/// Loads configuration from a TOML file and merges with defaults
pub fn load_config(path: &Path) -> Result<ScanConfig> {
    let content = std::fs::read_to_string(path).map_err(CstiError::IoError)?;
    parse_config(&content)
}

/// Builds a ScanConfig from TOML text
pub fn parse_config(content: &str) -> Result<ScanConfig> {
    let file_config: FileConfig = toml::from_str(content)?;
    let mut config = ScanConfig::default();

    if let Some(scan) = file_config.scan {
        if let Some(engine) = scan.engine {
            config.engine_hint = Some(parse_engine(&engine)?);
        }
        if let Some(crawl) = scan.crawl {
            config.crawl = crawl;
        }
        if let Some(depth) = scan.crawl_depth {
            config.crawl_depth = depth;
        }
        if let Some(subdomains) = scan.crawl_subdomains {
            config.crawl_subdomains = subdomains;
        }
        if let Some(skip) = scan.skip_forms {
            config.skip_forms = skip;
        }
        if let Some(skip) = scan.skip_inputs {
            config.skip_inputs = skip;
        }
        if let Some(skip) = scan.skip_buttons {
            config.skip_buttons = skip;
        }
        if let Some(skip) = scan.skip_links {
            config.skip_links = skip;
        }
        if let Some(check) = scan.check_class {
            config.check_class = check;
        }
        if let Some(cont) = scan.continue_when_positive {
            config.continue_when_positive = cont;
        }
    }

    if let Some(timeouts) = file_config.timeouts {
        config.timeouts = timeouts;
    }

    if let Some(browser) = file_config.browser {
        if let Some(headless) = browser.headless {
            config.browser.headless = headless;
        }
        if browser.executable.is_some() {
            config.browser.executable = browser.executable;
        }
        if let Some(args) = browser.extra_args {
            config.browser.extra_args = args;
        }
    }

    Ok(config)
}

/// Merges CLI arguments into an existing ScanConfig
pub fn merge_cli_args(config: &mut ScanConfig, cli: CliOverrides) -> Result<()> {
    if cli.target.trim().is_empty() {
        return Err(CstiError::ConfigError("target URL is empty".to_string()));
    }
    url::Url::parse(&cli.target)?;
    config.target = cli.target;

    if let Some(engine) = cli.engine {
        config.engine_hint = Some(parse_engine(&engine)?);
    }
    if let Some(depth) = cli.crawl_depth {
        config.crawl_depth = depth;
    }
    config.crawl |= cli.crawl;
    config.crawl_subdomains |= cli.crawl_subdomains;
    config.skip_forms |= cli.skip_forms;
    config.skip_inputs |= cli.skip_inputs;
    config.skip_buttons |= cli.skip_buttons;
    config.skip_links |= cli.skip_links;
    config.check_class |= cli.check_class;
    config.continue_when_positive |= cli.continue_when_positive;
    if cli.headful {
        config.browser.headless = false;
    }

    Ok(())
}
