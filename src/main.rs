//! CSTI scanner CLI

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing_subscriber::EnvFilter;

use csti::browser::chromium::ChromiumSession;
use csti::config::{self, CliOverrides};
use csti::engines::Engine;
use csti::models::{PageStatus, ScanConfig, ScanReport};
use csti::scanner::ScanEngine;

/// Browser-driven Client-Side Template Injection scanner
#[derive(Parser)]
#[command(name = "csti", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a target page (and optionally its crawled pages)
    Scan {
        /// Target URL to scan
        #[arg(short, long)]
        url: String,

        /// Template engine hint, confirmed before use
        #[arg(short = 't', long = "template")]
        engine: Option<String>,

        /// Crawl same-site links and scan every discovered page
        #[arg(long)]
        crawl: bool,

        /// Maximum crawl depth
        #[arg(long)]
        crawl_depth: Option<u32>,

        /// Include subdomains of the target while crawling
        #[arg(long)]
        crawl_subdomains: bool,

        /// Skip the form submission probe
        #[arg(long)]
        skip_forms: bool,

        /// Skip the per-input Enter key probe
        #[arg(long)]
        skip_inputs: bool,

        /// Skip the button click probe
        #[arg(long)]
        skip_buttons: bool,

        /// Skip the link query probe
        #[arg(long)]
        skip_links: bool,

        /// Also look for input reflected into class attributes
        #[arg(long)]
        check_class: bool,

        /// Keep scanning after the first vulnerability
        #[arg(long)]
        continue_when_positive: bool,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show the browser window
        #[arg(long)]
        headful: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List supported template engines
    Engines,

    /// List surface probes in scan order
    Probes,
}

fn print_banner() {
    let banner = r#"
    ╔═══════════════════════════════════════╗
    ║  CSTI SCANNER                         ║
    ║  Client-Side Template Injection       ║
    ╚═══════════════════════════════════════╝
    "#;
    println!("{}", banner.cyan());
}

fn print_summary(report: &ScanReport) {
    println!("\n{}", "  Scan Summary".bold());
    println!("  {}", "─".repeat(35));

    let mut builder = Builder::default();
    builder.push_record(["Page", "Engine", "Status", "Surfaces", "Vulnerable"]);
    for page in &report.pages {
        let status = match &page.status {
            PageStatus::Scanned => "scanned".to_string(),
            PageStatus::Skipped { reason } => format!("skipped: {reason}"),
            PageStatus::Unreachable { reason } => format!("unreachable: {reason}"),
        };
        let surfaces = page
            .surfaces
            .iter()
            .map(|(probe, hit)| format!("{probe}={}", if *hit { "yes" } else { "no" }))
            .collect::<Vec<_>>()
            .join(" ");
        builder.push_record([
            page.url.clone(),
            page.engine_label().to_string(),
            status,
            surfaces,
            page.vulnerable.to_string(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");

    let findings: Vec<_> = report.findings().collect();
    if !findings.is_empty() {
        println!("\n{}", "  Findings".bold());
        let mut builder = Builder::default();
        builder.push_record(["Page", "Probe", "Index", "Engine", "Payload", "Observed at"]);
        for f in &findings {
            builder.push_record([
                f.page_url.clone(),
                f.probe.to_string(),
                f.index.to_string(),
                f.engine.map(|e| e.id()).unwrap_or("-").to_string(),
                f.payload.clone(),
                f.observed_url.clone().unwrap_or_default(),
            ]);
        }
        let mut table = builder.build();
        table.with(Style::rounded());
        println!("{table}");
    }

    let verdict = if report.vulnerable {
        "VULNERABLE".red().bold()
    } else {
        "NOT VULNERABLE".green().bold()
    };
    println!(
        "\n  {} {} ({} page(s), {} finding(s))",
        "Result:".bold(),
        verdict,
        report.pages.len(),
        findings.len()
    );
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            url,
            engine,
            crawl,
            crawl_depth,
            crawl_subdomains,
            skip_forms,
            skip_inputs,
            skip_buttons,
            skip_links,
            check_class,
            continue_when_positive,
            config: config_path,
            headful,
            format,
            verbose,
        } => {
            let filter = if verbose { "csti=debug" } else { "csti=info" };
            // Logs go to stderr so JSON on stdout stays parseable
            tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
                )
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();

            let text = format == OutputFormat::Text;
            if text {
                print_banner();
            }

            let mut scan_config = if let Some(ref path) = config_path {
                config::load_config(path)?
            } else {
                let default_path = Path::new("config/default.toml");
                if default_path.exists() {
                    config::load_config(default_path)?
                } else {
                    ScanConfig::default()
                }
            };

            config::merge_cli_args(
                &mut scan_config,
                CliOverrides {
                    target: url,
                    engine,
                    crawl,
                    crawl_depth,
                    crawl_subdomains,
                    skip_forms,
                    skip_inputs,
                    skip_buttons,
                    skip_links,
                    check_class,
                    continue_when_positive,
                    headful,
                },
            )?;

            if text {
                println!("  {} {}", "Target:".bold(), scan_config.target.green());
                let hint = scan_config
                    .engine_hint
                    .map(|e| e.id().to_string())
                    .unwrap_or_else(|| "auto-detect".to_string());
                println!("  {} {}", "Engine:".bold(), hint.cyan());
                if scan_config.crawl {
                    println!(
                        "  {} depth {}{}",
                        "Crawl:".bold(),
                        scan_config.crawl_depth.to_string().cyan(),
                        if scan_config.crawl_subdomains {
                            ", subdomains included"
                        } else {
                            ""
                        }
                    );
                }
                println!();
            }

            let session = ChromiumSession::launch(&scan_config.browser).await?;
            let engine = ScanEngine::with_defaults();
            let outcome = engine.run(&session, &scan_config).await;
            session.close().await;
            let report = outcome?;

            if text {
                print_summary(&report);
            } else {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }

        Commands::Engines => {
            print_banner();
            let mut builder = Builder::default();
            builder.push_record(["Engine", "Detection probe", "Payload", "Reflection", "Inert"]);
            for engine in Engine::all() {
                let sig = engine.signature();
                builder.push_record([
                    sig.id.to_string(),
                    sig.detection_probe.to_string(),
                    sig.payload.to_string(),
                    sig.reflection.to_string(),
                    if sig.inert_payload { "yes" } else { "" }.to_string(),
                ]);
            }
            let mut table = builder.build();
            table.with(Style::rounded());
            println!("{table}");
        }

        Commands::Probes => {
            print_banner();
            let engine = ScanEngine::with_defaults();

            println!("  {}\n", "Surface probes (scan order):".bold());
            for (name, description) in engine.list_probes() {
                println!("    {} {}", format!("{name:10}").cyan().bold(), description);
            }
            println!();
        }
    }

    Ok(())
}
