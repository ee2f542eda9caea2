mod commands;
mod core;
mod release;
mod ui;
mod utils;

use clap::Parser;
use core::context::ReleaseOptions;
use core::error::{ReleaseError, ReleaseResult, print_error};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Build, package and publish a WordPress plugin release
#[derive(Parser, Debug)]
#[command(name = "plugin-release")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// Settings as KEY=VALUE: outdir=<path>, version=<x.y.z>
  #[arg(value_name = "KEY=VALUE")]
  settings: Vec<String>,

  /// Assemble the distribution repository, tag and push both repositories
  #[arg(long)]
  push: bool,

  /// Create hosted releases with the zip attached (requires --push)
  #[arg(long)]
  create_release: bool,

  /// Skip packaging the zip artifact
  #[arg(long)]
  no_zip: bool,

  /// Skip creating and pushing tags
  #[arg(long)]
  no_tag: bool,

  /// Path to release.toml (default: release.toml, .release.toml, .config/release.toml)
  #[arg(long, value_name = "PATH")]
  config: Option<PathBuf>,

  /// Print the run report as JSON on stdout
  #[arg(long)]
  json: bool,

  /// Log every external command (also honours RUST_LOG)
  #[arg(short, long)]
  verbose: bool,
}

impl Cli {
  fn options(&self) -> ReleaseResult<ReleaseOptions> {
    let mut options = ReleaseOptions {
      push_to_distribution: self.push,
      create_hosted_release: self.create_release,
      skip_zip: self.no_zip,
      skip_tag: self.no_tag,
      config_path: self.config.clone(),
      ..Default::default()
    };
    for setting in &self.settings {
      options.apply_setting(setting)?;
    }
    Ok(options)
  }
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

/// Diagnostics on stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(format!("plugin_release={}", default_level)))
    .unwrap_or_else(|_| EnvFilter::new("warn"));

  let layer = tracing_subscriber::fmt::layer()
    .with_target(false)
    .without_time()
    .with_writer(io::stderr);
  let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.verbose);
  ui::set_json_mode(cli.json);

  let root = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => {
      eprintln!("Error: Failed to get current directory: {}", e);
      std::process::exit(1);
    }
  };

  let result = cli
    .options()
    .and_then(|options| commands::run_release(&root, options, cli.json));

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: ReleaseError) -> ! {
  tracing::debug!(stage = err.stage().unwrap_or("setup"), "release failed");
  print_error(&err);
  std::process::exit(1);
}
