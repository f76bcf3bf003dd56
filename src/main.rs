use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use arbor::actions::SystemActionResolver;
use arbor::app::{Dispatcher, Model, Services};
use arbor::config::{ArborConfig, config_path};
use arbor::directive::DirectiveWriter;
use arbor::git::Repository;
use arbor::github::GhCli;
use arbor::styling::{ERROR, ERROR_EMOJI};
use clap::Parser;

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Interactive git worktree dashboard", long_about = None)]
#[command(version)]
struct Cli {
    /// File to write the shell directive to on exit (for a `cd` wrapper)
    #[arg(long, env = "ARBOR_DIRECTIVE_FILE", value_name = "PATH")]
    directive_file: Option<PathBuf>,

    /// Skip pull request and CI lookups
    #[arg(long)]
    no_github: bool,

    /// Run as if started in PATH
    #[arg(short = 'C', value_name = "PATH")]
    directory: Option<PathBuf>,
}

/// Send logs to `ARBOR_LOG_FILE`; the dashboard owns the terminal.
fn init_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off"));
    match std::env::var_os("ARBOR_LOG_FILE").map(std::fs::File::create) {
        Some(Ok(file)) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Some(Err(e)) => {
            eprintln!("Cannot open ARBOR_LOG_FILE: {e}");
            builder.filter_level(log::LevelFilter::Off);
        }
        None => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.format_timestamp_millis().init();
}

fn run(cli: Cli) -> anyhow::Result<Option<String>> {
    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("cannot change to {}", dir.display()))?;
    }

    let repo = Repository::current();
    repo.ensure_repository()?;

    let config = ArborConfig::load().context("Failed to load config")?;
    let github = if cli.no_github {
        GhCli::disabled(repo.path())
    } else {
        GhCli::new(repo.path())
    };

    let services = Services {
        git: Arc::new(repo),
        github: Arc::new(github),
        actions: Arc::new(SystemActionResolver),
        directives: DirectiveWriter::new(cli.directive_file),
        config_path: config_path(),
    };
    let (tx, rx) = crossbeam_channel::unbounded();
    let dispatcher = Dispatcher::new(services, tx.clone());
    let model = Model::new(config, !cli.no_github);

    arbor::ui::run(model, &dispatcher, tx, rx)
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(Some(output)) => println!("{output}"),
        Ok(None) => {}
        Err(e) => {
            eprintln!("{ERROR_EMOJI} {ERROR}{e:#}{ERROR:#}");
            process::exit(1);
        }
    }
}
