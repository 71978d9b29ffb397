//! gpxcli - read GPX files and report track metrics.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum, ValueHint};
use log::info;

use gpx_metrics::config::Config;
use gpx_metrics::{Document, ProviderRegistry, SummaryOptions, parse_gpx_file, summarize};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Tool for reading and processing files in GPX format",
    after_help = "Commands: list, print, ele"
)]
struct Cli {
    /// Input GPX file
    #[arg(value_hint = ValueHint::FilePath)]
    gpx_file_path: PathBuf,

    /// Commands to be executed, in order
    #[arg(required = true, value_enum)]
    command: Vec<Command>,

    /// Path to configuration file
    #[arg(short = 'c', long = "config", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    /// List tracks with lengths and elevation metrics
    List,
    /// Dump the parsed document as JSON
    Print,
    /// Fill in track point elevations from the configured provider
    Ele,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => Config::default(),
    };

    let mut doc = parse_gpx_file(&cli.gpx_file_path)
        .with_context(|| format!("failed to read {}", cli.gpx_file_path.display()))?;
    info!(
        "parsed {} track(s), {} route(s), {} waypoint(s)",
        doc.tracks.len(),
        doc.routes.len(),
        doc.waypoints.len()
    );

    for cmd in &cli.command {
        match cmd {
            Command::List => print!("{}", summarize(&doc, &SummaryOptions::default())),
            Command::Print => println!("{}", serde_json::to_string_pretty(&doc)?),
            Command::Ele => fill_elevations(&mut doc, &config)?,
        }
    }

    Ok(())
}

fn fill_elevations(doc: &mut Document, config: &Config) -> Result<()> {
    let registry = ProviderRegistry::with_defaults();
    let name = config.elevation.provider.as_deref().ok_or_else(|| {
        anyhow!(
            "no elevation provider configured (available: {})",
            registry.names().join(", ")
        )
    })?;
    let provider = registry.create(name, &config.elevation)?;
    info!("filling elevations using {name}");

    for track in &mut doc.tracks {
        track
            .fill_elevations(provider.as_ref())
            .with_context(|| format!("elevation lookup via {name} failed"))?;
        for segment in &track.segments {
            println!("    Points: {}", segment.points().len());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from(["gpxcli", "-c", "conf.toml", "run.gpx", "list", "ele"]).unwrap();
        assert_eq!(cli.gpx_file_path, PathBuf::from("run.gpx"));
        assert_eq!(cli.command, vec![Command::List, Command::Ele]);
        assert_eq!(cli.config, Some(PathBuf::from("conf.toml")));
    }

    #[test]
    fn test_requires_command() {
        assert!(Cli::try_parse_from(["gpxcli", "run.gpx"]).is_err());
        assert!(Cli::try_parse_from(["gpxcli", "run.gpx", "draw"]).is_err());
    }

    #[test]
    fn test_ele_without_provider() {
        let mut doc = Document::default();
        let err = fill_elevations(&mut doc, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("mapquest"));
    }

    #[test]
    fn test_missing_file() {
        let cli = Cli::try_parse_from(["gpxcli", "/nonexistent/run.gpx", "list"]).unwrap();
        let err = run(cli).unwrap_err();
        assert!(format!("{err:#}").contains("File does not exist"));
    }
}
