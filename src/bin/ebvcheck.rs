//! ebvcheck CLI: check that the ebuilds in an overlay are up to date.

use std::io;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use ebvcheck::check::{OutputOptions, PackageChecker};
use ebvcheck::config::Config;
use ebvcheck::dispatch::Dispatcher;
use ebvcheck::model::WorkKey;
use ebvcheck::overlay;
use ebvcheck::portage::Portage;
use ebvcheck::repology::{Overrides, RepologyClient};
use ebvcheck::telemetry::{TelemetryConfig, init_telemetry};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum YesNo {
    Y,
    N,
}

impl YesNo {
    fn yes(self) -> bool {
        matches!(self, YesNo::Y)
    }
}

#[derive(Parser)]
#[command(
    name = "ebvcheck",
    about = "Ebuild Version Check: verify that the ebuilds in a portage overlay are up to date"
)]
struct Cli {
    /// Location (directory path) of the portage overlay
    #[arg(short = 'D', long)]
    overlay_dir: Option<PathBuf>,
    /// Max number of packages to check concurrently (1 = sequential)
    #[arg(short = 'T', long, value_parser = clap::value_parser!(u64).range(1..))]
    max_thread_count: Option<u64>,
    /// Colorize output?
    #[arg(long, value_enum, default_value = "y")]
    color: YesNo,
    /// Print status for live ebuilds (ebuilds with version 9999)
    #[arg(long, value_enum, default_value = "n")]
    live_builds: YesNo,
    /// Print status for packages that are not installed on this machine
    #[arg(long, value_enum, default_value = "n")]
    offline: YesNo,
    /// TOML file with extra repology project/repo overrides
    #[arg(long)]
    overrides: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
    /// Print a banner and a summary line
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(dir) = cli.overlay_dir {
        config.overlay_dir = dir;
    }
    if let Some(n) = cli.max_thread_count {
        config.max_workers = usize::try_from(n)?;
    }
    if cli.debug {
        config.log_level = "debug".to_string();
    }

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "ebvcheck".to_string(),
        level: config.log_level.clone(),
    })?;

    let ebuilds = overlay::scan(&config.overlay_dir)?;
    trace!(?ebuilds, "all ebuilds");
    let candidates = ebuilds
        .iter()
        .map(|ebuild| ebuild.package())
        .collect::<Result<Vec<WorkKey>, _>>()?;

    if cli.verbose {
        let name = config
            .overlay_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.overlay_dir.display().to_string());
        println!("Ebuild Version Check will be run for the following overlay: {name}\n");
    }

    let overrides = match cli.overrides {
        Some(path) => Overrides::load(&path)?,
        None => Overrides::builtin(),
    };
    let options = OutputOptions {
        color: cli.color.yes(),
        show_live: cli.live_builds.yes(),
        show_offline: cli.offline.yes(),
    };
    let checker = PackageChecker::new(
        Portage::new(&config.eix),
        RepologyClient::new(&config.repology_url, overrides)?,
        options,
    );

    let dispatcher = Dispatcher::new(checker, io::stdout(), config.max_workers).color(options.color);
    let summary = dispatcher.run(candidates).await?;
    debug!(?summary, "batch finished");

    if cli.verbose {
        println!("\nFinished. {} packages checked.", summary.printed);
    }
    Ok(())
}
