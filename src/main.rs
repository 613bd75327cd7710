use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use console::style;
use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;

use gallery_fetch::reporter::{ProgressMode, format_summary, spawn_reporter};
use gallery_fetch::{
    Config, Error, FileCollisionAction, GalleryDownloader, GallerySpec, Result, RunReport,
    cancel_on_signal,
};

/// Exit status for a run stopped by SIGINT/SIGTERM
const EXIT_INTERRUPTED: u8 = 130;

const DEFAULT_FOLDER: &str = "default";
const DEFAULT_MAX_IMAGES: u32 = 100;

#[derive(Parser, Debug)]
#[command(
    name = "gallery-fetch",
    version,
    about = "Download every numbered image of a gallery"
)]
struct Cli {
    /// Gallery index page, e.g. https://example.com/gallery/foo12/index.html
    #[arg(long)]
    url: Option<String>,

    /// Folder name created under the downloads root
    #[arg(long)]
    folder: Option<String>,

    /// Highest image number to try
    #[arg(long)]
    max_images: Option<u32>,

    /// Root directory for gallery folders
    #[arg(long, env = "GALLERY_FETCH_ROOT")]
    downloads_root: Option<PathBuf>,

    /// Maximum simultaneous requests
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Retries per image after the first attempt
    #[arg(long)]
    retries: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// What to do with files that already exist
    #[arg(long, value_enum)]
    on_existing: Option<OnExisting>,

    /// Reject responses not labelled image/* before decoding them
    #[arg(long)]
    require_image_content_type: bool,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OnExisting {
    Overwrite,
    Rename,
    Skip,
}

impl From<OnExisting> for FileCollisionAction {
    fn from(value: OnExisting) -> Self {
        match value {
            OnExisting::Overwrite => FileCollisionAction::Overwrite,
            OnExisting::Rename => FileCollisionAction::Rename,
            OnExisting::Skip => FileCollisionAction::Skip,
        }
    }
}

/// The three run-time inputs
#[derive(Debug, PartialEq, Eq)]
struct RunInputs {
    url: String,
    folder: String,
    max_images: u32,
}

impl Cli {
    /// Library configuration from flags, starting at the defaults
    fn config(&self) -> Result<Config> {
        let mut config = Config::default();
        if let Some(root) = &self.downloads_root {
            config.download.downloads_root = root.clone();
        }
        if let Some(concurrency) = self.concurrency {
            if concurrency == 0 {
                return Err(Error::config("concurrency", "must be at least 1"));
            }
            config.download.max_concurrent_requests = concurrency;
        }
        if let Some(retries) = self.retries {
            config.retry.max_retries = retries;
        }
        if let Some(secs) = self.timeout {
            if secs == 0 {
                return Err(Error::config("timeout", "must be at least 1 second"));
            }
            config.http.timeout = Duration::from_secs(secs);
        }
        if let Some(on_existing) = self.on_existing {
            config.download.file_collision = on_existing.into();
        }
        config.validation.require_image_content_type = self.require_image_content_type;
        Ok(config)
    }

    /// Fill missing inputs
    ///
    /// Without `--url` on a terminal all three inputs are asked for in turn.
    /// Otherwise the folder and maximum fall back to their defaults.
    fn inputs(&self, interactive: bool) -> Result<RunInputs> {
        let theme = ColorfulTheme::default();
        let prompting = interactive && self.url.is_none();

        let url = match (&self.url, prompting) {
            (Some(url), _) => url.clone(),
            (None, true) => Input::<String>::with_theme(&theme)
                .with_prompt("Gallery index URL")
                .validate_with(|input: &String| {
                    GallerySpec::from_seed(input, 1)
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                })
                .interact_text()
                .map_err(|e| prompt_error("url", e))?,
            (None, false) => {
                return Err(Error::config(
                    "url",
                    "--url is required when not running interactively",
                ));
            }
        };

        let folder = match (&self.folder, prompting) {
            (Some(folder), _) => folder.clone(),
            (None, true) => Input::<String>::with_theme(&theme)
                .with_prompt("Folder name")
                .default(DEFAULT_FOLDER.to_string())
                .interact_text()
                .map_err(|e| prompt_error("folder", e))?,
            (None, false) => DEFAULT_FOLDER.to_string(),
        };

        let max_images = match (self.max_images, prompting) {
            (Some(max), _) => max,
            (None, true) => Input::<u32>::with_theme(&theme)
                .with_prompt("Maximum number of images")
                .default(DEFAULT_MAX_IMAGES)
                .validate_with(|max: &u32| {
                    if *max == 0 {
                        Err("must be at least 1")
                    } else {
                        Ok(())
                    }
                })
                .interact_text()
                .map_err(|e| prompt_error("max_images", e))?,
            (None, false) => DEFAULT_MAX_IMAGES,
        };

        Ok(RunInputs {
            url,
            folder,
            max_images,
        })
    }
}

fn prompt_error(key: &str, e: dialoguer::Error) -> Error {
    Error::config(key, format!("could not read input: {e}"))
}

/// Initialize tracing on stderr according to `-v` and RUST_LOG.
/// `GALLERY_FETCH_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,gallery_fetch={level}")));

    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let builder = tracing_subscriber::registry().with(filter);

    match std::env::var("GALLERY_FETCH_LOG_FORMAT").as_deref() {
        Ok("json") => {
            let _ = builder
                .with(fmt_layer.json().flatten_event(true))
                .try_init();
        }
        _ => {
            let _ = builder.with(fmt_layer.compact()).try_init();
        }
    }
}

async fn run(cli: Cli) -> Result<RunReport> {
    let config = cli.config()?;
    let inputs = cli.inputs(std::io::stdin().is_terminal())?;
    // malformed input aborts before any network or disk activity
    let spec = GallerySpec::from_seed(&inputs.url, inputs.max_images)?;
    let destination = config.destination_for(&inputs.folder);

    let downloader = GalleryDownloader::new(config)?;
    let mode = if cli.quiet || !std::io::stderr().is_terminal() {
        ProgressMode::Hidden
    } else {
        ProgressMode::Bar
    };
    let reporter = spawn_reporter(downloader.subscribe(), mode);
    let signals = tokio::spawn(cancel_on_signal(downloader.cancel_token()));

    let result = downloader.run(&spec, &destination).await;
    signals.abort();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            reporter.abort();
            return Err(e);
        }
    };
    if let Err(e) = reporter.await {
        tracing::warn!(error = %e, "Progress reporter task failed");
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(report)
}

fn print_summary(report: &RunReport) {
    let heading = if report.interrupted {
        style("Download interrupted").yellow().bold()
    } else {
        style("Download complete").green().bold()
    };
    println!("{heading}");
    println!("{}", format_summary(report));
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(report) if report.interrupted => ExitCode::from(EXIT_INTERRUPTED),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", style("error:").red().bold());
            ExitCode::from(e.exit_code())
        }
    }
}
