use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use dancecam::{AnalysisRequest, AnalysisSession, DancecamConfig};

#[derive(Parser, Debug)]
#[command(name = "dancecam")]
#[command(about = "Dance movement analysis with skeleton overlay rendering")]
#[command(version)]
#[command(long_about = "Analyzes dance videos frame by frame: body landmarks from a keypoint \
track are drawn onto every frame, and per-video movement intensity and the dominant side of \
the body are reported as JSON.")]
struct Args {
    /// Videos or frame directories to analyze
    #[arg(value_name = "INPUT", required_unless_present_any = ["print_config", "validate_config"])]
    inputs: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, default_value = "dancecam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Keypoint track to use instead of the sidecar next to the input
    #[arg(short, long, value_name = "FILE", help = "Keypoint track (JSON lines); only valid with a single input")]
    keypoints: Option<PathBuf>,

    /// Override output directory
    #[arg(short, long, value_name = "DIR", help = "Directory for rendered output and run metadata")]
    output: Option<PathBuf>,

    /// Override number of concurrent analyses
    #[arg(short, long, value_name = "N", help = "Number of inputs analyzed concurrently")]
    jobs: Option<usize>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without analyzing")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to a file in this directory
    #[arg(long, value_name = "DIR", help = "Write logs to dancecam.log in this directory")]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let _log_guard = init_logging(&args)?;

    info!("Starting dancecam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match DancecamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(output) = &args.output {
        config.output.path = output.display().to_string();
    }
    if let Some(jobs) = args.jobs {
        config.system.jobs = jobs;
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        if args.validate_config {
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
        return Err(e.into());
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    if args.keypoints.is_some() && args.inputs.len() > 1 {
        anyhow::bail!("--keypoints can only be used with a single input");
    }

    let requests: Vec<AnalysisRequest> = args
        .inputs
        .iter()
        .map(|input| {
            let request = AnalysisRequest::new(input);
            match &args.keypoints {
                Some(keypoints) => request.with_keypoints(keypoints),
                None => request,
            }
        })
        .collect();

    info!(
        "Analyzing {} input(s) with up to {} concurrent jobs",
        requests.len(),
        config.system.jobs
    );

    let session = AnalysisSession::new(config);
    let results = session.analyze_all(requests).await;

    let mut failures = 0;
    for (input, result) in args.inputs.iter().zip(results) {
        match result {
            Ok(metadata) => {
                println!("{}", serde_json::to_string_pretty(&metadata)?);
            }
            Err(e) => {
                failures += 1;
                error!("Failed to analyze {}: {}", input.display(), e);
                eprintln!("✗ {}: {}", input.display(), e);
            }
        }
    }

    if failures > 0 {
        info!("{} of {} analyses failed", failures, args.inputs.len());
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(args: &Args) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dancecam={}", log_level)));

    // Reports go to stdout, logs to stderr
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, "dancecam.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Dancecam Configuration File");
    println!("# This is the default configuration with all available options");
    println!("# Any key can be overridden with DANCECAM_<SECTION>__<KEY>");
    println!();
    println!("{}", toml::to_string_pretty(&DancecamConfig::default())?);
    Ok(())
}
