use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ecolens_contracts::events::EventWriter;
use ecolens_contracts::{normalize, AnalysisPayload};
use ecolens_engine::{
    default_transport_registry, EngineConfig, ImageCandidate, RequestState, SubmissionController,
};

mod render;
mod session;

use render::{render_result, render_state, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "ecolens",
    version,
    about = "Analyze a photo of waste and get composting guidance"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit one image and print the analysis.
    Describe(DescribeArgs),
    /// Normalize a raw analysis response read from a file or stdin.
    Normalize(NormalizeArgs),
    /// Interactive select/submit/reset loop.
    Session(SessionArgs),
}

#[derive(Debug, Args)]
struct TransportArgs {
    #[arg(long, default_value = "http")]
    transport: String,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    preview_dir: Option<PathBuf>,
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct DescribeArgs {
    #[arg(long)]
    image: PathBuf,
    #[command(flatten)]
    transport: TransportArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct NormalizeArgs {
    /// Defaults to stdin; `-` also reads stdin.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Treat the input as a full service response body (`{"html": ...}`).
    #[arg(long)]
    response_json: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[command(flatten)]
    transport: TransportArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

const EXIT_FAILURE_RESULT: i32 = 2;

fn main() {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("ecolens warning: failed to load .env: {err}");
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("ecolens error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Describe(args) => run_describe(args),
        Command::Normalize(args) => run_normalize(args),
        Command::Session(args) => {
            let mut controller = build_controller(&args.transport)?;
            let stdin = io::stdin();
            session::run_session(
                &mut controller,
                args.format,
                stdin.lock(),
                &mut io::stdout(),
            )?;
            Ok(0)
        }
    }
}

fn build_controller(args: &TransportArgs) -> Result<SubmissionController> {
    let mut config = EngineConfig::from_env()?;
    if let Some(api_url) = args.api_url.as_deref() {
        config.api_url = api_url.trim().trim_end_matches('/').to_string();
    }
    if let Some(dir) = args.preview_dir.as_ref() {
        config.preview_dir = dir.clone();
    }
    log::debug!("engine config: {config:?}");

    let registry = default_transport_registry(&config)?;
    let Some(transport) = registry.get(&args.transport) else {
        if args.transport == "gemini" {
            bail!("transport 'gemini' is not configured (set GEMINI_API_KEY)");
        }
        bail!(
            "unknown transport '{}' (available: {})",
            args.transport,
            registry.names().join(", ")
        );
    };

    let mut controller = SubmissionController::new(transport, &config.preview_dir);
    if let Some(events_path) = args.events.as_ref() {
        controller = controller.with_events(EventWriter::new(events_path, session_id()));
    }
    Ok(controller)
}

fn run_describe(args: DescribeArgs) -> Result<i32> {
    let mut controller = build_controller(&args.transport)?;
    let candidate = ImageCandidate::from_path(&args.image)?;
    let media_type = candidate.media_type.clone();
    if !controller.select_image(candidate) {
        bail!(
            "{} is not an image ({media_type}); expected an image/* file",
            args.image.display()
        );
    }

    controller.submit();
    let state = controller.wait();
    let code = match &state {
        RequestState::Completed(result) if result.is_success() => 0,
        _ => EXIT_FAILURE_RESULT,
    };
    let rendered = render_state(&state, args.format)?;
    emit(&rendered, args.out.as_deref())?;
    controller.reset();
    Ok(code)
}

fn run_normalize(args: NormalizeArgs) -> Result<i32> {
    let raw = read_input(args.input.as_deref())?;
    let payload = if args.response_json {
        AnalysisPayload::from_json_str(&raw).context("input is not a JSON response body")?
    } else {
        AnalysisPayload::Content(raw)
    };
    let result = normalize(Some(&payload), None);
    emit(&render_result(&result, args.format)?, None)?;
    Ok(if result.is_success() {
        0
    } else {
        EXIT_FAILURE_RESULT
    })
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display())),
        _ => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("failed reading stdin")?;
            Ok(raw)
        }
    }
}

fn emit(rendered: &str, out: Option<&Path>) -> Result<()> {
    let Some(path) = out else {
        println!("{rendered}");
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{rendered}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0);
    format!("session-{millis}-{}", std::process::id())
}
