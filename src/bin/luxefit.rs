//! CLI for LuxeFit - virtual outfit swap.

use clap::{Args, Parser, Subcommand};
use luxefit::image::read_image;
use luxefit::swap::DEFAULT_RESULT_FILENAME;
use luxefit::{
    Config, FailureKind, GeminiModel, GeminiSwapProvider, GeminiSwapProviderBuilder, Slot,
    Studio, SubmitOutcome, SwapProvider,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "luxefit")]
#[command(about = "Dress a model photo in a garment photo using Gemini image editing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the model wearing the garment
    Swap(SwapArgs),

    /// Show how a file would be uploaded
    Inspect(InspectArgs),

    /// Check configuration and API reachability
    Check,
}

#[derive(Args)]
struct SwapArgs {
    /// Photo of the person
    #[arg(short, long)]
    model: PathBuf,

    /// Photo of the garment
    #[arg(short, long)]
    garment: PathBuf,

    /// Output file or directory
    #[arg(short, long, default_value = DEFAULT_RESULT_FILENAME)]
    output: PathBuf,

    /// Use the Pro image model instead of Flash
    #[arg(long)]
    pro: bool,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Args)]
struct InspectArgs {
    /// Image file to inspect
    path: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("luxefit=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Swap(args) => swap(args, config, cli.json).await?,
        Commands::Inspect(args) => inspect(args, config, cli.json).await?,
        Commands::Check => check(config, cli.json).await?,
    }

    Ok(())
}

fn build_provider(config: &Config) -> luxefit::Result<GeminiSwapProvider> {
    config.require_api_key()?;
    GeminiSwapProviderBuilder::from_config(config).build()
}

async fn swap(args: SwapArgs, mut config: Config, json_output: bool) -> anyhow::Result<()> {
    if args.pro {
        config.model = GeminiModel::NanoBananaPro;
    }
    if let Some(secs) = args.timeout {
        if secs == 0 {
            anyhow::bail!("--timeout must be greater than zero");
        }
        config.timeout = Duration::from_secs(secs);
    }

    let provider = match build_provider(&config) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("{}", FailureKind::Configuration.user_message());
            return Err(e.into());
        }
    };

    let studio = Studio::new(Arc::new(provider)).with_limits(config.intake_limits());

    for (slot, path) in [(Slot::Model, &args.model), (Slot::Garment, &args.garment)] {
        if let Err(e) = studio.load_file(slot, path).await {
            report_failure(&studio, json_output)?;
            anyhow::bail!("{slot} image {}: {e}", path.display());
        }
    }

    match studio.submit().await {
        SubmitOutcome::Completed => {}
        SubmitOutcome::Failed(kind) => {
            report_failure(&studio, json_output)?;
            anyhow::bail!("outfit swap failed ({kind:?})");
        }
        other => anyhow::bail!("outfit swap did not run: {other:?}"),
    }

    let saved = studio.save_result(&args.output)?;
    let view = studio.view();

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": saved.display().to_string(),
            "studio": view,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Generated image: {}", saved.display());
        if let Some(result) = &view.result {
            if let Some(model) = &result.metadata.model {
                println!("Model: {}", model);
            }
            if let Some(duration) = result.metadata.duration_ms {
                println!("Duration: {}ms", duration);
            }
        }
    }

    Ok(())
}

fn report_failure(studio: &Studio, json_output: bool) -> anyhow::Result<()> {
    let view = studio.view();
    if json_output {
        let result = serde_json::json!({
            "success": false,
            "studio": view,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if let Some(error) = view.error.as_ref().or(view.upload_error.as_ref()) {
        eprintln!("{}", error.message);
    }
    Ok(())
}

async fn inspect(args: InspectArgs, config: Config, json_output: bool) -> anyhow::Result<()> {
    let image = read_image(&args.path, &config.intake_limits()).await?;

    if json_output {
        let result = serde_json::json!({
            "path": args.path.display().to_string(),
            "media_type": image.media_type,
            "size_bytes": image.decoded_len(),
            "payload_chars": image.payload.len(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("File: {}", args.path.display());
        println!("Media type: {}", image.media_type);
        println!("Size: {} bytes", image.decoded_len());
        let preview: String = image.preview_uri.chars().take(48).collect();
        println!("Preview URI: {}...", preview);
    }

    Ok(())
}

async fn check(config: Config, json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct CheckReport {
        api_key_set: bool,
        model: &'static str,
        timeout_secs: u64,
        base_url: String,
        reachable: bool,
        error: Option<String>,
    }

    let mut report = CheckReport {
        api_key_set: config.api_key.is_some(),
        model: config.model.as_str(),
        timeout_secs: config.timeout.as_secs(),
        base_url: config.base_url.clone(),
        reachable: false,
        error: None,
    };

    match build_provider(&config) {
        Ok(provider) => match provider.health_check().await {
            Ok(()) => report.reachable = true,
            Err(e) => report.error = Some(e.to_string()),
        },
        Err(e) => report.error = Some(e.to_string()),
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let mark = |ok: bool| if ok { "✓" } else { "✗" };
        println!("{} API key", mark(report.api_key_set));
        println!("  model: {}", report.model);
        println!("  timeout: {}s", report.timeout_secs);
        println!("  endpoint: {}", report.base_url);
        println!("{} Gemini reachable", mark(report.reachable));
        if let Some(error) = &report.error {
            println!("  {}", error);
        }
    }

    if !report.reachable {
        anyhow::bail!("configuration check failed");
    }
    Ok(())
}
