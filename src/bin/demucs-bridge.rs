use clap::{Parser, Subcommand};
use demucs_bridge::{
    probe, run_server, separate_to_files, AppConfig, OutputFormat, Predictor, SeparateOptions,
};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "demucs-bridge")]
#[command(about = "Two-stem audio separation around the demucs CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (also: $DEMUCS_BRIDGE_CONFIG, then ./demucs-bridge.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP separation service
    Serve {
        /// Listen address override, e.g. 127.0.0.1:8000
        #[arg(long)]
        listen: Option<String>,
    },

    /// Separate one file into a target stem and the rest
    Split {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value = "vocals")]
        stem: String,

        #[arg(short, long, default_value = "htdemucs")]
        model: String,

        /// Write WAV instead of 320 kbps MP3
        #[arg(long)]
        wav: bool,

        /// Where to write the target stem
        #[arg(long)]
        target_out: PathBuf,

        /// Where to write everything else
        #[arg(long)]
        residual_out: PathBuf,

        #[arg(short, long)]
        quiet: bool,
    },

    /// Check that the separation tool is runnable
    Doctor,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { listen } => handle_serve(cli.config, listen).await,
        Commands::Split {
            input,
            stem,
            model,
            wav,
            target_out,
            residual_out,
            quiet,
        } => handle_split(
            cli.config,
            input,
            stem,
            model,
            wav,
            target_out,
            residual_out,
            quiet,
        ),
        Commands::Doctor => handle_doctor(cli.config),
    };

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

async fn handle_serve(config: Option<PathBuf>, listen: Option<String>) -> anyhow::Result<()> {
    let mut cfg = AppConfig::load(config.as_deref())?;
    if let Some(listen) = listen {
        cfg.listen_addr = listen;
    }

    // Fail at startup rather than on the first request.
    let predictor = Predictor::load(cfg.separator.clone())?;

    run_server(cfg, predictor).await
}

#[allow(clippy::too_many_arguments)]
fn handle_split(
    config: Option<PathBuf>,
    input: PathBuf,
    stem: String,
    model: String,
    wav: bool,
    target_out: PathBuf,
    residual_out: PathBuf,
    quiet: bool,
) -> anyhow::Result<()> {
    let cfg = AppConfig::load(config.as_deref())?;

    let opts = SeparateOptions {
        target_stem: stem.clone(),
        model: model.clone(),
        format: if wav {
            OutputFormat::Wav
        } else {
            OutputFormat::default()
        },
    };

    if !quiet {
        eprintln!("🎵 demucs-bridge");
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("Input: {}", input.display());
        eprintln!("Stem:  {}", stem);
        eprintln!("Model: {}", model);
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!();
    }

    separate_to_files(&input, &target_out, &residual_out, &opts, &cfg.separator)?;

    if !quiet {
        eprintln!("✅ Separation completed successfully!");
        eprintln!();
        eprintln!("Output files:");
        eprintln!("  🎤 {}:    {}", stem, target_out.display());
        eprintln!("  🎹 no_{}: {}", stem, residual_out.display());
    } else {
        // Quiet mode: just print paths
        println!("{}", target_out.display());
        println!("{}", residual_out.display());
    }

    Ok(())
}

fn handle_doctor(config: Option<PathBuf>) -> anyhow::Result<()> {
    let cfg = AppConfig::load(config.as_deref())?;
    let report = probe(&cfg.separator);

    if report.is_ok() {
        println!("✅ `{}` is runnable", report.command);
        Ok(())
    } else {
        eprintln!("❌ `{}`: {}", report.command, report.outcome.label());
        if let Some(detail) = report.detail {
            eprintln!("   {}", detail);
        }
        anyhow::bail!("separation tool is not available")
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("demucs_bridge=info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
