use clap::Parser;
use std::path::PathBuf;
use wsinspector::output::checks_dir;
use wsinspector::{RunOptions, execute, init_logging, prepare};

#[derive(Parser, Debug)]
#[command(name = "wsinspector")]
#[command(about = "Inspect a binned statistical model and tabulate nuisance parameter sensitivities")]
struct Args {
    /// Model file (.json, .yaml or .yml)
    #[arg(default_value = "WorkspaceForTest1.json")]
    input: PathBuf,

    /// Output directory; checks are written to <OUT_DIR>/Checks/
    #[arg(default_value = "./results/")]
    out_dir: PathBuf,

    #[arg(default_value = "combined")]
    workspace: String,

    #[arg(default_value = "ModelConfig")]
    model_config: String,

    #[arg(default_value = "obsData")]
    dataset: String,

    /// YAML inspection config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sample to report on (repeatable)
    #[arg(short, long = "sample")]
    samples: Vec<String>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let log_file = init_logging(&args.log_level)?;

    let opts = RunOptions {
        input: args.input,
        out_dir: args.out_dir,
        workspace: args.workspace,
        model_config: args.model_config,
        dataset: args.dataset,
        config: args.config,
        samples: args.samples,
    };

    let mut inspector = prepare(&opts).inspect_err(|err| {
        tracing::error!("cannot start inspection: {err:#}");
    })?;
    let log_path = log_file.open(&checks_dir(&opts.out_dir))?;
    tracing::info!("logging to {}", log_path.display());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(err) = execute(&opts, &mut inspector, &mut out) {
        tracing::error!("inspection failed: {err:#}");
        return Err(err);
    }

    tracing::info!("inspection finished");
    Ok(())
}
