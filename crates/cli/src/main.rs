use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::parser::delimiter_byte;
use data_loader::{write_state, DataReader, ReaderConfig};
use pipeline::{CopyMode, DataSource, PreprocessingPipeline};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// RecSys Prep - sparse dataset loading and preprocessing
#[derive(Parser)]
#[command(name = "recsys-prep")]
#[command(
    about = "Load a recommender dataset and run preprocessing chains on it",
    long_about = None
)]
struct Cli {
    /// Path to the dataset directory
    #[arg(short, long, default_value = "data/recsys2019")]
    data_dir: PathBuf,

    /// Reader configuration (JSON); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Field delimiter, overrides the configuration
    #[arg(long)]
    delimiter: Option<char>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the raw dataset and describe every matrix
    Summary,

    /// Run a preprocessing pipeline and describe the result
    Preprocess {
        /// Pipeline definition (JSON with a "stages" list)
        #[arg(long)]
        pipeline: PathBuf,

        /// Copy every structure between stages instead of sharing
        #[arg(long)]
        deep_copy: bool,

        /// Write the resulting matrices under this directory
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            read_json::<ReaderConfig>(path).context("Failed to read reader configuration")?
        }
        None => ReaderConfig::default(),
    };
    if let Some(delimiter) = cli.delimiter {
        config.delimiter = delimiter;
    }
    let reader = DataReader::new(&cli.data_dir, config);

    match cli.command {
        Commands::Summary => handle_summary(reader)?,
        Commands::Preprocess {
            pipeline,
            deep_copy,
            export,
        } => handle_preprocess(reader, &pipeline, deep_copy, export.as_deref())?,
    }

    Ok(())
}

/// Handle the 'summary' command
fn handle_summary(mut reader: DataReader) -> Result<()> {
    println!("Loading dataset from {}...", reader.data_dir().display());
    let start = Instant::now();
    DataSource::load(&mut reader).context("Failed to load dataset")?;
    tracing::info!("Loaded {}", reader.dataset_name());
    println!("{} Loaded dataset in {:?}", "✓".green(), start.elapsed());

    print_summary(&reader)
}

/// Handle the 'preprocess' command
fn handle_preprocess(
    reader: DataReader,
    pipeline_path: &Path,
    deep_copy: bool,
    export: Option<&Path>,
) -> Result<()> {
    let pipeline: PreprocessingPipeline =
        read_json(pipeline_path).context("Failed to read pipeline definition")?;
    let delimiter = delimiter_byte(reader.config().delimiter)?;

    println!("{}", "Pipeline:".bold().blue());
    for (i, stage) in pipeline.stages().iter().enumerate() {
        println!("  {}. {} ({:?})", i + 1, stage.name().green(), stage);
    }

    let copy_mode = if deep_copy { CopyMode::Deep } else { CopyMode::Share };
    tracing::info!(
        "Running {} stages over {} ({:?} mode)",
        pipeline.len(),
        reader.dataset_name(),
        copy_mode
    );
    let mut source = pipeline.into_source(reader, copy_mode);

    let start = Instant::now();
    source.load().context("Preprocessing failed")?;
    println!("{} Preprocessed dataset in {:?}", "✓".green(), start.elapsed());

    print_summary(source.as_ref())?;

    if let Some(root) = export {
        let dir = root.join(source.dataset_name());
        tracing::info!("Exporting {} to {}", source.dataset_name(), dir.display());
        let written = write_state(&dir, source.state()?, delimiter)
            .with_context(|| format!("Failed to export to {}", dir.display()))?;
        println!("{} Wrote {} files to {}", "✓".green(), written, dir.display());
    }
    Ok(())
}

/// Helper function to describe a loaded source
fn print_summary(source: &dyn DataSource) -> Result<()> {
    let state = source.state()?;

    println!("{}", format!("Dataset {}", source.dataset_name()).bold().blue());
    println!(
        "{}URM: {} users x {} items, {} interactions{}",
        "• ".green(),
        state.n_users(),
        state.n_items(),
        state.urm.nnz(),
        if source.is_implicit() { " (implicit)" } else { "" }
    );

    for name in source.loaded_icm_names()? {
        let icm = source.icm(&name)?;
        println!(
            "{}ICM {}: {} x {}, {} entries",
            "• ".cyan(),
            name,
            icm.rows(),
            icm.cols(),
            icm.nnz()
        );
    }
    for name in source.loaded_ucm_names()? {
        let ucm = source.ucm(&name)?;
        println!(
            "{}UCM {}: {} x {}, {} entries",
            "• ".cyan(),
            name,
            ucm.rows(),
            ucm.cols(),
            ucm.nnz()
        );
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}
