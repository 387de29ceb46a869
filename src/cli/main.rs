//! Closet Cutout CLI Tool
//!
//! Command-line interface for cutting clothing items out of photos, laying
//! out items from external masks and labelling region masks.

use crate::{
    build_item_from_mask_files, classify_region, config::PipelineConfig, processor::CutoutProcessor,
    services::ImageIOService,
    tracing_config::{TracingConfig, TracingFormat},
    RegionExtractor, Style,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Clothing cut-out tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "closet-cutout")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format (console, compact, json)
    #[arg(long, default_value = "console", global = true)]
    pub log_format: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove the background from photos with a segmentation model
    Remove(RemoveArgs),
    /// Lay out a photo using an externally supplied binary mask
    Extract(ExtractArgs),
    /// Deduplicate, label and lay out region masks from an outfit photo
    Regions(RegionsArgs),
    /// Print the region label of each mask
    Classify(ClassifyArgs),
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Input image files or directories (use "-" for stdin)
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output file (single input) or directory (batch processing). Use "-" for stdout.
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Path to the segmentation model (.onnx)
    #[arg(short, long, value_name = "MODEL", default_value = "u2net.onnx")]
    pub model: PathBuf,

    /// Style applied after layout (magazine, soft, ground, none)
    #[arg(short, long)]
    pub style: Option<String>,

    /// Keep the original size and skip crop, canvas and style
    #[arg(long)]
    pub no_layout: bool,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of intra-op threads (0 = let the runtime decide)
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Also write the segmentation mask as `<stem>_mask.png` next to each output
    #[arg(long)]
    pub save_mask: bool,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Source photo
    pub image: PathBuf,

    /// Binary mask for the item
    pub mask: PathBuf,

    /// Output file [default: <image stem>_item.png]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip the magazine style
    #[arg(long)]
    pub no_style: bool,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RegionsArgs {
    /// Source outfit photo
    pub image: PathBuf,

    /// One mask per candidate region, all at the photo's size
    #[arg(required = true)]
    pub masks: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "items")]
    pub output: PathBuf,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Mask files to label
    #[arg(required = true)]
    pub masks: Vec<PathBuf>,
}

/// Main CLI entry point
pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = cli
        .log_format
        .parse::<TracingFormat>()
        .map_err(anyhow::Error::msg)
        .context("Invalid --log-format")?;
    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(format)
        .with_env_override()
        .init()
        .context("Failed to initialize tracing")?;

    match cli.command {
        Command::Remove(args) => run_remove(&args).await,
        Command::Extract(args) => run_extract(&args),
        Command::Regions(args) => run_regions(&args),
        Command::Classify(args) => run_classify(&args),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn remove_config(args: &RemoveArgs) -> Result<PipelineConfig> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(style) = &args.style {
        config.style = Style::from_name(style);
    }
    if args.no_layout {
        config.apply_layout = false;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[cfg(feature = "onnx")]
fn build_processor(args: &RemoveArgs, config: PipelineConfig) -> Result<CutoutProcessor> {
    use crate::backends::OnnxBackend;
    use std::sync::Arc;

    let backend = OnnxBackend::from_file(&args.model, config.model_input_size, args.threads)
        .with_context(|| format!("Failed to load model {}", args.model.display()))?;
    CutoutProcessor::new(Arc::new(backend), config).context("Failed to create processor")
}

#[cfg(not(feature = "onnx"))]
fn build_processor(_args: &RemoveArgs, _config: PipelineConfig) -> Result<CutoutProcessor> {
    anyhow::bail!("The remove command needs the onnx feature")
}

async fn run_remove(args: &RemoveArgs) -> Result<()> {
    let config = remove_config(args)?;
    info!(
        model = %args.model.display(),
        style = %config.style,
        layout = config.apply_layout,
        "Starting background removal"
    );
    let processor = build_processor(args, config)?;
    info!(backend = processor.backend_name(), "Backend loaded");

    if args.input.len() == 1 && args.input.first().is_some_and(|s| s == "-") {
        return process_stdin(&processor, args.output.as_deref()).await;
    }

    let files = collect_inputs(&args.input, args.recursive)?;
    if files.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok(());
    }
    info!("Found {} image file(s) to process", files.len());

    let output_dir = if files.len() > 1 {
        match args.output.as_deref() {
            Some("-") => anyhow::bail!("Cannot use stdout (-) as output when processing multiple files"),
            Some(dir) => {
                let dir = PathBuf::from(dir);
                if dir.is_file() {
                    anyhow::bail!(
                        "Output path exists and is a file, not a directory: {}",
                        dir.display()
                    );
                }
                std::fs::create_dir_all(&dir).with_context(|| {
                    format!("Failed to create output directory: {}", dir.display())
                })?;
                Some(dir)
            },
            None => None,
        }
    } else {
        None
    };

    let mut failed = 0usize;
    for input in &files {
        let output = match (&output_dir, args.output.as_deref()) {
            (Some(dir), _) => dir.join(output_file_name(input, "cutout")),
            (None, Some(single)) => PathBuf::from(single),
            (None, None) => input.with_file_name(output_file_name(input, "cutout")),
        };
        if let Err(e) = process_single_file(&processor, input, &output, args.save_mask) {
            error!("Failed to process {}: {:#}", input.display(), e);
            failed += 1;
        }
    }

    info!(
        processed = files.len() - failed,
        failed, "Batch processing summary"
    );
    if failed > 0 {
        anyhow::bail!("{failed} of {} file(s) failed", files.len());
    }
    Ok(())
}

fn process_single_file(
    processor: &CutoutProcessor,
    input: &Path,
    output: &Path,
    save_mask: bool,
) -> Result<()> {
    let result = processor
        .process_file(input, None)
        .with_context(|| format!("Failed to remove background from {}", input.display()))?;

    if save_mask {
        let mask_path = mask_output_path(input, output);
        result
            .save_alpha_png(&mask_path)
            .with_context(|| format!("Failed to save mask {}", mask_path.display()))?;
        debug!("Mask saved to: {}", mask_path.display());
    }

    if output.as_os_str() == "-" {
        return write_stdout(&result.to_png_bytes()?);
    }
    result
        .save_png(output)
        .with_context(|| format!("Failed to save {}", output.display()))?;
    debug!(timings = %result.timings.summary(), "Processing breakdown");
    info!(
        "Processed {} -> {} in {}ms",
        input.display(),
        output.display(),
        result.timings.total_ms
    );
    Ok(())
}

async fn process_stdin(processor: &CutoutProcessor, output: Option<&str>) -> Result<()> {
    info!("Reading image from stdin");
    let result = crate::remove_background_from_reader(tokio::io::stdin(), processor, None)
        .await
        .context("Failed to process image from stdin")?;

    match output {
        None | Some("-") => {
            write_stdout(&result.to_png_bytes()?)?;
            info!("Image written to stdout");
        },
        Some(path) => {
            result
                .save_png(path)
                .with_context(|| format!("Failed to save {path}"))?;
            info!("Image saved to: {path}");
        },
    }
    Ok(())
}

fn run_extract(args: &ExtractArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.image.with_file_name(output_file_name(&args.image, "item")));

    let written = build_item_from_mask_files(&args.image, &args.mask, &output, !args.no_style, &config)
        .with_context(|| format!("Failed to extract item from {}", args.image.display()))?;
    info!("Item saved to: {}", written.display());
    Ok(())
}

fn run_regions(args: &RegionsArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let masks = args
        .masks
        .iter()
        .map(|path| {
            ImageIOService::load_mask(path)
                .with_context(|| format!("Failed to load mask {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let written = RegionExtractor::new(config)
        .extract_to_dir(&args.image, masks, &args.output)
        .context("Failed to extract regions")?;
    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}

fn run_classify(args: &ClassifyArgs) -> Result<()> {
    for path in &args.masks {
        let mask = ImageIOService::load_mask(path)
            .with_context(|| format!("Failed to load mask {}", path.display()))?;
        println!("{}\t{}", path.display(), classify_region(&mask));
    }
    Ok(())
}

/// Expand files and directories into a sorted list of image paths
fn collect_inputs(inputs: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = PathBuf::from(input);
        if path.is_file() {
            if ImageIOService::is_supported_format(&path) {
                files.push(path);
            } else {
                warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            files.extend(find_image_files(&path, recursive)?);
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }
    files.sort();
    Ok(files)
}

fn find_image_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let walker = walkdir::WalkDir::new(dir).max_depth(if recursive { usize::MAX } else { 1 });
    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && ImageIOService::is_supported_format(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// `<stem>_<suffix>.png`
fn output_file_name(input: &Path, suffix: &str) -> String {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    format!("{stem}_{suffix}.png")
}

/// Mask file beside the output, or beside the input when writing to stdout
fn mask_output_path(input: &Path, output: &Path) -> PathBuf {
    let anchor = if output.as_os_str() == "-" { input } else { output };
    anchor.with_file_name(output_file_name(input, "mask"))
}

fn write_stdout(data: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(data)
        .context("Failed to write image data to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}
