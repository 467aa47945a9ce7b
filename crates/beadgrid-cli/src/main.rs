//! beadgrid CLI — quantize images to bead patterns and recognize
//! photographed boards.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use beadgrid::{
    quantize, recognize, CancelToken, Palette, PaletteFile, Progress, QuantizeSpec,
    RecognizeConfig, RecognizeError, SampleMode,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "beadgrid")]
#[command(about = "Bead-craft imaging: palette quantization and bead-board recognition")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quantize an image to a palette grid.
    Quantize {
        /// Path to the input image.
        #[arg(long)]
        image: PathBuf,

        /// Path to the palette file (JSON, brand -> colors).
        #[arg(long)]
        palette: PathBuf,

        /// Path to write the grid (JSON).
        #[arg(long)]
        out: PathBuf,

        /// Target grid width in cells.
        #[arg(long, default_value = "29")]
        width: u32,

        /// Target grid height in cells.
        #[arg(long, default_value = "29")]
        height: u32,

        /// Sampling mode: dominant, average, center, diagonal45, original.
        #[arg(long, default_value = "dominant")]
        mode: String,

        /// Disable the 15% block edge trim.
        #[arg(long)]
        no_edge_trim: bool,
    },

    /// Recognize a photographed bead board.
    Recognize {
        /// Path to the board photograph.
        #[arg(long)]
        image: PathBuf,

        /// Path to the palette file (JSON, brand -> colors).
        #[arg(long)]
        palette: PathBuf,

        /// Path to write the recognized grid (JSON).
        #[arg(long)]
        out: PathBuf,

        /// Path to write grid-detection diagnostics on failure (JSON).
        #[arg(long)]
        debug: Option<PathBuf>,
    },

    /// Print palette file statistics.
    PaletteInfo {
        /// Path to the palette file (JSON, brand -> colors).
        #[arg(long)]
        palette: PathBuf,
    },
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Quantize {
            image,
            palette,
            out,
            width,
            height,
            mode,
            no_edge_trim,
        } => run_quantize(&image, &palette, &out, width, height, &mode, !no_edge_trim),

        Commands::Recognize {
            image,
            palette,
            out,
            debug,
        } => run_recognize(&image, &palette, &out, debug.as_deref()),

        Commands::PaletteInfo { palette } => run_palette_info(&palette),
    }
}

fn load_palette(path: &std::path::Path) -> CliResult<Palette> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| -> CliError { format!("failed to read {}: {e}", path.display()).into() })?;
    let file: PaletteFile = serde_json::from_str(&text)?;
    Ok(Palette::from_file_records(&file)?)
}

fn load_image(path: &std::path::Path) -> CliResult<image::RgbaImage> {
    tracing::info!("Loading image: {}", path.display());
    let img = image::open(path)
        .map_err(|e| -> CliError { format!("failed to open {}: {e}", path.display()).into() })?;
    Ok(img.to_rgba8())
}

// ── quantize ───────────────────────────────────────────────────────────

fn run_quantize(
    image_path: &std::path::Path,
    palette_path: &std::path::Path,
    out_path: &std::path::Path,
    width: u32,
    height: u32,
    mode: &str,
    edge_trim: bool,
) -> CliResult<()> {
    let mode = SampleMode::parse(mode)
        .ok_or_else(|| -> CliError { format!("unknown sampling mode '{mode}'").into() })?;
    let palette = load_palette(palette_path)?;
    let rgba = load_image(image_path)?;
    let (w, h) = rgba.dimensions();
    tracing::info!("Image size: {w}x{h}");

    let spec = QuantizeSpec {
        width,
        height,
        mode,
        edge_trim,
    };
    let grid = quantize(&rgba, &spec, &palette)?;

    let json = serde_json::to_string_pretty(&grid)?;
    std::fs::write(out_path, &json)?;
    tracing::info!("Grid written to {}", out_path.display());
    Ok(())
}

// ── recognize ──────────────────────────────────────────────────────────

fn run_recognize(
    image_path: &std::path::Path,
    palette_path: &std::path::Path,
    out_path: &std::path::Path,
    debug_path: Option<&std::path::Path>,
) -> CliResult<()> {
    let palette = load_palette(palette_path)?;
    let rgba = load_image(image_path)?;
    let (w, h) = rgba.dimensions();
    tracing::info!("Image size: {w}x{h}");

    let cancel = CancelToken::new();
    let mut last_percent = 0u32;
    let mut on_progress = |p: Progress| {
        let percent = (p.fraction * 100.0) as u32;
        if percent / 10 > last_percent / 10 {
            tracing::info!("{percent}% ({:?})", p.phase);
        }
        last_percent = percent;
    };

    let result = recognize(
        &rgba,
        &palette,
        &RecognizeConfig::default(),
        &mut on_progress,
        &cancel,
    );

    match result {
        Ok(grid) => {
            tracing::info!(
                "Recognized {}x{} grid with {} beads",
                grid.rows(),
                grid.cols(),
                grid.bead_count()
            );
            let json = serde_json::to_string_pretty(&grid)?;
            std::fs::write(out_path, &json)?;
            tracing::info!("Grid written to {}", out_path.display());
            Ok(())
        }
        Err(RecognizeError::GridNotFound { debug }) => {
            if let Some(debug_path) = debug_path {
                let json = serde_json::to_string_pretty(&debug)?;
                std::fs::write(debug_path, &json)?;
                tracing::info!("Diagnostics written to {}", debug_path.display());
            }
            Err(RecognizeError::GridNotFound { debug }.into())
        }
        Err(e) => Err(e.into()),
    }
}

// ── palette-info ───────────────────────────────────────────────────────

fn run_palette_info(palette_path: &std::path::Path) -> CliResult<()> {
    let text = std::fs::read_to_string(palette_path)?;
    let file: PaletteFile = serde_json::from_str(&text)?;
    let palette = Palette::from_file_records(&file)?;

    println!("palette file: {}", palette_path.display());
    println!("  brands:  {}", file.len());
    println!("  colors:  {}", palette.len());
    for (brand, records) in &file {
        println!("  {brand}: {} colors", records.len());
    }
    Ok(())
}
