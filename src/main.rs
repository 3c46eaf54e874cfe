use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tych::collage::Collage;
use tych::config::{self, TychConfig};
use tych::derived::DerivedView;
use tych::geometry::Rect;
use tych::imaging::{BackendError, ImageBackend, RustBackend, supported_input_extensions};
use tych::{output, record};

#[derive(Parser)]
#[command(name = "tych")]
#[command(version)]
#[command(about = "Composite photos into a bordered diptych, triptych or polyptych")]
#[command(long_about = "\
Composite photos into a bordered diptych, triptych or polyptych

Images are placed in the order given. Mostly portrait sets go side by side,
mostly landscape sets are stacked; --swap inverts that. Every image is scaled
to a common edge and the gaps are filled with the border color.

Edits refer to images by their 1-based position:

  tych compose a.jpg b.jpg c.jpg -o out.jpg \\
      --crop 2:100,50,800,1200 --rotate 3:90 --border 0.04 --color '#222'

Settings are read from tych.toml in the working directory, or from the file
given with --config. Flags override the file.

Run 'tych gen-config' to generate a documented tych.toml.")]
struct Cli {
    /// Config file (defaults to ./tych.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compose images into one output file
    Compose {
        #[command(flatten)]
        collage: CollageArgs,
        /// Output image; the extension picks the format (png, jpg, tif, webp)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the layout without drawing anything
    Layout {
        #[command(flatten)]
        collage: CollageArgs,
    },
    /// Save images and their edits as a JSON project file
    SaveProject {
        #[command(flatten)]
        collage: CollageArgs,
        /// Project file to write
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Compose a saved project file
    RenderProject {
        /// Project file to read
        project: PathBuf,
        /// Output image; the extension picks the format (png, jpg, tif, webp)
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        frame: FrameArgs,
    },
    /// Print a stock tych.toml with all options documented
    GenConfig,
}

/// Images, per-image edits and collage settings.
#[derive(clap::Args, Clone)]
struct CollageArgs {
    /// Input images, in collage order
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Crop image N to a rectangle of its rotated bitmap: N:X,Y,WIDTH,HEIGHT
    #[arg(long, value_parser = parse_crop)]
    crop: Vec<CropArg>,

    /// Rotate image N clockwise in 90° steps: N:DEGREES
    #[arg(long, value_parser = parse_rotation, allow_hyphen_values = true)]
    rotate: Vec<RotateArg>,

    /// Set both border weights
    #[arg(long)]
    border: Option<f64>,

    /// Outer border weight (fraction of the minimum dimension)
    #[arg(long)]
    outer_border: Option<f64>,

    /// Inner border weight (fraction of the minimum dimension)
    #[arg(long)]
    inner_border: Option<f64>,

    /// Border color: #rgb, #rrggbb or #rrggbbaa
    #[arg(long)]
    color: Option<String>,

    /// Use the average color of the images as the border color
    #[arg(long, conflicts_with = "color")]
    average_color: bool,

    /// Invert the automatic strip/stack choice
    #[arg(long)]
    swap: bool,

    /// Downscale sources on load so the longer edge is at most this
    #[arg(long)]
    max_source_size: Option<u32>,

    #[command(flatten)]
    frame: FrameArgs,
}

/// Output frame bounds.
#[derive(clap::Args, Clone)]
struct FrameArgs {
    /// Fit the output within this width
    #[arg(long)]
    max_width: Option<u32>,

    /// Fit the output within this height
    #[arg(long)]
    max_height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CropArg {
    index: usize,
    rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RotateArg {
    index: usize,
    degrees: i32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let backend = RustBackend::new();

    match cli.command {
        Command::Compose {
            collage,
            output: destination,
        } => {
            let mut config = load_settings(cli.config.as_deref())?;
            apply_collage_args(&mut config, &collage)?;
            init_thread_pool(&config.processing);
            let built = build_collage(&config, &collage, &backend)?;
            let layout = built.layout(config.frame())?;
            let image = built.try_compose(config.frame())?;
            backend.save(&image, &destination)?;
            println!("{}", output::format_compose_summary(&layout, &destination));
        }
        Command::Layout { collage } => {
            let mut config = load_settings(cli.config.as_deref())?;
            apply_collage_args(&mut config, &collage)?;
            init_thread_pool(&config.processing);
            let built = build_collage(&config, &collage, &backend)?;
            let layout = built.layout(config.frame())?;
            let labels = output::labels_from_paths(&collage.images);
            output::print_layout_output(&built, &layout, &labels);
        }
        Command::SaveProject {
            collage,
            output: destination,
        } => {
            let mut config = load_settings(cli.config.as_deref())?;
            apply_collage_args(&mut config, &collage)?;
            init_thread_pool(&config.processing);
            let built = build_collage(&config, &collage, &backend)?;
            record::save_project(&built, &backend, &destination)?;
            println!("{}", output::format_project_summary(built.len(), &destination));
        }
        Command::RenderProject {
            project,
            output: destination,
            frame,
        } => {
            let mut config = load_settings(cli.config.as_deref())?;
            apply_frame_args(&mut config, &frame);
            init_thread_pool(&config.processing);
            let collage = record::load_project(&project, &backend)?;
            info!(project = %project.display(), images = collage.len(), "loaded project");
            let layout = collage.layout(config.frame())?;
            let image = collage.try_compose(config.frame())?;
            backend.save(&image, &destination)?;
            println!("{}", output::format_compose_summary(&layout, &destination));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Read `--config` when given, otherwise `tych.toml` in the working directory.
fn load_settings(path: Option<&Path>) -> Result<TychConfig, config::ConfigError> {
    match path {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}

/// Layer command-line settings over the loaded config.
fn apply_collage_args(
    config: &mut TychConfig,
    args: &CollageArgs,
) -> Result<(), config::ConfigError> {
    if let Some(weight) = args.border {
        config.border.outer_weight = weight;
        config.border.inner_weight = weight;
    }
    if let Some(weight) = args.outer_border {
        config.border.outer_weight = weight;
    }
    if let Some(weight) = args.inner_border {
        config.border.inner_weight = weight;
    }
    if let Some(color) = &args.color {
        config.border.color = color.clone();
    }
    if args.swap {
        config.layout.swap_orientation = true;
    }
    if let Some(max) = args.max_source_size {
        config.output.max_source_size = max;
    }
    apply_frame_args(config, &args.frame);
    config.validate()
}

fn apply_frame_args(config: &mut TychConfig, frame: &FrameArgs) {
    if let Some(width) = frame.max_width {
        config.output.max_width = width;
    }
    if let Some(height) = frame.max_height {
        config.output.max_height = height;
    }
}

/// Load every image in parallel, then apply the requested edits.
fn build_collage(
    config: &TychConfig,
    args: &CollageArgs,
    backend: &RustBackend,
) -> Result<Collage, Box<dyn std::error::Error>> {
    let mut collage = config.collage()?;
    let max_source_size = config.max_source_size();

    for path in &args.images {
        if !has_supported_extension(path) {
            warn!(path = %path.display(), "unrecognized extension, detecting format from content");
        }
    }

    let views = args
        .images
        .par_iter()
        .map(|path| -> Result<DerivedView, BackendError> {
            let decoded = backend.load(path)?;
            info!(path = %path.display(), "loaded image");
            Ok(DerivedView::from_decoded(decoded, max_source_size))
        })
        .collect::<Result<Vec<_>, _>>()?;
    for view in views {
        collage.add_image(view);
    }

    let count = collage.len();
    let mut edits: Vec<(Option<Rect>, i32)> = vec![(None, 0); count];
    for crop in &args.crop {
        edit_slot(&mut edits, crop.index)?.0 = Some(crop.rect);
    }
    for rotate in &args.rotate {
        edit_slot(&mut edits, rotate.index)?.1 = rotate.degrees;
    }
    for (view, (crop, degrees)) in collage.views().iter().zip(edits) {
        view.set_state(crop, degrees);
    }

    if args.average_color
        && let Some(color) = collage.average_color()
    {
        info!(color = %color.to_hex(), "using average color for borders");
        collage.set_border_color(color);
    }

    Ok(collage)
}

fn edit_slot(
    edits: &mut [(Option<Rect>, i32)],
    index: usize,
) -> Result<&mut (Option<Rect>, i32), String> {
    let count = edits.len();
    edits
        .get_mut(index - 1)
        .ok_or_else(|| format!("no image {index}: the collage has {count} images"))
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| supported_input_extensions().contains(&ext.to_ascii_lowercase().as_str()))
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Split `N:VALUE` into a 1-based image index and the value.
fn split_index(arg: &str) -> Result<(usize, &str), String> {
    let (index, value) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected N:VALUE, got '{arg}'"))?;
    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| format!("invalid image number '{index}'"))?;
    if index == 0 {
        return Err("image numbers start at 1".to_string());
    }
    Ok((index, value))
}

fn parse_crop(arg: &str) -> Result<CropArg, String> {
    let (index, value) = split_index(arg)?;
    let parts = value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid crop value '{part}'"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [x, y, width, height] => Ok(CropArg {
            index,
            rect: Rect::new(*x, *y, *width, *height),
        }),
        _ => Err(format!("expected N:X,Y,WIDTH,HEIGHT, got '{arg}'")),
    }
}

fn parse_rotation(arg: &str) -> Result<RotateArg, String> {
    let (index, value) = split_index(arg)?;
    let degrees = value
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("invalid rotation '{value}'"))?;
    Ok(RotateArg { index, degrees })
}
