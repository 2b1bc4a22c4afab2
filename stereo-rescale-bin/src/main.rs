use stereo_rescale_lib as rescale;
use rescale::calibration::Calibration;
use rescale::downscale::{self, Config};
use rescale::interop::image_size;
use rescale::quantize::Rounding;

use anyhow::{bail, Context};
use std::path::{Path, PathBuf};

mod utils;

// Default values for some of the program arguments.
const DEFAULT_SCALE: f64 = 0.5;
const DEFAULT_BLOCK_SIZE: u32 = 224;
const DEFAULT_VERBOSITY: u32 = 2;

/// Entry point of the program.
fn main() {
    if let Err(err) = parse_args().and_then(run) {
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }
}

fn display_help() {
    eprintln!(
        r#"
stereo-downscale

Downscale a stereo pair to a size multiple of a block size,
and update the camera intrinsics accordingly (the baseline is unchanged).

USAGE:
    stereo-downscale [FLAGS...] LEFT_IMAGE RIGHT_IMAGE K_FILE
    For example:
        stereo-downscale --scale 0.6 left.png right.png K.txt

FLAGS:
    --help                 # Print this message and exit
    --version              # Print version and exit
    --scale float          # Requested scale factor (default: {})
    --block-size int       # Output dimensions are multiples of this (default: {})
    --rounding up|nearest  # How dimensions snap to the block size (default: {})
    --output-left path     # Output left image (default: <left>_scaled.<ext>)
    --output-right path    # Output right image (default: <right>_scaled.<ext>)
    --output-k path        # Output calibration file (default: <K>_scaled.<ext>)
    --verbosity int        # 0: errors only ... 4: trace (default: {})
"#,
        DEFAULT_SCALE,
        DEFAULT_BLOCK_SIZE,
        Rounding::default(),
        DEFAULT_VERBOSITY,
    )
}

#[derive(Debug)]
/// Type holding command line arguments.
struct Args {
    config: Config,
    left_path: PathBuf,
    right_path: PathBuf,
    k_path: PathBuf,
    output_left: PathBuf,
    output_right: PathBuf,
    output_k: PathBuf,
}

/// Function parsing the command line arguments and returning an Args object or an error.
fn parse_args() -> anyhow::Result<Args> {
    let mut args = pico_args::Arguments::from_env();

    // Retrieve command line arguments.
    let help = args.contains(["-h", "--help"]);
    let version = args.contains(["-v", "--version"]);

    // Check if the --help or --version flags are present.
    if help {
        display_help();
        std::process::exit(0);
    } else if version {
        println!("{}", std::env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    let verbosity = args
        .opt_value_from_str("--verbosity")?
        .unwrap_or(DEFAULT_VERBOSITY);
    utils::init_logger(verbosity);

    // Optional arguments.
    let scale = args
        .opt_value_from_str("--scale")?
        .unwrap_or(DEFAULT_SCALE);
    let block_size = args
        .opt_value_from_str("--block-size")?
        .unwrap_or(DEFAULT_BLOCK_SIZE);
    let rounding: Rounding = args
        .opt_value_from_str("--rounding")?
        .unwrap_or_default();
    let output_left: Option<String> = args.opt_value_from_str("--output-left")?;
    let output_right: Option<String> = args.opt_value_from_str("--output-right")?;
    let output_k: Option<String> = args.opt_value_from_str("--output-k")?;

    // Positional arguments.
    let free_args = args.free()?;
    let (left_path, right_path, k_path) = match free_args.as_slice() {
        [left, right, k] => (PathBuf::from(left), PathBuf::from(right), PathBuf::from(k)),
        _ => bail!(
            "Expected LEFT_IMAGE RIGHT_IMAGE K_FILE but got {} arguments. Use --help to know how to use this tool.",
            free_args.len()
        ),
    };

    let output_or_scaled = |output: Option<String>, input: &Path| {
        output.map(PathBuf::from).unwrap_or_else(|| scaled_path(input))
    };
    Ok(Args {
        config: Config {
            scale,
            block_size,
            rounding,
            ..Config::default()
        },
        output_left: output_or_scaled(output_left, &left_path),
        output_right: output_or_scaled(output_right, &right_path),
        output_k: output_or_scaled(output_k, &k_path),
        left_path,
        right_path,
        k_path,
    })
}

/// `dir/name.ext` becomes `dir/name_scaled.ext`.
fn scaled_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let file_name = match path.extension() {
        Some(ext) => format!("{}_scaled.{}", stem, ext.to_string_lossy()),
        None => format!("{}_scaled", stem),
    };
    path.with_file_name(file_name)
}

/// Start actual program with command line arguments successfully parsed.
fn run(args: Args) -> anyhow::Result<()> {
    for (name, path) in [
        ("Left image", &args.left_path),
        ("Right image", &args.right_path),
        ("K matrix", &args.k_path),
    ]
    .iter()
    {
        if !path.exists() {
            bail!("{} not found: {}", name, path.display());
        }
    }

    // Load the calibration and the stereo pair.
    let calibration: Calibration = std::fs::read_to_string(&args.k_path)
        .with_context(|| format!("Failed to read {}", args.k_path.display()))?
        .parse::<Calibration>()
        .with_context(|| format!("Invalid calibration file {}", args.k_path.display()))?;
    let left = image::open(&args.left_path)
        .with_context(|| format!("Failed to load {}", args.left_path.display()))?;
    let right = image::open(&args.right_path)
        .with_context(|| format!("Failed to load {}", args.right_path.display()))?;

    let original = image_size(&left);
    log::info!("Original size: {}x{}", original.width, original.height);
    log::info!("Original K matrix:{}", calibration.intrinsics.matrix());
    log::info!("Baseline: {}", display_baseline(calibration.baseline));

    // Compute the target size and intrinsics, then resize.
    let plan = downscale::plan(&args.config, original, &calibration)?;
    let (left_resized, right_resized) = downscale::resize_pair(&left, &right, plan.target)
        .context("The left and right images must have the same size")?;
    log::info!("Updated K matrix:{}", plan.calibration.intrinsics.matrix());
    log::info!(
        "Baseline (unchanged): {}",
        display_baseline(plan.calibration.baseline)
    );

    // Save outputs.
    for path in [&args.output_left, &args.output_right, &args.output_k].iter() {
        utils::create_parent_dir(path)
            .with_context(|| format!("Failed to create the directory of {}", path.display()))?;
    }
    left_resized
        .save(&args.output_left)
        .with_context(|| format!("Failed to save {}", args.output_left.display()))?;
    log::info!("Saved left image: {}", args.output_left.display());
    right_resized
        .save(&args.output_right)
        .with_context(|| format!("Failed to save {}", args.output_right.display()))?;
    log::info!("Saved right image: {}", args.output_right.display());
    std::fs::write(&args.output_k, plan.calibration.to_string())
        .with_context(|| format!("Failed to save {}", args.output_k.display()))?;
    log::info!("Saved K matrix: {}", args.output_k.display());
    Ok(())
}

fn display_baseline(baseline: Option<f64>) -> String {
    baseline.map_or_else(|| "none".to_string(), |b| b.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_path_keeps_directory_and_extension() {
        assert_eq!(
            scaled_path(Path::new("data/left.png")),
            PathBuf::from("data/left_scaled.png")
        );
        assert_eq!(scaled_path(Path::new("K")), PathBuf::from("K_scaled"));
    }

    #[test]
    fn advertised_rounding_is_the_applied_one() {
        let advertised: Rounding = Rounding::default().to_string().parse().unwrap();
        assert_eq!(advertised, Config::default().rounding);
    }
}
