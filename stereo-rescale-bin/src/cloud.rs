use stereo_rescale_lib as rescale;
use rescale::calibration::Calibration;
use rescale::depth;
use rescale::interop::{depth_to_image, disparity_from_image, image_size};
use rescale::quantize::ImageSize;

use anyhow::{bail, Context};
use std::io::Write;
use std::path::PathBuf;

mod utils;

// Default values for some of the program arguments.
const DEFAULT_MIN_DISPARITY: f64 = 0.0;
const DEFAULT_DISPARITY_SCALE: f32 = 256.0;
const DEFAULT_DEPTH_SCALE: f64 = 1000.0;
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
stereo-cloud

Reconstruct the 3D points of a disparity map.
The calibration must be the one of the images the disparity was computed on.

USAGE:
    stereo-cloud [FLAGS...] --intrinsics K_scaled.txt DISPARITY_IMAGE
    For example:
        stereo-cloud --intrinsics K_scaled.txt --out cloud.xyz disparity.png

FLAGS:
    --help                   # Print this message and exit
    --version                # Print version and exit
    --intrinsics file        # Calibration file with the intrinsics and the baseline
    --disparity-scale float  # Stored values are disparities times this (default: {})
    --min-disparity float    # Disparities at or below this are skipped (default: {})
    --size WxH               # Expected disparity size, checked if given
    --out file               # Output file, one "X Y Z" line per point (default: <disparity>.xyz)
    --depth-out file         # Also save the depth map as a 16 bits PNG image
    --depth-scale float      # Stored values are depths times this (default: {})
    --verbosity int          # 0: errors only ... 4: trace (default: {})
"#,
        DEFAULT_DISPARITY_SCALE,
        DEFAULT_MIN_DISPARITY,
        DEFAULT_DEPTH_SCALE,
        DEFAULT_VERBOSITY,
    )
}

#[derive(Debug)]
/// Type holding command line arguments.
struct Args {
    intrinsics_path: PathBuf,
    disparity_path: PathBuf,
    disparity_scale: f32,
    min_disparity: f64,
    size: Option<ImageSize>,
    out_path: PathBuf,
    depth_out: Option<PathBuf>,
    depth_scale: f64,
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

    // Mandatory arguments.
    let intrinsics_path: String = args.value_from_str("--intrinsics")?;

    // Optional arguments.
    let disparity_scale = args
        .opt_value_from_str("--disparity-scale")?
        .unwrap_or(DEFAULT_DISPARITY_SCALE);
    let min_disparity = args
        .opt_value_from_str("--min-disparity")?
        .unwrap_or(DEFAULT_MIN_DISPARITY);
    let size: Option<String> = args.opt_value_from_str("--size")?;
    let size = size.as_deref().map(parse_size).transpose()?;
    let out_path: Option<String> = args.opt_value_from_str("--out")?;
    let depth_out: Option<String> = args.opt_value_from_str("--depth-out")?;
    let depth_scale = args
        .opt_value_from_str("--depth-scale")?
        .unwrap_or(DEFAULT_DEPTH_SCALE);

    let free_args = args.free()?;
    let disparity_path = match free_args.as_slice() {
        [path] => PathBuf::from(path),
        _ => bail!(
            "Expected one DISPARITY_IMAGE but got {} arguments. Use --help to know how to use this tool.",
            free_args.len()
        ),
    };

    Ok(Args {
        intrinsics_path: PathBuf::from(intrinsics_path),
        out_path: out_path
            .map(PathBuf::from)
            .unwrap_or_else(|| disparity_path.with_extension("xyz")),
        depth_out: depth_out.map(PathBuf::from),
        depth_scale,
        disparity_path,
        disparity_scale,
        min_disparity,
        size,
    })
}

/// Parse a size written as WxH, for example 896x672.
fn parse_size(s: &str) -> anyhow::Result<ImageSize> {
    let mut parts = s.splitn(2, 'x');
    match (parts.next(), parts.next()) {
        (Some(width), Some(height)) => Ok(ImageSize::new(
            width.parse::<u32>().context("Invalid width in --size")?,
            height.parse::<u32>().context("Invalid height in --size")?,
        )),
        _ => bail!("--size must be of the shape WxH, got {}", s),
    }
}

/// Start actual program with command line arguments successfully parsed.
fn run(args: Args) -> anyhow::Result<()> {
    let rig = std::fs::read_to_string(&args.intrinsics_path)
        .with_context(|| format!("Failed to read {}", args.intrinsics_path.display()))?
        .parse::<Calibration>()
        .and_then(|calibration| calibration.rig())
        .with_context(|| format!("Invalid calibration file {}", args.intrinsics_path.display()))?;
    log::info!("K matrix:{}", rig.intrinsics.matrix());
    log::info!("Baseline: {}", rig.baseline);

    let disparity_img = image::open(&args.disparity_path)
        .with_context(|| format!("Failed to load {}", args.disparity_path.display()))?
        .into_luma16();
    let found = image_size(&disparity_img);
    log::info!("Disparity size: {}x{}", found.width, found.height);
    let disparities = disparity_from_image(disparity_img, args.disparity_scale)?;

    let points = match args.size {
        Some(expected) => {
            depth::reconstruct_rig(&disparities, &rig, expected, args.min_disparity)?
        }
        None => depth::reconstruct(
            &disparities,
            &rig.intrinsics,
            rig.baseline,
            args.min_disparity,
        )?,
    };
    log::info!(
        "{} points out of {} pixels",
        points.len(),
        disparities.len()
    );

    utils::create_parent_dir(&args.out_path)?;
    let file = std::fs::File::create(&args.out_path)
        .with_context(|| format!("Failed to create {}", args.out_path.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    for p in points.iter() {
        writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
    }
    writer.flush()?;
    log::info!("Saved point cloud: {}", args.out_path.display());

    if let Some(depth_out) = &args.depth_out {
        let depths = depth::depth_map(
            &disparities,
            &rig.intrinsics,
            rig.baseline,
            args.min_disparity,
        )?;
        let depth_img = depth_to_image(&depths, args.depth_scale)?;
        utils::create_parent_dir(depth_out)?;
        depth_img
            .save(depth_out)
            .with_context(|| format!("Failed to save {}", depth_out.display()))?;
        log::info!("Saved depth map: {}", depth_out.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_argument() {
        assert_eq!(parse_size("896x672").unwrap(), ImageSize::new(896, 672));
        assert!(parse_size("896").is_err());
        assert!(parse_size("896xabc").is_err());
    }
}
