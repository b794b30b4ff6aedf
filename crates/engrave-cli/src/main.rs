//! Engraving tone calibration CLI.
//!
//! `gauge` renders a calibration gauge to engrave and scan back, `optimize`
//! corrects a photo for a calibrated engraver, and `simulate` previews what
//! the engraver would produce without burning anything.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use engrave_profile::core::{init_logging, lightness_of_rgb, LightnessImage};
use engrave_profile::gauge::{render_gauge, GaugeSpec, GaugeSpecError, GridGaugeSpec};
use engrave_profile::{
    decolorize, engraving_friendly_bw, prepare_for_engraving, simulate_engraving,
    CalibrationData, ExtractParams, PreprocessParams, ProfileError, SimulationCache,
    TransferModel,
};

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Gauge(#[from] GaugeSpecError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Parser)]
#[command(name = "engrave-tone", version, about = "Engraving tone calibration toolkit")]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a calibration gauge to engrave and scan back.
    Gauge {
        /// Height and width of one square calibration block, in pixels.
        block_size: u32,
        /// Number of block rows.
        rows: u32,
        /// Number of block columns.
        cols: u32,
        /// Power-law exponent of the lightness progression.
        #[arg(long, default_value_t = GridGaugeSpec::DEFAULT_NON_LINEARITY)]
        non_linearity: f64,
        #[arg(short, long, default_value = "calibration_gauge.png")]
        out: PathBuf,
    },
    /// Optimize a color photo for a calibrated engraver.
    Optimize {
        block_size: u32,
        rows: u32,
        cols: u32,
        /// Scanned gauge image; its dimensions must match the gauge spec.
        scan: PathBuf,
        /// Photo to optimize.
        photo: PathBuf,
        #[arg(long, default_value = "greyscale.png")]
        bw_out: PathBuf,
        #[arg(long, default_value = "greyscale_for_engraving.png")]
        engrave_out: PathBuf,
        #[arg(long, default_value = "engraving_simulation_result.png")]
        preview_out: PathBuf,
        /// Also dump the extracted calibration profile as JSON.
        #[arg(long)]
        profile_out: Option<PathBuf>,
    },
    /// Preview how a photo would come out of the engraver.
    Simulate {
        block_size: u32,
        rows: u32,
        cols: u32,
        scan: PathBuf,
        photo: PathBuf,
        #[arg(short, long, default_value = "simulated.png")]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = init_logging(level);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Gauge {
            block_size,
            rows,
            cols,
            non_linearity,
            out,
        } => {
            let spec = GridGaugeSpec::with_non_linearity(block_size, rows, cols, non_linearity)?;
            let gauge = render_gauge(&spec);
            save_lightness(&gauge, &out)?;
            log::info!(
                "wrote {}x{} calibration gauge to {}",
                spec.width(),
                spec.height(),
                out.display()
            );
            Ok(())
        }
        Command::Optimize {
            block_size,
            rows,
            cols,
            scan,
            photo,
            bw_out,
            engrave_out,
            preview_out,
            profile_out,
        } => {
            let data = load_calibration(block_size, rows, cols, &scan)?;
            if let Some(path) = profile_out {
                write_profile_json(&data, &path)?;
            }

            log::info!("converting {} to engraving-friendly grayscale", photo.display());
            let rgb = image::open(&photo)?.to_rgb8();
            let gray = decolorize(rgb.as_raw(), rgb.width() as usize, rgb.height() as usize)
                .expect("decoded buffer matches its dimensions");
            let bw = engraving_friendly_bw(&gray, Some(&data), &PreprocessParams::default());
            save_lightness(&bw, &bw_out)?;

            log::info!("adapting photo to the engraver profile");
            let model = TransferModel::fit(&data)?;
            let corrected = prepare_for_engraving(&bw, &model);
            save_lightness(&corrected, &engrave_out)?;

            log::info!("simulating the engraving result");
            let mut cache = SimulationCache::new();
            let preview = simulate_engraving(&corrected, &data, &mut cache);
            save_lightness(&preview, &preview_out)?;
            Ok(())
        }
        Command::Simulate {
            block_size,
            rows,
            cols,
            scan,
            photo,
            out,
        } => {
            let data = load_calibration(block_size, rows, cols, &scan)?;
            let image = load_lightness(&photo)?;
            let mut cache = SimulationCache::new();
            let preview = simulate_engraving(&image, &data, &mut cache);
            save_lightness(&preview, &out)?;
            log::info!("wrote simulated engraving to {}", out.display());
            Ok(())
        }
    }
}

fn load_calibration(
    block_size: u32,
    rows: u32,
    cols: u32,
    scan: &Path,
) -> Result<CalibrationData, CliError> {
    log::info!("loading engraver profile from {}", scan.display());
    let spec = GridGaugeSpec::new(block_size, rows, cols)?;
    let scanned = load_lightness(scan)?;
    Ok(CalibrationData::extract(
        &spec,
        &scanned,
        &ExtractParams::default(),
    )?)
}

/// Load an image and keep its HSL lightness channel.
fn load_lightness(path: &Path) -> Result<LightnessImage, CliError> {
    let rgb = image::open(path)?.to_rgb8();
    let data = rgb
        .pixels()
        .map(|p| lightness_of_rgb(p.0[0], p.0[1], p.0[2]))
        .collect();
    Ok(
        LightnessImage::from_raw(rgb.width() as usize, rgb.height() as usize, data)
            .expect("decoded buffer matches its dimensions"),
    )
}

fn save_lightness(img: &LightnessImage, path: &Path) -> Result<(), CliError> {
    let rgb = image::RgbImage::from_raw(img.width() as u32, img.height() as u32, img.to_rgb8())
        .expect("RGB buffer matches its dimensions");
    rgb.save(path)?;
    Ok(())
}

fn write_profile_json(data: &CalibrationData, path: &Path) -> Result<(), CliError> {
    let profile = serde_json::json!({
        "median_whiteness": data.median_whiteness(),
        "lightness_map": data.lightness_map(),
    });
    std::fs::write(path, serde_json::to_string_pretty(&profile)?)?;
    Ok(())
}
