use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use image::{DynamicImage, ImageReader};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use sajin::crop::crop_resistant_hash;
use sajin::services::{HashSettings, PerceptualHash, PerceptualService};
use sajin::{Algorithm, Fingerprint};

#[derive(Parser, Debug)]
#[command(name = "sajin", version, about = "Perceptual and crop-resistant image fingerprints")]
struct Cli {
    /// JSON file with hash settings
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every fingerprint of one or more images
    Hash {
        /// Images to fingerprint
        #[arg(required = true, value_name = "IMAGE")]
        images: Vec<PathBuf>,
        /// Emit one JSON object per image
        #[arg(long)]
        json: bool,
        /// Side of the square fingerprints
        #[arg(long, value_name = "N")]
        hash_size: Option<usize>,
    },

    /// Check whether two images share crop-resistant regions
    Compare {
        first: PathBuf,
        second: PathBuf,
        /// Segments that must match
        #[arg(long, default_value_t = 1)]
        region_cutoff: usize,
        /// Fraction of differing bits allowed per segment
        #[arg(long)]
        bit_error_rate: Option<f64>,
        /// Per-segment fingerprint (dhash, ahash, phash, whash, ...)
        #[arg(long)]
        algorithm: Option<Algorithm>,
    },

    /// Hamming distance between two stored hex fingerprints
    Distance { first: String, second: String },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Hash {
            images,
            json,
            hash_size,
        } => {
            if let Some(size) = hash_size {
                settings.hash_size = size;
            }
            let service = PerceptualService::new(settings);
            let progress = ProgressBar::new(images.len() as u64);
            progress.set_style(ProgressStyle::with_template(
                "{spinner:.green} [{bar:30}] {pos}/{len} {msg}",
            )?);
            let records: Vec<(PathBuf, PerceptualHash)> =
                benchmark(&format!("hashing {} image(s)", images.len()), || {
                    images
                        .par_iter()
                        .map(|path| -> Result<(PathBuf, PerceptualHash)> {
                            let img = open_image(path)?;
                            let record = service
                                .compute(&img)
                                .with_context(|| format!("Failed to hash {:?}", path))?;
                            progress.inc(1);
                            Ok((path.clone(), record))
                        })
                        .collect::<Result<_>>()
                })?;
            progress.finish_and_clear();

            for (path, record) in &records {
                if json {
                    let line = serde_json::json!({
                        "file": path.to_string_lossy(),
                        "hashed_at": Utc::now().to_rfc3339(),
                        "hashes": record,
                    });
                    println!("{}", line);
                } else {
                    print_record(path, record);
                }
            }
        }

        Commands::Compare {
            first,
            second,
            region_cutoff,
            bit_error_rate,
            algorithm,
        } => {
            if let Some(rate) = bit_error_rate {
                settings.bit_error_rate = rate;
            }
            if !(0.0..=1.0).contains(&settings.bit_error_rate) {
                bail!(
                    "bit error rate must be between 0 and 1, got {}",
                    settings.bit_error_rate
                );
            }
            if let Some(alg) = algorithm {
                settings.crop.algorithm = alg;
            }
            let (a, b) = rayon::join(|| open_image(&first), || open_image(&second));
            let (a, b) = (a?, b?);

            let (ha, hb) = rayon::join(
                || crop_resistant_hash(&a, &settings.crop),
                || crop_resistant_hash(&b, &settings.crop),
            );
            let ha = ha.with_context(|| format!("Failed to hash {:?}", first))?;
            let hb = hb.with_context(|| format!("Failed to hash {:?}", second))?;

            let cutoff = ha.hamming_cutoff(settings.bit_error_rate).unwrap_or(0.0);
            let (matched, distance) = ha.hash_diff(&hb, cutoff);
            let matches = ha.matches(&hb, region_cutoff, settings.bit_error_rate);

            println!("▶ {} → {} segment(s)", first.display(), ha.len());
            println!("▶ {} → {} segment(s)", second.display(), hb.len());
            println!("   matched segments: {} (summed distance {})", matched, distance);
            println!(
                "{} Images {}match",
                if matches { "✅" } else { "❌" },
                if matches { "" } else { "do not " }
            );
        }

        Commands::Distance { first, second } => {
            let a: Fingerprint = first
                .parse()
                .with_context(|| format!("Invalid fingerprint {:?}", first))?;
            let b: Fingerprint = second
                .parse()
                .with_context(|| format!("Invalid fingerprint {:?}", second))?;
            println!("{}", a.distance(&b)?);
        }
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<HashSettings> {
    let Some(path) = path else {
        return Ok(HashSettings::default());
    };
    let file = File::open(path).with_context(|| format!("Could not open config {:?}", path))?;
    let settings = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid config {:?}", path))?;
    info!("loaded settings from {}", path.display());
    Ok(settings)
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    ImageReader::open(path)
        .with_context(|| format!("Failed to open {:?}", path))?
        .with_guessed_format()
        .with_context(|| format!("Failed to read {:?}", path))?
        .decode()
        .with_context(|| format!("Failed to decode {:?}", path))
}

fn print_record(path: &Path, record: &PerceptualHash) {
    println!("▶ {}", path.display());
    println!("   Average Hash (ahash)     : {}", record.ahash);
    println!("   Difference Hash (dhash)  : {}", record.dhash);
    println!("   Perceptual Hash (phash)  : {}", record.phash);
    println!("   Wavelet Hash (whash)     : {}", record.whash);
    println!("   Color Hash (colorhash)   : {}", record.colorhash);
    println!("   Crop Resistant Hash      : {}", record.crop);
}

/// Run `f()`, log how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    info!("⏱ {} took {:.2?}", label, start.elapsed());
    result
}
