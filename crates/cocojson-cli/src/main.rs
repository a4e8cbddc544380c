// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Args as ClapArgs, Parser, Subcommand};
use cocojson::{
    Error,
    coco::{
        CocoReadOptions, CocoReader, CocoWriter, ScoreRange, complete_dataset, derived_path,
        exclude_images, export_images, remove_empty, remove_missing, select_by_score,
    },
    config::MiningConfig,
    mining::{self, BoxFormat, ErrorCategory, Materializer, Progress, Report},
    store::FsImageStore,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Curation command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Compare predictions against ground truth and collect hard examples:
    /// high-score false positives, low-score misses, poorly localized
    /// matches and low-confidence matches.  Prints a summary and, when an
    /// images directory and an output directory are given, writes raw
    /// copies, visualizations and per-category COCO files.
    ComparePredictions(CompareArgs),
    /// Copy (or draw) the images that have at least one annotation whose
    /// score lies within the given bounds.  Annotations without a score
    /// count as 1.0.
    FilterScore {
        /// COCO JSON file
        json: PathBuf,

        /// Root directory of the source images
        #[clap(long)]
        img_root: PathBuf,

        /// Output directory
        #[clap(long)]
        out_dir: PathBuf,

        /// Lower score bound (inclusive)
        #[clap(long, default_value_t = 0.5)]
        min_score: f64,

        /// Upper score bound (inclusive)
        #[clap(long)]
        max_score: Option<f64>,

        /// Draw the annotations instead of copying the file
        #[clap(long)]
        draw: bool,

        /// Box layout of the bbox field
        #[clap(long, default_value = "xywh")]
        bbox_format: BoxFormat,
    },
    /// Remove images that have no annotations.
    RemoveEmpty {
        /// COCO JSON file
        json: PathBuf,

        /// Output file, defaults to <stem>_noempty.json next to the input
        #[clap(long, short)]
        output: Option<PathBuf>,

        /// Also write the empty images to <stem>_empty.json
        #[clap(long)]
        save_empty: bool,
    },
    /// Remove images whose file is missing or cannot be decoded, together
    /// with their annotations.
    RemoveMissing {
        /// COCO JSON file
        json: PathBuf,

        /// Directory the image file names are relative to
        #[clap(long)]
        image_dir: PathBuf,

        /// Output file, defaults to <stem>_check_existence.json next to the
        /// input
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
    /// Remove images of JSON whose file_name also appears in EXCLUDE,
    /// together with their annotations.
    Exclude {
        /// COCO JSON file to filter
        json: PathBuf,

        /// COCO JSON file listing the images to drop
        exclude: PathBuf,

        /// Output file, defaults to <stem>_excluded.json next to the input
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
    /// Add missing top-level sections and fill missing image, annotation
    /// and category fields with placeholder values.  Ids are kept as is.
    CheckAndComplete {
        /// COCO JSON file
        json: PathBuf,

        /// Output file, defaults to <stem>_completed.json next to the input
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(ClapArgs, PartialEq, Clone, Debug)]
struct CompareArgs {
    /// Ground-truth COCO JSON file
    gt_json: PathBuf,

    /// Prediction COCO JSON file
    pred_json: PathBuf,

    /// Directory the ground-truth file names are relative to
    #[clap(long)]
    images_dir: Option<PathBuf>,

    /// Directory receiving the per-category evidence
    #[clap(long)]
    output_dir: Option<PathBuf>,

    /// Records kept per category before writing evidence, 0 for no cap
    #[clap(long)]
    max_copy_num: Option<usize>,

    /// Only print the analysis
    #[clap(long)]
    no_copy: bool,

    /// Minimum IoU for a prediction to match a ground-truth box
    #[clap(long)]
    iou_threshold: Option<f64>,

    /// IoU below which a match is poorly localized
    #[clap(long)]
    ideal_iou_threshold: Option<f64>,

    /// Score below which a match is low confidence
    #[clap(long)]
    minimum_score_threshold: Option<f64>,

    /// Score at or above which an unmatched prediction is reported
    #[clap(long)]
    false_positive_score_threshold: Option<f64>,

    /// Box layout of the bbox field in both files
    #[clap(long)]
    bbox_format: Option<BoxFormat>,

    /// TrueType font for score labels
    #[clap(long)]
    font: Option<PathBuf>,

    /// Configuration file
    #[clap(long, env = "COCOJSON_CONFIG")]
    config: Option<PathBuf>,

    /// Check both files for dangling image and category references
    #[clap(long)]
    validate: bool,
}

impl CompareArgs {
    /// Merge command-line overrides over the loaded configuration.
    fn apply(&self, mut config: MiningConfig) -> Result<MiningConfig, Error> {
        if let Some(value) = self.iou_threshold {
            config.iou_threshold = value;
        }
        if let Some(value) = self.ideal_iou_threshold {
            config.ideal_iou_threshold = value;
        }
        if let Some(value) = self.minimum_score_threshold {
            config.minimum_score_threshold = value;
        }
        if let Some(value) = self.false_positive_score_threshold {
            config.false_positive_score_threshold = value;
        }
        if let Some(value) = self.max_copy_num {
            config.max_copy_num = value;
        }
        if let Some(value) = self.bbox_format {
            config.bbox_format = value;
        }
        if let Some(value) = &self.font {
            config.font = Some(value.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template(
        "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
    )
    .map(|style| style.progress_chars("█▇▆▅▄▃▂▁  "))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

fn handle_compare_predictions(args: CompareArgs) -> Result<(), Error> {
    for input in [&args.gt_json, &args.pred_json] {
        if !input.is_file() {
            return Err(Error::MissingFile(input.clone()));
        }
    }
    let config = args.apply(MiningConfig::load(args.config.as_deref())?)?;

    let reader = CocoReader::with_options(CocoReadOptions {
        validate: args.validate,
    });
    let gt = reader.read_json(&args.gt_json)?;
    let pred = reader.read_json(&args.pred_json)?;
    info!(
        "Loaded {} ground-truth and {} predicted annotations",
        gt.annotations.len(),
        pred.annotations.len()
    );

    let mut analysis = mining::analyze(&gt, &pred, &config.thresholds(), config.bbox_format)?;
    println!("{}", Report::from_analysis(&analysis, &gt));

    let (images_dir, output_dir) = match (&args.images_dir, &args.output_dir) {
        (Some(images), Some(output)) if !args.no_copy => (images, output),
        _ => {
            info!("Analysis only, no evidence written");
            return Ok(());
        }
    };
    if !images_dir.is_dir() {
        return Err(Error::MissingFile(images_dir.clone()));
    }

    analysis.examples.truncate(config.max_copy_num);

    let store = match &config.font {
        Some(font) => FsImageStore::with_font_file(font)?,
        None => FsImageStore::new(),
    };
    if !store.has_font() {
        warn!("No label font found, pass --font to draw prediction scores");
    }

    let bar = progress_bar();
    bar.set_message("Writing evidence");
    let mut on_progress = |progress: Progress| {
        bar.set_length(progress.total as u64);
        bar.set_position(progress.current as u64);
    };
    let summary = Materializer::new(&store, images_dir, output_dir)
        .with_format(config.bbox_format)
        .materialize(
            &gt,
            &pred,
            &analysis.examples,
            Some(&mut on_progress as &mut dyn FnMut(Progress)),
        )?;
    bar.finish_and_clear();

    for category in ErrorCategory::ALL {
        if let Some(outcome) = summary.get(category) {
            println!(
                "{}: {} images, {} copied, {} visualized",
                category.key(),
                outcome.images,
                outcome.copied,
                outcome.visualized
            );
        }
    }
    println!("Evidence written to {}", output_dir.display());
    Ok(())
}

fn handle_filter_score(
    json: PathBuf,
    img_root: PathBuf,
    out_dir: PathBuf,
    min_score: f64,
    max_score: Option<f64>,
    draw: bool,
    bbox_format: BoxFormat,
) -> Result<(), Error> {
    let range = ScoreRange::new(Some(min_score), max_score)?;
    let dataset = CocoReader::new().read_json(&json)?;
    let selected = select_by_score(&dataset, &range);

    let store = FsImageStore::new();
    let summary = export_images(
        &dataset,
        &selected,
        &img_root,
        &out_dir,
        &store,
        draw.then_some(bbox_format),
    );
    println!(
        "Selected {} images, wrote {} to {}",
        summary.selected,
        summary.written,
        out_dir.display()
    );
    Ok(())
}

fn handle_remove_empty(
    json: PathBuf,
    output: Option<PathBuf>,
    save_empty: bool,
) -> Result<(), Error> {
    let dataset = CocoReader::new().read_json(&json)?;
    let (kept, empty) = remove_empty(&dataset);

    let writer = CocoWriter::new();
    let output = output.unwrap_or_else(|| derived_path(&json, "_noempty"));
    writer.write_json(&kept, &output)?;
    println!(
        "Kept {} of {} images in {}",
        kept.images.len(),
        dataset.images.len(),
        output.display()
    );

    if save_empty {
        let empty_path = derived_path(&json, "_empty");
        writer.write_json(&empty, &empty_path)?;
        println!(
            "Wrote {} empty images to {}",
            empty.images.len(),
            empty_path.display()
        );
    }
    Ok(())
}

fn handle_remove_missing(
    json: PathBuf,
    image_dir: PathBuf,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    if !image_dir.is_dir() {
        return Err(Error::MissingFile(image_dir));
    }
    let dataset = CocoReader::new().read_json(&json)?;

    let store = FsImageStore::without_font();
    let (kept, removed) = remove_missing(&dataset, Path::new(&image_dir), &store);

    let output = output.unwrap_or_else(|| derived_path(&json, "_check_existence"));
    CocoWriter::new().write_json(&kept, &output)?;
    println!(
        "Removed {} images, kept {} in {}",
        removed.len(),
        kept.images.len(),
        output.display()
    );
    Ok(())
}

fn handle_exclude(json: PathBuf, exclude: PathBuf, output: Option<PathBuf>) -> Result<(), Error> {
    let reader = CocoReader::new();
    let dataset = reader.read_json(&json)?;
    let exclusion = reader.read_json(&exclude)?;

    let kept = exclude_images(&dataset, &exclusion);
    let output = output.unwrap_or_else(|| derived_path(&json, "_excluded"));
    CocoWriter::new().write_json(&kept, &output)?;
    println!(
        "Kept {} of {} images in {}",
        kept.images.len(),
        dataset.images.len(),
        output.display()
    );
    Ok(())
}

fn handle_check_and_complete(json: PathBuf, output: Option<PathBuf>) -> Result<(), Error> {
    let document = CocoReader::new().read_value(&json)?;
    let (dataset, report) = complete_dataset(document)?;

    let output = output.unwrap_or_else(|| derived_path(&json, "_completed"));
    CocoWriter::new().write_json(&dataset, &output)?;

    if !report.added_sections.is_empty() {
        println!("Added sections: {}", report.added_sections.join(", "));
    }
    for (name, section) in [
        ("images", report.images),
        ("annotations", report.annotations),
        ("categories", report.categories),
    ] {
        println!(
            "{}: {} filled, {} fixed",
            name, section.filled, section.fixed
        );
    }
    println!("Wrote {}", output.display());
    Ok(())
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.cmd {
        Command::ComparePredictions(compare) => handle_compare_predictions(compare),
        Command::FilterScore {
            json,
            img_root,
            out_dir,
            min_score,
            max_score,
            draw,
            bbox_format,
        } => handle_filter_score(
            json,
            img_root,
            out_dir,
            min_score,
            max_score,
            draw,
            bbox_format,
        ),
        Command::RemoveEmpty {
            json,
            output,
            save_empty,
        } => handle_remove_empty(json, output, save_empty),
        Command::RemoveMissing {
            json,
            image_dir,
            output,
        } => handle_remove_missing(json, image_dir, output),
        Command::Exclude {
            json,
            exclude,
            output,
        } => handle_exclude(json, exclude, output),
        Command::CheckAndComplete { json, output } => handle_check_and_complete(json, output),
    }
}
