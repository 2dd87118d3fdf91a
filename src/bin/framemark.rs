use std::{path::PathBuf, sync::Arc};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framemark::{
    AnnotationDataset, BoxStyle, CommandDetector, FfmpegExtractor, PipelineOptions,
    PipelineState, ProgressCallback, ProgressInfo, RunSummary, VideoFetcher, VideoPipeline,
};
use indicatif::{ProgressBar, ProgressStyle};

const CLI_AFTER_HELP: &str = "Examples:\n  framemark run videos/ --label robot --out dataset --progress\n  framemark run clip.mp4 --label robot --save-frames --box-color red\n  framemark fetch https://www.youtube.com/watch?v=... --out videos\n  framemark inspect dataset/annotations/clip.json --json\n  framemark completions zsh > _framemark";

#[derive(Debug, Parser)]
#[command(
    name = "framemark",
    version,
    about = "Build resumable COCO-style detection datasets from video keyframes",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long)]
    progress: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Annotate one video, or every video in a directory.
    #[command(
        about = "Run the annotation pipeline",
        after_help = "Examples:\n  framemark run videos/ --label robot --out dataset\n  framemark run clip.mp4 --label cat --scene-sensitivity 0.2 --checkpoint-every 25"
    )]
    Run {
        /// A video file, or a directory of video files.
        input: PathBuf,

        /// Target object label to detect.
        #[arg(long)]
        label: String,

        /// Output root for checkpoints, progress, and frames.
        #[arg(long, default_value = "framemark")]
        out: PathBuf,

        /// Detector command: invoked as `<command> <image> <label>`, must
        /// print a JSON array of detections on stdout.
        #[arg(long, default_value = "framemark-detect")]
        detector: String,

        /// Scene-change sensitivity for keyframe extraction (0.0 - 1.0).
        #[arg(long, default_value_t = 0.3)]
        scene_sensitivity: f32,

        /// Checkpoint both stores every N processed frames.
        #[arg(long, default_value_t = 10)]
        checkpoint_every: u64,

        /// Save annotated copies of frames with detections.
        #[arg(long)]
        save_frames: bool,

        /// Bounding-box color (name or #rrggbb).
        #[arg(long, default_value = "red")]
        box_color: String,

        /// Bounding-box stroke width in pixels.
        #[arg(long, default_value_t = 3)]
        box_width: u32,
    },

    /// Download videos with yt-dlp.
    #[command(about = "Download videos")]
    Fetch {
        /// One or more video URLs.
        urls: Vec<String>,

        /// Directory downloads are written into.
        #[arg(long, default_value = "videos")]
        out: PathBuf,
    },

    /// Print a summary of an annotation checkpoint.
    #[command(about = "Inspect an annotation checkpoint")]
    Inspect {
        /// Path to a per-video checkpoint file.
        checkpoint: PathBuf,

        /// Print the raw document as pretty JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Discards progress updates when no bar was requested.
struct QuietProgress;

impl ProgressCallback for QuietProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::hidden();
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for BarProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            if self.bar.length() != Some(total) {
                self.bar.set_length(total);
                self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            }
        }
        self.bar.set_position(info.current);
        if let Some(frame) = info.current_frame {
            self.bar.set_message(format!("frame {frame}"));
        }
    }
}

fn print_summary(summary: &RunSummary) {
    match summary.state {
        PipelineState::Finalized => {
            println!(
                "{} {}",
                "done:".green().bold(),
                format!(
                    "{}: {} keyframe(s), {} processed, {} skipped, {} failed, {} new detection(s)",
                    summary.video_key,
                    summary.keyframes,
                    summary.processed,
                    summary.skipped,
                    summary.failed_frames,
                    summary.new_detections
                )
                .green()
            );
        }
        _ => {
            let reason = summary.error.as_deref().unwrap_or("unknown failure");
            eprintln!(
                "{} {}",
                "skipped:".yellow().bold(),
                format!("{}: {reason}", summary.video_key).yellow()
            );
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.global.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    match cli.command {
        Commands::Run {
            input,
            label,
            out,
            detector,
            scene_sensitivity,
            checkpoint_every,
            save_frames,
            box_color,
            box_width,
        } => {
            let color = BoxStyle::parse_color(&box_color)
                .ok_or(format!("unsupported --box-color: {box_color}"))?;

            let options = PipelineOptions::new(label)
                .with_output_root(out)
                .with_scene_sensitivity(scene_sensitivity)
                .with_checkpoint_interval(checkpoint_every)
                .with_save_frames(save_frames)
                .with_box_style(BoxStyle::new(color, box_width));

            let mut source = FfmpegExtractor::new();
            let mut model = CommandDetector::new(detector);
            let mut pipeline = VideoPipeline::new(&mut source, &mut model, options);
            if cli.global.progress {
                pipeline = pipeline.with_progress(Arc::new(BarProgress::new()?));
            }

            let summaries = if input.is_dir() {
                pipeline.run_batch(&input)?
            } else {
                vec![pipeline.run(&input)?]
            };

            for summary in &summaries {
                print_summary(summary);
            }

            let failed = summaries
                .iter()
                .filter(|summary| summary.state != PipelineState::Finalized)
                .count();
            if failed > 0 {
                return Err(format!("{failed} video(s) failed").into());
            }
        }
        Commands::Fetch { urls, out } => {
            if urls.is_empty() {
                return Err("provide at least one URL".into());
            }
            let callback: Arc<dyn ProgressCallback> = if cli.global.progress {
                Arc::new(BarProgress::new()?)
            } else {
                Arc::new(QuietProgress)
            };
            VideoFetcher::new().fetch_all(&urls, &out, callback)?;
            println!(
                "{} {} video(s) into {}",
                "fetched".green().bold(),
                urls.len(),
                out.display()
            );
        }
        Commands::Inspect { checkpoint, json } => {
            let contents = std::fs::read_to_string(&checkpoint)?;
            let dataset: AnnotationDataset = serde_json::from_str(&contents)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&dataset)?);
            } else {
                println!("Description: {}", dataset.metadata.description);
                println!("Created: {}", dataset.metadata.created_at);
                println!("Category: {}", dataset.metadata.category_name);
                println!("Frames with detections: {}", dataset.images.len());
                println!("Detections: {}", dataset.annotations.len());
                println!("Next annotation id: {}", dataset.next_id());
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framemark", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
