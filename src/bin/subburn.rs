use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use subburn::{
    burn_captions, caption_file_name, format_timecode, load_caption_track, subtitled_file_name,
    ExportConfig, ExportState,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Burn SRT captions into MP4 video", long_about = None)]
struct Args {
    /// Log debug output from every stage
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render captions onto a video in one real-time pass
    Burn {
        video: PathBuf,
        captions: PathBuf,

        /// Output file, defaults to <stem>_subtitled.mp4 next to the video
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// TOML export settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// TTF/OTF font for the caption text
        #[arg(long)]
        font: Option<PathBuf>,

        /// Video bitrate ceiling in bits per second
        #[arg(long)]
        bitrate: Option<u32>,
    },
    /// Inspect a caption file and optionally save it under the video's name
    Captions {
        captions: PathBuf,

        /// Show the caption active at this many seconds
        #[arg(long)]
        at: Option<f64>,

        /// Save the raw caption text as <stem>.srt beside this video
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ");
    pb.set_style(style);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

struct BarObserver(ProgressBar);

impl subburn::ExportObserver for BarObserver {
    fn on_progress(&mut self, percent: u8) {
        self.0.set_position(percent as u64);
    }

    fn on_state(&mut self, state: ExportState) {
        self.0.set_message(format!("{:?}", state).to_lowercase());
    }
}

async fn burn(
    video: &Path,
    captions: &Path,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
    font: Option<PathBuf>,
    bitrate: Option<u32>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => ExportConfig::load(&path)?,
        None => ExportConfig::default(),
    };
    if let Some(font) = font {
        config.font_path = Some(font);
    }
    if let Some(bitrate) = bitrate {
        config.video_bitrate_bps = bitrate;
    }
    config.validate()?;

    let track = load_caption_track(captions)
        .with_context(|| format!("Failed to read {}", captions.display()))?;
    if track.is_empty() {
        bail!("{} contains no usable captions", captions.display());
    }

    let mut observer = BarObserver(progress_bar());
    let result = burn_captions(video, track, config, &mut observer).await;
    let artifact = match result {
        Ok(artifact) => {
            observer.0.finish_with_message("done");
            artifact
        }
        Err(e) => {
            observer.0.abandon_with_message("failed");
            return Err(e).context(format!("Export of {} failed", video.display()));
        }
    };

    let output = output.unwrap_or_else(|| {
        video.with_file_name(subtitled_file_name(video, &artifact.format))
    });
    std::fs::write(&output, &artifact.bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Wrote {} ({} bytes, {} frames, {:.2}s, {})",
        output.display(),
        artifact.bytes.len(),
        artifact.frame_count,
        artifact.duration,
        artifact.format.mime()
    );
    Ok(())
}

fn captions(path: &Path, at: Option<f64>, save: Option<PathBuf>) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let track = subburn::parse_caption_track(&text);

    for entry in track.iter() {
        println!(
            "{:>4}  {} --> {}  {}",
            entry.id,
            format_timecode(entry.start_time),
            format_timecode(entry.end_time),
            entry.text.replace('\n', " / ")
        );
    }
    println!("{} entries", track.len());

    if let Some(t) = at {
        match track.active_entry(t) {
            Some(entry) => println!("Active at {}: [{}] {}", t, entry.id, entry.text),
            None => println!("Nothing active at {}", t),
        }
    }

    if let Some(video) = save {
        // Saved verbatim, not re-serialized
        let target = video.with_file_name(caption_file_name(&video));
        std::fs::write(&target, &text)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        println!("Saved {}", target.display());
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Burn {
            video,
            captions: caption_path,
            output,
            config,
            font,
            bitrate,
        } => burn(&video, &caption_path, output, config, font, bitrate).await,
        Command::Captions { captions: path, at, save } => captions(&path, at, save),
    }
}
