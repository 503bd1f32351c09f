use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flowdesc")]
#[command(
    version,
    about = "flowdesc - Describe flowgraph images in plain language",
    long_about = "flowdesc\n\nModes:\n- describe: OCR the image, check it is readable, then refine the text through Clean -> Understand -> Describe model stages (or one compressed call with --fast).\n- vision: send an image URL or file straight to a multimodal model.\n- check-url: report whether a remote image URL can be fetched.\n- ocr: run text detection only and show what the model would receive.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose (debug) logging on stderr")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) for model endpoint, generation, stage templates, compression and timeouts; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// OCR an image and describe the flowgraph it shows
    Describe {
        #[arg(long, help = "Local image file (png, jpg, jpeg, webp, gif, bmp, tiff)")]
        image: PathBuf,

        #[arg(long, help = "Single compressed model call instead of three refinement stages")]
        fast: bool,

        #[arg(long, help = "Include every intermediate stage output")]
        show_stages: bool,

        #[arg(
            long,
            value_name = "P",
            help = "Share of prompt tokens kept by --fast, in (0, 1] (default from config: 0.1)"
        )]
        compression_ratio: Option<f32>,

        #[arg(long, help = "Write <stem>_real/_preprocessed/_annotated.png here")]
        artifacts_dir: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (default: stdout)")]
        output: Option<PathBuf>,
    },

    /// Describe an image with a multimodal model, skipping OCR
    Vision {
        #[arg(long, help = "Image URL (probed first) or local image file")]
        input: String,

        #[arg(
            long,
            default_value = "10",
            value_name = "SECS",
            help = "Timeout for the URL accessibility probe"
        )]
        probe_timeout: u64,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (default: stdout)")]
        output: Option<PathBuf>,
    },

    /// Check whether a remote image URL is reachable
    CheckUrl {
        #[arg(long, help = "Image URL to probe")]
        url: String,

        #[arg(
            long,
            default_value = "10",
            value_name = "SECS",
            help = "Timeout for the probe"
        )]
        probe_timeout: u64,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (default: stdout)")]
        output: Option<PathBuf>,
    },

    /// Run text detection only; never calls a model
    Ocr {
        #[arg(long, help = "Local image file")]
        image: PathBuf,

        #[arg(long, help = "Write <stem>_real/_preprocessed/_annotated.png here")]
        artifacts_dir: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (default: stdout)")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
