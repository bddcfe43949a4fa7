//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::analysis::AnalysisMode;
use crate::pipeline::RunConfig;
use crate::variation::PatternSelector;

/// Extract a design system from a website and generate A/B layout variations
#[derive(Parser, Debug, Clone)]
#[command(name = "design-flux", version)]
pub struct Args {
    /// Website URL to analyze (scheme optional)
    pub url: String,

    /// Pattern to generate: 1 hero-first, 2 feature-grid, 3 content-heavy, 4 conversion-optimized, or all
    #[arg(short, long, default_value = "all", value_parser = parse_selector)]
    pub pattern: PatternSelector,

    /// Directory for every artifact of the run
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Concurrent segment analyses
    #[arg(long, default_value = "4")]
    pub batch_size: usize,

    /// Also capture and analyze a desktop/mobile viewport pair
    #[arg(long)]
    pub include_mobile: bool,

    /// Use one schema prompt for the design-system analysis instead of the multi-stage pass
    #[arg(long)]
    pub single_stage: bool,

    /// Skip image generation (and with it the quality check)
    #[arg(long)]
    pub no_images: bool,

    /// Apply style presets to every variation image
    #[arg(long)]
    pub stylize: bool,

    /// Comma-separated style names (default: the whole catalogue)
    #[arg(long, value_delimiter = ',')]
    pub styles: Vec<String>,

    /// YAML style catalogue replacing the built-in presets
    #[arg(long)]
    pub styles_file: Option<PathBuf>,

    /// Fixed seed for style transfer (default: random per style)
    #[arg(long)]
    pub style_seed: Option<u64>,

    /// Styles applied concurrently per wave
    #[arg(long, default_value = "5")]
    pub style_batch_size: usize,

    /// Pause between style waves, in seconds
    #[arg(long, default_value = "2")]
    pub style_pause: u64,
}

fn parse_selector(value: &str) -> Result<PatternSelector, String> {
    value.parse()
}

impl From<Args> for RunConfig {
    fn from(args: Args) -> Self {
        RunConfig {
            url: args.url,
            selector: args.pattern,
            output_dir: args.output_dir,
            concurrency: args.batch_size.max(1),
            device_mode: if args.single_stage {
                AnalysisMode::SingleStage
            } else {
                AnalysisMode::MultiStage
            },
            include_mobile: args.include_mobile,
            generate_images: !args.no_images,
            stylize: args.stylize,
            styles: args
                .styles
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            styles_file: args.styles_file,
            style_seed: args.style_seed,
            style_batch_size: args.style_batch_size.max(1),
            style_pause: Duration::from_secs(args.style_pause),
        }
    }
}
