mod colors;
mod config;
mod feed;
mod globe;
mod help;
mod logging;
mod settings;
mod terminal;

use clap::Parser;
use config::{GlobeConfig, Overrides};
use settings::Settings;
use std::io;
use std::path::PathBuf;
use terminal::Terminal;

#[derive(Parser)]
#[command(name = "threatglobe")]
#[command(author = "Terminal Threat Map")]
#[command(version = "0.1.0")]
#[command(about = "Rotating globe of live threat-intelligence arcs in the terminal", long_about = None)]
struct Cli {
    /// Equirectangular world map image
    #[arg(long)]
    texture: Option<PathBuf>,

    /// Read records from a saved blacklist JSON file instead of the API
    #[arg(long)]
    feed_file: Option<PathBuf>,

    /// Use generated demo records
    #[arg(long)]
    demo: bool,

    /// Random seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Seconds per full rotation
    #[arg(long)]
    rotation_secs: Option<f32>,

    /// Seconds per pulse cycle
    #[arg(long)]
    pulse_secs: Option<f32>,

    /// Color scheme (0-9)
    #[arg(long)]
    scheme: Option<u8>,

    /// Print one frame to stdout (no interactive display)
    #[arg(short, long)]
    print: bool,

    /// Print mode width in cells
    #[arg(long)]
    width: Option<u16>,

    /// Print mode height in cells
    #[arg(long)]
    height: Option<u16>,
}

impl From<Cli> for Overrides {
    fn from(cli: Cli) -> Self {
        Self {
            texture: cli.texture,
            feed_file: cli.feed_file,
            demo: cli.demo,
            seed: cli.seed,
            fps: cli.fps,
            rotation_secs: cli.rotation_secs,
            pulse_secs: cli.pulse_secs,
            scheme: cli.scheme,
            print: cli.print,
            width: cli.width,
            height: cli.height,
        }
    }
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();

    // Logging is best effort; the globe still runs without a log file
    let _log_guard = match logging::init_logging(&logging::default_log_dir()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("threatglobe: logging disabled: {}", e);
            None
        }
    };

    let settings = Settings::load();
    let config = GlobeConfig::resolve(cli.into(), &settings);
    tracing::info!(
        fps = config.fps,
        scheme = config.scheme,
        seed = config.seed,
        feed = config.feed_kind(),
        "starting threatglobe"
    );

    if config.print {
        return globe::print_frame(&config);
    }

    let mut term = Terminal::new(true)?;
    term.clear_screen()?;
    let result = globe::run(&mut term, &config);
    if let Err(e) = &result {
        tracing::error!(error = %e, "terminal error");
    }
    result
}
