use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_FILE: &str = "/usr/share/sounds/alsa/Front_Center.wav";

#[derive(Parser, Debug)]
#[command(name = "wavplay", version)]
pub struct Args {
    /// TOML client configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Sound service socket (overrides the config file)
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// File to play
    #[arg(short, long, default_value = DEFAULT_FILE)]
    pub file: PathBuf,

    /// How many times to play the file
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub iterate: u32,

    /// Stream type to play on
    #[arg(long, default_value = "media")]
    pub stream_type: String,

    /// Stream index assigned by the sound policy
    #[arg(long, default_value_t = 0)]
    pub stream_index: i32,
}
