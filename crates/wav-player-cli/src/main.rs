//! `wavplay`: play a wav file through the sound service and wait for it to finish.
//!
//! Ctrl-C stops the playback before exiting.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::select;
use tracing_subscriber::EnvFilter;
use wav_player::{OnComplete, PlayerConfig, StreamInfo, WavPlayer};

fn main() -> Result<()> {
    let args = cli::Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,wav_player=info")
        }))
        .init();

    let mut config = match &args.config {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::default(),
    };
    if let Some(socket) = &args.socket {
        config.socket_path = socket.clone();
    }
    tracing::info!(socket = %config.socket_path.display(), "sound service");

    let (interrupt_tx, interrupt_rx) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })
    .context("install Ctrl-C handler")?;

    let player = WavPlayer::new(config);
    let stream = StreamInfo::new(args.stream_type.clone(), args.stream_index);
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);

    let id = player
        .start_loop(&args.file, &stream, args.iterate, Some(OnComplete::notify(done_tx)))
        .with_context(|| format!("play {}", args.file.display()))?;
    tracing::info!(session = %id, file = %args.file.display(), iterate = args.iterate, "playing");

    select! {
        recv(done_rx) -> done => match done {
            Ok(done) => tracing::info!(session = %done.session, "complete"),
            Err(_) => tracing::warn!(session = %id, "session ended without completion"),
        },
        recv(interrupt_rx) -> _ => {
            tracing::info!(session = %id, "interrupted, stopping");
            player.stop(id).with_context(|| format!("stop session {id}"))?;
        },
    }
    Ok(())
}
