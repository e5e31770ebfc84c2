use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use game_core::{spawn_cue_forwarder, CuePlayer, GameEngine, SilentCuePlayer};
use shared::domain::TiePolicy;
use storage::{open_backend, BackendKind, MemoryScoreBackend, ScoreBackend, ScoreStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod input;
mod render;
mod sound;

use config::{load_settings, Settings, DEFAULT_CONFIG_PATH};
use input::Input;
use render::{record_text, render_events};
use sound::TerminalCuePlayer;

#[derive(Parser, Debug)]
#[command(name = "simon", about = "Simon Says in the terminal")]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[arg(long)]
    backend: Option<BackendKind>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    player: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    tie_policy: Option<TiePolicy>,
    /// Do not print cue notes.
    #[arg(long)]
    silent: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(backend) = self.backend {
            settings.backend = backend;
        }
        if let Some(url) = &self.database_url {
            settings.database_url = url.clone();
        }
        if self.player.is_some() {
            settings.player_name = self.player.clone();
        }
        if self.seed.is_some() {
            settings.seed = self.seed;
        }
        if let Some(policy) = self.tie_policy {
            settings.tie_policy = policy;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = load_settings(&args.config).map_err(|error| {
        error!(config = %args.config.display(), %error, "failed to load settings");
        error
    })?;
    args.apply(&mut settings);

    let location = settings.store_location();
    let backend: Arc<dyn ScoreBackend> =
        match open_backend(settings.backend, &location, settings.history_limit).await {
            Ok(backend) => backend,
            Err(error) => {
                warn!(
                    backend = %settings.backend,
                    %location,
                    error = %format!("{error:#}"),
                    "score store unavailable; records will not survive this session"
                );
                Arc::new(MemoryScoreBackend::new())
            }
        };
    let store = Arc::new(ScoreStore::open(backend, settings.tie_policy).await);
    info!(backend = %settings.backend, policy = ?settings.tie_policy, "score store ready");

    let game = GameEngine::spawn(settings.engine_config(), store.clone()).await;
    let cues: Arc<dyn CuePlayer> = if args.silent {
        Arc::new(SilentCuePlayer)
    } else {
        Arc::new(TerminalCuePlayer)
    };
    let forwarder = spawn_cue_forwarder(game.subscribe_events(), cues);
    let board = tokio::spawn(render_events(game.subscribe_events()));
    let mut records = store.observe();
    let record_line = tokio::spawn(async move {
        while let Some(best) = records.next().await {
            println!("{}", record_text(best.as_ref()));
        }
    });

    println!("Commands: s/start, r/restart, q/quit; press with 0-3 or red/green/blue/yellow");
    println!("PRESS START (s)");

    let turn = game.watch_snapshot();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Input>() {
            Ok(Input::Quit) => break,
            Ok(Input::Start) => game.start()?,
            Ok(Input::Restart) => game.restart()?,
            Ok(Input::Press(color)) => {
                if turn.borrow().phase.accepts_input() {
                    game.submit_input(color)?;
                } else {
                    println!("wait for your turn");
                }
            }
            Err(error) => println!("{error}"),
        }
    }

    game.shutdown().await?;
    record_line.abort();
    if let Err(error) = board.await {
        warn!(%error, "board task ended abnormally");
    }
    if let Err(error) = forwarder.await {
        warn!(%error, "cue task ended abnormally");
    }
    Ok(())
}
