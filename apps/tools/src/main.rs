use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use shared::domain::TiePolicy;
use storage::{normalize_database_url, open_backend, BackendKind, ScoreStore};

#[derive(Parser, Debug)]
#[command(name = "simon-records", about = "Inspect and edit stored Simon records")]
struct Cli {
    #[arg(long, default_value_t = BackendKind::Sqlite)]
    backend: BackendKind,
    /// Database url for sqlite, file path for preferences. Defaults to
    /// where the game keeps them.
    #[arg(long)]
    location: Option<String>,
    #[arg(long, default_value = "strict")]
    tie_policy: TiePolicy,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn location(&self) -> String {
        let raw = self
            .location
            .as_deref()
            .unwrap_or_else(|| self.backend.default_location());
        match self.backend {
            BackendKind::Sqlite => normalize_database_url(raw),
            _ => raw.to_string(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    Best,
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    Save {
        score: u32,
        #[arg(long)]
        player: Option<String>,
    },
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    if cli.backend == BackendKind::Memory {
        bail!("the memory backend keeps nothing between runs");
    }
    let location = cli.location();
    let backend = open_backend(cli.backend, &location, None).await?;
    let store = ScoreStore::open(backend, cli.tie_policy).await;

    match cli.command {
        Command::Best => match store.get_best().await {
            Some(record) => println!("{} by {}", record.display_text(), record.player_or_default()),
            None => println!("no record"),
        },
        Command::List { limit } => {
            for (rank, record) in store.history(limit).await.iter().enumerate() {
                println!(
                    "{:>3}. {:>4}  {}  {}",
                    rank + 1,
                    record.score,
                    record.player_or_default(),
                    record.display_text()
                );
            }
        }
        Command::Save { score, player } => {
            if store.try_save_as(score, player.as_deref()).await {
                println!("saved record {score}");
            } else {
                println!("{score} does not beat the current record; nothing saved");
            }
        }
        Command::Clear => {
            if !store.clear().await {
                bail!("failed to clear records at '{location}'");
            }
            println!("records cleared");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use storage::{DEFAULT_DATABASE_URL, DEFAULT_PREFERENCES_PATH};

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("simon-records").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn location_defaults_follow_the_backend() {
        assert_eq!(parse(&["best"]).location(), DEFAULT_DATABASE_URL);
        assert_eq!(
            parse(&["--backend", "preferences", "best"]).location(),
            DEFAULT_PREFERENCES_PATH
        );
    }

    #[test]
    fn explicit_location_is_kept_per_backend() {
        assert_eq!(
            parse(&["--location", "./scores.db", "list"]).location(),
            "sqlite://./scores.db"
        );
        assert_eq!(
            parse(&["--backend", "prefs", "--location", "./p.json", "clear"]).location(),
            "./p.json"
        );
    }
}
