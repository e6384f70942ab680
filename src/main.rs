use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use url::Url;

use podhub::{
    fetch_feed, CachingRepository, Collection, DemoSource, LibraryStore, PlaybackEngine,
    PodcastIndexSource, ProviderSelection, RemoteCommand, RemoteCommandBridge, ReqwestClient,
    Secrets, Show, ShowDataSource, ShowRepository, SimulatedBackend, SqliteCacheStore,
    SqliteLibraryStore,
};

/// Browse, collect and play podcasts from the terminal
#[derive(Parser, Debug)]
#[command(name = "podhub")]
#[command(about = "Browse, collect and play podcasts from the terminal")]
#[command(version)]
struct Args {
    /// Directory for the cache and library databases
    #[arg(long, default_value = "podhub-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List trending shows
    Trending {
        /// Page to fetch (1-based)
        #[arg(short, long, default_value = "1")]
        page: u32,
    },

    /// Search shows by free text
    Search {
        query: String,

        /// Page to fetch (1-based)
        #[arg(short, long, default_value = "1")]
        page: u32,
    },

    /// Show one podcast with its latest episodes
    Show { id: String },

    /// Fetch and summarize an RSS feed directly
    Feed { url: String },

    /// Manage the saved/favorited/downloaded collections
    Library {
        #[command(subcommand)]
        action: LibraryAction,
    },

    /// Play an episode through the simulated player
    Play {
        /// Show id
        id: String,

        /// Episode index, newest first
        #[arg(short, long, default_value = "0")]
        episode: usize,

        /// How long to let playback run before stopping
        #[arg(short, long, default_value = "5")]
        seconds: u64,
    },
}

#[derive(Subcommand, Debug)]
enum LibraryAction {
    /// Add a show to the saved collection
    Save { id: String },
    /// Remove a show from the saved collection
    Unsave { id: String },
    /// Add a show to the favorited collection
    Favorite { id: String },
    /// Remove a show from the favorited collection
    Unfavorite { id: String },
    /// Add a show to the downloaded collection
    Download { id: String },
    /// Remove a show from the downloaded collection
    Undownload { id: String },
    /// List one collection, newest-added first
    List {
        #[arg(value_enum, default_value = "saved")]
        collection: CollectionArg,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CollectionArg {
    Saved,
    Favorited,
    Downloaded,
}

impl From<CollectionArg> for Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Saved => Collection::Saved,
            CollectionArg::Favorited => Collection::Favorited,
            CollectionArg::Downloaded => Collection::Downloaded,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    std::fs::create_dir_all(&args.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            args.data_dir.display()
        )
    })?;

    let secrets = Secrets::from_env();
    let source: Box<dyn ShowDataSource> = match ProviderSelection::from_secrets(&secrets) {
        ProviderSelection::PodcastIndex(credentials) => {
            Box::new(PodcastIndexSource::new(ReqwestClient::new(), credentials))
        }
        ProviderSelection::Demo => {
            Box::new(DemoSource::bundled().context("Failed to load the bundled demo catalog")?)
        }
    };

    let cache = SqliteCacheStore::open(&args.data_dir.join("cache.db"))
        .context("Failed to open the cache database")?;
    let library = SqliteLibraryStore::open(&args.data_dir.join("library.db"))
        .context("Failed to open the library database")?;
    let repo = CachingRepository::new(source, cache);

    match args.command {
        Command::Trending { page } => {
            let shows = repo.trending(page).await?;
            print_shows(&shows);
        }

        Command::Search { query, page } => {
            let shows = repo.search(&query, page).await?;
            if shows.is_empty() {
                println!("{}", "No shows matched.".dimmed());
            } else {
                print_shows(&shows);
            }
        }

        Command::Show { id } => {
            let show = repo.show_detail(&id).await?;
            print_detail(&show);
        }

        Command::Feed { url } => {
            let url = Url::parse(&url).context("Invalid feed URL")?;
            let client = ReqwestClient::new();
            let show = fetch_feed(&client, &url)
                .await
                .context("Failed to fetch feed")?;
            print_detail(&show);
        }

        Command::Library { action } => run_library(&repo, &library, action).await?,

        Command::Play {
            id,
            episode,
            seconds,
        } => run_play(&repo, &id, episode, seconds).await?,
    }

    Ok(())
}

async fn run_library(
    repo: &impl ShowRepository,
    library: &impl LibraryStore,
    action: LibraryAction,
) -> Result<()> {
    let (collection, change) = match action {
        LibraryAction::Save { id } => (Collection::Saved, Change::Add(id)),
        LibraryAction::Unsave { id } => (Collection::Saved, Change::Remove(id)),
        LibraryAction::Favorite { id } => (Collection::Favorited, Change::Add(id)),
        LibraryAction::Unfavorite { id } => (Collection::Favorited, Change::Remove(id)),
        LibraryAction::Download { id } => (Collection::Downloaded, Change::Add(id)),
        LibraryAction::Undownload { id } => (Collection::Downloaded, Change::Remove(id)),
        LibraryAction::List { collection } => {
            let collection = Collection::from(collection);
            let entries = library.list(collection)?;
            if entries.is_empty() {
                println!("{}", format!("No {} shows.", collection.label()).dimmed());
            }
            for (index, entry) in entries.iter().enumerate() {
                println!(
                    "{:>3}. {} {} {}",
                    index + 1,
                    entry.title.bold(),
                    "by".dimmed(),
                    entry.publisher.cyan()
                );
                println!(
                    "     {} {}",
                    entry.show_id.dimmed(),
                    format!("added {}", entry.added_at.format("%Y-%m-%d")).dimmed()
                );
            }
            return Ok(());
        }
    };

    match change {
        Change::Add(id) => {
            // Snapshot the full show so the entry survives offline
            let show = repo.show_detail(&id).await?;
            library.add(collection, &show)?;
            println!(
                "{} {} {} {}",
                "Added".green().bold(),
                show.title.bold(),
                "to".dimmed(),
                collection.label().cyan()
            );
        }
        Change::Remove(id) => {
            library.remove(collection, &id)?;
            println!(
                "{} {} {} {}",
                "Removed".yellow().bold(),
                id.bold(),
                "from".dimmed(),
                collection.label().cyan()
            );
        }
    }

    Ok(())
}

enum Change {
    Add(String),
    Remove(String),
}

async fn run_play(
    repo: &impl ShowRepository,
    id: &str,
    episode_index: usize,
    seconds: u64,
) -> Result<()> {
    let show = repo.show_detail(id).await?;
    let episode = show
        .latest_episodes
        .get(episode_index)
        .with_context(|| format!("Show has no episode at index {episode_index}"))?
        .clone();
    let audio = episode
        .audio_url
        .clone()
        .context("Episode has no audio URL")?;

    println!(
        "{} {} {} {}",
        "Playing".green().bold(),
        episode.title.bold(),
        "from".dimmed(),
        show.title.cyan()
    );

    let duration = if episode.duration > 0 {
        episode.duration as f64
    } else {
        3600.0
    };
    let engine = Arc::new(PlaybackEngine::new(SimulatedBackend::with_duration(
        duration,
    )));
    let bridge = RemoteCommandBridge::new(Arc::clone(&engine));
    bridge.set_metadata(
        Some(episode.title.clone()),
        Some(show.title.clone()),
        show.image_url.clone(),
    );

    // Re-selecting the current episode must not restart it
    if engine.current_url().as_ref() != Some(&audio) {
        engine.play(&audio);
    }

    engine.add_periodic_observer(Duration::from_secs(1), |position| {
        println!("  {} {position:.0}s", "position".dimmed());
    });

    tokio::time::sleep(Duration::from_secs(seconds)).await;

    bridge.handle(RemoteCommand::SkipForward);
    let info = bridge.now_playing();
    if let (Some(elapsed), Some(total)) = (info.elapsed, info.duration) {
        println!(
            "{} {}",
            "Stopped at".bold(),
            format!(
                "{} / {}",
                format_position(elapsed),
                format_position(total)
            )
            .cyan()
        );
    }

    engine.remove_periodic_observer();
    engine.stop();

    Ok(())
}

fn print_shows(shows: &[Show]) {
    for (index, show) in shows.iter().enumerate() {
        println!(
            "{:>3}. {} {} {}",
            index + 1,
            show.title.bold(),
            "by".dimmed(),
            show.publisher.cyan()
        );
        println!("     {}", show.id.dimmed());
    }
}

fn print_detail(show: &Show) {
    println!(
        "{} {} {}",
        show.title.bold().magenta(),
        "by".dimmed(),
        show.publisher.cyan()
    );
    if !show.genres.is_empty() {
        println!("{}", show.genres.join(", ").dimmed());
    }
    if !show.description.is_empty() {
        println!("{}", show.description);
    }
    println!(
        "{}",
        format!("{} episodes total", show.total_episodes).dimmed()
    );

    for episode in &show.latest_episodes {
        let date = episode
            .publish_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown date".to_string());
        println!(
            "  {} {} {}",
            date.dimmed(),
            episode.title.bold(),
            format_position(episode.duration as f64).cyan()
        );
    }
}

fn format_position(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
