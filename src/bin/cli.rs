use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use playlist_reorder as lib;
use lib::api::spotify::SpotifyProvider;
use lib::config::Config;
use lib::service::PlaylistService;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "playlist-reorder", version, about)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct TokenArg {
    /// Bearer access token for the streaming service
    #[arg(long, env = "PLAYLIST_REORDER_TOKEN", hide_env_values = true)]
    token: String,
}

#[derive(clap::Args)]
struct SortArgs {
    /// Playlist id to reorder
    #[arg(long)]
    playlist: String,

    /// Sort key: date_added, release_date, name, artist_name, album_name, duration_ms, popularity
    #[arg(long = "by")]
    sort_key: String,

    /// Sort order: asc or desc
    #[arg(long, default_value = "asc")]
    order: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List playlists the token's owner can rewrite
    Playlists {
        #[command(flatten)]
        auth: TokenArg,
    },
    /// Sort a playlist and write the new order back
    Reorder {
        #[command(flatten)]
        auth: TokenArg,
        #[command(flatten)]
        sort: SortArgs,
    },
    /// Print the order a reorder would produce without writing it
    Preview {
        #[command(flatten)]
        auth: TokenArg,
        #[command(flatten)]
        sort: SortArgs,
    },
    /// Validate config file and exit
    ConfigValidate,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let (cfg, cfg_path) = match Config::resolve(cli.config.as_deref()) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Config validation failed: {:#}", e);
            return Ok(ExitCode::from(2));
        }
    };

    if let Commands::ConfigValidate = cli.command {
        match &cfg_path {
            Some(p) => println!("OK ({})", p.display()),
            None => println!("OK (defaults)"),
        }
        return Ok(ExitCode::SUCCESS);
    }

    // Logs go to stdout and to a daily-rotated file in cfg.log_dir.
    let _ = LogTracer::init();
    std::fs::create_dir_all(&cfg.log_dir)
        .with_context(|| format!("creating log dir {}", cfg.log_dir.display()))?;
    let file_appender: RollingFileAppender = tracing_appender::rolling::daily(&cfg.log_dir, "playlist-reorder.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stderr));
    tracing_subscriber_global::set_global_default(subscriber).context("installing tracing subscriber")?;

    let provider = SpotifyProvider::new(cfg.api_base.clone(), cfg.request_timeout())
        .context("building HTTP client")?;
    let service = PlaylistService::new(Arc::new(provider), cfg.limits());

    let outcome = match cli.command {
        Commands::Playlists { auth } => service.editable_playlists(&auth.token).await.map(|playlists| {
            for p in &playlists {
                let owner = p.owner.display_name.as_deref().unwrap_or(&p.owner.id);
                println!(
                    "{}\t{}\t{} tracks\t{}{}",
                    p.id,
                    p.name,
                    p.track_summary.total,
                    owner,
                    if p.collaborative { " (collaborative)" } else { "" }
                );
            }
        }),
        Commands::Reorder { auth, sort } => service
            .reorder_playlist(&auth.token, &sort.playlist, &sort.sort_key, &sort.order)
            .await
            .map(|out| {
                println!("Playlist reordered successfully.");
                println!("items:    {}", out.item_count);
                println!("snapshot: {}", out.version_token);
            }),
        Commands::Preview { auth, sort } => service
            .preview_order(&auth.token, &sort.playlist, &sort.sort_key, &sort.order)
            .await
            .map(|items| {
                for (n, item) in items.iter().enumerate() {
                    let artist = item.track.artists.first().map(|a| a.name.as_str()).unwrap_or("");
                    println!(
                        "{:>4}. {} - {} [{}]",
                        n + 1,
                        artist,
                        item.track.name,
                        item.track.album.release_date.as_deref().unwrap_or("-")
                    );
                }
            }),
        Commands::ConfigValidate => Ok(()),
    };

    if let Err(e) = outcome {
        tracing::error!("request failed: {}", e);
        eprintln!("Error ({}): {}", e.status_code(), e);
        if let Some(committed) = e.committed_items() {
            eprintln!("{} items were already written; the playlist is partially reordered.", committed);
        }
        // Flush the file writer before exiting.
        drop(guard);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
