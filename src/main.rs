mod apple_music;
mod config;
mod logging;
mod ports;
mod services;
mod spotify_rs;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};

use crate::{
    config::Config,
    logging::init_tracing,
    ports::console::Console,
    services::{
        apple_music::client::{AppleMusicCredentials, AppleMusicHttpAdapter},
        console::TerminalConsole,
        spotify::{
            auth::{SpotifyApiCredentials, authenticate},
            client::SpotifyHttpAdapter,
        },
        sync::{
            orchestrator::{Confirmation, SyncOrchestrator, SyncSettings},
            types::SyncOutcome,
        },
    },
    spotify_rs::{client::SpotifyClient, token_cache::TokenCache},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use (falls back to environment variables and `.env`)
    #[arg(short, long, global = true, env = "PLAYLIST_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. `info` or `playlist_sync=debug` (default: off)
    #[arg(long, default_value = "off", global = true, env = "LOG_LEVEL")]
    log_level: String,

    /// Export spans to this OTLP/gRPC endpoint
    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replace the Spotify playlist with the tracks of the Apple Music playlist
    Sync {
        /// Show what would be synced without changing the Spotify playlist
        #[arg(long, conflicts_with = "yes")]
        dry_run: bool,

        /// Do not ask for confirmation before updating the Spotify playlist
        #[arg(short, long)]
        yes: bool,

        /// Pause between Apple Music page requests
        #[arg(long, default_value = "200ms")]
        page_delay: humantime::Duration,

        /// Pause between Spotify searches
        #[arg(long, default_value = "100ms")]
        lookup_delay: humantime::Duration,

        /// Do not try to open a browser for the Spotify login
        #[arg(long)]
        no_browser: bool,
    },
    /// Log in to Spotify and cache the token
    Auth {
        /// Do not try to open a browser for the Spotify login
        #[arg(long)]
        no_browser: bool,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    // A missing .env file is fine; configuration may come from a file or the real environment.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let tracer_provider = init_tracing(
        env!("CARGO_PKG_NAME"),
        args.otlp_endpoint.as_deref(),
        &args.log_level,
    )?;

    tracing::debug!("Playlist sync starting");

    let result = run(args).await;

    if let Some(provider) = tracer_provider
        && let Err(error) = provider.shutdown()
    {
        eprintln!("Failed to flush traces: {error}");
    }

    result
}

async fn run(args: Args) -> Result<ExitCode> {
    match args.command {
        Commands::Config(ConfigCommands::CreateDefault) => {
            let path = Config::create_default()?;
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config(ConfigCommands::Path) => {
            match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Auth { no_browser } => {
            let config = load_config(args.config)?;
            let console = TerminalConsole;
            let user = login(&config, &console, !no_browser).await?;
            match TokenCache::for_account(&config.spotify.username) {
                Some(cache) => console.line(&format!(
                    "Logged in to Spotify as {user}. Token cached at {}",
                    cache.path().display()
                )),
                None => console.line(&format!(
                    "Logged in to Spotify as {user}. No cache directory, the token was not saved."
                )),
            }
            tracing::info!(username = %user, "Spotify login complete");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Sync {
            dry_run,
            yes,
            page_delay,
            lookup_delay,
            no_browser,
        } => {
            let config = load_config(args.config)?;
            let console = TerminalConsole;

            let access_token = match login_token(&config, &console, !no_browser).await {
                Ok(token) => token,
                Err(error) => {
                    console.line(&format!(
                        "Could not authenticate with Spotify. Please check your credentials. Error: {error:#}"
                    ));
                    return Ok(ExitCode::FAILURE);
                }
            };

            let destination = SpotifyHttpAdapter::new(SpotifyClient::new(access_token)?);
            let source = AppleMusicHttpAdapter::new(
                AppleMusicCredentials::from_config(&config),
                config.apple_music.storefront.clone(),
            )?;

            let confirmation = if dry_run {
                Confirmation::DryRun
            } else if yes {
                Confirmation::AssumeYes
            } else {
                Confirmation::Prompt
            };

            let settings = SyncSettings {
                source_playlist_id: config.apple_music.playlist_id.clone(),
                destination_playlist_id: config.spotify.playlist_id.clone(),
                page_delay: page_delay.into(),
                lookup_delay: lookup_delay.into(),
                confirmation,
            };

            let outcome = SyncOrchestrator::new(&source, &destination, &console, settings)
                .run()
                .await;

            Ok(match outcome {
                SyncOutcome::Done { .. } | SyncOutcome::DryRun { .. } => ExitCode::SUCCESS,
                SyncOutcome::Aborted(reason) if reason.is_fatal() => ExitCode::FAILURE,
                SyncOutcome::Aborted(_) => ExitCode::SUCCESS,
            })
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    tracing::debug!("Loading configuration");
    Config::load(path.as_deref()).wrap_err("Failed to load playlist-sync config")
}

async fn login_token(config: &Config, console: &TerminalConsole, open_browser: bool) -> Result<String> {
    let credentials = SpotifyApiCredentials::from_config(&config.spotify)?;
    let cache = TokenCache::for_account(&config.spotify.username);
    authenticate(&credentials, cache.as_ref(), console, open_browser).await
}

/// Log in and verify the token by fetching the profile. Returns the Spotify user id.
async fn login(config: &Config, console: &TerminalConsole, open_browser: bool) -> Result<String> {
    let access_token = login_token(config, console, open_browser).await?;
    let user = SpotifyClient::new(access_token)?
        .get_current_user()
        .await
        .wrap_err("Failed to fetch Spotify profile")?;
    Ok(user.id)
}
