use color_eyre::eyre::{Result, WrapErr};
use tracing::instrument;
use url::Url;

use crate::config::SpotifyConfig;
use crate::ports::console::Console;
use crate::spotify_rs::auth::{
    exchange_code_for_token, initiate_oauth, parse_redirect, refresh_access_token,
};
use crate::spotify_rs::token_cache::{CachedToken, TokenCache};

pub const SPOTIFY_SCOPES: [&str; 2] = ["playlist-modify-public", "playlist-modify-private"];

#[derive(Debug, Clone)]
pub struct SpotifyApiCredentials {
    client_id: String,
    client_secret: String,
    redirect_uri: Url,
}

impl SpotifyApiCredentials {
    pub fn new(client_id: String, client_secret: String, redirect_uri: Url) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    pub fn from_config(config: &SpotifyConfig) -> Result<Self> {
        let redirect_uri = Url::parse(&config.redirect_uri)
            .wrap_err_with(|| format!("Invalid Spotify redirect URI: {}", config.redirect_uri))?;
        Ok(Self::new(
            config.client_id.clone(),
            config.client_secret.clone(),
            redirect_uri,
        ))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

/// Get an access token: from the cache, by refreshing it, or by an interactive login.
///
/// Whatever token is obtained is written back to the cache.
#[instrument(skip_all)]
pub async fn authenticate<C: Console>(
    credentials: &SpotifyApiCredentials,
    cache: Option<&TokenCache>,
    console: &C,
    open_browser: bool,
) -> Result<String> {
    let now = chrono::Utc::now().timestamp();

    let cached = match cache.map(TokenCache::load).transpose() {
        Ok(cached) => cached.flatten(),
        Err(error) => {
            tracing::warn!("Ignoring unreadable token cache: {error:#}");
            None
        }
    };

    if let Some(cached) = cached {
        if !cached.is_expired(now) {
            tracing::debug!("Using cached Spotify token");
            return Ok(cached.access_token);
        }

        if let Some(refresh_token) = cached.refresh_token.as_deref() {
            match refresh_access_token(
                credentials.client_id(),
                credentials.client_secret(),
                refresh_token,
            )
            .await
            {
                Ok(response) => {
                    tracing::debug!("Refreshed Spotify token");
                    let token = CachedToken::from_response(response, now, Some(refresh_token));
                    store(cache, &token);
                    return Ok(token.access_token);
                }
                Err(error) => {
                    tracing::warn!("Token refresh failed, logging in again: {error}");
                }
            }
        }
    }

    let token = interactive_login(credentials, console, open_browser, now).await?;
    store(cache, &token);
    Ok(token.access_token)
}

fn store(cache: Option<&TokenCache>, token: &CachedToken) {
    if let Some(cache) = cache
        && let Err(error) = cache.store(token)
    {
        tracing::warn!("Failed to cache Spotify token: {error:#}");
    }
}

/// Authorization code flow: show the authorize URL, read back the redirect, exchange the code.
async fn interactive_login<C: Console>(
    credentials: &SpotifyApiCredentials,
    console: &C,
    open_browser: bool,
    now: i64,
) -> Result<CachedToken> {
    let redirect_uri = credentials.redirect_uri.as_str();
    let auth = initiate_oauth(credentials.client_id(), redirect_uri, &SPOTIFY_SCOPES);

    console.line("Log in to Spotify by opening this URL in your browser:");
    console.line(&format!("  {}", auth.auth_url));
    if open_browser && let Err(error) = webbrowser::open(&auth.auth_url) {
        tracing::debug!("Could not open a browser: {error}");
    }

    let redirected = console.ask("Paste the URL you were redirected to")?;
    let code = parse_redirect(&redirected, &auth.state)?;

    let response = exchange_code_for_token(
        credentials.client_id(),
        credentials.client_secret(),
        &code,
        redirect_uri,
    )
    .await?;

    Ok(CachedToken::from_response(response, now, None))
}
