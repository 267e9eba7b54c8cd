use std::collections::HashMap;

use base64::{
    Engine,
    alphabet,
    engine::{self, general_purpose},
};
use rand::Rng;
use url::Url;

use crate::spotify_rs::types::{SpotifyAuthResponse, SpotifyTokenResponse};

const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

const CUSTOM_ENGINE: engine::GeneralPurpose =
    engine::GeneralPurpose::new(&alphabet::STANDARD, general_purpose::PAD);

fn generate_random_string(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            const CHARSET: &[u8] =
                b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
            CHARSET[rng.random_range(0..CHARSET.len())] as char
        })
        .collect()
}

/// Generate a random state parameter for CSRF protection
fn generate_state() -> String {
    generate_random_string(16)
}

fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        CUSTOM_ENGINE.encode(format!("{}:{}", client_id, client_secret))
    )
}

/// Build the authorization URL for the authorization code flow.
/// The returned state must come back unchanged on the redirect.
pub fn initiate_oauth(client_id: &str, redirect_uri: &str, scopes: &[&str]) -> SpotifyAuthResponse {
    let state = generate_state();

    let auth_url = format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&state={}&scope={}",
        SPOTIFY_AUTH_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&state),
        urlencoding::encode(&scopes.join(" "))
    );

    SpotifyAuthResponse { auth_url, state }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RedirectError {
    #[error("Not a valid URL: {0}")]
    InvalidUrl(String),
    #[error("Authorization was denied: {0}")]
    Denied(String),
    #[error("Redirect URL has no authorization code")]
    MissingCode,
    #[error("State mismatch, the redirect does not belong to this login")]
    StateMismatch,
}

/// Extract the authorization code from the URL the browser was redirected to.
pub fn parse_redirect(redirected_url: &str, expected_state: &str) -> Result<String, RedirectError> {
    let url = Url::parse(redirected_url.trim())
        .map_err(|_| RedirectError::InvalidUrl(redirected_url.trim().to_string()))?;
    let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        return Err(RedirectError::Denied(error.clone()));
    }
    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(RedirectError::StateMismatch);
    }

    params
        .get("code")
        .filter(|code| !code.is_empty())
        .cloned()
        .ok_or(RedirectError::MissingCode)
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeCodeForTokenError {
    #[error("Invalid code: {reason}")]
    InvalidCode { reason: String },
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response")]
    FailedToParseResponse(reqwest::Error),
}

/// Exchange authorization code for access token
/// https://developer.spotify.com/documentation/web-api/tutorials/code-flow
pub async fn exchange_code_for_token(
    client_id: &str,
    client_secret: &str,
    code: &str,
    // Must equal the redirect URI the flow was started with
    redirect_uri: &str,
) -> Result<SpotifyTokenResponse, ExchangeCodeForTokenError> {
    let client = reqwest::Client::new();

    let mut params = HashMap::new();
    params.insert("grant_type", "authorization_code");
    params.insert("code", code);
    params.insert("redirect_uri", redirect_uri);

    let response = client
        .post(SPOTIFY_TOKEN_URL)
        // x-www-form-urlencoded, as the token endpoint requires
        .form(&params)
        .header("Authorization", basic_auth_header(client_id, client_secret))
        .send()
        .await
        .map_err(ExchangeCodeForTokenError::FailedToSendRequest)?;

    if !response.status().is_success() {
        return Err(ExchangeCodeForTokenError::InvalidCode {
            reason: response
                .text()
                .await
                .unwrap_or("Failed to get error text".to_string()),
        });
    }

    response
        .json()
        .await
        .map_err(ExchangeCodeForTokenError::FailedToParseResponse)
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshTokenError {
    #[error("Invalid refresh token: {reason}")]
    InvalidRefreshToken { reason: String },
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(reqwest::Error),
}

/// Refresh an access token using a refresh token
pub async fn refresh_access_token(
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<SpotifyTokenResponse, RefreshTokenError> {
    let client = reqwest::Client::new();

    let mut params = HashMap::new();
    params.insert("grant_type", "refresh_token");
    params.insert("refresh_token", refresh_token);

    let response = client
        .post(SPOTIFY_TOKEN_URL)
        .form(&params)
        .header("Authorization", basic_auth_header(client_id, client_secret))
        .send()
        .await
        .map_err(RefreshTokenError::FailedToSendRequest)?;

    if !response.status().is_success() {
        return Err(RefreshTokenError::InvalidRefreshToken {
            reason: response
                .text()
                .await
                .unwrap_or("Failed to get error text".to_string()),
        });
    }

    response
        .json()
        .await
        .map_err(RefreshTokenError::FailedToParseResponse)
}
