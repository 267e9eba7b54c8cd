use std::path::{Path, PathBuf};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Developer tokens are minted for 12 hours; Apple accepts up to six months.
pub const DEVELOPER_TOKEN_LIFETIME_SECS: i64 = 12 * 60 * 60;

/// Claims of an Apple Music developer token.
/// https://developer.apple.com/documentation/applemusicapi/generating-developer-tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct DeveloperTokenClaims {
    /// Team id
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum DeveloperTokenError {
    #[error("Failed to read private key file {path}")]
    ReadKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid ES256 private key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
    #[error("Failed to sign developer token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
}

/// Sign a developer token with a PKCS#8 PEM (`.p8`) private key.
pub fn developer_token(
    private_key_pem: &[u8],
    key_id: &str,
    team_id: &str,
    issued_at: i64,
) -> Result<String, DeveloperTokenError> {
    let key = EncodingKey::from_ec_pem(private_key_pem).map_err(DeveloperTokenError::InvalidKey)?;

    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some(key_id.to_string());

    let claims = DeveloperTokenClaims {
        iss: team_id.to_string(),
        iat: issued_at,
        exp: issued_at + DEVELOPER_TOKEN_LIFETIME_SECS,
    };

    jsonwebtoken::encode(&header, &claims, &key).map_err(DeveloperTokenError::Sign)
}

/// Read the private key from `path` and sign a developer token issued now.
pub fn developer_token_from_file(
    path: &Path,
    key_id: &str,
    team_id: &str,
) -> Result<String, DeveloperTokenError> {
    let pem = std::fs::read(path).map_err(|source| DeveloperTokenError::ReadKey {
        path: path.to_path_buf(),
        source,
    })?;
    developer_token(&pem, key_id, team_id, chrono::Utc::now().timestamp())
}
