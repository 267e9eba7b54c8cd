pub mod auth;
pub mod client;

pub use auth::developer_token_from_file;
pub use client::{APPLE_MUSIC_API_URL, get_playlist_tracks_page};
