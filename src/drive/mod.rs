mod auth;
mod client;
mod types;

pub use auth::{authorization_url, load_client_secrets, OAuthProvider, TokenCache};
pub use client::DriveClient;
pub use types::{ClientSecrets, StoredToken, DRIVE_FILE_SCOPE};
