use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";
pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed instead of reused.
const EXPIRY_SKEW_SECS: i64 = 60;

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// `client_secrets.json` as downloaded from the Google Cloud console.
#[derive(Debug, Deserialize)]
pub(crate) struct ClientSecretsFile {
    pub installed: Option<ClientSecrets>,
    pub web: Option<ClientSecrets>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Credential persisted between runs. Carries the client identity so a
/// refresh works even without the secrets file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl StoredToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - Duration::seconds(EXPIRY_SKEW_SECS) > now,
            None => true,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Applies a token endpoint response, keeping the old refresh token when
    /// the server does not rotate it.
    pub(crate) fn updated_with(&self, response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or_else(|| self.refresh_token.clone()),
            expires_at: response.expires_in.map(|secs| now + Duration::seconds(secs)),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            token_uri: self.token_uri.clone(),
        }
    }

    pub(crate) fn from_response(
        secrets: &ClientSecrets,
        response: TokenResponse,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: response.expires_in.map(|secs| now + Duration::seconds(secs)),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            token_uri: secrets.token_uri.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DriveFile {
    pub id: String,
    pub web_view_link: Option<String>,
}

impl DriveFile {
    pub fn link(&self) -> String {
        self.web_view_link
            .clone()
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", self.id))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FileMetadata<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct Permission {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub role: &'static str,
}

impl Permission {
    pub fn anyone_reader() -> Self {
        Self {
            kind: "anyone",
            role: "reader",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: Option<DateTime<Utc>>) -> StoredToken {
        StoredToken {
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            expires_at,
            client_id: "id".into(),
            client_secret: "secret".into(),
            token_uri: DEFAULT_TOKEN_URI.into(),
        }
    }

    #[test]
    fn expiry_honours_skew() {
        let now = Utc::now();
        assert!(token(None).is_valid_at(now));
        assert!(token(Some(now + Duration::minutes(10))).is_valid_at(now));
        assert!(!token(Some(now + Duration::seconds(30))).is_valid_at(now));
        assert!(!token(Some(now - Duration::minutes(1))).is_valid_at(now));
    }

    #[test]
    fn refresh_keeps_previous_refresh_token() {
        let now = Utc::now();
        let refreshed = token(None).updated_with(
            TokenResponse {
                access_token: "b".into(),
                expires_in: Some(3600),
                refresh_token: None,
            },
            now,
        );
        assert_eq!(refreshed.access_token, "b");
        assert_eq!(refreshed.refresh_token.as_deref(), Some("r"));
        assert_eq!(refreshed.expires_at, Some(now + Duration::seconds(3600)));
    }

    #[test]
    fn installed_secrets_parse_with_defaults() {
        let file: ClientSecretsFile = serde_json::from_str(
            r#"{ "installed": { "client_id": "cid", "client_secret": "cs" } }"#,
        )
        .unwrap();
        let secrets = file.installed.unwrap();
        assert_eq!(secrets.client_id, "cid");
        assert_eq!(secrets.token_uri, DEFAULT_TOKEN_URI);
        assert_eq!(secrets.auth_uri, DEFAULT_AUTH_URI);
    }

    #[test]
    fn permission_serializes_type_field() {
        let json = serde_json::to_string(&Permission::anyone_reader()).unwrap();
        assert_eq!(json, r#"{"type":"anyone","role":"reader"}"#);
    }

    #[test]
    fn link_falls_back_to_view_url() {
        let file = DriveFile {
            id: "abc".into(),
            web_view_link: None,
        };
        assert_eq!(file.link(), "https://drive.google.com/file/d/abc/view");
    }
}
