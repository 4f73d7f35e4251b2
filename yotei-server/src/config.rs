//! Environment configuration.

use std::path::PathBuf;

use yotei_core::{YoteiError, YoteiResult};
use yotei_google::OAuthConfig;

const DEFAULT_PORT: u16 = 4096;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    pub google_client_id: String,
    pub google_client_secret: String,
    /// Secret the session tokens are signed with.
    pub session_secret: String,
    /// Override of the OAuth token endpoint (tests point this at a mock).
    pub token_url: Option<String>,
    /// Override of the calendar API base URL (tests point this at a mock).
    pub calendar_api_url: Option<String>,
}

impl ServerConfig {
    /// Read configuration from the environment. A `.env` file is honored
    /// when present.
    pub fn from_env() -> YoteiResult<Self> {
        dotenvy::dotenv().ok();

        let port = match std::env::var("YOTEI_PORT") {
            Ok(value) => value
                .parse()
                .map_err(|_| YoteiError::Config(format!("invalid YOTEI_PORT: {value}")))?,
            Err(_) => DEFAULT_PORT,
        };

        let data_dir = match std::env::var("YOTEI_DATA_DIR") {
            Ok(value) => PathBuf::from(value),
            Err(_) => dirs::data_dir()
                .map(|dir| dir.join("yotei"))
                .ok_or_else(|| {
                    YoteiError::Config("no data directory; set YOTEI_DATA_DIR".to_string())
                })?,
        };

        Ok(ServerConfig {
            port,
            data_dir,
            google_client_id: require("GOOGLE_CLIENT_ID")?,
            google_client_secret: require("GOOGLE_CLIENT_SECRET")?,
            session_secret: require("SESSION_SECRET")?,
            token_url: std::env::var("YOTEI_TOKEN_URL").ok(),
            calendar_api_url: std::env::var("YOTEI_CALENDAR_API_URL").ok(),
        })
    }

    /// OAuth client configuration for the refresh exchange.
    pub fn oauth(&self) -> OAuthConfig {
        let mut oauth = OAuthConfig::google(&self.google_client_id, &self.google_client_secret);
        if let Some(url) = &self.token_url {
            oauth.token_url = url.clone();
        }
        oauth
    }
}

fn require(name: &str) -> YoteiResult<String> {
    std::env::var(name).map_err(|_| YoteiError::Config(format!("{name} is not set")))
}
