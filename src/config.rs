use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "dinespot", about = "A social restaurant check-in server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Places search API key
    #[arg(long, env = "DINESPOT_PLACES_API_KEY", hide_env_values = true)]
    pub places_api_key: Option<String>,

    /// Geocoding access token
    #[arg(long, env = "DINESPOT_GEOCODING_TOKEN", hide_env_values = true)]
    pub geocoding_token: Option<String>,

    /// Identity provider API key
    #[arg(long, env = "DINESPOT_AUTH_API_KEY", hide_env_values = true)]
    pub auth_api_key: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub places: PlacesConfig,
    pub geocoding: GeocodingConfig,
    pub map: MapConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    /// Base URL of the hosted identity provider
    pub provider_url: String,
    pub api_key: Option<String>,
    /// Where `/login` sends the browser to start the provider's sign-in flow
    pub authorize_url: Option<String>,
    /// Serve the `Secure` cookie attribute (disable for plain-http development)
    pub secure_cookies: bool,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PlacesConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// First resolver pass: take the service's top result within this radius
    pub nearby_radius_m: f64,
    /// Second resolver pass: take the closest result within this radius
    pub wide_radius_m: f64,
    pub nearby_max_results: u32,
    pub text_max_results: u32,
    pub text_bias_radius_m: f64,
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GeocodingConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub search_limit: u32,
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub style: String,
    /// Initial center as `[lng, lat]`
    pub center: [f64; 2],
    pub zoom: f64,
    pub cluster_max_zoom: u8,
    pub cluster_radius: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "dinespot_session".to_string(),
            session_hours: 720,
            provider_url: "http://localhost:54321".to_string(),
            api_key: None,
            authorize_url: None,
            secure_cookies: false,
        }
    }
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://places.googleapis.com".to_string(),
            api_key: None,
            nearby_radius_m: 50.0,
            wide_radius_m: 200.0,
            nearby_max_results: 10,
            text_max_results: 20,
            text_bias_radius_m: 5000.0,
            timeout_secs: 10,
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mapbox.com".to_string(),
            access_token: None,
            search_limit: 10,
            timeout_secs: 10,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            style: "mapbox://styles/mapbox/streets-v12".to_string(),
            // Tokyo
            center: [139.6917, 35.6895],
            zoom: 12.0,
            cluster_max_zoom: 14,
            cluster_radius: 50.0,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref key) = cli.places_api_key {
            config.places.api_key = Some(key.clone());
        }
        if let Some(ref token) = cli.geocoding_token {
            config.geocoding.access_token = Some(token.clone());
        }
        if let Some(ref key) = cli.auth_api_key {
            config.auth.api_key = Some(key.clone());
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("dinespot.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".dinespot")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("dinespot.db"))
    }
}
