use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Elasticsearch node URL
    #[serde(default = "default_elastic_url")]
    pub elastic_url: String,

    /// Index holding the viewing history documents
    #[serde(default = "default_elastic_index")]
    pub elastic_index: String,

    /// Per-request timeout for index round trips, in seconds
    #[serde(default = "default_elastic_timeout_secs")]
    pub elastic_timeout_secs: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_elastic_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_elastic_index() -> String {
    "historic_netflix".to_string()
}

fn default_elastic_timeout_secs() -> u64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Socket address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
