use {
    anyhow::Result,
    clap::{
        crate_authors,
        crate_description,
        crate_name,
        crate_version,
        Args,
        Parser,
    },
    std::{
        fs,
        time::Duration,
    },
};

mod server;

#[derive(Parser, Debug)]
#[command(name = crate_name!())]
#[command(author = crate_authors!())]
#[command(about = crate_description!())]
#[command(version = crate_version!())]
pub enum Options {
    /// Run the live auction server.
    Run(RunOptions),
}

#[derive(Args, Clone, Debug)]
pub struct RunOptions {
    /// Server Options
    #[command(flatten)]
    pub server: server::Options,

    #[command(flatten)]
    pub config: ConfigOptions,
}

#[derive(Args, Clone, Debug)]
#[command(next_help_heading = "Config Options")]
#[group(id = "Config")]
pub struct ConfigOptions {
    /// Path to a configuration file with the auction and websocket tuning.
    #[arg(long = "config")]
    #[arg(env = "AUCTION_CONFIG")]
    #[arg(default_value = "config.yaml")]
    pub config: String,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub auction: AuctionConfig,
    #[serde(default)]
    pub ws:      WsConfig,
}

impl Config {
    pub fn load(path: &str) -> Result<Config> {
        let yaml_content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&yaml_content)?;
        Ok(config)
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AuctionConfig {
    /// Bids landing closer to the deadline than this window extend the
    /// countdown instead of letting snipers run out the clock.
    #[serde(default = "default_anti_snipe_window", with = "humantime_serde")]
    pub anti_snipe_window:    Duration,
    /// The deadline a sniped auction is reset to, measured from the moment
    /// the late bid commits.
    #[serde(default = "default_anti_snipe_extension", with = "humantime_serde")]
    pub anti_snipe_extension: Duration,
}

impl AuctionConfig {
    pub fn anti_snipe_window_ms(&self) -> i64 {
        self.anti_snipe_window.as_millis() as i64
    }

    pub fn anti_snipe_extension_ms(&self) -> i64 {
        self.anti_snipe_extension.as_millis() as i64
    }
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            anti_snipe_window:    default_anti_snipe_window(),
            anti_snipe_extension: default_anti_snipe_extension(),
        }
    }
}

fn default_anti_snipe_window() -> Duration {
    Duration::from_secs(10)
}

fn default_anti_snipe_extension() -> Duration {
    Duration::from_secs(15)
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct WsConfig {
    /// Header to read the requester ip from, for the per-ip subscriber cap.
    #[serde(default = "default_requester_ip_header_name")]
    pub requester_ip_header_name: String,
    #[serde(default = "default_broadcast_channel_size")]
    pub broadcast_channel_size:   usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            requester_ip_header_name: default_requester_ip_header_name(),
            broadcast_channel_size:   default_broadcast_channel_size(),
        }
    }
}

fn default_requester_ip_header_name() -> String {
    "X-Forwarded-For".to_string()
}

fn default_broadcast_channel_size() -> usize {
    1000
}
