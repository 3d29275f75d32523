use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

const CONFIG_PATH_REL_HOME: &str = ".config/owobot/config.toml";
const DATA_DIR_REL_HOME: &str = ".config/owobot";

/// Bot configuration
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub general: General,
    pub timer: Timer,
    pub anilist: Anilist,
    pub video2gif: Video2Gif,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct General {
    pub discord_token: String,
    pub bot_owners: Vec<String>,
    pub command_prefix: String,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Timer {
    /// Maximum number of timers a single user may hold at once
    pub max_user_timers: usize,
    /// How long `;timer remove all` waits for a yes/no answer
    pub confirm_timeout_seconds: u64,
    /// How often the firing loop checks for due timers
    pub fire_check_interval_seconds: u64,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Anilist {
    pub max_description_chars: usize,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Video2Gif {
    pub max_video_bytes: u64,
    pub frame_rate: u32,
    pub gif_width: u32,
}

/// Directory for configuration and bot-managed data files
pub fn data_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(DATA_DIR_REL_HOME))
        .ok_or(anyhow!("Could not find home directory"))
}

impl Config {
    fn config_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|p| p.join(CONFIG_PATH_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut file = tokio::fs::File::open(&path).await.map_err(|e| {
            anyhow!(
                "Could not open configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).await.map_err(|e| {
            anyhow!(
                "Could not read configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            anyhow!(
                "Could not parse configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        Ok(config)
    }

    pub async fn reload(&mut self) -> Result<()> {
        let new = Self::load().await?;
        *self = new;
        Ok(())
    }
}
