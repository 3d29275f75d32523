use crate::plugin::{roleplay::RoleplayCounts, timer::store::Timers};
use anyhow::{anyhow, Result};
use std::{io::ErrorKind, path::PathBuf};

const PSTATE_FILE_NAME: &str = "state.json";

/// State which persists across sessions
///
/// All mutation paths take the surrounding write lock, modify in place, and `save()` before
/// releasing it.  That makes every mutation one atomic read-modify-write transaction as far as
/// concurrent readers (such as the timer firing loop) are concerned.
#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct PersistentState {
    pub timers: Timers,
    pub roleplay: RoleplayCounts,
}

impl PersistentState {
    fn state_path() -> Result<PathBuf> {
        crate::config::data_dir().map(|p| p.join(PSTATE_FILE_NAME))
    }

    pub async fn load() -> Result<Self> {
        let path = Self::state_path()?;

        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            // First run, nothing saved yet
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(anyhow!(
                    "Could not read state at `{}`: {}",
                    path.to_string_lossy(),
                    e
                ))
            }
        };

        serde_json::from_slice(&contents).map_err(|e| {
            anyhow!(
                "Could not parse state at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })
    }

    pub async fn save(&self) -> Result<()> {
        let path = Self::state_path()?;
        let pstate_str = serde_json::to_string_pretty(&self)
            .map_err(|e| anyhow!("Could not serialize state: {}", e))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                anyhow!(
                    "Could not create directory `{}`: {}",
                    parent.to_string_lossy(),
                    e
                )
            })?;
        }

        // Create a temporary file in the same directory.
        let tmp_path = path.with_extension("json.new");

        tokio::fs::write(&tmp_path, pstate_str).await.map_err(|e| {
            anyhow!(
                "Could not write state to temporary file `{}`: {}",
                tmp_path.to_string_lossy(),
                e
            )
        })?;

        // Atomically rename the temporary file over the target file.
        tokio::fs::rename(&tmp_path, &path).await.map_err(|e| {
            anyhow!(
                "Could not rename temporary file `{}` to `{}`: {}",
                tmp_path.to_string_lossy(),
                path.to_string_lossy(),
                e
            )
        })?;

        Ok(())
    }
}
