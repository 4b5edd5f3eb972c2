pub mod checkin;
pub mod coach;
pub mod config;
pub mod matching;
pub mod pod;
pub mod remind;
pub mod review;
pub mod streak;
pub mod user;

use std::error::Error;
use std::path::{Path, PathBuf};

use serde::Serialize;
use studypod_core::storage::data_dir;
use studypod_core::{AccountabilityService, Config, Database};

/// Where command state lives for this invocation.
pub struct Context {
    data_dir: PathBuf,
}

impl Context {
    /// Use `data_dir` when given, otherwise `~/.config/studypod[-dev]/`.
    pub fn new(data_dir_override: Option<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let data_dir = match data_dir_override {
            Some(dir) => {
                std::fs::create_dir_all(&dir)?;
                dir
            }
            None => data_dir()?,
        };
        tracing::debug!(data_dir = %data_dir.display(), "using data directory");
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> Result<Config, Box<dyn Error>> {
        Ok(Config::load_from(&self.data_dir)?)
    }

    pub fn service(&self) -> Result<AccountabilityService<Database>, Box<dyn Error>> {
        let config = self.config()?;
        let db = Database::open_in(&self.data_dir)?;
        Ok(AccountabilityService::new(db, config))
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
