pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod inference;
pub mod session;
pub mod settings;
pub mod timer;
pub mod utils;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use log::info;

pub use config::AppConfig;
pub use db::{models, Database};
pub use error::{StorageError, StorageResult};
pub use import::{HistoryImporter, ImportSummary};
pub use session::WorkoutSessionManager;
pub use settings::{KeyValueStore, SettingsStore};
pub use timer::{LogNotifier, NotificationScheduler, RestTimer, SystemClock};

const DATABASE_FILE_NAME: &str = "kiln.sqlite3";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Initialize logging (reads RUST_LOG env var). Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

/// Everything a host app needs, wired against one data directory.
#[derive(Clone)]
pub struct Kiln {
    pub config: AppConfig,
    pub db: Database,
    pub settings: Arc<SettingsStore>,
    pub rest_timer: RestTimer,
    pub sessions: WorkoutSessionManager,
    pub importer: HistoryImporter,
}

impl Kiln {
    pub async fn open(data_dir: &Path) -> Result<Self> {
        Self::open_with(data_dir, Arc::new(LogNotifier)).await
    }

    /// Open with a platform notification backend. Any workout left in
    /// progress by a previous run is recovered before returning.
    pub async fn open_with(
        data_dir: &Path,
        notifier: Arc<dyn NotificationScheduler>,
    ) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

        let config = AppConfig::load(data_dir)?;
        let db = Database::new(data_dir.join(DATABASE_FILE_NAME))?;
        let settings = Arc::new(SettingsStore::new(data_dir.join(SETTINGS_FILE_NAME))?);
        let clock = Arc::new(SystemClock);

        let rest_timer = RestTimer::new(
            settings.clone(),
            notifier,
            clock.clone(),
            config.rest_timer.tick_interval(),
        );
        let sessions = WorkoutSessionManager::new(
            db.clone(),
            rest_timer.clone(),
            clock.clone(),
            config.rest_timer.fallback_rest_seconds,
        );
        let importer = HistoryImporter::new(db.clone(), clock, &config.import);

        if sessions.recover_interrupted().await? {
            info!("Recovered an interrupted workout");
        }

        info!("Kiln ready at {}", data_dir.display());
        Ok(Self {
            config,
            db,
            settings,
            rest_timer,
            sessions,
            importer,
        })
    }
}
