use anyhow::Result;
use config::Config;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub worker: WorkerSettings,
    pub scheduler: SchedulerSettings,
    pub generator: GeneratorSettings,
    pub logging: LoggingConfig,
}

/// Knobs for a single materialization worker run.
///
/// Passed by value into the orchestrator at call time so multiple worker
/// instances can run with independent settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    pub max_concurrent_jobs: usize,
    pub max_organizations: usize,
    pub enable_post_processing: bool,
    pub look_ahead_months: u32,
    pub priority_threshold: u8,
}

/// How often the host binary triggers worker runs.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// Seconds between materialization runs.
    pub materialization_interval_secs: u64,
    /// Seconds between retention cleanup runs.
    pub cleanup_interval_secs: u64,
    /// Run one materialization pass immediately at startup.
    pub run_on_startup: bool,
}

/// Safety limits for occurrence generation.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorSettings {
    /// Hard cap on candidate periods considered per series, so unbounded
    /// rules always terminate.
    pub max_iterations_per_series: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and an optional
    /// `config.toml` into a `Settings`. Environment variables take
    /// precedence over file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it
    /// fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("worker.max_concurrent_jobs", 5)?
            .set_default("worker.max_organizations", 50)?
            .set_default("worker.enable_post_processing", true)?
            .set_default("worker.look_ahead_months", 1)?
            .set_default("worker.priority_threshold", 5)?
            .set_default("scheduler.materialization_interval_secs", 3600)?
            .set_default("scheduler.cleanup_interval_secs", 86400)?
            .set_default("scheduler.run_on_startup", true)?
            .set_default("generator.max_iterations_per_series", 10000)?
            .set_default("logging.level", "info")?
            // Env file
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}
