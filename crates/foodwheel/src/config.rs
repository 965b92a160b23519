use crate::events::AppEvent;
use crate::wheel::{Category, MAX_TURNS, MIN_TURNS, SPIN_DURATION_MS, Wheel, WheelError};
use async_channel::Sender;
use directories::ProjectDirs;
use nearby::geo::Coordinate;
use nearby::geocode::NOMINATIM_ENDPOINT;
use nearby::overpass::DEFAULT_ENDPOINT;
use nearby::ranker::{DEFAULT_MAX_RESULTS, DEFAULT_RADIUS_M};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    pub radius_m: u32,
    pub max_results: usize,
    pub endpoint: String,
    pub geocoder_endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_RADIUS_M,
            max_results: DEFAULT_MAX_RESULTS,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            geocoder_endpoint: NOMINATIM_ENDPOINT.to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl SearchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SpinConfig {
    pub min_turns: f64,
    pub max_turns: f64,
    pub duration_ms: u64,
    pub pointer_angle_deg: f64,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            min_turns: MIN_TURNS,
            max_turns: MAX_TURNS,
            duration_ms: SPIN_DURATION_MS,
            pointer_angle_deg: 90.0,
        }
    }
}

impl SpinConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn pointer_angle(&self) -> f64 {
        self.pointer_angle_deg.to_radians()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fallback: Coordinate,
    pub fallback_name: String,
    pub timeout_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            fallback: Coordinate::KUALA_LUMPUR,
            fallback_name: "Kuala Lumpur".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl LocationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configured position, if both halves are present.
    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.latitude?, self.longitude?))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub categories: Vec<Category>,
    pub search: SearchConfig,
    pub spin: SpinConfig,
    pub location: LocationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            search: SearchConfig::default(),
            spin: SpinConfig::default(),
            location: LocationConfig::default(),
        }
    }
}

pub fn default_categories() -> Vec<Category> {
    [
        ("Pizza", "🍕", "pizza"),
        ("Burger", "🍔", "burger"),
        ("Sushi", "🍣", "sushi"),
        ("Coffee", "☕", "coffee"),
        ("Ramen", "🍜", "ramen"),
        ("Pasta", "🍝", "pasta"),
        ("Chicken", "🍗", "chicken"),
        ("Salad", "🥗", "salad"),
        ("Steak", "🥩", "steak"),
        ("Ice Cream", "🍦", "ice cream"),
        ("Sandwich", "🥪", "sandwich"),
        ("Bakery", "🥖", "bakery"),
    ]
    .into_iter()
    .filter_map(|(name, glyph, keyword)| Category::new(name, glyph, keyword))
    .collect()
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let spin = &self.spin;
        if !(spin.min_turns.is_finite() && spin.max_turns.is_finite()) || spin.min_turns < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "spin turns must be finite and non-negative, got {}..{}",
                spin.min_turns, spin.max_turns
            )));
        }
        if spin.max_turns < spin.min_turns {
            return Err(ConfigError::Invalid(format!(
                "spin.max_turns ({}) is below spin.min_turns ({})",
                spin.max_turns, spin.min_turns
            )));
        }
        if !spin.pointer_angle_deg.is_finite() {
            return Err(ConfigError::Invalid("spin.pointer_angle_deg must be finite".into()));
        }
        if self.search.radius_m == 0 || self.search.max_results == 0 {
            return Err(ConfigError::Invalid(
                "search.radius_m and search.max_results must be positive".into(),
            ));
        }
        if self.search.request_timeout_secs == 0 || self.location.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "search.request_timeout_secs and location.timeout_ms must be positive".into(),
            ));
        }

        let location = &self.location;
        if location.latitude.is_some() != location.longitude.is_some() {
            return Err(ConfigError::Invalid(
                "location.latitude and location.longitude must be set together".into(),
            ));
        }
        for coordinate in location.coordinate().into_iter().chain([location.fallback]) {
            if !coordinate.is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "coordinate out of range: ({}, {})",
                    coordinate.latitude, coordinate.longitude
                )));
            }
        }

        self.wheel().map(|_| ())
    }

    pub fn wheel(&self) -> Result<Wheel, ConfigError> {
        Ok(Wheel::new(
            self.categories.clone(),
            self.spin.pointer_angle(),
        )?)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Invalid config: {0}")]
    Wheel(#[from] WheelError),
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs = ProjectDirs::from("org", "foodwheel", "foodwheel")
        .ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("FOODWHEEL")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

pub fn load_config() -> Result<Config, ConfigError> {
    let config_path = get_config_path()?;

    let s = config::Config::builder()
        .add_source(config::File::from(config_path).required(false))
        .add_source(environment())
        .build()?;

    let config: Config = s.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let s = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    let config: Config = s.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Loads the user's config, writing the default one on first run.
pub fn load_or_default() -> Config {
    if let Ok(path) = get_config_path()
        && !path.exists()
    {
        match write_default_config() {
            Ok(path) => log::info!("Wrote default config to {}", path.display()),
            Err(e) => log::warn!("Could not write default config: {}", e),
        }
    }

    load_config().unwrap_or_else(|e| {
        log::error!("Falling back to built-in config: {}", e);
        Config::default()
    })
}

pub fn write_default_config() -> std::io::Result<PathBuf> {
    let path =
        get_config_path().map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    if !path.exists() {
        fs_err::write(&path, DEFAULT_CONFIG)?;
    }
    Ok(path)
}

pub const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

pub async fn run_async_watcher(tx: Sender<AppEvent>) {
    let config_path = match get_config_path() {
        Ok(p) => p,
        Err(e) => {
            log::error!("Config watcher error: {}", e);
            return;
        }
    };

    if let Err(e) = watch(&config_path, tx).await {
        log::error!("Config watcher stopped: {}", e);
    }
}

async fn watch(config_path: &Path, tx: Sender<AppEvent>) -> Result<(), ConfigError> {
    let Some(config_dir) = config_path.parent() else {
        return Ok(());
    };
    if let Err(e) = fs_err::create_dir_all(config_dir) {
        log::error!("Failed to create config directory for watching: {}", e);
        return Ok(());
    }

    let (bridge_tx, bridge_rx) = async_channel::unbounded();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = bridge_tx.send_blocking(res);
        },
        notify::Config::default(),
    )?;
    watcher.watch(config_dir, RecursiveMode::NonRecursive)?;

    while let Ok(res) = bridge_rx.recv().await {
        match res {
            Ok(event) => {
                let meaningful_event = matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                );

                if meaningful_event
                    && event.paths.iter().any(|p| p == config_path)
                    && tx.send(AppEvent::ConfigReload).await.is_err()
                {
                    break;
                }
            }
            Err(e) => log::error!("Watch error: {}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_default_matches_builtin() {
        let parsed = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
        assert_eq!(parsed.categories.len(), 12);
        assert_eq!(parsed.categories[9].keyword.as_str(), "ice cream");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let parsed = parse_config(
            r#"
            [search]
            radius_m = 3500

            [location]
            latitude = 1.3521
            longitude = 103.8198
            "#,
        )
        .unwrap();
        assert_eq!(parsed.search.radius_m, 3500);
        assert_eq!(parsed.search.max_results, DEFAULT_MAX_RESULTS);
        assert_eq!(parsed.categories, default_categories());
        assert_eq!(
            parsed.location.coordinate(),
            Some(Coordinate::new(1.3521, 103.8198))
        );
    }

    #[test]
    fn test_custom_categories() {
        let parsed = parse_config(
            r#"
            categories = [
                { name = "Tacos", glyph = "🌮", keyword = "mexican" },
                { name = "Dim Sum", glyph = "🥟", keyword = "dim sum" },
            ]
            "#,
        )
        .unwrap();
        let wheel = parsed.wheel().unwrap();
        assert_eq!(wheel.len(), 2);
        assert_eq!(wheel.categories()[1].name.as_str(), "Dim Sum");
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let cases = [
            "categories = []",
            "[spin]\nmin_turns = 5.0\nmax_turns = 2.0",
            "[spin]\nmin_turns = -1.0",
            "[search]\nmax_results = 0",
            "[search]\nrequest_timeout_secs = 0",
            "[location]\ntimeout_ms = 0",
            "[location]\nlatitude = 10.0",
            "[location]\nfallback = { latitude = 95.0, longitude = 0.0 }",
            "categories = [{ name = \"X\", glyph = \"x\", keyword = \"  \" }]",
        ];
        for toml in cases {
            assert!(parse_config(toml).is_err(), "accepted: {toml}");
        }
    }

    #[test]
    fn test_pointer_angle_in_radians() {
        let spin = SpinConfig::default();
        assert!((spin.pointer_angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(spin.duration(), Duration::from_millis(3000));
    }
}
