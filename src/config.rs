use crate::errors::{SdltError, SdltResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine settings, read from a TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    /// Worker threads for batch scoring (0 = one per CPU)
    #[serde(default)]
    pub threads: usize,
    #[serde(default)]
    pub expiry: ExpirySettings,
    #[serde(default)]
    pub nzta: NztaSettings,
    #[serde(default = "default_rating_bands")]
    pub rating_bands: Vec<RatingBand>,
}

/// Submission lifetime limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExpirySettings {
    pub min_days: u32,
    pub default_days: u32,
}

impl Default for ExpirySettings {
    fn default() -> Self {
        Self {
            min_days: 5,
            default_days: 14,
        }
    }
}

/// Constants of the NZTA approximation formula.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct NztaSettings {
    /// Penalties are divided by this before discounting
    pub penalty_scale: f64,
    /// Lowest score a scope can report
    pub floor: f64,
}

impl Default for NztaSettings {
    fn default() -> Self {
        Self {
            penalty_scale: 100.0,
            floor: 0.0,
        }
    }
}

/// A named rating that applies from `min_score` upward.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RatingBand {
    pub name: String,
    pub min_score: f64,
    #[serde(default)]
    pub colour: Option<String>,
}

fn default_rating_bands() -> Vec<RatingBand> {
    [
        ("Low", 0.0, "#36b37e"),
        ("Medium", 100.0, "#ffab00"),
        ("High", 500.0, "#ff5630"),
        ("Extreme", 1500.0, "#bf2600"),
    ]
    .into_iter()
    .map(|(name, min_score, colour)| RatingBand {
        name: name.to_string(),
        min_score,
        colour: Some(colour.to_string()),
    })
    .collect()
}

impl Default for Settings {
    fn default() -> Self {
        create_default_config()
    }
}

impl Settings {
    /// Reject settings the engine cannot work with.
    pub fn validate(&self) -> SdltResult<()> {
        if self.expiry.min_days == 0 {
            return Err(SdltError::Config("expiry.min_days must be at least 1".into()));
        }
        if self.expiry.default_days < self.expiry.min_days {
            return Err(SdltError::Config(format!(
                "expiry.default_days ({}) is below expiry.min_days ({})",
                self.expiry.default_days, self.expiry.min_days
            )));
        }
        if !(self.nzta.penalty_scale > 0.0) {
            return Err(SdltError::Config("nzta.penalty_scale must be positive".into()));
        }
        if self
            .rating_bands
            .windows(2)
            .any(|pair| pair[1].min_score <= pair[0].min_score)
        {
            return Err(SdltError::Config(
                "rating_bands must be listed in ascending min_score order".into(),
            ));
        }
        Ok(())
    }

    /// The highest band whose threshold the score reaches.
    pub fn rating_for(&self, score: f64) -> Option<&RatingBand> {
        self.rating_bands
            .iter()
            .rev()
            .find(|band| score >= band.min_score)
    }

    /// Resolved worker count for the batch pool.
    pub fn thread_count(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}

/// Load settings from a file, falling back to defaults when it does not exist
pub fn load_config<P: AsRef<Path>>(path: P) -> SdltResult<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        log::debug!("No settings at {:?}, using defaults", path);
        return Ok(create_default_config());
    }

    let contents =
        std::fs::read_to_string(path).map_err(|e| SdltError::io(e, path.to_path_buf()))?;
    let settings: Settings = toml::from_str(&contents).map_err(|source| SdltError::TomlDe {
        path: path.to_path_buf(),
        source,
    })?;
    settings.validate()?;
    log::debug!("Loaded settings from {:?}", path);
    Ok(settings)
}

/// Save settings to a file
pub fn save_config<P: AsRef<Path>>(settings: &Settings, path: P) -> SdltResult<()> {
    let path = path.as_ref();
    let contents = toml::to_string_pretty(settings)?;
    std::fs::write(path, contents).map_err(|e| SdltError::io(e, path.to_path_buf()))?;
    Ok(())
}

/// Create the default settings template
pub fn create_default_config() -> Settings {
    Settings {
        threads: 0,
        expiry: ExpirySettings::default(),
        nzta: NztaSettings::default(),
        rating_bands: default_rating_bands(),
    }
}
