use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, WizardError};
use crate::utils::paths;

const TMP_SUFFIX: &str = "tmp";
const MIN_REDIRECT_DELAY_MS: u64 = 1_000;
const MAX_REDIRECT_DELAY_MS: u64 = 3_000;
const MIN_SUGGESTION_LENGTH: usize = 12;

/// Per-class character counts for generated password suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionQuotas {
    pub uppercase: usize,
    pub lowercase: usize,
    pub digits: usize,
    pub symbols: usize,
}

impl Default for SuggestionQuotas {
    fn default() -> Self {
        Self {
            uppercase: 3,
            lowercase: 3,
            digits: 3,
            symbols: 3,
        }
    }
}

impl SuggestionQuotas {
    pub fn total(&self) -> usize {
        self.uppercase + self.lowercase + self.digits + self.symbols
    }
}

/// Tunables shared by every wizard flow and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardConfig {
    #[serde(default = "WizardConfig::default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,
    #[serde(default = "WizardConfig::default_min_password_strength")]
    pub min_password_strength: u8,
    #[serde(default)]
    pub suggestion: SuggestionQuotas,
    #[serde(default)]
    pub backend_latency_ms: u64,
    #[serde(default = "WizardConfig::default_color_enabled")]
    pub color_enabled: bool,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            redirect_delay_ms: Self::default_redirect_delay_ms(),
            min_password_strength: Self::default_min_password_strength(),
            suggestion: SuggestionQuotas::default(),
            backend_latency_ms: 0,
            color_enabled: Self::default_color_enabled(),
        }
    }
}

impl WizardConfig {
    const fn default_redirect_delay_ms() -> u64 {
        2_000
    }

    const fn default_min_password_strength() -> u8 {
        4
    }

    const fn default_color_enabled() -> bool {
        true
    }

    /// Post-success navigation delay, clamped to the 1–3 second window.
    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(
            self.redirect_delay_ms
                .clamp(MIN_REDIRECT_DELAY_MS, MAX_REDIRECT_DELAY_MS),
        )
    }

    pub fn backend_latency(&self) -> Duration {
        Duration::from_millis(self.backend_latency_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.min_password_strength) {
            return Err(WizardError::Config(format!(
                "min_password_strength must be between 1 and 5 (got {})",
                self.min_password_strength
            )));
        }
        let quotas = &self.suggestion;
        if [quotas.uppercase, quotas.lowercase, quotas.digits, quotas.symbols].contains(&0) {
            return Err(WizardError::Config(
                "every suggestion character class needs at least one character".into(),
            ));
        }
        if quotas.total() < MIN_SUGGESTION_LENGTH {
            return Err(WizardError::Config(format!(
                "suggested passwords must be at least {} characters (quotas total {})",
                MIN_SUGGESTION_LENGTH,
                quotas.total()
            )));
        }
        Ok(())
    }
}

/// Loads and persists [`WizardConfig`] as JSON.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(paths::app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        let config_dir = paths::config_dir_in(&base);
        fs::create_dir_all(&config_dir)?;
        Ok(Self {
            path: paths::config_file_in(&base),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<WizardConfig> {
        let config = if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            serde_json::from_str::<WizardConfig>(&data)?
        } else {
            WizardConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &WizardConfig) -> Result<()> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
