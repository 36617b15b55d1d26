//! Configuration loading for Waypoint.
//!
//! The raw file shape ([`WaypointConfig`]) mirrors `~/.waypoint/config.toml`
//! with every field optional. [`Tuning`] is the resolved, validated form the
//! engine actually runs with: thresholds, decay windows and bridge settings
//! with defaults filled in.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Default, Deserialize)]
pub struct WaypointConfig {
    pub matching: Option<MatchingConfig>,
    pub decay: Option<DecayConfig>,
    pub context: Option<ContextConfig>,
    pub session: Option<SessionConfig>,
    pub bridge: Option<BridgeConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// Fuzzy and ordinal matching thresholds.
///
/// ```toml
/// [matching]
/// high_confidence = 0.90
/// medium_confidence = 0.60
/// confidence_floor = 0.50
/// relaxed_floor = 0.45
/// ambiguity_margin = 0.08
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct MatchingConfig {
    pub high_confidence: Option<f64>,
    pub medium_confidence: Option<f64>,
    pub confidence_floor: Option<f64>,
    pub relaxed_floor: Option<f64>,
    pub ambiguity_margin: Option<f64>,
}

/// Decay windows, in seconds.
///
/// ```toml
/// [decay]
/// options_secs = 60
/// list_preview_secs = 90
/// opened_panel_secs = 180
/// latch_idle_ttl_secs = 0   # disable the idle TTL
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct DecayConfig {
    pub options_secs: Option<u64>,
    pub list_preview_secs: Option<u64>,
    pub opened_panel_secs: Option<u64>,
    pub error_secs: Option<u64>,
    pub pending_options_grace_secs: Option<u64>,
    pub last_options_retention_secs: Option<u64>,
    pub latch_idle_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContextConfig {
    /// Messages read for a normal turn.
    pub window_messages: Option<usize>,
    /// Messages read on the single need-context retry.
    pub extended_window_messages: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionConfig {
    pub history_limit: Option<usize>,
    pub clarification_max_turns: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BridgeProvider {
    #[default]
    Claude,
    /// No remote model; every bridge call fails fast into the grounded path.
    Offline,
}

/// Constrained LLM bridge settings.
///
/// ```toml
/// [bridge]
/// provider = "claude"
/// model = "claude-haiku-4-5-20251001"
/// api_key = "${ANTHROPIC_API_KEY}"
/// timeout_ms = 4000
/// ```
#[derive(Default, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub provider: BridgeProvider,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_tokens: Option<u32>,
}

// Manual Debug impl to prevent leaking API keys in logs.
impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field(
                "api_key",
                &if self.api_key.is_some() {
                    "[REDACTED]"
                } else {
                    "None"
                },
            )
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    out
}

impl WaypointConfig {
    /// Load `~/.waypoint/config.toml`. A missing file is not an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".waypoint").join("config.toml"))
}

// ============================================================================
// Resolved tuning
// ============================================================================

/// Confidence band of a fuzzy match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub high: f64,
    pub medium: f64,
    /// Scores below this are not returned at all.
    pub floor: f64,
    /// Floor used by the ladder's second deterministic pass.
    pub relaxed_floor: f64,
    /// Minimum lead the best score needs over the runner-up to count as unique.
    pub ambiguity_margin: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high: 0.90,
            medium: 0.60,
            floor: 0.50,
            relaxed_floor: 0.45,
            ambiguity_margin: 0.08,
        }
    }
}

impl Thresholds {
    #[must_use]
    pub fn classify(&self, score: f64) -> Confidence {
        if score >= self.high {
            Confidence::High
        } else if score >= self.medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    fn from_config(config: Option<&MatchingConfig>) -> Self {
        let defaults = Self::default();
        let Some(config) = config else {
            return defaults;
        };
        let unit = |v: Option<f64>, d: f64| v.map_or(d, |v| v.clamp(0.0, 1.0));

        let high = unit(config.high_confidence, defaults.high);
        let medium = unit(config.medium_confidence, defaults.medium).min(high);
        let floor = unit(config.confidence_floor, defaults.floor).min(medium);
        let relaxed_floor = unit(config.relaxed_floor, defaults.relaxed_floor).min(floor);
        let ambiguity_margin = unit(config.ambiguity_margin, defaults.ambiguity_margin);

        Self {
            high,
            medium,
            floor,
            relaxed_floor,
            ambiguity_margin,
        }
    }
}

/// Per-field decay windows for chat context, plus session-level lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayWindows {
    pub options: Duration,
    pub list_preview: Duration,
    pub opened_panel: Duration,
    pub error: Duration,
    /// How long chat pending options stay selectable.
    pub pending_options_grace: Duration,
    /// How long the last shown options can be brought back with "back to options".
    pub last_options_retention: Duration,
    /// Idle time after which a widget latch is released. `None` disables it.
    pub latch_idle_ttl: Option<Duration>,
}

impl Default for DecayWindows {
    fn default() -> Self {
        Self {
            options: Duration::from_secs(60),
            list_preview: Duration::from_secs(90),
            opened_panel: Duration::from_secs(180),
            error: Duration::from_secs(120),
            pending_options_grace: Duration::from_secs(120),
            last_options_retention: Duration::from_secs(600),
            latch_idle_ttl: Some(Duration::from_secs(300)),
        }
    }
}

impl DecayWindows {
    fn from_config(config: Option<&DecayConfig>) -> Self {
        let defaults = Self::default();
        let Some(config) = config else {
            return defaults;
        };
        let secs = |v: Option<u64>, d: Duration| v.map_or(d, Duration::from_secs);

        Self {
            options: secs(config.options_secs, defaults.options),
            list_preview: secs(config.list_preview_secs, defaults.list_preview),
            opened_panel: secs(config.opened_panel_secs, defaults.opened_panel),
            error: secs(config.error_secs, defaults.error),
            pending_options_grace: secs(
                config.pending_options_grace_secs,
                defaults.pending_options_grace,
            ),
            last_options_retention: secs(
                config.last_options_retention_secs,
                defaults.last_options_retention,
            ),
            latch_idle_ttl: match config.latch_idle_ttl_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.latch_idle_ttl,
            },
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    pub provider: BridgeProvider,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl std::fmt::Debug for BridgeSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

pub const DEFAULT_BRIDGE_MODEL: &str = "claude-haiku-4-5-20251001";
pub const DEFAULT_BRIDGE_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            provider: BridgeProvider::Claude,
            model: DEFAULT_BRIDGE_MODEL.to_string(),
            api_key: None,
            base_url: DEFAULT_BRIDGE_BASE_URL.to_string(),
            timeout: Duration::from_millis(4000),
            max_tokens: 512,
        }
    }
}

impl BridgeSettings {
    fn from_config(config: Option<&BridgeConfig>) -> Self {
        let defaults = Self::default();
        let api_key_from_env = || env::var(ANTHROPIC_API_KEY_ENV).ok().filter(|k| !k.is_empty());
        let Some(config) = config else {
            return Self {
                api_key: api_key_from_env(),
                ..defaults
            };
        };

        let api_key = config
            .api_key
            .as_deref()
            .map(expand_env_vars)
            .filter(|key| !key.trim().is_empty())
            .or_else(api_key_from_env);

        Self {
            provider: config.provider,
            model: config.model.clone().unwrap_or(defaults.model),
            api_key,
            base_url: config.base_url.clone().unwrap_or(defaults.base_url),
            timeout: config
                .timeout_ms
                .filter(|ms| *ms > 0)
                .map_or(defaults.timeout, Duration::from_millis),
            max_tokens: config.max_tokens.unwrap_or(defaults.max_tokens),
        }
    }
}

/// Everything the engine needs from configuration, with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    pub thresholds: Thresholds,
    pub decay: DecayWindows,
    pub window_messages: usize,
    pub extended_window_messages: usize,
    pub history_limit: usize,
    pub clarification_max_turns: u32,
    pub bridge: BridgeSettings,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            decay: DecayWindows::default(),
            window_messages: 12,
            extended_window_messages: 48,
            history_limit: waypoint_types::DEFAULT_HISTORY_LIMIT,
            clarification_max_turns: 3,
            bridge: BridgeSettings::default(),
        }
    }
}

impl Tuning {
    #[must_use]
    pub fn from_config(config: Option<&WaypointConfig>) -> Self {
        let defaults = Self::default();
        let context = config.and_then(|c| c.context.as_ref());
        let session = config.and_then(|c| c.session.as_ref());

        let window_messages = context
            .and_then(|c| c.window_messages)
            .filter(|n| *n > 0)
            .unwrap_or(defaults.window_messages);
        let extended_window_messages = context
            .and_then(|c| c.extended_window_messages)
            .unwrap_or(defaults.extended_window_messages)
            .max(window_messages);

        Self {
            thresholds: Thresholds::from_config(config.and_then(|c| c.matching.as_ref())),
            decay: DecayWindows::from_config(config.and_then(|c| c.decay.as_ref())),
            window_messages,
            extended_window_messages,
            history_limit: session
                .and_then(|s| s.history_limit)
                .filter(|n| *n > 0)
                .unwrap_or(defaults.history_limit),
            clarification_max_turns: session
                .and_then(|s| s.clarification_max_turns)
                .filter(|n| *n > 0)
                .unwrap_or(defaults.clarification_max_turns),
            bridge: BridgeSettings::from_config(config.and_then(|c| c.bridge.as_ref())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("hello world"), "hello world");
    }

    #[test]
    fn expand_env_vars_single_var() {
        unsafe {
            env::set_var("WAYPOINT_TEST_CONFIG_VAR", "replaced");
        }
        let result = expand_env_vars("prefix ${WAYPOINT_TEST_CONFIG_VAR} suffix");
        assert_eq!(result, "prefix replaced suffix");
        unsafe {
            env::remove_var("WAYPOINT_TEST_CONFIG_VAR");
        }
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        unsafe {
            env::remove_var("WAYPOINT_MISSING_VAR");
        }
        assert_eq!(
            expand_env_vars("before ${WAYPOINT_MISSING_VAR} after"),
            "before  after"
        );
    }

    #[test]
    fn expand_env_vars_unclosed_brace_preserved() {
        assert_eq!(expand_env_vars("test ${UNCLOSED"), "test ${UNCLOSED");
    }

    #[test]
    fn defaults_match_documented_values() {
        let tuning = Tuning::from_config(None);
        assert!((tuning.thresholds.high - 0.90).abs() < f64::EPSILON);
        assert_eq!(tuning.decay.options, Duration::from_secs(60));
        assert_eq!(tuning.decay.opened_panel, Duration::from_secs(180));
        assert_eq!(tuning.history_limit, 50);
        assert_eq!(tuning.extended_window_messages, 48);
    }

    #[test]
    fn thresholds_are_clamped_and_ordered() {
        let config = WaypointConfig {
            matching: Some(MatchingConfig {
                high_confidence: Some(1.7),
                medium_confidence: Some(0.95),
                confidence_floor: Some(-2.0),
                ..MatchingConfig::default()
            }),
            ..WaypointConfig::default()
        };
        let t = Tuning::from_config(Some(&config)).thresholds;
        assert!((t.high - 1.0).abs() < f64::EPSILON);
        assert!(t.medium <= t.high);
        assert!(t.floor >= 0.0 && t.floor <= t.medium);
        assert!(t.relaxed_floor <= t.floor);
    }

    #[test]
    fn classify_bands() {
        let t = Thresholds::default();
        assert_eq!(t.classify(0.95), Confidence::High);
        assert_eq!(t.classify(0.90), Confidence::High);
        assert_eq!(t.classify(0.75), Confidence::Medium);
        assert_eq!(t.classify(0.59), Confidence::Low);
    }

    #[test]
    fn zero_latch_ttl_disables_it() {
        let config = WaypointConfig {
            decay: Some(DecayConfig {
                latch_idle_ttl_secs: Some(0),
                ..DecayConfig::default()
            }),
            ..WaypointConfig::default()
        };
        assert_eq!(Tuning::from_config(Some(&config)).decay.latch_idle_ttl, None);
    }

    #[test]
    fn extended_window_never_smaller_than_window() {
        let config = WaypointConfig {
            context: Some(ContextConfig {
                window_messages: Some(30),
                extended_window_messages: Some(10),
            }),
            ..WaypointConfig::default()
        };
        let tuning = Tuning::from_config(Some(&config));
        assert_eq!(tuning.window_messages, 30);
        assert_eq!(tuning.extended_window_messages, 30);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[matching]\nhigh_confidence = 0.85\n\n[bridge]\nprovider = \"offline\"\ntimeout_ms = 250\n"
        )
        .unwrap();

        let config = WaypointConfig::load_from(file.path()).unwrap();
        let tuning = Tuning::from_config(Some(&config));
        assert!((tuning.thresholds.high - 0.85).abs() < f64::EPSILON);
        assert_eq!(tuning.bridge.provider, BridgeProvider::Offline);
        assert_eq!(tuning.bridge.timeout, Duration::from_millis(250));
    }

    #[test]
    fn load_from_reports_parse_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[matching\nbroken").unwrap();

        let err = WaypointConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), &file.path().to_path_buf());
    }

    #[test]
    fn bridge_debug_redacts_key() {
        let config = BridgeConfig {
            api_key: Some("sk-secret".to_string()),
            ..BridgeConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
