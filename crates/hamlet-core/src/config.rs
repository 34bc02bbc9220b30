//! Configuration loading and typed config structures for a Hamlet game.
//!
//! A game is described by a YAML file (see `config/hamlet.yaml` at the
//! project root). Every section is optional and falls back to the values a
//! standard game uses, so an empty document is a valid configuration for a
//! one-player game.

use std::path::Path;

use hamlet_economy::CatapultLimit;
use hamlet_types::{MAX_PLAYERS, PlayerStatus, Team};
use serde::Deserialize;

/// Environment variable that overrides `logging.level`.
pub const LOG_ENV_VAR: &str = "HAMLET_LOG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The document parsed but describes an impossible game.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level game configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Name, seed and run length.
    #[serde(default)]
    pub game: GameSection,

    /// How often the periodic checks run.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Player slots in slot order.
    #[serde(default = "default_players")]
    pub players: Vec<PlayerConfig>,

    /// Game rules that are not part of the save game.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            game: GameSection::default(),
            timing: TimingConfig::default(),
            players: default_players(),
            rules: RulesConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GameConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// [`LOG_ENV_VAR`] overrides `logging.level` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.logging.apply_env_override();
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml reads an empty document as null rather than an empty map.
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no game can run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero intervals, zero frames,
    /// an empty or oversized player list, or a fixed catapult rule without
    /// a maximum.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            })
        };
        if self.game.max_frames == 0 {
            return invalid("game.max_frames must be at least 1");
        }
        if self.timing.statistic_interval_gf == 0 {
            return invalid("timing.statistic_interval_gf must be at least 1");
        }
        if self.timing.emergency_check_interval_gf == 0 {
            return invalid("timing.emergency_check_interval_gf must be at least 1");
        }
        if self.timing.pact_check_interval_gf == 0 {
            return invalid("timing.pact_check_interval_gf must be at least 1");
        }
        if self.players.is_empty() {
            return invalid("at least one player slot is required");
        }
        if self.players.len() > MAX_PLAYERS {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "{} player slots configured, at most {MAX_PLAYERS} are supported",
                    self.players.len()
                ),
            });
        }
        if self.rules.catapult_limit == CatapultRule::Fixed && self.rules.catapult_max.is_none() {
            return invalid("rules.catapult_max is required for a fixed catapult limit");
        }
        Ok(())
    }

    /// Lobby teams of every slot, in slot order.
    pub fn teams(&self) -> Vec<Team> {
        self.players.iter().map(|p| p.team).collect()
    }
}

/// Game-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameSection {
    /// Human-readable game name.
    #[serde(default = "default_game_name")]
    pub name: String,

    /// Seed of the synchronized random generator.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Frames the headless engine runs before stopping.
    #[serde(default = "default_max_frames")]
    pub max_frames: u32,
}

impl Default for GameSection {
    fn default() -> Self {
        Self {
            name: default_game_name(),
            seed: default_seed(),
            max_frames: default_max_frames(),
        }
    }
}

/// Periodic check intervals, in game frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Frames between two statistic steps.
    #[serde(default = "default_statistic_interval_gf")]
    pub statistic_interval_gf: u32,

    /// Frames between two emergency program checks.
    #[serde(default = "default_emergency_check_interval_gf")]
    pub emergency_check_interval_gf: u32,

    /// Frames between two pact expiry checks.
    #[serde(default = "default_pact_check_interval_gf")]
    pub pact_check_interval_gf: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            statistic_interval_gf: default_statistic_interval_gf(),
            emergency_check_interval_gf: default_emergency_check_interval_gf(),
            pact_check_interval_gf: default_pact_check_interval_gf(),
        }
    }
}

/// One player slot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerConfig {
    /// Display name, used in logs only.
    #[serde(default)]
    pub name: String,

    /// Slot occupancy.
    #[serde(default = "default_status")]
    pub status: PlayerStatus,

    /// Lobby team.
    #[serde(default)]
    pub team: Team,
}

/// How the catapult limit is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatapultRule {
    /// No limit.
    #[default]
    Unlimited,
    /// Limited by military strength.
    Proportional,
    /// Limited to `rules.catapult_max`.
    Fixed,
}

/// Game rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RulesConfig {
    /// Catapult limit mode.
    #[serde(default)]
    pub catapult_limit: CatapultRule,

    /// Maximum for the fixed mode.
    #[serde(default)]
    pub catapult_max: Option<u32>,
}

impl RulesConfig {
    /// The rule as the economy understands it.
    pub fn catapult_limit(&self) -> CatapultLimit {
        match self.catapult_limit {
            CatapultRule::Unlimited => CatapultLimit::Unlimited,
            CatapultRule::Proportional => CatapultLimit::Proportional,
            CatapultRule::Fixed => CatapultLimit::Fixed(self.catapult_max.unwrap_or(0)),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    fn apply_env_override(&mut self) {
        if let Ok(level) = std::env::var(LOG_ENV_VAR)
            && !level.trim().is_empty()
        {
            self.level = level;
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_game_name() -> String {
    "Hamlet".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_max_frames() -> u32 {
    3000
}

const fn default_statistic_interval_gf() -> u32 {
    750
}

const fn default_emergency_check_interval_gf() -> u32 {
    100
}

const fn default_pact_check_interval_gf() -> u32 {
    1
}

const fn default_status() -> PlayerStatus {
    PlayerStatus::Occupied
}

fn default_players() -> Vec<PlayerConfig> {
    vec![PlayerConfig {
        name: "Player 1".to_owned(),
        status: PlayerStatus::Occupied,
        team: Team::NoTeam,
    }]
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timing.statistic_interval_gf, 750);
        assert_eq!(config.timing.emergency_check_interval_gf, 100);
        assert_eq!(config.players.len(), 1);
        assert_eq!(config.rules.catapult_limit(), CatapultLimit::Unlimited);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
game:
  name: "Two Valleys"
  seed: 7
  max_frames: 500

timing:
  statistic_interval_gf: 50
  emergency_check_interval_gf: 20
  pact_check_interval_gf: 5

players:
  - name: "Ada"
    status: Occupied
    team: Team1
  - name: "Bot"
    status: Ai
    team: Random
  - status: Free

rules:
  catapult_limit: fixed
  catapult_max: 3

logging:
  level: "debug"
  json: true
"#;
        let config = GameConfig::parse(yaml).unwrap();
        assert_eq!(config.game.name, "Two Valleys");
        assert_eq!(config.game.max_frames, 500);
        assert_eq!(config.timing.pact_check_interval_gf, 5);
        assert_eq!(config.players.len(), 3);
        assert_eq!(config.players[1].status, PlayerStatus::Ai);
        assert_eq!(config.players[2].team, Team::NoTeam);
        assert_eq!(config.rules.catapult_limit(), CatapultLimit::Fixed(3));
        assert!(config.logging.json);
        assert_eq!(
            config.teams(),
            vec![Team::Team1, Team::Random, Team::NoTeam]
        );
    }

    #[test]
    fn parse_minimal_and_empty_yaml() {
        let config = GameConfig::parse("game:\n  seed: 9\n").unwrap();
        assert_eq!(config.game.seed, 9);
        assert_eq!(config.timing.statistic_interval_gf, 750);
        assert!(GameConfig::parse("").is_ok());
    }

    #[test]
    fn validation_rejects_impossible_games() {
        assert!(matches!(
            GameConfig::parse("timing:\n  emergency_check_interval_gf: 0\n"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            GameConfig::parse("players: []\n"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            GameConfig::parse("rules:\n  catapult_limit: fixed\n"),
            Err(ConfigError::Invalid { .. })
        ));

        let mut config = GameConfig::default();
        config.players = vec![config.players[0].clone(); MAX_PLAYERS + 1];
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        assert!(matches!(
            GameConfig::parse("game: [unclosed"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("hamlet.yaml");
        if path.exists() {
            let config = GameConfig::from_file(&path);
            assert!(config.is_ok(), "failed to load project config: {config:?}");
        }
    }
}
