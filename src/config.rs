use crate::domain::{Decimal, ProjectId, SimulationParams};
use crate::engine::ComparatorMode;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub project_id: ProjectId,
    /// Scenario loaded when the project has no versions yet.
    pub scenario_path: Option<String>,
    pub params: SimulationParams,
    pub comparator_mode: ComparatorMode,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let project_id = env_map
            .get("PROJECT_ID")
            .map(|s| s.as_str())
            .unwrap_or("1")
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .map(ProjectId::new)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "PROJECT_ID".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let scenario_path = env_map
            .get("SCENARIO_PATH")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let rounding_places = env_map
            .get("ROUNDING_PLACES")
            .map(|s| s.as_str())
            .unwrap_or("4")
            .parse::<u32>()
            .ok()
            .filter(|places| *places <= 28)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "ROUNDING_PLACES".to_string(),
                    "must be an integer between 0 and 28".to_string(),
                )
            })?;

        let epsilon = env_map
            .get("EPSILON")
            .map(|s| s.as_str())
            .unwrap_or("0.0001")
            .parse::<Decimal>()
            .ok()
            .filter(|e| !e.is_negative())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "EPSILON".to_string(),
                    "must be a non-negative decimal".to_string(),
                )
            })?;

        let comparator_mode = match env_map
            .get("COMPARATOR_MODE")
            .map(|s| s.as_str())
            .unwrap_or("previous")
        {
            "previous" => ComparatorMode::Previous,
            "start" => ComparatorMode::PeriodStart,
            "end" => ComparatorMode::PeriodEnd,
            other => {
                return Err(ConfigError::InvalidValue(
                    "COMPARATOR_MODE".to_string(),
                    format!("must be previous, start, or end, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            database_path,
            project_id,
            scenario_path,
            params: SimulationParams {
                rounding_places,
                epsilon,
            },
            comparator_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.project_id, ProjectId::new(1));
        assert_eq!(config.scenario_path, None);
        assert_eq!(config.params, SimulationParams::default());
        assert_eq!(config.comparator_mode, ComparatorMode::Previous);
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_project_id() {
        let mut env_map = setup_required_env();
        env_map.insert("PROJECT_ID".to_string(), "0".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PROJECT_ID"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_negative_epsilon() {
        let mut env_map = setup_required_env();
        env_map.insert("EPSILON".to_string(), "-0.1".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "EPSILON"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_comparator_mode() {
        let mut env_map = setup_required_env();
        env_map.insert("COMPARATOR_MODE".to_string(), "sideways".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "COMPARATOR_MODE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_overrides() {
        let mut env_map = setup_required_env();
        env_map.insert("ROUNDING_PLACES".to_string(), "2".to_string());
        env_map.insert("SCENARIO_PATH".to_string(), "scenarios/a.json".to_string());
        env_map.insert("COMPARATOR_MODE".to_string(), "end".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.params.rounding_places, 2);
        assert_eq!(config.scenario_path.as_deref(), Some("scenarios/a.json"));
        assert_eq!(config.comparator_mode, ComparatorMode::PeriodEnd);
    }
}
