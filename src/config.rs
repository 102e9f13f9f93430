use crate::errors::{EngineError, EngineResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ledger_db_path: PathBuf,
    pub quotes_db_path: PathBuf,
    pub bankroll: String,
    pub league: String,
    pub default_vig: f64,
    pub quote_window: usize,
    pub catalogue_path: Option<PathBuf>,
    pub server_port: u16,
    pub run_once: bool,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let default_vig = env_var_or("DEFAULT_VIG", "0.05")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("DEFAULT_VIG: {e}")))?;
        if !(0.0..1.0).contains(&default_vig) {
            return Err(EngineError::Config(format!(
                "DEFAULT_VIG must be in [0, 1), got {default_vig}"
            )));
        }

        let quote_window = env_var_or("QUOTE_WINDOW", "100")
            .parse::<usize>()
            .map_err(|e| EngineError::Config(format!("QUOTE_WINDOW: {e}")))?;
        if quote_window == 0 {
            return Err(EngineError::Config("QUOTE_WINDOW must be > 0".into()));
        }

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| EngineError::Config(format!("SERVER_PORT: {e}")))?;

        let run_once = parse_flag(&env_var_or("RUN_ONCE", "false"))
            .ok_or_else(|| EngineError::Config("RUN_ONCE: expected true/false".into()))?;

        Ok(Self {
            ledger_db_path: PathBuf::from(env_var_or("LEDGER_DB_PATH", "data/betting.db")),
            quotes_db_path: PathBuf::from(env_var_or("QUOTES_DB_PATH", "data/futures.db")),
            bankroll: env_var_or("BANKROLL", "GreenAleph"),
            league: env_var_or("LEAGUE", "NBA"),
            default_vig,
            quote_window,
            catalogue_path: std::env::var("CATALOGUE_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            server_port,
            run_once,
        })
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag(" YES "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag(""), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
