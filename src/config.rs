use crate::error::ConfigError;
use std::env;

pub const DEFAULT_CHANNEL: &str = "voting-channel";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub admin_password: Option<String>,
    pub channel: String,
    pub allow_revote: bool,
    pub lock_votes_on_reveal: bool,
    pub clamp_tallies: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_password: None,
            channel: DEFAULT_CHANNEL.to_string(),
            allow_revote: false,
            lock_votes_on_reveal: true,
            clamp_tallies: false,
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| -> Result<bool, ConfigError> {
            match lookup(key) {
                Some(value) => parse_flag(key, &value),
                None => Ok(default),
            }
        };

        Ok(Self {
            admin_password: lookup("ADMIN_PASSWORD").filter(|p| !p.is_empty()),
            channel: lookup("VOTING_CHANNEL")
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or(defaults.channel),
            allow_revote: flag("ALLOW_REVOTE", defaults.allow_revote)?,
            lock_votes_on_reveal: flag("LOCK_VOTES_ON_REVEAL", defaults.lock_votes_on_reveal)?,
            clamp_tallies: flag("CLAMP_TALLIES", defaults.clamp_tallies)?,
        })
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.channel, "voting-channel");
    }

    #[test]
    fn flags_and_password_are_read() {
        let config = Config::from_lookup(lookup_from(&[
            ("ADMIN_PASSWORD", "hunter2"),
            ("VOTING_CHANNEL", "room-7"),
            ("ALLOW_REVOTE", "Yes"),
            ("LOCK_VOTES_ON_REVEAL", "0"),
            ("CLAMP_TALLIES", "TRUE"),
        ]))
        .unwrap();

        assert_eq!(config.admin_password.as_deref(), Some("hunter2"));
        assert_eq!(config.channel, "room-7");
        assert!(config.allow_revote);
        assert!(!config.lock_votes_on_reveal);
        assert!(config.clamp_tallies);
    }

    #[test]
    fn bad_flag_is_reported() {
        let err = Config::from_lookup(lookup_from(&[("ALLOW_REVOTE", "sometimes")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidFlag {
                key: "ALLOW_REVOTE".to_string(),
                value: "sometimes".to_string(),
            }
        );
    }

    #[test]
    fn blank_password_means_no_admin() {
        let config = Config::from_lookup(lookup_from(&[("ADMIN_PASSWORD", "")])).unwrap();
        assert_eq!(config.admin_password, None);
    }
}
