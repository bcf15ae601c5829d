use crate::config::Config;
use crate::error::LoginError;
use crate::models::User;
use log::{info, warn};

const ADMIN_NAME: &str = "admin";

/// Establishes a local identity. The name `admin` (any case) is reserved and
/// needs the configured password; everyone else joins as a participant.
pub fn login(name: &str, password: Option<&str>, config: &Config) -> Result<User, LoginError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LoginError::EmptyName);
    }

    if !name.eq_ignore_ascii_case(ADMIN_NAME) {
        info!("{} logged in", name);
        return Ok(User::new(name.to_string(), false));
    }

    match (config.admin_password.as_deref(), password) {
        (Some(expected), Some(given)) if expected == given => {
            info!("{} logged in as admin", name);
            Ok(User::new(name.to_string(), true))
        }
        _ => {
            warn!("Rejected admin login for '{}'", name);
            Err(LoginError::InvalidAdminPassword)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            admin_password: Some("secret".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn participants_need_only_a_name() {
        let user = login("  alice ", None, &config()).unwrap();
        assert_eq!(user.name, "alice");
        assert!(!user.is_admin);
    }

    #[test]
    fn blank_name_is_refused() {
        assert_eq!(login("   ", None, &config()), Err(LoginError::EmptyName));
    }

    #[test]
    fn admin_needs_the_password() {
        assert!(login("Admin", Some("secret"), &config()).unwrap().is_admin);
        assert_eq!(
            login("admin", Some("guess"), &config()),
            Err(LoginError::InvalidAdminPassword)
        );
        assert_eq!(login("ADMIN", None, &config()), Err(LoginError::InvalidAdminPassword));
    }

    #[test]
    fn admin_is_impossible_without_a_configured_password() {
        assert_eq!(
            login("admin", Some(""), &Config::default()),
            Err(LoginError::InvalidAdminPassword)
        );
    }
}
