// Configuration loader
// Loads toolgate.toml from the working directory or ~/.toolgate/config.toml,
// with secrets overridable from the environment.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Config;

/// Load configuration, preferring an explicitly given path.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match find_config_file() {
            Some(path) => path,
            None => bail!(
                "No configuration found. Create toolgate.toml in the working \
                 directory or ~/.toolgate/config.toml with [calendars], [google], \
                 [sms], [mail] and [directories] sections."
            ),
        },
    };

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    apply_env_overrides(&mut config);
    validate(&config)?;

    Ok(config)
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("toolgate.toml");
    if local.exists() {
        return Some(local);
    }

    let home = dirs::home_dir()?;
    let user = home.join(".toolgate/config.toml");
    if user.exists() {
        return Some(user);
    }

    None
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(token) = std::env::var("SMSAPI_TOKEN") {
        if !token.is_empty() {
            config.sms.token = token;
        }
    }
    if let Ok(token) = std::env::var("MAIL_API_TOKEN") {
        if !token.is_empty() {
            config.mail.token = token;
        }
    }
    if let Ok(bind) = std::env::var("TOOLGATE_BIND") {
        if !bind.is_empty() {
            config.bind_address = bind;
        }
    }
}

/// Reject broken route tables at startup instead of at call time.
fn validate(config: &Config) -> Result<()> {
    let routes = [
        ("calendars.service", &config.calendars.service),
        ("calendars.formalities", &config.calendars.formalities),
        ("calendars.product_meeting", &config.calendars.product_meeting),
    ];
    for (key, id) in routes {
        if id.trim().is_empty() {
            bail!("Config entry {} must be a non-empty calendar id", key);
        }
    }

    if config.directories.max_connections == 0 {
        bail!("Config entry directories.max_connections must be at least 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
            bind_address = "127.0.0.1:9100"

            [calendars]
            service = "svc-cal-id"
            formalities = "form-cal-id"
            product_meeting = "meet-cal-id"

            [google]
            token_path = "/tmp/token.json"

            [sms]
            token = "sms-token"

            [mail]
            base_url = "https://mail.example.com"
            from = "noreply@example.com"

            [directories]
            sundea_path = "/tmp/sundea.db"
            optivendi_path = "/tmp/optivendi.db"
        "#
    }

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(sample_toml()).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:9100");
        assert_eq!(config.calendars.service, "svc-cal-id");
        assert_eq!(config.sms.base_url, "https://api.smsapi.pl");
        assert_eq!(config.directories.max_connections, 5);
        assert!(!config.validation.reject_past_start);
        validate(&config).unwrap();
    }

    #[test]
    fn test_empty_calendar_route_rejected() {
        let toml_str = sample_toml().replace("svc-cal-id", "  ");
        let config: Config = toml::from_str(&toml_str).unwrap();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("calendars.service"));
    }

    #[test]
    fn test_load_config_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toolgate.toml");
        fs::write(&path, sample_toml()).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.mail.from, "noreply@example.com");
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/toolgate.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
