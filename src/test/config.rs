#[cfg(test)]
mod tests {
    use serial_test::serial;

    use crate::config::AppConfig;
    use crate::env::{env_files, is_production};

    fn extract() -> AppConfig {
        AppConfig::from_figment(&AppConfig::figment()).expect("Failed to extract config")
    }

    #[test]
    #[serial]
    fn test_defaults_apply() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", None::<&str>),
                ("FRONTEND_URL", None),
                ("CLERK_PEM_PUBLIC_KEY", None),
                ("CLERK_ISSUER", None),
                ("ROCKET_SESSION_HOURS", None),
            ],
            || {
                let config = extract();
                let defaults = AppConfig::default();

                assert_eq!(config.database_url, defaults.database_url);
                assert_eq!(config.frontend_url, defaults.frontend_url);
                assert_eq!(config.session_hours, 24);
                assert!(config.clerk_pem_public_key.is_none());
                assert!(config.clerk_issuer.is_none());
            },
        );
    }

    #[test]
    #[serial]
    fn test_unprefixed_variables_override() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("sqlite://override.db")),
                ("FRONTEND_URL", Some("https://germangains.app")),
                ("CLERK_ISSUER", Some("https://clerk.example.com")),
            ],
            || {
                let config = extract();

                assert_eq!(config.database_url, "sqlite://override.db");
                assert_eq!(config.frontend_url, "https://germangains.app");
                assert_eq!(config.clerk_issuer.as_deref(), Some("https://clerk.example.com"));
            },
        );
    }

    #[test]
    #[serial]
    fn test_rocket_prefixed_variables_override() {
        temp_env::with_var("ROCKET_SESSION_HOURS", Some("6"), || {
            let config = extract();
            assert_eq!(config.session_hours, 6);
            assert_eq!(config.session_duration(), chrono::Duration::hours(6));
        });
    }

    #[test]
    fn test_session_duration_has_floor() {
        let config = AppConfig {
            session_hours: 0,
            ..AppConfig::default()
        };

        assert_eq!(config.session_duration(), chrono::Duration::hours(1));
        assert_eq!(config.cookie_max_age(), rocket::time::Duration::hours(1));
    }

    #[test]
    #[serial]
    fn test_production_profile_detection() {
        temp_env::with_var("ROCKET_PROFILE", Some("release"), || {
            assert!(is_production());
        });
        temp_env::with_var("ROCKET_PROFILE", Some("production"), || {
            assert!(is_production());
        });
        temp_env::with_var("ROCKET_PROFILE", Some("debug"), || {
            assert!(!is_production());
        });
        temp_env::with_var_unset("ROCKET_PROFILE", || {
            assert!(!is_production());
        });
    }

    #[test]
    fn test_env_files_per_profile() {
        assert_eq!(
            env_files(true),
            vec!["config/common.env", "config/prod.env", ".secrets.env"]
        );
        assert_eq!(
            env_files(false),
            vec!["config/common.env", "config/dev.env", ".secrets.env"]
        );
    }
}
