use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use log::{info, warn};
use rand::{distributions::Alphanumeric, Rng};

use crate::structs::Args;

const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:3001"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub offline: bool,
    pub postgres_url: String,
    pub jwt_secret: String,
    pub jwt_expire_days: i64,
    pub cors_origins: Vec<String>,
    pub bootstrap_admin: Option<(String, String)>,
}

impl Config {
    pub fn load(args: &Args) -> Config {
        let postgres_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            try_load::<String>("POSTGRES_USER", "transport"),
            secret("POSTGRES_PASSWORD", "postgres_password").unwrap_or_default(),
            try_load::<String>("POSTGRES_HOST", "localhost"),
            try_load::<u16>("POSTGRES_PORT", "5432"),
            try_load::<String>("POSTGRES_DB", "transport"),
        );

        let jwt_secret = match secret("JWT_SECRET", "jwt_secret") {
            Some(value) => value,
            None if args.offline => {
                warn!("No JWT secret configured, generating one for this offline session");
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(48)
                    .map(char::from)
                    .collect()
            }
            None => panic!("JWT_SECRET must be set when running against postgres"),
        };

        let mut cors_origins: Vec<String> = DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect();
        for key in ["CLIENT_URL", "ADMIN_URL"] {
            if let Ok(origin) = env::var(key) {
                if !cors_origins.contains(&origin) {
                    cors_origins.push(origin);
                }
            }
        }

        let bootstrap_admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some((email, password)),
            _ => None,
        };

        Config {
            host: args.host.clone(),
            port: args.port,
            offline: args.offline,
            postgres_url,
            jwt_secret,
            jwt_expire_days: try_load("JWT_EXPIRE_DAYS", "30"),
            cors_origins,
            bootstrap_admin,
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// Looks at the environment first and falls back to a docker secret file.
fn secret(key: &str, secret_name: &str) -> Option<String> {
    if let Ok(value) = env::var(key) {
        return Some(value);
    }

    let path = format!("/run/secrets/{secret_name}");
    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("{key} not set and {path} unreadable: {e}");
        })
        .ok()
}
