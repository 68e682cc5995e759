use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::{env, net::SocketAddr, str::FromStr};

use crate::services::{
    geofence::{DEFAULT_JOIN_RADIUS_M, DEFAULT_PRESENCE_RADIUS_M},
    passcode::PASSCODE_ROTATION_SECONDS,
    scoring::{ScoringPolicy, CHECK_BUDGET, MIN_REQUIRED},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiration_hours: u64,
    pub bind_addr: SocketAddr,
    pub cors_allow_origins: Vec<String>,
    /// Default radius for join when a lecture does not set its own.
    pub join_radius_m: f64,
    /// Default radius for ping and submit when a lecture does not set its own.
    pub presence_radius_m: f64,
    pub check_budget: i32,
    pub min_required_checks: i32,
    pub passcode_rotation_seconds: i64,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let jwt_secret = env::var("JWT_SECRET")
            .unwrap_or_else(|_| "your-secret-key-change-this-in-production".to_string());

        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let config = Config {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10)?,
            jwt_secret,
            jwt_expiration_hours: env_or("JWT_EXPIRATION_HOURS", 1)?,
            bind_addr: env_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            cors_allow_origins,
            join_radius_m: env_or("JOIN_RADIUS_METERS", DEFAULT_JOIN_RADIUS_M)?,
            presence_radius_m: env_or("PRESENCE_RADIUS_METERS", DEFAULT_PRESENCE_RADIUS_M)?,
            check_budget: env_or("CHECK_BUDGET", CHECK_BUDGET)?,
            min_required_checks: env_or("MIN_REQUIRED_CHECKS", MIN_REQUIRED)?,
            passcode_rotation_seconds: env_or(
                "PASSCODE_ROTATION_SECONDS",
                PASSCODE_ROTATION_SECONDS,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects policy combinations that would make every attendee fail or pass.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, radius) in [
            ("JOIN_RADIUS_METERS", self.join_radius_m),
            ("PRESENCE_RADIUS_METERS", self.presence_radius_m),
        ] {
            if !radius.is_finite() || radius <= 0.0 {
                bail!("{} must be a positive number of meters", name);
            }
        }
        if self.check_budget < 1 {
            bail!("CHECK_BUDGET must be at least 1");
        }
        if self.min_required_checks < 1 || self.min_required_checks > self.check_budget {
            bail!(
                "MIN_REQUIRED_CHECKS must be between 1 and CHECK_BUDGET ({})",
                self.check_budget
            );
        }
        if self.passcode_rotation_seconds < 1 {
            bail!("PASSCODE_ROTATION_SECONDS must be at least 1");
        }
        Ok(())
    }

    pub fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy::new(self.check_budget, self.min_required_checks)
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {} value {:?}: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}
