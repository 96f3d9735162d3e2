use std::env;
use std::str::FromStr;

use crate::error::{AppError, AppResult};
use crate::services::assignment::ManagerAssignment;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub otp_ttl_seconds: i64,
    pub otp_sweep_interval_seconds: u64,
    pub manager_assignment: ManagerAssignment,
    pub admin_email: String,
    pub admin_password: String,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiration_hours: parsed_or("JWT_EXPIRATION_HOURS", 24)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: parsed_or("SERVER_PORT", 3000)?,
            otp_ttl_seconds: parsed_or("OTP_TTL_SECONDS", 120)?,
            otp_sweep_interval_seconds: parsed_or("OTP_SWEEP_INTERVAL_SECONDS", 60)?,
            manager_assignment: parsed_or("MANAGER_ASSIGNMENT", ManagerAssignment::LeastLoaded)?,
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@carmarket.com".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin1234".to_string()),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn required(key: &str) -> AppResult<String> {
    env::var(key).map_err(|_| AppError::Internal(format!("{} must be set", key)))
}

fn parsed_or<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Internal(format!("{} is invalid ({}): {}", key, raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_values_name_the_variable() {
        let err = parse_value::<u16>("SERVER_PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));

        let port: u16 = parse_value("SERVER_PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn assignment_policy_parses_from_text() {
        let policy: ManagerAssignment = parse_value("MANAGER_ASSIGNMENT", "first_available").unwrap();
        assert_eq!(policy, ManagerAssignment::FirstAvailable);
        assert!(parse_value::<ManagerAssignment>("MANAGER_ASSIGNMENT", "random").is_err());
    }
}
