use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use dotenvy::dotenv;
use std::env;
use std::net::IpAddr;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,

    /// Offset used to turn clock timestamps into the school's calendar day and wall time.
    pub school_offset: FixedOffset,
    /// Client addresses allowed to clock in/out. Empty disables the check.
    pub attendance_ip_allowlist: Vec<IpAddr>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: var_or("ACCESS_TOKEN_TTL", "28800")?, // default 8 hours

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", "60")?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            school_offset: parse_offset(
                &env::var("SCHOOL_UTC_OFFSET").unwrap_or_else(|_| "+08:00".to_string()),
            )?,
            attendance_ip_allowlist: parse_allowlist(
                &env::var("ATTENDANCE_IP_ALLOWLIST").unwrap_or_default(),
            )?,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Server settings for in-process tests, signing with `test-secret`.
    pub fn for_tests(allowlist: &str) -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            server_addr: String::new(),
            access_token_ttl: 60,
            rate_login_per_min: 60,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            log_dir: "logs".to_string(),
            school_offset: FixedOffset::east_opt(8 * 3600).expect("valid offset"),
            attendance_ip_allowlist: parse_allowlist(allowlist).expect("valid allow-list"),
        }
    }
}

fn var_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}

/// Parses `+HH:MM` / `-HH:MM` into a fixed offset.
pub fn parse_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    let (sign, rest) = match raw.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(anyhow!("Offset {raw:?} must start with + or -")),
    };
    let (hours, minutes) = rest
        .split_once(':')
        .ok_or_else(|| anyhow!("Offset {raw:?} must look like +HH:MM"))?;
    let hours: i32 = hours.parse().context("Invalid offset hours")?;
    let minutes: i32 = minutes.parse().context("Invalid offset minutes")?;

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| anyhow!("Offset {raw:?} out of range"))
}

pub fn parse_allowlist(raw: &str) -> Result<Vec<IpAddr>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().with_context(|| format!("Invalid IP in allow-list: {s}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_offsets() {
        assert_eq!(parse_offset("+08:00").unwrap().local_minus_utc(), 8 * 3600);
        assert_eq!(parse_offset("-05:30").unwrap().local_minus_utc(), -(5 * 3600 + 1800));
        assert!(parse_offset("08:00").is_err());
        assert!(parse_offset("+8").is_err());
    }

    #[test]
    fn parses_allowlist() {
        let list = parse_allowlist(" 10.0.0.1, ::1 ,,").unwrap();
        assert_eq!(list.len(), 2);
        assert!(parse_allowlist("").unwrap().is_empty());
        assert!(parse_allowlist("not-an-ip").is_err());
    }
}
