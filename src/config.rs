use std::env;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};

use crate::models::RefundTier;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub directory_seed: Option<String>,
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub utc_offset_minutes: i32,
    pub currency_minor_units: u32,
    pub refund_tiers: Vec<RefundTier>,
    pub single_booking_per_slot: bool,
    pub store_timeout: Duration,
    pub store_retries: u32,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let refund_tiers = match env::var("REFUND_TIERS") {
            Ok(raw) if !raw.trim().is_empty() => parse_refund_tiers(&raw)?,
            _ => RefundTier::defaults(),
        };

        Ok(Self {
            port: parse_var("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "medidirect.db".to_string()),
            directory_seed: env::var("DIRECTORY_SEED").ok().filter(|p| !p.is_empty()),
            default_page_size: parse_var("DEFAULT_PAGE_SIZE", 10),
            max_page_size: parse_var("MAX_PAGE_SIZE", 100),
            utc_offset_minutes: parse_var("UTC_OFFSET_MINUTES", 60),
            currency_minor_units: parse_var("CURRENCY_MINOR_UNITS", 2),
            refund_tiers,
            single_booking_per_slot: parse_var("SINGLE_BOOKING_PER_SLOT", false),
            store_timeout: Duration::from_millis(parse_var("STORE_TIMEOUT_MS", 5000)),
            store_retries: parse_var("STORE_RETRIES", 1),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_phone_number: env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
        })
    }

    /// Wall-clock time at the centres' locality.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + chrono::Duration::minutes(self.utc_offset_minutes as i64)
    }

    pub fn twilio_configured(&self) -> bool {
        !self.twilio_account_sid.is_empty() && !self.twilio_auth_token.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: ":memory:".to_string(),
            directory_seed: None,
            default_page_size: 10,
            max_page_size: 100,
            utc_offset_minutes: 60,
            currency_minor_units: 2,
            refund_tiers: RefundTier::defaults(),
            single_booking_per_slot: false,
            store_timeout: Duration::from_secs(5),
            store_retries: 1,
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_phone_number: String::new(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parses `days:percentage` pairs, e.g. `7:100,3:75,1:50`.
pub fn parse_refund_tiers(raw: &str) -> anyhow::Result<Vec<RefundTier>> {
    let mut tiers = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (days, pct) = part
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("invalid refund tier: {part}"))?;
        let min_days: i64 = days
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid days in refund tier: {part}"))?;
        let percentage: u8 = pct
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid percentage in refund tier: {part}"))?;
        tiers.push(RefundTier {
            min_days,
            percentage,
        });
    }
    Ok(tiers)
}
