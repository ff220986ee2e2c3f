use std::time::Duration;

use anyhow::Context;

use crate::session::Session;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub api_rps: u32,
    pub filter_debounce_ms: u64,
    pub reveal_delay_ms: u64,
    pub carousel_interval_ms: u64,
    pub reduced_motion: bool,
    pub session_email: Option<String>,
    pub session_token: Option<String>,
    pub session_display_name: Option<String>,
    pub session_photo_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_base_url = lookup("MOVIEMASTER_API_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "http://localhost:3000".to_string());

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            anyhow::bail!("MOVIEMASTER_API_URL must start with http:// or https://");
        }

        let request_timeout_secs: u64 = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(s) => s.trim().parse().context("REQUEST_TIMEOUT_SECS")?,
            None => 30,
        };

        let api_rps: u32 = lookup("API_RPS").and_then(|s| s.trim().parse().ok()).unwrap_or(10);

        let filter_debounce_ms: u64 =
            lookup("FILTER_DEBOUNCE_MS").and_then(|s| s.trim().parse().ok()).unwrap_or(300);

        let reveal_delay_ms: u64 =
            lookup("REVEAL_DELAY_MS").and_then(|s| s.trim().parse().ok()).unwrap_or(1200);

        let carousel_interval_ms: u64 =
            lookup("CAROUSEL_INTERVAL_MS").and_then(|s| s.trim().parse().ok()).unwrap_or(8000);

        let reduced_motion = lookup("REDUCED_MOTION")
            .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        let non_empty =
            |key: &str| lookup(key).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        Ok(Self {
            api_base_url,
            request_timeout_secs,
            api_rps,
            filter_debounce_ms,
            reveal_delay_ms,
            carousel_interval_ms,
            reduced_motion,
            session_email: non_empty("MOVIEMASTER_EMAIL"),
            session_token: non_empty("MOVIEMASTER_TOKEN"),
            session_display_name: non_empty("MOVIEMASTER_DISPLAY_NAME"),
            session_photo_url: non_empty("MOVIEMASTER_PHOTO_URL"),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(self.filter_debounce_ms)
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }

    pub fn carousel_interval(&self) -> Duration {
        Duration::from_millis(self.carousel_interval_ms)
    }

    /// Session preconfigured for headless runs. Needs both email and token.
    pub fn session(&self) -> Option<Session> {
        let email = self.session_email.clone()?;
        let token = self.session_token.clone()?;
        Some(
            Session::new(email, token)
                .with_profile(self.session_display_name.clone(), self.session_photo_url.clone()),
        )
    }
}
