use std::env;

/// Application settings, read from the environment once at startup and passed
/// explicitly to whatever needs them. Never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub app_title: String,
    pub app_description: String,
    /// Reserved for future auth; unused in the current read-only surface.
    pub secret: String,
    pub port: u16,
}

impl Settings {
    /// `DATABASE_URL` is required; everything else has a default.
    pub fn from_env() -> Option<Self> {
        let (_, database_url) = env::vars().find(|v| v.0.eq("DATABASE_URL"))?;

        Some(Settings {
            database_url,
            app_title: env::var("APP_TITLE")
                .unwrap_or_else(|_| "Vehicle Track Query Service".to_string()),
            app_description: env::var("APP_DESCRIPTION").unwrap_or_else(|_| {
                "Read-only API over GPS track records plus a bulk spreadsheet loader".to_string()
            }),
            secret: env::var("SECRET").unwrap_or_default(),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        })
    }
}
