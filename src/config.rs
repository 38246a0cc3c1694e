#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    /// Reads configuration from the environment. Every variable has a
    /// local-development default: `DATABASE_URL` (sqlite:blog.db),
    /// `JWT_SECRET` (insecure dev key, logged as a warning when used) and
    /// `JWT_TTL_HOURS` (24).
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:blog.db".into());
        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using insecure development default");
            "dev_jwt_secret_change_me".into()
        });
        let jwt = JwtConfig {
            secret,
            ttl_hours: std::env::var("JWT_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };
        Ok(Self { database_url, jwt })
    }
}
