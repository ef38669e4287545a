use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expires_hours: i64,
    pub payments: PaymentConfig,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub mail: MailConfig,
    pub frontend_url: String,
}

/// Payment provider settings. Without a secret key checkout runs the
/// simulated always-succeeds path.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_base: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);

        let payments = PaymentConfig {
            secret_key: non_empty("STRIPE_SECRET_KEY"),
            webhook_secret: non_empty("STRIPE_WEBHOOK_SECRET"),
            api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "eur".to_string()),
        };

        let mail = MailConfig {
            smtp_host: non_empty("SMTP_HOST"),
            smtp_port: parse_or("SMTP_PORT", 25),
            smtp_username: non_empty("SMTP_USERNAME"),
            smtp_password: non_empty("SMTP_PASSWORD"),
            from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "GreenCart <no-reply@greencart.local>".to_string()),
        };

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_expires_hours: parse_or("JWT_EXPIRES_HOURS", 24),
            payments,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 5 * 1024 * 1024),
            mail,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
        })
    }

    /// Configuration for tests and tools: no payment provider, no SMTP.
    pub fn for_database(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: jwt_secret.into(),
            jwt_expires_hours: 24,
            payments: PaymentConfig {
                secret_key: None,
                webhook_secret: None,
                api_base: "https://api.stripe.com".to_string(),
                currency: "eur".to_string(),
            },
            upload_dir: "uploads".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            mail: MailConfig {
                smtp_host: None,
                smtp_port: 25,
                smtp_username: None,
                smtp_password: None,
                from: "GreenCart <no-reply@greencart.local>".to_string(),
            },
            frontend_url: "http://localhost:5173".to_string(),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
