use std::{env, sync::Arc};

#[derive(Clone, Debug)]
/// Configuration struct for the bot backend.
///
/// This struct holds everything needed to run the event webhook,
/// the request store and the reminder sweep: database location,
/// server binding, logging preferences, the admin gate, the static
/// pricing shown to customers and the outbound delivery settings.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the SQLite database, e.g. `sqlite://bot_data.db`.
    pub database_url: String,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// File the logger mirrors console output to.
    pub log_file: String,
    /// Maximum number of webhook calls accepted per second.
    pub requests_per_second: u32,
    /// Shared secret the gateway must present in `X-Gateway-Secret`.
    /// When unset the webhook is open (local development).
    pub gateway_secret: Option<String>,
    /// Admin panel gate.
    pub admin: AdminConfig,
    /// Static figures shown to customers.
    pub pricing: PricingConfig,
    /// Hints shown while collecting serial numbers.
    pub prompts: PromptConfig,
    /// Unsolicited message delivery and the reminder schedule.
    pub delivery: DeliveryConfig,
}

#[derive(Clone, Debug)]
pub struct AdminConfig {
    /// Shared password asked after `/admin`.
    pub password: String,
    /// User ids allowed to open the admin panel at all.
    pub ids: Vec<i64>,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    /// Activation price in rubles.
    pub activation_price: i64,
    /// Activation price in TON, shown verbatim.
    pub activation_price_ton: Option<String>,
    /// Phone number customers transfer the payment to.
    pub payment_phone: String,
}

#[derive(Clone, Debug, Default)]
pub struct PromptConfig {
    pub serial_number_example: Option<String>,
    /// Image reference the gateway resolves for the device serial example.
    pub serial_example_image: Option<String>,
    /// Image reference for the box serial example.
    pub box_serial_example_image: Option<String>,
}

#[derive(Clone, Debug)]
pub struct DeliveryConfig {
    /// Gateway endpoint receiving unsolicited commands. Logged only when unset.
    pub outbound_webhook_url: Option<String>,
    /// Capacity of the outbound notification queue.
    pub queue_capacity: usize,
    /// Seconds between two reminder sweeps.
    pub reminder_interval_secs: u64,
    /// Seconds before the first sweep after startup.
    pub reminder_first_delay_secs: u64,
    /// Minutes east of UTC used for dates shown to customers.
    pub display_utc_offset_minutes: i32,
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// Loads `.env` first (if present), then reads the process environment.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ADMIN_PASSWORD`: Shared password for the admin panel
    ///
    /// Optional (with defaults):
    /// - `ENVIRONMENT`: (default: "development")
    /// - `DATABASE_URL`: (default: "sqlite://bot_data.db")
    /// - `IP` / `PORT` / `WORKERS`: Server binding (default: 127.0.0.1:8080, 4 workers)
    /// - `ENABLE_CONSOLE_LOGGING` / `LOG_FILE`: Logging (default: true, "intake.log")
    /// - `REQUESTS_PER_SECOND`: Webhook rate limit (default: 10)
    /// - `ADMIN_IDS`: Comma separated user ids (default: none)
    /// - `ACTIVATION_PRICE`, `ACTIVATION_PRICE_TON`, `PAYMENT_PHONE`
    /// - `SERIAL_NUMBER_EXAMPLE`, `SERIAL_EXAMPLE_IMAGE`, `BOX_SERIAL_EXAMPLE_IMAGE`
    /// - `GATEWAY_SECRET`, `OUTBOUND_WEBHOOK_URL`, `OUTBOUND_QUEUE_CAPACITY`
    /// - `REMINDER_INTERVAL_SECS` (default: 3600), `REMINDER_FIRST_DELAY_SECS` (default: 10)
    /// - `DISPLAY_UTC_OFFSET_MINUTES`: Offset for customer-facing dates (default: 180, Moscow)
    ///
    /// # Panics
    ///
    /// This function will panic if `ADMIN_PASSWORD` is missing or if
    /// `ADMIN_IDS` contains something that is not a number.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();
        Arc::new(Self::from_lookup(|key| env::var(key).ok()))
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        Config {
            environment: or("ENVIRONMENT", "development"),
            database_url: or("DATABASE_URL", "sqlite://bot_data.db"),
            server_host: or("IP", "127.0.0.1"),
            server_port: or("PORT", "8080").parse().unwrap_or(8080),
            num_workers: or("WORKERS", "4").parse().unwrap_or(4),
            console_logging_enabled: or("ENABLE_CONSOLE_LOGGING", "true").to_lowercase()
                == "true",
            log_file: or("LOG_FILE", "intake.log"),
            requests_per_second: or("REQUESTS_PER_SECOND", "10")
                .parse()
                .ok()
                .filter(|rps| *rps > 0)
                .unwrap_or(10),
            gateway_secret: var("GATEWAY_SECRET"),
            admin: AdminConfig {
                password: var("ADMIN_PASSWORD").expect("ADMIN_PASSWORD must be set"),
                ids: parse_ids(&or("ADMIN_IDS", ""))
                    .expect("ADMIN_IDS must be a comma separated list of numbers"),
            },
            pricing: PricingConfig {
                activation_price: or("ACTIVATION_PRICE", "0").parse().unwrap_or(0),
                activation_price_ton: var("ACTIVATION_PRICE_TON"),
                payment_phone: or("PAYMENT_PHONE", ""),
            },
            prompts: PromptConfig {
                serial_number_example: var("SERIAL_NUMBER_EXAMPLE"),
                serial_example_image: var("SERIAL_EXAMPLE_IMAGE"),
                box_serial_example_image: var("BOX_SERIAL_EXAMPLE_IMAGE"),
            },
            delivery: DeliveryConfig {
                outbound_webhook_url: var("OUTBOUND_WEBHOOK_URL"),
                queue_capacity: or("OUTBOUND_QUEUE_CAPACITY", "100")
                    .parse()
                    .ok()
                    .filter(|capacity| *capacity > 0)
                    .unwrap_or(100),
                reminder_interval_secs: or("REMINDER_INTERVAL_SECS", "3600")
                    .parse()
                    .unwrap_or(3600),
                reminder_first_delay_secs: or("REMINDER_FIRST_DELAY_SECS", "10")
                    .parse()
                    .unwrap_or(10),
                display_utc_offset_minutes: or("DISPLAY_UTC_OFFSET_MINUTES", "180")
                    .parse()
                    .unwrap_or(180),
            },
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_ids(raw: &str) -> Result<Vec<i64>, std::num::ParseIntError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}
