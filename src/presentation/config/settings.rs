use super::Environment;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers what is asked. \
     Don't show the mathematical steps if not asked.";

#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub database: DatabaseSettings,
    pub scaffold: ScaffoldSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub assistant_model: String,
    pub temperature: f32,
    pub system_prompt: String,
    pub run_poll_max_attempts: u32,
    pub run_poll_interval_ms: u64,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
}

/// Scaffold mode swaps the remote model service and Postgres for in-process
/// stand-ins, for local development without credentials.
#[derive(Debug, Clone)]
pub struct ScaffoldSettings {
    pub enabled: bool,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            environment: std::env::var("APP_ENV")
                .ok()
                .and_then(|v| Environment::try_from(v).ok())
                .unwrap_or(Environment::Local),
            server: ServerSettings {
                host: env_or("SERVER_HOST", "0.0.0.0"),
                port: env_parse_or("SERVER_PORT", 3000),
            },
            llm: LlmSettings {
                api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
                base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                chat_model: env_or("CHAT_MODEL", "gpt-4o-mini"),
                assistant_model: env_or("ASSISTANT_MODEL", "gpt-4o-mini"),
                temperature: env_parse_or("LLM_TEMPERATURE", 0.5),
                system_prompt: env_or("SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
                run_poll_max_attempts: env_parse_or("RUN_POLL_MAX_ATTEMPTS", 60),
                run_poll_interval_ms: env_parse_or("RUN_POLL_INTERVAL_MS", 500),
            },
            database: DatabaseSettings {
                url: std::env::var("DATABASE_URL").ok(),
            },
            scaffold: ScaffoldSettings {
                enabled: std::env::var("SCAFFOLD_MODE")
                    .map(|v| v.to_lowercase() == "true" || v == "1")
                    .unwrap_or(false),
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
