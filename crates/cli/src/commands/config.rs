use std::env;
use std::fs;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use staywise_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    render(&config, config_file_doc.as_ref(), config_file_path.as_deref())
}

pub fn render(config: &AppConfig, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    let source = |key_path: &str, env_keys: &[&str]| field_source(key_path, env_keys, file_doc, file_path);

    let provider_key = redact_secret(config.provider.api_key.as_ref());
    let llm_key = redact_secret(config.llm.api_key.as_ref());

    let lines = vec![
        "effective config (source precedence: env > file > default):".to_string(),
        render_line(
            "provider.api_key",
            &provider_key,
            source("provider.api_key", &["STAYWISE_PROVIDER_API_KEY", "LITEAPI_API_KEY"]),
        ),
        render_line(
            "provider.base_url",
            &config.provider.base_url,
            source("provider.base_url", &["STAYWISE_PROVIDER_BASE_URL"]),
        ),
        render_line(
            "provider.timeout_secs",
            &config.provider.timeout_secs.to_string(),
            source("provider.timeout_secs", &["STAYWISE_PROVIDER_TIMEOUT_SECS"]),
        ),
        render_line(
            "llm.provider",
            config.llm.provider.as_str(),
            source("llm.provider", &["STAYWISE_LLM_PROVIDER"]),
        ),
        render_line("llm.model", &config.llm.model, source("llm.model", &["STAYWISE_LLM_MODEL"])),
        render_line(
            "llm.base_url",
            config.llm.base_url.as_deref().unwrap_or("<unset>"),
            source("llm.base_url", &["STAYWISE_LLM_BASE_URL"]),
        ),
        render_line("llm.api_key", &llm_key, source("llm.api_key", &["STAYWISE_LLM_API_KEY"])),
        render_line(
            "llm.max_retries",
            &config.llm.max_retries.to_string(),
            source("llm.max_retries", &["STAYWISE_LLM_MAX_RETRIES"]),
        ),
        render_line(
            "agent.max_steps",
            &config.agent.max_steps.to_string(),
            source("agent.max_steps", &["STAYWISE_AGENT_MAX_STEPS"]),
        ),
        render_line(
            "agent.currency",
            &config.agent.currency,
            source("agent.currency", &["STAYWISE_AGENT_CURRENCY"]),
        ),
        render_line(
            "agent.guest_nationality",
            &config.agent.guest_nationality,
            source("agent.guest_nationality", &["STAYWISE_AGENT_GUEST_NATIONALITY"]),
        ),
        render_line(
            "server.bind_address",
            &config.server.bind_address,
            source("server.bind_address", &["STAYWISE_SERVER_BIND_ADDRESS"]),
        ),
        render_line(
            "server.port",
            &config.server.port.to_string(),
            source("server.port", &["STAYWISE_SERVER_PORT"]),
        ),
        render_line(
            "server.public_base_url",
            config.server.public_base_url.as_deref().unwrap_or("<unset>"),
            source("server.public_base_url", &["STAYWISE_SERVER_PUBLIC_BASE_URL", "STAYWISE_BASE_URL"]),
        ),
        render_line(
            "logging.level",
            &config.logging.level,
            source("logging.level", &["STAYWISE_LOGGING_LEVEL", "STAYWISE_LOG_LEVEL"]),
        ),
        render_line(
            "logging.format",
            config.logging.format.as_str(),
            source("logging.format", &["STAYWISE_LOGGING_FORMAT", "STAYWISE_LOG_FORMAT"]),
        ),
    ];

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    // Provider keys carry an environment prefix such as `sand_` or `prod_`.
    if let Some((prefix, _)) = trimmed.split_once('_') {
        return format!("{prefix}_***");
    }

    "<redacted>".to_string()
}
