use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use serde_json::{json, Value};
use staywise_cli::commands::{chat, config, decode, rates};

#[test]
fn decode_returns_structured_intent() {
    let result = decode::run("Lisbon from 2025-05-01 to 2025-05-04 for 2 adults");
    assert_eq!(result.exit_code, 0, "expected successful decode");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "decode");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["data"]["checkin"], "2025-05-01");
    assert_eq!(payload["data"]["checkout"], "2025-05-04");
    assert_eq!(payload["data"]["adults"], 2);
    assert!(payload["data"].get("children").is_none());
}

#[test]
fn decode_rejects_blank_text() {
    let result = decode::run("   ");
    assert_eq!(result.exit_code, 2);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "invalid_input");
}

#[test]
fn rates_ranks_saved_response_cheapest_first() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("rates.json");
    let response = json!({
        "data": [
            { "hotelId": "pricey", "roomTypes": [{ "rates": [{ "retailRate": { "total": [{ "amount": 310, "currency": "EUR" }] } }] }] },
            { "hotelId": "budget", "roomTypes": [{ "rates": [{ "retailRate": { "total": [{ "amount": 95, "currency": "EUR" }] } }] }] }
        ]
    });
    fs::write(&path, response.to_string()).expect("write fixture");

    let ranked = parse_payload(&rates::run(&path, true).output);
    assert_eq!(ranked["status"], "ok");
    assert_eq!(ranked["message"], "ranked 2 hotels");
    assert_eq!(ranked["data"]["kind"], "hotels");
    assert_eq!(ranked["data"]["hotels"][0]["hotel_id"], "budget");

    let provider_order = parse_payload(&rates::run(&path, false).output);
    assert_eq!(provider_order["data"]["hotels"][0]["hotel_id"], "pricey");
}

#[test]
fn rates_reports_empty_and_error_responses() {
    let dir = tempfile::tempdir().expect("temp dir");
    let empty = dir.path().join("empty.json");
    fs::write(&empty, "{\"data\":[]}").expect("write fixture");
    let failed = dir.path().join("failed.json");
    fs::write(&failed, "{\"error\":{\"code\":4002,\"message\":\"no availability\"}}")
        .expect("write fixture");

    let empty_payload = parse_payload(&rates::run(&empty, true).output);
    assert_eq!(empty_payload["message"], "No hotel rates found");
    assert_eq!(empty_payload["data"]["kind"], "no_results");

    let failed_payload = parse_payload(&rates::run(&failed, true).output);
    assert_eq!(failed_payload["message"], "Error: 4002");
    assert_eq!(failed_payload["data"]["kind"], "error");
}

#[test]
fn rates_fails_for_missing_or_malformed_file() {
    let dir = tempfile::tempdir().expect("temp dir");

    let missing = rates::run(&dir.path().join("absent.json"), true);
    assert_eq!(missing.exit_code, 2);
    assert_eq!(parse_payload(&missing.output)["error_class"], "file_read");

    let malformed_path = dir.path().join("bad.json");
    fs::write(&malformed_path, "not json").expect("write fixture");
    let malformed = rates::run(&malformed_path, true);
    assert_eq!(malformed.exit_code, 3);
    assert_eq!(parse_payload(&malformed.output)["error_class"], "invalid_response");
}

#[test]
fn chat_requires_provider_key() {
    with_env(&[], || {
        let result = chat::run("hotels in Porto");
        assert_eq!(result.exit_code, 3, "expected provider setup failure");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "chat");
        assert_eq!(payload["error_class"], "provider_setup");
    });
}

#[test]
fn chat_reports_config_failure() {
    with_env(&[("STAYWISE_LLM_PROVIDER", "openai")], || {
        let result = chat::run("hotels in Porto");
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn config_redacts_keys_and_attributes_env_sources() {
    with_env(
        &[("LITEAPI_API_KEY", "sand_0123456789"), ("STAYWISE_AGENT_MAX_STEPS", "4")],
        || {
            let output = config::run();

            assert!(output.contains("- provider.api_key = sand_*** (source: env (LITEAPI_API_KEY))"));
            assert!(output.contains("- agent.max_steps = 4 (source: env (STAYWISE_AGENT_MAX_STEPS))"));
            assert!(output.contains("- llm.api_key = <unset> (source: default)"));
            assert!(!output.contains("0123456789"));
        },
    );
}

#[test]
fn config_render_attributes_file_sources() {
    with_env(&[], || {
        let doc: toml::Value = "[llm]\nmodel = \"qwen2.5\"\n".parse().expect("toml");
        let mut app_config = staywise_core::config::AppConfig::default();
        app_config.llm.model = "qwen2.5".to_string();

        let output = config::render(&app_config, Some(&doc), Some(std::path::Path::new("staywise.toml")));

        assert!(output.contains("- llm.model = qwen2.5 (source: file (staywise.toml))"));
        assert!(output.contains("- server.port = 3000 (source: default)"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "STAYWISE_PROVIDER_API_KEY",
        "LITEAPI_API_KEY",
        "STAYWISE_PROVIDER_BASE_URL",
        "STAYWISE_PROVIDER_TIMEOUT_SECS",
        "STAYWISE_LLM_PROVIDER",
        "STAYWISE_LLM_API_KEY",
        "STAYWISE_LLM_BASE_URL",
        "STAYWISE_LLM_MODEL",
        "STAYWISE_LLM_TIMEOUT_SECS",
        "STAYWISE_LLM_MAX_RETRIES",
        "STAYWISE_AGENT_MAX_STEPS",
        "STAYWISE_AGENT_LANGUAGE",
        "STAYWISE_AGENT_CURRENCY",
        "STAYWISE_AGENT_GUEST_NATIONALITY",
        "STAYWISE_SERVER_BIND_ADDRESS",
        "STAYWISE_SERVER_PORT",
        "STAYWISE_SERVER_PUBLIC_BASE_URL",
        "STAYWISE_BASE_URL",
        "STAYWISE_LOGGING_LEVEL",
        "STAYWISE_LOGGING_FORMAT",
        "STAYWISE_LOG_LEVEL",
        "STAYWISE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
