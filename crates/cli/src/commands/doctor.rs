use serde::Serialize;
use staywise_agent::OpenAiCompatClient;
use staywise_core::config::{AppConfig, LoadOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report(AppConfig::load(LoadOptions::default()).map_err(|error| error.to_string()));

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(config: Result<AppConfig, String>) -> DoctorReport {
    let mut checks = Vec::new();

    match config {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_provider_key(&config));
            checks.push(check_llm_client(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error,
            });
            for name in ["provider_key_readiness", "llm_client_readiness"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_provider_key(config: &AppConfig) -> DoctorCheck {
    match config.provider.require_api_key() {
        Ok(_) => DoctorCheck {
            name: "provider_key_readiness",
            status: CheckStatus::Pass,
            details: format!("provider key configured for `{}`", config.provider.base_url),
        },
        Err(error) => DoctorCheck {
            name: "provider_key_readiness",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_llm_client(config: &AppConfig) -> DoctorCheck {
    match OpenAiCompatClient::from_config(&config.llm) {
        Ok(client) => DoctorCheck {
            name: "llm_client_readiness",
            status: CheckStatus::Pass,
            details: format!("{} model `{}` at `{}`", config.llm.provider.as_str(), config.llm.model, client.endpoint()),
        },
        Err(error) => DoctorCheck {
            name: "llm_client_readiness",
            status: CheckStatus::Fail,
            details: format!("{error:#}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use staywise_core::config::AppConfig;

    use super::{build_report, render_human, CheckStatus};

    #[test]
    fn defaults_fail_only_on_missing_provider_key() {
        let report = build_report(Ok(AppConfig::default()));

        assert_eq!(report.overall_status, CheckStatus::Fail);
        let statuses: Vec<_> = report.checks.iter().map(|check| (check.name, check.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("config_validation", CheckStatus::Pass),
                ("provider_key_readiness", CheckStatus::Fail),
                ("llm_client_readiness", CheckStatus::Pass),
            ]
        );
    }

    #[test]
    fn configured_key_passes_every_check() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some(SecretString::from("sand_key".to_string()));

        let report = build_report(Ok(config));

        assert_eq!(report.overall_status, CheckStatus::Pass);
        assert!(render_human(&report).starts_with("doctor: all readiness checks passed"));
    }

    #[test]
    fn failed_config_skips_dependent_checks() {
        let report = build_report(Err("llm.model must not be empty".to_string()));

        assert_eq!(report.checks.len(), 3);
        assert!(report.checks[1..].iter().all(|check| check.status == CheckStatus::Skipped));
        assert!(render_human(&report).contains("- [fail] config_validation: llm.model must not be empty"));
    }
}
