use std::sync::Arc;
use std::time::Duration;

use staywise_agent::{LlmClient, OpenAiCompatClient};
use staywise_core::config::{AgentConfig, AppConfig};
use staywise_core::{BaseUrlResolver, SearchError};
use staywise_provider::{HotelDataClient, HttpHotelDataClient, UpstreamProxy};
use thiserror::Error;
use tracing::info;

/// Where the chat agent's tools send provider calls.
pub enum HotelDataSource {
    /// Back through this server's `/api/hotels/*` routes.
    SameOrigin { timeout: Duration },
    Fixed(Arc<dyn HotelDataClient>),
}

impl HotelDataSource {
    pub fn client_for(&self, base_url: &str) -> Result<Arc<dyn HotelDataClient>, SearchError> {
        match self {
            Self::SameOrigin { timeout } => {
                let client = HttpHotelDataClient::same_origin(base_url).with_timeout(*timeout)?;
                Ok(Arc::new(client))
            }
            Self::Fixed(client) => Ok(client.clone()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<UpstreamProxy>,
    pub llm: Arc<dyn LlmClient>,
    pub llm_label: String,
    pub agent: AgentConfig,
    pub base_url: BaseUrlResolver,
    pub hotel_data: Arc<HotelDataSource>,
}

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("llm client setup failed: {0}")]
    Llm(String),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let llm = OpenAiCompatClient::from_config(&config.llm)
        .map_err(|error| BootstrapError::Llm(format!("{error:#}")))?;
    let llm_label = format!("{}/{}", config.llm.provider.as_str(), config.llm.model);

    let state = AppState {
        proxy: Arc::new(UpstreamProxy::from_config(&config.provider)),
        llm: Arc::new(llm),
        llm_label,
        agent: config.agent.clone(),
        base_url: BaseUrlResolver::from_server_config(&config.server),
        hotel_data: Arc::new(HotelDataSource::SameOrigin {
            timeout: Duration::from_secs(config.provider.timeout_secs),
        }),
    };

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        provider_key_configured = config.provider.has_api_key(),
        llm = %state.llm_label,
        "application state initialized"
    );

    Ok(Application { config, state })
}

#[cfg(test)]
mod tests {
    use staywise_core::config::AppConfig;

    use crate::bootstrap::{bootstrap_with_config, BootstrapError};

    #[test]
    fn default_config_bootstraps_without_provider_key() {
        let app = bootstrap_with_config(AppConfig::default()).expect("defaults should bootstrap");

        assert!(!app.state.proxy.has_api_key());
        assert_eq!(app.state.llm_label, "ollama/llama3.1");
        assert_eq!(app.state.base_url.resolve(None), "http://localhost:3000");
        assert_eq!(app.state.agent.max_steps, 5);
    }

    #[test]
    fn ollama_without_base_url_fails_fast() {
        let mut config = AppConfig::default();
        config.llm.base_url = None;

        let result = bootstrap_with_config(config);
        assert!(matches!(result, Err(BootstrapError::Llm(message)) if message.contains("base_url")));
    }
}
