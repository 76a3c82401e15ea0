use crate::config::CredentialsConfig;
use crate::error::GmailError;
use crate::identity::SenderIdentity;
use crate::traits::{CredentialProvider, GmailTransport, TransportFactory, UserNotices};
use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

const COMPONENT: &str = "GmailSender";

/// An OAuth client authorized for the `gmail.send` scope of one account.
#[derive(Clone)]
pub struct CredentialedClient {
    pub access_token: String,
    pub api_base: String,
}

impl fmt::Debug for CredentialedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialedClient")
            .field("access_token", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Serves a pre-acquired access token from configuration.
pub struct StaticTokenProvider {
    config: CredentialsConfig,
}

impl StaticTokenProvider {
    pub fn new(config: CredentialsConfig) -> Self {
        Self { config }
    }
}

impl CredentialProvider for StaticTokenProvider {
    fn client(&self) -> Option<CredentialedClient> {
        let token = self.config.access_token.as_deref().map(str::trim)?;
        if token.is_empty() {
            return None;
        }

        let api_base = self
            .config
            .api_base
            .as_deref()
            .map(|base| base.trim_end_matches('/'))
            .filter(|base| !base.is_empty())
            .unwrap_or(GMAIL_API_BASE);

        Some(CredentialedClient {
            access_token: token.to_string(),
            api_base: api_base.to_string(),
        })
    }
}

/// The message resource Gmail returns for an accepted send.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub id: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub thread_id: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    pub label_ids: Vec<String>,
}

pub struct GmailApiTransport {
    client: Client,
    access_token: String,
    api_base: Url,
}

impl GmailApiTransport {
    fn send_url(&self, sender: &SenderIdentity) -> anyhow::Result<Url> {
        let user_id = sender.user_id();
        let mut url = self.api_base.clone();
        // Segments are percent-encoded, so `#`, `/` or `?` in an address stay in the path
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Invalid Gmail API base: {}", self.api_base))?
            .pop_if_empty()
            .extend(["gmail", "v1", "users", user_id.as_str(), "messages", "send"]);
        Ok(url)
    }
}

#[async_trait]
impl GmailTransport for GmailApiTransport {
    async fn send_raw(
        &self,
        sender: &SenderIdentity,
        raw: &str,
    ) -> anyhow::Result<Option<SentMessage>> {
        let url = self.send_url(sender)?;
        let payload = serde_json::json!({ "raw": raw });

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Gmail API request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            // Google answers with a JSON error document, pass it through untouched
            let text = response.text().await.unwrap_or_default();
            if text.trim().is_empty() {
                return Err(anyhow::anyhow!("Gmail API error: {}", status));
            }
            return Err(anyhow::anyhow!("{}", text));
        }

        let sent = response
            .json::<Option<SentMessage>>()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse Gmail response: {}", e))?;

        if let Some(sent) = &sent {
            debug!("Gmail accepted message {}", sent.id);
        }
        Ok(sent)
    }
}

pub struct GmailApiTransportFactory;

impl TransportFactory for GmailApiTransportFactory {
    fn create(&self, client: &CredentialedClient) -> anyhow::Result<Box<dyn GmailTransport>> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        let api_base = Url::parse(&client.api_base)
            .map_err(|e| anyhow::anyhow!("Invalid Gmail API base {}: {}", client.api_base, e))?;

        Ok(Box::new(GmailApiTransport {
            client: http,
            access_token: client.access_token.clone(),
            api_base,
        }))
    }
}

/// Acquires the Gmail transport on first use and keeps the outcome for the
/// lifetime of the sender. A failed acquisition is not retried.
pub struct TransportResolver {
    provider: Option<Arc<dyn CredentialProvider>>,
    factory: Arc<dyn TransportFactory>,
    notices: Arc<dyn UserNotices>,
    handle: OnceCell<Result<Arc<dyn GmailTransport>, GmailError>>,
}

impl TransportResolver {
    pub fn new(
        provider: Option<Arc<dyn CredentialProvider>>,
        factory: Arc<dyn TransportFactory>,
        notices: Arc<dyn UserNotices>,
    ) -> Self {
        Self {
            provider,
            factory,
            notices,
            handle: OnceCell::new(),
        }
    }

    fn acquire(&self) -> Result<Arc<dyn GmailTransport>, GmailError> {
        let provider = self.provider.as_ref().ok_or(GmailError::DependencyMissing)?;
        let client = provider.client().ok_or(GmailError::CredentialUnavailable)?;
        let transport = self
            .factory
            .create(&client)
            .map_err(|e| GmailError::HandleConstructionFailed(e.to_string()))?;

        Ok(Arc::from(transport))
    }

    pub async fn resolve(&self) -> Result<Arc<dyn GmailTransport>, GmailError> {
        self.handle
            .get_or_init(|| async {
                let resolved = self.acquire();
                if let Err(e) = &resolved {
                    let text = format!("{}: {}", COMPONENT, e);
                    self.notices.error(&text);
                    error!("{}", text);
                }
                resolved
            })
            .await
            .clone()
    }
}
