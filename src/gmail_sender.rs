use crate::config::AppConfig;
use crate::encoder;
use crate::error::GmailError;
use crate::identity::{FromIdentity, SenderIdentity};
use crate::message::{DispatchOutcome, OutgoingMessage, Privilege, RecipientResult};
use crate::renderer::{MessageRenderer, MimeRenderer, RenderedMessage};
use crate::traits::{
    CredentialProvider, GmailTransport, MailSender, TransportFactory, UserNotices,
};
use crate::transport::{GmailApiTransportFactory, StaticTokenProvider, TransportResolver};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use lettre::message::Mailbox;
use log::{debug, error, info, warn};
use std::sync::Arc;

#[cfg(test)]
#[path = "./gmail_sender_tests.rs"]
mod gmail_sender_tests;

/// Sends one composed message to each recipient through the Gmail API.
pub struct GmailSender {
    identity: FromIdentity,
    resolver: TransportResolver,
    renderer: Arc<dyn MessageRenderer>,
    notices: Arc<dyn UserNotices>,
    concurrency: usize,
}

impl GmailSender {
    pub fn new(config: &AppConfig, notices: Arc<dyn UserNotices>) -> anyhow::Result<Self> {
        let identity = FromIdentity::from_config(&config.gmail)?;
        let provider = config
            .credentials
            .clone()
            .map(|c| Arc::new(StaticTokenProvider::new(c)) as Arc<dyn CredentialProvider>);

        Ok(Self::new_with_parts(
            identity,
            provider,
            Arc::new(GmailApiTransportFactory),
            notices,
        )
        .with_concurrency(config.gmail.concurrency()))
    }

    pub fn new_with_parts(
        identity: FromIdentity,
        provider: Option<Arc<dyn CredentialProvider>>,
        factory: Arc<dyn TransportFactory>,
        notices: Arc<dyn UserNotices>,
    ) -> Self {
        Self {
            identity,
            resolver: TransportResolver::new(provider, factory, notices.clone()),
            renderer: Arc::new(MimeRenderer),
            notices,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[allow(dead_code)]
    pub fn with_renderer(mut self, renderer: Arc<dyn MessageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Send to every recipient and report each outcome, in recipient order.
    pub async fn dispatch(
        &self,
        message: &OutgoingMessage,
        privilege: Privilege,
    ) -> DispatchOutcome {
        if message.to.is_empty() {
            warn!("Refusing to send a message without recipients");
            return DispatchOutcome::Aborted;
        }

        let transport = match self.resolver.resolve().await {
            Ok(transport) => transport,
            Err(e) => {
                debug!("Gmail transport unavailable, nothing sent: {}", e);
                return DispatchOutcome::Aborted;
            }
        };

        let message = self.identity.apply(message.clone());
        let rendered = self.renderer.render(&message);
        let sender = self.identity.sender_identity();

        let pending: Vec<_> = message
            .to
            .iter()
            .map(|recipient| {
                self.dispatch_to(transport.as_ref(), recipient, &rendered, &sender, privilege)
            })
            .collect();
        let results = stream::iter(pending)
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let outcome = DispatchOutcome::Completed(results);
        info!(
            "Sent {} of {} messages via Gmail",
            outcome.sent(),
            message.to.len()
        );
        outcome
    }

    async fn dispatch_to(
        &self,
        transport: &dyn GmailTransport,
        recipient: &Mailbox,
        rendered: &RenderedMessage,
        sender: &SenderIdentity,
        privilege: Privilege,
    ) -> RecipientResult {
        let raw = encoder::encode(
            &recipient.email,
            recipient.name.as_deref(),
            &rendered.subject,
            &rendered.header,
            &rendered.body,
        );

        match transport.send_raw(sender, &raw).await {
            Ok(Some(sent)) => {
                debug!("Sent to {} as Gmail message {}", recipient.email, sent.id);
                RecipientResult::sent(recipient.email.clone())
            }
            Ok(None) => {
                warn!("Gmail returned no message for {}", recipient.email);
                RecipientResult::failed(recipient.email.clone(), None)
            }
            Err(e) => {
                let text = e.to_string();
                error!("Failed to send to {}: {}", recipient.email, text);
                if privilege == Privilege::Elevated {
                    self.notices.error(&readable_provider_error(&text));
                }
                RecipientResult::failed(
                    recipient.email.clone(),
                    Some(GmailError::TransportRejected(text)),
                )
            }
        }
    }
}

/// Provider errors arrive as JSON documents; pretty-print them when they parse.
fn readable_provider_error(text: &str) -> String {
    if text.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
            if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                return pretty;
            }
        }
    }
    text.to_string()
}

#[async_trait]
impl MailSender for GmailSender {
    async fn send(&self, message: &OutgoingMessage, privilege: Privilege) -> usize {
        self.dispatch(message, privilege).await.sent()
    }
}
