use crate::identity::SenderIdentity;
use crate::message::{OutgoingMessage, Privilege};
use crate::transport::{CredentialedClient, SentMessage};
use async_trait::async_trait;

#[async_trait]
pub trait MailSender: Send + Sync {
    /// Sends the message to each recipient and returns how many the provider accepted
    async fn send(&self, message: &OutgoingMessage, privilege: Privilege) -> usize;
}

/// The dependency that hands out authenticated Google clients.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialProvider: Send + Sync {
    fn client(&self) -> Option<CredentialedClient>;
}

/// An authenticated handle able to submit raw messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GmailTransport: Send + Sync {
    /// `Ok(None)` means the provider answered without a message resource
    async fn send_raw(
        &self,
        sender: &SenderIdentity,
        raw: &str,
    ) -> anyhow::Result<Option<SentMessage>>;
}

#[cfg_attr(test, mockall::automock)]
pub trait TransportFactory: Send + Sync {
    fn create(&self, client: &CredentialedClient) -> anyhow::Result<Box<dyn GmailTransport>>;
}

/// Messages meant for the person operating the sender, not for the logs.
pub trait UserNotices: Send + Sync {
    fn error(&self, text: &str);
    fn warning(&self, text: &str);
    fn message(&self, text: &str);
}
