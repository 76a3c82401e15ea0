use crate::config::GmailConfig;
use crate::message::OutgoingMessage;
use lettre::Address;

/// The mailbox the Gmail API sends as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderIdentity {
    Account(Address),
    /// Whatever account the credentials were issued for.
    UseAuthenticatedAccount,
}

impl SenderIdentity {
    /// The `userId` path segment of the Gmail API.
    pub fn user_id(&self) -> String {
        match self {
            SenderIdentity::Account(address) => address.to_string(),
            SenderIdentity::UseAuthenticatedAccount => "me".to_string(),
        }
    }
}

/// Sender defaults applied to every outgoing message.
///
/// Gmail rewrites any from address that is not the authenticated one, and drops
/// the from name while doing so. The configured address therefore always wins,
/// while the configured name only fills in a missing one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FromIdentity {
    pub email: Option<Address>,
    pub name: Option<String>,
}

impl FromIdentity {
    pub fn new(email: Option<Address>, name: Option<String>) -> Self {
        Self {
            email,
            name: name.filter(|n| !n.trim().is_empty()),
        }
    }

    pub fn from_config(config: &GmailConfig) -> anyhow::Result<Self> {
        let email = match config.from_google_email.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(
                raw.parse::<Address>()
                    .map_err(|e| anyhow::anyhow!("Invalid from_google_email {}: {}", raw, e))?,
            ),
            _ => None,
        };

        Ok(Self::new(email, config.from_google_name.clone()))
    }

    pub fn apply(&self, mut message: OutgoingMessage) -> OutgoingMessage {
        if let Some(email) = &self.email {
            message.from = Some(email.clone());
        }

        if let Some(name) = &self.name {
            if !message.has_from_name() {
                message.from_name = Some(name.clone());
            }
        }

        message
    }

    pub fn sender_identity(&self) -> SenderIdentity {
        match &self.email {
            Some(email) => SenderIdentity::Account(email.clone()),
            None => SenderIdentity::UseAuthenticatedAccount,
        }
    }
}
