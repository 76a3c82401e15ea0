use crate::error::GmailError;
use lettre::Address;
use lettre::message::Mailbox;

/// A message composed once and dispatched to every recipient separately.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub subject: String,
    pub body: String,
    pub body_html: Option<String>,
    pub to: Vec<Mailbox>,
    pub from: Option<Address>,
    pub from_name: Option<String>,
    pub reply_to: Option<Mailbox>,
}

impl OutgoingMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to(mut self, recipient: Mailbox) -> Self {
        self.to.push(recipient);
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn body_html(mut self, html: impl Into<String>) -> Self {
        self.body_html = Some(html.into());
        self
    }

    pub fn from(mut self, address: Address) -> Self {
        self.from = Some(address);
        self
    }

    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = Some(name.into());
        self
    }

    pub fn reply_to(mut self, mailbox: Mailbox) -> Self {
        self.reply_to = Some(mailbox);
        self
    }

    /// True when the message carries a non-blank from name of its own.
    pub fn has_from_name(&self) -> bool {
        self.from_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }
}

/// Who is asking for the send. Only elevated callers see provider diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Privilege {
    #[default]
    Standard,
    Elevated,
}

/// Outcome of dispatching to one recipient.
#[derive(Debug, Clone)]
pub struct RecipientResult {
    pub recipient: Address,
    pub success: bool,
    pub error: Option<GmailError>,
}

impl RecipientResult {
    pub fn sent(recipient: Address) -> Self {
        Self {
            recipient,
            success: true,
            error: None,
        }
    }

    pub fn failed(recipient: Address, error: Option<GmailError>) -> Self {
        Self {
            recipient,
            success: false,
            error,
        }
    }
}

/// Terminal state of a single send call.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Nothing was attempted: no recipients, or the transport could not be resolved.
    Aborted,
    /// Every recipient was attempted, in list order.
    Completed(Vec<RecipientResult>),
}

impl DispatchOutcome {
    /// Number of recipients the provider accepted.
    pub fn sent(&self) -> usize {
        match self {
            DispatchOutcome::Aborted => 0,
            DispatchOutcome::Completed(results) => results.iter().filter(|r| r.success).count(),
        }
    }

    pub fn results(&self) -> &[RecipientResult] {
        match self {
            DispatchOutcome::Aborted => &[],
            DispatchOutcome::Completed(results) => results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn test_builder_keeps_recipient_order() {
        let message = OutgoingMessage::new()
            .to("a@x.com".parse().unwrap())
            .to("Jane Doe <jane@x.com>".parse().unwrap())
            .subject("Hi")
            .body("Body");

        assert_eq!(message.to.len(), 2);
        assert_eq!(message.to[0].email.to_string(), "a@x.com");
        assert_eq!(message.to[1].name.as_deref(), Some("Jane Doe"));
        assert_eq!(message.subject, "Hi");
        assert!(message.body_html.is_none());
    }

    #[test]
    fn test_blank_from_name_is_not_a_name() {
        let message = OutgoingMessage::new().from_name("   ");
        assert!(!message.has_from_name());

        let message = OutgoingMessage::new().from_name("Ops");
        assert!(message.has_from_name());
    }

    #[test]
    fn test_outcome_counts_only_successes() {
        let outcome = DispatchOutcome::Completed(vec![
            RecipientResult::sent(address("a@x.com")),
            RecipientResult::failed(
                address("b@x.com"),
                Some(GmailError::TransportRejected("nope".to_string())),
            ),
            RecipientResult::sent(address("c@x.com")),
        ]);

        assert_eq!(outcome.sent(), 2);
        assert_eq!(outcome.results().len(), 3);
        assert_eq!(DispatchOutcome::Aborted.sent(), 0);
        assert!(DispatchOutcome::Aborted.results().is_empty());
    }
}
