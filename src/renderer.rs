use crate::encoder::{bundle_address, encode_header_word};
use crate::message::OutgoingMessage;

const MAILER: &str = "gmail-dispatch";

/// Header block, body block and encoded subject, rendered once per send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub header: String,
    pub body: String,
    pub subject: String,
}

pub trait MessageRenderer: Send + Sync {
    /// Render everything but the `To:` and `Subject:` lines.
    fn render(&self, message: &OutgoingMessage) -> RenderedMessage;
}

/// Renders plain, HTML or multipart/alternative messages.
#[derive(Debug, Default)]
pub struct MimeRenderer;

impl MimeRenderer {
    fn boundary() -> String {
        format!("==Multipart_Boundary_x{}x", uuid::Uuid::new_v4().simple())
    }

    pub fn encode_subject(subject: &str) -> String {
        let subject: String = subject.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
        encode_header_word(subject.trim())
    }

    fn part(content_type: &str, content: &str) -> String {
        format!(
            "Content-Type: {}; charset=utf-8\r\nContent-Transfer-Encoding: 8bit\r\n\r\n{}",
            content_type, content
        )
    }
}

impl MessageRenderer for MimeRenderer {
    fn render(&self, message: &OutgoingMessage) -> RenderedMessage {
        let mut headers = Vec::new();

        if let Some(from) = &message.from {
            headers.push(format!(
                "From: {}",
                bundle_address(from, message.from_name.as_deref())
            ));
        }
        if let Some(reply_to) = &message.reply_to {
            headers.push(format!(
                "Reply-To: {}",
                bundle_address(&reply_to.email, reply_to.name.as_deref())
            ));
        }
        headers.push(format!("Date: {}", chrono::Local::now().to_rfc2822()));
        headers.push("MIME-Version: 1.0".to_string());
        headers.push(format!("X-Mailer: {}", MAILER));

        let html = message.body_html.as_deref().filter(|h| !h.is_empty());
        let body = match html {
            Some(html) if !message.body.is_empty() => {
                let boundary = Self::boundary();
                headers.push(format!(
                    "Content-Type: multipart/alternative; boundary=\"{}\"",
                    boundary
                ));
                format!(
                    "This is a multi-part message in MIME format.\r\n\r\n\
                     --{b}\r\n{plain}\r\n\r\n\
                     --{b}\r\n{html}\r\n\r\n\
                     --{b}--\r\n",
                    b = boundary,
                    plain = Self::part("text/plain", &message.body),
                    html = Self::part("text/html", html),
                )
            }
            Some(html) => {
                headers.push("Content-Type: text/html; charset=utf-8".to_string());
                headers.push("Content-Transfer-Encoding: 8bit".to_string());
                html.to_string()
            }
            None => {
                headers.push("Content-Type: text/plain; charset=utf-8".to_string());
                headers.push("Content-Transfer-Encoding: 8bit".to_string());
                message.body.clone()
            }
        };

        RenderedMessage {
            header: headers.join("\r\n"),
            body,
            subject: Self::encode_subject(&message.subject),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutgoingMessage {
        OutgoingMessage::new()
            .to("a@x.com".parse().unwrap())
            .from("me@gmail.com".parse().unwrap())
            .from_name("Acme Support")
            .subject("Hello")
            .body("Plain body")
    }

    #[test]
    fn test_plain_message() {
        let rendered = MimeRenderer.render(&message());

        assert!(rendered.header.starts_with("From: Acme Support <me@gmail.com>\r\n"));
        assert!(rendered.header.contains("\r\nDate: "));
        assert!(rendered.header.contains("\r\nMIME-Version: 1.0\r\n"));
        assert!(rendered.header.contains("Content-Type: text/plain; charset=utf-8"));
        assert!(!rendered.header.ends_with("\r\n"));
        assert!(!rendered.header.contains("\r\n\r\n"));
        assert_eq!(rendered.body, "Plain body");
        assert_eq!(rendered.subject, "Hello");
    }

    #[test]
    fn test_multipart_message_shares_one_boundary() {
        let rendered = MimeRenderer.render(&message().body_html("<p>Html body</p>"));

        let boundary = rendered
            .header
            .split("boundary=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap()
            .to_string();

        assert!(rendered.header.contains("multipart/alternative"));
        assert_eq!(rendered.body.matches(&format!("--{}\r\n", boundary)).count(), 2);
        assert!(rendered.body.ends_with(&format!("--{}--\r\n", boundary)));
        let part_head = "charset=utf-8\r\nContent-Transfer-Encoding: 8bit\r\n\r\n";
        assert!(
            rendered
                .body
                .contains(&format!("text/plain; {}Plain body", part_head))
        );
        assert!(
            rendered
                .body
                .contains(&format!("text/html; {}<p>Html body</p>", part_head))
        );
    }

    #[test]
    fn test_html_only_message() {
        let rendered = MimeRenderer.render(&message().body("").body_html("<p>Only</p>"));
        assert!(rendered.header.contains("Content-Type: text/html; charset=utf-8"));
        assert_eq!(rendered.body, "<p>Only</p>");
    }

    #[test]
    fn test_reply_to_and_missing_from() {
        let mut msg = message().reply_to("Help Desk <help@x.com>".parse().unwrap());
        msg.from = None;

        let rendered = MimeRenderer.render(&msg);
        assert!(!rendered.header.contains("From:"));
        assert!(rendered.header.starts_with("Reply-To: Help Desk <help@x.com>\r\n"));
    }

    #[test]
    fn test_subject_encoding() {
        assert_eq!(MimeRenderer::encode_subject("Hi\r\nBcc: x@y.z"), "HiBcc: x@y.z");
        assert_eq!(MimeRenderer::encode_subject("Grüße"), "=?utf-8?B?R3LDvMOfZQ==?=");
    }
}
