use crate::message::{OutgoingMessage, Privilege};
use crate::traits::{MailSender, UserNotices};
use lettre::message::Mailbox;
use log::info;

const SENDER_NAME: &str = "GmailSender";

/// Build the one-off message used to check that sending works end to end.
pub fn test_message(recipient: Mailbox) -> OutgoingMessage {
    let head = "This is a test";
    let body = format!(
        "This is a test of the {} module. This is only a test. \
         If you have received this message, it means the module is working!",
        SENDER_NAME
    );

    OutgoingMessage::new()
        .to(recipient)
        .subject(format!("{} Test Message", SENDER_NAME))
        .body(format!("{}\n\n{}", head, body))
        .body_html(format!(
            "<html><body><h1>{}</h1><p>{}</p></body></html>",
            head, body
        ))
}

/// Send a test message and report the result to the user.
pub async fn send_test_message(
    sender: &dyn MailSender,
    notices: &dyn UserNotices,
    recipient: Mailbox,
    privilege: Privilege,
) -> bool {
    let address = recipient.email.clone();
    info!("Sending test message to {}", address);

    if sender.send(&test_message(recipient), privilege).await > 0 {
        notices.message(&format!("Message successfully sent to {}", address));
        true
    } else {
        notices.warning(&format!("Message failed to send to {}", address));
        false
    }
}
