/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: main.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-10-17 09:21:47
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-10-17 11:02:16
 */

mod config;
mod encoder;
mod error;
mod gmail_sender;
mod identity;
#[cfg(test)]
mod log_capture;
mod message;
mod notices;
mod probe;
mod renderer;
mod traits;
mod transport;

use crate::config::AppConfig;
use crate::gmail_sender::GmailSender;
use crate::message::{OutgoingMessage, Privilege};
use crate::notices::{NoticeLevel, NoticeLog};
use clap::{Parser, Subcommand};
use lettre::message::Mailbox;
use log::{error, info, warn};
use rustls::crypto;
use std::io::Write;
use std::sync::Arc;

struct MultiWriter {
    writers: Vec<Box<dyn Write + Send + 'static>>,
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for w in &mut self.writers {
            let _ = w.write(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        for w in &mut self.writers {
            let _ = w.flush();
        }
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    config: Option<String>,

    /// Show decoded provider errors, as an administrator would see them
    #[arg(long, global = true)]
    elevated: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a message to one or more recipients
    Send {
        /// Recipient, either `user@host` or `Name <user@host>`
        #[arg(long = "to", required = true)]
        to: Vec<String>,
        #[arg(short, long)]
        subject: String,
        #[arg(short, long)]
        body: String,
        #[arg(long)]
        html: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        from_name: Option<String>,
        #[arg(long)]
        reply_to: Option<String>,
    },
    /// Send a test message to check the configuration
    Test { address: String },
}

fn initialize_logger(config: &AppConfig) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::new();

    if let Some(level) = &config.log_level {
        builder.parse_filters(level);
    } else if let Ok(env_level) = std::env::var("RUST_LOG") {
        builder.parse_filters(&env_level);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }

    if let Some(log_file) = &config.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", log_file, e))?;

        if config.quiet {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        } else {
            let multi_writer = MultiWriter {
                writers: vec![Box::new(file), Box::new(std::io::stderr())],
            };
            builder.target(env_logger::Target::Pipe(Box::new(multi_writer)));
        }
    } else if config.quiet {
        builder.target(env_logger::Target::Pipe(Box::new(std::io::sink())));
    }

    builder.init();
    Ok(())
}

fn parse_mailbox(value: &str) -> anyhow::Result<Mailbox> {
    value
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address {}: {}", value, e))
}

fn build_message(command: &Command) -> anyhow::Result<OutgoingMessage> {
    let Command::Send {
        to,
        subject,
        body,
        html,
        from,
        from_name,
        reply_to,
    } = command
    else {
        return Err(anyhow::anyhow!("Not a send command"));
    };

    let mut message = OutgoingMessage::new().subject(subject).body(body);
    for recipient in to {
        message = message.to(parse_mailbox(recipient)?);
    }
    if let Some(html) = html {
        message = message.body_html(html);
    }
    if let Some(from) = from {
        let address = from
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid from address {}: {}", from, e))?;
        message = message.from(address);
    }
    if let Some(name) = from_name {
        message = message.from_name(name);
    }
    if let Some(reply_to) = reply_to {
        message = message.reply_to(parse_mailbox(reply_to)?);
    }

    Ok(message)
}

fn print_notices(notices: &NoticeLog) {
    for notice in notices.drain() {
        match notice.level {
            NoticeLevel::Message => println!("{}", notice.text),
            level => eprintln!("{}: {}", level, notice.text),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = crypto::ring::default_provider().install_default();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::new_from_file(path),
        None => AppConfig::new(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Failed to load config: {:?}", e);
        if let Ok(path) = std::env::current_dir() {
            eprintln!("Current search path: {:?}", path);
        }
        eprintln!(
            "Please create a `config.toml` or set APP_... environment variables, \
             or specify a config file with --config."
        );
        std::process::exit(1);
    });

    initialize_logger(&config)?;

    let privilege = if args.elevated {
        Privilege::Elevated
    } else {
        Privilege::Standard
    };

    let notices = Arc::new(NoticeLog::new());
    let sender = GmailSender::new(&config, notices.clone())?;

    let sent = match &args.command {
        command @ Command::Send { .. } => {
            let message = build_message(command)?;
            info!("Sending \"{}\" to {} recipients", message.subject, message.to.len());

            let outcome = sender.dispatch(&message, privilege).await;
            for result in outcome.results().iter().filter(|r| !r.success) {
                match &result.error {
                    Some(e) => warn!("Not delivered to {}: {}", result.recipient, e),
                    None => warn!("Not delivered to {}", result.recipient),
                }
            }
            outcome.sent()
        }
        Command::Test { address } => {
            let recipient = parse_mailbox(address)?;
            let ok =
                probe::send_test_message(&sender, notices.as_ref(), recipient, privilege).await;
            usize::from(ok)
        }
    };

    print_notices(&notices);

    if sent == 0 {
        error!("No messages were sent");
        std::process::exit(1);
    }

    info!("Done, {} messages sent", sent);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_message_from_args() {
        let args = Args::parse_from([
            "gmail-dispatch",
            "send",
            "--to",
            "Jane Doe <jane@x.com>",
            "--to",
            "b@x.com",
            "--subject",
            "Hello",
            "--body",
            "Body",
            "--html",
            "<p>Body</p>",
            "--from-name",
            "Acme",
            "--elevated",
        ]);

        assert!(args.elevated);
        let message = build_message(&args.command).unwrap();
        assert_eq!(message.to.len(), 2);
        assert_eq!(message.to[0].name.as_deref(), Some("Jane Doe"));
        assert_eq!(message.subject, "Hello");
        assert_eq!(message.body_html.as_deref(), Some("<p>Body</p>"));
        assert_eq!(message.from_name.as_deref(), Some("Acme"));
        assert!(message.from.is_none());
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let args = Args::parse_from([
            "gmail-dispatch",
            "send",
            "--to",
            "not an address",
            "--subject",
            "s",
            "--body",
            "b",
        ]);

        assert!(build_message(&args.command).is_err());
    }

    #[test]
    fn test_build_message_needs_send_command() {
        let args = Args::parse_from(["gmail-dispatch", "test", "you@domain.com"]);
        assert!(build_message(&args.command).is_err());
    }
}
