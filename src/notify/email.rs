// src/notify/email.rs

use crate::domain::Listing;
use crate::notify::{templates, Notifier, NotifyError};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::Error as SmtpError;
use lettre::{Message, SmtpTransport, Transport};
use tracing::warn;

// Permanent replies a server gives about one mailbox at RCPT/DATA time.
// Anything else (greeting, EHLO, STARTTLS, AUTH, 421...) refuses the session.
const RECIPIENT_REFUSALS: [u16; 4] = [550, 551, 552, 553];

pub struct EmailNotifier {
    transport: SmtpTransport,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    /// STARTTLS relay with an authenticated login as `from_email`.
    pub fn new(
        from_email: &str,
        password: &str,
        to_email: &[String],
        smtp_host: &str,
        smtp_port: u16,
    ) -> Result<Self, NotifyError> {
        let (from, to) = parse_addresses(from_email, to_email)?;

        let transport = SmtpTransport::starttls_relay(smtp_host)
            .map_err(|e| NotifyError::Config(format!("SMTP transport error: {e}")))?
            .port(smtp_port)
            .credentials(Credentials::new(from_email.to_string(), password.to_string()))
            .build();

        Ok(Self { transport, from, to })
    }

    /// Plain SMTP to a server on loopback, no TLS and no login.
    #[cfg(test)]
    pub(crate) fn unencrypted(port: u16, from_email: &str, to_email: &[String]) -> Result<Self, NotifyError> {
        let (from, to) = parse_addresses(from_email, to_email)?;
        let transport = SmtpTransport::builder_dangerous("127.0.0.1").port(port).build();
        Ok(Self { transport, from, to })
    }

    fn build_message(&self, recipient: &Mailbox, listing: &Listing) -> Result<Message, NotifyError> {
        Message::builder()
            .from(self.from.clone())
            .to(recipient.clone())
            .subject(templates::TITLE)
            .multipart(MultiPart::alternative_plain_html(
                templates::listing_text(listing),
                templates::listing_email(listing).into_string(),
            ))
            .map_err(|e| NotifyError::Rejected(format!("Failed to build email: {e}")))
    }
}

fn parse_addresses(from_email: &str, to_email: &[String]) -> Result<(Mailbox, Vec<Mailbox>), NotifyError> {
    let from: Mailbox = from_email
        .parse()
        .map_err(|e| NotifyError::Config(format!("Invalid from address: {e}")))?;

    let to = to_email
        .iter()
        .map(|addr| {
            addr.parse::<Mailbox>()
                .map_err(|e| NotifyError::Config(format!("Invalid recipient {addr}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if to.is_empty() {
        return Err(NotifyError::Config("No recipients configured".into()));
    }
    Ok((from, to))
}

fn refuses_recipient_only(e: &SmtpError) -> bool {
    e.is_permanent()
        && e.status()
            .is_some_and(|code| RECIPIENT_REFUSALS.contains(&u16::from(code)))
}

impl Notifier for EmailNotifier {
    /// One message per recipient. A recipient the server refuses does not
    /// stop the others. A refused session, a lost connection, or every
    /// recipient refused means nothing was delivered.
    fn notify(&self, listing: &Listing) -> Result<(), NotifyError> {
        let mut refused = Vec::new();

        for recipient in &self.to {
            let email = match self.build_message(recipient, listing) {
                Ok(email) => email,
                Err(e) => {
                    warn!("Skipping {recipient}: {e}");
                    refused.push(recipient.to_string());
                    continue;
                }
            };

            match self.transport.send(&email) {
                Ok(_) => {}
                Err(e) if refuses_recipient_only(&e) => {
                    warn!("SMTP server refused mail to {recipient}: {e}");
                    refused.push(recipient.to_string());
                }
                Err(e) if e.is_transient() || e.is_permanent() => {
                    return Err(NotifyError::Undelivered(format!(
                        "SMTP server refused the session: {e}"
                    )));
                }
                Err(e) => return Err(NotifyError::Connection(e.to_string())),
            }
        }

        if refused.is_empty() {
            Ok(())
        } else if refused.len() == self.to.len() {
            Err(NotifyError::Undelivered(format!(
                "every recipient refused: {}",
                refused.join(", ")
            )))
        } else {
            Err(NotifyError::Rejected(format!(
                "not delivered to {}",
                refused.join(", ")
            )))
        }
    }

    fn name(&self) -> &str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::fake_smtp;
    use std::sync::atomic::Ordering;

    fn studio() -> Listing {
        Listing {
            id: None,
            name: "Studio".into(),
            url: "http://x".into(),
            price: 1800.0,
            bedroom_count: 1,
            neighborhood_label: "mission".into(),
            location: None,
            posted: None,
        }
    }

    fn recipients() -> Vec<String> {
        vec!["a@example.com".into(), "b@example.com".into()]
    }

    #[test]
    fn rejects_bad_addresses_up_front() {
        let err = EmailNotifier::new("not an address", "pw", &["a@example.com".into()], "smtp.example.com", 587)
            .err()
            .unwrap();
        assert!(matches!(err, NotifyError::Config(_)));

        let err = EmailNotifier::new("me@example.com", "pw", &["nope".into()], "smtp.example.com", 587)
            .err()
            .unwrap();
        assert!(err.to_string().contains("nope"));

        let err = EmailNotifier::new("me@example.com", "pw", &[], "smtp.example.com", 587)
            .err()
            .unwrap();
        assert!(matches!(err, NotifyError::Config(_)));
    }

    #[test]
    fn builds_multipart_message_per_recipient() {
        let notifier = EmailNotifier::new("me@example.com", "pw", &recipients(), "smtp.example.com", 587).unwrap();

        let msg = notifier.build_message(&notifier.to[1], &studio()).unwrap();
        let raw = String::from_utf8(msg.formatted()).unwrap();
        assert!(raw.contains("To: b@example.com"));
        assert!(raw.contains("Subject: New apartment found!"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[test]
    fn delivers_to_every_recipient() {
        let (port, delivered) = fake_smtp("220 localhost ESMTP\r\n", &[]);
        let notifier = EmailNotifier::unencrypted(port, "me@example.com", &recipients()).unwrap();

        notifier.notify(&studio()).unwrap();
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn refused_greeting_means_nothing_was_delivered() {
        let (port, delivered) = fake_smtp("554 5.7.1 Service unavailable\r\n", &[]);
        let notifier = EmailNotifier::unencrypted(port, "me@example.com", &recipients()).unwrap();

        let err = notifier.notify(&studio()).unwrap_err();
        assert!(matches!(err, NotifyError::Undelivered(_)), "got {err:?}");
        assert!(!err.is_partial());
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn one_refused_recipient_is_partial() {
        let (port, delivered) = fake_smtp("220 localhost ESMTP\r\n", &["a@example.com"]);
        let notifier = EmailNotifier::unencrypted(port, "me@example.com", &recipients()).unwrap();

        let err = notifier.notify(&studio()).unwrap_err();
        assert!(err.is_partial(), "got {err:?}");
        assert!(err.to_string().contains("a@example.com"));
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn every_recipient_refused_is_not_partial() {
        let (port, delivered) = fake_smtp("220 localhost ESMTP\r\n", &["a@example.com", "b@example.com"]);
        let notifier = EmailNotifier::unencrypted(port, "me@example.com", &recipients()).unwrap();

        let err = notifier.notify(&studio()).unwrap_err();
        assert!(matches!(err, NotifyError::Undelivered(_)), "got {err:?}");
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn closed_port_is_a_connection_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let notifier = EmailNotifier::unencrypted(port, "me@example.com", &recipients()).unwrap();

        assert!(matches!(
            notifier.notify(&studio()),
            Err(NotifyError::Connection(_))
        ));
    }
}
