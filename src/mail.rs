use std::sync::{Arc, Mutex};
use tracing::info;

use crate::config::MailConfig;

/// A single outbound message.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Out-of-band delivery seam for confirmation codes.
///
/// `Log` writes the message to the log (good enough for a deployment that
/// tails its logs for codes); `Memory` keeps deliveries in-process so tests
/// can read the code back.
#[derive(Clone)]
pub enum Mailer {
    Log,
    Memory(Arc<Mutex<Vec<Delivery>>>),
}

impl Mailer {
    #[must_use]
    pub fn from_config(config: &MailConfig) -> Self {
        match config.mode.as_str() {
            "memory" => Self::memory(),
            _ => Self::Log,
        }
    }

    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn send_confirmation_code(&self, recipient: &str, code: &str) {
        let delivery = Delivery {
            recipient: recipient.to_string(),
            subject: "Reviewarr registration".to_string(),
            body: format!("Your confirmation code: {code}"),
        };
        self.send(delivery);
    }

    fn send(&self, delivery: Delivery) {
        match self {
            Self::Log => {
                info!(
                    recipient = %delivery.recipient,
                    subject = %delivery.subject,
                    "Outbound mail: {}",
                    delivery.body
                );
            }
            Self::Memory(outbox) => {
                if let Ok(mut outbox) = outbox.lock() {
                    outbox.push(delivery);
                }
            }
        }
    }

    /// Deliveries captured so far; empty for the `Log` mailer.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        match self {
            Self::Log => Vec::new(),
            Self::Memory(outbox) => outbox.lock().map(|o| o.clone()).unwrap_or_default(),
        }
    }
}
