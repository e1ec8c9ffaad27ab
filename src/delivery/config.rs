//! Delivery config module.
//!
//! This module contains the tunables of the delivery loop and the
//! description of the mailboxes a delivery works on.

use std::time::Duration;

pub const DEFAULT_INBOX_FOLDER: &str = "INBOX";
pub const DEFAULT_SHORT_SLEEP: Duration = Duration::from_secs(1);
pub const DEFAULT_LONG_SLEEP: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_SPOOL_MAX_SIZE: usize = 4 << 20;

/// Represents the delivery configuration.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct DeliveryConfig {
    /// Represents the pause after a round that delivered at least one
    /// email.
    pub short_sleep: Option<Duration>,
    /// Represents the pause after a failed or empty round.
    pub long_sleep: Option<Duration>,
    /// Represents the size above which a fetched email is spooled to
    /// a temporary file instead of memory.
    pub spool_max_size: Option<usize>,
}

impl DeliveryConfig {
    pub fn short_sleep(&self) -> Duration {
        self.short_sleep.unwrap_or(DEFAULT_SHORT_SLEEP)
    }

    pub fn long_sleep(&self) -> Duration {
        self.long_sleep.unwrap_or(DEFAULT_LONG_SLEEP)
    }

    pub fn spool_max_size(&self) -> usize {
        self.spool_max_size.unwrap_or(DEFAULT_SPOOL_MAX_SIZE)
    }
}

/// Represents the mailboxes involved in a delivery: the source
/// mailbox, the optional subject filter and the optional
/// destinations of delivered (outbox) and rejected (errbox) emails.
/// Empty strings mean "not set".
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct DeliveryTarget {
    pub inbox: String,
    pub pattern: String,
    pub outbox: String,
    pub errbox: String,
}

impl DeliveryTarget {
    pub fn new<S: ToString>(inbox: S) -> Self {
        Self {
            inbox: inbox.to_string(),
            ..Self::default()
        }
    }

    pub fn pattern<S: ToString>(mut self, pattern: S) -> Self {
        self.pattern = pattern.to_string();
        self
    }

    pub fn outbox<S: ToString>(mut self, outbox: S) -> Self {
        self.outbox = outbox.to_string();
        self
    }

    pub fn errbox<S: ToString>(mut self, errbox: S) -> Self {
        self.errbox = errbox.to_string();
        self
    }

    /// Gets the source mailbox, `INBOX` when empty.
    pub fn inbox_folder(&self) -> &str {
        if self.inbox.is_empty() {
            DEFAULT_INBOX_FOLDER
        } else {
            &self.inbox
        }
    }

    pub fn outbox_folder(&self) -> Option<&str> {
        Some(self.outbox.as_str()).filter(|mbox| !mbox.is_empty())
    }

    pub fn errbox_folder(&self) -> Option<&str> {
        Some(self.errbox.as_str()).filter(|mbox| !mbox.is_empty())
    }

    /// Every undeleted email is a candidate when both destinations
    /// are set, since each email then ends up moved somewhere.
    /// Otherwise only unseen emails are.
    pub fn lists_all(&self) -> bool {
        self.outbox_folder().is_some() && self.errbox_folder().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{DeliveryConfig, DeliveryTarget};

    #[test]
    fn config_defaults() {
        let config = DeliveryConfig::default();
        assert_eq!(Duration::from_secs(1), config.short_sleep());
        assert_eq!(Duration::from_secs(300), config.long_sleep());
        assert_eq!(4 * 1024 * 1024, config.spool_max_size());

        let config = DeliveryConfig {
            long_sleep: Some(Duration::from_millis(10)),
            ..DeliveryConfig::default()
        };
        assert_eq!(Duration::from_millis(10), config.long_sleep());
    }

    #[test]
    fn target() {
        let target = DeliveryTarget::default();
        assert_eq!("INBOX", target.inbox_folder());
        assert_eq!(None, target.outbox_folder());
        assert!(!target.lists_all());

        let target = DeliveryTarget::new("Orders").outbox("done");
        assert_eq!("Orders", target.inbox_folder());
        assert_eq!(Some("done"), target.outbox_folder());
        assert!(!target.lists_all());

        let target = target.errbox("failed");
        assert_eq!(Some("failed"), target.errbox_folder());
        assert!(target.lists_all());
    }
}
