//! Delivery module.
//!
//! This module contains the delivery engine: one round lists the
//! candidate emails of a mailbox, fetches and hashes each of them,
//! hands them to the caller's [`Deliver`] callback and updates their
//! remote state; the [`DeliveryLoop`] repeats rounds until cancelled.

pub mod config;
pub mod content;
pub mod digest;
pub mod headers;
pub mod pass;
pub mod schedule;

pub use self::config::{DeliveryConfig, DeliveryTarget};
pub use self::content::MessageContent;
pub use self::digest::{ContentDigest, DigestWriter};
pub use self::pass::{deliver_one, process_email, Deliver, Error, DeliverError, DeliverResult, Outcome};
pub use self::schedule::{CancelToken, DeliveryLoop};
