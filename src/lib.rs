//! Rust library for delivering the content of a remote mailbox to a
//! local handler.
//!
//! The [`delivery`] module discovers candidate emails through a
//! [`MailboxSession`], hands each of them to a caller-supplied
//! [`Deliver`] callback and updates their remote state (seen,
//! deleted, moved) according to the callback outcome. It can run a
//! single round ([`deliver_one`]) or loop forever with an adaptive
//! backoff ([`DeliveryLoop`]).

pub(crate) mod process;

pub mod backend;
pub use backend::*;
pub use backend::Error;

pub mod delivery;
pub use delivery::*;

pub mod domain;
pub use domain::*;
