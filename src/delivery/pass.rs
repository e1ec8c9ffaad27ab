//! Delivery pass module.
//!
//! This module contains one delivery round over a mailbox and the
//! processing of each candidate email: fetch and hash, deliver, then
//! mark as seen and move according to the delivery outcome.

use log::{debug, error, trace};
use std::{error::Error as StdError, io, result};
use thiserror::Error;

use crate::{
    backend, ContentDigest, DeliveryConfig, DeliveryTarget, DigestWriter, MailboxSession,
    MessageContent, SessionGuard,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot connect to mailbox server")]
    ConnectError(#[source] backend::Error),
    #[error("cannot list emails of mailbox {1}")]
    ListEmailsError(#[source] backend::Error, String),
    #[error("cannot fetch email {1}")]
    FetchEmailError(#[source] backend::Error, u32),
    #[error("cannot spool email {1}")]
    SpoolEmailError(#[source] io::Error, u32),
}

pub type Result<T> = result::Result<T, Error>;

pub type DeliverError = Box<dyn StdError + Send + Sync>;
pub type DeliverResult = result::Result<(), DeliverError>;

/// Represents the delivery callback.
///
/// It receives the rewound content of the email, its uid and the
/// SHA-1 digest of its content. It may be called again with the same
/// uid and digest (after a restart for instance), so it should be
/// idempotent for a given pair; see [`crate::delivery::headers`].
pub trait Deliver {
    fn deliver(
        &mut self,
        email: &mut MessageContent,
        uid: u32,
        digest: &ContentDigest,
    ) -> DeliverResult;
}

impl<F> Deliver for F
where
    F: FnMut(&mut MessageContent, u32, &ContentDigest) -> DeliverResult,
{
    fn deliver(
        &mut self,
        email: &mut MessageContent,
        uid: u32,
        digest: &ContentDigest,
    ) -> DeliverResult {
        self(email, uid, digest)
    }
}

/// Represents what happened to one candidate email.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Outcome {
    /// The email could not be fetched, it stays untouched and will be
    /// retried next round.
    Skipped,
    /// The callback failed.
    Rejected,
    /// The callback succeeded.
    Delivered,
}

/// Formats the error together with its sources.
pub(crate) fn error_chain(err: &dyn StdError) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();

    while let Some(err) = source {
        msg.push_str(": ");
        msg.push_str(&err.to_string());
        source = err.source();
    }

    msg
}

/// Runs one delivery round and returns the number of delivered
/// emails.
///
/// Only connection and listing failures are returned. Failures
/// related to a single email are logged and the round goes on with
/// the next one. The session is closed (and expunged) on every exit
/// path once connected.
pub fn deliver_one<S, D>(
    session: &mut S,
    target: &DeliveryTarget,
    config: &DeliveryConfig,
    deliver: &mut D,
) -> Result<usize>
where
    S: MailboxSession + ?Sized,
    D: Deliver + ?Sized,
{
    let inbox = target.inbox_folder();
    let mut session = SessionGuard::connect(session).map_err(|err| {
        error!("cannot connect: {}", error_chain(&err));
        Error::ConnectError(err)
    })?;

    let uids = session
        .list(inbox, &target.pattern, target.lists_all())
        .map_err(|err| {
            error!("cannot list {}: {}", inbox, error_chain(&err));
            Error::ListEmailsError(err, inbox.to_owned())
        })?;
    debug!("found {} candidate email(s) in {}", uids.len(), inbox);
    trace!("uids: {:?}", uids);

    let mut delivered = 0;
    for uid in uids {
        if process_email(&mut *session, target, config, deliver, uid) == Outcome::Delivered {
            delivered += 1;
        }
    }

    Ok(delivered)
}

/// Processes one candidate email. Never fails: every error is logged
/// and reflected in the returned outcome.
pub fn process_email<S, D>(
    session: &mut S,
    target: &DeliveryTarget,
    config: &DeliveryConfig,
    deliver: &mut D,
    uid: u32,
) -> Outcome
where
    S: MailboxSession + ?Sized,
    D: Deliver + ?Sized,
{
    let (mut email, digest) = match fetch_email(session, uid, config.spool_max_size()) {
        Ok(fetched) => fetched,
        Err(err) => {
            error!("{}", error_chain(&err));
            return Outcome::Skipped;
        }
    };
    debug!("delivering email {} ({} bytes, sha1 {})", uid, email.len(), digest);

    let res = deliver.deliver(&mut email, uid, &digest);
    drop(email);

    if let Err(err) = res {
        error!("cannot deliver email {}: {}", uid, error_chain(err.as_ref()));

        if let Some(errbox) = target.errbox_folder() {
            if let Err(err) = session.move_to(uid, errbox) {
                error!("cannot move email {} to {}: {}", uid, errbox, error_chain(&err));
            }
        }

        return Outcome::Rejected;
    }

    if let Err(err) = session.mark_seen(uid) {
        error!("cannot mark email {} as seen: {}", uid, error_chain(&err));
    }

    if let Some(outbox) = target.outbox_folder() {
        if let Err(err) = session.move_to(uid, outbox) {
            error!("cannot move email {} to {}: {}", uid, outbox, error_chain(&err));
        }
    }

    Outcome::Delivered
}

/// Fetches the email into a rewound buffer, hashing it on the fly.
fn fetch_email<S>(
    session: &mut S,
    uid: u32,
    spool_max_size: usize,
) -> Result<(MessageContent, ContentDigest)>
where
    S: MailboxSession + ?Sized,
{
    let mut writer = DigestWriter::new(MessageContent::new(spool_max_size));

    session
        .read_to(&mut writer, uid)
        .map_err(|err| Error::FetchEmailError(err, uid))?;

    let (mut email, digest) = writer.finalize();
    email
        .rewind()
        .map_err(|err| Error::SpoolEmailError(err, uid))?;

    Ok((email, digest))
}
