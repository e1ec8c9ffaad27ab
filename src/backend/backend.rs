//! Backend module.
//!
//! This module exposes the mailbox session trait, which is the only
//! way the delivery engine talks to a mail server. Custom sessions
//! (other protocols, in-memory doubles) only need to implement it.

use log::warn;
use std::{io::Write, ops, result};
use thiserror::Error;

use crate::{Flag, Flags};

#[cfg(feature = "imap-backend")]
use crate::backend;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot get mailbox session: session not connected")]
    GetSessionNotConnectedError,
    #[error("server rejected the charset of search query {0:?}")]
    SearchCharsetRejectedError(String),
    #[error("cannot parse flag regex {1:?}")]
    ParseFlagRegexError(#[source] regex::Error, String),
    #[error("cannot copy email {1} to mailbox {2}")]
    CopyEmailError(#[source] Box<Error>, u32, String),
    #[error("cannot mark email {1} as deleted after copying it to mailbox {2}")]
    MarkEmailDeletedError(#[source] Box<Error>, u32, String),
    #[error(transparent)]
    CustomSessionError(Box<dyn std::error::Error + Send + Sync>),

    #[cfg(feature = "imap-backend")]
    #[error(transparent)]
    ImapBackendError(#[from] backend::imap::Error),
}

impl Error {
    /// Returns true when the server refused a search because of its
    /// charset (`BADCHARSET` response code).
    pub fn is_charset_rejected(&self) -> bool {
        matches!(self, Self::SearchCharsetRejectedError(_))
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Represents a session with a remote mailbox server.
///
/// Emails are identified by their uid, which is stable within a
/// mailbox for the lifetime of the session.
pub trait MailboxSession {
    /// Establishes and authenticates the connection. Calling it again
    /// after [`MailboxSession::close`] reconnects from scratch.
    fn connect(&mut self) -> Result<()>;

    /// Tears the connection down. When `expunge` is true, emails
    /// flagged as deleted are permanently removed first.
    fn close(&mut self, expunge: bool) -> Result<()>;

    /// Selects the given mailbox and returns the uids of the emails
    /// matching the subject pattern. Only unseen emails are listed,
    /// unless `all` is true in which case every undeleted email is.
    fn list(&mut self, mbox: &str, pattern: &str, all: bool) -> Result<Vec<u32>>;

    /// Streams the full raw content of the given email into the
    /// writer and returns the number of bytes written.
    fn read_to(&mut self, writer: &mut dyn Write, uid: u32) -> Result<u64>;

    fn get_flags(&mut self, uid: u32) -> Result<Flags>;

    /// Adds (`state` = true) or removes the flag.
    fn set_flag(&mut self, uid: u32, flag: &Flag, state: bool) -> Result<()>;

    /// Copies the email into the given mailbox, creating it first if
    /// needed, then flags the source email as deleted.
    fn move_to(&mut self, uid: u32, mbox: &str) -> Result<()>;

    /// Sets or unsets every flag of the email matching the regex.
    fn set_flag_regex(&mut self, uid: u32, regex: &str, state: bool) -> Result<()> {
        let regex = regex::Regex::new(regex)
            .map_err(|err| Error::ParseFlagRegexError(err, regex.to_owned()))?;

        for flag in self.get_flags(uid)?.matching(&regex).iter() {
            self.set_flag(uid, flag, state)?;
        }

        Ok(())
    }

    fn mark_seen(&mut self, uid: u32) -> Result<()> {
        self.set_flag(uid, &Flag::Seen, true)
    }

    fn mark_unseen(&mut self, uid: u32) -> Result<()> {
        self.set_flag(uid, &Flag::Seen, false)
    }

    fn mark_deleted(&mut self, uid: u32) -> Result<()> {
        self.set_flag(uid, &Flag::Deleted, true)
    }

    fn mark_undeleted(&mut self, uid: u32) -> Result<()> {
        self.set_flag(uid, &Flag::Deleted, false)
    }
}

/// Connected session which closes (and expunges) itself when
/// dropped, whatever the exit path.
pub struct SessionGuard<'a, S: MailboxSession + ?Sized> {
    session: &'a mut S,
}

impl<'a, S: MailboxSession + ?Sized> SessionGuard<'a, S> {
    pub fn connect(session: &'a mut S) -> Result<Self> {
        session.connect()?;
        Ok(Self { session })
    }
}

impl<S: MailboxSession + ?Sized> ops::Deref for SessionGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl<S: MailboxSession + ?Sized> ops::DerefMut for SessionGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl<S: MailboxSession + ?Sized> Drop for SessionGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(err) = self.session.close(true) {
            warn!("cannot close mailbox session: {}", err);
        }
    }
}
