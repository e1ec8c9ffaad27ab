//! Relocate module.
//!
//! This module contains the idempotent move of an email into another
//! mailbox: the destination is created once per session, then the
//! email is copied and flagged as deleted in the source mailbox.

use log::{debug, info, warn};
use std::collections::HashSet;

use super::{Error, Result};

/// Represents the mailbox primitives needed to relocate an email.
/// The source mailbox is the currently selected one.
pub trait MailboxOps {
    fn create_mailbox(&mut self, mbox: &str) -> Result<()>;
    fn copy_email(&mut self, uid: u32, mbox: &str) -> Result<()>;
    fn mark_email_deleted(&mut self, uid: u32) -> Result<()>;
}

/// Represents the destination mailboxes already created (or known to
/// exist) during the lifetime of a session.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct CreatedMailboxes(HashSet<String>);

impl CreatedMailboxes {
    pub fn contains(&self, mbox: &str) -> bool {
        self.0.contains(mbox)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Creates the mailbox unless it has already been attempted. The
    /// name is remembered even when the creation fails, since the
    /// usual failure is that the mailbox already exists.
    pub fn ensure<O: MailboxOps + ?Sized>(&mut self, ops: &mut O, mbox: &str) {
        if self.contains(mbox) {
            return;
        }

        info!("creating mailbox {}", mbox);
        self.0.insert(mbox.to_owned());

        if let Err(err) = ops.create_mailbox(mbox) {
            warn!("cannot create mailbox {}, assuming it exists: {}", mbox, err);
        }
    }

    /// Moves the email into the given mailbox.
    ///
    /// A failed copy leaves the source email untouched. A failed
    /// deletion flag after a successful copy leaves the email in both
    /// mailboxes: the error is returned as is and nothing is rolled
    /// back.
    pub fn relocate<O: MailboxOps + ?Sized>(
        &mut self,
        ops: &mut O,
        uid: u32,
        mbox: &str,
    ) -> Result<()> {
        self.ensure(ops, mbox);

        debug!("copying email {} to mailbox {}", uid, mbox);
        ops.copy_email(uid, mbox)
            .map_err(|err| Error::CopyEmailError(Box::new(err), uid, mbox.to_owned()))?;

        ops.mark_email_deleted(uid)
            .map_err(|err| Error::MarkEmailDeletedError(Box::new(err), uid, mbox.to_owned()))?;

        Ok(())
    }
}
