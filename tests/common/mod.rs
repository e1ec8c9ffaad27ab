#![allow(dead_code)]

use log::LevelFilter;
use std::{
    collections::{HashMap, HashSet},
    io::Write,
};

use imap_delivery::{
    backend::{Error, Result},
    CreatedMailboxes, Flag, Flags, MailboxOps, MailboxSession,
};

pub fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(LevelFilter::Debug)
        .try_init();
}

fn session_error(msg: String) -> Error {
    Error::CustomSessionError(msg.into())
}

#[derive(Debug, Clone)]
pub struct MemoryEmail {
    pub uid: u32,
    pub subject: String,
    pub raw: Vec<u8>,
    pub flags: Flags,
}

/// Mailboxes of the in-memory server. Emails keep their insertion
/// order, which is the order searches return them in.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub mboxes: HashMap<String, Vec<MemoryEmail>>,
    pub selected: Option<String>,
    pub creates: Vec<String>,
    pub fail_copy: HashSet<u32>,
    pub fail_delete: HashSet<u32>,
    next_uid: u32,
}

impl MemoryStore {
    fn selected_mut(&mut self) -> Result<&mut Vec<MemoryEmail>> {
        let mbox = self
            .selected
            .clone()
            .ok_or_else(|| session_error("no mailbox selected".into()))?;
        Ok(self.mboxes.entry(mbox).or_default())
    }

    fn email_mut(&mut self, uid: u32) -> Result<&mut MemoryEmail> {
        self.selected_mut()?
            .iter_mut()
            .find(|email| email.uid == uid)
            .ok_or_else(|| session_error(format!("no email with uid {}", uid)))
    }

    fn append(&mut self, mbox: &str, subject: &str, raw: Vec<u8>, flags: Flags) -> u32 {
        self.next_uid += 1;
        let uid = self.next_uid;
        self.mboxes.entry(mbox.to_owned()).or_default().push(MemoryEmail {
            uid,
            subject: subject.to_owned(),
            raw,
            flags,
        });
        uid
    }
}

impl MailboxOps for MemoryStore {
    fn create_mailbox(&mut self, mbox: &str) -> Result<()> {
        self.creates.push(mbox.to_owned());
        if self.mboxes.contains_key(mbox) {
            return Err(session_error(format!("mailbox {} already exists", mbox)));
        }
        self.mboxes.insert(mbox.to_owned(), Vec::new());
        Ok(())
    }

    fn copy_email(&mut self, uid: u32, mbox: &str) -> Result<()> {
        if self.fail_copy.contains(&uid) {
            return Err(session_error(format!("cannot copy {}", uid)));
        }
        if !self.mboxes.contains_key(mbox) {
            return Err(session_error(format!("no mailbox {}", mbox)));
        }
        let email = self.email_mut(uid)?.clone();
        self.append(mbox, &email.subject, email.raw, email.flags);
        Ok(())
    }

    fn mark_email_deleted(&mut self, uid: u32) -> Result<()> {
        if self.fail_delete.contains(&uid) {
            return Err(session_error(format!("cannot delete {}", uid)));
        }
        self.email_mut(uid)?.flags.insert(Flag::Deleted);
        Ok(())
    }
}

/// In-memory mailbox session recording every interaction.
#[derive(Debug, Default)]
pub struct MemorySession {
    pub store: MemoryStore,
    pub created: CreatedMailboxes,
    pub connected: bool,
    pub connects: usize,
    pub closes: Vec<bool>,
    pub lists: usize,
    pub moves: Vec<(u32, String)>,
    pub fail_connects: usize,
    pub fail_list: bool,
    pub fail_fetch: HashSet<u32>,
    pub fail_seen: HashSet<u32>,
}

impl MemorySession {
    pub fn new() -> Self {
        let mut session = Self::default();
        session.store.mboxes.insert("INBOX".into(), Vec::new());
        session
    }

    pub fn add_email(&mut self, mbox: &str, subject: &str) -> u32 {
        let raw = format!(
            "From: alice@localhost\r\nTo: patrick@localhost\r\nSubject: {}\r\n\r\nHello!\r\n",
            subject
        );
        self.store
            .append(mbox, subject, raw.into_bytes(), Flags::default())
    }

    pub fn emails(&self, mbox: &str) -> Vec<MemoryEmail> {
        self.store.mboxes.get(mbox).cloned().unwrap_or_default()
    }

    pub fn uids(&self, mbox: &str) -> Vec<u32> {
        self.emails(mbox).iter().map(|email| email.uid).collect()
    }

    pub fn email(&self, mbox: &str, uid: u32) -> Option<MemoryEmail> {
        self.emails(mbox).into_iter().find(|email| email.uid == uid)
    }

    pub fn is_seen(&self, mbox: &str, uid: u32) -> bool {
        self.email(mbox, uid)
            .map(|email| email.flags.contains(&Flag::Seen))
            .unwrap_or(false)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(Error::GetSessionNotConnectedError)
        }
    }
}

impl MailboxSession for MemorySession {
    fn connect(&mut self) -> Result<()> {
        self.connects += 1;
        if self.fail_connects > 0 {
            self.fail_connects -= 1;
            return Err(session_error("connection refused".into()));
        }
        self.connected = true;
        Ok(())
    }

    fn close(&mut self, expunge: bool) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.closes.push(expunge);
        if expunge {
            if let Ok(emails) = self.store.selected_mut() {
                emails.retain(|email| !email.flags.contains(&Flag::Deleted));
            }
        }
        self.store.selected = None;
        self.connected = false;
        Ok(())
    }

    fn list(&mut self, mbox: &str, pattern: &str, all: bool) -> Result<Vec<u32>> {
        self.ensure_connected()?;
        self.lists += 1;
        if self.fail_list {
            return Err(session_error("search failed".into()));
        }
        if !self.store.mboxes.contains_key(mbox) {
            return Err(session_error(format!("no mailbox {}", mbox)));
        }
        self.store.selected = Some(mbox.to_owned());

        let pattern = pattern.to_lowercase();
        let uids = self
            .store
            .selected_mut()?
            .iter()
            .filter(|email| {
                if all {
                    !email.flags.contains(&Flag::Deleted)
                } else {
                    !email.flags.contains(&Flag::Seen)
                }
            })
            .filter(|email| email.subject.to_lowercase().contains(&pattern))
            .map(|email| email.uid)
            .collect();

        Ok(uids)
    }

    fn read_to(&mut self, writer: &mut dyn Write, uid: u32) -> Result<u64> {
        self.ensure_connected()?;
        if self.fail_fetch.contains(&uid) {
            return Err(session_error(format!("cannot fetch {}", uid)));
        }
        let raw = self.store.email_mut(uid)?.raw.clone();
        writer
            .write_all(&raw)
            .map_err(|err| Error::CustomSessionError(err.into()))?;
        Ok(raw.len() as u64)
    }

    fn get_flags(&mut self, uid: u32) -> Result<Flags> {
        self.ensure_connected()?;
        Ok(self.store.email_mut(uid)?.flags.clone())
    }

    fn set_flag(&mut self, uid: u32, flag: &Flag, state: bool) -> Result<()> {
        self.ensure_connected()?;
        if *flag == Flag::Seen && state && self.fail_seen.contains(&uid) {
            return Err(session_error(format!("cannot mark {} as seen", uid)));
        }
        let flags = &mut self.store.email_mut(uid)?.flags;
        if state {
            flags.insert(flag.clone());
        } else {
            flags.remove(flag);
        }
        Ok(())
    }

    fn move_to(&mut self, uid: u32, mbox: &str) -> Result<()> {
        self.ensure_connected()?;
        self.moves.push((uid, mbox.to_owned()));
        self.created.relocate(&mut self.store, uid, mbox)
    }
}
