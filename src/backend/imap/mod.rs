pub mod backend;
pub mod config;
mod cram;
pub mod imap_flags;
pub mod imap_search;
#[cfg(test)]
mod mock_stream;

pub use self::backend::{Error, ImapBackend, ImapSession, ImapSessionStream, Result};
pub use self::config::ImapConfig;
