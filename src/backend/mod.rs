mod backend;
pub mod relocate;
pub mod search;

#[cfg(feature = "imap-backend")]
pub mod imap;

pub use self::backend::{Error, MailboxSession, Result, SessionGuard};
pub use self::relocate::{CreatedMailboxes, MailboxOps};
pub use self::search::{CharsetCapability, SearchCriteria, SearchSender, SearchStrategy};
#[cfg(feature = "imap-backend")]
pub use self::imap::{ImapBackend, ImapConfig};
