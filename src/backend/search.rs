//! Search module.
//!
//! This module contains the search strategy used to list candidate
//! emails, including the negotiation of the search charset: servers
//! refusing UTF-8 searches get the subject encoded in modified UTF-7
//! instead, and the decision is cached for the rest of the session.

use log::{debug, trace};
use utf7_imap::encode_utf7_imap as encode_utf7;

use super::Result;

/// Represents what the server is known to accept as search charset.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum CharsetCapability {
    /// No non-ASCII search has been attempted yet.
    #[default]
    Unknown,
    /// The server accepted a UTF-8 search.
    Utf8,
    /// The server rejected a UTF-8 search, the UTF-7 fallback must be
    /// used from now on.
    Utf7,
}

/// Represents the criteria of a candidate emails search.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct SearchCriteria<'a> {
    /// Lists every undeleted email instead of unseen ones only.
    pub all: bool,
    /// Subject substring filter.
    pub subject: Option<&'a str>,
}

impl<'a> SearchCriteria<'a> {
    pub fn new(pattern: &'a str, all: bool) -> Self {
        Self {
            all,
            subject: Some(pattern).filter(|pattern| !pattern.is_empty()),
        }
    }

    pub fn is_ascii(&self) -> bool {
        self.subject.map(str::is_ascii).unwrap_or(true)
    }

    /// Builds the search query with the subject written as is.
    pub fn to_query(&self) -> String {
        self.build_query(self.subject.map(ToOwned::to_owned))
    }

    /// Builds the search query with the subject encoded in modified
    /// UTF-7, which only contains 7-bit characters.
    pub fn to_utf7_query(&self) -> String {
        self.build_query(self.subject.map(|subject| encode_utf7(subject.to_owned())))
    }

    fn build_query(&self, subject: Option<String>) -> String {
        let mut query = String::from(if self.all { "NOT DELETED" } else { "UNSEEN" });

        if let Some(subject) = subject {
            query.push_str(" SUBJECT ");
            query.push_str(&quote(&subject));
        }

        query
    }
}

/// Quotes the given string so it can be used as a search key.
pub fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Represents the two ways of sending a UID SEARCH command.
pub trait SearchSender {
    /// Searches through the regular helper, which declares the UTF-8
    /// charset by itself when the query is not pure ASCII.
    fn uid_search(&mut self, query: &str) -> Result<Vec<u32>>;

    /// Sends the UID SEARCH command with the given arguments as is,
    /// without any charset declaration.
    fn send_uid_search(&mut self, args: &str) -> Result<Vec<u32>>;
}

/// Represents the search strategy of a session. It remembers the
/// charset capability of the server across searches.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SearchStrategy {
    charset: CharsetCapability,
}

impl SearchStrategy {
    pub fn charset(&self) -> CharsetCapability {
        self.charset
    }

    /// Searches emails matching the criteria in the selected mailbox.
    ///
    /// The UTF-8 search is attempted until the server rejects its
    /// charset once. Any other search failure is returned.
    pub fn search<S: SearchSender + ?Sized>(
        &mut self,
        sender: &mut S,
        criteria: &SearchCriteria,
    ) -> Result<Vec<u32>> {
        if self.charset != CharsetCapability::Utf7 {
            let query = criteria.to_query();
            debug!("searching emails with query {:?}", query);

            match sender.uid_search(&query) {
                Ok(uids) => {
                    if !criteria.is_ascii() {
                        self.charset = CharsetCapability::Utf8;
                    }
                    trace!("uids: {:?}", uids);
                    return Ok(uids);
                }
                Err(err) if err.is_charset_rejected() => {
                    debug!("utf-8 search rejected, falling back to utf-7: {}", err);
                    self.charset = CharsetCapability::Utf7;
                }
                Err(err) => return Err(err),
            }
        }

        let query = criteria.to_utf7_query();
        debug!("searching emails with utf-7 query {:?}", query);

        let uids = sender.send_uid_search(&query)?;
        trace!("uids: {:?}", uids);
        Ok(uids)
    }
}
