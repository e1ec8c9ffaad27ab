//! Conversions between the IMAP crate flags and the domain flags.

use crate::{Flag, Flags};

/// Builds the domain flags out of the flags of a fetch. Accepts
/// anything yielding displayable IMAP flags.
pub fn from_imap_flags<I>(imap_flags: I) -> Flags
where
    I: IntoIterator,
    I::Item: ToString,
{
    imap_flags
        .into_iter()
        .map(|flag| Flag::from_imap_str(&flag.to_string()))
        .collect()
}
