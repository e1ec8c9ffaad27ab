//! Headers module.
//!
//! Helpers for delivery callbacks which want to stamp what they
//! produce with the identity of the delivered email, so that
//! downstream consumers can drop duplicates.

use std::io::{self, Read};

use crate::ContentDigest;

pub const UID_HEADER: &str = "X-UID";
pub const SHA1_HEADER: &str = "X-SHA1";

/// Builds the `X-UID` and `X-SHA1` header lines.
pub fn identity_headers(uid: u32, digest: &ContentDigest) -> String {
    format!(
        "{}: {}\r\n{}: {}\r\n",
        UID_HEADER, uid, SHA1_HEADER, digest
    )
}

/// Reads the email and returns it with the identity headers
/// prepended to its own headers.
pub fn with_identity_headers<R: Read>(
    email: &mut R,
    uid: u32,
    digest: &ContentDigest,
) -> io::Result<Vec<u8>> {
    let mut stamped = identity_headers(uid, digest).into_bytes();
    email.read_to_end(&mut stamped)?;
    Ok(stamped)
}
