//! Digest module.
//!
//! This module contains the SHA-1 digest of a fetched email, computed
//! while the email is being written to its buffer.

use serde::{Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::{
    fmt,
    io::{self, Write},
};

/// Represents the 160-bit SHA-1 digest of the raw content of an
/// email. Callers use it to detect duplicate deliveries.
#[derive(Debug, Default, Clone, Copy, Eq, Hash, PartialEq)]
pub struct ContentDigest(pub [u8; 20]);

impl ContentDigest {
    pub fn compute<B: AsRef<[u8]>>(bytes: B) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes.as_ref());
        Self::from_hasher(hasher)
    }

    fn from_hasher(hasher: Sha1) -> Self {
        let mut digest = [0; 20];
        digest.copy_from_slice(&hasher.finalize());
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Writer forwarding everything to the inner writer while hashing
/// the bytes actually written.
pub struct DigestWriter<W: Write> {
    inner: W,
    hasher: Sha1,
}

impl<W: Write> DigestWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha1::new(),
        }
    }

    pub fn finalize(self) -> (W, ContentDigest) {
        (self.inner, ContentDigest::from_hasher(self.hasher))
    }
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
