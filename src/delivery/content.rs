//! Content module.
//!
//! This module contains the buffer holding the raw content of a
//! fetched email. Small emails stay in memory, bigger ones are
//! transparently spooled to a temporary file.

use std::io::{self, Read, Seek, SeekFrom, Write};
use tempfile::SpooledTempFile;

/// Represents the raw content of one fetched email. It can be
/// rewound and read as many times as needed; the temporary file (if
/// any) is removed when the content is dropped.
#[derive(Debug)]
pub struct MessageContent {
    spool: SpooledTempFile,
    len: u64,
}

impl MessageContent {
    /// Creates an empty content, kept in memory up to `max_size`
    /// bytes.
    pub fn new(max_size: usize) -> Self {
        Self {
            spool: SpooledTempFile::new(max_size),
            len: 0,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true when the content overflowed to disk.
    pub fn is_spooled(&self) -> bool {
        self.spool.is_rolled()
    }

    pub fn rewind(&mut self) -> io::Result<()> {
        self.spool.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Reads the whole content from the start.
    pub fn to_vec(&mut self) -> io::Result<Vec<u8>> {
        self.rewind()?;
        let mut bytes = Vec::with_capacity(self.len as usize);
        self.spool.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl Read for MessageContent {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.spool.read(buf)
    }
}

impl Write for MessageContent {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.spool.write(buf)?;
        let pos = self.spool.stream_position()?;
        self.len = self.len.max(pos);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.spool.flush()
    }
}

impl Seek for MessageContent {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.spool.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::MessageContent;

    #[test]
    fn in_memory() {
        let mut content = MessageContent::new(1024);
        content.write_all(b"Subject: test\r\n\r\nbody").unwrap();

        assert_eq!(21, content.len());
        assert!(!content.is_spooled());

        content.rewind().unwrap();
        let mut first = String::new();
        content.read_to_string(&mut first).unwrap();

        content.rewind().unwrap();
        let mut second = String::new();
        content.read_to_string(&mut second).unwrap();

        assert_eq!("Subject: test\r\n\r\nbody", first);
        assert_eq!(first, second);
    }

    #[test]
    fn spooled_to_disk() {
        let body = vec![b'x'; 64];
        let mut content = MessageContent::new(16);
        content.write_all(&body).unwrap();

        assert!(content.is_spooled());
        assert_eq!(64, content.len());
        assert_eq!(body, content.to_vec().unwrap());
        assert_eq!(body, content.to_vec().unwrap());
    }
}
