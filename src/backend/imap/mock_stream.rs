//! In-memory stream replaying a scripted server transcript, used to
//! drive a real `imap::Session` in tests.

use std::{
    cell::RefCell,
    cmp::min,
    io::{self, Read, Write},
    rc::Rc,
};

#[derive(Debug, Default)]
pub struct MockStream {
    read_buf: Vec<u8>,
    read_pos: usize,
    written_buf: Rc<RefCell<Vec<u8>>>,
}

impl MockStream {
    pub fn new<B: Into<Vec<u8>>>(read_buf: B) -> Self {
        Self {
            read_buf: read_buf.into(),
            ..Self::default()
        }
    }

    /// Gets a handle on the bytes sent by the client, still readable
    /// once the stream is owned by a session.
    pub fn written(&self) -> Rc<RefCell<Vec<u8>>> {
        self.written_buf.clone()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.read_pos >= self.read_buf.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "EOF"));
        }
        let len = min(buf.len(), self.read_buf.len() - self.read_pos);
        buf[..len].copy_from_slice(&self.read_buf[self.read_pos..self.read_pos + len]);
        self.read_pos += len;
        Ok(len)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written_buf.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Logs a session in over a mock stream replaying `a1 OK` followed by
/// the given responses (tagged from `a2` on).
pub fn login(responses: &str) -> (imap::Session<MockStream>, Rc<RefCell<Vec<u8>>>) {
    let stream = MockStream::new(format!("a1 OK Logged in\r\n{}", responses));
    let written = stream.written();
    let session = match imap::Client::new(stream).login("patrick", "password") {
        Ok(session) => session,
        Err((err, _)) => panic!("cannot login: {}", err),
    };
    (session, written)
}

/// Gets the `UID SEARCH` command lines sent so far.
pub fn sent_searches(written: &Rc<RefCell<Vec<u8>>>) -> Vec<String> {
    String::from_utf8_lossy(&written.borrow())
        .split("\r\n")
        .filter(|line| line.contains("UID SEARCH"))
        .map(ToOwned::to_owned)
        .collect()
}
