//! CRAM-MD5 authentication (RFC 2195), used when the server refuses
//! the plain LOGIN command.

pub struct CramMd5<'a> {
    pub login: &'a str,
    pub passwd: &'a str,
}

impl imap::Authenticator for CramMd5<'_> {
    type Response = String;

    fn process(&self, challenge: &[u8]) -> Self::Response {
        let digest = hmac_md5(self.passwd.as_bytes(), challenge);
        format!("{} {}", self.login, hex::encode(digest))
    }
}

fn hmac_md5(key: &[u8], msg: &[u8]) -> [u8; 16] {
    let mut block = [0u8; 64];
    if key.len() > block.len() {
        block[..16].copy_from_slice(&md5::compute(key).0);
    } else {
        block[..key.len()].copy_from_slice(key);
    }

    let mut inner: Vec<u8> = block.iter().map(|b| b ^ 0x36).collect();
    inner.extend_from_slice(msg);
    let inner = md5::compute(inner);

    let mut outer: Vec<u8> = block.iter().map(|b| b ^ 0x5c).collect();
    outer.extend_from_slice(&inner.0);
    md5::compute(outer).0
}
