//! IMAP backend module.
//!
//! This module contains the definition of the IMAP backend, the
//! [`MailboxSession`] implementation bound to the `imap` crate.

use log::{debug, info, log_enabled, trace, warn, Level};
use native_tls::{TlsConnector, TlsStream};
use std::{
    borrow::Cow,
    fmt,
    io::{self, Read, Write},
    net::TcpStream,
    result,
};
use thiserror::Error;
use utf7_imap::encode_utf7_imap as encode_utf7;

use crate::{
    backend::{
        self,
        imap::{config, cram::CramMd5, imap_flags, imap_search},
        CreatedMailboxes, MailboxOps, SearchCriteria, SearchSender, SearchStrategy,
    },
    Flag, Flags, ImapConfig, MailboxSession,
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot get imap session: session not initialized")]
    GetSessionNotInitializedError,
    #[error("cannot create tls connector")]
    CreateTlsConnectorError(#[source] native_tls::Error),
    #[error("cannot connect to imap server {1}")]
    ConnectImapServerError(#[source] imap::Error, String),
    #[error("cannot login to imap server {1}")]
    LoginImapServerError(#[source] imap::Error, String),
    #[error("cannot select mailbox {1}")]
    SelectFolderError(#[source] imap::Error, String),
    #[error("cannot search emails with query {1:?}")]
    SearchEmailsError(#[source] imap::Error, String),
    #[error("cannot fetch email {1}")]
    FetchEmailError(#[source] imap::Error, u32),
    #[error("cannot find body of email {0}")]
    FindEmailBodyError(u32),
    #[error("cannot write body of email {1}")]
    WriteEmailError(#[source] io::Error, u32),
    #[error("cannot fetch flags of email {1}")]
    FetchFlagsError(#[source] imap::Error, u32),
    #[error("cannot find flags of email {0}")]
    FindFlagsError(u32),
    #[error("cannot add flags {1} to email {2}")]
    AddFlagsError(#[source] imap::Error, String, u32),
    #[error("cannot remove flags {1} from email {2}")]
    DelFlagsError(#[source] imap::Error, String, u32),
    #[error("cannot create mailbox {1}")]
    CreateMboxError(#[source] imap::Error, String),
    #[error("cannot copy email {1} to mailbox {2}")]
    CopyEmailError(#[source] imap::Error, u32, String),
    #[error("cannot close selected mailbox")]
    CloseMboxError(#[source] imap::Error),
    #[error("cannot logout from imap server")]
    LogoutError(#[source] imap::Error),

    #[error(transparent)]
    ImapConfigError(#[from] config::Error),
}

pub type Result<T> = result::Result<T, Error>;

pub enum ImapSessionStream {
    Tls(TlsStream<TcpStream>),
    Tcp(TcpStream),
}

impl Read for ImapSessionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tls(stream) => stream.read(buf),
            Self::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for ImapSessionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tls(stream) => stream.write(buf),
            Self::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tls(stream) => stream.flush(),
            Self::Tcp(stream) => stream.flush(),
        }
    }
}

pub type ImapSession = imap::Session<ImapSessionStream>;

/// Represents the IMAP backend. The connection is opened by
/// [`MailboxSession::connect`]; the created mailboxes and the search
/// charset capability outlive reconnections.
pub struct ImapBackend<'a> {
    imap_config: Cow<'a, ImapConfig>,
    session: Option<ImapSession>,
    search: SearchStrategy,
    created_mboxes: CreatedMailboxes,
}

impl<'a> ImapBackend<'a> {
    pub fn new(imap_config: Cow<'a, ImapConfig>) -> Self {
        Self {
            imap_config,
            session: None,
            search: SearchStrategy::default(),
            created_mboxes: CreatedMailboxes::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn search_strategy(&self) -> &SearchStrategy {
        &self.search
    }

    pub fn created_mailboxes(&self) -> &CreatedMailboxes {
        &self.created_mboxes
    }

    fn create_session(config: &ImapConfig) -> Result<ImapSession> {
        let builder = TlsConnector::builder()
            .danger_accept_invalid_certs(config.insecure())
            .danger_accept_invalid_hostnames(config.insecure())
            .build()
            .map_err(Error::CreateTlsConnectorError)?;
        let timeout = Some(config.timeout());

        let mut client_builder = imap::ClientBuilder::new(&config.host, config.port());
        if config.starttls() {
            client_builder.starttls();
        }

        let client = if config.ssl() || config.starttls() {
            client_builder.connect(|domain, tcp| {
                tcp.set_read_timeout(timeout)?;
                tcp.set_write_timeout(timeout)?;
                let connector = TlsConnector::connect(&builder, domain, tcp)?;
                Ok(ImapSessionStream::Tls(connector))
            })
        } else {
            client_builder.connect(|_, tcp| {
                tcp.set_read_timeout(timeout)?;
                tcp.set_write_timeout(timeout)?;
                Ok(ImapSessionStream::Tcp(tcp))
            })
        }
        .map_err(|err| Error::ConnectImapServerError(err, config.to_string()))?;

        let passwd = config.passwd()?;
        let mut session = match client.login(&config.login, &passwd) {
            Ok(session) => session,
            Err((err, client)) => {
                warn!("cannot login to {}, trying cram-md5: {}", config, err);
                let auth = CramMd5 {
                    login: &config.login,
                    passwd: &passwd,
                };
                client
                    .authenticate("CRAM-MD5", &auth)
                    .map_err(|(err, _)| Error::LoginImapServerError(err, config.to_string()))?
            }
        };
        session.debug = log_enabled!(Level::Trace);

        Ok(session)
    }
}

impl fmt::Display for ImapBackend<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.imap_config)
    }
}

fn connected(session: &mut Option<ImapSession>) -> Result<&mut ImapSession> {
    session.as_mut().ok_or(Error::GetSessionNotInitializedError)
}

fn store_flag<T: Read + Write>(
    session: &mut imap::Session<T>,
    uid: u32,
    flag: &Flag,
    state: bool,
) -> Result<()> {
    let flags = flag.to_imap_query();
    let uid_set = uid.to_string();

    if state {
        session
            .uid_store(&uid_set, format!("+FLAGS ({})", flags))
            .map_err(|err| Error::AddFlagsError(err, flags, uid))?;
    } else {
        session
            .uid_store(&uid_set, format!("-FLAGS ({})", flags))
            .map_err(|err| Error::DelFlagsError(err, flags, uid))?;
    }

    Ok(())
}

fn run_uid_search<T: Read + Write>(
    session: &mut imap::Session<T>,
    args: &str,
) -> backend::Result<Vec<u32>> {
    let utf8 = !args.is_ascii();
    let res = session
        .run_command_and_read_response(format!("UID SEARCH {}", args))
        .map_err(|err| {
            if imap_search::is_charset_rejected(&err, utf8) {
                backend::Error::SearchCharsetRejectedError(args.to_owned())
            } else {
                Error::SearchEmailsError(err, args.to_owned()).into()
            }
        })?;

    Ok(imap_search::parse_search_response(&res))
}

impl<T: Read + Write> SearchSender for imap::Session<T> {
    fn uid_search(&mut self, query: &str) -> backend::Result<Vec<u32>> {
        if query.is_ascii() {
            run_uid_search(self, query)
        } else {
            run_uid_search(self, &format!("CHARSET UTF-8 {}", query))
        }
    }

    fn send_uid_search(&mut self, args: &str) -> backend::Result<Vec<u32>> {
        run_uid_search(self, args)
    }
}

impl<T: Read + Write> MailboxOps for imap::Session<T> {
    fn create_mailbox(&mut self, mbox: &str) -> backend::Result<()> {
        self.create(encode_utf7(mbox.to_owned()))
            .map_err(|err| Error::CreateMboxError(err, mbox.to_owned()))?;
        Ok(())
    }

    fn copy_email(&mut self, uid: u32, mbox: &str) -> backend::Result<()> {
        self.uid_copy(uid.to_string(), encode_utf7(mbox.to_owned()))
            .map_err(|err| Error::CopyEmailError(err, uid, mbox.to_owned()))?;
        Ok(())
    }

    fn mark_email_deleted(&mut self, uid: u32) -> backend::Result<()> {
        Ok(store_flag(self, uid, &Flag::Deleted, true)?)
    }
}

impl MailboxSession for ImapBackend<'_> {
    fn connect(&mut self) -> backend::Result<()> {
        if self.session.is_some() {
            if let Err(err) = self.close(false) {
                debug!("cannot logout previous session of {}: {}", self, err);
            }
        }

        info!("connecting to {}", self);
        self.session = Some(Self::create_session(&self.imap_config)?);
        Ok(())
    }

    fn close(&mut self, expunge: bool) -> backend::Result<()> {
        let mut session = match self.session.take() {
            Some(session) => session,
            None => return Ok(()),
        };

        if expunge {
            // fails when no mailbox is selected, which is harmless
            if let Err(err) = session.close() {
                debug!("{}: {}", Error::CloseMboxError(err), self.imap_config);
            }
        }

        session.logout().map_err(Error::LogoutError)?;
        Ok(())
    }

    fn list(&mut self, mbox: &str, pattern: &str, all: bool) -> backend::Result<Vec<u32>> {
        debug!("listing emails of mailbox {} matching {:?}", mbox, pattern);

        let session = connected(&mut self.session)?;
        let encoded_mbox = encode_utf7(mbox.to_owned());
        debug!("utf7 encoded mailbox: {:?}", encoded_mbox);

        session
            .select(&encoded_mbox)
            .map_err(|err| Error::SelectFolderError(err, mbox.to_owned()))?;

        let criteria = SearchCriteria::new(pattern, all);
        let uids = self.search.search(session, &criteria)?;
        debug!("found {} email(s) in mailbox {}", uids.len(), mbox);

        Ok(uids)
    }

    fn read_to(&mut self, writer: &mut dyn Write, uid: u32) -> backend::Result<u64> {
        let session = connected(&mut self.session)?;
        let fetches = session
            .uid_fetch(uid.to_string(), "BODY.PEEK[]")
            .map_err(|err| Error::FetchEmailError(err, uid))?;

        let mut len = 0;
        let mut found = false;
        for fetch in fetches.iter().filter(|fetch| fetch.uid == Some(uid)) {
            if let Some(body) = fetch.body() {
                writer
                    .write_all(body)
                    .map_err(|err| Error::WriteEmailError(err, uid))?;
                len += body.len() as u64;
                found = true;
            }
        }

        if !found {
            return Err(Error::FindEmailBodyError(uid).into());
        }

        trace!("read {} byte(s) of email {}", len, uid);
        Ok(len)
    }

    fn get_flags(&mut self, uid: u32) -> backend::Result<Flags> {
        let session = connected(&mut self.session)?;
        let fetches = session
            .uid_fetch(uid.to_string(), "FLAGS")
            .map_err(|err| Error::FetchFlagsError(err, uid))?;
        let fetch = fetches
            .iter()
            .find(|fetch| fetch.uid == Some(uid))
            .ok_or(Error::FindFlagsError(uid))?;

        Ok(imap_flags::from_imap_flags(fetch.flags()))
    }

    fn set_flag(&mut self, uid: u32, flag: &Flag, state: bool) -> backend::Result<()> {
        let session = connected(&mut self.session)?;
        Ok(store_flag(session, uid, flag, state)?)
    }

    fn move_to(&mut self, uid: u32, mbox: &str) -> backend::Result<()> {
        let session = connected(&mut self.session)?;
        self.created_mboxes.relocate(session, uid, mbox)
    }
}
