//! Raw UID SEARCH support: charset rejection detection and parsing
//! of the untagged `* SEARCH` responses, in server order.

use imap_proto::{parser::parse_response, MailboxDatum, Response};

/// Returns true when the server refused the command because of its
/// charset (`[BADCHARSET]` response code).
pub fn is_bad_charset(err: &imap::Error) -> bool {
    match err {
        imap::Error::No(_) | imap::Error::Bad(_) => format!("{} {:?}", err, err)
            .to_ascii_uppercase()
            .contains("BADCHARSET"),
        _ => false,
    }
}

/// Returns true when the server refused the search because of its
/// charset. Strict servers answer a bare BAD to 8-bit characters in a
/// quoted string, so for a UTF-8 search any BAD counts as a charset
/// rejection.
pub fn is_charset_rejected(err: &imap::Error, utf8: bool) -> bool {
    is_bad_charset(err) || (utf8 && matches!(err, imap::Error::Bad(_)))
}

/// Extracts the uids of every `* SEARCH` line of the response.
/// Unrelated or unparsable lines are skipped.
pub fn parse_search_response(mut lines: &[u8]) -> Vec<u32> {
    let mut uids = Vec::new();

    while !lines.is_empty() {
        match parse_response(lines) {
            Ok((rest, Response::MailboxData(MailboxDatum::Search(ids)))) => {
                uids.extend(ids);
                lines = rest;
            }
            Ok((rest, _)) => {
                lines = rest;
            }
            Err(_) => match lines.windows(2).position(|w| w == b"\r\n") {
                Some(pos) => lines = &lines[pos + 2..],
                None => break,
            },
        }
    }

    uids
}
