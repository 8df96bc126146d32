//! Chat endpoint URLs.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

/// Path of the query socket on the chat backend.
pub const QUERY_PATH: &str = "/ws/query";

/// `<base>/ws/query?token=<token>`, with the token percent-encoded.
pub fn query_url(base: &str, token: &str) -> String {
    let base = base.trim_end_matches('/');
    let token = utf8_percent_encode(token, NON_ALPHANUMERIC);
    format!("{base}{QUERY_PATH}?token={token}")
}
