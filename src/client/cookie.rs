//! Session cookie extraction

use reqwest::header::{HeaderMap, SET_COOKIE};

/// Value of the named cookie from `Set-Cookie` response headers
pub(crate) fn extract_set_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|header| {
            let pair = header.split(';').next()?.trim();
            let (key, value) = pair.split_once('=')?;
            if key.trim() == name && !value.trim().is_empty() {
                Some(value.trim().to_string())
            } else {
                None
            }
        })
}
