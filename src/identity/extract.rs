use axum::http::HeaderMap;

use super::principal::Identity;

pub const ROLE_HEADER: &str = "x-user-role";
pub const USER_HEADER: &str = "x-user-name";

// Last occurrence wins when a header is repeated. Values are decoded as UTF-8,
// so non-ASCII names such as "مروة" are accepted.
fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(name)
        .iter()
        .last()
        .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
        .filter(|s| !s.is_empty())
}

/// Build an [`Identity`] from the role and username headers.
///
/// Returns `None` unless both are present and non-empty. Header names match
/// case-insensitively; the role value is not checked against known roles.
pub fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    let role = header_text(headers, ROLE_HEADER)?;
    let username = header_text(headers, USER_HEADER)?;
    Some(Identity::new(role, username))
}
