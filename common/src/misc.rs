use std::fmt;

/// Length of a subscription window, counted from the moment staff mark an
/// activation as serviced.
pub const SUBSCRIPTION_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Purchase,
    Activation,
}

impl RequestKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            RequestKind::Purchase => "BUY",
            RequestKind::Activation => "ST",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Purchase => write!(f, "purchase"),
            RequestKind::Activation => write!(f, "activation"),
        }
    }
}

/// Renders the user-visible request number, e.g. `ST-000042`.
pub fn format_request_number(kind: RequestKind, id: i64) -> String {
    format!("{}-{:06}", kind.prefix(), id)
}

/// Inverse of [`format_request_number`]. Accepts lowercase prefixes and
/// surrounding whitespace since admins type these by hand.
pub fn parse_request_number(input: &str) -> Option<(RequestKind, i64)> {
    let (prefix, digits) = input.trim().split_once('-')?;
    let kind = [RequestKind::Purchase, RequestKind::Activation]
        .into_iter()
        .find(|kind| kind.prefix().eq_ignore_ascii_case(prefix))?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let id = digits.parse::<i64>().ok()?;
    Some((kind, id))
}

/// Compares two secrets without returning early on the first mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
