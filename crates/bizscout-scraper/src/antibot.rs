//! Detection of responses where the target site refused to serve content.

/// Status codes treated as an active refusal rather than a transient error.
pub const BLOCKED_STATUSES: [u16; 5] = [401, 403, 409, 429, 503];

/// Only the head of the body is scanned; challenge pages put their marker
/// text early.
pub const MARKER_SCAN_CHARS: usize = 1500;

const BODY_MARKERS: [&str; 7] = [
    "just a moment",
    "enable javascript to continue",
    "attention required",
    "cloudflare",
    "are you a human",
    "access denied",
    "bot detection",
];

#[must_use]
pub fn is_blocked_status(status: u16) -> bool {
    BLOCKED_STATUSES.contains(&status)
}

/// Returns the first marker found in the first [`MARKER_SCAN_CHARS`]
/// characters of `body`, case-insensitively.
#[must_use]
pub fn find_body_marker(body: &str) -> Option<&'static str> {
    let head: String = body.chars().take(MARKER_SCAN_CHARS).collect();
    let head = head.to_lowercase();
    BODY_MARKERS
        .iter()
        .copied()
        .find(|marker| head.contains(marker))
}

/// Reason string for a blocked response, or `None` if the response looks
/// like real content. Status is checked before the body.
#[must_use]
pub fn detect_block(status: u16, body: &str) -> Option<String> {
    if is_blocked_status(status) {
        return Some(format!("HTTP {status}"));
    }
    find_body_marker(body).map(|_| "anti-bot page detected".to_string())
}
