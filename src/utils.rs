use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

/// Prefix marking an OAuth state that belongs to the account-linking flow.
pub const LINK_STATE_PREFIX: &str = "link:";

const NONCE_LEN: usize = 32;
const SIGNATURE_LEN: usize = 16;

pub fn generate_nonce() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

fn sign(nonce: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(nonce.as_bytes());
    let mut sig = URL_SAFE_NO_PAD.encode(hasher.finalize());
    sig.truncate(SIGNATURE_LEN);
    sig
}

/// Builds a CSRF state of the form `<nonce>.<signature>`.
///
/// The signature lets the callback verify the state without server-side
/// storage.
pub fn generate_state(secret: &str) -> String {
    let nonce = generate_nonce();
    let sig = sign(&nonce, secret);
    format!("{nonce}.{sig}")
}

/// Same as [`generate_state`] but tagged for the account-linking flow.
pub fn generate_link_state(secret: &str) -> String {
    format!("{LINK_STATE_PREFIX}{}", generate_state(secret))
}

pub fn is_link_state(state: &str) -> bool {
    state.starts_with(LINK_STATE_PREFIX)
}

/// Checks that a state produced by [`generate_state`] or
/// [`generate_link_state`] was signed with `secret`.
pub fn verify_state(state: &str, secret: &str) -> bool {
    let state = state.strip_prefix(LINK_STATE_PREFIX).unwrap_or(state);
    match state.split_once('.') {
        Some((nonce, sig)) if !nonce.is_empty() => sign(nonce, secret) == sig,
        _ => false,
    }
}

/// Six random digits, zero padded.
pub fn generate_reset_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

/// Reduces a display name to a lowercase username made of `[a-z0-9_.]`.
///
/// Whitespace and dashes become underscores, other characters are dropped,
/// and the result is clamped to 3..=30 characters (short names are padded
/// with `user`).
pub fn sanitize_username(raw: &str) -> String {
    let mut out: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            'a'..='z' | '0'..='9' | '_' | '.' => Some(c),
            c if c.is_whitespace() || c == '-' => Some('_'),
            _ => None,
        })
        .collect();

    while out.contains("__") {
        out = out.replace("__", "_");
    }
    let mut out = out.trim_matches('_').to_string();
    out.truncate(30);

    if out.len() < 3 {
        out = format!("user{out}");
    }
    out
}

/// Candidate username for the `attempt`-th collision: `base`, `base1`, `base2`...
pub fn username_candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{base}{attempt}")
    }
}

/// Number of pages needed to show `total` rows, `page_size` at a time.
pub fn total_pages(total: i64, page_size: u32) -> u32 {
    if total <= 0 || page_size == 0 {
        return 0;
    }
    let size = page_size as i64;
    ((total + size - 1) / size) as u32
}

/// Accepts a bare track id, a `spotify:track:` URI or an open.spotify.com
/// link and returns the `spotify:track:<id>` URI.
pub fn normalize_track_uri(track: &str) -> Option<String> {
    let track = track.trim();
    let id = if let Some(id) = track.strip_prefix("spotify:track:") {
        id
    } else if let Some(rest) = track.split("/track/").nth(1) {
        rest.split(['?', '/']).next().unwrap_or_default()
    } else {
        track
    };

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!("spotify:track:{id}"))
}

/// Rounds to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
