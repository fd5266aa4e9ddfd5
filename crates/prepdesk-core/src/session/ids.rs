//! Locally generated session identifiers.

use chrono::{DateTime, Utc};
use rand::Rng;

const GUEST_PREFIX: &str = "guest_";
const LOCAL_PREFIX: &str = "local_";

/// Random base-36 characters in a guest id, ahead of the timestamp suffix
const GUEST_RANDOM_LEN: usize = 11;

/// Fallback display name when the email has nothing before the `@`
pub const DEFAULT_LOCAL_NAME: &str = "User";

/// Fresh guest id: random base-36 characters followed by the millisecond
/// timestamp in base 36
pub fn guest_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let random: String = (0..GUEST_RANDOM_LEN)
        .map(|_| base36_digit(rng.gen_range(0..36)))
        .collect();
    format!("{}{}{}", GUEST_PREFIX, random, millis_base36(now))
}

/// Local account id derived from the email, e.g. `local_a_b_com_<ts>`
pub fn local_id(email: &str, now: DateTime<Utc>) -> String {
    format!("{}{}_{}", LOCAL_PREFIX, sanitize_email(email), millis_base36(now))
}

/// Replace everything that is not an ASCII letter or digit with `_`, one
/// per UTF-16 code unit so ids match those the mobile app generates
pub fn sanitize_email(email: &str) -> String {
    let mut sanitized = String::with_capacity(email.len());
    for c in email.chars() {
        if c.is_ascii_alphanumeric() {
            sanitized.push(c);
        } else {
            sanitized.extend(std::iter::repeat('_').take(c.len_utf16()));
        }
    }
    sanitized
}

/// Display name for an email-only account: the local part, or `User`
pub fn name_from_email(email: &str) -> String {
    match email.split('@').next() {
        Some(local) if !local.is_empty() => local.to_string(),
        _ => DEFAULT_LOCAL_NAME.to_string(),
    }
}

fn millis_base36(now: DateTime<Utc>) -> String {
    to_base36(now.timestamp_millis().max(0) as u64)
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(base36_digit((value % 36) as u32));
        value /= 36;
    }
    digits.iter().rev().collect()
}

fn base36_digit(d: u32) -> char {
    // from_digit only returns None for d >= radix
    std::char::from_digit(d, 36).unwrap_or('0')
}
