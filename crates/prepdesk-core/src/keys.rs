//! Storage keys shared with the mobile app.
//!
//! Values must stay byte-compatible with what the app already wrote to
//! device storage, so these are not namespaced further.

/// Primary session record
pub const USER: &str = "@upsc_user";

/// Last guest session, kept separately so a guest identity can be restored
pub const GUEST_USER: &str = "@upsc_guest_user";

/// Set once the app has been launched (or onboarding completed)
pub const HAS_LAUNCHED: &str = "@has_launched";

pub const STATS: &str = "@upsc_stats";
pub const STREAK: &str = "@upsc_streak";
pub const TEST_HISTORY: &str = "@upsc_test_history";
pub const SETTINGS: &str = "@upsc_settings";
pub const QUESTION_BANK: &str = "@question_bank";

/// Value stored under [`HAS_LAUNCHED`]
pub const LAUNCHED_VALUE: &str = "true";

/// Application data owned by the signed-in user, wiped on account deletion
pub const USER_DATA: [&str; 5] = [STATS, STREAK, TEST_HISTORY, SETTINGS, QUESTION_BANK];

/// Everything removed by account deletion
pub fn account_keys() -> Vec<&'static str> {
    let mut keys = vec![USER, GUEST_USER];
    keys.extend_from_slice(&USER_DATA);
    keys
}
