//! Shared constants for end-to-end tests
//!
//! When seeded users change, update only this file.

// ============================================================================
// Seeded Users
// ============================================================================

/// Host user, owns the seeded timeslots
pub const HOST_EMAIL: &str = "kim@timeslot.test";
pub const HOST_PASS: &str = "hostpass123";
pub const HOST_NAME: &str = "Kim";

/// Guest user, books the host's timeslots
pub const GUEST_EMAIL: &str = "lee@timeslot.test";
pub const GUEST_PASS: &str = "guestpass123";
pub const GUEST_NAME: &str = "Lee";

/// Third user, neither host nor guest of anything seeded
pub const OTHER_EMAIL: &str = "park@timeslot.test";
pub const OTHER_PASS: &str = "otherpass123";
pub const OTHER_NAME: &str = "Park";

// ============================================================================
// Timing
// ============================================================================

pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
