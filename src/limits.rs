//! Hard caps guarding engine inputs.

/// Iteration bound for series expansion. Counts every cursor step,
/// including weekend skips.
pub const MAX_EXPANSION_ITERATIONS: u32 = 100;

/// Longest accepted meeting title.
pub const MAX_TITLE_LEN: usize = 200;

/// Longest accepted meeting description.
pub const MAX_DESCRIPTION_LEN: usize = 2_000;

/// Most participants accepted on a single meeting.
pub const MAX_PARTICIPANTS: usize = 100;

/// Longest accepted single-meeting duration, in hours.
pub const MAX_MEETING_DURATION_HOURS: i64 = 24 * 7;
