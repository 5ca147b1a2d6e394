/// Hours in a calendar day; valid hours are `0..HOURS_PER_DAY`.
pub const HOURS_PER_DAY: u8 = 24;

/// Width of the appointment ledger window, in calendar months.
pub const LEDGER_WINDOW_MONTHS: u32 = 6;

/// Appointments accepted from one ledger response. Larger responses are rejected.
pub const MAX_LEDGER_APPOINTMENTS: usize = 100_000;

/// Default request timeout for the HTTP source.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

/// Shortest accepted polling period.
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;
