//! Shared constants and invariants

pub const DEFAULT_PAGE_SIZE: usize = 500;
pub const DEFAULT_RATE_LIMIT_LOW_WATER: u64 = 2;
pub const DEFAULT_TOKEN_SAFETY_MARGIN_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

/// Pages fetched for one endpoint before the fetch is abandoned.
pub const DEFAULT_MAX_PAGES: u32 = 1_000;
/// 429 answers waited out per endpoint before giving up.
pub const MAX_RATE_LIMITED_REPLAYS: u32 = 3;

// Snapshot rebuild pulls
pub const DEFAULT_INDEX_OFFSETS: [u32; 3] = [0, 100, 200];

// Request headers
pub const PAGE_SIZE_HEADER: &str = "X-Page-Size";
pub const PAGE_NUMBER_HEADER: &str = "X-Page-Number";

// Response headers
pub const RATE_LIMIT_REMAINING_HEADER: &str = "X-Rate-Limit-Remaining";
pub const RATE_LIMIT_RESET_HEADER: &str = "X-Rate-Limit-Reset";

/// Reset values at or above this are unix timestamps, below it seconds-until-reset.
pub const EPOCH_RESET_THRESHOLD: i64 = 1_000_000_000;

pub const MAX_EMAIL_LEN: usize = 254;

pub const DEFAULT_EXCLUDED_CLASSES: [&str; 5] = ["Study Hall", "DEAR", "Lunch", "Help", "Advisory"];

pub const DEFAULT_SCOPES: [&str; 9] = [
    "https://purl.imsglobal.org/spec/or/v1p1/scope/roster-core.readonly",
    "https://purl.imsglobal.org/spec/or/v1p1/scope/roster.readonly",
    "classes:list",
    "academics.classes:list",
    "academics.classes:read",
    "academics.enrollments:list",
    "academics.enrollments:read",
    "classes:read",
    "report_card.enrollments.qualitative_grades:list",
];
