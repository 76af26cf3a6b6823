/// External service endpoints
pub const DEFAULT_NPI_API_BASE_URL: &str = "https://npiregistry.cms.hhs.gov/api/";
pub const DEFAULT_GEOCODING_API_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

pub const DEFAULT_FUZZY_MATCH_THRESHOLD: f64 = 0.85;

// Issue texts appended to a record's issue list. Downstream review tooling
// matches on these strings, so they are part of the output contract.
pub const ISSUE_NPI_NOT_FOUND: &str = "NPI not found in registry";
pub const ISSUE_NPI_MISSING: &str = "NPI missing";
pub const ISSUE_ADDRESS_NOT_VALIDATED: &str = "Address not validated by Google Maps";
pub const ISSUE_PHONE_FORMAT_INVALID: &str = "Phone number format invalid";
pub const ISSUE_EMAIL_FORMAT_INVALID: &str = "Email format invalid";
pub const ISSUE_LOW_OVERALL_CONFIDENCE: &str = "Low overall confidence score";
pub const ISSUE_MISSING_CRITICAL_PREFIX: &str = "Missing critical fields: ";
pub const ISSUE_MULTIPLE_ISSUES: &str = "Multiple validation issues detected";

// Suspicious patterns detected by the QA stage
pub const PATTERN_NAME_MISMATCH: &str = "Name mismatch between original and validated";
pub const PATTERN_INVALID_PHONE: &str = "Invalid phone number format";
pub const PATTERN_SUSPICIOUS_ADDRESS: &str = "Suspicious address pattern";

/// Address fragments that indicate placeholder or fabricated data
pub const SUSPICIOUS_ADDRESS_WORDS: [&str; 5] = ["test", "example", "fake", "dummy", "12345"];

// Validation notes
pub const NOTE_REQUIRES_REVIEW: &str = "Requires manual review";
pub const NOTE_SUSPICIOUS: &str = "Suspicious patterns detected";
pub const NOTE_HIGH_CONFIDENCE: &str = "High confidence validation";
pub const NOTE_MODERATE_CONFIDENCE: &str = "Moderate confidence validation";
pub const NOTE_LOW_CONFIDENCE: &str = "Low confidence validation";
