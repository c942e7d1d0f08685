//! Password policy engine
//!
//! Stateless validation of candidate passwords. Reads history hashes supplied
//! by the caller but never mutates them; pruning is the credential store's
//! concern.

/// Minimum candidate length
pub const MIN_LENGTH: usize = 10;

/// The punctuation set that satisfies the special-character rule
pub const SPECIAL_CHARS: &str = "!@#$%^&*()-_=+[]{};:'\",.<>/?\\|`~";

/// Closed set of policy violations.
///
/// The UI renders one message per violation on the authenticated
/// change-password channel; unauthenticated callers never see them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    TooShort,
    MissingUpper,
    MissingDigit,
    MissingSpecial,
    ContainsUsername,
    Reused,
}

impl PolicyViolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyViolation::TooShort => "TOO_SHORT",
            PolicyViolation::MissingUpper => "MISSING_UPPER",
            PolicyViolation::MissingDigit => "MISSING_DIGIT",
            PolicyViolation::MissingSpecial => "MISSING_SPECIAL",
            PolicyViolation::ContainsUsername => "CONTAINS_USERNAME",
            PolicyViolation::Reused => "REUSED",
        }
    }

    /// Message rendered to the authenticated caller
    pub fn message(&self) -> String {
        match self {
            PolicyViolation::TooShort => {
                format!("Password must be at least {} characters long", MIN_LENGTH)
            },
            PolicyViolation::MissingUpper => {
                "Password must contain at least one uppercase letter".to_string()
            },
            PolicyViolation::MissingDigit => "Password must contain at least one digit".to_string(),
            PolicyViolation::MissingSpecial => {
                "Password must contain at least one special character".to_string()
            },
            PolicyViolation::ContainsUsername => {
                "Password must not contain the username".to_string()
            },
            PolicyViolation::Reused => {
                "Password must not match any recently used password".to_string()
            },
        }
    }
}

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validate a candidate password against every policy rule.
///
/// `history_hashes` are the user's most recent stored hashes, newest first;
/// the caller limits them to the retention window. All rules are evaluated so
/// the result lists every violation, not just the first.
pub fn validate(
    candidate: &str,
    username: &str,
    history_hashes: &[String],
) -> Result<(), Vec<PolicyViolation>> {
    let mut violations = Vec::new();

    if candidate.chars().count() < MIN_LENGTH {
        violations.push(PolicyViolation::TooShort);
    }
    if !candidate.chars().any(|c| c.is_ascii_uppercase()) {
        violations.push(PolicyViolation::MissingUpper);
    }
    if !candidate.chars().any(|c| c.is_ascii_digit()) {
        violations.push(PolicyViolation::MissingDigit);
    }
    if !candidate.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        violations.push(PolicyViolation::MissingSpecial);
    }
    if !username.is_empty()
        && candidate.to_lowercase().contains(&username.to_lowercase())
    {
        violations.push(PolicyViolation::ContainsUsername);
    }
    if history_hashes
        .iter()
        .any(|hash| bcrypt::verify(candidate, hash).unwrap_or(false))
    {
        violations.push(PolicyViolation::Reused);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Render a violation list as the single INVALID_INPUT message body
pub fn violation_summary(violations: &[PolicyViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.as_str(), v.message()))
        .collect::<Vec<_>>()
        .join("; ")
}
