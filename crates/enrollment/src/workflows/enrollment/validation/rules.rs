use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use super::super::registry::FormatRule;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

fn mobile_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(09|\+639)\d{9}$").expect("mobile pattern compiles"))
}

fn learner_reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{12}$").expect("lrn pattern compiles"))
}

fn school_year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{4}$").expect("school year pattern compiles"))
}

/// Check a non-blank value against one format rule, returning the user-facing reason on failure.
pub fn check(rule: FormatRule, value: &str) -> Result<(), String> {
    let value = value.trim();
    let ok = match rule {
        FormatRule::Email => email_pattern().is_match(value),
        FormatRule::MobileNumber => mobile_pattern().is_match(&value.replace([' ', '-'], "")),
        FormatRule::LearnerReference => learner_reference_pattern().is_match(value),
        FormatRule::SchoolYear => school_year_pattern().is_match(value),
        FormatRule::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        FormatRule::AgeRange { min, max } => value
            .parse::<u8>()
            .map(|age| (min..=max).contains(&age))
            .unwrap_or(false),
    };
    if ok {
        return Ok(());
    }

    Err(match rule {
        FormatRule::Email => "Please enter a valid email address".to_string(),
        FormatRule::MobileNumber => {
            "Please enter a valid mobile number (e.g. 09171234567)".to_string()
        }
        FormatRule::LearnerReference => "LRN must be exactly 12 digits".to_string(),
        FormatRule::SchoolYear => "School year must look like 2025-2026".to_string(),
        FormatRule::Date => "Please enter a valid date".to_string(),
        FormatRule::AgeRange { min, max } => format!("Age must be between {min} and {max}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_numbers_accept_local_and_international_prefixes() {
        assert!(check(FormatRule::MobileNumber, "09171234567").is_ok());
        assert!(check(FormatRule::MobileNumber, "+639171234567").is_ok());
        assert!(check(FormatRule::MobileNumber, "0917-123-4567").is_ok());
        assert!(check(FormatRule::MobileNumber, "0817123456").is_err());
    }

    #[test]
    fn email_needs_a_dotted_domain() {
        assert!(check(FormatRule::Email, "parent@example.ph").is_ok());
        assert!(check(FormatRule::Email, "parent@localhost").is_err());
        assert!(check(FormatRule::Email, "two words@example.ph").is_err());
    }

    #[test]
    fn age_is_bounded() {
        let rule = FormatRule::AgeRange { min: 3, max: 25 };
        assert!(check(rule, "3").is_ok());
        assert!(check(rule, "25").is_ok());
        assert_eq!(check(rule, "2"), Err("Age must be between 3 and 25".to_string()));
        assert!(check(rule, "ten").is_err());
    }

    #[test]
    fn learner_reference_is_twelve_digits() {
        assert!(check(FormatRule::LearnerReference, "123456789012").is_ok());
        assert!(check(FormatRule::LearnerReference, "12345678901").is_err());
    }
}
