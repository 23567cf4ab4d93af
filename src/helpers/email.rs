use crate::error::{ReportError, Result};
use crate::utils::constants::MAX_EMAIL_LEN;

/// Trim the input and check it looks like an address before any lookup.
///
/// Valid means: contains `@`, the domain after the last `@` contains a `.`,
/// and the whole address is at most 254 characters.
pub fn validate_email(input: &str) -> Result<&str> {
    let email = input.trim();
    let valid = email.len() <= MAX_EMAIL_LEN
        && email
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.contains('.'));

    if valid {
        Ok(email)
    } else {
        Err(ReportError::InvalidEmail(email.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_trims_plain_addresses() {
        assert_eq!(validate_email("  first_last@school.org ").unwrap(), "first_last@school.org");
    }

    #[test]
    fn rejects_missing_at_or_dot() {
        assert!(validate_email("first_last.school.org").is_err());
        assert!(validate_email("first_last@school").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn only_the_last_domain_needs_a_dot() {
        assert!(validate_email("a.b@c@d.org").is_ok());
        assert!(validate_email("a@b.c@d").is_err());
    }

    #[test]
    fn rejects_overlong_addresses() {
        let long = format!("{}@school.org", "a".repeat(250));
        assert!(matches!(validate_email(&long), Err(ReportError::InvalidEmail(_))));
    }
}
