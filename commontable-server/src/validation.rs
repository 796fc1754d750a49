//! Form validation for the auth endpoints.
//!
//! Validation runs before any row is written: a rejected signup must not
//! leave a user behind. Errors are per-field so clients can render them
//! inline.

use commontable_types::{FieldError, SignUpRequest};

const MIN_PASSWORD_LEN: usize = 6;

fn field_error(field: &str, message: impl Into<String>) -> FieldError {
    FieldError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Structural email check: one '@' with something on both sides and a dot
/// in the domain part. Deliverability is the mail server's problem.
fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Validate a signup form against the configured email domain
/// (e.g. "yale.edu"). Returns every failing field, not just the first.
pub fn validate_signup(request: &SignUpRequest, email_domain: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if request.name.trim().is_empty() {
        errors.push(field_error("name", "Name is required"));
    }

    let email = request.email.trim();
    if email.is_empty() {
        errors.push(field_error("email", "Email is required"));
    } else if !is_plausible_email(email) {
        errors.push(field_error("email", "Enter a valid email address"));
    } else if !email
        .to_lowercase()
        .ends_with(&format!("@{}", email_domain.to_lowercase()))
    {
        errors.push(field_error(
            "email",
            format!("Please use your @{} email address", email_domain),
        ));
    }

    if request.major.trim().is_empty() {
        errors.push(field_error("major", "Major is required"));
    }

    if request.year.trim().is_empty() {
        errors.push(field_error("year", "Year is required"));
    }

    if request.password.len() < MIN_PASSWORD_LEN {
        errors.push(field_error(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    errors
}

/// Validate a signin form: email shape and password length only.
/// Credential verification happens against the stored hash.
pub fn validate_signin(email: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let email = email.trim();
    if email.is_empty() {
        errors.push(field_error("email", "Email is required"));
    } else if !is_plausible_email(email) {
        errors.push(field_error("email", "Enter a valid email address"));
    }

    if password.is_empty() {
        errors.push(field_error("password", "Password is required"));
    } else if password.len() < MIN_PASSWORD_LEN {
        errors.push(field_error(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> SignUpRequest {
        SignUpRequest {
            name: "Sarah Chen".to_string(),
            email: "sarah.chen@yale.edu".to_string(),
            major: "Computer Science".to_string(),
            year: "Junior".to_string(),
            password: "dinner123".to_string(),
        }
    }

    fn messages_for<'a>(errors: &'a [FieldError], field: &str) -> Vec<&'a str> {
        errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    #[test]
    fn test_valid_signup_passes() {
        assert!(validate_signup(&valid_request(), "yale.edu").is_empty());
    }

    #[test]
    fn test_wrong_domain_rejected_with_domain_message() {
        let mut request = valid_request();
        request.email = "student@gmail.com".to_string();

        let errors = validate_signup(&request, "yale.edu");
        assert_eq!(
            messages_for(&errors, "email"),
            vec!["Please use your @yale.edu email address"]
        );
    }

    #[test]
    fn test_domain_check_is_case_insensitive() {
        let mut request = valid_request();
        request.email = "Sarah.Chen@YALE.EDU".to_string();
        assert!(validate_signup(&request, "yale.edu").is_empty());
    }

    #[test]
    fn test_subdomain_of_wrong_domain_rejected() {
        // "notyale.edu" must not pass a naive ends_with("yale.edu") check
        let mut request = valid_request();
        request.email = "student@notyale.edu".to_string();
        assert!(!validate_signup(&request, "yale.edu").is_empty());
    }

    #[test]
    fn test_short_password_rejected() {
        let mut request = valid_request();
        request.password = "12345".to_string();

        let errors = validate_signup(&request, "yale.edu");
        assert_eq!(
            messages_for(&errors, "password"),
            vec!["Password must be at least 6 characters"]
        );

        request.password = "123456".to_string();
        assert!(validate_signup(&request, "yale.edu").is_empty());
    }

    #[test]
    fn test_all_failing_fields_reported() {
        let request = SignUpRequest {
            name: "  ".to_string(),
            email: "not-an-email".to_string(),
            major: String::new(),
            year: String::new(),
            password: "abc".to_string(),
        };

        let errors = validate_signup(&request, "yale.edu");
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "major", "year", "password"]);
    }

    #[test]
    fn test_malformed_emails_rejected() {
        for email in ["@yale.edu", "sarah@", "sarah", "sarah@yale", "sarah@.edu"] {
            let mut request = valid_request();
            request.email = email.to_string();
            assert!(
                !validate_signup(&request, "yale.edu").is_empty(),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn test_signin_checks_shape_not_domain() {
        assert_eq!(validate_signin("", "").len(), 2);
        assert_eq!(validate_signin("a@yale.edu", "").len(), 1);
        assert_eq!(validate_signin("not-an-email", "dinner123").len(), 1);
        assert_eq!(validate_signin("a@yale.edu", "short").len(), 1);
        // Any well-formed email may sign in; the domain rule applies at signup
        assert!(validate_signin("a@gmail.com", "dinner123").is_empty());
    }
}
