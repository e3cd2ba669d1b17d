//! Field validation for pending customers
//!
//! Validation failures drop the item from the pipeline (counted as filtered),
//! they are not processing errors.

use crate::domain::Customer;

/// A single failed field check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check the fields a customer must have to be processable
///
/// Returns every failed check, not just the first.
pub fn validate_customer(customer: &Customer) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if customer.name.trim().is_empty() {
        errors.push(FieldError::new("name", "name is required"));
    }

    let email = customer.email.trim();
    if email.is_empty() {
        errors.push(FieldError::new("email", "email is required"));
    } else if !is_email_like(email) {
        errors.push(FieldError::new("email", "email is not well-formed"));
    }

    errors
}

/// Minimal email shape check: non-empty local and domain parts around one '@'
pub fn is_email_like(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.starts_with('.') && domain.contains('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_customer_has_no_errors() {
        let customer = Customer::new("Ada Lovelace", "ada@example.com", None);
        assert!(validate_customer(&customer).is_empty());
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let customer = Customer::new("   ", "ada@example.com", None);
        let errors = validate_customer(&customer);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "name");
    }

    #[test]
    fn test_missing_email_is_rejected() {
        let customer = Customer::new("Ada Lovelace", "", None);
        let errors = validate_customer(&customer);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "email");
    }

    #[test]
    fn test_malformed_email_is_rejected() {
        for email in ["not-an-email", "@example.com", "ada@", "ada@localhost"] {
            let customer = Customer::new("Ada Lovelace", email, None);
            let errors = validate_customer(&customer);
            assert_eq!(errors.len(), 1, "expected rejection for {:?}", email);
            assert_eq!(errors[0].field, "email");
        }
    }

    #[test]
    fn test_multiple_errors_are_collected() {
        let customer = Customer::new("", "bad", None);
        let errors = validate_customer(&customer);

        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_is_email_like() {
        assert!(is_email_like("ada@example.com"));
        assert!(is_email_like("a.b+c@sub.example.org"));
        assert!(!is_email_like("ada"));
        assert!(!is_email_like("ada@"));
        assert!(!is_email_like("@example.com"));
    }
}
