//! Validation utilities

use crate::traits::*;
use crate::types::*;
use bigdecimal::BigDecimal;

/// Validate that a name is present and of reasonable length
pub fn validate_name(field: &'static str, name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::MissingField(field));
    }

    if name.chars().count() > 100 {
        return Err(LedgerError::Validation(format!(
            "{} cannot exceed 100 characters",
            field
        )));
    }

    Ok(())
}

/// Validate that a phone number looks dialable
pub fn validate_phone_number(phone_number: &str) -> LedgerResult<()> {
    if phone_number.trim().is_empty() {
        return Err(LedgerError::MissingField("phoneNumber"));
    }

    // Digits plus the usual separators
    if !phone_number
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '/' | '.'))
    {
        return Err(LedgerError::Validation(format!(
            "Phone number '{}' contains invalid characters",
            phone_number
        )));
    }

    if phone_number.chars().filter(|c| c.is_ascii_digit()).count() < 3 {
        return Err(LedgerError::Validation(format!(
            "Phone number '{}' has too few digits",
            phone_number
        )));
    }

    Ok(())
}

/// Validate an optional address field
pub fn validate_address_field(field: &'static str, value: Option<&str>) -> LedgerResult<()> {
    if let Some(value) = value {
        if value.chars().count() > 200 {
            return Err(LedgerError::Validation(format!(
                "{} cannot exceed 200 characters",
                field
            )));
        }
    }
    Ok(())
}

/// Enhanced member validator with detailed checks
pub struct EnhancedMemberValidator;

impl MemberValidator for EnhancedMemberValidator {
    fn validate_details(&self, details: &MemberDetails) -> LedgerResult<()> {
        // Basic validation
        DefaultMemberValidator.validate_details(details)?;

        // Enhanced validations
        validate_name("firstName", &details.first_name)?;
        validate_name("lastName", &details.last_name)?;
        validate_phone_number(&details.phone_number)?;
        if let Some(ref spouse) = details.spouse {
            validate_name("spouse", spouse)?;
        }
        validate_address_field("street", details.street.as_deref())?;
        validate_address_field("zipcode", details.zipcode.as_deref())?;
        validate_address_field("city", details.city.as_deref())?;

        Ok(())
    }

    fn validate_previous_amount(&self, amount: &BigDecimal) -> LedgerResult<()> {
        DefaultMemberValidator.validate_previous_amount(amount)?;

        // Cents at most
        let (_, scale) = amount.normalized().as_bigint_and_exponent();
        if scale > 2 {
            return Err(LedgerError::Validation(format!(
                "Previously paid amount {} has more than two decimal places",
                amount
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_number_rules() {
        assert!(validate_phone_number("+49 (030) 123-456").is_ok());
        assert!(validate_phone_number("call me").is_err());
        assert!(validate_phone_number("12").is_err());
        assert!(matches!(
            validate_phone_number("  "),
            Err(LedgerError::MissingField("phoneNumber"))
        ));
    }

    #[test]
    fn test_enhanced_validator_checks_lengths() {
        let long_name = "x".repeat(101);
        let details = MemberDetails::new(long_name, "Doe", "555-0100", UserType::Single);
        assert!(matches!(
            EnhancedMemberValidator.validate_details(&details),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_enhanced_validator_keeps_basic_rules() {
        let details = MemberDetails::new("Ann", "Lee", "555-0100", UserType::Family);
        assert!(matches!(
            EnhancedMemberValidator.validate_details(&details),
            Err(LedgerError::MissingField("spouse"))
        ));
    }

    #[test]
    fn test_previous_amount_precision() {
        let ok: BigDecimal = "12.50".parse().unwrap();
        let too_precise: BigDecimal = "12.505".parse().unwrap();
        assert!(EnhancedMemberValidator.validate_previous_amount(&ok).is_ok());
        assert!(EnhancedMemberValidator
            .validate_previous_amount(&too_precise)
            .is_err());
    }
}
