//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;

use crate::types::*;

/// Storage abstraction for member records
///
/// This trait allows the dues ledger to work with any backend (a hosted
/// database service, SQL, in-memory, etc.) by implementing these methods.
/// Implementations report failures as [`StoreError`]; the ledger never
/// interprets backend-specific codes.
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// List all members
    async fn list(&self) -> LedgerResult<Vec<Member>>;

    /// Store a new member; the store assigns id, revision and timestamps
    async fn insert(&mut self, member: &NewMember) -> LedgerResult<Member>;

    /// Apply a partial update and return the stored record
    ///
    /// When `patch.expected_revision` is set and differs from the stored
    /// revision the write must fail with [`StoreError::Conflict`].
    async fn update(&mut self, id: &str, patch: &MemberPatch) -> LedgerResult<Member>;

    /// Delete a member
    async fn delete(&mut self, id: &str) -> LedgerResult<()>;
}

/// Trait for implementing custom member validation rules
pub trait MemberValidator: Send + Sync {
    /// Validate member details before they are written
    fn validate_details(&self, details: &MemberDetails) -> LedgerResult<()>;

    /// Validate the amount paid before tracking began
    fn validate_previous_amount(&self, amount: &BigDecimal) -> LedgerResult<()>;
}

/// Default member validator with the basic required-field rules
pub struct DefaultMemberValidator;

impl MemberValidator for DefaultMemberValidator {
    fn validate_details(&self, details: &MemberDetails) -> LedgerResult<()> {
        let required = [
            ("firstName", &details.first_name),
            ("lastName", &details.last_name),
            ("phoneNumber", &details.phone_number),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(LedgerError::MissingField(field));
            }
        }

        if details.user_type == UserType::Family
            && details.spouse.as_deref().is_none_or(|s| s.trim().is_empty())
        {
            return Err(LedgerError::MissingField("spouse"));
        }

        if details.user_type != UserType::Family && details.spouse.is_some() {
            return Err(LedgerError::Validation(
                "Spouse can only be recorded for family members".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_previous_amount(&self, amount: &BigDecimal) -> LedgerResult<()> {
        if *amount < BigDecimal::from(0) {
            return Err(LedgerError::Validation(
                "Previously paid amount cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}
