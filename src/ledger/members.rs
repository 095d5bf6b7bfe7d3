//! Member management functionality

use bigdecimal::BigDecimal;
use tracing::{debug, info, warn};

use crate::config::{ConcurrencyMode, LedgerConfig};
use crate::ledger::payments::recompute_total;
use crate::traits::*;
use crate::types::*;
use crate::utils::deadline::within;

/// What to do when a new member's name matches an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Report the clash and write nothing
    #[default]
    Warn,
    /// Create the member anyway
    Override,
}

/// Advisory signal that a member with the same name already exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateWarning {
    pub first_name: String,
    pub last_name: String,
    /// Ids of the members that share the name
    pub existing_ids: Vec<String>,
}

/// Result of a create request
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(Member),
    /// Nothing was written; retry with [`DuplicatePolicy::Override`] to proceed
    DuplicateWarning(DuplicateWarning),
}

impl CreateOutcome {
    pub fn member(&self) -> Option<&Member> {
        match self {
            CreateOutcome::Created(member) => Some(member),
            CreateOutcome::DuplicateWarning(_) => None,
        }
    }

    pub fn into_member(self) -> Option<Member> {
        match self {
            CreateOutcome::Created(member) => Some(member),
            CreateOutcome::DuplicateWarning(_) => None,
        }
    }

    pub fn warning(&self) -> Option<&DuplicateWarning> {
        match self {
            CreateOutcome::Created(_) => None,
            CreateOutcome::DuplicateWarning(warning) => Some(warning),
        }
    }
}

/// Result of a details edit
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Updated(Member),
    /// The new name is taken; nothing was written
    DuplicateWarning(DuplicateWarning),
}

impl EditOutcome {
    pub fn member(&self) -> Option<&Member> {
        match self {
            EditOutcome::Updated(member) => Some(member),
            EditOutcome::DuplicateWarning(_) => None,
        }
    }

    pub fn into_member(self) -> Option<Member> {
        match self {
            EditOutcome::Updated(member) => Some(member),
            EditOutcome::DuplicateWarning(_) => None,
        }
    }

    pub fn warning(&self) -> Option<&DuplicateWarning> {
        match self {
            EditOutcome::Updated(_) => None,
            EditOutcome::DuplicateWarning(warning) => Some(warning),
        }
    }
}

/// Everything needed to register a member
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMemberRequest {
    pub details: MemberDetails,
    /// Months already paid; missing cells of the tracked range are added as unpaid
    pub months_paid: MonthsPaid,
    /// Amount paid before tracking began, folded once into the total
    pub previously_paid: BigDecimal,
}

impl CreateMemberRequest {
    pub fn new(details: MemberDetails) -> Self {
        Self {
            details,
            months_paid: MonthsPaid::new(),
            previously_paid: BigDecimal::from(0),
        }
    }

    /// Mark a month as already paid
    pub fn paid(mut self, year: i32, month: Month) -> Self {
        self.months_paid.set(year, month, true);
        self
    }

    pub fn previously_paid(mut self, amount: BigDecimal) -> Self {
        self.previously_paid = amount;
        self
    }
}

/// Member manager for creating, editing and deleting members
pub struct MemberManager<S: MemberStore> {
    pub(crate) storage: S,
    config: LedgerConfig,
    validator: Box<dyn MemberValidator>,
}

impl<S: MemberStore> MemberManager<S> {
    /// Create a new member manager
    pub fn new(storage: S, config: LedgerConfig) -> Self {
        Self {
            storage,
            config,
            validator: Box::new(DefaultMemberValidator),
        }
    }

    /// Create a new member manager with custom validator
    pub fn with_validator(
        storage: S,
        config: LedgerConfig,
        validator: Box<dyn MemberValidator>,
    ) -> Self {
        Self {
            storage,
            config,
            validator,
        }
    }

    /// List all members
    pub async fn list_members(&self) -> LedgerResult<Vec<Member>> {
        within(self.config.store_timeout(), "list", self.storage.list()).await
    }

    /// Members whose first and last name match, ignoring case
    pub async fn find_duplicates(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> LedgerResult<Vec<Member>> {
        let members = self.list_members().await?;
        Ok(members
            .into_iter()
            .filter(|m| m.details.same_name_as(first_name, last_name))
            .collect())
    }

    /// Warning for members other than `exclude_id` already using this name
    async fn duplicate_warning(
        &self,
        details: &MemberDetails,
        exclude_id: Option<&str>,
    ) -> LedgerResult<Option<DuplicateWarning>> {
        let existing_ids: Vec<String> = self
            .find_duplicates(&details.first_name, &details.last_name)
            .await?
            .into_iter()
            .map(|m| m.id)
            .filter(|id| Some(id.as_str()) != exclude_id)
            .collect();

        if existing_ids.is_empty() {
            return Ok(None);
        }

        Ok(Some(DuplicateWarning {
            first_name: details.first_name.clone(),
            last_name: details.last_name.clone(),
            existing_ids,
        }))
    }

    /// Register a member with its initial payment history
    pub async fn create_member(
        &mut self,
        request: CreateMemberRequest,
        policy: DuplicatePolicy,
    ) -> LedgerResult<CreateOutcome> {
        let details = request.details.normalized();
        info!(
            first_name = %details.first_name,
            last_name = %details.last_name,
            user_type = %details.user_type,
            "Creating member"
        );

        // Validate the member
        self.validator.validate_details(&details)?;
        self.validator
            .validate_previous_amount(&request.previously_paid)?;

        let range = self.config.year_range;
        for (year, _) in request.months_paid.paid_cells() {
            range.check(year)?;
        }

        // Advisory duplicate check
        if let Some(warning) = self.duplicate_warning(&details, None).await? {
            match policy {
                DuplicatePolicy::Warn => {
                    warn!(
                        name = %details.full_name(),
                        existing = warning.existing_ids.len(),
                        "Member with the same name already exists"
                    );
                    return Ok(CreateOutcome::DuplicateWarning(warning));
                }
                DuplicatePolicy::Override => {
                    debug!(
                        name = %details.full_name(),
                        existing = warning.existing_ids.len(),
                        "Creating member despite duplicate name"
                    );
                }
            }
        }

        // Unpaid years outside the range carry nothing
        let mut months_paid = request.months_paid;
        months_paid.retain_range(range);
        months_paid.fill_range(range);
        let total_amount_paid = (&request.previously_paid
            + recompute_total(&months_paid, details.user_type))
        .normalized();

        let new_member = NewMember {
            details,
            months_paid,
            total_amount_paid,
        };

        let member = within(
            self.config.store_timeout(),
            "insert",
            self.storage.insert(&new_member),
        )
        .await?;

        info!(
            member_id = %member.id,
            total = %member.total_amount_paid,
            "Created member"
        );

        Ok(CreateOutcome::Created(member))
    }

    /// Edit name, phone, spouse or address; the payment ledger is never touched
    ///
    /// A rename onto another member's name goes through the same advisory
    /// duplicate check as [`MemberManager::create_member`]. An edit that
    /// changes nothing skips the store and hands back a clone of `member`,
    /// so it does not detect a member deleted in the meantime.
    pub async fn update_details(
        &mut self,
        member: &Member,
        edit: &MemberEdit,
        policy: DuplicatePolicy,
    ) -> LedgerResult<EditOutcome> {
        let details = edit.apply_to(&member.details).normalized();

        // Validate the edited member
        self.validator.validate_details(&details)?;

        if details == member.details {
            debug!(member_id = %member.id, "Edit changes nothing, skipping write");
            return Ok(EditOutcome::Updated(member.clone()));
        }

        let renamed = !member
            .details
            .same_name_as(&details.first_name, &details.last_name);
        if renamed {
            if let Some(warning) = self.duplicate_warning(&details, Some(&member.id)).await? {
                match policy {
                    DuplicatePolicy::Warn => {
                        warn!(
                            member_id = %member.id,
                            name = %details.full_name(),
                            existing = warning.existing_ids.len(),
                            "Rename clashes with an existing member"
                        );
                        return Ok(EditOutcome::DuplicateWarning(warning));
                    }
                    DuplicatePolicy::Override => {
                        debug!(
                            member_id = %member.id,
                            name = %details.full_name(),
                            "Renaming member despite duplicate name"
                        );
                    }
                }
            }
        }

        let patch = MemberPatch {
            details: Some(details),
            expected_revision: self.expected_revision(member),
            ..Default::default()
        };

        let stored = within(
            self.config.store_timeout(),
            "update",
            self.storage.update(&member.id, &patch),
        )
        .await?;

        info!(member_id = %stored.id, "Updated member details");
        Ok(EditOutcome::Updated(stored))
    }

    /// Delete a member unconditionally
    pub async fn delete_member(&mut self, member_id: &str) -> LedgerResult<()> {
        info!(member_id, "Deleting member");
        within(
            self.config.store_timeout(),
            "delete",
            self.storage.delete(member_id),
        )
        .await
    }

    fn expected_revision(&self, member: &Member) -> Option<u64> {
        match self.config.concurrency {
            ConcurrencyMode::Versioned => Some(member.revision),
            ConcurrencyMode::LastWriteWins => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryStore;

    fn jane() -> MemberDetails {
        MemberDetails::new("Jane", "Doe", "555-0100", UserType::Single)
    }

    #[tokio::test]
    async fn test_create_single_without_history_starts_at_zero() {
        let mut manager = MemberManager::new(MemoryStore::new(), LedgerConfig::default());
        let member = manager
            .create_member(CreateMemberRequest::new(jane()), DuplicatePolicy::Warn)
            .await
            .unwrap()
            .into_member()
            .unwrap();

        assert_eq!(member.total_amount_paid, BigDecimal::from(0));
        assert_eq!(member.months_paid.missing_cells(YearRange::default()), 0);
        assert_eq!(
            member.months_paid.years().collect::<Vec<_>>(),
            (2024..=2030).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_create_family_with_history_and_previous_amount() {
        let mut manager = MemberManager::new(MemoryStore::new(), LedgerConfig::default());
        let details =
            MemberDetails::new("Ann", "Lee", "555-0101", UserType::Family).with_spouse("Bo Lee");
        let request = CreateMemberRequest::new(details)
            .paid(2024, Month::January)
            .paid(2024, Month::February)
            .previously_paid(BigDecimal::from(50));

        let member = manager
            .create_member(request, DuplicatePolicy::Warn)
            .await
            .unwrap()
            .into_member()
            .unwrap();

        assert_eq!(member.total_amount_paid, BigDecimal::from(70));
        assert!(member.is_paid(2024, Month::February));
        assert!(!member.is_paid(2024, Month::March));
    }

    #[tokio::test]
    async fn test_create_validation_aborts_before_write() {
        let store = MemoryStore::new();
        let mut manager = MemberManager::new(store.clone(), LedgerConfig::default());

        let details = MemberDetails::new("Jane", "", "", UserType::Single);
        let err = manager
            .create_member(CreateMemberRequest::new(details), DuplicatePolicy::Warn)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::MissingField("lastName")));

        let request = CreateMemberRequest::new(jane()).paid(2023, Month::December);
        let err = manager
            .create_member(request, DuplicatePolicy::Warn)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::YearOutOfRange { year: 2023, .. }));

        let request = CreateMemberRequest::new(jane()).previously_paid(BigDecimal::from(-1));
        assert!(manager
            .create_member(request, DuplicatePolicy::Warn)
            .await
            .unwrap_err()
            .is_validation());

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_name_warns_then_override_creates() {
        let store = MemoryStore::new();
        let mut manager = MemberManager::new(store.clone(), LedgerConfig::default());
        let first = manager
            .create_member(CreateMemberRequest::new(jane()), DuplicatePolicy::Warn)
            .await
            .unwrap()
            .into_member()
            .unwrap();

        let shouting = MemberDetails::new("JANE", "doe", "555-0199", UserType::Single);
        let outcome = manager
            .create_member(CreateMemberRequest::new(shouting.clone()), DuplicatePolicy::Warn)
            .await
            .unwrap();
        let warning = outcome.warning().unwrap();
        assert_eq!(warning.existing_ids, vec![first.id.clone()]);
        assert_eq!(store.len(), 1);

        let second = manager
            .create_member(CreateMemberRequest::new(shouting), DuplicatePolicy::Override)
            .await
            .unwrap()
            .into_member()
            .unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_update_details_leaves_ledger_alone() {
        let mut manager = MemberManager::new(MemoryStore::new(), LedgerConfig::default());
        let request = CreateMemberRequest::new(jane())
            .paid(2024, Month::May)
            .previously_paid(BigDecimal::from(20));
        let member = manager
            .create_member(request, DuplicatePolicy::Warn)
            .await
            .unwrap()
            .into_member()
            .unwrap();

        let edit = MemberEdit {
            phone_number: Some("555-0222".to_string()),
            city: Some(Some("Berlin".to_string())),
            ..Default::default()
        };
        let updated = manager
            .update_details(&member, &edit, DuplicatePolicy::Warn)
            .await
            .unwrap()
            .into_member()
            .unwrap();

        assert_eq!(updated.details.phone_number, "555-0222");
        assert_eq!(updated.details.city.as_deref(), Some("Berlin"));
        assert_eq!(updated.months_paid, member.months_paid);
        assert_eq!(updated.total_amount_paid, member.total_amount_paid);

        let blank = MemberEdit {
            first_name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            manager
                .update_details(&updated, &blank, DuplicatePolicy::Warn)
                .await,
            Err(LedgerError::MissingField("firstName"))
        ));
    }

    #[tokio::test]
    async fn test_rename_onto_existing_name_warns_without_writing() {
        let store = MemoryStore::new();
        let mut manager = MemberManager::new(store.clone(), LedgerConfig::default());
        let jane = manager
            .create_member(CreateMemberRequest::new(jane()), DuplicatePolicy::Warn)
            .await
            .unwrap()
            .into_member()
            .unwrap();
        let ann = manager
            .create_member(
                CreateMemberRequest::new(MemberDetails::new(
                    "Ann",
                    "Lee",
                    "555-0101",
                    UserType::Single,
                )),
                DuplicatePolicy::Warn,
            )
            .await
            .unwrap()
            .into_member()
            .unwrap();

        let rename = MemberEdit {
            first_name: Some("JANE".to_string()),
            last_name: Some("doe".to_string()),
            ..Default::default()
        };
        let outcome = manager
            .update_details(&ann, &rename, DuplicatePolicy::Warn)
            .await
            .unwrap();
        assert_eq!(outcome.warning().unwrap().existing_ids, vec![jane.id.clone()]);
        assert_eq!(store.get(&ann.id).unwrap(), Some(ann.clone()));

        let renamed = manager
            .update_details(&ann, &rename, DuplicatePolicy::Override)
            .await
            .unwrap()
            .into_member()
            .unwrap();
        assert_eq!(renamed.full_name(), "JANE doe");
        assert_eq!(renamed.revision, ann.revision + 1);
    }

    #[tokio::test]
    async fn test_recasing_own_name_is_not_a_duplicate() {
        let mut manager = MemberManager::new(MemoryStore::new(), LedgerConfig::default());
        let member = manager
            .create_member(CreateMemberRequest::new(jane()), DuplicatePolicy::Warn)
            .await
            .unwrap()
            .into_member()
            .unwrap();

        let recase = MemberEdit {
            first_name: Some("JANE".to_string()),
            ..Default::default()
        };
        let updated = manager
            .update_details(&member, &recase, DuplicatePolicy::Warn)
            .await
            .unwrap()
            .into_member()
            .unwrap();
        assert_eq!(updated.details.first_name, "JANE");
    }

    #[tokio::test]
    async fn test_noop_edit_skips_store() {
        let store = MemoryStore::new();
        let mut manager = MemberManager::new(store.clone(), LedgerConfig::default());
        let member = manager
            .create_member(CreateMemberRequest::new(jane()), DuplicatePolicy::Warn)
            .await
            .unwrap()
            .into_member()
            .unwrap();

        let same = MemberEdit {
            first_name: Some(" Jane ".to_string()),
            ..Default::default()
        };
        let unchanged = manager
            .update_details(&member, &same, DuplicatePolicy::Warn)
            .await
            .unwrap()
            .into_member()
            .unwrap();
        assert_eq!(unchanged, member);
        assert_eq!(
            store.get(&member.id).unwrap().map(|m| m.revision),
            Some(member.revision)
        );

        // No round trip, so a vanished member is not noticed here
        store.clear().unwrap();
        assert!(manager
            .update_details(&member, &same, DuplicatePolicy::Warn)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unpaid_years_outside_range_are_dropped() {
        let mut manager = MemberManager::new(MemoryStore::new(), LedgerConfig::default());
        let mut months_paid = MonthsPaid::unpaid(YearRange::new(2020, 2020).unwrap());
        months_paid.set(2024, Month::March, true);
        let request = CreateMemberRequest {
            months_paid,
            ..CreateMemberRequest::new(jane())
        };

        let member = manager
            .create_member(request, DuplicatePolicy::Warn)
            .await
            .unwrap()
            .into_member()
            .unwrap();

        assert!(!member.months_paid.years().any(|year| year == 2020));
        assert!(member.is_paid(2024, Month::March));
        assert_eq!(member.total_amount_paid.to_string(), "7.5");
    }

    #[tokio::test]
    async fn test_created_total_has_no_trailing_zeros() {
        let mut manager = MemberManager::new(MemoryStore::new(), LedgerConfig::default());
        let request = CreateMemberRequest::new(jane())
            .paid(2024, Month::January)
            .paid(2024, Month::February)
            .previously_paid("0.00".parse().unwrap());

        let member = manager
            .create_member(request, DuplicatePolicy::Warn)
            .await
            .unwrap()
            .into_member()
            .unwrap();

        assert_eq!(member.total_amount_paid.to_string(), "15");

        let empty = manager
            .create_member(
                CreateMemberRequest::new(jane())
                    .previously_paid("0.00".parse().unwrap()),
                DuplicatePolicy::Override,
            )
            .await
            .unwrap()
            .into_member()
            .unwrap();
        assert_eq!(empty.total_amount_paid.to_string(), "0");
    }

    #[tokio::test]
    async fn test_delete_missing_member_is_store_error() {
        let mut manager = MemberManager::new(MemoryStore::new(), LedgerConfig::default());
        let err = manager.delete_member("ghost").await.unwrap_err();
        assert!(matches!(err, LedgerError::Store(StoreError::NotFound(_))));
    }
}
