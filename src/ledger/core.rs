//! Main ledger orchestrator that coordinates members and payments

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::debug;

use crate::config::LedgerConfig;
use crate::ledger::{
    payments, CreateMemberRequest, CreateOutcome, DuplicatePolicy, EditOutcome, MemberManager,
    PaymentManager, Roster,
};
use crate::reconciliation::{ReconciliationEngine, ReconciliationReport};
use crate::traits::*;
use crate::types::*;

/// Main ledger system that orchestrates all dues operations
pub struct Ledger<S: MemberStore> {
    member_manager: MemberManager<S>,
    payment_manager: PaymentManager<S>,
    reconciliation: ReconciliationEngine,
    config: LedgerConfig,
}

impl<S: MemberStore + Clone> Ledger<S> {
    /// Create a new ledger with the given storage backend and default settings
    pub fn new(storage: S) -> Self {
        let config = LedgerConfig::default();
        Self {
            member_manager: MemberManager::new(storage.clone(), config.clone()),
            payment_manager: PaymentManager::new(storage, config.clone()),
            reconciliation: ReconciliationEngine::new(config.year_range),
            config,
        }
    }

    /// Create a new ledger with explicit settings
    pub fn with_config(storage: S, config: LedgerConfig) -> LedgerResult<Self> {
        Self::with_validator(storage, config, Box::new(DefaultMemberValidator))
    }

    /// Create a new ledger with explicit settings and a custom validator
    pub fn with_validator(
        storage: S,
        config: LedgerConfig,
        validator: Box<dyn MemberValidator>,
    ) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self {
            member_manager: MemberManager::with_validator(
                storage.clone(),
                config.clone(),
                validator,
            ),
            payment_manager: PaymentManager::new(storage, config.clone()),
            reconciliation: ReconciliationEngine::new(config.year_range),
            config,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // Member operations
    /// Register a member with its payment history
    pub async fn create_member(
        &mut self,
        request: CreateMemberRequest,
        policy: DuplicatePolicy,
    ) -> LedgerResult<CreateOutcome> {
        self.member_manager.create_member(request, policy).await
    }

    /// List all members
    pub async fn list_members(&self) -> LedgerResult<Vec<Member>> {
        self.member_manager.list_members().await
    }

    /// Members sharing a first and last name, ignoring case
    pub async fn find_duplicates(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> LedgerResult<Vec<Member>> {
        self.member_manager
            .find_duplicates(first_name, last_name)
            .await
    }

    /// Edit descriptive fields of a member; renames are checked for duplicates
    pub async fn update_details(
        &mut self,
        member: &Member,
        edit: &MemberEdit,
        policy: DuplicatePolicy,
    ) -> LedgerResult<EditOutcome> {
        self.member_manager.update_details(member, edit, policy).await
    }

    /// Delete a member
    pub async fn delete_member(&mut self, member_id: &str) -> LedgerResult<()> {
        self.member_manager.delete_member(member_id).await
    }

    // Payment operations
    /// Flip one month's paid flag and adjust the running total
    pub async fn toggle_month_paid(
        &mut self,
        member: &Member,
        year: i32,
        month: Month,
    ) -> LedgerResult<Member> {
        self.payment_manager
            .toggle_month_paid(member, year, month)
            .await
    }

    /// Full re-sum of a payment matrix
    pub fn recompute_total(months_paid: &MonthsPaid, user_type: UserType) -> BigDecimal {
        payments::recompute_total(months_paid, user_type)
    }

    /// Members who have not paid `(year, month)`
    pub fn find_unpaid(members: &[Member], year: i32, month: Month) -> Vec<&Member> {
        payments::find_unpaid(members, year, month)
    }

    /// Members with any unpaid month in `year`
    pub fn find_unpaid_in_year(members: &[Member], year: i32) -> Vec<&Member> {
        payments::find_unpaid_in_year(members, year)
    }

    /// Members who have not paid for the month containing `today`
    pub fn find_unpaid_this_month(members: &[Member], today: NaiveDate) -> Vec<&Member> {
        payments::find_unpaid_this_month(members, today)
    }

    /// Members with any unpaid month in the year before `today`
    pub fn find_unpaid_previous_year(members: &[Member], today: NaiveDate) -> Vec<&Member> {
        payments::find_unpaid_previous_year(members, today)
    }

    // Roster operations
    /// Load every member into a fresh local projection
    pub async fn load_roster(&self) -> LedgerResult<Roster> {
        let members = self.list_members().await?;
        debug!(members = members.len(), "Loaded roster");
        Ok(Roster::new(members))
    }

    /// Create a member and add it to `roster` once stored
    pub async fn create_member_in(
        &mut self,
        roster: &mut Roster,
        request: CreateMemberRequest,
        policy: DuplicatePolicy,
    ) -> LedgerResult<CreateOutcome> {
        let outcome = self.create_member(request, policy).await?;
        if let Some(member) = outcome.member() {
            roster.upsert(member.clone());
        }
        Ok(outcome)
    }

    /// Toggle a month for a roster member; the roster changes only if the write succeeds
    pub async fn toggle_month_paid_in(
        &mut self,
        roster: &mut Roster,
        member_id: &str,
        year: i32,
        month: Month,
    ) -> LedgerResult<Member> {
        let member = Self::roster_member(roster, member_id)?;
        let stored = self.toggle_month_paid(&member, year, month).await?;
        roster.upsert(stored.clone());
        Ok(stored)
    }

    /// Edit a roster member; the roster changes only if the write succeeds
    pub async fn update_details_in(
        &mut self,
        roster: &mut Roster,
        member_id: &str,
        edit: &MemberEdit,
        policy: DuplicatePolicy,
    ) -> LedgerResult<EditOutcome> {
        let member = Self::roster_member(roster, member_id)?;
        let outcome = self.update_details(&member, edit, policy).await?;
        if let Some(stored) = outcome.member() {
            roster.upsert(stored.clone());
        }
        Ok(outcome)
    }

    /// Delete a member and drop it from `roster` once the store confirms
    pub async fn delete_member_in(&mut self, roster: &mut Roster, member_id: &str) -> LedgerResult<()> {
        self.delete_member(member_id).await?;
        roster.remove(member_id);
        Ok(())
    }

    fn roster_member(roster: &Roster, member_id: &str) -> LedgerResult<Member> {
        roster
            .get(member_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(member_id.to_string()).into())
    }

    // Reconciliation
    /// Audit every stored member's total against its payment matrix
    pub async fn audit(&self) -> LedgerResult<ReconciliationReport> {
        let members = self.list_members().await?;
        Ok(self.reconciliation.audit(&members))
    }
}
