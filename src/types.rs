//! Core types and data structures for the dues ledger

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Membership type, which determines the monthly due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Individual membership, 7.5 per month
    Single,
    /// Household membership, 10 per month
    Family,
}

impl UserType {
    /// Monthly due for this membership type
    pub fn monthly_rate(&self) -> BigDecimal {
        match self {
            UserType::Single => BigDecimal::new(75i64.into(), 1),
            UserType::Family => BigDecimal::from(10),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Single => "single",
            UserType::Family => "family",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(UserType::Single),
            "family" => Ok(UserType::Family),
            _ => Err(LedgerError::UnknownUserType(s.to_string())),
        }
    }
}

/// Calendar month, ordered January through December
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    /// All twelve months in calendar order
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// English month name as stored in the payment matrix
    pub fn name(&self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    /// 1-based month number
    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }

    /// Month from its 1-based number
    pub fn from_number(number: u32) -> Option<Month> {
        number
            .checked_sub(1)
            .and_then(|index| Month::ALL.get(index as usize).copied())
    }

    /// Year and month that a calendar date falls in
    pub fn period_of(date: NaiveDate) -> (i32, Month) {
        // chrono months are always 1..=12
        let month = Month::ALL[date.month0() as usize];
        (date.year(), month)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Month {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Month::ALL
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| LedgerError::UnknownMonth(s.to_string()))
    }
}

/// Widest span of years a range may cover
pub const MAX_YEAR_SPAN: i64 = 100;

/// Inclusive range of tracked years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    /// Create a range, rejecting `start > end` and spans over [`MAX_YEAR_SPAN`] years
    pub fn new(start: i32, end: i32) -> LedgerResult<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.start > self.end {
            return Err(LedgerError::Config(format!(
                "Year range start {} is after end {}",
                self.start, self.end
            )));
        }
        let span = i64::from(self.end) - i64::from(self.start) + 1;
        if span > MAX_YEAR_SPAN {
            return Err(LedgerError::Config(format!(
                "Year range {}-{} spans {} years, at most {} allowed",
                self.start, self.end, span, MAX_YEAR_SPAN
            )));
        }
        Ok(())
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }

    /// Fail with `YearOutOfRange` unless `year` is tracked
    pub fn check(&self, year: i32) -> LedgerResult<()> {
        if self.contains(year) {
            Ok(())
        } else {
            Err(LedgerError::YearOutOfRange {
                year,
                start: self.start,
                end: self.end,
            })
        }
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: 2024,
            end: 2030,
        }
    }
}

/// Per-year, per-month paid flags
///
/// Cells that are absent read as unpaid.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthsPaid(BTreeMap<i32, BTreeMap<Month, bool>>);

impl MonthsPaid {
    /// Empty matrix with no years at all
    pub fn new() -> Self {
        Self::default()
    }

    /// Matrix covering every year of `range`, all months unpaid
    pub fn unpaid(range: YearRange) -> Self {
        let mut matrix = Self::new();
        matrix.fill_range(range);
        matrix
    }

    /// Add any missing year or month of `range` as unpaid; existing cells are kept
    pub fn fill_range(&mut self, range: YearRange) {
        for year in range.years() {
            let months = self.0.entry(year).or_default();
            for month in Month::ALL {
                months.entry(month).or_insert(false);
            }
        }
    }

    /// Drop every year outside `range`
    pub fn retain_range(&mut self, range: YearRange) {
        self.0.retain(|year, _| range.contains(*year));
    }

    pub fn is_paid(&self, year: i32, month: Month) -> bool {
        self.0
            .get(&year)
            .and_then(|months| months.get(&month))
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&mut self, year: i32, month: Month, paid: bool) {
        self.0.entry(year).or_default().insert(month, paid);
    }

    /// Flip a cell and return its new value
    pub fn toggle(&mut self, year: i32, month: Month) -> bool {
        let paid = !self.is_paid(year, month);
        self.set(year, month, paid);
        paid
    }

    /// Years present in the matrix, ascending
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.keys().copied()
    }

    /// Every `(year, month)` cell marked paid
    pub fn paid_cells(&self) -> impl Iterator<Item = (i32, Month)> + '_ {
        self.0.iter().flat_map(|(year, months)| {
            months
                .iter()
                .filter(|(_, paid)| **paid)
                .map(move |(month, _)| (*year, *month))
        })
    }

    pub fn paid_count(&self) -> usize {
        self.paid_cells().count()
    }

    /// Whether any month of `year` is unpaid or absent
    pub fn has_unpaid_in_year(&self, year: i32) -> bool {
        Month::ALL.iter().any(|month| !self.is_paid(year, *month))
    }

    /// Number of cells inside `range` that are absent from the matrix
    pub fn missing_cells(&self, range: YearRange) -> usize {
        range
            .years()
            .map(|year| match self.0.get(&year) {
                Some(months) => Month::ALL.iter().filter(|m| !months.contains_key(*m)).count(),
                None => Month::ALL.len(),
            })
            .sum()
    }
}

/// Descriptive fields of a member, everything except the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetails {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub user_type: UserType,
    #[serde(default)]
    pub spouse: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

impl MemberDetails {
    /// Details with the required fields set and no optional ones
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone_number: impl Into<String>,
        user_type: UserType,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone_number: phone_number.into(),
            user_type,
            spouse: None,
            street: None,
            zipcode: None,
            city: None,
        }
    }

    pub fn with_spouse(mut self, spouse: impl Into<String>) -> Self {
        self.spouse = Some(spouse.into());
        self
    }

    pub fn with_address(
        mut self,
        street: impl Into<String>,
        zipcode: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        self.street = Some(street.into());
        self.zipcode = Some(zipcode.into());
        self.city = Some(city.into());
        self
    }

    /// Trim text fields, turn blank optionals into `None`, and drop the
    /// spouse of a non-family member
    pub fn normalized(self) -> Self {
        let spouse = match self.user_type {
            UserType::Family => blank_to_none(self.spouse),
            UserType::Single => None,
        };
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone_number: self.phone_number.trim().to_string(),
            user_type: self.user_type,
            spouse,
            street: blank_to_none(self.street),
            zipcode: blank_to_none(self.zipcode),
            city: blank_to_none(self.city),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Case-insensitive match on first and last name
    pub fn same_name_as(&self, first_name: &str, last_name: &str) -> bool {
        self.first_name.trim().to_lowercase() == first_name.trim().to_lowercase()
            && self.last_name.trim().to_lowercase() == last_name.trim().to_lowercase()
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A stored member record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Identifier assigned by the store
    pub id: String,
    #[serde(flatten)]
    pub details: MemberDetails,
    /// Paid flag per year and month
    pub months_paid: MonthsPaid,
    /// Running total, derived from `months_paid` plus any amount paid before tracking began
    pub total_amount_paid: BigDecimal,
    /// Bumped by the store on every write
    #[serde(default)]
    pub revision: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Member {
    pub fn full_name(&self) -> String {
        self.details.full_name()
    }

    pub fn user_type(&self) -> UserType {
        self.details.user_type
    }

    pub fn is_paid(&self, year: i32, month: Month) -> bool {
        self.months_paid.is_paid(year, month)
    }
}

/// A member that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    #[serde(flatten)]
    pub details: MemberDetails,
    pub months_paid: MonthsPaid,
    pub total_amount_paid: BigDecimal,
}

/// Partial update sent to the store; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberPatch {
    pub details: Option<MemberDetails>,
    pub months_paid: Option<MonthsPaid>,
    pub total_amount_paid: Option<BigDecimal>,
    /// When set, the store rejects the write unless the stored revision matches
    pub expected_revision: Option<u64>,
}

impl MemberPatch {
    pub fn is_empty(&self) -> bool {
        self.details.is_none() && self.months_paid.is_none() && self.total_amount_paid.is_none()
    }
}

/// Field edits for an existing member; never touches the payment ledger
///
/// `spouse`, `street`, `zipcode` and `city` use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberEdit {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub spouse: Option<Option<String>>,
    pub street: Option<Option<String>>,
    pub zipcode: Option<Option<String>>,
    pub city: Option<Option<String>>,
}

impl MemberEdit {
    /// Apply the edit on top of existing details
    pub fn apply_to(&self, details: &MemberDetails) -> MemberDetails {
        let mut updated = details.clone();
        if let Some(ref first_name) = self.first_name {
            updated.first_name = first_name.clone();
        }
        if let Some(ref last_name) = self.last_name {
            updated.last_name = last_name.clone();
        }
        if let Some(ref phone_number) = self.phone_number {
            updated.phone_number = phone_number.clone();
        }
        if let Some(ref spouse) = self.spouse {
            updated.spouse = spouse.clone();
        }
        if let Some(ref street) = self.street {
            updated.street = street.clone();
        }
        if let Some(ref zipcode) = self.zipcode {
            updated.zipcode = zipcode.clone();
        }
        if let Some(ref city) = self.city {
            updated.city = city.clone();
        }
        updated
    }
}

/// Errors raised by a member store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Member not found: {0}")]
    NotFound(String),
    #[error("Revision conflict on member {id}: expected {expected}, found {actual}")]
    Conflict { id: String, expected: u64, actual: u64 },
    #[error("Store call '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
    #[error("Store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether a retry of the same call could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout { .. })
    }
}

/// Errors that can occur in the ledger system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Year {year} is outside the tracked range {start}-{end}")]
    YearOutOfRange { year: i32, start: i32, end: i32 },
    #[error("Unknown month: {0}")]
    UnknownMonth(String),
    #[error("Unknown user type: {0}")]
    UnknownUserType(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Input was rejected before any store call was made
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::Validation(_)
                | LedgerError::MissingField(_)
                | LedgerError::YearOutOfRange { .. }
                | LedgerError::UnknownMonth(_)
                | LedgerError::UnknownUserType(_)
        )
    }

    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            LedgerError::Store(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_are_exact() {
        assert_eq!(UserType::Single.monthly_rate(), "7.5".parse::<BigDecimal>().unwrap());
        assert_eq!(UserType::Family.monthly_rate(), BigDecimal::from(10));
    }

    #[test]
    fn test_month_parsing_and_numbers() {
        assert_eq!("june".parse::<Month>().unwrap(), Month::June);
        assert_eq!(" December ".parse::<Month>().unwrap(), Month::December);
        assert!(matches!(
            "Juni".parse::<Month>(),
            Err(LedgerError::UnknownMonth(_))
        ));
        assert_eq!(Month::January.number(), 1);
        assert_eq!(Month::from_number(12), Some(Month::December));
        assert_eq!(Month::from_number(0), None);
        assert_eq!(Month::from_number(13), None);
    }

    #[test]
    fn test_period_of_date() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(Month::period_of(date), (2025, Month::June));
    }

    #[test]
    fn test_user_type_parsing_is_case_insensitive() {
        assert_eq!("Family".parse::<UserType>().unwrap(), UserType::Family);
        assert_eq!("SINGLE".parse::<UserType>().unwrap(), UserType::Single);
        assert!("couple".parse::<UserType>().is_err());
    }

    #[test]
    fn test_unpaid_matrix_covers_range() {
        let range = YearRange::new(2024, 2025).unwrap();
        let matrix = MonthsPaid::unpaid(range);
        assert_eq!(matrix.years().collect::<Vec<_>>(), vec![2024, 2025]);
        assert_eq!(matrix.missing_cells(range), 0);
        assert_eq!(matrix.paid_count(), 0);
    }

    #[test]
    fn test_absent_cells_read_unpaid() {
        let mut matrix = MonthsPaid::new();
        assert!(!matrix.is_paid(2024, Month::May));
        assert!(matrix.toggle(2024, Month::May));
        assert!(matrix.is_paid(2024, Month::May));
        assert!(!matrix.toggle(2024, Month::May));
        assert_eq!(matrix.missing_cells(YearRange::new(2024, 2024).unwrap()), 11);
    }

    #[test]
    fn test_fill_range_keeps_existing_cells() {
        let mut matrix = MonthsPaid::new();
        matrix.set(2024, Month::March, true);
        matrix.fill_range(YearRange::default());
        assert!(matrix.is_paid(2024, Month::March));
        assert_eq!(matrix.paid_count(), 1);
        assert_eq!(matrix.missing_cells(YearRange::default()), 0);
    }

    #[test]
    fn test_year_range_rejects_inverted_bounds() {
        assert!(YearRange::new(2030, 2024).is_err());
        let range = YearRange::default();
        assert!(range.check(2024).is_ok());
        assert!(matches!(
            range.check(2031),
            Err(LedgerError::YearOutOfRange { year: 2031, .. })
        ));
    }

    #[test]
    fn test_year_range_caps_its_span() {
        assert!(YearRange::new(1950, 2049).is_ok());
        assert!(matches!(
            YearRange::new(1950, 2050),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            YearRange::new(i32::MIN, i32::MAX),
            Err(LedgerError::Config(_))
        ));
    }

    #[test]
    fn test_retain_range_drops_other_years() {
        let mut matrix = MonthsPaid::unpaid(YearRange::new(2020, 2025).unwrap());
        matrix.set(2024, Month::March, true);
        matrix.retain_range(YearRange::default());
        assert_eq!(matrix.years().collect::<Vec<_>>(), vec![2024, 2025]);
        assert!(matrix.is_paid(2024, Month::March));
    }

    #[test]
    fn test_normalized_clears_single_spouse() {
        let details = MemberDetails::new(" Jane ", "Doe", "555", UserType::Single)
            .with_spouse("John");
        let details = details.normalized();
        assert_eq!(details.first_name, "Jane");
        assert_eq!(details.spouse, None);

        let family = MemberDetails::new("Ann", "Lee", "555", UserType::Family)
            .with_spouse("  ");
        assert_eq!(family.normalized().spouse, None);
    }

    #[test]
    fn test_member_serializes_with_camel_case_fields() {
        let now = chrono::Utc::now().naive_utc();
        let mut months_paid = MonthsPaid::new();
        months_paid.set(2024, Month::January, true);
        let member = Member {
            id: "m1".to_string(),
            details: MemberDetails::new("Jane", "Doe", "555", UserType::Single),
            months_paid,
            total_amount_paid: UserType::Single.monthly_rate(),
            revision: 1,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&member).unwrap();
        assert_eq!(json["firstName"], "Jane");
        assert_eq!(json["userType"], "single");
        assert_eq!(json["monthsPaid"]["2024"]["January"], true);

        let back: Member = serde_json::from_value(json).unwrap();
        assert_eq!(back, member);
    }
}
