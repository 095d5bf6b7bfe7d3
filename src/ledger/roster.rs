//! Local projection of the member list

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Counts and totals across a roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterSummary {
    pub total_members: usize,
    pub single_members: usize,
    pub family_members: usize,
    /// Sum of every member's running total
    pub total_paid: BigDecimal,
}

/// Last known-good copy of the members held by a caller
///
/// The ledger's `*_in` operations change a roster only after the store has
/// confirmed the write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    members: Vec<Member>,
}

impl Roster {
    pub fn new(members: Vec<Member>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, member_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == member_id)
    }

    /// Replace the member with the same id, or append it
    pub fn upsert(&mut self, member: Member) {
        match self.members.iter_mut().find(|m| m.id == member.id) {
            Some(existing) => *existing = member,
            None => self.members.push(member),
        }
    }

    pub fn remove(&mut self, member_id: &str) -> Option<Member> {
        let index = self.members.iter().position(|m| m.id == member_id)?;
        Some(self.members.remove(index))
    }

    /// Case-insensitive match on full name, phone number or running total
    pub fn search(&self, term: &str) -> Vec<&Member> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.members.iter().collect();
        }
        self.members
            .iter()
            .filter(|m| {
                m.full_name().to_lowercase().contains(&term)
                    || m.details.phone_number.to_lowercase().contains(&term)
                    || m.total_amount_paid.to_string().contains(&term)
            })
            .collect()
    }

    /// Sum of all running totals
    pub fn total_paid(&self) -> BigDecimal {
        self.members.iter().map(|m| &m.total_amount_paid).sum()
    }

    pub fn count_by_type(&self, user_type: UserType) -> usize {
        self.members
            .iter()
            .filter(|m| m.user_type() == user_type)
            .count()
    }

    pub fn summary(&self) -> RosterSummary {
        RosterSummary {
            total_members: self.len(),
            single_members: self.count_by_type(UserType::Single),
            family_members: self.count_by_type(UserType::Family),
            total_paid: self.total_paid(),
        }
    }
}
