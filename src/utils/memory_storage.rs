//! In-memory member store for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::traits::*;
use crate::types::*;

/// In-memory member store for testing and development
///
/// Clones share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    members: Arc<RwLock<HashMap<String, Member>>>,
    latency: Option<Duration>,
}

impl MemoryStore {
    /// Create a new memory store instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`, to exercise store timeouts
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Seed a record as-is, bypassing id assignment
    pub fn seed(&self, member: Member) -> LedgerResult<()> {
        self.write()?.insert(member.id.clone(), member);
        Ok(())
    }

    /// Fetch a record by id
    pub fn get(&self, id: &str) -> LedgerResult<Option<Member>> {
        Ok(self.read()?.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.read().map(|members| members.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> LedgerResult<()> {
        self.write()?.clear();
        Ok(())
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, HashMap<String, Member>>> {
        self.members
            .read()
            .map_err(|_| StoreError::Backend("member table lock poisoned".to_string()).into())
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, HashMap<String, Member>>> {
        self.members
            .write()
            .map_err(|_| StoreError::Backend("member table lock poisoned".to_string()).into())
    }
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn list(&self) -> LedgerResult<Vec<Member>> {
        self.simulate_latency().await;
        let mut members: Vec<Member> = self.read()?.values().cloned().collect();
        members.sort_by_key(|m| {
            (
                m.details.last_name.to_lowercase(),
                m.details.first_name.to_lowercase(),
                m.id.clone(),
            )
        });
        Ok(members)
    }

    async fn insert(&mut self, member: &NewMember) -> LedgerResult<Member> {
        self.simulate_latency().await;
        let now = chrono::Utc::now().naive_utc();
        let stored = Member {
            id: uuid::Uuid::new_v4().to_string(),
            details: member.details.clone(),
            months_paid: member.months_paid.clone(),
            total_amount_paid: member.total_amount_paid.clone(),
            revision: 1,
            created_at: now,
            updated_at: now,
        };
        self.write()?.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update(&mut self, id: &str, patch: &MemberPatch) -> LedgerResult<Member> {
        self.simulate_latency().await;
        let mut members = self.write()?;
        let member = members
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(expected) = patch.expected_revision {
            if member.revision != expected {
                return Err(StoreError::Conflict {
                    id: id.to_string(),
                    expected,
                    actual: member.revision,
                }
                .into());
            }
        }

        if let Some(ref details) = patch.details {
            member.details = details.clone();
        }
        if let Some(ref months_paid) = patch.months_paid {
            member.months_paid = months_paid.clone();
        }
        if let Some(ref total) = patch.total_amount_paid {
            member.total_amount_paid = total.clone();
        }
        member.revision += 1;
        member.updated_at = chrono::Utc::now().naive_utc();

        Ok(member.clone())
    }

    async fn delete(&mut self, id: &str) -> LedgerResult<()> {
        self.simulate_latency().await;
        if self.write()?.remove(id).is_some() {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()).into())
        }
    }
}
