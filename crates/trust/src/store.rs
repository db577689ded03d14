//! Profile persistence boundary.
//!
//! The kernel only specifies the interface; the in-memory map is one
//! interchangeable implementation. Backends must guarantee
//! at-most-one-writer-wins per agent id, which the in-memory store does
//! with a single write lock plus an optimistic version check.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use agenttrust_types::{AgentId, TrustBand};

use crate::profile::TrustProfile;
use crate::{Result, TrustError};

/// Filters for profile queries.
#[derive(Debug, Clone, Default)]
pub struct ProfileQuery {
    /// Only profiles currently in this band
    pub band: Option<TrustBand>,
    /// Only profiles calculated strictly before this instant (staleness)
    pub calculated_before: Option<DateTime<Utc>>,
    /// Cap on the number of returned profiles
    pub limit: Option<usize>,
}

/// Storage interface for trust profiles, keyed by agent id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, agent_id: &AgentId) -> Result<Option<TrustProfile>>;

    /// Persist a profile.
    ///
    /// Implementations must reject stale writes: saving over an existing
    /// profile requires the incoming version to be exactly one greater
    /// than the stored version.
    async fn save(&self, profile: TrustProfile) -> Result<()>;

    /// Remove a profile; returns whether one existed.
    async fn delete(&self, agent_id: &AgentId) -> Result<bool>;

    async fn exists(&self, agent_id: &AgentId) -> Result<bool>;

    async fn query(&self, query: ProfileQuery) -> Result<Vec<TrustProfile>>;
}

/// Default in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<AgentId, TrustProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, agent_id: &AgentId) -> Result<Option<TrustProfile>> {
        Ok(self.profiles.read().await.get(agent_id).cloned())
    }

    async fn save(&self, profile: TrustProfile) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        if let Some(current) = profiles.get(&profile.agent_id) {
            if profile.version != current.version + 1 {
                return Err(TrustError::VersionConflict(format!(
                    "agent {}: incoming version {} over stored {}",
                    profile.agent_id, profile.version, current.version
                )));
            }
        }
        profiles.insert(profile.agent_id.clone(), profile);
        Ok(())
    }

    async fn delete(&self, agent_id: &AgentId) -> Result<bool> {
        Ok(self.profiles.write().await.remove(agent_id).is_some())
    }

    async fn exists(&self, agent_id: &AgentId) -> Result<bool> {
        Ok(self.profiles.read().await.contains_key(agent_id))
    }

    async fn query(&self, query: ProfileQuery) -> Result<Vec<TrustProfile>> {
        let profiles = self.profiles.read().await;
        let mut results: Vec<TrustProfile> = profiles
            .values()
            .filter(|p| query.band.map(|b| p.band == b).unwrap_or(true))
            .filter(|p| {
                query
                    .calculated_before
                    .map(|cutoff| p.calculated_at < cutoff)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        results.sort_by(|a, b| a.calculated_at.cmp(&b.calculated_at));
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }
}
