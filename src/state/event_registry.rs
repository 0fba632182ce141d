use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use poise::serenity_prelude::MessageId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ActionError, ActionResult};
use crate::models::{Event, Report, SwapProposal};

pub type EventHandle = Arc<Mutex<Event>>;
pub type ReportHandle = Arc<Mutex<Report>>;

/// Reports that never get fully paid are dropped after this many days
pub const REPORT_RETENTION_DAYS: i64 = 30;

/// Authoritative store of live events and reports, keyed by the id of the
/// Discord message that displays them.
///
/// Each record sits behind its own async mutex. Handlers hold the lock for
/// the whole read-modify-render cycle so concurrent clicks on one event are
/// applied one after another.
#[derive(Default)]
pub struct EventRegistry {
    events: DashMap<MessageId, EventHandle>,
    reports: DashMap<MessageId, ReportHandle>,
    swaps: DashMap<Uuid, SwapProposal>,
    save_lock: Mutex<()>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_event(&self, message_id: MessageId, event: Event) -> EventHandle {
        let handle = Arc::new(Mutex::new(event));
        self.events.insert(message_id, handle.clone());
        handle
    }

    pub fn event(&self, message_id: MessageId) -> ActionResult<EventHandle> {
        self.events
            .get(&message_id)
            .map(|h| h.value().clone())
            .ok_or_else(|| ActionError::not_found("Event"))
    }

    pub fn remove_event(&self, message_id: MessageId) -> Option<EventHandle> {
        self.events.remove(&message_id).map(|(_, h)| h)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Store a report, dropping any past the retention age
    pub fn insert_report(&self, message_id: MessageId, report: Report) -> ReportHandle {
        self.prune_reports_before(Utc::now() - Duration::days(REPORT_RETENTION_DAYS));
        let handle = Arc::new(Mutex::new(report));
        self.reports.insert(message_id, handle.clone());
        handle
    }

    /// Forget a settled report
    pub fn remove_report(&self, message_id: MessageId) -> Option<ReportHandle> {
        self.reports.remove(&message_id).map(|(_, h)| h)
    }

    pub fn report_count(&self) -> usize {
        self.reports.len()
    }

    /// Drop reports created before `cutoff`. Reports locked by a handler are
    /// in use and kept.
    fn prune_reports_before(&self, cutoff: DateTime<Utc>) {
        let before = self.reports.len();
        self.reports.retain(|_, handle| {
            handle
                .try_lock()
                .map(|report| report.created_at >= cutoff)
                .unwrap_or(true)
        });
        let pruned = before.saturating_sub(self.reports.len());
        if pruned > 0 {
            info!("Dropped {} report(s) older than {} days", pruned, REPORT_RETENTION_DAYS);
        }
    }

    pub fn report(&self, message_id: MessageId) -> ActionResult<ReportHandle> {
        self.reports
            .get(&message_id)
            .map(|h| h.value().clone())
            .ok_or_else(|| ActionError::not_found("Report"))
    }

    /// Store a swap proposal, dropping any that have expired
    pub fn propose_swap(&self, proposal: SwapProposal) -> Uuid {
        self.prune_expired_swaps();
        let id = proposal.id;
        self.swaps.insert(id, proposal);
        debug!("Stored swap proposal {}", id);
        id
    }

    /// Look up a live swap proposal without consuming it
    pub fn swap(&self, id: Uuid) -> ActionResult<SwapProposal> {
        let now = Utc::now();
        match self.swaps.get(&id).map(|p| p.value().clone()) {
            Some(proposal) if !proposal.is_expired_at(now) => Ok(proposal),
            Some(_) => {
                self.swaps.remove(&id);
                Err(ActionError::not_found("Swap request (it expired)"))
            }
            None => Err(ActionError::not_found("Swap request")),
        }
    }

    /// Remove a proposal once it has been answered
    pub fn take_swap(&self, id: Uuid) -> Option<SwapProposal> {
        self.swaps.remove(&id).map(|(_, p)| p)
    }

    pub fn pending_swap_count(&self) -> usize {
        self.swaps.len()
    }

    fn prune_expired_swaps(&self) {
        let now = Utc::now();
        self.swaps.retain(|_, p| !p.is_expired_at(now));
    }

    /// Copy of every event and report, for persisting.
    ///
    /// Waits for each record lock, so callers must not hold one.
    pub async fn snapshot(&self) -> RegistrySnapshot {
        let events: Vec<(MessageId, EventHandle)> = self
            .events
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        let reports: Vec<(MessageId, ReportHandle)> = self
            .reports
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();

        let mut snapshot = RegistrySnapshot::default();
        for (id, handle) in events {
            let event = handle.lock().await.clone();
            snapshot.events.insert(id.to_string(), event);
        }
        for (id, handle) in reports {
            let report = handle.lock().await.clone();
            snapshot.reports.insert(id.to_string(), report);
        }
        snapshot
    }

    /// Rebuild a registry from a snapshot
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        let registry = Self::new();
        for (id, event) in snapshot.events {
            if let Ok(id) = id.parse::<u64>() {
                registry.insert_event(MessageId::new(id), event);
            }
        }
        for (id, report) in snapshot.reports {
            if let Ok(id) = id.parse::<u64>() {
                registry.insert_report(MessageId::new(id), report);
            }
        }
        info!(
            "Restored {} events and {} reports",
            registry.events.len(),
            registry.reports.len()
        );
        registry
    }

    /// Write the current snapshot to disk. Must not be called while holding
    /// a record lock.
    pub async fn persist(&self, path: &str) -> crate::error::Result<()> {
        let _guard = self.save_lock.lock().await;
        self.snapshot().await.save(path).await
    }
}

/// On-disk form of the registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Schema version
    pub version: u32,

    /// Message ID -> event
    pub events: HashMap<String, Event>,

    /// Message ID -> report
    pub reports: HashMap<String, Report>,
}

impl RegistrySnapshot {
    /// Load from a JSON file, or start empty if there is none
    pub async fn load(path: &str) -> crate::error::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                crate::error::BotError::ConfigParse {
                    path: path.to_string(),
                    source: e,
                }
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(crate::error::BotError::StateLoad {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    /// Save to a JSON file atomically
    pub async fn save(&self, path: &str) -> crate::error::Result<()> {
        let mut snapshot = self.clone();
        snapshot.version = 1;
        let content = serde_json::to_string_pretty(&snapshot)?;

        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content).await.map_err(|e| {
            crate::error::BotError::StateSave {
                path: path.to_string(),
                source: e,
            }
        })?;

        tokio::fs::rename(&temp_path, path).await.map_err(|e| {
            crate::error::BotError::StateSave {
                path: path.to_string(),
                source: e,
            }
        })?;

        Ok(())
    }
}

/// Shared registry type
pub type SharedEventRegistry = Arc<EventRegistry>;

pub fn create_shared_event_registry(registry: EventRegistry) -> SharedEventRegistry {
    Arc::new(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::{ChannelId, UserId};

    const OWNER: UserId = UserId::new(1);

    fn sample_event() -> Event {
        let roles = vec!["Tank".to_string(), "Healer".to_string()];
        Event::new("Raid", "20:00", "", OWNER, "Owner", None, ChannelId::new(9), &roles).unwrap()
    }

    #[tokio::test]
    async fn test_event_lookup() {
        let registry = EventRegistry::new();
        registry.insert_event(MessageId::new(100), sample_event());

        let handle = registry.event(MessageId::new(100)).unwrap();
        handle.lock().await.signup(UserId::new(2), "Tank").unwrap();

        let again = registry.event(MessageId::new(100)).unwrap();
        assert_eq!(again.lock().await.filled_count(), 1);
        assert!(matches!(
            registry.event(MessageId::new(101)),
            Err(ActionError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_signups_are_serialized() {
        let registry = Arc::new(EventRegistry::new());
        registry.insert_event(MessageId::new(1), sample_event());

        let mut tasks = Vec::new();
        for user in 2..12u64 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let handle = registry.event(MessageId::new(1)).unwrap();
                let mut event = handle.lock().await;
                event.signup(UserId::new(user), "Tank").is_ok()
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_swap_lifecycle() {
        let registry = EventRegistry::new();
        let proposal = SwapProposal::new(MessageId::new(1), UserId::new(2), "Tank", "Healer");
        let id = registry.propose_swap(proposal.clone());

        assert_eq!(registry.swap(id).unwrap(), proposal);
        assert_eq!(registry.take_swap(id), Some(proposal));
        assert!(matches!(registry.swap(id), Err(ActionError::NotFound { .. })));
    }

    #[test]
    fn test_expired_swaps_are_rejected_and_pruned() {
        let registry = EventRegistry::new();
        let mut stale = SwapProposal::new(MessageId::new(1), UserId::new(2), "Tank", "Healer");
        stale.created_at = Utc::now() - Duration::seconds(120);
        let stale_id = registry.propose_swap(stale);

        assert!(matches!(registry.swap(stale_id), Err(ActionError::NotFound { .. })));
        assert_eq!(registry.pending_swap_count(), 0);

        let mut stale = SwapProposal::new(MessageId::new(1), UserId::new(3), "Tank", "Healer");
        stale.created_at = Utc::now() - Duration::seconds(120);
        registry.swaps.insert(stale.id, stale);
        registry.propose_swap(SwapProposal::new(MessageId::new(1), UserId::new(4), "Tank", "Healer"));
        assert_eq!(registry.pending_swap_count(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        let path = path.to_str().unwrap();

        let registry = EventRegistry::new();
        let handle = registry.insert_event(MessageId::new(42), sample_event());
        handle.lock().await.signup(UserId::new(7), "Healer").unwrap();
        let report = Report::compute("Raid", OWNER, &[UserId::new(7)], 100, 10).unwrap();
        registry.insert_report(MessageId::new(43), report.clone());

        registry.persist(path).await.unwrap();

        let restored = EventRegistry::from_snapshot(RegistrySnapshot::load(path).await.unwrap());
        assert_eq!(restored.event_count(), 1);
        let event = restored.event(MessageId::new(42)).unwrap();
        assert_eq!(event.lock().await.slots[1].occupant, Some(UserId::new(7)));
        let restored_report = restored.report(MessageId::new(43)).unwrap();
        assert_eq!(*restored_report.lock().await, report);
    }

    #[tokio::test]
    async fn test_removed_event_leaves_the_snapshot() {
        let registry = EventRegistry::new();
        registry.insert_event(MessageId::new(1), sample_event());
        registry.insert_event(MessageId::new(2), sample_event());

        assert!(registry.remove_event(MessageId::new(1)).is_some());
        assert!(matches!(
            registry.event(MessageId::new(1)),
            Err(ActionError::NotFound { .. })
        ));
        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.events.len(), 1);
        assert!(snapshot.events.contains_key("2"));
    }

    #[tokio::test]
    async fn test_settled_report_is_removed() {
        let registry = EventRegistry::new();
        let report = Report::compute("Raid", OWNER, &[UserId::new(7)], 100, 0).unwrap();
        registry.insert_report(MessageId::new(5), report);

        assert!(registry.remove_report(MessageId::new(5)).is_some());
        assert_eq!(registry.report_count(), 0);
        assert!(matches!(
            registry.report(MessageId::new(5)),
            Err(ActionError::NotFound { .. })
        ));
        assert!(registry.snapshot().await.reports.is_empty());
    }

    #[tokio::test]
    async fn test_old_reports_are_pruned() {
        let registry = EventRegistry::new();
        let mut old = Report::compute("Old", OWNER, &[UserId::new(7)], 100, 0).unwrap();
        old.created_at = Utc::now() - Duration::days(REPORT_RETENTION_DAYS + 1);
        registry.reports.insert(MessageId::new(1), Arc::new(Mutex::new(old.clone())));

        let busy = Arc::new(Mutex::new(old));
        registry.reports.insert(MessageId::new(2), busy.clone());
        let guard = busy.lock().await;

        let fresh = Report::compute("Fresh", OWNER, &[UserId::new(7)], 100, 0).unwrap();
        registry.insert_report(MessageId::new(3), fresh);
        drop(guard);

        assert!(registry.report(MessageId::new(1)).is_err());
        assert!(registry.report(MessageId::new(2)).is_ok());
        assert!(registry.report(MessageId::new(3)).is_ok());
        assert_eq!(registry.report_count(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let snapshot = RegistrySnapshot::load(path.to_str().unwrap()).await.unwrap();
        assert!(snapshot.events.is_empty());
        assert!(snapshot.reports.is_empty());
    }
}
