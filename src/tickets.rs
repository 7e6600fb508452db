//! Transfer ticket cache.
//! ----------------------
//! TTL-indexed map of in-flight upload/download sessions. Possession of a
//! valid link id is the whole authorization for chunk traffic; the id was
//! only handed out after a successful gate check, so per-chunk handling
//! never touches the policy graph. Entries expire lazily on `get` and are
//! reclaimed in bulk by a background sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use uuid::Uuid;

use crate::models::File;

/// Tickets outlive any reasonable transfer but not a forgotten one.
pub const TICKET_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct TransferTicket {
    pub link_id: String,
    pub file: File,
    pub issued_at: Instant,
}

struct Entry {
    ticket: TransferTicket,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct TicketCache {
    map: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl TicketCache {
    pub fn new() -> Self {
        Self::with_ttl(TICKET_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { map: Arc::new(RwLock::new(HashMap::new())), ttl }
    }

    /// Create and store a ticket for `file` under a fresh collision-free
    /// link id.
    pub fn issue(&self, file: File) -> TransferTicket {
        let ticket = TransferTicket {
            link_id: Uuid::new_v4().to_string(),
            file,
            issued_at: Instant::now(),
        };
        self.set(ticket.clone());
        ticket
    }

    /// Insert or replace by link id.
    pub fn set(&self, ticket: TransferTicket) {
        let expires_at = ticket.issued_at + self.ttl;
        let mut w = self.map.write();
        w.insert(ticket.link_id.clone(), Entry { ticket, expires_at });
    }

    /// Fetch a ticket. An expired entry is removed and reported as absent.
    pub fn get(&self, link_id: &str) -> Option<TransferTicket> {
        let now = Instant::now();
        {
            let r = self.map.read();
            match r.get(link_id) {
                Some(ent) if ent.expires_at > now => return Some(ent.ticket.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.map.write().remove(link_id);
        None
    }

    pub fn delete(&self, link_id: &str) -> bool {
        self.map.write().remove(link_id).is_some()
    }

    /// Remove expired entries. Returns number removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut w = self.map.write();
        let expired: Vec<String> = w
            .iter()
            .filter(|(_, ent)| now >= ent.expires_at)
            .map(|(k, _)| k.clone())
            .collect();
        let removed = expired.len();
        for k in expired {
            w.remove(&k);
        }
        removed
    }

    /// Drop every ticket whose file lives in the given workspace. Used when
    /// a workspace is deleted so in-flight transfers cannot outlive it.
    pub fn purge_workspace(&self, workspace_name: &str) -> usize {
        let prefix = format!("{workspace_name}/");
        let mut w = self.map.write();
        let doomed: Vec<String> = w
            .iter()
            .filter(|(_, ent)| {
                ent.ticket.file.location == workspace_name
                    || ent.ticket.file.location.starts_with(&prefix)
            })
            .map(|(k, _)| k.clone())
            .collect();
        let removed = doomed.len();
        for k in doomed {
            w.remove(&k);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl Default for TicketCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn file(location: &str) -> File {
        File {
            id: Uuid::new_v4().to_string(),
            name: location.rsplit('/').next().unwrap().to_string(),
            size: 10,
            location: location.to_string(),
            created_on: Utc::now(),
        }
    }

    #[test]
    fn get_within_ttl_returns_ticket() {
        let cache = TicketCache::new();
        let ticket = cache.issue(file("acme/a/x.bin"));
        let got = cache.get(&ticket.link_id).expect("ticket should be live");
        assert_eq!(got.file.location, "acme/a/x.bin");
    }

    #[test]
    fn expired_ticket_is_absent_and_removed() {
        let cache = TicketCache::with_ttl(Duration::from_millis(0));
        let ticket = cache.issue(file("acme/a/x.bin"));
        assert!(cache.get(&ticket.link_id).is_none());
        assert_eq!(cache.len(), 0, "expired entry should be purged on get");
    }

    #[test]
    fn sweep_reclaims_expired_entries() {
        let cache = TicketCache::with_ttl(Duration::from_millis(0));
        cache.issue(file("acme/a/x.bin"));
        cache.issue(file("acme/a/y.bin"));
        assert_eq!(cache.sweep(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn delete_is_explicit_purge() {
        let cache = TicketCache::new();
        let ticket = cache.issue(file("acme/a/x.bin"));
        assert!(cache.delete(&ticket.link_id));
        assert!(!cache.delete(&ticket.link_id));
        assert!(cache.get(&ticket.link_id).is_none());
    }

    #[test]
    fn purge_workspace_only_touches_that_workspace() {
        let cache = TicketCache::new();
        let a = cache.issue(file("acme/a/x.bin"));
        let b = cache.issue(file("other/a/x.bin"));
        assert_eq!(cache.purge_workspace("acme"), 1);
        assert!(cache.get(&a.link_id).is_none());
        assert!(cache.get(&b.link_id).is_some());
    }

    #[test]
    fn link_ids_are_unique() {
        let cache = TicketCache::new();
        let a = cache.issue(file("acme/a/x.bin"));
        let b = cache.issue(file("acme/a/x.bin"));
        assert_ne!(a.link_id, b.link_id);
        assert_eq!(cache.len(), 2);
    }
}
