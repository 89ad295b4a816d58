//! Cache-backed session store.
//!
//! Each session is held as a primary record plus up to two index records
//! pointing back at it. Writes touch each key independently; the cache only
//! guarantees single-key atomicity, so a reader may briefly observe an index
//! without its primary (treated as not found) or the reverse.
//!
//! Listings and statistics are built from cursor scans and are eventually
//! consistent: records written or removed during a scan may or may not be
//! counted.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use bng_types::{
    AccessType, Cache, CacheError, DecodeError, Protocol, SCAN_DONE, SessionKind,
    SessionMetadata, SessionState, SubscriberSession,
};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::{Result, SubscriberError};
use crate::keys::{
    SESSION_PATTERN, arp_lookup_key, mac_lookup_key, primary_key, session_arp_key,
    session_mac_key, session_ttl,
};

/// Optional filters for [`SessionStore::get_sessions`]. Unset fields match
/// everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub access_type: Option<AccessType>,
    pub protocol: Option<Protocol>,
    pub outer_vlan: Option<u16>,
}

impl SessionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_access_type(mut self, access_type: AccessType) -> Self {
        self.access_type = Some(access_type);
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn with_outer_vlan(mut self, outer_vlan: u16) -> Self {
        self.outer_vlan = Some(outer_vlan);
        self
    }

    fn matches(&self, meta: &SessionMetadata) -> bool {
        fn accepts<T: PartialEq>(want: Option<T>, have: Option<T>) -> bool {
            want.is_none() || want == have
        }
        accepts(self.access_type, meta.access_type)
            && accepts(self.protocol, meta.protocol)
            && accepts(self.outer_vlan, meta.outer_vlan)
    }
}

/// Aggregate counters over the stored sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total: u32,
    pub ipoe_v4: u32,
    pub ipoe_v6: u32,
    pub ppp: u32,
    pub active: u32,
    pub released: u32,
}

impl SessionStats {
    /// Counters keyed by name, for the upward query surface.
    pub fn to_map(&self) -> BTreeMap<String, u32> {
        [
            ("total", self.total),
            ("ipoe_v4", self.ipoe_v4),
            ("ipoe_v6", self.ipoe_v6),
            ("ppp", self.ppp),
            ("active", self.active),
            ("released", self.released),
        ]
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect()
    }

    fn record(&mut self, meta: &SessionMetadata) {
        self.total += 1;
        match SessionKind::from_session_id_prefix(&meta.session_id) {
            Some(SessionKind::IpoeV4) => self.ipoe_v4 += 1,
            Some(SessionKind::IpoeV6) => self.ipoe_v6 += 1,
            Some(SessionKind::Ppp) => self.ppp += 1,
            None => {}
        }
        match meta.state {
            Some(SessionState::Active) => self.active += 1,
            Some(SessionState::Released) => self.released += 1,
            None => {}
        }
    }
}

/// Decode a stored snapshot, reading its discriminant first.
///
/// Records without a discriminant are read as IPoE/DHCPv4.
pub fn decode_record(bytes: &[u8]) -> std::result::Result<SubscriberSession, DecodeError> {
    let kind = SessionMetadata::from_slice(bytes)?.kind().unwrap_or_default();
    SubscriberSession::from_slice(kind, bytes)
}

/// Multi-index session persistence over a [`Cache`].
#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<dyn Cache>,
    page_size: usize,
}

impl SessionStore {
    pub fn new(cache: Arc<dyn Cache>, page_size: usize) -> Self {
        Self {
            cache,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Write or remove a session and its index records.
    ///
    /// Released sessions are deleted: the primary and both index records are
    /// removed independently and failures are only logged. Active sessions
    /// are written with the lease as TTL; a failed index write is returned
    /// even though the primary has already been written.
    pub async fn persist(&self, session: &SubscriberSession) -> Result<()> {
        let session_id = session.session_id();

        if session.state() == SessionState::Released {
            let keys = std::iter::once(primary_key(session_id))
                .chain(session_mac_key(session))
                .chain(session_arp_key(session));
            for key in keys {
                if let Err(e) = self.cache.delete(&key).await {
                    warn!(session_id = %session_id, key = %key, error = %e, "Failed to delete session record");
                }
            }
            debug!(session_id = %session_id, "Session records removed");
            return Ok(());
        }

        let encoded = session.encode()?;
        let ttl = session_ttl(session);
        self.cache.set(&primary_key(session_id), encoded, ttl).await?;

        for key in session_mac_key(session)
            .into_iter()
            .chain(session_arp_key(session))
        {
            self.cache
                .set(&key, session_id.as_bytes().to_vec(), ttl)
                .await
                .map_err(|source| SubscriberError::IndexWrite {
                    key: key.clone(),
                    source,
                })?;
        }

        debug!(session_id = %session_id, ttl_secs = ttl.map(|t| t.as_secs()), "Session persisted");
        Ok(())
    }

    /// Read one session by ID.
    pub async fn get_session(&self, session_id: &str) -> Result<SubscriberSession> {
        let bytes = self
            .load_raw(session_id)
            .await?
            .ok_or_else(|| SubscriberError::SessionNotFound(session_id.to_string()))?;
        Ok(decode_record(&bytes)?)
    }

    /// List sessions matching `filter`.
    ///
    /// Records whose metadata cannot be read, or that carry no session ID,
    /// are skipped.
    pub async fn get_sessions(&self, filter: &SessionFilter) -> Result<Vec<SubscriberSession>> {
        let mut sessions = Vec::new();
        let mut cursor = SCAN_DONE;

        loop {
            let (records, next) = self.scan_page(cursor).await?;
            for (key, bytes) in records {
                let Ok(meta) = SessionMetadata::from_slice(&bytes) else {
                    trace!(key = %key, "Skipping record without readable metadata");
                    continue;
                };
                if meta.session_id.is_empty() || !filter.matches(&meta) {
                    continue;
                }
                match SubscriberSession::from_slice(meta.kind().unwrap_or_default(), &bytes) {
                    Ok(session) => sessions.push(session),
                    Err(e) => debug!(key = %key, error = %e, "Skipping undecodable session"),
                }
            }

            if next == SCAN_DONE {
                break;
            }
            cursor = next;
        }

        Ok(sessions)
    }

    /// Count stored sessions by kind (from the session-ID prefix) and state.
    pub async fn get_stats(&self) -> Result<SessionStats> {
        let mut stats = SessionStats::default();
        let mut cursor = SCAN_DONE;

        loop {
            let (records, next) = self.scan_page(cursor).await?;
            for (key, bytes) in records {
                match SessionMetadata::from_slice(&bytes) {
                    Ok(meta) if !meta.session_id.is_empty() => stats.record(&meta),
                    _ => trace!(key = %key, "Skipping record in stats"),
                }
            }

            if next == SCAN_DONE {
                break;
            }
            cursor = next;
        }

        Ok(stats)
    }

    /// Resolve a session through the circuit index.
    pub async fn find_by_circuit(
        &self,
        access_type: AccessType,
        mac: &str,
        outer_vlan: u16,
        inner_vlan: Option<u16>,
    ) -> Result<SubscriberSession> {
        self.follow_index(&mac_lookup_key(access_type, mac, outer_vlan, inner_vlan))
            .await
    }

    /// Resolve a session through the address index.
    pub async fn find_by_address(&self, if_index: u32, ipv4: Ipv4Addr) -> Result<SubscriberSession> {
        self.follow_index(&arp_lookup_key(if_index, ipv4)).await
    }

    /// Raw primary record, or `None` if absent.
    pub async fn load_raw(&self, session_id: &str) -> Result<Option<Vec<u8>>> {
        match self.cache.get(&primary_key(session_id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(CacheError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove only the primary record.
    pub async fn delete_primary(&self, session_id: &str) -> Result<()> {
        self.cache.delete(&primary_key(session_id)).await?;
        Ok(())
    }

    async fn follow_index(&self, key: &str) -> Result<SubscriberSession> {
        let session_id = match self.cache.get(key).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(CacheError::NotFound(_)) => {
                return Err(SubscriberError::SessionNotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        match self.get_session(&session_id).await {
            Err(SubscriberError::SessionNotFound(_)) => {
                debug!(key = %key, session_id = %session_id, "Index points at a missing session");
                Err(SubscriberError::SessionNotFound(session_id))
            }
            other => other,
        }
    }

    /// One scan page of primary records. Keys deleted between the scan and
    /// the read are dropped.
    async fn scan_page(&self, cursor: u64) -> Result<(Vec<(String, Vec<u8>)>, u64)> {
        let (keys, next) = self
            .cache
            .scan(cursor, SESSION_PATTERN, self.page_size)
            .await?;

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            match self.cache.get(&key).await {
                Ok(bytes) => records.push((key, bytes)),
                Err(CacheError::NotFound(_)) => trace!(key = %key, "Key vanished during scan"),
                Err(e) => return Err(e.into()),
            }
        }
        Ok((records, next))
    }
}
