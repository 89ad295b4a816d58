//! Cache key layout.
//!
//! | Key | Value |
//! |---|---|
//! | `sessions:<id>` | encoded session snapshot |
//! | `lookup:<access type>:<mac>:<outer>:<inner>` | session ID |
//! | `lookup:arp:<if index>:<ipv4>` | session ID |

use std::net::Ipv4Addr;
use std::time::Duration;

use bng_types::{AccessType, SubscriberSession};

pub const SESSION_PREFIX: &str = "sessions:";

/// Glob matching every primary record.
pub const SESSION_PATTERN: &str = "sessions:*";

pub fn primary_key(session_id: &str) -> String {
    format!("{SESSION_PREFIX}{session_id}")
}

/// Circuit index key. An absent inner VLAN renders as `0`.
pub fn mac_lookup_key(
    access_type: AccessType,
    mac: &str,
    outer_vlan: u16,
    inner_vlan: Option<u16>,
) -> String {
    format!(
        "lookup:{access_type}:{mac}:{outer_vlan}:{}",
        inner_vlan.unwrap_or(0)
    )
}

pub fn arp_lookup_key(if_index: u32, ipv4: Ipv4Addr) -> String {
    format!("lookup:arp:{if_index}:{ipv4}")
}

/// Session ID carried by a primary key.
pub fn session_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(SESSION_PREFIX)
}

/// Circuit index key for a session, if it has a MAC.
pub(crate) fn session_mac_key(session: &SubscriberSession) -> Option<String> {
    if session.mac().is_empty() {
        return None;
    }
    Some(mac_lookup_key(
        session.access_type(),
        session.mac(),
        session.outer_vlan(),
        session.inner_vlan(),
    ))
}

/// Address index key for a session, if it has both an IPv4 address and an
/// interface.
pub(crate) fn session_arp_key(session: &SubscriberSession) -> Option<String> {
    match (session.ipv4_address(), session.if_index()) {
        (Some(ipv4), if_index) if if_index != 0 => Some(arp_lookup_key(if_index, ipv4)),
        _ => None,
    }
}

/// How long a leased record outlives its lease, so the DF's expiry timer
/// still finds it when it fires.
pub const EXPIRY_GRACE: Duration = Duration::from_secs(5);

/// Record TTL: the IPoE lease plus [`EXPIRY_GRACE`], or none for PPP and
/// zero leases.
pub(crate) fn session_ttl(session: &SubscriberSession) -> Option<Duration> {
    session
        .lease_time()
        .filter(|lease| *lease > 0)
        .map(|lease| Duration::from_secs(u64::from(lease)) + EXPIRY_GRACE)
}
