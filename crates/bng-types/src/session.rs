//! Subscriber session model.
//!
//! A session is a sum type over the access variants the control plane
//! terminates. The variant is always selected by an explicit [`SessionKind`]
//! discriminant before the payload is decoded, so an IPoE record can never be
//! silently read back as PPP (or the other way around).

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Access technology of a subscriber session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccessType {
    /// IP over Ethernet, established via DHCP.
    #[default]
    #[serde(rename = "IPoE")]
    Ipoe,
    /// PPP over Ethernet.
    #[serde(rename = "PPPoE")]
    Pppoe,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessType::Ipoe => write!(f, "IPoE"),
            AccessType::Pppoe => write!(f, "PPPoE"),
        }
    }
}

impl FromStr for AccessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ipoe" => Ok(AccessType::Ipoe),
            "pppoe" => Ok(AccessType::Pppoe),
            other => Err(format!("unknown access type '{other}' (expected ipoe or pppoe)")),
        }
    }
}

/// Session establishment protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Protocol {
    #[default]
    #[serde(rename = "DHCPv4")]
    Dhcpv4,
    #[serde(rename = "DHCPv6")]
    Dhcpv6,
    #[serde(rename = "PPP")]
    Ppp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Dhcpv4 => write!(f, "DHCPv4"),
            Protocol::Dhcpv6 => write!(f, "DHCPv6"),
            Protocol::Ppp => write!(f, "PPP"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dhcpv4" => Ok(Protocol::Dhcpv4),
            "dhcpv6" => Ok(Protocol::Dhcpv6),
            "ppp" => Ok(Protocol::Ppp),
            other => Err(format!(
                "unknown protocol '{other}' (expected dhcpv4, dhcpv6 or ppp)"
            )),
        }
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Active,
    Released,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active => write!(f, "Active"),
            SessionState::Released => write!(f, "Released"),
        }
    }
}

/// Discriminant selecting the session variant.
///
/// Only three (access type, protocol) pairs are meaningful; everything else
/// is rejected by [`SessionKind::from_parts`]. The default kind is the
/// fallback used when stored metadata carries no discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionKind {
    #[default]
    IpoeV4,
    IpoeV6,
    Ppp,
}

impl SessionKind {
    /// Resolve a kind from its access type and protocol.
    pub fn from_parts(access_type: AccessType, protocol: Protocol) -> Result<Self, DecodeError> {
        match (access_type, protocol) {
            (AccessType::Ipoe, Protocol::Dhcpv4) => Ok(SessionKind::IpoeV4),
            (AccessType::Ipoe, Protocol::Dhcpv6) => Ok(SessionKind::IpoeV6),
            (AccessType::Pppoe, Protocol::Ppp) => Ok(SessionKind::Ppp),
            (access_type, protocol) => Err(DecodeError::UnsupportedKind {
                access_type,
                protocol,
            }),
        }
    }

    /// Infer a kind from the session-ID prefix convention
    /// (`ipoe-v4…`, `ipoe-v6…`, `ppp…`).
    pub fn from_session_id_prefix(session_id: &str) -> Option<Self> {
        if session_id.starts_with("ipoe-v4") {
            Some(SessionKind::IpoeV4)
        } else if session_id.starts_with("ipoe-v6") {
            Some(SessionKind::IpoeV6)
        } else if session_id.starts_with("ppp") {
            Some(SessionKind::Ppp)
        } else {
            None
        }
    }

    pub fn access_type(self) -> AccessType {
        match self {
            SessionKind::IpoeV4 | SessionKind::IpoeV6 => AccessType::Ipoe,
            SessionKind::Ppp => AccessType::Pppoe,
        }
    }

    pub fn protocol(self) -> Protocol {
        match self {
            SessionKind::IpoeV4 => Protocol::Dhcpv4,
            SessionKind::IpoeV6 => Protocol::Dhcpv6,
            SessionKind::Ppp => Protocol::Ppp,
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.access_type(), self.protocol())
    }
}

/// Errors decoding a session snapshot.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The (access type, protocol) pair names no session variant.
    #[error("unsupported session kind {access_type}/{protocol}")]
    UnsupportedKind {
        access_type: AccessType,
        protocol: Protocol,
    },

    /// The payload is not a valid snapshot for the selected variant.
    #[error("malformed session payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload describes a different kind than the one declared.
    #[error("payload is {actual}, declared {declared}")]
    KindMismatch {
        declared: SessionKind,
        actual: SessionKind,
    },

    /// The payload belongs to a different session than the envelope.
    #[error("payload session '{actual}' does not match event session '{expected}'")]
    SessionIdMismatch { expected: String, actual: String },
}

/// Fields shared by every session variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCore {
    pub session_id: String,

    #[serde(default)]
    pub access_type: AccessType,

    #[serde(default)]
    pub protocol: Protocol,

    /// Client hardware address, empty when unknown.
    #[serde(default)]
    pub mac: String,

    /// S-VLAN tag. Zero is never valid for a processed session.
    #[serde(default)]
    pub outer_vlan: u16,

    /// C-VLAN tag, if the circuit is double tagged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_vlan: Option<u16>,

    /// Dataplane interface index, zero when not yet bound.
    #[serde(default)]
    pub if_index: u32,

    pub state: SessionState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<Ipv4Addr>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_address: Option<Ipv6Addr>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl SessionCore {
    /// Create an active session core for the given circuit.
    pub fn new(
        session_id: impl Into<String>,
        kind: SessionKind,
        mac: impl Into<String>,
        outer_vlan: u16,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            access_type: kind.access_type(),
            protocol: kind.protocol(),
            mac: mac.into(),
            outer_vlan,
            inner_vlan: None,
            if_index: 0,
            state: SessionState::Active,
            ipv4_address: None,
            ipv6_address: None,
            hostname: None,
        }
    }

    pub fn with_inner_vlan(mut self, inner_vlan: u16) -> Self {
        self.inner_vlan = Some(inner_vlan);
        self
    }

    pub fn with_if_index(mut self, if_index: u32) -> Self {
        self.if_index = if_index;
        self
    }

    pub fn with_ipv4(mut self, addr: Ipv4Addr) -> Self {
        self.ipv4_address = Some(addr);
        self
    }

    pub fn with_ipv6(mut self, addr: Ipv6Addr) -> Self {
        self.ipv6_address = Some(addr);
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_state(mut self, state: SessionState) -> Self {
        self.state = state;
        self
    }
}

/// IPoE session established via DHCPv4 or DHCPv6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpoeSession {
    #[serde(flatten)]
    pub core: SessionCore,

    /// DHCP lease in seconds. Zero means the lease does not expire.
    #[serde(default)]
    pub lease_time: u32,
}

impl IpoeSession {
    pub fn new(core: SessionCore, lease_time: u32) -> Self {
        Self { core, lease_time }
    }
}

/// PPPoE session. Its lifetime follows the PPP link, so it carries no lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PppSession {
    #[serde(flatten)]
    pub core: SessionCore,
}

impl PppSession {
    pub fn new(core: SessionCore) -> Self {
        Self { core }
    }
}

/// A subscriber session of any supported kind.
///
/// Serializes as the bare variant snapshot. There is no
/// `Deserialize` impl: decoding always goes through [`SubscriberSession::from_value`]
/// or [`SubscriberSession::from_slice`] with an explicit [`SessionKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SubscriberSession {
    Ipoe(IpoeSession),
    Ppp(PppSession),
}

impl From<IpoeSession> for SubscriberSession {
    fn from(session: IpoeSession) -> Self {
        SubscriberSession::Ipoe(session)
    }
}

impl From<PppSession> for SubscriberSession {
    fn from(session: PppSession) -> Self {
        SubscriberSession::Ppp(session)
    }
}

impl SubscriberSession {
    /// Build the variant matching the core's access type and protocol.
    ///
    /// `lease_time` is ignored for PPP sessions. A core with an invalid
    /// (access type, protocol) pair becomes an IPoE session.
    pub fn from_core(core: SessionCore, lease_time: u32) -> Self {
        match SessionKind::from_parts(core.access_type, core.protocol) {
            Ok(SessionKind::Ppp) => PppSession::new(core).into(),
            _ => IpoeSession::new(core, lease_time).into(),
        }
    }

    /// Decode a snapshot held as a JSON value into the variant for `kind`.
    pub fn from_value(kind: SessionKind, value: serde_json::Value) -> Result<Self, DecodeError> {
        let session = match kind {
            SessionKind::IpoeV4 | SessionKind::IpoeV6 => {
                SubscriberSession::Ipoe(serde_json::from_value(value)?)
            }
            SessionKind::Ppp => SubscriberSession::Ppp(serde_json::from_value(value)?),
        };
        session.ensure_kind(kind)
    }

    /// Decode an encoded snapshot into the variant for `kind`.
    pub fn from_slice(kind: SessionKind, bytes: &[u8]) -> Result<Self, DecodeError> {
        let session = match kind {
            SessionKind::IpoeV4 | SessionKind::IpoeV6 => {
                SubscriberSession::Ipoe(serde_json::from_slice(bytes)?)
            }
            SessionKind::Ppp => SubscriberSession::Ppp(serde_json::from_slice(bytes)?),
        };
        session.ensure_kind(kind)
    }

    fn ensure_kind(self, declared: SessionKind) -> Result<Self, DecodeError> {
        let core = self.core();
        let actual = SessionKind::from_parts(core.access_type, core.protocol)?;
        if actual != declared {
            return Err(DecodeError::KindMismatch { declared, actual });
        }
        Ok(self)
    }

    /// Encode the snapshot for storage.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Snapshot as a JSON value, for event payloads.
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn core(&self) -> &SessionCore {
        match self {
            SubscriberSession::Ipoe(s) => &s.core,
            SubscriberSession::Ppp(s) => &s.core,
        }
    }

    pub fn core_mut(&mut self) -> &mut SessionCore {
        match self {
            SubscriberSession::Ipoe(s) => &mut s.core,
            SubscriberSession::Ppp(s) => &mut s.core,
        }
    }

    pub fn into_core(self) -> SessionCore {
        match self {
            SubscriberSession::Ipoe(s) => s.core,
            SubscriberSession::Ppp(s) => s.core,
        }
    }

    /// The variant discriminant.
    pub fn kind(&self) -> SessionKind {
        match self {
            SubscriberSession::Ipoe(s) if s.core.protocol == Protocol::Dhcpv6 => {
                SessionKind::IpoeV6
            }
            SubscriberSession::Ipoe(_) => SessionKind::IpoeV4,
            SubscriberSession::Ppp(_) => SessionKind::Ppp,
        }
    }

    /// Reshape into another kind, keeping every shared field.
    ///
    /// Going from IPoE to PPP drops the lease; going the other way yields a
    /// zero lease.
    pub fn into_kind(self, kind: SessionKind) -> Self {
        let lease_time = self.lease_time().unwrap_or(0);
        let mut core = self.into_core();
        core.access_type = kind.access_type();
        core.protocol = kind.protocol();
        Self::from_core(core, lease_time)
    }

    /// Same session with its state forced to `Released`.
    pub fn released(mut self) -> Self {
        self.core_mut().state = SessionState::Released;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.core().session_id
    }

    pub fn mac(&self) -> &str {
        &self.core().mac
    }

    pub fn outer_vlan(&self) -> u16 {
        self.core().outer_vlan
    }

    pub fn inner_vlan(&self) -> Option<u16> {
        self.core().inner_vlan
    }

    pub fn if_index(&self) -> u32 {
        self.core().if_index
    }

    pub fn state(&self) -> SessionState {
        self.core().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    pub fn access_type(&self) -> AccessType {
        self.core().access_type
    }

    pub fn protocol(&self) -> Protocol {
        self.core().protocol
    }

    pub fn ipv4_address(&self) -> Option<Ipv4Addr> {
        self.core().ipv4_address
    }

    pub fn ipv6_address(&self) -> Option<Ipv6Addr> {
        self.core().ipv6_address
    }

    pub fn hostname(&self) -> Option<&str> {
        self.core().hostname.as_deref()
    }

    /// Lease in seconds; `None` for variants without a lease.
    pub fn lease_time(&self) -> Option<u32> {
        match self {
            SubscriberSession::Ipoe(s) => Some(s.lease_time),
            SubscriberSession::Ppp(_) => None,
        }
    }
}

/// Lightweight envelope read from a stored snapshot before the full decode.
///
/// Every field is optional so that partially written or foreign records can
/// still be classified (or skipped) cheaply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub session_id: String,

    #[serde(default)]
    pub access_type: Option<AccessType>,

    #[serde(default)]
    pub protocol: Option<Protocol>,

    #[serde(default)]
    pub outer_vlan: Option<u16>,

    #[serde(default)]
    pub state: Option<SessionState>,
}

impl SessionMetadata {
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// The discriminant, if both halves are present and form a valid pair.
    pub fn kind(&self) -> Option<SessionKind> {
        match (self.access_type, self.protocol) {
            (Some(access_type), Some(protocol)) => {
                SessionKind::from_parts(access_type, protocol).ok()
            }
            _ => None,
        }
    }
}
