use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// Transport protocol of a single DNAT entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Transport {
    /// TCP protocol
    Tcp,
    /// UDP protocol
    Udp,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

/// Protocol selector of a forwarding rule.
///
/// Decodes `"tcp"`, `"udp"`, and the combined marker `"tcp+udp"` (also
/// spelled `"tcp,udp"` by older panels). A missing protocol means TCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Protocol {
    /// TCP only
    #[default]
    Tcp,
    /// UDP only
    Udp,
    /// Both TCP and UDP to the same destination
    TcpUdp,
}

impl Protocol {
    /// Transports this protocol expands to, in emission order
    #[must_use]
    pub const fn transports(self) -> &'static [Transport] {
        match self {
            Self::Tcp => &[Transport::Tcp],
            Self::Udp => &[Transport::Udp],
            Self::TcpUdp => &[Transport::Tcp, Transport::Udp],
        }
    }

    /// Wire name of the protocol
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::TcpUdp => "tcp+udp",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "tcp+udp" | "tcp,udp" => Ok(Self::TcpUdp),
            other => Err(format!("unknown protocol: {other:?}")),
        }
    }
}

impl Serialize for Protocol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Protocol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// A single port forward: `listen_port` on this node to `dest_ip:dest_port`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingRule {
    /// Transport(s) to forward
    #[serde(default)]
    pub protocol: Protocol,

    /// Port this node accepts traffic on
    #[serde(deserialize_with = "deserialize_port")]
    pub listen_port: u16,

    /// Backend address traffic is forwarded to
    #[serde(deserialize_with = "deserialize_ipv4")]
    pub dest_ip: Ipv4Addr,

    /// Backend port traffic is forwarded to
    #[serde(deserialize_with = "deserialize_port")]
    pub dest_port: u16,
}

impl ForwardingRule {
    /// Create a new rule
    #[must_use]
    pub const fn new(protocol: Protocol, listen_port: u16, dest_ip: Ipv4Addr, dest_port: u16) -> Self {
        Self {
            protocol,
            listen_port,
            dest_ip,
            dest_port,
        }
    }
}

/// Ordered set of rules downloaded in one sync cycle.
///
/// A new set always replaces the previous one as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(Vec<ForwardingRule>);

impl RuleSet {
    /// Create a rule set from rules in panel order
    #[must_use]
    pub const fn new(rules: Vec<ForwardingRule>) -> Self {
        Self(rules)
    }

    /// Number of rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set holds no rules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate rules in panel order
    pub fn iter(&self) -> std::slice::Iter<'_, ForwardingRule> {
        self.0.iter()
    }

    /// Distinct destination addresses, in ascending order
    #[must_use]
    pub fn destinations(&self) -> BTreeSet<Ipv4Addr> {
        self.0.iter().map(|r| r.dest_ip).collect()
    }
}

impl From<Vec<ForwardingRule>> for RuleSet {
    fn from(rules: Vec<ForwardingRule>) -> Self {
        Self(rules)
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a ForwardingRule;
    type IntoIter = std::slice::Iter<'a, ForwardingRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// The panel stores form input verbatim, so ports arrive as numbers or strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum PortRepr {
    Number(u64),
    Text(String),
}

fn deserialize_port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    let value = match PortRepr::deserialize(deserializer)? {
        PortRepr::Number(n) => n,
        PortRepr::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| de::Error::custom(format!("invalid port: {s:?}")))?,
    };

    match u16::try_from(value) {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(de::Error::custom(format!("port out of range: {value}"))),
    }
}

fn deserialize_ipv4<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Ipv4Addr, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.trim()
        .parse()
        .map_err(|_| de::Error::custom(format!("invalid destination address: {raw:?}")))
}
