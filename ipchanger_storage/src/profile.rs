use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named, validated IPv4 configuration.
///
/// Only [`crate::validate`] builds one, so every `Profile` in circulation
/// carries a non-empty name, dotted-quad `ip`/`gateway` and a prefix in
/// `0..=32`. JSON looks like:
/// `{ "id":"…", "name":"Work", "ip":"10.0.0.5", "subnet":24, "gateway":"10.0.0.1", "dns":"" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) ip: String,
    pub(crate) subnet: u8,
    pub(crate) gateway: String,
    pub(crate) dns: String,
}

impl Profile {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn subnet(&self) -> u8 {
        self.subnet
    }

    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// DNS servers as entered, `None` when blank.
    pub fn dns(&self) -> Option<&str> {
        let dns = self.dns.trim();
        (!dns.is_empty()).then_some(dns)
    }

    /// `ip/prefix`, the form nmcli expects for `ipv4.addresses`.
    pub fn address(&self) -> String {
        format!("{}/{}", self.ip, self.subnet)
    }
}

/// Raw form fields as a UI collects them. `id` is `None` for a new profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileInput {
    pub id: Option<String>,
    pub name: String,
    pub ip: String,
    pub subnet: String,
    pub gateway: String,
    pub dns: String,
}

impl From<&Profile> for ProfileInput {
    fn from(p: &Profile) -> Self {
        ProfileInput {
            id: Some(p.id.clone()),
            name: p.name.clone(),
            ip: p.ip.clone(),
            subnet: p.subnet.to_string(),
            gateway: p.gateway.clone(),
            dns: p.dns.clone(),
        }
    }
}

/// On-disk shape. Older blobs store `subnet` as a string (`"24"`) and may
/// carry a numeric `id`, so both forms are accepted and everything goes
/// back through validation.
#[derive(Debug, Deserialize)]
pub(crate) struct StoredProfile {
    #[serde(default)]
    id: Option<StoredId>,
    name: String,
    ip: String,
    subnet: StoredSubnet,
    gateway: String,
    #[serde(default)]
    dns: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredId {
    Number(serde_json::Number),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredSubnet {
    Number(i64),
    Text(String),
}

impl StoredProfile {
    /// Convert the entry found at `index` of the stored list.
    ///
    /// An entry saved without an id gets one derived from its position and
    /// content, so the same blob always yields the same id.
    pub(crate) fn into_input(self, index: usize) -> ProfileInput {
        let subnet = match self.subnet {
            StoredSubnet::Number(n) => n.to_string(),
            StoredSubnet::Text(t) => t,
        };
        let id = match self.id {
            Some(StoredId::Number(n)) => Some(n.to_string()),
            Some(StoredId::Text(t)) => Some(t),
            None => None,
        }
        .filter(|id| !id.trim().is_empty());
        let mut input = ProfileInput {
            id,
            name: self.name,
            ip: self.ip,
            subnet,
            gateway: self.gateway,
            dns: self.dns.unwrap_or_default(),
        };
        if input.id.is_none() {
            input.id = Some(derived_id(index, &input));
        }
        input
    }
}

fn derived_id(index: usize, input: &ProfileInput) -> String {
    let key = format!(
        "{index}\n{}\n{}\n{}\n{}\n{}",
        input.name, input.ip, input.subnet, input.gateway, input.dns
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}
