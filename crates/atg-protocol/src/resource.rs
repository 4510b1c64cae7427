use serde::{Deserialize, Serialize};

/// Azure resource family a template provisions.
///
/// Declaration order is the display order used by listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Vm,
    Aks,
    Storage,
    Vnet,
    Lb,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Vm,
        ResourceKind::Aks,
        ResourceKind::Storage,
        ResourceKind::Vnet,
        ResourceKind::Lb,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Vm => "vm",
            Self::Aks => "aks",
            Self::Storage => "storage",
            Self::Vnet => "vnet",
            Self::Lb => "lb",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Vm => "Virtual Machine",
            Self::Aks => "Azure Kubernetes Service",
            Self::Storage => "Storage Account",
            Self::Vnet => "Virtual Network",
            Self::Lb => "Load Balancer",
        }
    }

    /// Lowercase phrases operators use for this resource.
    ///
    /// Shared by the rule-based extractor and the concept embedder so that
    /// extraction and retrieval agree on vocabulary.
    pub fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Self::Vm => &[
                "virtual machine",
                "vm",
                "server",
                "compute instance",
                "linux machine",
                "windows machine",
            ],
            Self::Aks => &[
                "aks",
                "kubernetes",
                "k8s",
                "managed cluster",
                "node pool",
            ],
            Self::Storage => &[
                "storage account",
                "blob",
                "blob container",
                "file share",
                "object storage",
                "data lake",
            ],
            Self::Vnet => &[
                "virtual network",
                "vnet",
                "subnet",
                "address space",
            ],
            Self::Lb => &[
                "load balancer",
                "load balancing",
                "lb",
                "backend pool",
                "traffic distribution",
            ],
        }
    }

    /// Whether `text` (any case) mentions this resource by one of its synonyms.
    pub fn mentioned_in(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.synonyms()
            .iter()
            .any(|phrase| contains_phrase(&lower, phrase))
    }

    /// Byte offset of the earliest synonym mention in `text`, if any.
    pub fn first_mention(&self, text: &str) -> Option<usize> {
        let lower = text.to_lowercase();
        self.synonyms()
            .iter()
            .filter_map(|phrase| find_phrase(&lower, phrase))
            .min()
    }

    /// Parse a slug or one of the common long spellings
    /// (`virtual_machine`, `load_balancer`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "vm" | "virtual_machine" | "virtual_machines" | "vms" => Some(Self::Vm),
            "aks" | "kubernetes" | "azure_kubernetes_service" => Some(Self::Aks),
            "storage" | "storage_account" | "storage_accounts" => Some(Self::Storage),
            "vnet" | "virtual_network" | "virtual_networks" | "network" => Some(Self::Vnet),
            "lb" | "load_balancer" | "load_balancers" | "loadbalancer" => Some(Self::Lb),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Find `phrase` in already-lowercased `text` on word boundaries.
///
/// A trailing plural `s`/`es` on the last word still counts as a match,
/// so "virtual machines" mentions "virtual machine".
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    find_phrase(text, phrase).is_some()
}

/// Byte offset of the first word-bounded occurrence of `phrase` in `text`.
pub fn find_phrase(text: &str, phrase: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(pos) = text[from..].find(phrase) {
        let start = from + pos;
        let mut end = start + phrase.len();
        let starts_clean = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        if text[end..].starts_with("es") && !is_word_byte(bytes.get(end + 2)) {
            end += 2;
        } else if text[end..].starts_with('s') && !is_word_byte(bytes.get(end + 1)) {
            end += 1;
        }
        if starts_clean && !is_word_byte(bytes.get(end)) {
            return Some(start);
        }
        from = start + 1;
        while !text.is_char_boundary(from) {
            from += 1;
        }
    }
    None
}

fn is_word_byte(b: Option<&u8>) -> bool {
    b.is_some_and(|b| b.is_ascii_alphanumeric())
}
