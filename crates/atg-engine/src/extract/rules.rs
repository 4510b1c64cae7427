//! Rule-based extraction: deterministic pattern matching, no I/O.
//!
//! Covers the phrasing operators actually use for the five resource kinds.
//! Anything it cannot read is left absent for later stages to default or
//! reject.

use std::sync::LazyLock;

use regex::Regex;

use atg_protocol::{Completeness, KnownParameters, ParamValue, ParameterBag, ResourceKind};

use super::regions::find_region;

static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d{1,4}|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|single|an?)\s+(?:[a-z0-9_-]+\s+){0,2}?(virtual machines?|vms?|servers?|nodes?|instances?|machines?|replicas?)\b",
    )
    .unwrap()
});
static NODE_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,4})-node\b").unwrap());
static VM_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bstandard_([a-z0-9]+(?:_[a-z0-9]+)*)").unwrap());
static CORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,3})\s*(?:v?cpus?|cores?)\b").unwrap());
static REPLICATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(ra-grs|ragrs|gzrs|lrs|zrs|grs)\b").unwrap());
static TIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(premium|standard)\s+(?:storage|tier|account|performance)\b|\btier\s*(?:[:=]|of|is)?\s*(premium|standard)\b")
        .unwrap()
});
static SUBNETS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}|one|two|three|four|five|six|seven|eight|nine|ten)\s+subnets?\b").unwrap()
});
static CIDR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,3}(?:\.\d{1,3}){3}/\d{1,2})\b").unwrap());
static K8S_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:kubernetes|k8s|aks|version)\s+(?:version\s+)?v?(\d+\.\d+(?:\.\d+)?)\b").unwrap()
});
static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:named|called)\s+["'`]?([a-z0-9][a-z0-9-]{1,62})"#).unwrap()
});
static PORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bport\s+(\d{1,6})\b").unwrap());
static DISK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,5})\s*gb\s+(?:os\s+)?disk\b").unwrap());
static ENVIRONMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(dev|development|test|staging|prod|production)\s+environment\b|\benvironment\s*[:=]?\s*(dev|development|test|staging|prod|production)\b")
        .unwrap()
});

/// Sizes offered for "N cores" requests, smallest first.
const SIZES_BY_CORES: &[(i64, &str)] = &[
    (1, "Standard_B1s"),
    (2, "Standard_D2s_v3"),
    (4, "Standard_D4s_v3"),
    (8, "Standard_D8s_v3"),
];

/// Pattern-matching extractor.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleExtractor;

impl RuleExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract everything the rules recognize. Never fails.
    pub fn extract(&self, text: &str, known: &KnownParameters) -> ParameterBag {
        let lower = text.to_lowercase();
        let mut bag = ParameterBag::new();

        let mut mentions: Vec<(usize, ResourceKind)> = ResourceKind::ALL
            .iter()
            .filter_map(|kind| kind.first_mention(text).map(|pos| (pos, *kind)))
            .collect();
        mentions.sort();
        for (_, kind) in &mentions {
            bag.add_resource_kind(*kind);
        }

        if let Some((value, completeness)) = quantity(&lower) {
            bag.insert(known, "quantity", ParamValue::Int(value), completeness);
        }

        if let Some(region) = find_region(text) {
            bag.insert(known, "region", region.into(), Completeness::Explicit);
        }

        if let Some(size) = vm_size(text, &lower) {
            let key = if bag.requests(ResourceKind::Aks) && !bag.requests(ResourceKind::Vm) {
                "node_vm_size"
            } else {
                "vm_size"
            };
            bag.insert(known, key, size.into(), Completeness::Explicit);
        }

        if let Some(caps) = REPLICATION.captures(&lower) {
            let value = caps[1].replace('-', "").to_uppercase();
            bag.insert(known, "replication", value.into(), Completeness::Explicit);
        }

        if let Some(caps) = TIER.captures(&lower) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                bag.insert(known, "account_tier", capitalize(m.as_str()).into(), Completeness::Explicit);
            }
        }

        if let Some(caps) = SUBNETS.captures(&lower) {
            if let Some(n) = number(&caps[1]) {
                bag.insert(known, "subnet_count", ParamValue::Int(n), Completeness::Explicit);
            }
        }

        if let Some(caps) = CIDR.captures(&lower) {
            bag.insert(known, "address_space", caps[1].into(), Completeness::Explicit);
        }

        if bag.requests(ResourceKind::Aks) {
            if let Some(caps) = K8S_VERSION.captures(&lower) {
                bag.insert(known, "kubernetes_version", caps[1].into(), Completeness::Explicit);
            }
        }

        for caps in NAME.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let owner = mentions
                .iter()
                .filter(|(pos, _)| *pos < whole.start())
                .max_by_key(|(pos, _)| *pos)
                .or(mentions.first())
                .map(|(_, kind)| *kind);
            if let Some(kind) = owner {
                bag.insert(known, name_parameter(kind), name.as_str().into(), Completeness::Explicit);
            }
        }

        if let Some(caps) = PORT.captures(&lower) {
            if let Ok(port) = caps[1].parse::<i64>() {
                bag.insert(known, "frontend_port", ParamValue::Int(port), Completeness::Explicit);
                bag.insert(known, "backend_port", ParamValue::Int(port), Completeness::Explicit);
            }
        }

        if let Some(caps) = DISK.captures(&lower) {
            if let Ok(gb) = caps[1].parse::<i64>() {
                bag.insert(known, "os_disk_size_gb", ParamValue::Int(gb), Completeness::Explicit);
            }
        }

        if let Some(caps) = ENVIRONMENT.captures(&lower) {
            if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                let env = match m.as_str() {
                    "development" => "dev",
                    "production" => "prod",
                    other => other,
                };
                bag.insert(known, "environment", env.into(), Completeness::Explicit);
            }
        }

        bag
    }
}

/// Explicit counts win over articles; "a virtual machine" implies one.
fn quantity(lower: &str) -> Option<(i64, Completeness)> {
    if let Some(n) = NODE_COUNT
        .captures(lower)
        .and_then(|caps| caps[1].parse::<i64>().ok())
    {
        return Some((n, Completeness::Explicit));
    }

    let mut implied = None;
    for caps in QUANTITY.captures_iter(lower) {
        match &caps[1] {
            "a" | "an" => {
                implied.get_or_insert((1, Completeness::InferredDefault));
            }
            word => {
                if let Some(n) = number(word) {
                    return Some((n, Completeness::Explicit));
                }
            }
        }
    }
    implied
}

fn vm_size(text: &str, lower: &str) -> Option<String> {
    if let Some(caps) = VM_SIZE.captures(text) {
        return Some(canonical_size(&caps[1]));
    }
    let cores: i64 = CORES.captures(lower)?[1].parse().ok()?;
    let size = SIZES_BY_CORES
        .iter()
        .find(|(c, _)| *c >= cores)
        .or(SIZES_BY_CORES.last())
        .map(|(_, size)| (*size).to_string());
    size
}

/// `d2s_v3` → `Standard_D2s_v3`.
fn canonical_size(rest: &str) -> String {
    let lower = rest.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => format!("Standard_{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "Standard_".to_string(),
    }
}

fn number(word: &str) -> Option<i64> {
    let n = match word {
        "one" | "single" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        digits => return digits.parse().ok(),
    };
    Some(n)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Parameter that names a resource of `kind`.
pub fn name_parameter(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Vm => "vm_name",
        ResourceKind::Aks => "aks_name",
        ResourceKind::Storage => "storage_account_name",
        ResourceKind::Vnet => "vnet_name",
        ResourceKind::Lb => "lb_name",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atg_protocol::ValueShape;

    fn known() -> KnownParameters {
        let mut k = KnownParameters::new();
        for name in [
            "region",
            "vm_size",
            "node_vm_size",
            "replication",
            "account_tier",
            "address_space",
            "kubernetes_version",
            "vm_name",
            "aks_name",
            "storage_account_name",
            "vnet_name",
            "lb_name",
            "environment",
        ] {
            k.register(name, ValueShape::Text);
        }
        for name in [
            "quantity",
            "subnet_count",
            "frontend_port",
            "backend_port",
            "os_disk_size_gb",
        ] {
            k.register(name, ValueShape::Integer);
        }
        k
    }

    fn extract(text: &str) -> ParameterBag {
        RuleExtractor.extract(text, &known())
    }

    #[test]
    fn vm_and_lb_scenario() {
        let bag = extract("Create 2 virtual machines in East US with a load balancer");
        assert_eq!(bag.resource_kinds, vec![ResourceKind::Vm, ResourceKind::Lb]);
        assert_eq!(bag.get("quantity"), Some(&ParamValue::Int(2)));
        assert_eq!(bag.completeness("quantity"), Completeness::Explicit);
        assert_eq!(bag.get("region"), Some(&ParamValue::Text("East US".into())));
    }

    #[test]
    fn article_implies_one() {
        let bag = extract("I need a virtual machine");
        assert_eq!(bag.get("quantity"), Some(&ParamValue::Int(1)));
        assert_eq!(bag.completeness("quantity"), Completeness::InferredDefault);
    }

    #[test]
    fn explicit_count_beats_earlier_article() {
        let bag = extract("a kubernetes cluster with 3 nodes");
        assert_eq!(bag.get("quantity"), Some(&ParamValue::Int(3)));
        assert_eq!(bag.completeness("quantity"), Completeness::Explicit);
    }

    #[test]
    fn number_words_and_node_counts() {
        assert_eq!(extract("three vms").get("quantity"), Some(&ParamValue::Int(3)));
        assert_eq!(
            extract("a 5-node AKS cluster").get("quantity"),
            Some(&ParamValue::Int(5))
        );
    }

    #[test]
    fn unrelated_request_yields_nothing() {
        let bag = extract("Deploy a quantum database mesh");
        assert!(bag.resource_kinds.is_empty());
        assert!(bag.get("quantity").is_none());
        assert!(bag.get("region").is_none());
    }

    #[test]
    fn region_slug_is_canonicalized() {
        let bag = extract("storage account in westeurope");
        assert_eq!(bag.get("region"), Some(&ParamValue::Text("West Europe".into())));
    }

    #[test]
    fn vm_size_by_name_and_by_cores() {
        assert_eq!(
            extract("two vms of size standard_d4s_v3").get("vm_size"),
            Some(&ParamValue::Text("Standard_D4s_v3".into()))
        );
        assert_eq!(
            extract("a vm with 4 cores").get("vm_size"),
            Some(&ParamValue::Text("Standard_D4s_v3".into()))
        );
        assert_eq!(
            extract("a vm with 64 vcpus").get("vm_size"),
            Some(&ParamValue::Text("Standard_D8s_v3".into()))
        );
    }

    #[test]
    fn aks_only_sizes_target_node_pool() {
        let bag = extract("an AKS cluster on Standard_D2s_v3 nodes with kubernetes version 1.30");
        assert!(bag.get("vm_size").is_none());
        assert_eq!(
            bag.get("node_vm_size"),
            Some(&ParamValue::Text("Standard_D2s_v3".into()))
        );
        assert_eq!(
            bag.get("kubernetes_version"),
            Some(&ParamValue::Text("1.30".into()))
        );
    }

    #[test]
    fn storage_options() {
        let bag = extract("premium storage account with RA-GRS replication");
        assert_eq!(bag.get("replication"), Some(&ParamValue::Text("RAGRS".into())));
        assert_eq!(bag.get("account_tier"), Some(&ParamValue::Text("Premium".into())));
    }

    #[test]
    fn network_options() {
        let bag = extract("a vnet 10.1.0.0/16 with 4 subnets");
        assert_eq!(
            bag.get("address_space"),
            Some(&ParamValue::Text("10.1.0.0/16".into()))
        );
        assert_eq!(bag.get("subnet_count"), Some(&ParamValue::Int(4)));
    }

    #[test]
    fn names_attach_to_nearest_preceding_kind() {
        let bag = extract("2 VMs named web-01 behind a load balancer called front-lb");
        assert_eq!(bag.get("vm_name"), Some(&ParamValue::Text("web-01".into())));
        assert_eq!(bag.get("lb_name"), Some(&ParamValue::Text("front-lb".into())));
    }

    #[test]
    fn ports_disk_and_environment() {
        let bag = extract("a vm with a 128 GB disk and a load balancer on port 443 for the production environment");
        assert_eq!(bag.get("frontend_port"), Some(&ParamValue::Int(443)));
        assert_eq!(bag.get("backend_port"), Some(&ParamValue::Int(443)));
        assert_eq!(bag.get("os_disk_size_gb"), Some(&ParamValue::Int(128)));
        assert_eq!(bag.get("environment"), Some(&ParamValue::Text("prod".into())));
    }

    #[test]
    fn unknown_parameters_are_dropped() {
        let bag = RuleExtractor.extract("a storage account with GRS", &KnownParameters::new());
        assert_eq!(bag.resource_kinds, vec![ResourceKind::Storage]);
        assert!(bag.get("replication").is_none());
        assert!(bag.dropped.contains(&"replication".to_string()));
    }
}
