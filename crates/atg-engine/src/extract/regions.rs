//! Canonical Azure region names.

use atg_protocol::find_phrase;

/// `(display name, programmatic name)` for the public Azure regions.
const REGIONS: &[(&str, &str)] = &[
    ("East US", "eastus"),
    ("East US 2", "eastus2"),
    ("West US", "westus"),
    ("West US 2", "westus2"),
    ("West US 3", "westus3"),
    ("Central US", "centralus"),
    ("North Central US", "northcentralus"),
    ("South Central US", "southcentralus"),
    ("West Central US", "westcentralus"),
    ("Canada Central", "canadacentral"),
    ("Canada East", "canadaeast"),
    ("Brazil South", "brazilsouth"),
    ("North Europe", "northeurope"),
    ("West Europe", "westeurope"),
    ("UK South", "uksouth"),
    ("UK West", "ukwest"),
    ("France Central", "francecentral"),
    ("Germany West Central", "germanywestcentral"),
    ("Switzerland North", "switzerlandnorth"),
    ("Norway East", "norwayeast"),
    ("Sweden Central", "swedencentral"),
    ("Poland Central", "polandcentral"),
    ("Italy North", "italynorth"),
    ("East Asia", "eastasia"),
    ("Southeast Asia", "southeastasia"),
    ("Japan East", "japaneast"),
    ("Japan West", "japanwest"),
    ("Korea Central", "koreacentral"),
    ("Central India", "centralindia"),
    ("South India", "southindia"),
    ("Australia East", "australiaeast"),
    ("Australia Southeast", "australiasoutheast"),
    ("UAE North", "uaenorth"),
    ("South Africa North", "southafricanorth"),
];

/// The first region mentioned in `text`, as its display name.
///
/// Both spellings match ("East US 2", "eastus2"). The earliest mention
/// wins, and of mentions starting at the same place the longest, so
/// "West Central US" never reads as "Central US".
pub fn find_region(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let mut best: Option<(usize, usize, &'static str)> = None;
    for (display, slug) in REGIONS {
        for spelling in [display.to_lowercase(), (*slug).to_string()] {
            let Some(pos) = find_phrase(&lower, &spelling) else {
                continue;
            };
            let len = spelling.len();
            let better = match best {
                None => true,
                Some((bpos, blen, _)) => pos < bpos || (pos == bpos && len > blen),
            };
            if better {
                best = Some((pos, len, *display));
            }
        }
    }
    best.map(|(_, _, display)| display)
}

/// Display name for a display or programmatic region spelling.
pub fn canonical_region(name: &str) -> Option<&'static str> {
    let wanted = name.trim().to_lowercase();
    REGIONS
        .iter()
        .find(|(display, slug)| display.to_lowercase() == wanted || *slug == wanted)
        .map(|(display, _)| *display)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_slug_spellings() {
        assert_eq!(find_region("deploy in East US please"), Some("East US"));
        assert_eq!(find_region("region=westeurope"), Some("West Europe"));
    }

    #[test]
    fn longer_names_win() {
        assert_eq!(find_region("two vms in east us 2"), Some("East US 2"));
        assert_eq!(find_region("in West Central US"), Some("West Central US"));
        assert_eq!(find_region("eastus2"), Some("East US 2"));
    }

    #[test]
    fn no_region() {
        assert_eq!(find_region("a storage account"), None);
        assert_eq!(find_region("the best user experience"), None);
    }

    #[test]
    fn canonicalizes_both_spellings() {
        assert_eq!(canonical_region("uksouth"), Some("UK South"));
        assert_eq!(canonical_region(" north europe "), Some("North Europe"));
        assert_eq!(canonical_region("mars"), None);
    }
}
