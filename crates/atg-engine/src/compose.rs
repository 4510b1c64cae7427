//! Composition of accepted artifacts into one `main.tf`.

use atg_protocol::{CustomizedArtifact, Syntax};

/// Provider block shared by every composed configuration.
pub const PROVIDER_PREAMBLE: &str = r#"terraform {
  required_providers {
    azurerm = {
      source  = "hashicorp/azurerm"
      version = "~> 3.100"
    }
  }
}

provider "azurerm" {
  features {}
}
"#;

/// Join HCL artifacts in selection order, each under a header comment.
///
/// JSON-syntax artifacts cannot share a file with HCL and are skipped
/// with a warning.
pub fn compose(artifacts: &[CustomizedArtifact], preamble: bool) -> String {
    let mut out = String::new();
    if preamble {
        out.push_str(PROVIDER_PREAMBLE);
    }
    for artifact in artifacts {
        if artifact.syntax != Syntax::Hcl {
            tracing::warn!(template = %artifact.template_id, "not composing non-HCL artifact");
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!(
            "# {} ({} v{})\n",
            artifact.resource_kind.display_name(),
            artifact.template_id,
            artifact.template_version
        ));
        out.push_str(artifact.body.trim_start_matches('\n'));
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use atg_protocol::ResourceKind;

    fn artifact(id: &str, kind: ResourceKind, syntax: Syntax, body: &str) -> CustomizedArtifact {
        CustomizedArtifact {
            template_id: id.into(),
            template_version: 1,
            resource_kind: kind,
            xref_key: kind.slug().into(),
            syntax,
            body: body.into(),
            resolutions: Vec::new(),
            notes: Vec::new(),
        }
    }

    #[test]
    fn preamble_then_artifacts_in_order() {
        let text = compose(
            &[
                artifact("virtual_machine", ResourceKind::Vm, Syntax::Hcl, "\nvm = 1"),
                artifact("lb", ResourceKind::Lb, Syntax::Hcl, "lb = 1\n"),
            ],
            true,
        );
        assert!(text.starts_with("terraform {"));
        let vm = text.find("# Virtual Machine (virtual_machine v1)\nvm = 1\n").unwrap();
        let lb = text.find("# Load Balancer (lb v1)\nlb = 1\n").unwrap();
        assert!(vm < lb);
    }

    #[test]
    fn json_artifacts_are_skipped() {
        let text = compose(
            &[artifact("raw", ResourceKind::Vnet, Syntax::Json, "{}")],
            false,
        );
        assert!(text.is_empty());
    }
}
