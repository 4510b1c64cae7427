//! Template store: turns a source into a curated, immutable catalog.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use atg_protocol::{KnownParameters, ResourceKind};

use crate::definition::parse_definition;
use crate::error::{TemplateError, TemplateResult};
use crate::source::TemplateSource;
use crate::types::Template;

/// A curated, immutable set of templates plus the union of their parameters.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<Arc<Template>>,
    known: KnownParameters,
}

impl TemplateCatalog {
    /// Build a catalog from already-parsed templates.
    ///
    /// Fails on duplicate ids, an empty set, or one parameter name declared
    /// with different value shapes by different templates.
    pub fn new(mut templates: Vec<Template>) -> TemplateResult<Self> {
        if templates.is_empty() {
            return Err(TemplateError::Empty);
        }
        templates.sort_by(|a, b| a.id.cmp(&b.id));

        let mut known = KnownParameters::new();
        let mut shape_owner: HashMap<String, String> = HashMap::new();
        for pair in templates.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(TemplateError::Duplicate(pair[0].id.clone()));
            }
        }
        for template in &templates {
            for param in &template.parameters {
                if let Some(existing) = known.register(param.name.as_str(), param.kind.shape()) {
                    let owner = shape_owner.get(&param.name).cloned().unwrap_or_default();
                    return Err(TemplateError::Invalid {
                        id: template.id.clone(),
                        message: format!(
                            "parameter `{}` is {:?} here but {existing:?} in `{owner}`",
                            param.name,
                            param.kind.shape()
                        ),
                    });
                }
                shape_owner
                    .entry(param.name.clone())
                    .or_insert_with(|| template.id.clone());
            }
        }

        Ok(Self {
            templates: templates.into_iter().map(Arc::new).collect(),
            known,
        })
    }

    /// Templates sorted by id.
    pub fn templates(&self) -> &[Arc<Template>] {
        &self.templates
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Template>> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn by_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Arc<Template>> {
        self.templates.iter().filter(move |t| t.resource_kind == kind)
    }

    /// Every parameter name any template declares, with its value shape.
    pub fn known_parameters(&self) -> &KnownParameters {
        &self.known
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Loads catalogs from a [`TemplateSource`] and keeps the last good one.
pub struct TemplateStore {
    source: Arc<dyn TemplateSource>,
    current: RwLock<Option<Arc<TemplateCatalog>>>,
}

impl TemplateStore {
    pub fn new(source: Arc<dyn TemplateSource>) -> Self {
        Self {
            source,
            current: RwLock::new(None),
        }
    }

    /// Read and curate every definition the source offers.
    ///
    /// Any invalid definition fails the whole load; a partial corpus is
    /// never published.
    pub async fn load(&self) -> TemplateResult<TemplateCatalog> {
        let names = self.source.list().await?;
        let mut templates = Vec::with_capacity(names.len());
        for name in &names {
            let text = self.source.read(name).await?;
            templates.push(parse_definition(name, &text)?);
        }
        TemplateCatalog::new(templates)
    }

    /// Load a fresh catalog and make it current.
    ///
    /// On failure the previous catalog stays current.
    pub async fn reload(&self) -> TemplateResult<Arc<TemplateCatalog>> {
        match self.load().await {
            Ok(catalog) => {
                let catalog = Arc::new(catalog);
                info!(
                    source = %self.source.describe(),
                    templates = catalog.len(),
                    parameters = catalog.known_parameters().len(),
                    "Template catalog loaded"
                );
                let mut guard = self
                    .current
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *guard = Some(Arc::clone(&catalog));
                Ok(catalog)
            }
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "Template reload failed, keeping previous catalog");
                Err(e)
            }
        }
    }

    /// The last successfully loaded catalog, if any.
    pub fn current(&self) -> Option<Arc<TemplateCatalog>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }
}
