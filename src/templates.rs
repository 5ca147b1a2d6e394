use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::engine::CalendarError;
use crate::model::*;
use crate::observability::TEMPLATE_CACHE_HITS_TOTAL;
use crate::source::CalendarSource;

/// Per-fixer cache of availability templates. Only successful loads are kept.
pub struct TemplateStore {
    templates: DashMap<UserId, Arc<AvailabilityTemplate>>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateStore {
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
        }
    }

    pub async fn get_template<S: CalendarSource + ?Sized>(
        &self,
        source: &S,
        fixer: &str,
    ) -> Result<Arc<AvailabilityTemplate>, CalendarError> {
        if let Some(cached) = self.templates.get(fixer) {
            metrics::counter!(TEMPLATE_CACHE_HITS_TOTAL).increment(1);
            return Ok(cached.value().clone());
        }
        let template = source
            .get_template(fixer)
            .await
            .map_err(|source| CalendarError::Fetch {
                fixer: fixer.to_string(),
                source,
            })?;
        let template = Arc::new(template);
        debug!(fixer, "availability template loaded");
        self.templates.insert(fixer.to_string(), template.clone());
        Ok(template)
    }

    /// Forget a fixer's template so the next lookup reloads it.
    pub fn invalidate(&self, fixer: &str) {
        self.templates.remove(fixer);
    }

    pub fn is_cached(&self, fixer: &str) -> bool {
        self.templates.contains_key(fixer)
    }
}
