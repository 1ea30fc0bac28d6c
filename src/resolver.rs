//! Model resolution: turn a [`ModelStrategy`] into concrete identifiers.
//!
//! Three strategies:
//!
//! 1. **Fixed**: the configured identifier, no questions asked.
//! 2. **Static fallback**: the first candidate the backend can bind (a local
//!    check, never a network call). If none binds, the last-resort default
//!    is returned rather than nothing.
//! 3. **Live discovery**: list the provider's models, keep those that
//!    support `generateContent`, and pick by marker priority.
//!
//! Discovery falls back to the first listed model when no marker matches.
//! That order is whatever the provider returns and is not guaranteed stable
//! between calls, so the orchestrator resolves once per run and threads the
//! [`ModelSelection`] through every generation call.

use crate::config::{DiscoveryMarkers, ModelStrategy};
use crate::error::ReviewError;
use crate::provider::{GenerativeBackend, ModelId, ModelInfo};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// The outcome of resolution: a primary model and, for the static
/// strategy, the other bindable candidates in preference order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub primary: ModelId,
    pub fallbacks: Vec<ModelId>,
}

impl ModelSelection {
    pub fn single(model: ModelId) -> Self {
        Self {
            primary: model,
            fallbacks: Vec::new(),
        }
    }

    /// The candidate list for the generation client: primary first.
    pub fn candidates(&self) -> Vec<ModelId> {
        std::iter::once(self.primary.clone())
            .chain(self.fallbacks.iter().cloned())
            .collect()
    }
}

/// Resolves a model strategy against one backend.
///
/// Holds only borrowed state; build one per run.
pub struct ModelResolver<'a> {
    backend: &'a dyn GenerativeBackend,
    strategy: &'a ModelStrategy,
}

impl<'a> ModelResolver<'a> {
    pub fn new(backend: &'a dyn GenerativeBackend, strategy: &'a ModelStrategy) -> Self {
        Self { backend, strategy }
    }

    /// Resolve the strategy. Only live discovery can fail.
    pub async fn resolve(&self) -> Result<ModelSelection, ReviewError> {
        let selection = match self.strategy {
            ModelStrategy::Fixed(id) => ModelSelection::single(id.clone()),
            ModelStrategy::StaticFallback {
                candidates,
                last_resort,
            } => self.resolve_static(candidates, last_resort),
            ModelStrategy::LiveDiscovery(markers) => self.discover(markers).await?,
        };
        info!(
            "Resolved model {} ({} fallback(s))",
            selection.primary,
            selection.fallbacks.len()
        );
        Ok(selection)
    }

    fn resolve_static(&self, candidates: &[ModelId], last_resort: &ModelId) -> ModelSelection {
        let mut bindable = candidates.iter().filter(|id| match self.backend.bind(id) {
            Ok(()) => true,
            Err(e) => {
                debug!("Candidate {} not usable: {}", id, e);
                false
            }
        });

        match bindable.next() {
            Some(primary) => ModelSelection {
                primary: primary.clone(),
                fallbacks: bindable.cloned().collect(),
            },
            None => {
                warn!(
                    "No candidate model could be bound, using last resort {}",
                    last_resort
                );
                ModelSelection::single(last_resort.clone())
            }
        }
    }

    async fn discover(&self, markers: &DiscoveryMarkers) -> Result<ModelSelection, ReviewError> {
        let listed = self
            .backend
            .list_models()
            .await
            .map_err(|e| ReviewError::NoModelsAvailable {
                cause: e.to_string(),
            })?;
        let total = listed.len();

        let usable: Vec<ModelInfo> = listed
            .into_iter()
            .filter(ModelInfo::supports_generation)
            .collect();
        debug!(
            "{} of {} listed models support generation",
            usable.len(),
            total
        );

        pick_by_marker(&usable, markers)
            .map(ModelSelection::single)
            .ok_or_else(|| ReviewError::NoModelsAvailable {
                cause: format!(
                    "{} listed {total} model(s), none supporting generation",
                    self.backend.name()
                ),
            })
    }
}

/// First model matching the highest-priority marker, else the first model.
fn pick_by_marker(models: &[ModelInfo], markers: &DiscoveryMarkers) -> Option<ModelId> {
    markers
        .in_priority_order()
        .iter()
        .find_map(|marker| models.iter().find(|m| m.id.as_str().contains(marker)))
        .or_else(|| models.first())
        .map(|m| m.id.clone())
}
