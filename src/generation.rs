//! Generation with retry-by-substitution across candidate models.
//!
//! ## Retry policy
//!
//! A failed candidate is skipped only when its error is retryable
//! ([`ProviderErrorKind::ModelNotFound`] or
//! [`ProviderErrorKind::Unavailable`]). Any other kind aborts at once: a bad
//! key or an exhausted quota fails the same way on every model, and a
//! malformed request will not improve by changing models.
//!
//! A single candidate gets exactly one attempt and its raw error surfaces
//! as [`ReviewError::Generation`]. There is no backoff: substitution is the
//! only retry mechanism.
//!
//! [`ProviderErrorKind::ModelNotFound`]: crate::error::ProviderErrorKind::ModelNotFound
//! [`ProviderErrorKind::Unavailable`]: crate::error::ProviderErrorKind::Unavailable

use crate::error::{ProviderError, ReviewError};
use crate::provider::{GenerationRequest, GenerativeBackend, ModelId};
use std::time::Instant;
use tracing::{debug, warn};

/// Text returned by a successful call, with the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub text: String,
    pub model: ModelId,
}

/// Runs generation requests against a backend.
///
/// Holds only a borrowed backend; build one per run.
pub struct GenerationClient<'a> {
    backend: &'a dyn GenerativeBackend,
}

impl<'a> GenerationClient<'a> {
    pub fn new(backend: &'a dyn GenerativeBackend) -> Self {
        Self { backend }
    }

    /// Try `candidates` in order until one succeeds.
    ///
    /// # Errors
    /// - [`ReviewError::NoCandidateModels`] for an empty list
    /// - [`ReviewError::Generation`] on a fatal error, or any error with a
    ///   single candidate
    /// - [`ReviewError::AllModelsExhausted`] when every candidate failed
    ///   with a retryable error
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        candidates: &[ModelId],
    ) -> Result<Generated, ReviewError> {
        match candidates {
            [] => Err(ReviewError::NoCandidateModels),
            [only] => self
                .attempt(only, request)
                .await
                .map_err(|source| ReviewError::Generation {
                    model: only.to_string(),
                    source,
                }),
            _ => self.generate_with_substitution(request, candidates).await,
        }
    }

    async fn generate_with_substitution(
        &self,
        request: &GenerationRequest,
        candidates: &[ModelId],
    ) -> Result<Generated, ReviewError> {
        let mut last_error: Option<ProviderError> = None;

        for model in candidates {
            match self.attempt(model, request).await {
                Ok(generated) => return Ok(generated),
                Err(e) if e.is_retryable() => {
                    warn!("Model {} unavailable ({}), trying next candidate", model, e);
                    last_error = Some(e);
                }
                Err(e) => {
                    return Err(ReviewError::Generation {
                        model: model.to_string(),
                        source: e,
                    })
                }
            }
        }

        match last_error {
            Some(last_error) => Err(ReviewError::AllModelsExhausted {
                attempted: candidates.len(),
                last_error,
            }),
            None => Err(ReviewError::NoCandidateModels),
        }
    }

    /// Construct a handle for `model` and make one call.
    async fn attempt(
        &self,
        model: &ModelId,
        request: &GenerationRequest,
    ) -> Result<Generated, ProviderError> {
        self.backend.bind(model)?;

        let start = Instant::now();
        let text = self.backend.generate(model, request).await?;
        debug!(
            "{} answered in {}ms ({} chars)",
            model,
            start.elapsed().as_millis(),
            text.len()
        );

        Ok(Generated {
            text,
            model: model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;
    use crate::provider::ModelInfo;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted backend: each model either answers or fails with a kind.
    struct Scripted {
        outcomes: HashMap<&'static str, Result<&'static str, ProviderErrorKind>>,
        calls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(outcomes: Vec<(&'static str, Result<&'static str, ProviderErrorKind>)>) -> Self {
            Self {
                outcomes: outcomes.into_iter().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn bind(&self, _: &ModelId) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn generate(
            &self,
            model: &ModelId,
            _: &GenerationRequest,
        ) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push(model.to_string());
            match self.outcomes.get(model.as_str()) {
                Some(Ok(text)) => Ok(text.to_string()),
                Some(Err(kind)) => Err(ProviderError::new(*kind, format!("{model}: {kind}"))),
                None => Err(ProviderError::new(ProviderErrorKind::ModelNotFound, "unknown")),
            }
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
            Ok(vec![])
        }
    }

    fn ids(names: &[&str]) -> Vec<ModelId> {
        names.iter().map(|n| ModelId::from(*n)).collect()
    }

    #[tokio::test]
    async fn substitutes_after_not_found() {
        let b = Scripted::new(vec![
            ("A", Err(ProviderErrorKind::ModelNotFound)),
            ("B", Ok("from B")),
        ]);
        let out = GenerationClient::new(&b)
            .generate(&GenerationRequest::text("hi"), &ids(&["A", "B"]))
            .await
            .unwrap();
        assert_eq!(out.text, "from B");
        assert_eq!(out.model, ModelId::from("B"));
        assert_eq!(b.calls(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn authentication_error_aborts_without_trying_next() {
        let b = Scripted::new(vec![
            ("A", Err(ProviderErrorKind::Authentication)),
            ("B", Ok("from B")),
        ]);
        let err = GenerationClient::new(&b)
            .generate(&GenerationRequest::text("hi"), &ids(&["A", "B"]))
            .await
            .unwrap_err();
        match err {
            ReviewError::Generation { model, source } => {
                assert_eq!(model, "A");
                assert_eq!(source.kind, ProviderErrorKind::Authentication);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(b.calls(), vec!["A"]);
    }

    #[tokio::test]
    async fn exhaustion_carries_last_retryable_error() {
        let b = Scripted::new(vec![
            ("A", Err(ProviderErrorKind::ModelNotFound)),
            ("B", Err(ProviderErrorKind::Unavailable)),
        ]);
        let err = GenerationClient::new(&b)
            .generate(&GenerationRequest::text("hi"), &ids(&["A", "B"]))
            .await
            .unwrap_err();
        match err {
            ReviewError::AllModelsExhausted {
                attempted,
                last_error,
            } => {
                assert_eq!(attempted, 2);
                assert_eq!(last_error.kind, ProviderErrorKind::Unavailable);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_candidate_surfaces_raw_error() {
        let b = Scripted::new(vec![("A", Err(ProviderErrorKind::ModelNotFound))]);
        let err = GenerationClient::new(&b)
            .generate(&GenerationRequest::text("hi"), &ids(&["A"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReviewError::Generation { ref source, .. }
                if source.kind == ProviderErrorKind::ModelNotFound
        ));
    }

    #[tokio::test]
    async fn empty_candidate_list() {
        let b = Scripted::new(vec![]);
        let err = GenerationClient::new(&b)
            .generate(&GenerationRequest::text("hi"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::NoCandidateModels));
    }
}
