//! Cache-first metadata lookups.

use tracing::{debug, info, warn};

use crate::{
    cache::LookupCache,
    config::AppConfig,
    extract,
    models::MetadataRecord,
    provider::{prompt, GeminiClient, TextGenerator},
};

/// Where a lookup result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Served from the lookup cache.
    Cache,
    /// Freshly parsed from service output.
    Service,
    /// Freshly produced default record.
    Fallback,
}

/// Result of [`MetadataService::lookup`].
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    /// The record to show.
    pub record: MetadataRecord,
    /// How it was obtained.
    pub origin: Origin,
}

/// Couples the lookup cache with an optional text generator.
///
/// Lookups never fail: whatever goes wrong ends in a default record whose
/// `source_label` says so.
pub struct MetadataService<G> {
    cache: LookupCache,
    generator: Option<G>,
}

impl MetadataService<GeminiClient> {
    /// Build the service described by `config`. Without an API key the
    /// service runs cache-only.
    pub fn from_config(config: &AppConfig) -> Self {
        let cache = LookupCache::open(&config.cache_path);
        let generator = match GeminiClient::from_config(config) {
            Ok(client) => Some(client),
            Err(err) => {
                warn!("metadata service unavailable: {err}");
                None
            }
        };
        Self::new(cache, generator)
    }
}

impl<G: TextGenerator> MetadataService<G> {
    /// Assemble a service from its parts.
    pub fn new(cache: LookupCache, generator: Option<G>) -> Self {
        Self { cache, generator }
    }

    /// The underlying cache.
    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    /// Name of the configured generator, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.generator.as_ref().map(TextGenerator::name)
    }

    /// Whether the generator answers at all.
    pub fn probe(&self) -> bool {
        self.generator
            .as_ref()
            .map(TextGenerator::probe)
            .unwrap_or(false)
    }

    /// Cached record for `subject`, or a freshly fetched one.
    pub fn lookup_or_fetch(&mut self, subject: &str, platform: Option<&str>) -> MetadataRecord {
        self.lookup(subject, platform).record
    }

    /// Like [`Self::lookup_or_fetch`], also reporting where the record came from.
    pub fn lookup(&mut self, subject: &str, platform: Option<&str>) -> Lookup {
        if let Some(record) = self.cache.get(subject, platform) {
            debug!(subject, ?platform, "cache hit");
            return Lookup {
                record: record.clone(),
                origin: Origin::Cache,
            };
        }
        debug!(subject, ?platform, "cache miss");

        let Some(generator) = self.generator.as_ref() else {
            return Lookup {
                record: extract::fallback(subject),
                origin: Origin::Fallback,
            };
        };

        let record = match generator.generate(&prompt::game_prompt(subject, platform)) {
            Ok(raw) => extract::extract(&raw, subject),
            Err(err) => {
                warn!(subject, provider = generator.name(), "lookup failed: {err}");
                extract::fallback(subject)
            }
        };
        let origin = if record.is_fallback() {
            Origin::Fallback
        } else {
            Origin::Service
        };
        info!(subject, ?platform, ?origin, "lookup fetched");

        self.cache.set(subject, platform, record.clone());
        Lookup { record, origin }
    }

    /// Empty the cache.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        info!(path = %self.cache.path().display(), "cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{SOURCE_FALLBACK, SOURCE_SERVICE},
        provider::ProviderError,
    };
    use anyhow::Result;
    use std::cell::{Cell, RefCell};
    use tempfile::tempdir;

    /// Generator returning canned answers and counting calls.
    struct StubGenerator {
        answer: RefCell<Option<String>>,
        calls: Cell<usize>,
    }

    impl StubGenerator {
        fn answering(answer: &str) -> Self {
            Self {
                answer: RefCell::new(Some(answer.to_string())),
                calls: Cell::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                answer: RefCell::new(None),
                calls: Cell::new(0),
            }
        }
    }

    impl TextGenerator for StubGenerator {
        fn name(&self) -> &str {
            "stub"
        }

        fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
            self.calls.set(self.calls.get() + 1);
            if prompt.contains("'OK'") {
                return Ok("OK".to_string());
            }
            self.answer
                .borrow()
                .clone()
                .ok_or(ProviderError::EmptyResponse)
        }
    }

    #[test]
    fn fetches_once_then_serves_from_cache() -> Result<()> {
        let dir = tempdir()?;
        let cache = LookupCache::open(dir.path().join("cache.json"));
        let generator =
            StubGenerator::answering(r#"Sure! {"nome": "Celeste", "genero": "Platformer"}"#);
        let mut service = MetadataService::new(cache, Some(generator));

        let first = service.lookup("Celeste", Some("PC"));
        assert_eq!(first.origin, Origin::Service);
        assert_eq!(first.record.title.as_deref(), Some("Celeste"));
        assert_eq!(first.record.source_label.as_deref(), Some(SOURCE_SERVICE));
        assert_eq!(first.record.original_query.as_deref(), Some("Celeste"));

        let second = service.lookup("CELESTE", Some("pc"));
        assert_eq!(second.origin, Origin::Cache);
        assert_eq!(second.record, first.record);
        assert_eq!(service.generator.as_ref().map(|g| g.calls.get()), Some(1));
        Ok(())
    }

    #[test]
    fn unparsable_answer_is_cached_as_fallback() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cache.json");
        let generator = StubGenerator::answering("I don't know that game.");
        let mut service = MetadataService::new(LookupCache::open(&path), Some(generator));

        let lookup = service.lookup("Obscure", None);
        assert_eq!(lookup.origin, Origin::Fallback);
        assert_eq!(lookup.record.source_label.as_deref(), Some(SOURCE_FALLBACK));
        assert!(LookupCache::open(&path).contains("obscure", None));
        Ok(())
    }

    #[test]
    fn generator_error_yields_fallback() -> Result<()> {
        let dir = tempdir()?;
        let cache = LookupCache::open(dir.path().join("cache.json"));
        let mut service = MetadataService::new(cache, Some(StubGenerator::failing()));

        let record = service.lookup_or_fetch("Hades", Some("Switch"));
        assert_eq!(record, extract::fallback("Hades"));
        assert!(service.cache().contains("hades", Some("switch")));
        Ok(())
    }

    #[test]
    fn without_generator_nothing_is_cached() -> Result<()> {
        let dir = tempdir()?;
        let cache = LookupCache::open(dir.path().join("cache.json"));
        let mut service: MetadataService<StubGenerator> = MetadataService::new(cache, None);

        let lookup = service.lookup("Hades", None);
        assert_eq!(lookup.origin, Origin::Fallback);
        assert!(service.cache().is_empty());
        assert_eq!(service.provider_name(), None);
        assert!(!service.probe());
        Ok(())
    }

    #[test]
    fn clear_forces_a_new_fetch() -> Result<()> {
        let dir = tempdir()?;
        let cache = LookupCache::open(dir.path().join("cache.json"));
        let generator = StubGenerator::answering(r#"{"nome": "Celeste"}"#);
        let mut service = MetadataService::new(cache, Some(generator));

        service.lookup("Celeste", None);
        service.clear_cache();
        assert!(service.cache().is_empty());

        let again = service.lookup("Celeste", None);
        assert_eq!(again.origin, Origin::Service);
        assert_eq!(service.generator.as_ref().map(|g| g.calls.get()), Some(2));
        assert!(service.probe());
        Ok(())
    }
}
