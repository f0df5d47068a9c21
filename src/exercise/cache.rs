use super::types::{Exercise, ExerciseFields, ExerciseVariantSet, VariantKey};
use super::validation::validate_generated;
use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::error::{AppError, AppResult, StoreError};
use crate::generator::{ContentGenerator, ExerciseRequest};
use crate::language::Language;
use crate::storage::Store;
use crate::vocabulary::types::{Level, VocabularyWord};

use rand::seq::SliceRandom;
use std::sync::Arc;

/// Variants scoring at or below this are evicted once the set is full.
pub const EVICTION_THRESHOLD: f64 = 0.5;

/// Serves exercises from per-word-set variant pools, generating new variants
/// until a pool is full and evicting badly voted ones.
pub struct ExerciseCache {
    store: Arc<Store>,
    /// Produces new variants when a pool has room.
    generator: Arc<dyn ContentGenerator>,
    clock: Arc<dyn Clock>,
    /// Pool capacity, vote volume and retry limits.
    config: CacheConfig,
}

impl ExerciseCache {
    pub fn new(
        store: Arc<Store>,
        generator: Arc<dyn ContentGenerator>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store,
            generator,
            clock,
            config,
        }
    }

    /// Returns one servable exercise for `words` (one entry per blank).
    ///
    /// Below capacity a new variant is generated. At capacity the weakest
    /// variant may be evicted, then a random survivor is served.
    pub async fn resolve(
        &self,
        words: &[VocabularyWord],
        language: Language,
        level: Level,
    ) -> AppResult<Exercise> {
        if words.is_empty() {
            return Err(AppError::validation("an exercise needs at least one word"));
        }

        let word_ids: Vec<String> = words.iter().map(|w| w.id.clone()).collect();
        let key = VariantKey::new(&word_ids, language, level);
        let variants = self.live_variants(&key)?;

        if variants.len() < self.config.capacity {
            tracing::debug!(
                "Variant set {} has {}/{} variants, generating",
                key,
                variants.len(),
                self.config.capacity
            );
            return self.generate_variant(&key, words, language, level, &variants).await;
        }

        let survivors = self.evict_weakest(&key, variants)?;
        let pick = survivors.choose(&mut rand::thread_rng()).cloned();
        match pick {
            Some(exercise) => {
                tracing::debug!("Serving cached variant {} for {}", exercise.id, key);
                Ok(exercise)
            }
            None => self.generate_variant(&key, words, language, level, &[]).await,
        }
    }

    /// Loads the set's exercises, dropping ids whose record is gone.
    fn live_variants(&self, key: &VariantKey) -> AppResult<Vec<Exercise>> {
        let Some(set) = self.store.variant_sets.get(key.as_str()) else {
            return Ok(Vec::new());
        };

        let mut live = Vec::with_capacity(set.exercise_ids.len());
        let mut dangling = Vec::new();
        for id in &set.exercise_ids {
            match self.store.exercises.get(id) {
                Some(exercise) => live.push(exercise),
                None => dangling.push(id.clone()),
            }
        }

        if !dangling.is_empty() {
            tracing::warn!(
                "Dropping {} dangling variant ids from {}",
                dangling.len(),
                key
            );
            let result = self
                .store
                .variant_sets
                .update(key.as_str(), |set| -> AppResult<()> {
                    set.exercise_ids.retain(|id| !dangling.contains(id));
                    Ok(())
                });
            match result {
                Ok(()) | Err(AppError::Store(StoreError::NotFound { .. })) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(live)
    }

    pub fn quality(&self, exercise_id: &str) -> f64 {
        self.store
            .vote_tallies
            .get(exercise_id)
            .unwrap_or_default()
            .quality(self.config.min_vote_volume)
    }

    /// Evicts at most one variant: the lowest scoring, if it scores at or
    /// below the threshold. Returns the survivors.
    fn evict_weakest(&self, key: &VariantKey, variants: Vec<Exercise>) -> AppResult<Vec<Exercise>> {
        let weakest = variants
            .iter()
            .map(|exercise| (self.quality(&exercise.id), exercise.id.clone()))
            .min_by(|a, b| a.0.total_cmp(&b.0));

        let Some((score, victim)) = weakest else {
            return Ok(variants);
        };
        if score > EVICTION_THRESHOLD {
            return Ok(variants);
        }

        let result = self
            .store
            .variant_sets
            .update(key.as_str(), |set| -> AppResult<()> {
                set.exercise_ids.retain(|id| id != &victim);
                Ok(())
            });
        match result {
            Ok(()) | Err(AppError::Store(StoreError::NotFound { .. })) => {}
            Err(e) => return Err(e),
        }
        self.store.exercises.remove(&victim);
        self.store.vote_tallies.remove(&victim);
        for (vote_id, _) in self.store.votes.find_entries(|v| v.exercise_id == victim) {
            self.store.votes.remove(&vote_id);
        }

        tracing::info!(
            "Evicted variant {} from {} (quality {:.3})",
            victim,
            key,
            score
        );

        Ok(variants.into_iter().filter(|e| e.id != victim).collect())
    }

    async fn generate_variant(
        &self,
        key: &VariantKey,
        words: &[VocabularyWord],
        language: Language,
        level: Level,
        existing: &[Exercise],
    ) -> AppResult<Exercise> {
        let style_examples: Vec<ExerciseFields> = {
            let mut rng = rand::thread_rng();
            existing
                .choose_multiple(&mut rng, self.config.style_examples)
                .map(|e| e.content.clone())
                .collect()
        };

        let word_values: Vec<String> = words.iter().map(|w| w.value.clone()).collect();
        let request = ExerciseRequest {
            word_values: word_values.clone(),
            language,
            level,
            style_examples,
        };

        let attempts = self.config.generation_attempts;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=attempts {
            let outcome = match self.generator.generate_exercise(&request).await {
                Ok(raw) => validate_generated(&raw, &word_values).map_err(|e| e.to_string()),
                Err(e) => Err(format!("{e:#}")),
            };

            match outcome {
                Ok(content) => return self.store_variant(key, words, language, level, content),
                Err(reason) => {
                    tracing::warn!(
                        "Generation attempt {}/{} for {} failed: {}",
                        attempt,
                        attempts,
                        key,
                        reason
                    );
                    last_error = reason;
                }
            }
        }

        Err(AppError::Generation(format!(
            "{attempts} attempts failed for {key}: {last_error}"
        )))
    }

    fn store_variant(
        &self,
        key: &VariantKey,
        words: &[VocabularyWord],
        language: Language,
        level: Level,
        content: ExerciseFields,
    ) -> AppResult<Exercise> {
        let exercise = Exercise {
            id: uuid::Uuid::new_v4().to_string(),
            word_ids: words.iter().map(|w| w.id.clone()).collect(),
            word_values: words.iter().map(|w| w.value.clone()).collect(),
            language,
            level,
            variant_key: key.to_string(),
            content,
            created_at_ms: self.clock.now_ms(),
        };
        self.store
            .exercises
            .insert_new(exercise.id.clone(), exercise.clone())?;

        let capacity = self.config.capacity;
        let added = self.store.variant_sets.upsert_with(
            key.as_str(),
            || ExerciseVariantSet::empty(key),
            |set| -> AppResult<bool> {
                if set.exercise_ids.len() >= capacity {
                    return Ok(false);
                }
                set.exercise_ids.push(exercise.id.clone());
                Ok(true)
            },
        )?;

        if added {
            tracing::info!("Cached new variant {} under {}", exercise.id, key);
        } else {
            // Filled concurrently; the exercise is still served, just not cached.
            tracing::debug!("Variant set {} filled concurrently, {} not cached", key, exercise.id);
        }

        Ok(exercise)
    }
}
