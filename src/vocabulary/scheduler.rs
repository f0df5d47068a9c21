//! Word selection and the locked/unlocked progression state machine.

use super::types::{
    LearnerWord, LearnerWordView, Level, UnlockStatus, VocabularyWord, WordCandidate,
    learner_word_key,
};
use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::error::{AppError, AppResult, StoreError};
use crate::language::Language;
use crate::storage::Store;

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::f64::consts::TAU;
use std::sync::Arc;

/// A latest score below this counts as "struggling" for support unlocks.
const STRUGGLING_SCORE: f64 = 0.5;
/// Share of struggling unlocked words above which one more word is unlocked.
const SUPPORT_UNLOCK_RATIO: f64 = 0.5;

/// Picks which word a learner practises next and when new words unlock.
pub struct WordScheduler {
    store: Arc<Store>,
    /// Source of "now" for recency weighting.
    clock: Arc<dyn Clock>,
    /// Standard deviation of the noise added to word priorities.
    temperature: f64,
}

impl WordScheduler {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, config: &SchedulerConfig) -> Self {
        Self {
            store,
            clock,
            temperature: config.temperature,
        }
    }

    /// Returns the learner's current language and level in it.
    fn learner_position(&self, learner_id: &str) -> AppResult<(Language, Level)> {
        let learner = self
            .store
            .learners
            .get(learner_id)
            .ok_or_else(|| AppError::not_found("learner", learner_id))?;
        let language = learner.learning_language;
        let level = learner.current_level(language).ok_or_else(|| {
            AppError::not_found("language progress", format!("{learner_id}/{language}"))
        })?;
        Ok((language, level))
    }

    fn learner_words(&self, learner_id: &str, language: Language) -> Vec<LearnerWord> {
        self.store
            .learner_words
            .find(|w| w.learner_id == learner_id && w.language == language)
    }

    /// Advances the learner's word progression by at most one step.
    ///
    /// 1. With no locked words, stop at the top level; below it assign a
    ///    fresh word of the current level (locked), or level up once the
    ///    level is exhausted.
    /// 2. With no unlocked words, unlock the oldest locked one.
    /// 3. Otherwise unlock one more word if most unlocked words are failing.
    pub fn check_unlock_progress(&self, learner_id: &str) -> AppResult<UnlockStatus> {
        let (language, level) = self.learner_position(learner_id)?;
        let now = self.clock.now_ms();

        let (mut locked, unlocked): (Vec<LearnerWord>, Vec<LearnerWord>) = self
            .learner_words(learner_id, language)
            .into_iter()
            .partition(|w| w.is_locked);

        if locked.is_empty() {
            if level == Level::MAX {
                return Ok(UnlockStatus::MaxLevel);
            }
            let owned: HashSet<&str> = unlocked.iter().map(|w| w.word_id.as_str()).collect();
            let fresh = self.store.words.find(|w| {
                w.language == language && w.level == level && !owned.contains(w.id.as_str())
            });

            let Some(pick) = fresh.choose(&mut rand::thread_rng()) else {
                return self.level_up(learner_id, language, level);
            };

            let assigned = LearnerWord::new_locked(learner_id, &pick.id, language, now);
            let key = assigned.key();
            match self.store.learner_words.insert_new(key.clone(), assigned) {
                Ok(()) => {
                    tracing::debug!(
                        "Assigned word {} ({}) to learner {}",
                        pick.value,
                        pick.id,
                        learner_id
                    );
                }
                Err(StoreError::AlreadyExists { .. }) => {
                    tracing::debug!("Word {} was assigned to {} concurrently", pick.id, learner_id);
                }
                Err(e) => return Err(e.into()),
            }

            if let Some(current) = self.store.learner_words.get(&key)
                && current.is_locked
            {
                locked.push(current);
            }
        }

        if unlocked.is_empty() {
            return match self.unlock_oldest(&mut locked, now)? {
                Some(word_id) => {
                    tracing::info!("First unlock for learner {}: {}", learner_id, word_id);
                    Ok(UnlockStatus::FirstUnlock { word_id })
                }
                None => Ok(UnlockStatus::NoChange),
            };
        }

        let struggling = unlocked
            .iter()
            .filter(|w| {
                w.latest_score()
                    .is_some_and(|score| f64::from(score) < STRUGGLING_SCORE)
            })
            .count();
        let ratio = struggling as f64 / unlocked.len() as f64;

        if ratio > SUPPORT_UNLOCK_RATIO
            && let Some(word_id) = self.unlock_oldest(&mut locked, now)?
        {
            tracing::info!(
                "Support unlock for learner {} ({}/{} struggling): {}",
                learner_id,
                struggling,
                unlocked.len(),
                word_id
            );
            return Ok(UnlockStatus::SupportUnlock { word_id });
        }

        Ok(UnlockStatus::NoChange)
    }

    /// Unlocks the longest-assigned locked word. Words another request
    /// unlocked in the meantime are skipped.
    fn unlock_oldest(&self, locked: &mut [LearnerWord], now: u64) -> AppResult<Option<String>> {
        locked.sort_by(|a, b| {
            a.assigned_at_ms
                .cmp(&b.assigned_at_ms)
                .then_with(|| a.word_id.cmp(&b.word_id))
        });

        for word in locked.iter() {
            let result = self
                .store
                .learner_words
                .update(&word.key(), |w| -> AppResult<bool> { Ok(w.unlock(now)) });

            match result {
                Ok(true) => return Ok(Some(word.word_id.clone())),
                Ok(false) => continue,
                Err(AppError::Store(StoreError::NotFound { .. })) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    fn level_up(&self, learner_id: &str, language: Language, from: Level) -> AppResult<UnlockStatus> {
        let Some(to) = from.next() else {
            return Ok(UnlockStatus::MaxLevel);
        };

        self.store
            .learners
            .update(learner_id, |learner| -> AppResult<()> {
                let progress = learner.progress.entry(language).or_default();
                // Someone else may have levelled up already.
                if progress.current_level == from {
                    progress.current_level = to;
                }
                Ok(())
            })
            .map_err(|e| e.store_miss_as("learner", learner_id))?;

        tracing::info!(
            "Learner {} levelled up in {}: {} -> {}",
            learner_id,
            language,
            from,
            to
        );
        Ok(UnlockStatus::LevelUp { from, to })
    }

    /// Runs the unlock state machine, then picks a word among the unlocked
    /// ones. Any failure surfaces as `NoWordAvailable`.
    pub fn get_next_word(&self, learner_id: &str) -> AppResult<VocabularyWord> {
        match self.check_unlock_progress(learner_id) {
            Ok(status) => {
                tracing::debug!("Unlock check for {}: {:?}", learner_id, status);
            }
            Err(e) => {
                tracing::warn!("Unlock check failed for {}: {}", learner_id, e);
                return Err(AppError::NoWordAvailable);
            }
        }

        let (language, _) = self
            .learner_position(learner_id)
            .map_err(|_| AppError::NoWordAvailable)?;

        let candidates: Vec<WordCandidate> = self
            .learner_words(learner_id, language)
            .iter()
            .filter(|w| !w.is_locked && self.store.words.contains(&w.word_id))
            .map(WordCandidate::from)
            .collect();

        let word_id = select_next_word(
            &candidates,
            self.clock.now_ms(),
            self.temperature,
            &mut rand::thread_rng(),
        )
        .ok_or(AppError::NoWordAvailable)?;

        self.store
            .words
            .get(&word_id)
            .ok_or(AppError::NoWordAvailable)
    }

    /// Lists the learner's words in `language`, filtered by lock state.
    pub fn get_learner_words(
        &self,
        learner_id: &str,
        language: Language,
        locked: bool,
    ) -> AppResult<Vec<LearnerWordView>> {
        if !self.store.learners.contains(learner_id) {
            return Err(AppError::not_found("learner", learner_id));
        }

        let mut views: Vec<LearnerWordView> = self
            .learner_words(learner_id, language)
            .into_iter()
            .filter(|w| w.is_locked == locked)
            .filter_map(|w| {
                let word = self.store.words.get(&w.word_id)?;
                Some(LearnerWordView {
                    word_id: w.word_id,
                    value: word.value,
                    level: word.level,
                    is_locked: w.is_locked,
                    last_visited_times: w.last_visited_times.into_iter().collect(),
                    last_scores: w.last_scores.into_iter().collect(),
                })
            })
            .collect();

        views.sort_by(|a, b| a.value.cmp(&b.value));
        Ok(views)
    }

    /// Appends one practice result to a learner word's bounded history.
    pub fn record_practice(
        &self,
        learner_id: &str,
        word_id: &str,
        score: u8,
        capacity: usize,
    ) -> AppResult<()> {
        let now = self.clock.now_ms();
        self.store
            .learner_words
            .update(&learner_word_key(learner_id, word_id), |w| -> AppResult<()> {
                w.record_practice(now, score, capacity);
                Ok(())
            })
            .map_err(|e| e.store_miss_as("learner word", &learner_word_key(learner_id, word_id)))
    }
}

/// Picks the word to practise next.
///
/// Each candidate's priority is `(1 - score) * (1 + dt / max_dt) - 1`, where
/// `dt` is the time since its last visit (never visited counts as visited at
/// the epoch). Gaussian noise with standard deviation `temperature` is added to
/// every priority before taking the arg-max. When no candidate was ever
/// visited the pick is uniform.
pub fn select_next_word<R>(
    candidates: &[WordCandidate],
    now_ms: u64,
    temperature: f64,
    rng: &mut R,
) -> Option<String>
where
    R: Rng + ?Sized,
{
    if candidates.is_empty() {
        return None;
    }

    let elapsed: Vec<f64> = candidates
        .iter()
        .map(|c| now_ms.saturating_sub(c.last_visited_ms.unwrap_or(0)) as f64)
        .collect();
    let max_elapsed = elapsed.iter().copied().fold(0.0, f64::max);
    let never_visited = candidates.iter().all(|c| c.last_visited_ms.is_none());

    if never_visited || max_elapsed <= 0.0 {
        return candidates.choose(rng).map(|c| c.word_id.clone());
    }

    let priorities: Vec<f64> = candidates
        .iter()
        .zip(&elapsed)
        .map(|(c, dt)| {
            let score = c.last_score.unwrap_or(0.0).clamp(0.0, 1.0);
            (1.0 - score) * (1.0 + dt / max_elapsed) - 1.0
        })
        .collect();

    let best = arg_max(&priorities);
    if temperature <= 0.0 {
        return Some(candidates[best].word_id.clone());
    }

    let noisy: Vec<f64> = priorities
        .iter()
        .map(|p| p + temperature * standard_normal(rng))
        .collect();
    let winner = arg_max(&noisy);

    if winner != best {
        tracing::trace!(
            "Noise picked {} over {}",
            candidates[winner].word_id,
            candidates[best].word_id
        );
    }

    Some(candidates[winner].word_id.clone())
}

/// Index of the first maximum.
fn arg_max(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Box-Muller draw from N(0, 1).
fn standard_normal<R>(rng: &mut R) -> f64
where
    R: Rng + ?Sized,
{
    let u1: f64 = 1.0 - rng.r#gen::<f64>();
    let u2: f64 = rng.r#gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}
