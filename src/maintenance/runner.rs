use super::types::{MaintenanceReport, MaintenanceState};
use crate::clock::Clock;
use crate::config::MaintenanceConfig;
use crate::coordinator::ReplicaCoordinator;
use crate::error::{AppError, AppResult, StoreError};
use crate::generator::ContentGenerator;
use crate::language::Language;
use crate::storage::Store;
use crate::vocabulary::types::{Level, VocabularyWord, word_id_for};

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const MAX_WORD_CHARS: usize = 64;

/// Leader-only background upkeep of the shared vocabulary.
pub struct MaintenanceRunner {
    store: Arc<Store>,
    /// Source of starter words, level estimates and new words.
    generator: Arc<dyn ContentGenerator>,
    clock: Arc<dyn Clock>,
    /// Decides whether this replica may run a pass.
    coordinator: Arc<ReplicaCoordinator>,
    /// Languages maintained on every pass.
    languages: Vec<Language>,
    config: MaintenanceConfig,
}

impl MaintenanceRunner {
    pub fn new(
        store: Arc<Store>,
        generator: Arc<dyn ContentGenerator>,
        clock: Arc<dyn Clock>,
        coordinator: Arc<ReplicaCoordinator>,
        languages: Vec<Language>,
        config: MaintenanceConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            generator,
            clock,
            coordinator,
            languages,
            config,
        })
    }

    /// Runs a pass on every interval tick while this replica leads.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval());
        tracing::info!("Maintenance loop started (every {:?})", self.config.interval());

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    self.run_if_leader().await;
                }
            }
        }

        tracing::info!("Maintenance loop stopped");
    }

    /// Returns `None` without touching anything unless this replica leads.
    pub async fn run_if_leader(&self) -> Option<Vec<MaintenanceReport>> {
        if !self.coordinator.is_leader() {
            tracing::trace!("Not the leader, skipping maintenance");
            return None;
        }
        Some(self.run_pass().await)
    }

    pub async fn run_pass(&self) -> Vec<MaintenanceReport> {
        let mut reports = Vec::with_capacity(self.languages.len());

        for &language in &self.languages {
            match self.maintain_language(language).await {
                Ok(report) => {
                    tracing::info!(
                        "Maintenance for {}: {} populated, {} revised ({} changed), {} minted{}{}",
                        language,
                        report.populated,
                        report.revised,
                        report.relevelled,
                        report.minted,
                        if report.population_failed { ", population failed" } else { "" },
                        if report.revision_skipped { ", revision not due" } else { "" }
                    );
                    reports.push(report);
                }
                Err(e) => {
                    tracing::warn!("Maintenance for {} failed: {}", language, e);
                }
            }
        }

        reports
    }

    pub async fn maintain_language(&self, language: Language) -> AppResult<MaintenanceReport> {
        let mut report = MaintenanceReport::new(language);
        let state = self
            .store
            .maintenance
            .get(language.code())
            .unwrap_or_else(|| MaintenanceState::new(language));

        // A failed bootstrap is retried next pass; the existing words still
        // get revised and topped up in the meantime.
        if !state.vocabulary_populated {
            match self.populate_initial_vocabulary(language).await {
                Ok(inserted) => report.populated = inserted,
                Err(e) => {
                    tracing::warn!("Initial vocabulary for {} failed: {}", language, e);
                    report.population_failed = true;
                }
            }
        }

        let now = self.clock.now_ms();
        let interval_ms = self.config.revision_interval().as_millis() as u64;
        let due = state
            .last_revision_ms
            .is_none_or(|last| now.saturating_sub(last) >= interval_ms);
        if !due {
            report.revision_skipped = true;
            return Ok(report);
        }

        let (revised, relevelled) = self.revise_levels(language).await?;
        report.revised = revised;
        report.relevelled = relevelled;
        report.minted = self.mint_new_words(language).await?;

        self.store.maintenance.upsert_with(
            language.code(),
            || MaintenanceState::new(language),
            |state| -> AppResult<()> {
                state.last_revision_ms = Some(now);
                Ok(())
            },
        )?;

        Ok(report)
    }

    /// Loads the starter vocabulary once per language. The flag is only set
    /// once the language actually has words, so a failed bootstrap is retried
    /// on the next pass.
    pub async fn populate_initial_vocabulary(&self, language: Language) -> AppResult<usize> {
        let bootstrap = self
            .generator
            .bootstrap_vocabulary(language)
            .await
            .map_err(|e| AppError::Generation(format!("{e:#}")))?;

        let now = self.clock.now_ms();
        let mut inserted = 0;
        for (label, values) in &bootstrap {
            let Some(level) = Level::from_label(label) else {
                tracing::warn!("Ignoring bootstrap words for unknown level {:?}", label);
                continue;
            };
            for value in values {
                if self.insert_word(language, value, level, now)? {
                    inserted += 1;
                }
            }
        }

        let has_words = !self
            .store
            .words
            .find(|w| w.language == language)
            .is_empty();
        if has_words {
            self.store.maintenance.upsert_with(
                language.code(),
                || MaintenanceState::new(language),
                |state| -> AppResult<()> {
                    state.vocabulary_populated = true;
                    Ok(())
                },
            )?;
            tracing::info!("Populated {} starter words for {}", inserted, language);
        } else {
            tracing::warn!("Bootstrap for {} produced no usable words", language);
        }

        Ok(inserted)
    }

    /// Re-estimates the level of the least recently revised words.
    /// Returns (revised, changed).
    pub async fn revise_levels(&self, language: Language) -> AppResult<(usize, usize)> {
        let mut words = self.store.words.find(|w| w.language == language);
        words.sort_by(|a, b| {
            a.level_revised_at_ms
                .unwrap_or(0)
                .cmp(&b.level_revised_at_ms.unwrap_or(0))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut revised = 0;
        let mut changed = 0;
        for word in words.into_iter().take(self.config.revision_batch) {
            let estimate = match self
                .generator
                .estimate_word_level(&word.value, language)
                .await
            {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Level estimate for {:?} failed: {:#}", word.value, e);
                    continue;
                }
            };
            let Ok(level) = Level::try_from(estimate) else {
                tracing::warn!("Level estimate {} for {:?} out of range", estimate, word.value);
                continue;
            };

            let now = self.clock.now_ms();
            let result = self.store.words.update(&word.id, |w| -> AppResult<bool> {
                w.level_revised_at_ms = Some(now);
                let moved = w.level != level;
                w.level = level;
                Ok(moved)
            });
            match result {
                Ok(moved) => {
                    revised += 1;
                    if moved {
                        changed += 1;
                        tracing::debug!(
                            "Word {:?} moved {} -> {}",
                            word.value,
                            word.level,
                            level
                        );
                    }
                }
                Err(AppError::Store(StoreError::NotFound { .. })) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok((revised, changed))
    }

    /// Asks the generator for words the language does not have yet.
    pub async fn mint_new_words(&self, language: Language) -> AppResult<usize> {
        let mut existing: Vec<String> = self
            .store
            .words
            .find(|w| w.language == language)
            .into_iter()
            .map(|w| w.value)
            .collect();

        let mut minted = 0;
        for _ in 0..self.config.new_words_per_pass {
            let suggestion = match self.generator.suggest_new_word(language, &existing).await {
                Ok(word) => word.trim().to_string(),
                Err(e) => {
                    tracing::warn!("New word suggestion for {} failed: {:#}", language, e);
                    break;
                }
            };

            if !is_plausible_word(&suggestion) {
                tracing::warn!("Rejected suggested word {:?}", suggestion);
                continue;
            }
            if self.store.words.contains(&word_id_for(language, &suggestion)) {
                tracing::debug!("Suggested word {:?} already known", suggestion);
                continue;
            }

            let level = match self
                .generator
                .estimate_word_level(&suggestion, language)
                .await
                .map_err(|e| e.to_string())
                .and_then(|raw| Level::try_from(raw).map_err(|e| e.to_string()))
            {
                Ok(level) => level,
                Err(reason) => {
                    tracing::warn!("No level for suggested word {:?}: {}", suggestion, reason);
                    continue;
                }
            };

            if self.insert_word(language, &suggestion, level, self.clock.now_ms())? {
                tracing::info!("Minted {} word {:?} at {}", language, suggestion, level);
                existing.push(suggestion);
                minted += 1;
            }
        }

        Ok(minted)
    }

    /// Inserts a word unless it already exists. Returns whether it was new.
    fn insert_word(&self, language: Language, value: &str, level: Level, now_ms: u64) -> AppResult<bool> {
        if !is_plausible_word(value) {
            tracing::debug!("Skipping implausible word {:?}", value);
            return Ok(false);
        }

        let word = VocabularyWord::new(language, value, level, now_ms);
        match self.store.words.insert_new(word.id.clone(), word) {
            Ok(()) => Ok(true),
            Err(StoreError::AlreadyExists { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_plausible_word(value: &str) -> bool {
    let value = value.trim();
    let chars = value.chars().count();
    chars > 0
        && chars <= MAX_WORD_CHARS
        && !value.contains('\n')
        && value.chars().any(char::is_alphabetic)
}
