use super::types::{LanguageProgress, Learner};
use crate::clock::Clock;
use crate::config::LearningConfig;
use crate::error::{AppError, AppResult, StoreError};
use crate::language::Language;
use crate::storage::Store;

use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
}

pub struct LearnerService {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    config: LearningConfig,
}

impl LearnerService {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, config: LearningConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn supported_languages(&self) -> Vec<LanguageInfo> {
        self.config
            .supported_languages
            .iter()
            .map(|lang| LanguageInfo {
                code: lang.code(),
                name: lang.display_name(),
            })
            .collect()
    }

    fn ensure_supported(&self, language: Language) -> AppResult<()> {
        if self.config.supported_languages.contains(&language) {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "language {} is not offered",
                language.code()
            )))
        }
    }

    /// Creates the learner on first visit, or adds `language` to an existing
    /// learner's progress. Returns the learner as stored.
    pub fn create_if_needed(&self, learner_id: &str, language: Language) -> AppResult<Learner> {
        if learner_id.trim().is_empty() {
            return Err(AppError::validation("learner id must not be empty"));
        }
        self.ensure_supported(language)?;

        let now = self.clock.now_ms();
        match self
            .store
            .learners
            .insert_new(learner_id, Learner::new(learner_id, language, now))
        {
            Ok(()) => {
                tracing::info!("Created learner {} learning {}", learner_id, language);
            }
            Err(StoreError::AlreadyExists { .. }) => {
                self.store.learners.update(learner_id, |learner| -> AppResult<()> {
                    learner.progress.entry(language).or_default();
                    Ok(())
                })?;
            }
            Err(e) => return Err(e.into()),
        }

        self.get(learner_id)
    }

    pub fn get(&self, learner_id: &str) -> AppResult<Learner> {
        self.store
            .learners
            .get(learner_id)
            .ok_or_else(|| AppError::not_found("learner", learner_id))
    }

    pub fn set_learning_language(&self, learner_id: &str, language: Language) -> AppResult<Learner> {
        self.ensure_supported(language)?;

        self.store
            .learners
            .update(learner_id, |learner| -> AppResult<()> {
                learner.learning_language = language;
                learner
                    .progress
                    .entry(language)
                    .or_insert_with(LanguageProgress::default);
                Ok(())
            })
            .map_err(|e| e.store_miss_as("learner", learner_id))?;

        tracing::info!("Learner {} now learning {}", learner_id, language);
        self.get(learner_id)
    }

    pub fn set_ui_language(&self, learner_id: &str, language: Language) -> AppResult<Learner> {
        self.ensure_supported(language)?;

        self.store
            .learners
            .update(learner_id, |learner| -> AppResult<()> {
                learner.ui_language = language;
                Ok(())
            })
            .map_err(|e| e.store_miss_as("learner", learner_id))?;

        tracing::info!("Learner {} now sees the app in {}", learner_id, language);
        self.get(learner_id)
    }
}
