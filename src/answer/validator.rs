use super::types::{AnswerOutcome, AnswerStatus, RejectReason};
use crate::clock::Clock;
use crate::config::{LearningConfig, SchedulerConfig};
use crate::error::{AppError, AppResult};
use crate::learner::types::ExercisePointer;
use crate::storage::Store;
use crate::vocabulary::WordScheduler;

use std::collections::HashSet;
use std::sync::Arc;

/// Scores submitted answers and records them in the learner's word history.
pub struct AnswerValidator {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    /// Consulted after each answer for support unlocks.
    scheduler: Arc<WordScheduler>,
    /// XP awarded for a correct answer.
    xp_per_correct: u64,
    /// Maximum score/visit entries kept per learner word.
    history_capacity: usize,
}

impl AnswerValidator {
    pub fn new(
        store: Arc<Store>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<WordScheduler>,
        learning: &LearningConfig,
        scheduling: &SchedulerConfig,
    ) -> Self {
        Self {
            store,
            clock,
            scheduler,
            xp_per_correct: learning.xp_per_correct,
            history_capacity: scheduling.history_capacity,
        }
    }

    /// Scores `answer` against the exercise currently issued to the learner.
    ///
    /// Rejections are returned as outcomes; only a missing learner or exercise
    /// is an error.
    pub fn submit_answer(
        &self,
        learner_id: &str,
        exercise_id: &str,
        answer: &str,
    ) -> AppResult<AnswerOutcome> {
        let exercise_id = exercise_id.trim();
        let learner = self
            .store
            .learners
            .get(learner_id)
            .ok_or_else(|| AppError::not_found("learner", learner_id))?;

        // Anything but the issued exercise is a mismatch, well-formed or not.
        if let Some(reason) = pointer_rejection(&learner.exercise, exercise_id) {
            return Ok(rejection_for(reason));
        }
        if uuid::Uuid::parse_str(exercise_id).is_err() {
            return Ok(rejection_for(RejectReason::MalformedExerciseId));
        }

        let Some(choice) = parse_answer(answer) else {
            return Ok(AnswerOutcome::rejected(
                RejectReason::MalformedAnswer,
                "Answers are an option number or letter.",
            ));
        };

        let exercise = self
            .store
            .exercises
            .get(exercise_id)
            .ok_or_else(|| AppError::not_found("exercise", exercise_id))?;
        if choice >= exercise.content.options.len() {
            return Ok(AnswerOutcome::rejected(
                RejectReason::MalformedAnswer,
                format!("Choose one of the {} options.", exercise.content.options.len()),
            ));
        }

        let correct = choice == exercise.content.correct_index;
        let xp_awarded = if correct { self.xp_per_correct } else { 0 };
        let now = self.clock.now_ms();

        // Marking the pointer answered and awarding XP is one update, so a
        // replayed request can never score twice.
        let raced = self
            .store
            .learners
            .update(learner_id, |learner| -> AppResult<Option<RejectReason>> {
                if let Some(reason) = pointer_rejection(&learner.exercise, exercise_id) {
                    return Ok(Some(reason));
                }
                if let ExercisePointer::Ready { answered_at_ms, .. } = &mut learner.exercise {
                    *answered_at_ms = Some(now);
                }
                learner.xp += xp_awarded;
                Ok(None)
            })
            .map_err(|e| e.store_miss_as("learner", learner_id))?;
        if let Some(reason) = raced {
            return Ok(rejection_for(reason));
        }

        let score = u8::from(correct);
        let mut seen = HashSet::new();
        for word_id in &exercise.word_ids {
            if !seen.insert(word_id.as_str()) {
                continue;
            }
            if let Err(e) =
                self.scheduler
                    .record_practice(learner_id, word_id, score, self.history_capacity)
            {
                tracing::warn!(
                    "Could not record practice of {} for {}: {}",
                    word_id,
                    learner_id,
                    e
                );
            }
        }

        let correct_option = exercise.correct_option().unwrap_or_default().to_string();
        let message = if correct {
            "Correct!".to_string()
        } else {
            format!("Not quite. The correct answer was {correct_option}.")
        };

        tracing::info!(
            "Learner {} answered {}: {}",
            learner_id,
            exercise_id,
            if correct { "correct" } else { "incorrect" }
        );

        Ok(AnswerOutcome {
            status: AnswerStatus::Accepted,
            message,
            correct,
            correct_option: Some(correct_option),
            xp_awarded,
        })
    }
}

fn pointer_rejection(pointer: &ExercisePointer, exercise_id: &str) -> Option<RejectReason> {
    match pointer {
        ExercisePointer::Ready {
            exercise_id: current,
            answered_at_ms,
            ..
        } if current == exercise_id => answered_at_ms.map(|_| RejectReason::AlreadyAnswered),
        _ => Some(RejectReason::Mismatch),
    }
}

fn rejection_for(reason: RejectReason) -> AnswerOutcome {
    let message = match reason {
        RejectReason::Mismatch => "This is not your current exercise.",
        RejectReason::AlreadyAnswered => "This exercise was already answered.",
        RejectReason::MalformedExerciseId => "That is not a valid exercise id.",
        RejectReason::MalformedAnswer => "Answers are an option number or letter.",
    };
    AnswerOutcome::rejected(reason, message)
}

/// Accepts a zero-based option number (`"2"`) or an option letter (`"c"`, `"C)"`).
pub fn parse_answer(answer: &str) -> Option<usize> {
    let answer = answer.trim();
    if !answer.is_empty() && answer.chars().all(|c| c.is_ascii_digit()) {
        return answer.parse().ok();
    }

    let letter = answer.trim_end_matches([')', '.']);
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Some((c.to_ascii_lowercase() as u8 - b'a') as usize)
        }
        _ => None,
    }
}
