use super::types::{ThumbVote, VoteOutcome, VoteTally, vote_key};
use crate::clock::Clock;
use crate::error::{AppError, AppResult, StoreError};
use crate::storage::Store;

use std::sync::Arc;

/// Thumbs up/down on exercises. The vote document is written first; only the
/// writer that created it bumps the tally, so a learner counts once.
pub struct VoteService {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
}

impl VoteService {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn vote_exercise(
        &self,
        learner_id: &str,
        exercise_id: &str,
        is_positive: bool,
    ) -> AppResult<VoteOutcome> {
        if !self.store.learners.contains(learner_id) {
            return Err(AppError::not_found("learner", learner_id));
        }
        if !self.store.exercises.contains(exercise_id) {
            return Err(AppError::not_found("exercise", exercise_id));
        }

        let vote = ThumbVote {
            learner_id: learner_id.to_string(),
            exercise_id: exercise_id.to_string(),
            is_positive,
            voted_at_ms: self.clock.now_ms(),
        };
        match self
            .store
            .votes
            .insert_new(vote_key(learner_id, exercise_id), vote)
        {
            Ok(()) => {}
            Err(StoreError::AlreadyExists { .. }) => {
                tracing::debug!("{} already voted on {}", learner_id, exercise_id);
                return Ok(VoteOutcome::AlreadyVoted);
            }
            Err(e) => return Err(e.into()),
        }

        let tally = self.store.vote_tallies.upsert_with(
            exercise_id,
            VoteTally::default,
            |tally| -> AppResult<VoteTally> {
                if is_positive {
                    tally.up += 1;
                } else {
                    tally.down += 1;
                }
                Ok(*tally)
            },
        )?;

        tracing::debug!(
            "Vote on {} by {}: {} (now {} up / {} down)",
            exercise_id,
            learner_id,
            if is_positive { "up" } else { "down" },
            tally.up,
            tally.down
        );
        Ok(VoteOutcome::Recorded { tally })
    }

    pub fn tally(&self, exercise_id: &str) -> VoteTally {
        self.store.vote_tallies.get(exercise_id).unwrap_or_default()
    }
}
