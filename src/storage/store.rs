use super::collection::Collection;
use crate::coordinator::types::ReplicaRecord;
use crate::exercise::types::{Exercise, ExerciseVariantSet, ThumbVote, VoteTally};
use crate::learner::types::Learner;
use crate::maintenance::types::MaintenanceState;
use crate::vocabulary::types::{LearnerWord, VocabularyWord};

use std::sync::Arc;

/// Every collection the core reads and writes.
pub struct Store {
    pub learners: Collection<Learner>,
    pub words: Collection<VocabularyWord>,
    /// Keyed by `learner_id:word_id`.
    pub learner_words: Collection<LearnerWord>,
    pub exercises: Collection<Exercise>,
    /// Keyed by `VariantKey`.
    pub variant_sets: Collection<ExerciseVariantSet>,
    /// Keyed by `learner_id:exercise_id`; one document per vote.
    pub votes: Collection<ThumbVote>,
    pub vote_tallies: Collection<VoteTally>,
    pub replicas: Collection<ReplicaRecord>,
    /// Per-language settings flags, keyed by language code.
    pub maintenance: Collection<MaintenanceState>,
}

impl Store {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self {
            learners: Collection::new("learners"),
            words: Collection::new("vocabulary_words"),
            learner_words: Collection::new("learner_words"),
            exercises: Collection::new("exercises"),
            variant_sets: Collection::new("exercise_variant_sets"),
            votes: Collection::new("thumb_votes"),
            vote_tallies: Collection::new("vote_tallies"),
            replicas: Collection::new("replicas"),
            maintenance: Collection::new("maintenance"),
        }
    }
}
