//! Maintenance Module Tests
//!
//! ## Test Scopes
//! - **Leader gating**: followers never touch the vocabulary.
//! - **Population**: once per language, retried after failure without
//!   holding up revision.
//! - **Revision**: batch order, out-of-range estimates, revision interval.
//! - **Minting**: duplicates and implausible words are skipped.

#[cfg(test)]
mod tests {
    use crate::clock::ManualClock;
    use crate::config::{CoordinatorConfig, MaintenanceConfig};
    use crate::coordinator::{ReplicaCoordinator, ReplicaId};
    use crate::generator::fake::FakeContentGenerator;
    use crate::language::Language;
    use crate::maintenance::runner::MaintenanceRunner;
    use crate::storage::Store;
    use crate::vocabulary::types::{Level, VocabularyWord, word_id_for};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct Fixture {
        store: Arc<Store>,
        clock: Arc<ManualClock>,
        generator: Arc<FakeContentGenerator>,
        coordinator: Arc<ReplicaCoordinator>,
        runner: Arc<MaintenanceRunner>,
    }

    fn fixture() -> Fixture {
        let store = Store::new();
        let clock = Arc::new(ManualClock::new(0));
        let generator = Arc::new(FakeContentGenerator::new());
        let coordinator = ReplicaCoordinator::new(
            store.clone(),
            clock.clone(),
            ReplicaId::from("r1"),
            CoordinatorConfig::default(),
        );
        let runner = MaintenanceRunner::new(
            store.clone(),
            generator.clone(),
            clock.clone(),
            coordinator.clone(),
            vec![Language::Es],
            MaintenanceConfig {
                interval_secs: 60,
                revision_interval_secs: 3_600,
                revision_batch: 2,
                new_words_per_pass: 3,
            },
        );
        Fixture {
            store,
            clock,
            generator,
            coordinator,
            runner,
        }
    }

    impl Fixture {
        fn become_leader(&self) {
            self.coordinator.register();
            self.clock.advance(Duration::from_secs(20));
            self.coordinator.tick().unwrap();
            assert!(self.coordinator.is_leader());
        }

        fn bootstrap(&self) {
            let mut words = HashMap::new();
            words.insert("A1".to_string(), vec!["casa".to_string(), "perro".to_string()]);
            words.insert("1".to_string(), vec!["aunque".to_string()]);
            words.insert("C2".to_string(), vec!["ignorado".to_string()]);
            self.generator.set_bootstrap(words);
        }

        fn level_of(&self, value: &str) -> Level {
            self.store
                .words
                .get(&word_id_for(Language::Es, value))
                .unwrap()
                .level
        }
    }

    // ============================================================
    // LEADER GATING
    // ============================================================

    #[tokio::test]
    async fn test_follower_does_nothing() {
        let fx = fixture();
        fx.bootstrap();

        assert!(fx.runner.run_if_leader().await.is_none());
        assert_eq!(fx.generator.bootstrap_calls.load(Ordering::SeqCst), 0);
        assert!(fx.store.words.is_empty());
    }

    #[tokio::test]
    async fn test_leader_runs_full_pass() {
        let fx = fixture();
        fx.bootstrap();
        fx.become_leader();

        let reports = fx.runner.run_if_leader().await.unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].populated, 3);
        let state = fx.store.maintenance.get("es").unwrap();
        assert!(state.vocabulary_populated);
        assert!(state.last_revision_ms.is_some());
    }

    // ============================================================
    // POPULATION
    // ============================================================

    #[tokio::test]
    async fn test_population_runs_once() {
        let fx = fixture();
        fx.bootstrap();

        let inserted = fx
            .runner
            .populate_initial_vocabulary(Language::Es)
            .await
            .unwrap();
        fx.runner.maintain_language(Language::Es).await.unwrap();
        fx.runner.maintain_language(Language::Es).await.unwrap();

        assert_eq!(inserted, 3);
        assert_eq!(fx.generator.bootstrap_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.level_of("casa"), Level::A1);
        assert_eq!(fx.level_of("aunque"), Level::A2);
        assert!(!fx.store.words.contains(&word_id_for(Language::Es, "ignorado")));
    }

    #[tokio::test]
    async fn test_failed_population_is_retried() {
        let fx = fixture();

        let first = fx.runner.maintain_language(Language::Es).await.unwrap();
        assert!(first.population_failed);
        assert!(!fx.store.maintenance.get("es").unwrap().vocabulary_populated);

        fx.bootstrap();
        let report = fx.runner.maintain_language(Language::Es).await.unwrap();

        assert!(!report.population_failed);
        assert_eq!(report.populated, 3);
        assert!(fx.store.maintenance.get("es").unwrap().vocabulary_populated);
        assert_eq!(fx.generator.bootstrap_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_population_does_not_block_revision_or_minting() {
        let fx = fixture();
        let word = VocabularyWord::new(Language::Es, "uno", Level::A1, 0);
        fx.store.words.put(word.id.clone(), word);
        fx.generator.set_level("uno", 2);
        fx.generator.push_new_word("gato");
        fx.generator.set_level("gato", 0);

        let report = fx.runner.maintain_language(Language::Es).await.unwrap();

        assert!(report.population_failed);
        assert_eq!((report.revised, report.relevelled), (1, 1));
        assert_eq!(report.minted, 1);
        assert_eq!(fx.level_of("uno"), Level::B1);
        assert_eq!(fx.level_of("gato"), Level::A1);
        assert_eq!(fx.store.maintenance.get("es").unwrap().last_revision_ms, Some(0));
    }

    // ============================================================
    // REVISION
    // ============================================================

    #[tokio::test]
    async fn test_revision_updates_oldest_batch() {
        let fx = fixture();
        for (value, revised_at) in [("uno", Some(50)), ("dos", None), ("tres", Some(10))] {
            let mut word = VocabularyWord::new(Language::Es, value, Level::A1, 0);
            word.level_revised_at_ms = revised_at;
            fx.store.words.put(word.id.clone(), word);
        }
        fx.generator.set_level("dos", 2);
        fx.generator.set_level("tres", 0);
        fx.generator.set_level("uno", 1);

        let (revised, changed) = fx.runner.revise_levels(Language::Es).await.unwrap();

        // Batch of two: never revised first, then the oldest revision.
        assert_eq!((revised, changed), (2, 1));
        assert_eq!(fx.level_of("dos"), Level::B1);
        assert_eq!(fx.level_of("tres"), Level::A1);
        assert_eq!(fx.level_of("uno"), Level::A1);
    }

    #[tokio::test]
    async fn test_out_of_range_estimate_is_ignored() {
        let fx = fixture();
        let word = VocabularyWord::new(Language::Es, "raro", Level::A2, 0);
        fx.store.words.put(word.id.clone(), word);
        fx.generator.set_level("raro", 7);

        let (revised, _) = fx.runner.revise_levels(Language::Es).await.unwrap();

        assert_eq!(revised, 0);
        assert_eq!(fx.level_of("raro"), Level::A2);
    }

    #[tokio::test]
    async fn test_revision_waits_for_interval() {
        let fx = fixture();
        fx.bootstrap();

        let first = fx.runner.maintain_language(Language::Es).await.unwrap();
        fx.clock.advance(Duration::from_secs(60));
        let second = fx.runner.maintain_language(Language::Es).await.unwrap();
        fx.clock.advance(Duration::from_secs(3_600));
        let third = fx.runner.maintain_language(Language::Es).await.unwrap();

        assert!(!first.revision_skipped);
        assert!(second.revision_skipped);
        assert!(!third.revision_skipped);
    }

    // ============================================================
    // MINTING
    // ============================================================

    #[tokio::test]
    async fn test_minting_skips_duplicates_and_junk() {
        let fx = fixture();
        let known = VocabularyWord::new(Language::Es, "casa", Level::A1, 0);
        fx.store.words.put(known.id.clone(), known);
        fx.generator.push_new_word("Casa");
        fx.generator.push_new_word("!!!");
        fx.generator.push_new_word(" ventana ");
        fx.generator.set_level("ventana", 1);

        let minted = fx.runner.mint_new_words(Language::Es).await.unwrap();

        assert_eq!(minted, 1);
        assert_eq!(fx.level_of("ventana"), Level::A2);
        assert_eq!(fx.store.words.len(), 2);
    }

    #[tokio::test]
    async fn test_minting_needs_a_level() {
        let fx = fixture();
        fx.generator.push_new_word("ventana");

        let minted = fx.runner.mint_new_words(Language::Es).await.unwrap();

        assert_eq!(minted, 0);
        assert!(fx.store.words.is_empty());
    }
}
