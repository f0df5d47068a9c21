//! Process-wide wiring.
//!
//! `AppContext` is built once at startup and handed to the HTTP layer by
//! `Arc`. It owns every service plus the root cancellation token that stops
//! the background loops.

use crate::answer::AnswerValidator;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::coordinator::{ReplicaCoordinator, ReplicaId};
use crate::exercise::{ExerciseCache, VoteService};
use crate::generator::ContentGenerator;
use crate::learner::LearnerService;
use crate::maintenance::MaintenanceRunner;
use crate::pipeline::ExerciseCreationPipeline;
use crate::storage::Store;
use crate::vocabulary::WordScheduler;

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct AppContext {
    pub config: AppConfig,
    pub store: Arc<Store>,
    pub generator: Arc<dyn ContentGenerator>,
    pub clock: Arc<dyn Clock>,
    pub learners: LearnerService,
    pub scheduler: Arc<WordScheduler>,
    pub cache: Arc<ExerciseCache>,
    pub votes: VoteService,
    pub pipeline: Arc<ExerciseCreationPipeline>,
    pub coordinator: Arc<ReplicaCoordinator>,
    pub maintenance: Arc<MaintenanceRunner>,
    pub validator: AnswerValidator,
    pub shutdown_token: CancellationToken,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        store: Arc<Store>,
        generator: Arc<dyn ContentGenerator>,
        clock: Arc<dyn Clock>,
        replica_id: ReplicaId,
    ) -> Arc<Self> {
        let learners = LearnerService::new(store.clone(), clock.clone(), config.learning.clone());
        let scheduler = Arc::new(WordScheduler::new(
            store.clone(),
            clock.clone(),
            &config.scheduler,
        ));
        let cache = Arc::new(ExerciseCache::new(
            store.clone(),
            generator.clone(),
            clock.clone(),
            config.cache.clone(),
        ));
        let votes = VoteService::new(store.clone(), clock.clone());
        let pipeline = ExerciseCreationPipeline::new(
            store.clone(),
            clock.clone(),
            scheduler.clone(),
            cache.clone(),
            config.pipeline.clone(),
        );
        let coordinator = ReplicaCoordinator::new(
            store.clone(),
            clock.clone(),
            replica_id,
            config.coordinator.clone(),
        );
        let maintenance = MaintenanceRunner::new(
            store.clone(),
            generator.clone(),
            clock.clone(),
            coordinator.clone(),
            config.learning.supported_languages.clone(),
            config.maintenance.clone(),
        );
        let validator = AnswerValidator::new(
            store.clone(),
            clock.clone(),
            scheduler.clone(),
            &config.learning,
            &config.scheduler,
        );

        Arc::new(Self {
            config,
            store,
            generator,
            clock,
            learners,
            scheduler,
            cache,
            votes,
            pipeline,
            coordinator,
            maintenance,
            validator,
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Registers this replica and spawns the pipeline workers, the heartbeat
    /// loop and the maintenance loop. All of them stop on `shutdown`.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        self.coordinator.register();

        let mut handles = self.pipeline.start(self.shutdown_token.child_token());
        handles.push(tokio::spawn(
            self.coordinator.clone().run(self.shutdown_token.child_token()),
        ));
        handles.push(tokio::spawn(
            self.maintenance.clone().run(self.shutdown_token.child_token()),
        ));

        tracing::info!(
            "Replica {} started {} background tasks",
            self.coordinator.local_id(),
            handles.len()
        );
        handles
    }

    /// Cancels the background loops and waits for them to finish.
    pub async fn shutdown(&self, handles: Vec<JoinHandle<()>>) {
        self.shutdown_token.cancel();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("Background task ended abnormally: {}", e);
            }
        }
        // The heartbeat loop deregisters on exit; repeat in case it never ran.
        self.coordinator.deregister();
        tracing::info!("Replica {} stopped", self.coordinator.local_id());
    }
}
