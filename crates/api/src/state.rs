use std::sync::Arc;

use gallery_cloud::ObjectStore;
use gallery_core::identity::JobIdentity;
use gallery_db::MediaStore;
use gallery_gateway::GenerationGateway;
use gallery_pipeline::{HistoryView, JobReconciler, Orchestrator, ReconcilerConfig};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn MediaStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub reconciler: Arc<JobReconciler>,
    pub orchestrator: Arc<Orchestrator>,
    pub history: Arc<HistoryView>,
}

impl AppState {
    /// Wire the pipeline over the given backends.
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn MediaStore>,
        objects: Arc<dyn ObjectStore>,
        gateway: Arc<dyn GenerationGateway>,
        identity: Arc<dyn JobIdentity>,
    ) -> Self {
        let reconciler = JobReconciler::new(
            Arc::clone(&store),
            Arc::clone(&objects),
            Arc::clone(&gateway),
            identity,
            ReconcilerConfig {
                poll_interval: config.poll_interval,
                retention: config.tracked_retention,
            },
        );
        let orchestrator = Orchestrator::new(
            Arc::clone(&store),
            Arc::clone(&objects),
            gateway,
            Arc::clone(&reconciler),
            config.gateway.video_model_id.clone(),
        );
        let history = HistoryView::new(Arc::clone(&store), Arc::clone(&reconciler));

        Self {
            config: Arc::new(config),
            store,
            objects,
            reconciler,
            orchestrator: Arc::new(orchestrator),
            history: Arc::new(history),
        }
    }
}
