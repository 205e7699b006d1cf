//! Background rendering of revision images.
//!
//! New revisions are pushed onto a bounded job queue. A single worker task
//! drains the queue and runs each job as its own detached task, so a slow
//! renderer never stalls the request path. At most `concurrency` jobs run at
//! once; the worker waits for a free slot before taking the next job, and
//! the queue absorbs the backlog. Every renderer call is bounded by a
//! timeout. Failures are logged and leave `rendered = false`, which the
//! start-up sweep picks up again.

pub mod renderer;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::blueprint::model::{BlueprintId, Revision, RevisionId};
use crate::content::{ContentStore, RenderedImages};
use crate::error::{CatalogError, CatalogResult};
use crate::events::bus::EventBus;
use crate::events::types::{CatalogEvent, RevisionEvent};
use crate::store::CatalogStore;

pub use renderer::{HttpRenderer, RenderMode, Renderer};

#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    pub queue_capacity: usize,
    /// Jobs rendering at the same time.
    pub concurrency: usize,
    pub timeout: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            concurrency: 4,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderJob {
    pub id: Uuid,
    pub blueprint_id: BlueprintId,
    pub revision_id: RevisionId,
    pub revision: i64,
    pub checksum: String,
    pub payload: String,
}

impl RenderJob {
    pub fn new(revision: &Revision, payload: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            blueprint_id: revision.blueprint_id,
            revision_id: revision.id,
            revision: revision.revision,
            checksum: revision.checksum.clone(),
            payload: payload.into(),
        }
    }
}

/// Handle for scheduling render jobs. Cheap to clone.
#[derive(Clone)]
pub struct RenderPipeline {
    sender: Option<mpsc::Sender<RenderJob>>,
    store: Arc<dyn CatalogStore>,
    content: ContentStore,
}

impl RenderPipeline {
    /// A pipeline that accepts jobs and drops them. Revisions stay unrendered.
    pub fn disabled(store: Arc<dyn CatalogStore>, content: ContentStore) -> Self {
        Self {
            sender: None,
            store,
            content,
        }
    }

    /// Start the worker on the current runtime.
    pub fn spawn(
        store: Arc<dyn CatalogStore>,
        content: ContentStore,
        renderer: Arc<dyn Renderer>,
        events: EventBus,
        config: RenderConfig,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let worker = RenderWorker {
            renderer,
            content: content.clone(),
            store: store.clone(),
            events,
            timeout: config.timeout,
        };
        let slots = Arc::new(Semaphore::new(config.concurrency.max(1)));
        let handle = tokio::spawn(worker.run(receiver, slots));
        let pipeline = Self {
            sender: Some(sender),
            store,
            content,
        };
        (pipeline, handle)
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queue a render for a freshly created revision. Never blocks; a full
    /// queue drops the job and leaves it to the sweep.
    pub fn schedule(&self, revision: &Revision, payload: &str) {
        let Some(sender) = &self.sender else {
            return;
        };
        let job = RenderJob::new(revision, payload);
        let job_id = job.id;
        match sender.try_send(job) {
            Ok(()) => tracing::debug!(%job_id, revision_id = revision.id, "render job queued"),
            Err(e) => tracing::warn!(
                revision_id = revision.id,
                error = %e,
                "render job dropped"
            ),
        }
    }

    /// Re-queue up to `limit` active revisions that have no images yet,
    /// reloading each payload from the content store. Returns how many were
    /// queued.
    pub async fn requeue_unrendered(&self, limit: i64) -> CatalogResult<usize> {
        let Some(sender) = &self.sender else {
            return Ok(0);
        };
        let pending = self.store.unrendered(limit).await?;
        let mut queued = 0;
        for revision in pending {
            let payload = match self.content.get_payload(revision.id).await {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(revision_id = revision.id, error = %e, "payload missing, not re-rendering");
                    continue;
                }
            };
            sender
                .send(RenderJob::new(&revision, payload))
                .await
                .map_err(|_| CatalogError::Storage("render queue closed".to_string()))?;
            queued += 1;
        }
        tracing::info!(queued, "unrendered revisions re-queued");
        Ok(queued)
    }
}

#[derive(Clone)]
struct RenderWorker {
    renderer: Arc<dyn Renderer>,
    content: ContentStore,
    store: Arc<dyn CatalogStore>,
    events: EventBus,
    timeout: Duration,
}

impl RenderWorker {
    async fn run(self, mut receiver: mpsc::Receiver<RenderJob>, slots: Arc<Semaphore>) {
        loop {
            // Take a slot first so a saturated renderer leaves jobs queued.
            let Ok(slot) = slots.clone().acquire_owned().await else {
                break;
            };
            let Some(job) = receiver.recv().await else {
                break;
            };
            let worker = self.clone();
            tokio::spawn(async move {
                let _slot = slot;
                let job_id = job.id;
                let revision_id = job.revision_id;
                if let Err(e) = worker.process(job).await {
                    tracing::warn!(%job_id, revision_id, error = %e, "render failed");
                }
            });
        }
        tracing::info!("render queue closed, worker exiting");
    }

    async fn render(&self, payload: &str, mode: RenderMode) -> CatalogResult<Vec<u8>> {
        tokio::time::timeout(self.timeout, self.renderer.render(payload, mode))
            .await
            .map_err(|_| {
                CatalogError::UpstreamUnavailable(format!(
                    "renderer timed out after {:?} ({mode})",
                    self.timeout
                ))
            })?
    }

    async fn process(&self, job: RenderJob) -> CatalogResult<()> {
        let images = RenderedImages {
            normal: self.render(&job.payload, RenderMode::Default).await?,
            square: self.render(&job.payload, RenderMode::Square).await?,
            thumbnail: self.render(&job.payload, RenderMode::Thumbnail).await?,
        };
        self.content.put_rendered_images(&job.checksum, images).await?;
        self.store.mark_rendered(job.revision_id).await?;

        tracing::info!(
            job_id = %job.id,
            blueprint_id = job.blueprint_id,
            revision_id = job.revision_id,
            digest = %job.checksum,
            "revision rendered"
        );
        self.events.emit(CatalogEvent::RevisionRendered(RevisionEvent {
            blueprint_id: job.blueprint_id,
            revision_id: job.revision_id,
            revision: job.revision,
            checksum: job.checksum,
            timestamp: Utc::now(),
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::model::{NewEntry, NewRevision};
    use crate::content::{ContentConfig, MemoryObjectStore, ObjectStore};
    use crate::store::{LedgerStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedRenderer;

    #[async_trait]
    impl Renderer for ScriptedRenderer {
        async fn render(&self, payload: &str, mode: RenderMode) -> CatalogResult<Vec<u8>> {
            Ok(format!("{mode}:{payload}").into_bytes())
        }
    }

    struct BrokenRenderer;

    #[async_trait]
    impl Renderer for BrokenRenderer {
        async fn render(&self, _payload: &str, _mode: RenderMode) -> CatalogResult<Vec<u8>> {
            Err(CatalogError::UpstreamUnavailable("renderer down".to_string()))
        }
    }

    struct StuckRenderer;

    #[async_trait]
    impl Renderer for StuckRenderer {
        async fn render(&self, _payload: &str, _mode: RenderMode) -> CatalogResult<Vec<u8>> {
            std::future::pending().await
        }
    }

    /// Records how many renders overlap.
    #[derive(Default)]
    struct CountingRenderer {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Renderer for CountingRenderer {
        async fn render(&self, _payload: &str, _mode: RenderMode) -> CatalogResult<Vec<u8>> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        objects: Arc<MemoryObjectStore>,
        content: ContentStore,
        revision: Revision,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let content = ContentStore::new(objects.clone(), ContentConfig::default());
        let (_, revision) = store
            .insert_entry(
                NewEntry {
                    user_id: 1,
                    name: "Smelter Array".to_string(),
                    description: String::new(),
                    tags: Vec::new(),
                },
                NewRevision {
                    changes: String::new(),
                    checksum: "d1".to_string(),
                    format_version: 0,
                },
            )
            .await
            .unwrap();
        content.put_payload(revision.id, "0payload").await.unwrap();
        Fixture {
            store,
            objects,
            content,
            revision,
        }
    }

    fn worker(f: &Fixture, renderer: Arc<dyn Renderer>, timeout: Duration) -> RenderWorker {
        RenderWorker {
            renderer,
            content: f.content.clone(),
            store: f.store.clone(),
            events: EventBus::new(8),
            timeout,
        }
    }

    #[tokio::test]
    async fn process_stores_images_and_marks_rendered() {
        let f = fixture().await;
        let worker = worker(&f, Arc::new(ScriptedRenderer), Duration::from_secs(5));
        worker.process(RenderJob::new(&f.revision, "0payload")).await.unwrap();

        assert!(f.store.revision(f.revision.id).await.unwrap().unwrap().rendered);
        assert_eq!(
            f.objects.get("blooper-renders", "d1-thumbnail.png").await.unwrap(),
            Some(b"thumbnail:0payload".to_vec())
        );
    }

    #[tokio::test]
    async fn renderer_failure_leaves_revision_unrendered() {
        let f = fixture().await;
        let worker = worker(&f, Arc::new(BrokenRenderer), Duration::from_secs(5));
        let result = worker.process(RenderJob::new(&f.revision, "0payload")).await;

        assert!(matches!(result, Err(CatalogError::UpstreamUnavailable(_))));
        assert!(!f.store.revision(f.revision.id).await.unwrap().unwrap().rendered);
    }

    #[tokio::test(start_paused = true)]
    async fn renderer_calls_time_out() {
        let f = fixture().await;
        let worker = worker(&f, Arc::new(StuckRenderer), Duration::from_secs(1));
        let result = worker.process(RenderJob::new(&f.revision, "0payload")).await;
        assert!(matches!(result, Err(CatalogError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn scheduled_job_emits_rendered_event() {
        let f = fixture().await;
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let (pipeline, _handle) = RenderPipeline::spawn(
            f.store.clone(),
            f.content.clone(),
            Arc::new(ScriptedRenderer),
            events,
            RenderConfig::default(),
        );
        pipeline.schedule(&f.revision, "0payload");

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, CatalogEvent::RevisionRendered(ref e) if e.revision_id == f.revision.id));
        assert!(f.store.revision(f.revision.id).await.unwrap().unwrap().rendered);
    }

    #[tokio::test]
    async fn sweep_requeues_unrendered_revisions() {
        let f = fixture().await;
        let events = EventBus::new(8);
        let mut rx = events.subscribe();
        let (pipeline, _handle) = RenderPipeline::spawn(
            f.store.clone(),
            f.content.clone(),
            Arc::new(ScriptedRenderer),
            events,
            RenderConfig::default(),
        );

        assert_eq!(pipeline.requeue_unrendered(100).await.unwrap(), 1);
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(f.store.unrendered(100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn disabled_pipeline_ignores_jobs() {
        let f = fixture().await;
        let pipeline = RenderPipeline::disabled(f.store.clone(), f.content.clone());
        assert!(!pipeline.is_enabled());
        pipeline.schedule(&f.revision, "0payload");
        assert_eq!(pipeline.requeue_unrendered(100).await.unwrap(), 0);
        assert!(!f.store.revision(f.revision.id).await.unwrap().unwrap().rendered);
    }

    #[tokio::test]
    async fn jobs_in_flight_never_exceed_concurrency() {
        let f = fixture().await;
        let renderer = Arc::new(CountingRenderer::default());
        let events = EventBus::new(16);
        let mut rx = events.subscribe();
        let config = RenderConfig {
            concurrency: 2,
            ..RenderConfig::default()
        };
        let (pipeline, _handle) = RenderPipeline::spawn(
            f.store.clone(),
            f.content.clone(),
            renderer.clone(),
            events,
            config,
        );
        for _ in 0..6 {
            pipeline.schedule(&f.revision, "0payload");
        }

        for _ in 0..6 {
            tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
        }
        let peak = renderer.peak.load(Ordering::SeqCst);
        assert!((1..=2).contains(&peak), "peak was {peak}");
    }
}
