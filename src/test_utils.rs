pub mod test_helpers {
    use std::collections::{BTreeSet, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Condvar, Mutex, PoisonError};
    use std::time::{Duration, Instant};

    use image::Rgba;

    use crate::preview::{
        CancellationToken, DocumentEngine, DocumentMetadata, DocumentSource, LoadError,
        PageSize, PageSource, PreviewConfig, PreviewController, RenderFault, RenderTarget,
        Surface, ZoomControls,
    };

    /// How long a gate holds a worker before giving up, so a broken test
    /// fails instead of hanging
    const GATE_LIMIT: Duration = Duration::from_secs(10);

    /// Ink used by every scripted page
    pub const PAGE_INK: Rgba<u8> = Rgba([200, 30, 30, 255]);

    /// A latch that holds worker threads until the test opens it
    #[derive(Clone, Default)]
    pub struct Gate {
        state: Arc<(Mutex<bool>, Condvar)>,
    }

    impl Gate {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn open(&self) {
            let (lock, cvar) = &*self.state;
            *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
            cvar.notify_all();
        }

        pub fn is_open(&self) -> bool {
            *self.state.0.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn wait(&self) {
            let (lock, cvar) = &*self.state;
            let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = cvar
                .wait_timeout_while(guard, GATE_LIMIT, |open| !*open)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Counters shared by everything a [`ScriptedEngine`] hands out
    #[derive(Default)]
    pub struct EngineStats {
        pub loads: AtomicUsize,
        pub pages_fetched: AtomicUsize,
        pub renders_started: AtomicUsize,
        pub renders_cancelled: AtomicUsize,
        pub cleanups: AtomicUsize,
        pub destroys: AtomicUsize,
        rendered: Mutex<Vec<(usize, f32)>>,
    }

    impl EngineStats {
        pub fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }

        pub fn pages_fetched(&self) -> usize {
            self.pages_fetched.load(Ordering::SeqCst)
        }

        pub fn destroys(&self) -> usize {
            self.destroys.load(Ordering::SeqCst)
        }

        pub fn cleanups(&self) -> usize {
            self.cleanups.load(Ordering::SeqCst)
        }

        pub fn renders_started(&self) -> usize {
            self.renders_started.load(Ordering::SeqCst)
        }

        pub fn renders_cancelled(&self) -> usize {
            self.renders_cancelled.load(Ordering::SeqCst)
        }

        /// Documents loaded and not yet destroyed
        pub fn live_documents(&self) -> usize {
            self.loads().saturating_sub(self.destroys())
        }

        /// Every (page index, scale) that ran to completion
        pub fn rendered(&self) -> Vec<(usize, f32)> {
            self.rendered
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    /// What a scripted document looks like and how it misbehaves
    #[derive(Clone, Default)]
    pub struct DocumentScript {
        pub pages: Vec<PageSize>,
        pub title: Option<String>,
        /// Pages whose render fails with the given message
        pub failing_pages: HashMap<usize, String>,
        /// Pages whose handle cannot be fetched
        pub broken_pages: BTreeSet<usize>,
        pub load_error: Option<String>,
        pub load_gate: Option<Gate>,
        pub render_gate: Option<Gate>,
        pub metadata_gate: Option<Gate>,
    }

    impl DocumentScript {
        /// `count` pages of the same size
        pub fn uniform(count: usize, size: PageSize) -> Self {
            Self {
                pages: vec![size; count],
                ..Self::default()
            }
        }

        pub fn with_title(mut self, title: &str) -> Self {
            self.title = Some(title.to_string());
            self
        }

        pub fn failing_page(mut self, index: usize, message: &str) -> Self {
            self.failing_pages.insert(index, message.to_string());
            self
        }

        pub fn broken_page(mut self, index: usize) -> Self {
            self.broken_pages.insert(index);
            self
        }

        pub fn load_error(mut self, message: &str) -> Self {
            self.load_error = Some(message.to_string());
            self
        }

        pub fn gate_load(mut self, gate: &Gate) -> Self {
            self.load_gate = Some(gate.clone());
            self
        }

        pub fn gate_renders(mut self, gate: &Gate) -> Self {
            self.render_gate = Some(gate.clone());
            self
        }

        pub fn gate_metadata(mut self, gate: &Gate) -> Self {
            self.metadata_gate = Some(gate.clone());
            self
        }
    }

    /// In-memory engine that recognises blobs registered with
    /// [`ScriptedEngine::with_document`]
    #[derive(Default)]
    pub struct ScriptedEngine {
        documents: HashMap<Vec<u8>, DocumentScript>,
        stats: Arc<EngineStats>,
    }

    impl ScriptedEngine {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_document(mut self, blob: &[u8], script: DocumentScript) -> Self {
            self.documents.insert(blob.to_vec(), script);
            self
        }

        pub fn stats(&self) -> Arc<EngineStats> {
            Arc::clone(&self.stats)
        }
    }

    impl DocumentEngine for ScriptedEngine {
        fn load(
            &self,
            blob: &[u8],
            _cancel: &CancellationToken,
        ) -> Result<Arc<dyn DocumentSource>, LoadError> {
            let script = self
                .documents
                .get(blob)
                .cloned()
                .ok_or_else(|| LoadError::engine("unrecognised document"))?;

            if let Some(gate) = &script.load_gate {
                gate.wait();
            }
            if let Some(message) = &script.load_error {
                return Err(LoadError::engine(message.clone()));
            }

            self.stats.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(ScriptedDocument {
                script,
                stats: Arc::clone(&self.stats),
            }))
        }
    }

    struct ScriptedDocument {
        script: DocumentScript,
        stats: Arc<EngineStats>,
    }

    impl DocumentSource for ScriptedDocument {
        fn page_count(&self) -> usize {
            self.script.pages.len()
        }

        fn page(&self, index: usize) -> Result<Arc<dyn PageSource>, LoadError> {
            if self.script.broken_pages.contains(&index) {
                return Err(LoadError::Page {
                    index,
                    detail: "page tree is damaged".to_string(),
                });
            }
            let size = self.script.pages.get(index).copied().ok_or(LoadError::Page {
                index,
                detail: "no such page".to_string(),
            })?;
            self.stats.pages_fetched.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(ScriptedPage {
                index,
                size,
                failure: self.script.failing_pages.get(&index).cloned(),
                gate: self.script.render_gate.clone(),
                stats: Arc::clone(&self.stats),
            }))
        }

        fn metadata(&self) -> Result<DocumentMetadata, LoadError> {
            if let Some(gate) = &self.script.metadata_gate {
                gate.wait();
            }
            let mut metadata = DocumentMetadata::default();
            if let Some(title) = &self.script.title {
                metadata
                    .entries
                    .insert(DocumentMetadata::TITLE.to_string(), title.clone());
            }
            Ok(metadata)
        }

        fn destroy(&self) {
            self.stats.destroys.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedPage {
        index: usize,
        size: PageSize,
        failure: Option<String>,
        gate: Option<Gate>,
        stats: Arc<EngineStats>,
    }

    impl PageSource for ScriptedPage {
        fn size(&self) -> PageSize {
            self.size
        }

        fn render(
            &self,
            surface: &mut Surface,
            target: &RenderTarget,
            cancel: &CancellationToken,
        ) -> Result<(), RenderFault> {
            self.stats.renders_started.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.wait();
            }
            if cancel.is_cancelled() {
                self.stats.renders_cancelled.fetch_add(1, Ordering::SeqCst);
                return Ok(());
            }
            if let Some(message) = &self.failure {
                return Err(RenderFault::engine(message.clone()));
            }

            for pixel in surface.image_mut().pixels_mut() {
                *pixel = PAGE_INK;
            }
            self.stats
                .rendered
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((self.index, target.scale));
            Ok(())
        }

        fn cleanup(&self) {
            self.stats.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// A controller over `engine` with a sized window
    pub fn controller_for(
        engine: ScriptedEngine,
        window: (f32, f32),
    ) -> (PreviewController, ZoomControls) {
        controller_with_config(engine, window, PreviewConfig::default())
    }

    pub fn controller_with_config(
        engine: ScriptedEngine,
        window: (f32, f32),
        config: PreviewConfig,
    ) -> (PreviewController, ZoomControls) {
        let controls = ZoomControls::new();
        let mut controller = PreviewController::new(Arc::new(engine), config, controls.clone());
        controller.resize(window.0, window.1);
        (controller, controls)
    }

    /// Poll `controller` until `done` holds or the time limit passes
    pub fn poll_until(
        controller: &mut PreviewController,
        timeout: Duration,
        mut done: impl FnMut(&mut PreviewController) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            controller.poll();
            if done(controller) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            controller.poll_timeout(Duration::from_millis(10));
        }
    }

    /// Spin until `done` holds, for state that changes on worker threads only
    pub fn wait_for(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        done()
    }
}
