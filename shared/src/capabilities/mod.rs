mod kv;
mod presentation;

#[cfg(not(target_arch = "wasm32"))]
mod sqlite;

pub use self::kv::{
    validate_key, KeyNamespace, KeyValue, KvBackend, KvError, KvKey, KvOperation, KvOutput,
    KvResult, MemoryBackend, StorageErrorCode, StorageKey, UnavailableBackend, MAX_KEY_LENGTH,
    MAX_PREFIX_LENGTH, MAX_VALUE_SIZE,
};
pub use self::presentation::{
    HeadlessSurface, Presentation, PresentationOperation, PresentationState, PresentationSurface,
};

#[cfg(not(target_arch = "wasm32"))]
pub use self::sqlite::SqliteBackend;

// Crux's built-in Render is all the core needs to ask for a redraw.
pub use crux_core::render::Render;

// The Effect derive refers to the app type by name.
#[allow(unused_imports)]
use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub key_value: KeyValue<Event>,
    pub presentation: Presentation<Event>,
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use crux_core::testing::AppTester;

    use super::*;
    use crate::app::Model;
    use crate::model::ApplicationState;
    use crate::view::ViewModel;

    /// Wraps a backend and fails reads or writes on demand.
    #[derive(Debug, Clone)]
    pub struct FailableBackend<B> {
        inner: B,
        fail_reads: Arc<AtomicBool>,
        fail_writes: Arc<AtomicBool>,
    }

    impl<B: KvBackend> FailableBackend<B> {
        pub fn new(inner: B) -> Self {
            Self {
                inner,
                fail_reads: Arc::new(AtomicBool::new(false)),
                fail_writes: Arc::new(AtomicBool::new(false)),
            }
        }

        pub fn set_fail_reads(&self, fail: bool) {
            self.fail_reads.store(fail, Ordering::SeqCst);
        }

        pub fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        fn injected() -> KvError {
            KvError::storage(StorageErrorCode::IoError, "injected failure")
        }
    }

    impl<B: KvBackend> KvBackend for FailableBackend<B> {
        fn is_available(&self) -> bool {
            self.inner.is_available()
        }

        fn get(&self, key: &str) -> Result<Option<String>, KvError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(Self::injected());
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Self::injected());
            }
            self.inner.set(key, value)
        }

        fn delete(&self, key: &str) -> Result<bool, KvError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Self::injected());
            }
            self.inner.delete(key)
        }
    }

    pub fn failable_memory() -> (FailableBackend<MemoryBackend>, MemoryBackend) {
        let memory = MemoryBackend::new();
        (FailableBackend::new(memory.clone()), memory)
    }

    /// Drives the core the way a native shell would: storage requests are
    /// resolved against `backend`, presentation changes land on a
    /// [`HeadlessSurface`], and callback events are fed back until the core
    /// goes quiet.
    pub struct HeadlessShell<B = MemoryBackend> {
        core: AppTester<App, Effect>,
        model: Model,
        backend: B,
        surface: HeadlessSurface,
        renders: usize,
    }

    impl HeadlessShell<MemoryBackend> {
        #[must_use]
        pub fn new() -> Self {
            Self::with_backend(App::default(), MemoryBackend::new())
        }
    }

    impl Default for HeadlessShell<MemoryBackend> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<B: KvBackend> HeadlessShell<B> {
        pub fn with_backend(app: App, backend: B) -> Self {
            Self {
                core: AppTester::new(app),
                model: Model::default(),
                backend,
                surface: HeadlessSurface::new(),
                renders: 0,
            }
        }

        pub fn send(&mut self, event: Event) {
            let update = self.core.update(event, &mut self.model);
            self.settle(update.effects, update.events);
        }

        fn settle(&mut self, effects: Vec<Effect>, events: Vec<Event>) {
            let mut pending = VecDeque::from([(effects, events)]);

            while let Some((effects, events)) = pending.pop_front() {
                for effect in effects {
                    match effect {
                        Effect::Render(_) => self.renders += 1,
                        Effect::Presentation(request) => self.surface.apply(&request.operation),
                        Effect::KeyValue(mut request) => {
                            let output = self.backend.execute(&request.operation);
                            if let Ok(update) = self.core.resolve(&mut request, output) {
                                pending.push_back((update.effects, update.events));
                            }
                        }
                    }
                }

                for event in events {
                    let update = self.core.update(event, &mut self.model);
                    pending.push_back((update.effects, update.events));
                }
            }
        }

        #[must_use]
        pub fn view(&self) -> ViewModel {
            self.core.view(&self.model)
        }

        #[must_use]
        pub fn model(&self) -> &Model {
            &self.model
        }

        #[must_use]
        pub fn state(&self) -> &ApplicationState {
            self.model.state()
        }

        #[must_use]
        pub fn backend(&self) -> &B {
            &self.backend
        }

        #[must_use]
        pub fn surface(&self) -> &HeadlessSurface {
            &self.surface
        }

        /// Render requests seen since the shell was created.
        #[must_use]
        pub const fn renders(&self) -> usize {
            self.renders
        }
    }
}
