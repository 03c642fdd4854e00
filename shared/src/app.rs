use std::collections::VecDeque;

use crux_core::App as _;
use tracing::{debug, info, warn};

use crate::capabilities::{Capabilities, KvError, KvOutput, KvResult, PresentationState, StorageKey};
use crate::config::AppConfig;
use crate::event::Event;
use crate::model::{
    AccessibilityUpdate, ApplicationState, EntryId, NewJournalEntry, PlantDetails, Screen,
    ThemeMode,
};
use crate::navigation::{NavigationError, TransitionOutcome};
use crate::store::{hydrate_slice, PersistentStore};
use crate::view::ViewModel;
use crate::{now_iso8601, AppError, ANNOUNCEMENT_PREFIX};

/// Events held back while stored state loads. The oldest is dropped first.
pub const MAX_DEFERRED_EVENTS: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Hydration {
    /// `Initialize` has not been received yet.
    #[default]
    Pending,
    Loading {
        generation: u64,
        remaining: Vec<StorageKey>,
    },
    Ready,
}

/// Everything the core holds between events.
#[derive(Debug, Default)]
pub struct Model {
    state: ApplicationState,
    /// What the presentation surface has been told so far.
    presentation: PresentationState,
    hydration: Hydration,
    generation: u64,
    deferred: VecDeque<Event>,
}

impl Model {
    #[must_use]
    pub const fn state(&self) -> &ApplicationState {
        &self.state
    }

    #[must_use]
    pub const fn presentation(&self) -> &PresentationState {
        &self.presentation
    }

    #[must_use]
    pub const fn is_hydrated(&self) -> bool {
        matches!(self.hydration, Hydration::Ready)
    }

    /// Events waiting for hydration to finish.
    #[must_use]
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }
}

/// The application state controller.
///
/// The model is only written here. A mutation runs to completion in a fixed
/// order: update the state, recompute derived state (announcement and
/// presentation), request persistence of the affected slice, then render.
///
/// Nothing but `Initialize` is handled until every slice has been loaded;
/// earlier events are deferred and replayed in arrival order once hydration
/// completes, so a write can never land on top of unread stored data.
#[derive(Debug, Clone, Default)]
pub struct App {
    config: AppConfig,
    store: PersistentStore,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        config.validate()?;
        let store = PersistentStore::new(config.namespace()?);
        Ok(Self { config, store })
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(
            event = event.name(),
            user = event.is_user_initiated(),
            "handling event"
        );

        if event.needs_hydration() && !model.is_hydrated() {
            defer(model, event);
            return;
        }

        match event {
            Event::Initialize => self.initialize(model, caps),
            Event::SliceLoaded {
                generation,
                slice,
                result,
            } => self.slice_loaded(model, caps, generation, slice, result),
            Event::SlicePersisted { slice, result } => log_persisted(slice, &result),

            Event::Navigate { target } => {
                // Refusals are logged by the guard.
                let _ = request_transition(model, caps, target);
            }
            Event::UpdateAccessibility(update) => self.update_accessibility(model, caps, &update),
            Event::SetTheme { mode } => self.set_theme(model, caps, mode),
            Event::SetCameraGranted { granted } => self.set_camera_granted(model, caps, granted),
            Event::SetCurrentPlant(plant) => set_current_plant(model, caps, plant),
            Event::PlantDetected(plant) => {
                debug!(plant = %plant.id, "plant detected");
                set_current_plant(model, caps, Some(plant));
                let _ = request_transition(model, caps, Screen::ScanDetected);
            }
            Event::AddJournalEntry(entry) => self.add_journal_entry(model, caps, entry),
            Event::ResetAll => self.reset_all(model, caps),
            Event::ConnectivityChanged { online } => set_connectivity(model, caps, online),
            Event::RetryConnection { online } => {
                set_connectivity(model, caps, online);
                if online {
                    let _ = request_transition(model, caps, Screen::Home);
                }
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::from_model(model)
    }
}

impl App {
    /// Resets to defaults and asks for every persisted slice. Connectivity is
    /// kept as last reported.
    fn initialize(&self, model: &mut Model, caps: &Capabilities) {
        let online = model.state.online;
        model.state = ApplicationState::new(self.config.initial_screen);
        model.state.online = online;

        model.generation = model.generation.wrapping_add(1);
        let generation = model.generation;
        model.hydration = Hydration::Loading {
            generation,
            remaining: StorageKey::ALL.to_vec(),
        };

        debug!(generation, "hydrating from storage");
        for slice in StorageKey::ALL {
            self.store.load(&caps.key_value, slice, generation);
        }
    }

    fn slice_loaded(
        &self,
        model: &mut Model,
        caps: &Capabilities,
        generation: u64,
        slice: StorageKey,
        result: KvResult,
    ) {
        let Hydration::Loading {
            generation: current,
            remaining,
        } = &mut model.hydration
        else {
            debug!(slice = %slice, "slice arrived outside hydration, ignoring");
            return;
        };
        if *current != generation {
            debug!(slice = %slice, generation, "stale slice, ignoring");
            return;
        }
        remaining.retain(|pending| *pending != slice);
        let done = remaining.is_empty();

        match result {
            Ok(KvOutput::Value { value: Some(raw) }) => {
                hydrate_slice(&mut model.state, slice, &raw);
            }
            Ok(KvOutput::Value { value: None }) => debug!(slice = %slice, "slice not stored"),
            Ok(other) => warn!(slice = %slice, output = ?other, "unexpected storage output"),
            Err(KvError::Unavailable) => {
                debug!(slice = %slice, "storage unavailable, nothing to load");
            }
            Err(err) => warn!(slice = %slice, error = %err, "failed to read slice"),
        }

        if done {
            self.finish_hydration(model, caps);
        }
    }

    fn finish_hydration(&self, model: &mut Model, caps: &Capabilities) {
        model.hydration = Hydration::Ready;
        model.state.announcement = announcement_for(&model.state);

        let presentation = PresentationState::derive(&model.state);
        caps.presentation.apply_all(presentation.operations());
        model.presentation = presentation;

        info!(
            screen = %model.state.current_screen,
            journal = model.state.journal.len(),
            deferred = model.deferred.len(),
            "controller initialized"
        );
        caps.render.render();

        let deferred: Vec<Event> = model.deferred.drain(..).collect();
        for event in deferred {
            self.update(event, model, caps);
        }
    }

    /// Merges the present fields of `update`; persists only if something changed.
    fn update_accessibility(
        &self,
        model: &mut Model,
        caps: &Capabilities,
        update: &AccessibilityUpdate,
    ) {
        let changes = model.state.accessibility.merge(update);
        if !changes.any() {
            return;
        }
        debug!(changes = ?changes, "accessibility updated");

        refresh_derived(model, caps);
        self.store
            .save_accessibility(&caps.key_value, &model.state.accessibility);
        caps.render.render();
    }

    fn set_theme(&self, model: &mut Model, caps: &Capabilities, mode: ThemeMode) {
        if model.state.theme == mode {
            return;
        }
        model.state.theme = mode;
        refresh_derived(model, caps);
        self.store.save_theme(&caps.key_value, mode);
        caps.render.render();
    }

    fn set_camera_granted(&self, model: &mut Model, caps: &Capabilities, granted: bool) {
        if model.state.camera_granted == granted {
            return;
        }
        model.state.camera_granted = granted;
        self.store.save_camera_granted(&caps.key_value, granted);
        caps.render.render();
    }

    /// Appends the entry with a fresh id and the current time, then persists
    /// the whole journal.
    fn add_journal_entry(&self, model: &mut Model, caps: &Capabilities, entry: NewJournalEntry) {
        let id = EntryId::generate();
        let entry = entry.into_entry(id.clone(), now_iso8601(), self.config.max_text_length);
        debug!(id = %id, route = entry.route.as_str(), "journal entry added");

        model.state.journal.push(entry);
        self.store.save_journal(&caps.key_value, &model.state.journal);
        caps.render.render();
    }

    /// Restores every slice to its default, clears storage and returns to the
    /// initial screen. Completes whatever storage does.
    fn reset_all(&self, model: &mut Model, caps: &Capabilities) {
        let online = model.state.online;
        model.state = ApplicationState::new(self.config.initial_screen);
        model.state.online = online;
        refresh_derived(model, caps);

        self.store.remove_all(&caps.key_value);

        info!(screen = %model.state.current_screen, "application reset");
        caps.render.render();
    }
}

/// The only way the current screen changes.
///
/// Requesting the current screen is a successful no-op. A target outside the
/// current screen's allowed set is refused and the screen is kept.
fn request_transition(
    model: &mut Model,
    caps: &Capabilities,
    target: Screen,
) -> Result<TransitionOutcome, NavigationError> {
    let from = model.state.current_screen;
    if from == target {
        return Ok(TransitionOutcome::Unchanged);
    }

    if let Err(err) = from.validate_transition(target) {
        warn!(from = %from, to = %target, "navigation refused");
        return Err(err);
    }

    model.state.current_screen = target;
    refresh_derived(model, caps);
    debug!(from = %from, to = %target, "navigated");
    caps.render.render();

    Ok(TransitionOutcome::Committed { from, to: target })
}

/// Session-only; never navigates.
fn set_current_plant(model: &mut Model, caps: &Capabilities, plant: Option<PlantDetails>) {
    model.state.current_plant = plant;
    caps.render.render();
}

fn set_connectivity(model: &mut Model, caps: &Capabilities, online: bool) {
    if model.state.online == online {
        return;
    }
    model.state.online = online;
    debug!(online, "connectivity changed");
    caps.render.render();
}

fn refresh_derived(model: &mut Model, caps: &Capabilities) {
    model.state.announcement = announcement_for(&model.state);

    let next = PresentationState::derive(&model.state);
    for op in model.presentation.diff(&next) {
        debug!(op = ?op, "presentation change");
        caps.presentation.apply(op);
    }
    model.presentation = next;
}

fn defer(model: &mut Model, event: Event) {
    if model.deferred.len() >= MAX_DEFERRED_EVENTS {
        if let Some(dropped) = model.deferred.pop_front() {
            warn!(event = dropped.name(), "too many events before hydration, dropping oldest");
        }
    }
    debug!(event = event.name(), "deferred until hydrated");
    model.deferred.push_back(event);
}

fn announcement_for(state: &ApplicationState) -> String {
    if state.accessibility.narration {
        format!("{ANNOUNCEMENT_PREFIX} {}", state.current_screen.heading())
    } else {
        String::new()
    }
}

fn log_persisted(slice: StorageKey, result: &KvResult) {
    match result {
        Ok(output) => debug!(slice = %slice, output = ?output, "slice stored"),
        Err(KvError::Unavailable) => {
            debug!(slice = %slice, "storage unavailable, keeping in-memory value only");
        }
        Err(err) => warn!(
            slice = %slice,
            error = %err,
            retryable = err.is_retryable(),
            "failed to persist slice"
        ),
    }
}

#[cfg(test)]
mod tests {
    use crux_core::testing::AppTester;

    use super::*;
    use crate::capabilities::testing::{failable_memory, HeadlessShell};
    use crate::capabilities::{
        Effect, KvOperation, MemoryBackend, PresentationOperation, UnavailableBackend,
    };
    use crate::model::{AccessibilitySettings, JournalEntry, Route, TextSize};
    use crate::store::decode_journal;

    fn shell() -> HeadlessShell {
        let mut shell = HeadlessShell::new();
        shell.send(Event::Initialize);
        shell
    }

    fn shell_over(memory: &MemoryBackend) -> HeadlessShell {
        let mut shell = HeadlessShell::with_backend(App::default(), memory.clone());
        shell.send(Event::Initialize);
        shell
    }

    fn entry(name: &str) -> NewJournalEntry {
        NewJournalEntry::new(name, Route::Cultural, "notes").unwrap()
    }

    fn stored_entry(id: &str, name: &str) -> JournalEntry {
        JournalEntry {
            id: EntryId::new(id),
            plant_name: name.to_string(),
            date: "2024-05-01T10:00:00.000Z".to_string(),
            route: Route::Cultural,
            notes: String::new(),
            standards: None,
        }
    }

    fn navigate(shell: &mut HeadlessShell, path: &[Screen]) {
        for &target in path {
            shell.send(Event::Navigate { target });
        }
    }

    /// Initializes against empty storage, resolving every load by hand.
    fn hydrated(app: &AppTester<App, Effect>) -> Model {
        let mut model = Model::default();
        let update = app.update(Event::Initialize, &mut model);
        for effect in update.effects {
            if let Effect::KeyValue(mut request) = effect {
                let update = app
                    .resolve(&mut request, Ok(KvOutput::Value { value: None }))
                    .unwrap();
                for event in update.events {
                    app.update(event, &mut model);
                }
            }
        }
        assert!(model.is_hydrated());
        model
    }

    #[test]
    fn initialize_requests_every_slice_before_rendering() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        let update = app.update(Event::Initialize, &mut model);
        let keys: Vec<String> = update
            .effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::KeyValue(request) => Some(request.operation.key().to_string()),
                _ => None,
            })
            .collect();

        assert_eq!(
            keys,
            ["rr_accessibility", "rr_theme", "rr_camera", "rr_journal"]
        );
        assert!(!update.effects.iter().any(|e| matches!(e, Effect::Render(_))));
        assert!(!model.is_hydrated());
    }

    #[test]
    fn initialize_with_empty_storage_uses_defaults() {
        let shell = shell();

        assert_eq!(shell.state(), &ApplicationState::default());
        assert!(shell.view().ready);
        assert_eq!(shell.renders(), 1);
        assert_eq!(shell.surface().applied().len(), 6);
        assert_eq!(shell.surface().snapshot(), PresentationState::default());
        assert!(shell.backend().is_empty());
    }

    #[test]
    fn initialize_hydrates_valid_slices_and_skips_corrupt_ones() {
        let memory = MemoryBackend::new();
        memory.insert_raw("rr_accessibility", r#"{"textSize":"huge"}"#);
        memory.insert_raw("rr_theme", "\"dark\"");
        memory.insert_raw("rr_camera", "true");
        memory.insert_raw(
            "rr_journal",
            serde_json::to_string(&[stored_entry("a", "Kawakawa")]).unwrap(),
        );

        let shell = shell_over(&memory);

        let state = shell.state();
        assert_eq!(*state.accessibility(), AccessibilitySettings::default());
        assert_eq!(state.theme(), ThemeMode::Dark);
        assert!(state.camera_granted());
        assert_eq!(state.journal().len(), 1);
        assert!(shell.surface().snapshot().dark);
    }

    #[test]
    fn initialize_with_hydrated_narration_announces_current_screen() {
        let memory = MemoryBackend::new();
        memory.insert_raw(
            "rr_accessibility",
            r#"{"textSize":"xl","highContrast":false,"reduceMotion":true,"narration":true}"#,
        );

        let shell = shell_over(&memory);
        assert_eq!(shell.state().announcement(), "Navigated to Welcome");
        assert_eq!(shell.model().presentation().text_scale(), "1.3");
    }

    #[test]
    fn mutations_wait_for_hydration() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        let stored = serde_json::to_string(&[
            stored_entry("a", "Kawakawa"),
            stored_entry("b", "Harakeke"),
        ])
        .unwrap();

        let update = app.update(Event::Initialize, &mut model);
        let mut loads: Vec<_> = update
            .effects
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::KeyValue(request) => Some(request),
                _ => None,
            })
            .collect();

        // Submitted while storage is still loading: nothing may be written yet.
        let update = app.update(Event::AddJournalEntry(entry("Kōwhai")), &mut model);
        assert!(update.effects.is_empty());
        assert_eq!(model.deferred_len(), 1);
        assert!(model.state().journal().is_empty());

        let mut effects = Vec::new();
        for request in &mut loads {
            let value = (request.operation.key() == "rr_journal").then(|| stored.clone());
            let update = app
                .resolve(request, Ok(KvOutput::Value { value }))
                .unwrap();
            for event in update.events {
                effects.extend(app.update(event, &mut model).effects);
            }
        }

        assert!(model.is_hydrated());
        assert_eq!(model.deferred_len(), 0);
        let names: Vec<_> = model
            .state()
            .journal()
            .iter()
            .map(|e| e.plant_name.as_str())
            .collect();
        assert_eq!(names, ["Kawakawa", "Harakeke", "Kōwhai"]);

        let written = effects
            .iter()
            .find_map(|effect| match effect {
                Effect::KeyValue(request) => match &request.operation {
                    KvOperation::Set { key, value } if key == "rr_journal" => Some(value.clone()),
                    _ => None,
                },
                _ => None,
            })
            .unwrap();
        assert_eq!(decode_journal(&written).unwrap().len(), 3);
    }

    #[test]
    fn events_before_initialize_are_replayed_in_order() {
        let mut shell = HeadlessShell::new();
        shell.send(Event::Navigate {
            target: Screen::Home,
        });
        shell.send(Event::SetTheme {
            mode: ThemeMode::Dark,
        });
        assert_eq!(shell.model().deferred_len(), 2);
        assert!(!shell.view().ready);
        assert!(shell.backend().is_empty());

        shell.send(Event::Initialize);

        assert_eq!(shell.state().current_screen(), Screen::Home);
        assert_eq!(shell.state().theme(), ThemeMode::Dark);
        assert_eq!(shell.backend().get_raw("rr_theme").as_deref(), Some("\"dark\""));
    }

    #[test]
    fn deferred_queue_is_bounded() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        for i in 0..MAX_DEFERRED_EVENTS + 6 {
            app.update(Event::ConnectivityChanged { online: i % 2 == 0 }, &mut model);
        }
        assert_eq!(model.deferred_len(), MAX_DEFERRED_EVENTS);
    }

    #[test]
    fn reinitializing_ignores_slices_from_the_earlier_load() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        let stale: Vec<_> = app
            .update(Event::Initialize, &mut model)
            .effects
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::KeyValue(request) => Some(request),
                _ => None,
            })
            .collect();
        let fresh: Vec<_> = app
            .update(Event::Initialize, &mut model)
            .effects
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::KeyValue(request) => Some(request),
                _ => None,
            })
            .collect();

        for mut request in stale {
            let value = (request.operation.key() == "rr_theme").then(|| "\"dark\"".to_string());
            let update = app
                .resolve(&mut request, Ok(KvOutput::Value { value }))
                .unwrap();
            for event in update.events {
                app.update(event, &mut model);
            }
        }
        assert!(!model.is_hydrated());

        for mut request in fresh {
            let update = app
                .resolve(&mut request, Ok(KvOutput::Value { value: None }))
                .unwrap();
            for event in update.events {
                app.update(event, &mut model);
            }
        }
        assert!(model.is_hydrated());
        assert_eq!(model.state().theme(), ThemeMode::Light);
    }

    #[test]
    fn committed_transition_renders_and_moves_focus() {
        let app = AppTester::<App, Effect>::default();
        let mut model = hydrated(&app);

        let update = app.update(
            Event::Navigate {
                target: Screen::Permissions,
            },
            &mut model,
        );
        assert_eq!(model.state().current_screen(), Screen::Permissions);
        assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));
        assert!(update.effects.iter().any(|e| matches!(
            e,
            Effect::Presentation(request)
                if request.operation == PresentationOperation::FocusHeading(Screen::Permissions)
        )));

        let update = app.update(
            Event::Navigate {
                target: Screen::Home,
            },
            &mut model,
        );
        assert_eq!(model.state().current_screen(), Screen::Home);
        assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));
    }

    #[test]
    fn forbidden_transition_keeps_screen_without_rendering() {
        let app = AppTester::<App, Effect>::default();
        let mut model = hydrated(&app);

        let update = app.update(
            Event::Navigate {
                target: Screen::Cultural,
            },
            &mut model,
        );
        assert_eq!(model.state().current_screen(), Screen::Welcome);
        assert!(update.effects.is_empty());
    }

    #[test]
    fn self_transition_is_silent() {
        let mut shell = shell();
        shell.surface().clear_log();
        let renders = shell.renders();

        shell.send(Event::Navigate {
            target: Screen::Welcome,
        });
        assert_eq!(shell.renders(), renders);
        assert!(shell.surface().applied().is_empty());
    }

    #[test]
    fn narration_announces_and_clears() {
        let mut shell = shell();
        navigate(&mut shell, &[Screen::Permissions]);

        shell.send(Event::UpdateAccessibility(
            AccessibilityUpdate::default().narration(true),
        ));
        assert_eq!(shell.state().announcement(), "Navigated to Camera Permissions");
        assert!(shell.view().narration_region_visible);

        navigate(&mut shell, &[Screen::Home]);
        assert_eq!(shell.state().announcement(), "Navigated to Home");

        shell.send(Event::UpdateAccessibility(
            AccessibilityUpdate::default().narration(false),
        ));
        assert_eq!(shell.state().announcement(), "");
        assert!(!shell.view().narration_region_visible);
    }

    #[test]
    fn partial_accessibility_update_merges_and_persists() {
        let mut shell = shell();
        shell.send(Event::UpdateAccessibility(
            AccessibilityUpdate::default().high_contrast(true),
        ));
        shell.surface().clear_log();

        shell.send(Event::UpdateAccessibility(
            AccessibilityUpdate::default().text_size(TextSize::Large),
        ));

        let a11y = shell.state().accessibility();
        assert_eq!(a11y.text_size, TextSize::Large);
        assert!(a11y.high_contrast);
        assert_eq!(
            shell.surface().applied(),
            vec![PresentationOperation::SetTextScale(TextSize::Large)]
        );

        let stored = shell.backend().get_raw("rr_accessibility").unwrap();
        assert!(stored.contains("\"textSize\":\"large\""));
        assert!(stored.contains("\"highContrast\":true"));
    }

    #[test]
    fn empty_accessibility_update_changes_nothing() {
        let mut shell = shell();
        let renders = shell.renders();

        shell.send(Event::UpdateAccessibility(AccessibilityUpdate::default()));
        assert_eq!(shell.renders(), renders);
        assert!(shell.backend().is_empty());
    }

    #[test]
    fn theme_and_camera_persist() {
        let mut shell = shell();
        shell.send(Event::SetTheme {
            mode: ThemeMode::Dark,
        });
        shell.send(Event::SetCameraGranted { granted: true });

        assert_eq!(shell.backend().get_raw("rr_theme").as_deref(), Some("\"dark\""));
        assert_eq!(shell.backend().get_raw("rr_camera").as_deref(), Some("true"));
        assert!(shell.surface().snapshot().dark);
    }

    #[test]
    fn journal_entries_keep_order_and_get_fresh_ids() {
        let mut shell = shell();
        shell.send(Event::AddJournalEntry(entry("Kawakawa")));
        shell.send(Event::AddJournalEntry(entry("Harakeke")));

        let journal = shell.state().journal();
        assert_eq!(journal[0].plant_name, "Kawakawa");
        assert_eq!(journal[1].plant_name, "Harakeke");
        assert_ne!(journal[0].id, journal[1].id);
        assert!(journal.iter().all(|e| e.created_at().is_some()));
        assert!(journal[0].date.ends_with('Z'));

        let stored = shell.backend().get_raw("rr_journal").unwrap();
        assert_eq!(decode_journal(&stored).as_deref(), Some(journal));
    }

    fn shell_with_text_cap(max_text_length: usize) -> HeadlessShell {
        let config = AppConfig {
            max_text_length,
            ..AppConfig::default()
        };
        let app = App::new(config).unwrap();
        let mut shell = HeadlessShell::with_backend(app, MemoryBackend::new());
        shell.send(Event::Initialize);
        shell
    }

    #[test]
    fn configured_text_cap_applies_to_entries() {
        let mut shell = shell_with_text_cap(4);
        shell.send(Event::AddJournalEntry(
            NewJournalEntry::new("Pōhutukawa", Route::Stem, "long notes").unwrap(),
        ));

        let stored = &shell.state().journal()[0];
        assert_eq!(stored.plant_name, "Pōhu");
        assert_eq!(stored.notes, "long");
    }

    #[test]
    fn configured_text_cap_above_the_default_is_honoured() {
        let mut shell = shell_with_text_cap(20_000);
        let notes = "ā".repeat(15_000);
        shell.send(Event::AddJournalEntry(
            NewJournalEntry::new("Kawakawa", Route::Cultural, &notes).unwrap(),
        ));

        assert_eq!(shell.state().journal()[0].notes.chars().count(), 15_000);
    }

    #[test]
    fn reset_restores_defaults_and_clears_storage() {
        let mut shell = shell();
        navigate(&mut shell, &[Screen::Home]);
        shell.send(Event::UpdateAccessibility(
            AccessibilityUpdate::default()
                .narration(true)
                .text_size(TextSize::Xl),
        ));
        shell.send(Event::SetTheme {
            mode: ThemeMode::Dark,
        });
        shell.send(Event::SetCameraGranted { granted: true });
        shell.send(Event::AddJournalEntry(entry("Kawakawa")));
        shell.send(Event::SetCurrentPlant(Some(PlantDetails::new(
            "p1",
            "Piper excelsum",
        ))));
        shell.send(Event::ConnectivityChanged { online: false });

        shell.send(Event::ResetAll);

        let state = shell.state();
        assert_eq!(state.current_screen(), Screen::Welcome);
        assert_eq!(*state.accessibility(), AccessibilitySettings::default());
        assert_eq!(state.theme(), ThemeMode::Light);
        assert!(!state.camera_granted());
        assert!(state.journal().is_empty());
        assert!(state.current_plant().is_none());
        assert_eq!(state.announcement(), "");
        assert!(!state.is_online());
        assert!(shell.backend().is_empty());
        assert_eq!(shell.surface().snapshot(), PresentationState::default());
    }

    #[test]
    fn reset_completes_when_storage_fails() {
        let (backend, memory) = failable_memory();
        let handle = backend.clone();
        let mut shell = HeadlessShell::with_backend(App::default(), backend);
        shell.send(Event::Initialize);
        shell.send(Event::SetTheme {
            mode: ThemeMode::Dark,
        });

        handle.set_fail_writes(true);
        shell.send(Event::ResetAll);

        assert_eq!(shell.state().theme(), ThemeMode::Light);
        assert_eq!(memory.get_raw("rr_theme").as_deref(), Some("\"dark\""));
    }

    #[test]
    fn failed_reads_hydrate_as_defaults() {
        let (backend, memory) = failable_memory();
        memory.insert_raw("rr_camera", "true");
        backend.set_fail_reads(true);

        let mut shell = HeadlessShell::with_backend(App::default(), backend);
        shell.send(Event::Initialize);

        assert!(shell.model().is_hydrated());
        assert!(!shell.state().camera_granted());
    }

    #[test]
    fn unavailable_storage_keeps_in_memory_state() {
        let mut shell = HeadlessShell::with_backend(App::default(), UnavailableBackend);
        shell.send(Event::Initialize);

        shell.send(Event::SetTheme {
            mode: ThemeMode::Dark,
        });
        shell.send(Event::AddJournalEntry(entry("Kawakawa")));

        assert_eq!(shell.state().theme(), ThemeMode::Dark);
        assert_eq!(shell.state().journal().len(), 1);
    }

    #[test]
    fn connectivity_and_retry() {
        let mut shell = shell();
        navigate(&mut shell, &[Screen::Home]);

        shell.send(Event::ConnectivityChanged { online: false });
        navigate(&mut shell, &[Screen::Offline]);
        assert!(shell.view().offline);

        shell.send(Event::RetryConnection { online: false });
        assert_eq!(shell.state().current_screen(), Screen::Offline);

        shell.send(Event::RetryConnection { online: true });
        assert!(shell.state().is_online());
        assert_eq!(shell.state().current_screen(), Screen::Home);
    }

    #[test]
    fn plant_detection_sets_plant_then_navigates() {
        let mut shell = shell();
        let plant = PlantDetails::new("p1", "Piper excelsum").with_common_name("Kawakawa");

        // Welcome cannot jump to the result screen, but the plant is still recorded.
        shell.send(Event::PlantDetected(plant.clone()));
        assert_eq!(shell.state().current_plant(), Some(&plant));
        assert_eq!(shell.state().current_screen(), Screen::Welcome);

        navigate(
            &mut shell,
            &[Screen::Home, Screen::ScanIdle, Screen::ScanDetecting],
        );
        shell.send(Event::PlantDetected(plant));
        assert_eq!(shell.state().current_screen(), Screen::ScanDetected);
    }

    #[test]
    fn set_current_plant_does_not_navigate() {
        let mut shell = shell();
        shell.send(Event::SetCurrentPlant(Some(PlantDetails::new("p1", "Harakeke"))));
        assert_eq!(shell.state().current_screen(), Screen::Welcome);

        shell.send(Event::SetCurrentPlant(None));
        assert!(shell.state().current_plant().is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AppConfig {
            storage_prefix: "no spaces".to_string(),
            ..AppConfig::default()
        };
        let err = App::new(config).unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID");
    }
}
