use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize, Serializer};
use std::sync::{Arc, Mutex};

use crate::model::{ApplicationState, Screen, TextSize};

/// A single change the shell must make to its document/window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum PresentationOperation {
    SetTextScale(TextSize),
    ToggleHighContrast(bool),
    SetReduceMotion(bool),
    SetNarration(bool),
    EnableDarkMode(bool),
    /// Move keyboard/screen-reader focus to the heading of this screen.
    FocusHeading(Screen),
}

impl Operation for PresentationOperation {
    type Output = ();
}

/// Fire-and-forget presentation changes. The shell applies each operation to
/// its surface and answers nothing.
pub struct Presentation<Ev> {
    context: CapabilityContext<PresentationOperation, Ev>,
}

impl<Ev> Capability<Ev> for Presentation<Ev> {
    type Operation = PresentationOperation;
    type MappedSelf<MappedEv> = Presentation<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Presentation::new(self.context.map_event(f))
    }
}

impl<Ev> Presentation<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<PresentationOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn apply(&self, operation: PresentationOperation) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(operation).await;
        });
    }

    pub fn apply_all(&self, operations: impl IntoIterator<Item = PresentationOperation>) {
        for operation in operations {
            self.apply(operation);
        }
    }
}

/// Shell-side target for [`PresentationOperation`]s.
pub trait PresentationSurface: Send {
    fn apply(&mut self, op: &PresentationOperation);
}

/// What the presentation surface should currently reflect, derived entirely
/// from [`ApplicationState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationState {
    #[serde(rename = "textScale", serialize_with = "serialize_scale")]
    pub text_size: TextSize,
    pub high_contrast: bool,
    pub reduce_motion: bool,
    pub narration: bool,
    pub dark: bool,
    #[serde(skip)]
    pub focus: Screen,
}

fn serialize_scale<S: Serializer>(size: &TextSize, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(size.scale())
}

impl Default for PresentationState {
    fn default() -> Self {
        Self::derive(&ApplicationState::default())
    }
}

impl PresentationState {
    #[must_use]
    pub fn derive(state: &ApplicationState) -> Self {
        let a11y = state.accessibility();
        Self {
            text_size: a11y.text_size,
            high_contrast: a11y.high_contrast,
            reduce_motion: a11y.reduce_motion,
            narration: a11y.narration,
            dark: state.theme().is_dark(),
            focus: state.current_screen(),
        }
    }

    #[must_use]
    pub const fn text_scale(&self) -> &'static str {
        self.text_size.scale()
    }

    /// Operations that take a surface showing `self` to showing `next`.
    #[must_use]
    pub fn diff(&self, next: &Self) -> Vec<PresentationOperation> {
        let mut ops = Vec::new();
        if self.text_size != next.text_size {
            ops.push(PresentationOperation::SetTextScale(next.text_size));
        }
        if self.high_contrast != next.high_contrast {
            ops.push(PresentationOperation::ToggleHighContrast(next.high_contrast));
        }
        if self.reduce_motion != next.reduce_motion {
            ops.push(PresentationOperation::SetReduceMotion(next.reduce_motion));
        }
        if self.narration != next.narration {
            ops.push(PresentationOperation::SetNarration(next.narration));
        }
        if self.dark != next.dark {
            ops.push(PresentationOperation::EnableDarkMode(next.dark));
        }
        if self.focus != next.focus {
            ops.push(PresentationOperation::FocusHeading(next.focus));
        }
        ops
    }

    /// Every operation needed to bring a surface in an unknown state to `self`.
    #[must_use]
    pub fn operations(&self) -> Vec<PresentationOperation> {
        vec![
            PresentationOperation::SetTextScale(self.text_size),
            PresentationOperation::ToggleHighContrast(self.high_contrast),
            PresentationOperation::SetReduceMotion(self.reduce_motion),
            PresentationOperation::SetNarration(self.narration),
            PresentationOperation::EnableDarkMode(self.dark),
            PresentationOperation::FocusHeading(self.focus),
        ]
    }

    fn apply(&mut self, op: PresentationOperation) {
        match op {
            PresentationOperation::SetTextScale(size) => self.text_size = size,
            PresentationOperation::ToggleHighContrast(on) => self.high_contrast = on,
            PresentationOperation::SetReduceMotion(on) => self.reduce_motion = on,
            PresentationOperation::SetNarration(on) => self.narration = on,
            PresentationOperation::EnableDarkMode(on) => self.dark = on,
            PresentationOperation::FocusHeading(screen) => self.focus = screen,
        }
    }
}

#[derive(Debug, Default)]
struct HeadlessInner {
    state: PresentationState,
    applied: Vec<PresentationOperation>,
}

/// Surface with no display attached. It tracks the resulting state and keeps
/// a log of every operation; clones share both.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    inner: Arc<Mutex<HeadlessInner>>,
}

impl HeadlessSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> PresentationState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn applied(&self) -> Vec<PresentationOperation> {
        self.inner
            .lock()
            .map(|inner| inner.applied.clone())
            .unwrap_or_default()
    }

    pub fn clear_log(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.applied.clear();
        }
    }
}

impl PresentationSurface for HeadlessSurface {
    fn apply(&mut self, op: &PresentationOperation) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.state.apply(*op);
            inner.applied.push(*op);
        }
    }
}
