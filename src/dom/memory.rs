//! In-process DOM: a document model with hit testing and an observer that
//! fires synchronously when told to.

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};

use crate::dom::{
    Anchor, Document, ElementId, ElementObserver, MutationCallback, MutationRecord, Point, Rect,
    VisibilityCallback,
};

#[derive(Debug, Default)]
struct DocumentState {
    /// Anchors in document order with their layout boxes.
    anchors: Vec<(Anchor, Option<Rect>)>,

    /// Non-anchor element -> parent element.
    parents: HashMap<ElementId, ElementId>,
}

/// A flat document of anchors, optionally with child elements nested in them.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    state: RwLock<DocumentState>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an anchor; a later anchor paints over earlier ones.
    pub fn insert(&self, anchor: Anchor, rect: Option<Rect>) {
        let mut state = self.state.write();
        state.anchors.retain(|(existing, _)| existing.id != anchor.id);
        state.anchors.push((anchor, rect));
    }

    /// Register `child` as a descendant element of `parent`.
    pub fn insert_child(&self, child: ElementId, parent: ElementId) {
        self.state.write().parents.insert(child, parent);
    }

    pub fn remove(&self, id: ElementId) {
        let mut state = self.state.write();
        state.anchors.retain(|(anchor, _)| anchor.id != id);
        state.parents.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.state.read().anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn anchor_by_id(state: &DocumentState, id: ElementId) -> Option<Anchor> {
        state
            .anchors
            .iter()
            .find(|(anchor, _)| anchor.id == id)
            .map(|(anchor, _)| anchor.clone())
    }
}

impl Document for MemoryDocument {
    fn anchors(&self) -> Vec<Anchor> {
        self.state
            .read()
            .anchors
            .iter()
            .map(|(anchor, _)| anchor.clone())
            .collect()
    }

    fn closest_anchor(&self, target: ElementId) -> Option<Anchor> {
        let state = self.state.read();
        let mut current = target;
        // Bounded walk so a cyclic parent map cannot hang the caller.
        for _ in 0..=state.parents.len() {
            if let Some(anchor) = Self::anchor_by_id(&state, current) {
                return Some(anchor);
            }
            current = *state.parents.get(&current)?;
        }
        None
    }

    fn element_at(&self, point: Point) -> Option<ElementId> {
        self.state
            .read()
            .anchors
            .iter()
            .rev()
            .find(|(_, rect)| rect.is_some_and(|r| r.contains(point)))
            .map(|(anchor, _)| anchor.id)
    }
}

struct Watched {
    anchor: Anchor,
    margin_px: u32,
    callback: VisibilityCallback,
}

/// Observer whose notifications are triggered explicitly.
pub struct ManualObserver {
    visibility_supported: bool,
    watched: Mutex<HashMap<ElementId, Watched>>,
    mutation_callbacks: Mutex<Vec<MutationCallback>>,
}

impl ManualObserver {
    pub fn new() -> Self {
        Self {
            visibility_supported: true,
            watched: Mutex::new(HashMap::new()),
            mutation_callbacks: Mutex::new(Vec::new()),
        }
    }

    /// An observer for hosts without intersection support.
    pub fn without_visibility() -> Self {
        Self {
            visibility_supported: false,
            ..Self::new()
        }
    }

    /// Fire the visibility callback for `id`. Returns `false` if it is not observed.
    pub fn reveal(&self, id: ElementId) -> bool {
        let entry = self
            .watched
            .lock()
            .get(&id)
            .map(|w| (w.anchor.clone(), w.callback.clone()));
        match entry {
            Some((anchor, callback)) => {
                callback(&anchor);
                true
            }
            None => false,
        }
    }

    /// Deliver `record` to every mutation callback.
    pub fn mutate(&self, record: &MutationRecord) {
        let callbacks = self.mutation_callbacks.lock().clone();
        for callback in callbacks {
            callback(record);
        }
    }

    pub fn is_observed(&self, id: ElementId) -> bool {
        self.watched.lock().contains_key(&id)
    }

    pub fn observed_count(&self) -> usize {
        self.watched.lock().len()
    }

    pub fn margin_for(&self, id: ElementId) -> Option<u32> {
        self.watched.lock().get(&id).map(|w| w.margin_px)
    }
}

impl Default for ManualObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementObserver for ManualObserver {
    fn supports_visibility(&self) -> bool {
        self.visibility_supported
    }

    fn observe_visible(&self, anchor: &Anchor, margin_px: u32, callback: VisibilityCallback) {
        self.watched.lock().insert(
            anchor.id,
            Watched {
                anchor: anchor.clone(),
                margin_px,
                callback,
            },
        );
    }

    fn observe_mutations(&self, callback: MutationCallback) {
        self.mutation_callbacks.lock().push(callback);
    }
}
