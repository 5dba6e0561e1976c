//! DOM capabilities consumed by the prefetch subsystem.
//!
//! Nothing in the crate touches a real browser. Hosts implement
//! [`Document`] (queries) and [`ElementObserver`] (intersection and
//! mutation notifications); [`memory`] provides in-process versions for
//! the replay CLI and tests.
//!
//! - [`watcher`]: keeps every internal anchor under visibility observation
//! - [`memory`]: `MemoryDocument` and `ManualObserver`

pub mod memory;
pub mod watcher;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use memory::{ManualObserver, MemoryDocument};
pub use watcher::LinkWatcher;

/// Opaque handle for a DOM element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Viewport coordinates in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

/// An `<a href>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: ElementId,
    pub href: String,
}

impl Anchor {
    pub fn new(id: u64, href: impl Into<String>) -> Self {
        Self {
            id: ElementId(id),
            href: href.into(),
        }
    }
}

/// A node inserted into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddedNode {
    /// The inserted node is itself an anchor.
    Anchor(Anchor),
    /// A subtree; `anchors` lists the links nested inside it.
    Subtree { anchors: Vec<Anchor> },
    /// Text or any other node without links.
    Other,
}

/// One batch of DOM changes (a `MutationObserver` callback).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationRecord {
    pub added: Vec<AddedNode>,
}

impl MutationRecord {
    /// Whether any added node is, or contains, an anchor.
    pub fn adds_anchors(&self) -> bool {
        self.added.iter().any(|node| match node {
            AddedNode::Anchor(_) => true,
            AddedNode::Subtree { anchors } => !anchors.is_empty(),
            AddedNode::Other => false,
        })
    }
}

pub type VisibilityCallback = Arc<dyn Fn(&Anchor) + Send + Sync>;
pub type MutationCallback = Arc<dyn Fn(&MutationRecord) + Send + Sync>;

/// Read-only document queries.
pub trait Document: Send + Sync {
    /// Every anchor with an `href` currently in the document.
    fn anchors(&self) -> Vec<Anchor>;

    /// The anchor that is `target` or its nearest ancestor.
    fn closest_anchor(&self, target: ElementId) -> Option<Anchor>;

    /// Hit test: the topmost element at `point`.
    fn element_at(&self, point: Point) -> Option<ElementId>;
}

/// Intersection and mutation notifications.
pub trait ElementObserver: Send + Sync {
    /// `false` when the host has no intersection observer.
    fn supports_visibility(&self) -> bool {
        true
    }

    /// Call `callback` whenever `anchor` comes within `margin_px` of the viewport.
    fn observe_visible(&self, anchor: &Anchor, margin_px: u32, callback: VisibilityCallback);

    /// Call `callback` for nodes added anywhere under the document body.
    fn observe_mutations(&self, callback: MutationCallback);
}
