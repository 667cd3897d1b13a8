use std::collections::HashSet;
use std::sync::Arc;

use foundation::{Color, Properties};

use crate::host::{ContainerId, PrimitiveId, RenderHost};
use crate::registry::PrimitiveMetadata;

/// A highlighted primitive and the color it had before it was highlighted.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionEntry {
    pub primitive: PrimitiveId,
    pub saved_color: Color,
    pub metadata: PrimitiveMetadata,
}

/// A primitive resolved through the metadata registry, ready to select.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionCandidate {
    pub primitive: PrimitiveId,
    pub metadata: PrimitiveMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOp {
    /// Highlight every candidate not already selected; keep the rest.
    Add(Vec<SelectionCandidate>),
    /// Restore everything, then select at most one candidate.
    Replace(Option<SelectionCandidate>),
    /// Restore everything and empty the set.
    Clear,
    /// Drop entries whose primitives live in a container about to be rebuilt.
    /// Colors are not restored: the primitives are being destroyed.
    ForgetContainer(ContainerId),
}

/// Source of truth for what is highlighted.
///
/// Invariant: while a primitive has an entry its displayed color is the
/// highlight color; once the entry is removed (other than by
/// `ForgetContainer`) its displayed color is exactly `saved_color`.
///
/// Ordering contract: entries are kept in selection order.
#[derive(Debug, Clone)]
pub struct SelectionSet {
    highlight: Color,
    entries: Vec<SelectionEntry>,
    members: HashSet<PrimitiveId>,
}

impl SelectionSet {
    pub fn new(highlight: Color) -> Self {
        Self {
            highlight,
            entries: Vec::new(),
            members: HashSet::new(),
        }
    }

    pub fn highlight(&self) -> Color {
        self.highlight
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, primitive: PrimitiveId) -> bool {
        self.members.contains(&primitive)
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    pub fn saved_color(&self, primitive: PrimitiveId) -> Option<Color> {
        self.entries
            .iter()
            .find(|e| e.primitive == primitive)
            .map(|e| e.saved_color)
    }

    /// Properties of every selected feature, in selection order.
    pub fn properties(&self) -> Vec<Arc<Properties>> {
        self.entries
            .iter()
            .map(|e| Arc::clone(&e.metadata.properties))
            .collect()
    }

    /// Applies `op`. Returns `true` if the set changed.
    ///
    /// Only [`crate::InteractionState`] calls this, so every mutation is
    /// published exactly once.
    pub(crate) fn apply<H: RenderHost + ?Sized>(&mut self, host: &mut H, op: SelectionOp) -> bool {
        match op {
            SelectionOp::Add(candidates) => {
                let mut changed = false;
                for candidate in candidates {
                    changed |= self.insert(host, candidate);
                }
                changed
            }
            SelectionOp::Replace(candidate) => {
                let previous: Vec<PrimitiveId> = self.entries.iter().map(|e| e.primitive).collect();
                self.restore_all(host);
                if let Some(candidate) = candidate {
                    self.insert(host, candidate);
                }
                let current: Vec<PrimitiveId> = self.entries.iter().map(|e| e.primitive).collect();
                previous != current
            }
            SelectionOp::Clear => {
                let changed = !self.entries.is_empty();
                self.restore_all(host);
                changed
            }
            SelectionOp::ForgetContainer(container) => {
                let before = self.entries.len();
                let members = &mut self.members;
                self.entries.retain(|e| {
                    let keep = e.metadata.container != container;
                    if !keep {
                        members.remove(&e.primitive);
                    }
                    keep
                });
                before != self.entries.len()
            }
        }
    }

    fn insert<H: RenderHost + ?Sized>(&mut self, host: &mut H, candidate: SelectionCandidate) -> bool {
        let primitive = candidate.primitive;
        if self.members.contains(&primitive) || !host.primitive_alive(primitive) {
            return false;
        }
        // Read the current color rather than assume the layer's computed one;
        // the UI may have restyled since the primitive was built.
        let Some(saved_color) = host.fill_color(primitive) else {
            return false;
        };
        if !host.set_fill_color(primitive, self.highlight) {
            return false;
        }
        self.members.insert(primitive);
        self.entries.push(SelectionEntry {
            primitive,
            saved_color,
            metadata: candidate.metadata,
        });
        true
    }

    fn restore_all<H: RenderHost + ?Sized>(&mut self, host: &mut H) {
        for entry in self.entries.drain(..) {
            if host.primitive_alive(entry.primitive) {
                host.set_fill_color(entry.primitive, entry.saved_color);
            }
        }
        self.members.clear();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    use super::{SelectionCandidate, SelectionOp, SelectionSet};
    use crate::host::{ContainerId, Extrusion, FlatRing, PrimitiveId, RenderHost, SolidSpec};
    use crate::memory_host::MemoryHost;
    use crate::registry::PrimitiveMetadata;
    use foundation::{Color, LayerKind, Properties};

    const HIGHLIGHT: Color = Color::rgb8(255, 255, 0);

    fn add(host: &mut MemoryHost, c: ContainerId, x: f64, fill: Color) -> PrimitiveId {
        host.add_solid(
            c,
            SolidSpec {
                outer: FlatRing::from_coords(vec![x, 0.0, x + 1.0, 0.0, x + 1.0, 1.0, x, 1.0]),
                holes: Vec::new(),
                extrusion: Extrusion::Flat { altitude_m: 0.0 },
                fill,
                outline: fill,
            },
        )
        .unwrap()
    }

    fn candidate(p: PrimitiveId, c: ContainerId, index: usize) -> SelectionCandidate {
        let mut props = Properties::new();
        props.insert("index".to_string(), index.into());
        SelectionCandidate {
            primitive: p,
            metadata: PrimitiveMetadata {
                properties: Arc::new(props),
                layer: LayerKind::Corridor,
                container: c,
                feature_index: index,
            },
        }
    }

    #[test]
    fn add_saves_current_color_and_highlights() {
        let mut host = MemoryHost::default();
        let c = host.create_container("x");
        let red = Color::rgb8(255, 0, 0);
        let p = add(&mut host, c, 0.0, red);

        let mut sel = SelectionSet::new(HIGHLIGHT);
        assert!(sel.apply(&mut host, SelectionOp::Add(vec![candidate(p, c, 0)])));
        assert_eq!(sel.saved_color(p), Some(red));
        assert_eq!(host.fill_color(p), Some(HIGHLIGHT));
    }

    #[test]
    fn re_adding_is_idempotent() {
        let mut host = MemoryHost::default();
        let c = host.create_container("x");
        let p = add(&mut host, c, 0.0, Color::rgb8(1, 2, 3));

        let mut sel = SelectionSet::new(HIGHLIGHT);
        sel.apply(&mut host, SelectionOp::Add(vec![candidate(p, c, 0)]));
        assert!(!sel.apply(&mut host, SelectionOp::Add(vec![candidate(p, c, 0)])));
        assert_eq!(sel.len(), 1);
        assert_eq!(sel.saved_color(p), Some(Color::rgb8(1, 2, 3)));
    }

    #[test]
    fn clear_restores_exact_colors() {
        let mut host = MemoryHost::default();
        let c = host.create_container("x");
        let a = add(&mut host, c, 0.0, Color::rgb8(1, 2, 3));
        let b = add(&mut host, c, 2.0, Color::rgb8(4, 5, 6).with_alpha(0.3));

        let mut sel = SelectionSet::new(HIGHLIGHT);
        sel.apply(
            &mut host,
            SelectionOp::Add(vec![candidate(a, c, 0), candidate(b, c, 1)]),
        );
        assert!(sel.apply(&mut host, SelectionOp::Clear));
        assert!(sel.is_empty());
        assert_eq!(host.fill_color(a), Some(Color::rgb8(1, 2, 3)));
        assert_eq!(host.fill_color(b), Some(Color::rgb8(4, 5, 6).with_alpha(0.3)));
        assert!(!sel.apply(&mut host, SelectionOp::Clear));
    }

    #[test]
    fn replace_restores_previous_before_selecting() {
        let mut host = MemoryHost::default();
        let c = host.create_container("x");
        let a = add(&mut host, c, 0.0, Color::rgb8(1, 2, 3));
        let b = add(&mut host, c, 2.0, Color::rgb8(4, 5, 6));

        let mut sel = SelectionSet::new(HIGHLIGHT);
        sel.apply(&mut host, SelectionOp::Replace(Some(candidate(a, c, 0))));
        assert!(sel.apply(&mut host, SelectionOp::Replace(Some(candidate(b, c, 1)))));
        assert_eq!(host.fill_color(a), Some(Color::rgb8(1, 2, 3)));
        assert_eq!(host.fill_color(b), Some(HIGHLIGHT));
        assert_eq!(sel.len(), 1);

        assert!(!sel.apply(&mut host, SelectionOp::Replace(Some(candidate(b, c, 1)))));
        assert_eq!(sel.saved_color(b), Some(Color::rgb8(4, 5, 6)));

        assert!(sel.apply(&mut host, SelectionOp::Replace(None)));
        assert!(sel.is_empty());
        assert_eq!(host.fill_color(b), Some(Color::rgb8(4, 5, 6)));
    }

    #[test]
    fn forget_container_drops_only_its_entries() {
        let mut host = MemoryHost::default();
        let c1 = host.create_container("one");
        let c2 = host.create_container("two");
        let a = add(&mut host, c1, 0.0, Color::rgb8(1, 2, 3));
        let b = add(&mut host, c2, 2.0, Color::rgb8(4, 5, 6));

        let mut sel = SelectionSet::new(HIGHLIGHT);
        sel.apply(
            &mut host,
            SelectionOp::Add(vec![candidate(a, c1, 0), candidate(b, c2, 0)]),
        );
        assert!(sel.apply(&mut host, SelectionOp::ForgetContainer(c1)));
        assert!(!sel.contains(a));
        assert!(sel.contains(b));
        assert_eq!(sel.len(), 1);
        assert!(!sel.apply(&mut host, SelectionOp::ForgetContainer(c1)));
    }

    #[test]
    fn dead_primitives_are_never_selected() {
        let mut host = MemoryHost::default();
        let c = host.create_container("x");
        let p = add(&mut host, c, 0.0, Color::rgb8(1, 2, 3));
        host.clear_container(c);

        let mut sel = SelectionSet::new(HIGHLIGHT);
        assert!(!sel.apply(&mut host, SelectionOp::Add(vec![candidate(p, c, 0)])));
        assert!(sel.is_empty());
    }
}
