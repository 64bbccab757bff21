//! Two-pass layout resolution over a frame snapshot.
//!
//! *Measure* computes an intrinsic/requested size for each node. Container
//! auto-sizing uses the previous frame's resolved child sizes, which keeps
//! the pass top-down at the cost of a one-frame lag for size-dependent
//! parents: deeply nested auto-sized trees converge one level per frame.
//! The first frame treats unknown child extents as zero.
//!
//! *Place* assigns absolute rects top-down from the parent-resolved origin.
//! Children flow along the container's main axis, wrapping to the next
//! row/column when they exceed the available extent unless the container
//! carries the no-wrap flag. Auto-sized siblings split the remaining
//! main-axis space equally, floor-rounded, with the remainder assigned to
//! the last auto sibling. Zero children yield zero intrinsic size, not an
//! error.

use meridian_core::{
    Direction, FrameSnapshot, ItemFlags, ItemId, ItemKind, PrimitiveKind, Rect, SizeSpec,
};
use meridian_core::Alignment;
use std::collections::HashMap;

/// Resolved sizes per node, carried across frames as the measure estimate.
pub type SizeMap = HashMap<ItemId, (f32, f32)>;

/// Output of one layout pass.
#[derive(Debug, Default)]
pub struct LayoutResult {
    /// Absolute rect per visited node.
    pub rects: HashMap<ItemId, Rect>,
    /// Resolved size per visited node; next frame's measure estimate.
    pub sizes: SizeMap,
}

/// Estimated glyph advance for text measurement, backend units.
const CHAR_WIDTH: f32 = 8.0;
/// Estimated line height for text measurement, backend units.
const LINE_HEIGHT: f32 = 16.0;
/// Separator thickness across the flow direction.
const SEPARATOR_THICKNESS: f32 = 1.0;
/// Default control size for widgets without an explicit request.
const WIDGET_SIZE: (f32, f32) = (80.0, 20.0);

/// Flow bookkeeping for one child during row formation.
struct ChildFlow {
    position: usize,
    flow_main: f32,
    main_auto: bool,
    cross_spec: SizeSpec,
}

/// The layout engine. Deterministic: identical snapshot + identical
/// previous sizes always resolve to identical rects.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    viewport: (f32, f32),
}

impl LayoutEngine {
    /// Creates an engine placing the root into the given viewport.
    #[must_use]
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            viewport: (viewport_width, viewport_height),
        }
    }

    /// Resolves rects and sizes for every node in the snapshot.
    #[must_use]
    pub fn resolve(&self, snapshot: &FrameSnapshot, previous: &SizeMap) -> LayoutResult {
        let mut result = LayoutResult {
            rects: HashMap::with_capacity(snapshot.len()),
            sizes: HashMap::with_capacity(snapshot.len()),
        };
        if snapshot.is_empty() {
            return result;
        }
        let root_rect = Rect::new(0.0, 0.0, self.viewport.0, self.viewport.1);
        self.place(snapshot, FrameSnapshot::ROOT, root_rect, previous, &mut result);
        result
    }

    /// Measure pass for one node: requested size, auto axes from intrinsic.
    fn measure(&self, snapshot: &FrameSnapshot, position: usize, previous: &SizeMap) -> (f32, f32) {
        let node = snapshot.node(position);
        let intrinsic = self.intrinsic(snapshot, position, previous);
        let width = match node.layout.width {
            SizeSpec::Fixed(value) => value,
            SizeSpec::Auto => intrinsic.0,
        };
        let height = match node.layout.height {
            SizeSpec::Fixed(value) => value,
            SizeSpec::Auto => intrinsic.1,
        };
        (width, height)
    }

    /// Intrinsic size per kind. Containers combine previous-frame child
    /// sizes along the flow direction (the documented one-frame lag).
    fn intrinsic(&self, snapshot: &FrameSnapshot, position: usize, previous: &SizeMap) -> (f32, f32) {
        let node = snapshot.node(position);
        match &node.kind {
            ItemKind::Primitive(PrimitiveKind::Rectangle { width, height, .. }) => (*width, *height),
            #[allow(clippy::cast_precision_loss)]
            ItemKind::Primitive(PrimitiveKind::Text { content }) => {
                (content.chars().count() as f32 * CHAR_WIDTH, LINE_HEIGHT)
            }
            ItemKind::Primitive(PrimitiveKind::Separator) => (0.0, SEPARATOR_THICKNESS),
            ItemKind::Widget { .. } => WIDGET_SIZE,
            ItemKind::Container => {
                if node.children.is_empty() {
                    return (0.0, 0.0);
                }
                let spacing = node.layout.spacing;
                let padding = node.layout.padding * 2.0;
                let mut main = 0.0_f32;
                let mut cross = 0.0_f32;
                for &child in &node.children {
                    let id = snapshot.node(child).id;
                    let (w, h) = previous.get(&id).copied().unwrap_or((0.0, 0.0));
                    let (child_main, child_cross) = match node.layout.direction {
                        Direction::Horizontal => (w, h),
                        Direction::Vertical => (h, w),
                    };
                    main += child_main;
                    cross = cross.max(child_cross);
                }
                #[allow(clippy::cast_precision_loss)]
                let gaps = spacing * (node.children.len() - 1) as f32;
                main += gaps + padding;
                cross += padding;
                match node.layout.direction {
                    Direction::Horizontal => (main, cross),
                    Direction::Vertical => (cross, main),
                }
            }
        }
    }

    /// Place pass: records this node's rect, then lays out its children in
    /// wrap-aware rows and recurses.
    fn place(
        &self,
        snapshot: &FrameSnapshot,
        position: usize,
        rect: Rect,
        previous: &SizeMap,
        result: &mut LayoutResult,
    ) {
        let node = snapshot.node(position);
        result.rects.insert(node.id, rect);
        result.sizes.insert(node.id, rect.size());

        if node.children.is_empty() {
            return;
        }

        let content = rect.shrink(node.layout.padding);
        let horizontal = node.layout.direction == Direction::Horizontal;
        let (extent_main, extent_cross) = if horizontal {
            (content.width, content.height)
        } else {
            (content.height, content.width)
        };
        let spacing = node.layout.spacing;
        let no_wrap = node.flags.has(ItemFlags::NO_WRAP);

        // Row formation: greedy along the main axis, fixed and intrinsic
        // flow sizes decide the breaks.
        let mut rows: Vec<Vec<ChildFlow>> = Vec::new();
        let mut row: Vec<ChildFlow> = Vec::new();
        let mut cursor = 0.0_f32;
        for &child_position in &node.children {
            let child = snapshot.node(child_position);
            let intrinsic = self.measure(snapshot, child_position, previous);
            let (main_spec, cross_spec) = if horizontal {
                (child.layout.width, child.layout.height)
            } else {
                (child.layout.height, child.layout.width)
            };
            let (flow_main, main_auto) = match main_spec {
                SizeSpec::Fixed(value) => (value, false),
                SizeSpec::Auto => (if horizontal { intrinsic.0 } else { intrinsic.1 }, true),
            };

            let advance = if row.is_empty() { flow_main } else { flow_main + spacing };
            if !no_wrap && !row.is_empty() && cursor + advance > extent_main {
                rows.push(std::mem::take(&mut row));
                cursor = 0.0;
            }
            cursor += if row.is_empty() { flow_main } else { flow_main + spacing };
            row.push(ChildFlow {
                position: child_position,
                flow_main,
                main_auto,
                cross_spec,
            });
        }
        if !row.is_empty() {
            rows.push(row);
        }

        // Row placement: distribute remaining main-axis space among auto
        // siblings, stretch auto cross extents to the row.
        let mut cross_cursor = 0.0_f32;
        for row in &rows {
            #[allow(clippy::cast_precision_loss)]
            let gaps = spacing * (row.len() - 1) as f32;
            let fixed_total: f32 = row
                .iter()
                .filter(|c| !c.main_auto)
                .map(|c| c.flow_main)
                .sum();
            let auto_count = row.iter().filter(|c| c.main_auto).count();
            let remaining = extent_main - fixed_total - gaps;
            #[allow(clippy::cast_precision_loss)]
            let share = if auto_count > 0 && remaining > 0.0 {
                (remaining / auto_count as f32).floor()
            } else {
                0.0
            };

            // Cross extent of the row: tallest fixed request, or the rest
            // of the container if every child stretches.
            let row_cross = row
                .iter()
                .filter_map(|c| match c.cross_spec {
                    SizeSpec::Fixed(value) => Some(value),
                    SizeSpec::Auto => None,
                })
                .fold(f32::NAN, f32::max);
            let row_cross = if row_cross.is_nan() {
                (extent_cross - cross_cursor).max(0.0)
            } else {
                row_cross
            };

            let mut main_cursor = 0.0_f32;
            let mut autos_placed = 0;
            for child in row {
                let main_size = if child.main_auto {
                    autos_placed += 1;
                    if remaining > 0.0 {
                        if autos_placed == auto_count {
                            // Floor rounding leaves the remainder to the
                            // last auto sibling.
                            #[allow(clippy::cast_precision_loss)]
                            let consumed = share * (auto_count - 1) as f32;
                            remaining - consumed
                        } else {
                            share
                        }
                    } else {
                        child.flow_main
                    }
                } else {
                    child.flow_main
                };
                let cross_size = match child.cross_spec {
                    SizeSpec::Fixed(value) => value,
                    SizeSpec::Auto => row_cross,
                };
                let cross_offset = match snapshot.node(child.position).layout.align {
                    Alignment::Start => 0.0,
                    Alignment::Center => ((row_cross - cross_size) * 0.5).max(0.0),
                    Alignment::End => (row_cross - cross_size).max(0.0),
                };

                let child_rect = if horizontal {
                    Rect::new(
                        content.x + main_cursor,
                        content.y + cross_cursor + cross_offset,
                        main_size,
                        cross_size,
                    )
                } else {
                    Rect::new(
                        content.x + cross_cursor + cross_offset,
                        content.y + main_cursor,
                        cross_size,
                        main_size,
                    )
                };
                self.place(snapshot, child.position, child_rect, previous, result);
                main_cursor += main_size + spacing;
            }
            cross_cursor += row_cross + spacing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{ItemNode, ItemTree, LayoutSpec};

    fn fixed(width: f32, height: f32) -> ItemNode {
        ItemNode::container().with_layout(LayoutSpec::default().with_fixed_size(width, height))
    }

    #[test]
    fn test_zero_children_zero_intrinsic() {
        let mut tree = ItemTree::new();
        let a = tree.append(tree.root(), ItemNode::container()).unwrap();
        let snapshot = tree.snapshot();

        let engine = LayoutEngine::new(200.0, 100.0);
        let result = engine.resolve(&snapshot, &SizeMap::new());
        // Auto child of the root stretches into the viewport row; its own
        // intrinsic is zero, which the container measure reports.
        let position = snapshot.position_of(a).unwrap();
        assert_eq!(engine.intrinsic(&snapshot, position, &SizeMap::new()), (0.0, 0.0));
        assert!(result.rects.contains_key(&a));
    }

    #[test]
    fn test_fixed_sizes_resolve_exactly() {
        let mut tree = ItemTree::new();
        let root = tree.root();
        let a = tree.append(root, fixed(30.0, 20.0)).unwrap();
        let b = tree.append(root, fixed(40.0, 20.0)).unwrap();
        let snapshot = tree.snapshot();

        let engine = LayoutEngine::new(200.0, 100.0);
        let result = engine.resolve(&snapshot, &SizeMap::new());
        assert_eq!(result.rects[&a], Rect::new(0.0, 0.0, 30.0, 20.0));
        assert_eq!(result.rects[&b], Rect::new(30.0, 0.0, 40.0, 20.0));
    }

    #[test]
    fn test_auto_siblings_split_remaining_space() {
        let mut tree = ItemTree::new();
        let root = tree.root();
        let a = tree.append(root, fixed(100.0, 100.0)).unwrap();
        let b = tree.append(a, ItemNode::container()).unwrap();
        let c = tree.append(a, ItemNode::container()).unwrap();
        let snapshot = tree.snapshot();

        let engine = LayoutEngine::new(400.0, 300.0);
        let result = engine.resolve(&snapshot, &SizeMap::new());
        assert_eq!(result.sizes[&b], (50.0, 100.0));
        assert_eq!(result.sizes[&c], (50.0, 100.0));
        assert_eq!(result.rects[&c].x, 50.0);
    }

    #[test]
    fn test_auto_split_floor_remainder_to_last() {
        let mut tree = ItemTree::new();
        let root = tree.root();
        let parent = tree.append(root, fixed(100.0, 30.0)).unwrap();
        let a = tree.append(parent, ItemNode::container()).unwrap();
        let b = tree.append(parent, ItemNode::container()).unwrap();
        let c = tree.append(parent, ItemNode::container()).unwrap();
        let snapshot = tree.snapshot();

        let engine = LayoutEngine::new(400.0, 300.0);
        let result = engine.resolve(&snapshot, &SizeMap::new());
        assert_eq!(result.sizes[&a].0, 33.0);
        assert_eq!(result.sizes[&b].0, 33.0);
        assert_eq!(result.sizes[&c].0, 34.0);
    }

    #[test]
    fn test_wrap_to_next_row() {
        let mut tree = ItemTree::new();
        let root = tree.root();
        let parent = tree.append(root, fixed(100.0, 100.0)).unwrap();
        let a = tree.append(parent, fixed(60.0, 10.0)).unwrap();
        let b = tree.append(parent, fixed(60.0, 10.0)).unwrap();
        let snapshot = tree.snapshot();

        let engine = LayoutEngine::new(400.0, 300.0);
        let result = engine.resolve(&snapshot, &SizeMap::new());
        assert_eq!(result.rects[&a], Rect::new(0.0, 0.0, 60.0, 10.0));
        // 60 + 60 exceeds 100: second child wraps under the first.
        assert_eq!(result.rects[&b], Rect::new(0.0, 10.0, 60.0, 10.0));
    }

    #[test]
    fn test_no_wrap_keeps_single_row() {
        let mut tree = ItemTree::new();
        let root = tree.root();
        let parent = tree
            .append(
                root,
                fixed(100.0, 100.0).with_no_wrap(),
            )
            .unwrap();
        let a = tree.append(parent, fixed(60.0, 10.0)).unwrap();
        let b = tree.append(parent, fixed(60.0, 10.0)).unwrap();
        let snapshot = tree.snapshot();

        let engine = LayoutEngine::new(400.0, 300.0);
        let result = engine.resolve(&snapshot, &SizeMap::new());
        assert_eq!(result.rects[&a].y, result.rects[&b].y);
        assert_eq!(result.rects[&b].x, 60.0);
    }

    #[test]
    fn test_vertical_direction() {
        let mut tree = ItemTree::new();
        let root = tree.root();
        let parent = tree
            .append(
                root,
                ItemNode::container().with_layout(
                    LayoutSpec::default()
                        .with_fixed_size(100.0, 200.0)
                        .with_direction(Direction::Vertical),
                ),
            )
            .unwrap();
        let a = tree.append(parent, fixed(20.0, 50.0)).unwrap();
        let b = tree.append(parent, fixed(20.0, 50.0)).unwrap();
        let snapshot = tree.snapshot();

        let engine = LayoutEngine::new(400.0, 300.0);
        let result = engine.resolve(&snapshot, &SizeMap::new());
        assert_eq!(result.rects[&a].y, 0.0);
        assert_eq!(result.rects[&b].y, 50.0);
        assert_eq!(result.rects[&a].x, result.rects[&b].x);
    }

    #[test]
    fn test_container_auto_uses_previous_frame_sizes() {
        let mut tree = ItemTree::new();
        let root = tree.root();
        let outer = tree
            .append(root, ItemNode::container().with_no_wrap())
            .unwrap();
        let inner = tree.append(outer, fixed(40.0, 25.0)).unwrap();
        let snapshot = tree.snapshot();

        let engine = LayoutEngine::new(400.0, 300.0);
        let position = snapshot.position_of(outer).unwrap();

        // Frame 1: no previous sizes, intrinsic is zero.
        assert_eq!(engine.intrinsic(&snapshot, position, &SizeMap::new()), (0.0, 0.0));

        // Frame 2: previous frame resolved the child, the lag closes.
        let first = engine.resolve(&snapshot, &SizeMap::new());
        assert_eq!(engine.intrinsic(&snapshot, position, &first.sizes), (40.0, 25.0));
        let _ = inner;
    }

    #[test]
    fn test_layout_is_deterministic() {
        let mut tree = ItemTree::new();
        let root = tree.root();
        let parent = tree.append(root, fixed(123.0, 77.0)).unwrap();
        for _ in 0..10 {
            tree.append(parent, ItemNode::container()).unwrap();
        }
        let snapshot = tree.snapshot();

        let engine = LayoutEngine::new(640.0, 480.0);
        let first = engine.resolve(&snapshot, &SizeMap::new());
        let second = engine.resolve(&snapshot, &SizeMap::new());
        assert_eq!(first.rects, second.rects);

        let third = engine.resolve(&snapshot, &first.sizes);
        let fourth = engine.resolve(&snapshot, &first.sizes);
        assert_eq!(third.rects, fourth.rects);
    }
}
