//! Core item types: identifiers, flags, kinds and layout directives.

use crate::handler::Handler;
use crate::theme::Theme;
use std::fmt;
use std::sync::Arc;

/// Stable identifier for an item in the tree.
///
/// An `ItemId` is an arena index plus a generation counter. Slot reuse bumps
/// the generation, so an id held after its node was swept never aliases a
/// newer node: lookups with a stale id simply return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId {
    index: u32,
    generation: u32,
}

impl ItemId {
    /// Creates an id from raw parts. Only the tree allocates meaningful ids.
    #[must_use]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the arena slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the slot generation this id was minted for.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Item state flags (bitfield for efficiency).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemFlags(u32);

impl ItemFlags {
    /// Item is visible; hidden subtrees are skipped by traversal.
    pub const VISIBLE: u32 = 1 << 0;
    /// Item is enabled and can receive input events.
    pub const ENABLED: u32 = 1 << 1;
    /// Item needs layout recalculation.
    pub const DIRTY_LAYOUT: u32 = 1 << 2;
    /// Item was detached and awaits the between-frames sweep.
    pub const PENDING_DELETE: u32 = 1 << 3;
    /// Item was hovered as of the last completed frame.
    pub const HOVERED: u32 = 1 << 4;
    /// Item was pressed as of the last completed frame.
    pub const PRESSED: u32 = 1 << 5;
    /// Container lays its children out on a single row/column, never
    /// wrapping to the next line.
    pub const NO_WRAP: u32 = 1 << 6;

    /// Default flags for a new item.
    pub const DEFAULT: Self = Self(Self::VISIBLE | Self::ENABLED | Self::DIRTY_LAYOUT);

    /// Creates flags with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    /// Returns true if the flag is set.
    #[inline]
    #[must_use]
    pub const fn has(self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    /// Sets a flag.
    #[inline]
    pub fn set(&mut self, flag: u32) {
        self.0 |= flag;
    }

    /// Clears a flag.
    #[inline]
    pub fn clear(&mut self, flag: u32) {
        self.0 &= !flag;
    }
}

impl Default for ItemFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A rectangle in backend coordinates (origin top-left).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// X position (left edge).
    pub x: f32,
    /// Y position (top edge).
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Rect {
    /// A zero-sized rect at the origin.
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    /// Creates a new rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Returns the right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Returns the bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Returns the size as a tuple.
    #[must_use]
    pub const fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Returns true if the point is inside the rectangle.
    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Shrinks the rectangle by the given amount on all sides.
    ///
    /// Width and height are clamped at zero.
    #[must_use]
    pub fn shrink(&self, amount: f32) -> Self {
        Self::new(
            self.x + amount,
            self.y + amount,
            (self.width - amount * 2.0).max(0.0),
            (self.height - amount * 2.0).max(0.0),
        )
    }
}

/// Catalog of draw primitives the core exercises.
///
/// The full primitive catalog lives behind the backend; these three are the
/// closed set the tree runtime itself knows how to size and submit.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveKind {
    /// A filled or outlined rectangle with an intrinsic size.
    Rectangle {
        /// Intrinsic width.
        width: f32,
        /// Intrinsic height.
        height: f32,
        /// Filled vs. outline-only.
        filled: bool,
    },
    /// A run of text.
    Text {
        /// The text content.
        content: String,
    },
    /// A thin separator line across the available extent.
    Separator,
}

/// What an item in the tree is.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    /// A layout container; draws nothing itself.
    Container,
    /// A draw primitive.
    Primitive(PrimitiveKind),
    /// An interactive widget carrying a retained value (slider-like).
    Widget {
        /// The retained value, updated from backend interaction results.
        value: f64,
    },
}

/// Requested extent along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SizeSpec {
    /// Size is resolved by the layout engine.
    #[default]
    Auto,
    /// Exact size in backend units.
    Fixed(f32),
}

/// Cross-axis alignment of an item within its layout row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Align to start (left/top).
    #[default]
    Start,
    /// Align to center.
    Center,
    /// Align to end (right/bottom).
    End,
}

/// Main-axis direction for a container's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Children flow left to right, wrapping to new rows.
    #[default]
    Horizontal,
    /// Children flow top to bottom, wrapping to new columns.
    Vertical,
}

/// Per-item layout directives consumed by the layout engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSpec {
    /// Requested width.
    pub width: SizeSpec,
    /// Requested height.
    pub height: SizeSpec,
    /// Flow direction for this item's children.
    pub direction: Direction,
    /// Cross-axis alignment within the layout row.
    pub align: Alignment,
    /// Gap between children.
    pub spacing: f32,
    /// Padding around this item's content area.
    pub padding: f32,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            width: SizeSpec::Auto,
            height: SizeSpec::Auto,
            direction: Direction::Horizontal,
            align: Alignment::Start,
            spacing: 0.0,
            padding: 0.0,
        }
    }
}

impl LayoutSpec {
    /// Sets a fixed size on both axes.
    #[must_use]
    pub const fn with_fixed_size(mut self, width: f32, height: f32) -> Self {
        self.width = SizeSpec::Fixed(width);
        self.height = SizeSpec::Fixed(height);
        self
    }

    /// Sets the flow direction for children.
    #[must_use]
    pub const fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the cross-axis alignment.
    #[must_use]
    pub const fn with_align(mut self, align: Alignment) -> Self {
        self.align = align;
        self
    }

    /// Sets the gap between children.
    #[must_use]
    pub const fn with_spacing(mut self, spacing: f32) -> Self {
        self.spacing = spacing;
        self
    }

    /// Sets the content padding.
    #[must_use]
    pub const fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self
    }
}

/// A node of the retained item tree.
///
/// Constructed by the application, then handed to
/// [`ItemTree::insert`](crate::tree::ItemTree::insert), which assigns the id
/// and parent link.
pub struct ItemNode {
    /// Identity; assigned by the tree on insert.
    pub(crate) id: ItemId,
    /// Optional label for lookup and diagnostics.
    pub(crate) label: Option<String>,
    /// What this item is.
    pub(crate) kind: ItemKind,
    /// Non-owning back-reference to the parent. Never controls lifetime.
    pub(crate) parent: Option<ItemId>,
    /// Owned, ordered child list. Order defines paint/traversal order.
    pub(crate) children: Vec<ItemId>,
    /// State flags.
    pub(crate) flags: ItemFlags,
    /// Layout directives.
    pub(crate) layout: LayoutSpec,
    /// Resolved rect from the last completed frame.
    pub(crate) resolved: Rect,
    /// Attached theme, shared across nodes by reference count.
    pub(crate) theme: Option<Arc<Theme>>,
    /// Attached handlers, invoked in attachment order.
    pub(crate) handlers: Vec<Arc<dyn Handler>>,
}

impl ItemNode {
    /// Creates a detached node of the given kind with default flags.
    #[must_use]
    pub fn new(kind: ItemKind) -> Self {
        Self {
            id: ItemId::new(u32::MAX, 0),
            label: None,
            kind,
            parent: None,
            children: Vec::new(),
            flags: ItemFlags::DEFAULT,
            layout: LayoutSpec::default(),
            resolved: Rect::ZERO,
            theme: None,
            handlers: Vec::new(),
        }
    }

    /// Creates a container node.
    #[must_use]
    pub fn container() -> Self {
        Self::new(ItemKind::Container)
    }

    /// Sets a label used by [`find_by_label`](crate::tree::ItemTree::find_by_label).
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the layout directives.
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutSpec) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the no-wrap flag: children stay on a single row/column.
    #[must_use]
    pub fn with_no_wrap(mut self) -> Self {
        self.flags.set(ItemFlags::NO_WRAP);
        self
    }

    /// Returns the node's id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Returns the node's label, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the node's kind.
    #[must_use]
    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    /// Returns the parent id, or `None` for the root or a detached node.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<ItemId> {
        self.parent
    }

    /// Returns the ordered child id list.
    #[must_use]
    pub fn children(&self) -> &[ItemId] {
        &self.children
    }

    /// Returns the state flags.
    #[inline]
    #[must_use]
    pub fn flags(&self) -> ItemFlags {
        self.flags
    }

    /// Returns the layout directives.
    #[inline]
    #[must_use]
    pub fn layout(&self) -> &LayoutSpec {
        &self.layout
    }

    /// Returns the rect resolved by the last completed frame.
    #[inline]
    #[must_use]
    pub fn resolved(&self) -> Rect {
        self.resolved
    }

    /// Returns the attached theme, if any.
    #[must_use]
    pub fn theme(&self) -> Option<&Arc<Theme>> {
        self.theme.as_ref()
    }

    /// Returns the attached handlers in attachment order.
    #[must_use]
    pub fn handlers(&self) -> &[Arc<dyn Handler>] {
        &self.handlers
    }

    /// Returns true if the item is visible.
    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.flags.has(ItemFlags::VISIBLE)
    }

    /// Returns true if the item is pending delete.
    #[inline]
    #[must_use]
    pub fn is_pending_delete(&self) -> bool {
        self.flags.has(ItemFlags::PENDING_DELETE)
    }
}

impl fmt::Debug for ItemNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemNode")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("flags", &self.flags)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_default() {
        let flags = ItemFlags::new();
        assert!(flags.has(ItemFlags::VISIBLE));
        assert!(flags.has(ItemFlags::ENABLED));
        assert!(flags.has(ItemFlags::DIRTY_LAYOUT));
        assert!(!flags.has(ItemFlags::PENDING_DELETE));
    }

    #[test]
    fn test_flags_set_clear() {
        let mut flags = ItemFlags::new();
        flags.set(ItemFlags::HOVERED);
        assert!(flags.has(ItemFlags::HOVERED));
        flags.clear(ItemFlags::HOVERED);
        assert!(!flags.has(ItemFlags::HOVERED));
    }

    #[test]
    fn test_rect_contains() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert!(rect.contains(10.0, 20.0));
        assert!(rect.contains(50.0, 30.0));
        assert!(!rect.contains(110.0, 30.0));
        assert!(!rect.contains(50.0, 70.0));
    }

    #[test]
    fn test_rect_shrink_clamps() {
        let rect = Rect::new(0.0, 0.0, 4.0, 4.0);
        let shrunk = rect.shrink(3.0);
        assert_eq!(shrunk.width, 0.0);
        assert_eq!(shrunk.height, 0.0);
    }

    #[test]
    fn test_node_builder() {
        let node = ItemNode::container()
            .with_label("panel")
            .with_layout(LayoutSpec::default().with_fixed_size(100.0, 100.0))
            .with_no_wrap();
        assert_eq!(node.label(), Some("panel"));
        assert!(node.flags().has(ItemFlags::NO_WRAP));
        assert_eq!(node.layout().width, SizeSpec::Fixed(100.0));
    }
}
