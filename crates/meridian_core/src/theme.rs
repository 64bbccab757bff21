//! Theme model: style keys, values, and the ordered key/value theme.
//!
//! Themes are attached to nodes and shared by reference count. Resolution
//! happens during traversal: a node's own keys override the nearest
//! ancestor's resolved value, falling through to the process-wide defaults.

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red component (0-1).
    pub r: f32,
    /// Green component (0-1).
    pub g: f32,
    /// Blue component (0-1).
    pub b: f32,
    /// Alpha component (0-1).
    pub a: f32,
}

impl Color {
    /// Transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);
    /// Solid black.
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    /// Solid white.
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    /// Creates a color from RGBA values (0-1).
    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from RGB values (0-1) with full alpha.
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Creates a color from a hex value (0xRRGGBBAA).
    #[must_use]
    pub const fn hex(hex: u32) -> Self {
        let r = ((hex >> 24) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let b = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let a = (hex & 0xFF) as f32 / 255.0;
        Self::rgba(r, g, b, a)
    }

    /// Returns a new color with different alpha.
    #[must_use]
    pub const fn with_alpha(self, a: f32) -> Self {
        Self::rgba(self.r, self.g, self.b, a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// The closed set of style attributes a theme may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleKey {
    /// Background fill color.
    BackgroundColor,
    /// Border stroke color.
    BorderColor,
    /// Text color.
    TextColor,
    /// Accent color for interactive states.
    AccentColor,
    /// Content padding.
    Padding,
    /// Gap between children.
    Spacing,
    /// Corner radius.
    CornerRadius,
    /// Border stroke width.
    BorderWidth,
    /// Font size.
    FontSize,
}

impl StyleKey {
    /// All style keys, in resolution order.
    pub const ALL: [Self; 9] = [
        Self::BackgroundColor,
        Self::BorderColor,
        Self::TextColor,
        Self::AccentColor,
        Self::Padding,
        Self::Spacing,
        Self::CornerRadius,
        Self::BorderWidth,
        Self::FontSize,
    ];

    /// Returns the process-wide default value for this key.
    ///
    /// This is the bottom of the resolution chain: own keys, then ancestor
    /// values, then these defaults.
    #[must_use]
    pub const fn default_value(self) -> StyleValue {
        match self {
            Self::BackgroundColor => StyleValue::Color(Color::rgba(0.05, 0.05, 0.08, 1.0)),
            Self::BorderColor => StyleValue::Color(Color::rgba(0.2, 0.2, 0.25, 0.8)),
            Self::TextColor => StyleValue::Color(Color::rgba(0.9, 0.9, 0.9, 1.0)),
            Self::AccentColor => StyleValue::Color(Color::rgba(0.2, 0.9, 1.0, 1.0)),
            Self::Padding => StyleValue::Scalar(8.0),
            Self::Spacing => StyleValue::Scalar(4.0),
            Self::CornerRadius => StyleValue::Scalar(4.0),
            Self::BorderWidth => StyleValue::Scalar(1.0),
            Self::FontSize => StyleValue::Scalar(14.0),
        }
    }
}

/// A style value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleValue {
    /// A color value.
    Color(Color),
    /// A scalar value (padding, radius, font size, ...).
    Scalar(f32),
}

/// An ordered mapping from style key to value.
///
/// Insertion order is preserved; setting an existing key updates it in
/// place. A theme holds only the delta it declares: resolution falls
/// through to ancestors and then [`StyleKey::default_value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Theme {
    entries: Vec<(StyleKey, StyleValue)>,
}

impl Theme {
    /// Creates an empty theme.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: StyleKey, value: StyleValue) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a key, updating it in place if already declared.
    pub fn set(&mut self, key: StyleKey, value: StyleValue) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Returns the declared value for a key, if any.
    #[must_use]
    pub fn get(&self, key: StyleKey) -> Option<StyleValue> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// Returns the number of declared keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no keys are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the declared entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (StyleKey, StyleValue)> + '_ {
        self.entries.iter().copied()
    }
}
