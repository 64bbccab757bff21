//! Scoped theme resolution during traversal.
//!
//! Entering a node with a non-empty theme pushes it; leaving the subtree
//! pops it, on the success and the error path alike. Resolution for a key
//! is the topmost theme declaring it, falling through to the process-wide
//! defaults. A theme attached mid-frame is invisible until the next
//! snapshot; the stack only ever sees the frame's captured references.

use meridian_core::{Color, StyleKey, StyleValue, Theme};
use std::sync::Arc;

/// Fully resolved style for one node, handed to the backend with each draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    /// Background fill color.
    pub background: Color,
    /// Border stroke color.
    pub border: Color,
    /// Text color.
    pub text: Color,
    /// Accent color.
    pub accent: Color,
    /// Content padding.
    pub padding: f32,
    /// Gap between children.
    pub spacing: f32,
    /// Corner radius.
    pub corner_radius: f32,
    /// Border stroke width.
    pub border_width: f32,
    /// Font size.
    pub font_size: f32,
}

impl Default for ResolvedStyle {
    /// The process-wide default style (every key at its default value).
    fn default() -> Self {
        ThemeStack::new().resolved_style()
    }
}

/// The traversal-scoped stack of active themes.
///
/// Push/pop pairing is owned by the traversal: push on entering a node
/// with a non-empty theme, pop when leaving its subtree.
#[derive(Debug, Default)]
pub struct ThemeStack {
    stack: Vec<Arc<Theme>>,
}

impl ThemeStack {
    /// Creates an empty stack; resolution yields process defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a theme delta for the subtree being entered.
    pub fn push(&mut self, theme: Arc<Theme>) {
        self.stack.push(theme);
    }

    /// Pops the most recent theme delta.
    pub fn pop(&mut self) {
        self.stack.pop();
    }

    /// Returns the number of active themes.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Resolves one key: nearest pushed theme declaring it, else default.
    #[must_use]
    pub fn resolve(&self, key: StyleKey) -> StyleValue {
        for theme in self.stack.iter().rev() {
            if let Some(value) = theme.get(key) {
                return value;
            }
        }
        key.default_value()
    }

    /// Resolves every key into a concrete [`ResolvedStyle`].
    #[must_use]
    pub fn resolved_style(&self) -> ResolvedStyle {
        ResolvedStyle {
            background: self.color(StyleKey::BackgroundColor),
            border: self.color(StyleKey::BorderColor),
            text: self.color(StyleKey::TextColor),
            accent: self.color(StyleKey::AccentColor),
            padding: self.scalar(StyleKey::Padding),
            spacing: self.scalar(StyleKey::Spacing),
            corner_radius: self.scalar(StyleKey::CornerRadius),
            border_width: self.scalar(StyleKey::BorderWidth),
            font_size: self.scalar(StyleKey::FontSize),
        }
    }

    /// Resolves a color key; a mistyped theme value falls back to the
    /// process default.
    fn color(&self, key: StyleKey) -> Color {
        match self.resolve(key) {
            StyleValue::Color(color) => color,
            StyleValue::Scalar(_) => match key.default_value() {
                StyleValue::Color(color) => color,
                StyleValue::Scalar(_) => Color::default(),
            },
        }
    }

    /// Resolves a scalar key; a mistyped theme value falls back to the
    /// process default.
    fn scalar(&self, key: StyleKey) -> f32 {
        match self.resolve(key) {
            StyleValue::Scalar(value) => value,
            StyleValue::Color(_) => match key.default_value() {
                StyleValue::Scalar(value) => value,
                StyleValue::Color(_) => 0.0,
            },
        }
    }
}
