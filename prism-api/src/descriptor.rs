//! Descriptors - immutable trait maps presented to every construction call.
//!
//! A descriptor is an ordered mapping from `TraitTag` to `TraitValue`, plus an
//! optional list of dependency hints: units a caller pre-supplies so that
//! capability seeking finds them before walking the entity tree.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::UnitId;

/// The tag of a trait inside a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraitTag {
    /// Name of a unit, a font file, or a cursor role.
    Name,
    /// Scalar size (font pixels) or 2D extent (images, windows).
    Size,
    /// Filesystem path of the resource a unit was made from.
    Path,
    /// Raw payload, usually a pixel block.
    Data,
    /// Clipboard text.
    Clipboard,
    /// Glyph ranges to rasterize for a font.
    Charset,
    /// Color style of a GUI system.
    Style,
    /// Body text of a widget.
    Text,
    /// Cursor role a widget requests while displayed.
    Cursor,
    /// Generic integer count.
    Count,
}

/// Layout of the pixels inside a `PixelBlock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    Rgba8,
    Alpha8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Alpha8 => 1,
        }
    }
}

/// A raw block of pixels, tagged with its format.
#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelBlock {
    pub format: PixelFormat,
    pub bytes: Vec<u8>,
}

impl PixelBlock {
    pub fn rgba(bytes: Vec<u8>) -> Self {
        Self {
            format: PixelFormat::Rgba8,
            bytes,
        }
    }

    /// Number of whole pixels in the block.
    pub fn pixel_count(&self) -> usize {
        self.bytes.len() / self.format.bytes_per_pixel()
    }
}

impl fmt::Debug for PixelBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBlock")
            .field("format", &self.format)
            .field("pixels", &self.pixel_count())
            .finish()
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// The value of a trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TraitValue {
    Text(String),
    Real(f32),
    Integer(i64),
    Bool(bool),
    Extent(Extent),
    Pixels(PixelBlock),
}

impl From<&str> for TraitValue {
    fn from(value: &str) -> Self {
        TraitValue::Text(value.to_string())
    }
}

impl From<String> for TraitValue {
    fn from(value: String) -> Self {
        TraitValue::Text(value)
    }
}

impl From<f32> for TraitValue {
    fn from(value: f32) -> Self {
        TraitValue::Real(value)
    }
}

impl From<i64> for TraitValue {
    fn from(value: i64) -> Self {
        TraitValue::Integer(value)
    }
}

impl From<bool> for TraitValue {
    fn from(value: bool) -> Self {
        TraitValue::Bool(value)
    }
}

impl From<Extent> for TraitValue {
    fn from(value: Extent) -> Self {
        TraitValue::Extent(value)
    }
}

impl From<PixelBlock> for TraitValue {
    fn from(value: PixelBlock) -> Self {
        TraitValue::Pixels(value)
    }
}

/// An immutable, order-preserving trait map.
///
/// Built once with the `with*` builders, then only read. Two descriptors are
/// equal when their traits are equal; hints do not take part in equality.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Descriptor {
    traits: IndexMap<TraitTag, TraitValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    hints: Vec<UnitId>,
}

impl Descriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a trait.
    pub fn with(mut self, tag: TraitTag, value: impl Into<TraitValue>) -> Self {
        self.traits.insert(tag, value.into());
        self
    }

    /// Pre-supply a dependency: seeking consults hints before the entity tree.
    pub fn with_hint(mut self, unit: UnitId) -> Self {
        if !self.hints.contains(&unit) {
            self.hints.push(unit);
        }
        self
    }

    pub fn get(&self, tag: TraitTag) -> Option<&TraitValue> {
        self.traits.get(&tag)
    }

    pub fn contains(&self, tag: TraitTag) -> bool {
        self.traits.contains_key(&tag)
    }

    /// Text trait, if present and textual.
    pub fn text(&self, tag: TraitTag) -> Option<&str> {
        match self.traits.get(&tag)? {
            TraitValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Scalar trait. Integers are widened.
    pub fn real(&self, tag: TraitTag) -> Option<f32> {
        match self.traits.get(&tag)? {
            TraitValue::Real(value) => Some(*value),
            TraitValue::Integer(value) => Some(*value as f32),
            _ => None,
        }
    }

    pub fn integer(&self, tag: TraitTag) -> Option<i64> {
        match self.traits.get(&tag)? {
            TraitValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn extent(&self, tag: TraitTag) -> Option<Extent> {
        match self.traits.get(&tag)? {
            TraitValue::Extent(extent) => Some(*extent),
            _ => None,
        }
    }

    pub fn pixels(&self, tag: TraitTag) -> Option<&PixelBlock> {
        match self.traits.get(&tag)? {
            TraitValue::Pixels(block) => Some(block),
            _ => None,
        }
    }

    pub fn hints(&self) -> &[UnitId] {
        &self.hints
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TraitTag, &TraitValue)> {
        self.traits.iter()
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        // IndexMap equality ignores order, which is what identity needs
        self.traits == other.traits
    }
}

/// Key under which a unique-keyed factory stores an instance.
///
/// Derived from the identity-relevant traits of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let desc = Descriptor::new()
            .with(TraitTag::Name, "default")
            .with(TraitTag::Size, 16.0f32)
            .with(TraitTag::Count, 3i64);

        assert_eq!(desc.text(TraitTag::Name), Some("default"));
        assert_eq!(desc.real(TraitTag::Size), Some(16.0));
        assert_eq!(desc.real(TraitTag::Count), Some(3.0));
        assert_eq!(desc.extent(TraitTag::Size), None);
        assert_eq!(desc.text(TraitTag::Path), None);
    }

    #[test]
    fn test_order_is_preserved() {
        let desc = Descriptor::new()
            .with(TraitTag::Size, 12.0f32)
            .with(TraitTag::Name, "a");
        let tags: Vec<_> = desc.iter().map(|(tag, _)| *tag).collect();
        assert_eq!(tags, vec![TraitTag::Size, TraitTag::Name]);
    }

    #[test]
    fn test_equality_ignores_hints() {
        let a = Descriptor::new().with(TraitTag::Name, "x");
        let b = Descriptor::new()
            .with(TraitTag::Name, "x")
            .with_hint(UnitId(7));
        assert_eq!(a, b);
        assert_ne!(a, Descriptor::new().with(TraitTag::Name, "y"));
    }

    #[test]
    fn test_json_round_trip_keeps_traits() {
        let desc = Descriptor::new()
            .with(TraitTag::Name, "default")
            .with(TraitTag::Size, Extent::new(4, 2));
        let json = serde_json::to_string(&desc).unwrap();
        let back: Descriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
    }

    #[test]
    fn test_pixel_block_count() {
        let block = PixelBlock::rgba(vec![0; 16]);
        assert_eq!(block.pixel_count(), 4);
    }
}
