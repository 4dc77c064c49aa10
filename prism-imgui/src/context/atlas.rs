//! Font atlas - every font of a context packed into one RGBA texture.
//!
//! Fonts are added as sources (the built-in bitmap font or a parsed font
//! file) plus a size and charset. Building rasterizes every glyph with
//! fontdue, shelf-packs the bitmaps and stores them as white RGBA with
//! coverage in alpha. The texture itself lives on the GPU; the atlas only
//! remembers the handle it was uploaded as.

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fontdue::{Font, FontSettings};
use prism_api::GpuHandle;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::builtin;

/// Initial atlas edge; doubled until everything fits.
const INITIAL_ATLAS_SIZE: u32 = 256;

/// Maximum atlas size (8K is safe for most GPUs).
const MAX_ATLAS_SIZE: u32 = 8192;

/// Padding between packed glyphs.
const PADDING: u32 = 1;

/// Largest pixel size a font can be baked at.
pub const MAX_FONT_SIZE: f32 = 512.0;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("couldn't read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("couldn't parse font: {0}")]
    Parse(&'static str),

    #[error("glyphs don't fit in an 8192x8192 atlas")]
    TooLarge,

    #[error("font size must be in (0, 512], got {0}")]
    Size(f32),

    #[error("no font {0} in atlas")]
    UnknownFont(FontId),

    #[error("unknown charset: {0}")]
    UnknownCharset(String),
}

/// Identifier of a font inside one atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId(u32);

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which codepoints get rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    /// Basic Latin and Latin-1 Supplement.
    #[default]
    Default,
    /// Default plus Cyrillic and its supplements.
    Cyrillic,
    /// Default plus Greek and Coptic.
    Greek,
}

impl Charset {
    const LATIN: [RangeInclusive<u32>; 2] = [0x0020..=0x007E, 0x00A0..=0x00FF];

    pub fn ranges(self) -> Vec<RangeInclusive<u32>> {
        let mut ranges = Self::LATIN.to_vec();
        match self {
            Charset::Default => {}
            Charset::Cyrillic => {
                ranges.extend([0x0400..=0x052F, 0x2DE0..=0x2DFF, 0xA640..=0xA69F]);
            }
            Charset::Greek => ranges.push(0x0370..=0x03FF),
        }
        ranges
    }

    pub fn chars(self) -> impl Iterator<Item = char> {
        self.ranges()
            .into_iter()
            .flatten()
            .filter_map(char::from_u32)
    }

    pub fn name(self) -> &'static str {
        match self {
            Charset::Default => "default",
            Charset::Cyrillic => "cyrillic",
            Charset::Greek => "greek",
        }
    }
}

impl FromStr for Charset {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" | "latin" => Ok(Charset::Default),
            "cyrillic" => Ok(Charset::Cyrillic),
            "greek" => Ok(Charset::Greek),
            _ => Err(AtlasError::UnknownCharset(s.to_string())),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a font's glyph outlines come from.
pub enum FontSource {
    Builtin,
    File { path: PathBuf, font: Box<Font> },
}

impl FontSource {
    /// Read and parse a font file at `size` pixels.
    pub fn load(path: impl AsRef<Path>, size: f32) -> Result<Self, AtlasError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| AtlasError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = FontSettings {
            scale: size,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(bytes, settings).map_err(AtlasError::Parse)?;
        Ok(FontSource::File {
            path: path.to_path_buf(),
            font: Box::new(font),
        })
    }

    fn covers(&self, ch: char) -> bool {
        match self {
            FontSource::Builtin => builtin::covers(ch),
            FontSource::File { font, .. } => font.lookup_glyph_index(ch) != 0,
        }
    }
}

impl fmt::Debug for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSource::Builtin => f.write_str("Builtin"),
            FontSource::File { path, .. } => f.debug_struct("File").field("path", path).finish(),
        }
    }
}

/// A packed glyph, positioned relative to the pen on the line's top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub advance: f32,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

/// One font of the atlas with its baked glyphs.
#[derive(Debug)]
pub struct AtlasFont {
    id: FontId,
    source: FontSource,
    size: f32,
    charset: Charset,
    glyphs: HashMap<char, Glyph>,
    line_height: f32,
    ascent: f32,
}

impl AtlasFont {
    pub fn id(&self) -> FontId {
        self.id
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn source(&self) -> &FontSource {
        &self.source
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    /// The glyph for `ch`, falling back to '?' when not baked.
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch).or_else(|| self.glyphs.get(&'?'))
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    /// Horizontal extent of a single line of text.
    pub fn text_width(&self, text: &str) -> f32 {
        text.chars()
            .filter_map(|ch| self.glyph(ch))
            .map(|glyph| glyph.advance)
            .sum()
    }
}

/// Coverage bitmap of one glyph before packing.
struct RasterGlyph {
    font: usize,
    ch: char,
    width: u32,
    height: u32,
    coverage: Vec<u8>,
    advance: f32,
    x_offset: f32,
    y_offset: f32,
}

/// Shelf packer: fills rows left to right, starting a new row when full.
struct ShelfPacker {
    size: u32,
    pack_x: u32,
    pack_y: u32,
    row_height: u32,
}

impl ShelfPacker {
    fn new(size: u32) -> Self {
        Self {
            size,
            pack_x: PADDING,
            pack_y: PADDING,
            row_height: 0,
        }
    }

    /// Find space for a `width` x `height` rectangle.
    fn pack(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width == 0 || height == 0 {
            return Some((0, 0));
        }

        if self.pack_x + width + PADDING > self.size {
            self.pack_x = PADDING;
            self.pack_y += self.row_height + PADDING;
            self.row_height = 0;
        }

        if self.pack_x + width + PADDING > self.size || self.pack_y + height + PADDING > self.size {
            return None;
        }

        let x = self.pack_x;
        let y = self.pack_y;

        self.pack_x += width + PADDING;
        self.row_height = self.row_height.max(height);

        Some((x, y))
    }
}

/// RGBA32 texture data of a built atlas.
#[derive(Debug, Clone, Copy)]
pub struct TexData<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
}

#[derive(Debug)]
pub struct FontAtlas {
    fonts: Vec<AtlasFont>,
    next_id: u32,
    /// Atlas texture data (RGBA).
    pixels: Vec<u8>,
    size: u32,
    white_uv: [f32; 2],
    /// Glyphs changed since the last build.
    dirty: bool,
    tex_id: Option<GpuHandle>,
}

impl Default for FontAtlas {
    fn default() -> Self {
        Self::new()
    }
}

impl FontAtlas {
    pub fn new() -> Self {
        Self {
            fonts: Vec::new(),
            next_id: 0,
            pixels: Vec::new(),
            size: 0,
            white_uv: [0.0, 0.0],
            dirty: true,
            tex_id: None,
        }
    }

    /// Add a font. Nothing is rasterized until the next build.
    pub fn add(&mut self, source: FontSource, size: f32, charset: Charset) -> FontId {
        let id = FontId(self.next_id);
        self.next_id += 1;
        self.fonts.push(AtlasFont {
            id,
            source,
            size,
            charset,
            glyphs: HashMap::new(),
            line_height: size,
            ascent: size,
        });
        self.dirty = true;
        tracing::debug!(font = %id, size, %charset, "Font added to atlas");
        id
    }

    /// Add the built-in bitmap font.
    pub fn add_default(&mut self, size: f32, charset: Charset) -> FontId {
        self.add(FontSource::Builtin, size, charset)
    }

    /// Read, parse and add a font file.
    pub fn add_from_file(
        &mut self,
        path: impl AsRef<Path>,
        size: f32,
        charset: Charset,
    ) -> Result<FontId, AtlasError> {
        check_font_size(size)?;
        let source = FontSource::load(path, size)?;
        Ok(self.add(source, size, charset))
    }

    pub fn remove(&mut self, id: FontId) -> bool {
        let before = self.fonts.len();
        self.fonts.retain(|font| font.id != id);
        let removed = self.fonts.len() != before;
        if removed {
            self.dirty = true;
            tracing::debug!(font = %id, "Font removed from atlas");
        }
        removed
    }

    /// Change the charset of a font; returns the previous one.
    pub fn set_charset(&mut self, id: FontId, charset: Charset) -> Result<Charset, AtlasError> {
        let font = self
            .fonts
            .iter_mut()
            .find(|font| font.id == id)
            .ok_or(AtlasError::UnknownFont(id))?;
        let previous = std::mem::replace(&mut font.charset, charset);
        if previous != charset {
            self.dirty = true;
        }
        Ok(previous)
    }

    pub fn font(&self, id: FontId) -> Option<&AtlasFont> {
        self.fonts.iter().find(|font| font.id == id)
    }

    /// The font text is drawn with unless another is chosen.
    pub fn default_font(&self) -> Option<&AtlasFont> {
        self.fonts.first()
    }

    pub fn fonts(&self) -> &[AtlasFont] {
        &self.fonts
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn is_built(&self) -> bool {
        !self.dirty
    }

    /// UV of a fully opaque white texel, for untextured shapes.
    pub fn white_uv(&self) -> [f32; 2] {
        self.white_uv
    }

    pub fn tex_id(&self) -> Option<GpuHandle> {
        self.tex_id
    }

    pub fn set_tex_id(&mut self, handle: GpuHandle) {
        self.tex_id = Some(handle);
    }

    /// Texture data, building first if fonts changed since the last build.
    pub fn tex_data_rgba32(&mut self) -> Result<TexData<'_>, AtlasError> {
        if self.dirty {
            self.build()?;
        }
        Ok(TexData {
            width: self.size,
            height: self.size,
            pixels: &self.pixels,
        })
    }

    /// Rasterize all fonts and pack them into a fresh texture.
    pub fn build(&mut self) -> Result<(), AtlasError> {
        let glyphs = self.rasterize()?;

        let mut size = INITIAL_ATLAS_SIZE;
        let placements = loop {
            if let Some(placements) = Self::place(&glyphs, size) {
                break placements;
            }
            size *= 2;
            if size > MAX_ATLAS_SIZE {
                return Err(AtlasError::TooLarge);
            }
        };

        self.size = size;
        self.pixels = vec![0u8; (size * size * 4) as usize];
        for font in &mut self.fonts {
            font.glyphs.clear();
        }

        // White block used for untextured shapes
        let (white_x, white_y) = placements[0];
        for y in white_y..white_y + 2 {
            for x in white_x..white_x + 2 {
                let dst = ((y * size + x) * 4) as usize;
                self.pixels[dst..dst + 4].fill(255);
            }
        }
        self.white_uv = [
            (white_x as f32 + 1.0) / size as f32,
            (white_y as f32 + 1.0) / size as f32,
        ];

        let inv = 1.0 / size as f32;
        for (glyph, &(atlas_x, atlas_y)) in glyphs.iter().zip(&placements[1..]) {
            // Copy bitmap to atlas (grayscale to RGBA white)
            for y in 0..glyph.height {
                for x in 0..glyph.width {
                    let src = (y * glyph.width + x) as usize;
                    let dst = (((atlas_y + y) * size + atlas_x + x) * 4) as usize;
                    let alpha = glyph.coverage.get(src).copied().unwrap_or(0);
                    self.pixels[dst] = 255;
                    self.pixels[dst + 1] = 255;
                    self.pixels[dst + 2] = 255;
                    self.pixels[dst + 3] = alpha;
                }
            }

            let baked = Glyph {
                advance: glyph.advance,
                x0: glyph.x_offset,
                y0: glyph.y_offset,
                x1: glyph.x_offset + glyph.width as f32,
                y1: glyph.y_offset + glyph.height as f32,
                u0: atlas_x as f32 * inv,
                v0: atlas_y as f32 * inv,
                u1: (atlas_x + glyph.width) as f32 * inv,
                v1: (atlas_y + glyph.height) as f32 * inv,
            };
            self.fonts[glyph.font].glyphs.insert(glyph.ch, baked);
        }

        self.dirty = false;
        tracing::debug!(
            fonts = self.fonts.len(),
            glyphs = glyphs.len(),
            size,
            "Font atlas built"
        );
        Ok(())
    }

    /// Positions for the white block followed by every glyph, or `None`
    /// when they don't fit into `size` x `size`.
    fn place(glyphs: &[RasterGlyph], size: u32) -> Option<Vec<(u32, u32)>> {
        let mut packer = ShelfPacker::new(size);
        let mut placements = Vec::with_capacity(glyphs.len() + 1);
        placements.push(packer.pack(2, 2)?);
        for glyph in glyphs {
            placements.push(packer.pack(glyph.width, glyph.height)?);
        }
        Some(placements)
    }

    /// Rasterize every covered glyph of every font, updating line metrics.
    fn rasterize(&mut self) -> Result<Vec<RasterGlyph>, AtlasError> {
        let mut glyphs = Vec::new();

        for (index, font) in self.fonts.iter_mut().enumerate() {
            check_font_size(font.size)?;
            match &font.source {
                FontSource::Builtin => {
                    let scale = builtin::scale_for(font.size);
                    font.ascent = (builtin::ROWS as u32 * scale) as f32;
                    font.line_height = ((builtin::ROWS as u32 + 2) * scale) as f32;

                    for ch in font.charset.chars() {
                        let Some(coverage) = builtin::rasterize(ch, scale) else {
                            continue;
                        };
                        glyphs.push(RasterGlyph {
                            font: index,
                            ch,
                            width: builtin::COLUMNS as u32 * scale,
                            height: builtin::ROWS as u32 * scale,
                            coverage,
                            advance: ((builtin::COLUMNS as u32 + 1) * scale) as f32,
                            x_offset: 0.0,
                            y_offset: 0.0,
                        });
                    }
                }
                FontSource::File { font: face, .. } => {
                    let (ascent, line_height) = match face.horizontal_line_metrics(font.size) {
                        Some(metrics) => (metrics.ascent, metrics.new_line_size),
                        None => (font.size * 0.8, font.size),
                    };
                    font.ascent = ascent;
                    font.line_height = line_height;

                    for ch in font.charset.chars() {
                        if !font.source.covers(ch) {
                            continue;
                        }
                        let (metrics, coverage) = face.rasterize(ch, font.size);
                        glyphs.push(RasterGlyph {
                            font: index,
                            ch,
                            width: metrics.width as u32,
                            height: metrics.height as u32,
                            coverage,
                            advance: metrics.advance_width,
                            x_offset: metrics.xmin as f32,
                            y_offset: ascent - (metrics.ymin as f32 + metrics.height as f32),
                        });
                    }
                }
            }
        }
        Ok(glyphs)
    }
}

/// Sizes outside `(0, MAX_FONT_SIZE]` (NaN and infinity included) can't be baked.
pub fn check_font_size(size: f32) -> Result<f32, AtlasError> {
    if size > 0.0 && size <= MAX_FONT_SIZE {
        Ok(size)
    } else {
        Err(AtlasError::Size(size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_parse_and_ranges() {
        assert_eq!("CYRILLIC".parse::<Charset>().unwrap(), Charset::Cyrillic);
        assert_eq!("default".parse::<Charset>().unwrap(), Charset::Default);
        assert!(matches!(
            "klingon".parse::<Charset>(),
            Err(AtlasError::UnknownCharset(_))
        ));

        assert!(Charset::Default.chars().any(|ch| ch == 'é'));
        assert!(!Charset::Default.chars().any(|ch| ch == 'Ж'));
        assert!(Charset::Cyrillic.chars().any(|ch| ch == 'Ж'));
        assert!(Charset::Greek.chars().any(|ch| ch == 'Ω'));
    }

    #[test]
    fn test_pack_glyph_wraps_rows() {
        let mut packer = ShelfPacker::new(16);
        assert_eq!(packer.pack(6, 4), Some((1, 1)));
        assert_eq!(packer.pack(6, 5), Some((8, 1)));
        // Doesn't fit on the first row anymore
        assert_eq!(packer.pack(6, 2), Some((1, 7)));
        assert_eq!(packer.pack(20, 1), None);
        assert_eq!(packer.pack(0, 3), Some((0, 0)));
    }

    #[test]
    fn test_build_default_font() {
        let mut atlas = FontAtlas::new();
        let id = atlas.add_default(16.0, Charset::Default);
        assert!(!atlas.is_built());

        let tex = atlas.tex_data_rgba32().unwrap();
        assert_eq!(tex.pixels.len(), (tex.width * tex.height * 4) as usize);
        assert!(tex.width >= INITIAL_ATLAS_SIZE);
        assert!(atlas.is_built());

        let font = atlas.font(id).unwrap();
        // Only printable ASCII is baked for the built-in font
        assert_eq!(font.glyph_count(), 95);
        let glyph = font.glyph('A').unwrap();
        assert_eq!(glyph.x1 - glyph.x0, 10.0);
        assert_eq!(glyph.y1 - glyph.y0, 14.0);
        assert!(glyph.u1 > glyph.u0 && glyph.v1 > glyph.v0);

        // Unbaked characters fall back to '?'
        assert_eq!(font.glyph('Ж'), font.glyph('?'));
        assert_eq!(font.text_width("ab"), 24.0);
    }

    #[test]
    fn test_white_texel_is_opaque() {
        let mut atlas = FontAtlas::new();
        atlas.add_default(8.0, Charset::Default);
        atlas.build().unwrap();

        let [u, v] = atlas.white_uv();
        let size = atlas.tex_data_rgba32().unwrap().width;
        let x = (u * size as f32) as u32;
        let y = (v * size as f32) as u32;
        let tex = atlas.tex_data_rgba32().unwrap();
        let texel = ((y * size + x) * 4) as usize;
        assert_eq!(&tex.pixels[texel..texel + 4], &[255, 255, 255, 255]);
    }

    #[test]
    fn test_remove_and_recharset_mark_dirty() {
        let mut atlas = FontAtlas::new();
        let first = atlas.add_default(16.0, Charset::Default);
        let second = atlas.add_default(8.0, Charset::Default);
        atlas.build().unwrap();

        assert_eq!(atlas.set_charset(second, Charset::Greek).unwrap(), Charset::Default);
        assert!(!atlas.is_built());
        atlas.build().unwrap();

        // Same charset again is not a change
        atlas.set_charset(second, Charset::Greek).unwrap();
        assert!(atlas.is_built());

        assert!(atlas.remove(first));
        assert!(!atlas.remove(first));
        assert!(!atlas.is_built());
        assert_eq!(atlas.default_font().unwrap().id(), second);
        assert!(matches!(
            atlas.set_charset(first, Charset::Default),
            Err(AtlasError::UnknownFont(_))
        ));
    }

    #[test]
    fn test_unbakeable_sizes_fail_the_build() {
        for size in [f32::INFINITY, f32::NAN, 1e6, 0.0, -4.0] {
            let mut atlas = FontAtlas::new();
            atlas.add_default(size, Charset::Default);
            assert!(matches!(atlas.build(), Err(AtlasError::Size(_))), "{size}");
            assert!(!atlas.is_built());
        }
        assert_eq!(check_font_size(MAX_FONT_SIZE).ok(), Some(MAX_FONT_SIZE));
        assert!(matches!(
            FontAtlas::new().add_from_file("/nonexistent/font.ttf", f32::INFINITY, Charset::Default),
            Err(AtlasError::Size(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let mut atlas = FontAtlas::new();
        let result = atlas.add_from_file("/nonexistent/font.ttf", 16.0, Charset::Default);
        assert!(matches!(result, Err(AtlasError::Io { .. })));
        assert!(atlas.is_empty());
    }

    #[test]
    fn test_garbage_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"definitely not a font").unwrap();

        let mut atlas = FontAtlas::new();
        let result = atlas.add_from_file(&path, 16.0, Charset::Default);
        assert!(matches!(result, Err(AtlasError::Parse(_))));
    }

    #[test]
    fn test_tex_id_slot() {
        let mut atlas = FontAtlas::new();
        assert_eq!(atlas.tex_id(), None);
        atlas.set_tex_id(GpuHandle(7));
        assert_eq!(atlas.tex_id(), Some(GpuHandle(7)));
    }
}
