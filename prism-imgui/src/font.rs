//! GUI fonts - rasterized locally, uploaded through whatever module makes images.
//!
//! Construction walks a fixed pipeline, each stage its own type:
//!
//! `FontRequest` (traits resolved) -> `Rasterized` (glyphs in the atlas,
//! image intent prepared) -> `Uploaded` (image produced elsewhere) -> `GuiFont`
//!
//! Any failure ends construction. A failure after rasterization removes the
//! font from the atlas again, so the atlas only ever holds fonts that made
//! it all the way.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use prism_api::{
    CapabilityKind, Descriptor, Extent, GpuHandle, IdentityKey, PixelBlock, RuntimeError,
    TraitTag, UnitKind,
};
use prism_kernel::{Image, Keyed, Produced, Production, Request, Unit, UnitCore};

use crate::context::{AtlasError, Charset, Context, FontId, FontSource, check_font_size};
use crate::settings::{DEFAULT_FONT_NAME, DEFAULT_FONT_SIZE};
use crate::system::GuiSystem;

pub const GUI_FONT: UnitKind = UnitKind("GuiFont");

const UNIT: &str = "GuiFont";

/// Font traits after defaults are applied.
#[derive(Debug, Clone, PartialEq)]
struct FontRequest {
    name: String,
    size: f32,
    charset: Charset,
}

impl FontRequest {
    fn resolve(descriptor: &Descriptor) -> Result<Self, RuntimeError> {
        let name = descriptor
            .text(TraitTag::Name)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| RuntimeError::construct(UNIT, "empty name"))?;

        let size = check_font_size(descriptor.real(TraitTag::Size).unwrap_or(DEFAULT_FONT_SIZE))
            .map_err(|error| RuntimeError::construct(UNIT, error.to_string()))?;

        let charset = match descriptor.text(TraitTag::Charset) {
            Some(charset) => charset
                .parse()
                .map_err(|error: AtlasError| RuntimeError::construct(UNIT, error.to_string()))?,
            None => Charset::Default,
        };

        Ok(Self {
            name: name.to_string(),
            size,
            charset,
        })
    }

    fn is_builtin(&self) -> bool {
        self.name.eq_ignore_ascii_case(DEFAULT_FONT_NAME)
    }

    fn key(&self) -> IdentityKey {
        IdentityKey::new(format!("{}@{}", self.name.to_lowercase(), self.size))
    }

    fn to_descriptor(&self) -> Descriptor {
        Descriptor::new()
            .with(TraitTag::Name, self.name.to_lowercase())
            .with(TraitTag::Size, self.size)
            .with(TraitTag::Charset, self.charset.name())
    }

    /// Add the font to the atlas and read the atlas back for upload.
    fn rasterize(self, ctx: &mut Context) -> Result<Rasterized, RuntimeError> {
        let fonts = ctx.fonts_mut();
        let font_id = if self.is_builtin() {
            fonts.add_default(self.size, self.charset)
        } else {
            let source = FontSource::load(&self.name, self.size).map_err(|error| {
                RuntimeError::construct(UNIT, format!("couldn't load font {}: {error}", self.name))
            })?;
            fonts.add(source, self.size, self.charset)
        };

        match atlas_intent(ctx, &self) {
            Ok(intent) => Ok(Rasterized {
                request: self,
                font_id,
                intent,
            }),
            Err(error) => {
                discard(ctx, font_id);
                Err(error)
            }
        }
    }
}

/// Take `font_id` out of the atlas again and re-bake the fonts that stay, so
/// their glyphs match the texture that is still installed.
fn discard(ctx: &mut Context, font_id: FontId) {
    let fonts = ctx.fonts_mut();
    fonts.remove(font_id);
    if let Err(error) = fonts.build() {
        tracing::warn!(unit = UNIT, font = %font_id, %error, "Couldn't restore font atlas");
    }
}

/// Image intent for the whole atlas texture.
fn atlas_intent(ctx: &mut Context, request: &FontRequest) -> Result<Descriptor, RuntimeError> {
    let tex = ctx
        .fonts_mut()
        .tex_data_rgba32()
        .map_err(|error| RuntimeError::construct(UNIT, error.to_string()))?;

    Ok(Descriptor::new()
        .with(
            TraitTag::Name,
            format!("Font {} {}", request.name, request.size),
        )
        .with(TraitTag::Path, request.name.as_str())
        .with(TraitTag::Size, Extent::new(tex.width, tex.height))
        .with(TraitTag::Data, PixelBlock::rgba(tex.pixels.to_vec())))
}

/// Ask the runtime for an image made from `intent`.
fn upload(
    cx: &Production<'_, GuiSystem>,
    intent: Descriptor,
) -> Result<(Rc<dyn Unit>, GpuHandle), RuntimeError> {
    let asset = cx.produce::<dyn Image>(
        UNIT,
        Request::capability(CapabilityKind::Image, intent),
    )?;
    let handle = asset
        .as_image()
        .map(|image| image.gpu_handle())
        .ok_or_else(|| RuntimeError::construct(UNIT, "atlas asset is not an image"))?;
    Ok((asset, handle))
}

/// Glyphs are in the atlas; the atlas still has to reach the GPU.
struct Rasterized {
    request: FontRequest,
    font_id: FontId,
    intent: Descriptor,
}

impl Rasterized {
    fn upload(self, cx: &Production<'_, GuiSystem>) -> Result<Uploaded, RuntimeError> {
        let system = cx.producer();
        match upload(cx, self.intent) {
            Ok((asset, handle)) => Ok(Uploaded {
                request: self.request,
                font_id: self.font_id,
                asset,
                handle,
            }),
            Err(error) => {
                system.with_context(|ctx| discard(ctx, self.font_id))?;
                Err(error)
            }
        }
    }
}

/// The atlas is GPU-resident.
struct Uploaded {
    request: FontRequest,
    font_id: FontId,
    asset: Rc<dyn Unit>,
    handle: GpuHandle,
}

impl Uploaded {
    fn install(self, cx: &Production<'_, GuiSystem>) -> Result<GuiFont, RuntimeError> {
        let handle = self.handle;
        cx.producer()
            .with_context(|ctx| ctx.fonts_mut().set_tex_id(handle))?;

        tracing::debug!(
            unit = UNIT,
            name = %self.request.name,
            size = self.request.size,
            texture = handle.0,
            "Font ready"
        );
        Ok(GuiFont {
            core: UnitCore::new(cx.descriptor()),
            system: Rc::downgrade(cx.producer()),
            name: self.request.name,
            size: self.request.size,
            charset: Cell::new(self.request.charset),
            font_id: self.font_id,
            asset: RefCell::new(self.asset),
        })
    }
}

/// A font of a GUI system's atlas together with the GPU image holding it.
pub struct GuiFont {
    core: UnitCore,
    system: Weak<GuiSystem>,
    name: String,
    size: f32,
    charset: Cell<Charset>,
    font_id: FontId,
    asset: RefCell<Rc<dyn Unit>>,
}

impl GuiFont {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn charset(&self) -> Charset {
        self.charset.get()
    }

    pub fn font_id(&self) -> FontId {
        self.font_id
    }

    /// The image unit holding the atlas texture.
    pub fn atlas(&self) -> Rc<dyn Unit> {
        self.asset.borrow().clone()
    }

    pub fn gpu_handle(&self) -> Option<GpuHandle> {
        self.asset.borrow().as_image().map(|image| image.gpu_handle())
    }

    pub fn system(&self) -> Option<Rc<GuiSystem>> {
        self.system.upgrade()
    }
}

impl Unit for GuiFont {
    fn kind(&self) -> UnitKind {
        GUI_FONT
    }

    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Produced for GuiFont {
    type Producer = GuiSystem;
    const KIND: UnitKind = GUI_FONT;

    fn construct(cx: &Production<'_, GuiSystem>) -> Result<Self, RuntimeError> {
        let request = FontRequest::resolve(cx.descriptor())?;
        tracing::debug!(unit = UNIT, name = %request.name, size = request.size, "Initializing...");

        let rasterized = cx
            .producer()
            .with_context(|ctx| request.rasterize(ctx))??;
        rasterized.upload(cx)?.install(cx)
    }

    /// Same name and size, different charset: rebuild and re-upload the atlas.
    fn reconfigure(&self, cx: &Production<'_, GuiSystem>) -> Result<(), RuntimeError> {
        let request = FontRequest::resolve(cx.descriptor())?;
        let previous = self.charset.get();
        if request.charset == previous {
            return Ok(());
        }

        let system = cx.producer();
        let set_charset = |charset: Charset| -> Result<Charset, RuntimeError> {
            system
                .with_context(|ctx| ctx.fonts_mut().set_charset(self.font_id, charset))?
                .map_err(|error| RuntimeError::construct(UNIT, error.to_string()))
        };

        set_charset(request.charset)?;
        let uploaded = system
            .with_context(|ctx| atlas_intent(ctx, &request))
            .and_then(std::convert::identity)
            .and_then(|intent| upload(cx, intent));

        match uploaded {
            Ok((asset, handle)) => {
                system.with_context(|ctx| ctx.fonts_mut().set_tex_id(handle))?;
                self.charset.set(request.charset);
                *self.asset.borrow_mut() = asset;
                tracing::debug!(unit = UNIT, name = %self.name, charset = %request.charset, "Font reconfigured");
                Ok(())
            }
            Err(error) => {
                // The previously uploaded texture is still installed
                set_charset(previous)?;
                system
                    .with_context(|ctx| ctx.fonts_mut().build())?
                    .map_err(|error| RuntimeError::construct(UNIT, error.to_string()))?;
                tracing::warn!(unit = UNIT, name = %self.name, %error, "Font reconfigure failed");
                Err(error)
            }
        }
    }
}

impl Keyed for GuiFont {
    /// Lowercased name plus size; charset changes reconfigure in place.
    fn identity(descriptor: &Descriptor) -> Option<IdentityKey> {
        FontRequest::resolve(descriptor)
            .ok()
            .map(|request| request.key())
    }

    /// The resolved request, so omitted traits compare equal to their defaults.
    fn normalize(descriptor: &Descriptor) -> Descriptor {
        FontRequest::resolve(descriptor)
            .map(|request| request.to_descriptor())
            .unwrap_or_else(|_| descriptor.clone())
    }
}

impl Drop for GuiFont {
    fn drop(&mut self) {
        if let Some(system) = self.system.upgrade() {
            let _ = system.with_context(|ctx| ctx.fonts_mut().remove(self.font_id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request =
            FontRequest::resolve(&Descriptor::new().with(TraitTag::Name, "default")).unwrap();
        assert_eq!(request.size, 16.0);
        assert_eq!(request.charset, Charset::Default);
        assert!(request.is_builtin());
    }

    #[test]
    fn test_request_requires_name() {
        for descriptor in [
            Descriptor::new(),
            Descriptor::new().with(TraitTag::Name, "  "),
        ] {
            let error = FontRequest::resolve(&descriptor).unwrap_err();
            assert_eq!(error, RuntimeError::construct(UNIT, "empty name"));
        }
    }

    #[test]
    fn test_request_rejects_bad_traits() {
        let size = Descriptor::new()
            .with(TraitTag::Name, "default")
            .with(TraitTag::Size, 0.0f32);
        assert!(FontRequest::resolve(&size).is_err());

        let charset = Descriptor::new()
            .with(TraitTag::Name, "default")
            .with(TraitTag::Charset, "runic");
        assert!(FontRequest::resolve(&charset).is_err());
    }

    #[test]
    fn test_identity_ignores_case_and_charset() {
        let a = Descriptor::new()
            .with(TraitTag::Name, "Default")
            .with(TraitTag::Size, 16.0f32);
        let b = Descriptor::new()
            .with(TraitTag::Name, "default")
            .with(TraitTag::Charset, "cyrillic");
        assert_eq!(GuiFont::identity(&a), GuiFont::identity(&b));

        let c = Descriptor::new()
            .with(TraitTag::Name, "default")
            .with(TraitTag::Size, 20.0f32);
        assert_ne!(GuiFont::identity(&a), GuiFont::identity(&c));
        assert_eq!(GuiFont::identity(&Descriptor::new()), None);
    }

    #[test]
    fn test_request_rejects_unbakeable_sizes() {
        for size in [f32::INFINITY, f32::NAN, 1e6] {
            let descriptor = Descriptor::new()
                .with(TraitTag::Name, "default")
                .with(TraitTag::Size, size);
            let error = FontRequest::resolve(&descriptor).unwrap_err();
            assert!(error.is_construct(), "{error}");
        }
    }

    #[test]
    fn test_normalize_fills_defaults_and_folds_case() {
        let bare = Descriptor::new().with(TraitTag::Name, "default");
        let spelled_out = Descriptor::new()
            .with(TraitTag::Name, "Default")
            .with(TraitTag::Size, 16.0f32)
            .with(TraitTag::Charset, "latin");
        assert_eq!(GuiFont::normalize(&bare), GuiFont::normalize(&spelled_out));

        let greek = bare.clone().with(TraitTag::Charset, "greek");
        assert_ne!(GuiFont::normalize(&bare), GuiFont::normalize(&greek));
    }

    #[test]
    fn test_discard_restores_surviving_glyphs() {
        let mut ctx = Context::new(Default::default());
        let kept = ctx.fonts_mut().add_default(16.0, Charset::Default);
        ctx.fonts_mut().build().unwrap();
        let size_before = ctx.fonts_mut().tex_data_rgba32().unwrap().width;
        let glyph_before = *ctx.fonts().font(kept).unwrap().glyph('A').unwrap();

        // Big enough to make the atlas grow, which moves every UV
        let request = FontRequest::resolve(
            &Descriptor::new()
                .with(TraitTag::Name, "default")
                .with(TraitTag::Size, 64.0f32),
        )
        .unwrap();
        let rasterized = request.rasterize(&mut ctx).unwrap();
        assert!(ctx.fonts_mut().tex_data_rgba32().unwrap().width > size_before);
        assert_ne!(*ctx.fonts().font(kept).unwrap().glyph('A').unwrap(), glyph_before);

        discard(&mut ctx, rasterized.font_id);
        assert!(ctx.fonts().is_built());
        assert_eq!(ctx.fonts_mut().tex_data_rgba32().unwrap().width, size_before);
        assert_eq!(*ctx.fonts().font(kept).unwrap().glyph('A').unwrap(), glyph_before);
        assert!(ctx.fonts().font(rasterized.font_id).is_none());
    }

    #[test]
    fn test_rasterize_builtin_produces_atlas_intent() {
        let mut ctx = Context::new(Default::default());
        let request =
            FontRequest::resolve(&Descriptor::new().with(TraitTag::Name, "default")).unwrap();
        let rasterized = request.rasterize(&mut ctx).unwrap();

        let intent = &rasterized.intent;
        assert_eq!(intent.text(TraitTag::Name), Some("Font default 16"));
        assert_eq!(intent.text(TraitTag::Path), Some("default"));
        let extent = intent.extent(TraitTag::Size).unwrap();
        let pixels = intent.pixels(TraitTag::Data).unwrap();
        assert_eq!(pixels.pixel_count(), extent.area());
        assert!(ctx.fonts().font(rasterized.font_id).is_some());
    }

    #[test]
    fn test_rasterize_missing_file_leaves_atlas_empty() {
        let mut ctx = Context::new(Default::default());
        let request =
            FontRequest::resolve(&Descriptor::new().with(TraitTag::Name, "/no/such/font.ttf"))
                .unwrap();
        let error = request.rasterize(&mut ctx).err().unwrap();
        match error {
            RuntimeError::Construct { reason, .. } => {
                assert!(reason.starts_with("couldn't load font"), "{reason}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ctx.fonts().is_empty());
    }
}
