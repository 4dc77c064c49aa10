//! Images kept in host memory, with a fake GPU handle.

use std::any::Any;
use std::cell::{Cell, RefCell};

use image::RgbaImage;
use prism_api::{
    CapabilityKind, Descriptor, Extent, GpuHandle, IdentityKey, PixelFormat, RuntimeError,
    TraitTag, UnitKind,
};
use prism_kernel::{Image, Keyed, Produced, Production, Unit, UnitCore};

use crate::module::HeadlessModule;

pub const HEADLESS_IMAGE: UnitKind = UnitKind("HeadlessImage");

/// Uploading again under the same name replaces the pixels but keeps the
/// handle, like re-uploading into an existing texture.
pub struct HeadlessImage {
    core: UnitCore,
    handle: GpuHandle,
    pixels: RefCell<RgbaImage>,
    uploads: Cell<usize>,
}

impl HeadlessImage {
    pub fn pixels(&self) -> RgbaImage {
        self.pixels.borrow().clone()
    }

    /// How many times pixel data was received.
    pub fn uploads(&self) -> usize {
        self.uploads.get()
    }

    fn decode(descriptor: &Descriptor) -> Result<RgbaImage, RuntimeError> {
        let fail = |reason: String| RuntimeError::construct(HEADLESS_IMAGE.name(), reason);

        let extent = descriptor
            .extent(TraitTag::Size)
            .ok_or_else(|| fail("missing image size".to_string()))?;
        let data = descriptor
            .pixels(TraitTag::Data)
            .ok_or_else(|| fail("missing pixel data".to_string()))?;
        if data.format != PixelFormat::Rgba8 {
            return Err(fail(format!("unsupported pixel format {:?}", data.format)));
        }

        RgbaImage::from_raw(extent.width, extent.height, data.bytes.clone()).ok_or_else(|| {
            fail(format!(
                "{} bytes don't make a {}x{} image",
                data.bytes.len(),
                extent.width,
                extent.height
            ))
        })
    }
}

impl Image for HeadlessImage {
    fn gpu_handle(&self) -> GpuHandle {
        self.handle
    }

    fn extent(&self) -> Extent {
        let (width, height) = self.pixels.borrow().dimensions();
        Extent::new(width, height)
    }
}

impl Unit for HeadlessImage {
    fn kind(&self) -> UnitKind {
        HEADLESS_IMAGE
    }

    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn capabilities(&self) -> &'static [CapabilityKind] {
        <Self as Produced>::CAPABILITIES
    }

    fn as_image(&self) -> Option<&(dyn Image + 'static)> {
        Some(self)
    }
}

impl Produced for HeadlessImage {
    type Producer = HeadlessModule;
    const KIND: UnitKind = HEADLESS_IMAGE;
    const CAPABILITIES: &'static [CapabilityKind] = &[CapabilityKind::Image];

    fn construct(cx: &Production<'_, HeadlessModule>) -> Result<Self, RuntimeError> {
        let pixels = Self::decode(cx.descriptor())?;
        let handle = cx.producer().allocate_texture();
        tracing::debug!(
            unit = HEADLESS_IMAGE.name(),
            texture = handle.0,
            width = pixels.width(),
            height = pixels.height(),
            "Image uploaded"
        );
        Ok(Self {
            core: UnitCore::new(cx.descriptor()),
            handle,
            pixels: RefCell::new(pixels),
            uploads: Cell::new(1),
        })
    }

    fn reconfigure(&self, cx: &Production<'_, HeadlessModule>) -> Result<(), RuntimeError> {
        let pixels = Self::decode(cx.descriptor())?;
        *self.pixels.borrow_mut() = pixels;
        self.uploads.set(self.uploads.get() + 1);
        Ok(())
    }
}

impl Keyed for HeadlessImage {
    fn identity(descriptor: &Descriptor) -> Option<IdentityKey> {
        descriptor.text(TraitTag::Name).map(IdentityKey::new)
    }
}
