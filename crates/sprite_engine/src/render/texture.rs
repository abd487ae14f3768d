//! Textures
//!
//! A texture is CPU-side RGBA8 pixels plus, per renderer, the backend
//! texture they were uploaded to. Three kinds exist:
//!
//! - **Data** textures own editable pixels ([`Texture::plot_pixel`])
//! - **Image** textures hold decoded image data
//! - **Pending** textures have no pixels yet and become ready on
//!   [`Texture::fulfill`]
//!
//! Editing pixels bumps a version; renderers holding an older upload
//! re-upload on their next bind.

use super::{Animation2D, RenderResult, Renderer, RendererId, TextureHandle};
use crate::foundation::math::Vector4;
use image::{Rgba, RgbaImage};
use log::debug;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Texture errors
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    /// No animation registered under the code
    #[error("Animation [{0}] not found")]
    AnimationNotFound(String),

    /// Pixels can only be plotted on data textures
    #[error("Can only plot pixels to a data texture")]
    NotPixelBacked,

    /// Pixel coordinates outside the texture
    #[error("Pixel ({x}, {y}) is outside the texture")]
    OutOfBounds {
        /// Column
        x: u32,
        /// Row
        y: u32,
    },

    /// The texture has no pixels yet
    #[error("Texture is not ready")]
    NotReady,

    /// Image decoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Identity of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(u64);

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Data,
    Image,
}

/// RGBA8 texture with per-renderer uploads and named animations
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    kind: Kind,
    pixels: RefCell<Option<RgbaImage>>,
    version: Cell<u64>,
    uploads: RefCell<HashMap<RendererId, (TextureHandle, u64)>>,
    animations: HashMap<String, Animation2D>,
}

impl Texture {
    fn with_pixels(kind: Kind, pixels: Option<RgbaImage>) -> Self {
        Self {
            id: TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed)),
            kind,
            pixels: RefCell::new(pixels),
            version: Cell::new(0),
            uploads: RefCell::new(HashMap::new()),
            animations: HashMap::new(),
        }
    }

    /// Transparent, editable texture
    pub fn data(width: u32, height: u32) -> Self {
        Self::with_pixels(Kind::Data, Some(RgbaImage::new(width, height)))
    }

    /// Texture over decoded pixels
    pub fn from_image(image: RgbaImage) -> Self {
        Self::with_pixels(Kind::Image, Some(image))
    }

    /// Decode an encoded image (PNG)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TextureError> {
        Ok(Self::from_image(image::load_from_memory(bytes)?.to_rgba8()))
    }

    /// Load an image file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        Ok(Self::from_image(image::open(path)?.to_rgba8()))
    }

    /// Texture whose pixels arrive later
    pub fn pending() -> Self {
        Self::with_pixels(Kind::Image, None)
    }

    /// Provide the pixels of a pending texture
    ///
    /// Replaces the pixels of a ready one.
    pub fn fulfill(&self, image: RgbaImage) {
        *self.pixels.borrow_mut() = Some(image);
        self.version.set(self.version.get() + 1);
    }

    /// Identity of this texture
    pub const fn id(&self) -> TextureId {
        self.id
    }

    /// Whether pixels are available
    pub fn is_ready(&self) -> bool {
        self.pixels.borrow().is_some()
    }

    /// Width in pixels, 0 while pending
    pub fn width(&self) -> u32 {
        self.pixels.borrow().as_ref().map_or(0, RgbaImage::width)
    }

    /// Height in pixels, 0 while pending
    pub fn height(&self) -> u32 {
        self.pixels.borrow().as_ref().map_or(0, RgbaImage::height)
    }

    /// Convert a pixel rectangle to texture space
    ///
    /// Fails while the texture is pending, since there is no size to
    /// divide by.
    #[allow(clippy::cast_precision_loss)]
    pub fn uvs(&self, x: f32, y: f32, w: f32, h: f32) -> Result<Vector4, TextureError> {
        let (width, height) = (self.width(), self.height());
        if width == 0 || height == 0 {
            return Err(TextureError::NotReady);
        }
        let (width, height) = (width as f32, height as f32);
        Ok(Vector4::new(x / width, y / height, w / width, h / height))
    }

    /// Register an animation under `code`, replacing any previous one
    pub fn create_animation(&mut self, code: impl Into<String>) -> &mut Animation2D {
        let slot = self.animations.entry(code.into()).or_default();
        *slot = Animation2D::new();
        slot
    }

    /// Animation registered under `code`
    pub fn animation(&self, code: &str) -> Result<&Animation2D, TextureError> {
        self.animations
            .get(code)
            .ok_or_else(|| TextureError::AnimationNotFound(code.to_string()))
    }

    /// Write one pixel of a data texture
    pub fn plot_pixel(&self, x: u32, y: u32, color: [u8; 4]) -> Result<(), TextureError> {
        if self.kind != Kind::Data {
            return Err(TextureError::NotPixelBacked);
        }
        let mut pixels = self.pixels.borrow_mut();
        let Some(image) = pixels.as_mut() else {
            return Err(TextureError::NotPixelBacked);
        };
        if x >= image.width() || y >= image.height() {
            return Err(TextureError::OutOfBounds { x, y });
        }
        image.put_pixel(x, y, Rgba(color));
        self.version.set(self.version.get() + 1);
        Ok(())
    }

    /// Read one pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let pixels = self.pixels.borrow();
        let image = pixels.as_ref()?;
        (x < image.width() && y < image.height()).then(|| image.get_pixel(x, y).0)
    }

    /// Whether `renderer` lacks the current pixels
    pub fn needs_upload(&self, renderer: RendererId) -> bool {
        self.uploads
            .borrow()
            .get(&renderer)
            .map_or(true, |(_, version)| *version != self.version.get())
    }

    /// Backend texture on `renderer`, uploading or refreshing as needed
    pub fn upload(&self, renderer: &mut Renderer) -> RenderResult<TextureHandle> {
        let pixels = self.pixels.borrow();
        let Some(image) = pixels.as_ref() else {
            return Err(TextureError::NotReady.into());
        };

        let version = self.version.get();
        let existing = self.uploads.borrow().get(&renderer.id()).copied();
        let handle = match existing {
            Some((handle, uploaded)) if uploaded == version => return Ok(handle),
            Some((handle, _)) => {
                renderer
                    .backend_mut()
                    .update_texture(handle, image.width(), image.height(), image.as_raw())?;
                handle
            }
            None => {
                let handle = renderer.backend_mut().create_texture(
                    image.width(),
                    image.height(),
                    image.as_raw(),
                )?;
                debug!("Uploaded texture {:?} as {handle:?}", self.id);
                handle
            }
        };

        self.uploads
            .borrow_mut()
            .insert(renderer.id(), (handle, version));
        Ok(handle)
    }

    /// Release the backend texture held on `renderer`
    pub fn destroy(&self, renderer: &mut Renderer) {
        if let Some((handle, _)) = self.uploads.borrow_mut().remove(&renderer.id()) {
            renderer.backend_mut().delete_texture(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use crate::render::{BackendCall, HeadlessBackend};

    fn renderer() -> Renderer {
        Renderer::new(Box::new(HeadlessBackend::new()), RendererConfig::default())
    }

    #[test]
    fn test_uvs() {
        let texture = Texture::data(64, 32);
        assert_eq!(
            texture.uvs(16.0, 8.0, 16.0, 16.0).unwrap(),
            Vector4::new(0.25, 0.25, 0.25, 0.5)
        );
    }

    #[test]
    fn test_uvs_of_pending_texture() {
        let texture = Texture::pending();
        assert!(matches!(texture.uvs(0.0, 0.0, 8.0, 8.0), Err(TextureError::NotReady)));

        texture.fulfill(RgbaImage::new(16, 16));
        assert_eq!(texture.uvs(0.0, 0.0, 8.0, 8.0).unwrap(), Vector4::new(0.0, 0.0, 0.5, 0.5));
    }

    #[test]
    fn test_animations() {
        let mut texture = Texture::data(4, 4);
        texture
            .create_animation("run")
            .add_frame(Vector4::new(0.0, 0.0, 0.5, 0.5));

        assert_eq!(texture.animation("run").unwrap().len(), 1);
        assert!(matches!(
            texture.animation("jump"),
            Err(TextureError::AnimationNotFound(code)) if code == "jump"
        ));
    }

    #[test]
    fn test_plot_pixel() {
        let texture = Texture::data(2, 2);
        texture.plot_pixel(1, 0, [255, 0, 0, 255]).unwrap();
        assert_eq!(texture.pixel(1, 0), Some([255, 0, 0, 255]));
        assert!(matches!(
            texture.plot_pixel(2, 0, [0; 4]),
            Err(TextureError::OutOfBounds { x: 2, y: 0 })
        ));

        let image = Texture::from_image(RgbaImage::new(2, 2));
        assert!(matches!(
            image.plot_pixel(0, 0, [0; 4]),
            Err(TextureError::NotPixelBacked)
        ));
    }

    #[test]
    fn test_pending_texture() {
        let mut renderer = renderer();
        let texture = Texture::pending();
        assert!(!texture.is_ready());
        assert_eq!(texture.width(), 0);
        assert!(texture.upload(&mut renderer).is_err());

        texture.fulfill(RgbaImage::new(8, 4));
        assert!(texture.is_ready());
        assert_eq!((texture.width(), texture.height()), (8, 4));
        assert!(texture.upload(&mut renderer).is_ok());
    }

    #[test]
    fn test_upload_once_per_renderer_and_refresh_after_plot() {
        let mut a = renderer();
        let mut b = renderer();
        let texture = Texture::data(1, 1);

        let first = texture.upload(&mut a).unwrap();
        assert_eq!(texture.upload(&mut a).unwrap(), first);
        assert!(!texture.needs_upload(a.id()));
        assert!(texture.needs_upload(b.id()));
        texture.upload(&mut b).unwrap();

        texture.plot_pixel(0, 0, [1, 2, 3, 4]).unwrap();
        assert!(texture.needs_upload(a.id()));
        assert_eq!(texture.upload(&mut a).unwrap(), first);

        let backend = a.backend_as::<HeadlessBackend>().unwrap();
        assert_eq!(backend.texture_data(first), Some(&[1u8, 2, 3, 4][..]));
        assert!(backend
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::UpdateTexture(h) if *h == first)));
    }

    #[test]
    fn test_decode_png() {
        let mut bytes = Vec::new();
        let image = RgbaImage::from_pixel(3, 2, Rgba([9, 8, 7, 255]));
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let texture = Texture::from_bytes(&bytes).unwrap();
        assert_eq!((texture.width(), texture.height()), (3, 2));
        assert_eq!(texture.pixel(2, 1), Some([9, 8, 7, 255]));
        assert!(Texture::from_bytes(b"not an image").is_err());
    }

    #[test]
    fn test_destroy_releases_upload() {
        let mut renderer = renderer();
        let texture = Texture::data(1, 1);
        texture.upload(&mut renderer).unwrap();
        texture.destroy(&mut renderer);

        assert_eq!(renderer.backend_as::<HeadlessBackend>().unwrap().texture_count(), 0);
        assert!(texture.needs_upload(renderer.id()));
    }
}
