//! Paletted framebuffer presentation.
//!
//! The engine rasterises into an 8-bit indexed framebuffer. Once per frame
//! the presenter resolves every index through the current palette into the
//! host's acquired back buffer, then flushes, swaps and (optionally) waits for
//! vertical blank.

use thiserror::Error;
use tracing::{debug, trace};

use crate::host::{Display, Surface};
use crate::palette::{PALETTE_BYTES, Palette};
use crate::sys::{SysError, try_alloc};

/// Size of the engine's surface cache in bytes.
pub const SURFACE_CACHE_SIZE: usize = 10 * 1024 * 1024;

/// Gamma forced while a resolution change settles.
pub const FORCED_GAMMA: f32 = 0.1;

/// One selectable render resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
    /// Horizontal stretch applied by the renderer.
    pub scale: f32,
}

/// Selectable render resolutions. Every entry is currently 1280x720.
pub const RESOLUTIONS: [Resolution; 4] = [
    Resolution { width: 1280, height: 720, scale: 1.777 },
    Resolution { width: 1280, height: 720, scale: 1.777 },
    Resolution { width: 1280, height: 720, scale: 1.777 },
    Resolution { width: 1280, height: 720, scale: 1.777 },
];

/// Entry used at start-up.
const INITIAL_RESOLUTION: usize = 3;

/// A damaged screen region reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// The presenter's view of the engine's video variables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoSettings {
    /// Wait for vertical blank after every swap.
    pub vsync: bool,
    /// Display gamma the engine applies when building its palette.
    pub gamma: f32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            vsync: true,
            gamma: 1.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum VideoError {
    #[error(transparent)]
    Alloc(#[from] SysError),

    #[error("video presenter is not initialized")]
    NotInitialized,
}

/// 8-bit palette indices, row-major, stride equal to width.
#[derive(Debug, Clone)]
pub struct IndexedFramebuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl IndexedFramebuffer {
    pub fn new(width: u32, height: u32) -> Result<Self, SysError> {
        let (width, height) = (width as usize, height as usize);
        Ok(Self {
            width,
            height,
            pixels: try_alloc(width * height, "indexed framebuffer")?,
        })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes per row.
    #[must_use]
    pub fn row_bytes(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn fill(&mut self, index: u8) {
        self.pixels.fill(index);
    }
}

/// Scratch memory the engine's rasteriser owns the meaning of.
pub struct RasterCaches {
    pub surface_cache: Vec<u8>,
    pub depth: Vec<i16>,
}

impl RasterCaches {
    fn new(resolution: Resolution) -> Result<Self, SysError> {
        Ok(Self {
            surface_cache: try_alloc(SURFACE_CACHE_SIZE, "surface cache")?,
            depth: try_alloc(
                resolution.width as usize * resolution.height as usize,
                "depth buffer",
            )?,
        })
    }
}

/// Framebuffer allocation bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoStats {
    pub framebuffer_allocations: u64,
    pub framebuffer_releases: u64,
    pub frames_presented: u64,
}

/// Resolve the overlapping region of `framebuffer` into `surface`.
///
/// Each buffer is indexed with its own stride, so a host surface of a
/// different size never causes an out-of-bounds access.
pub fn resolve(framebuffer: &IndexedFramebuffer, palette: &Palette, surface: &mut Surface<'_>) {
    let dst_stride = surface.width as usize;
    let width = dst_stride.min(framebuffer.width());
    let height = (surface.height as usize).min(framebuffer.height());
    if width == 0 || height == 0 {
        return;
    }

    let src_rows = framebuffer.pixels().chunks_exact(framebuffer.width());
    let dst_rows = surface.pixels.chunks_exact_mut(dst_stride);
    for (dst_row, src_row) in dst_rows.zip(src_rows).take(height) {
        for (dst, &index) in dst_row[..width].iter_mut().zip(&src_row[..width]) {
            *dst = palette.entry(index);
        }
    }
}

pub struct VideoPresenter {
    framebuffer: Option<IndexedFramebuffer>,
    caches: Option<RasterCaches>,
    palette: Palette,
    settings: VideoSettings,
    pending_gamma: Option<f32>,
    resolution: Resolution,
    stats: VideoStats,
}

impl VideoPresenter {
    /// Allocate the framebuffer and raster caches at the start-up resolution
    /// and build the palette from `palette`.
    pub fn initialize(palette: &[u8; PALETTE_BYTES], settings: VideoSettings) -> Result<Self, VideoError> {
        let resolution = RESOLUTIONS[INITIAL_RESOLUTION];
        let framebuffer = IndexedFramebuffer::new(resolution.width, resolution.height)?;
        let caches = RasterCaches::new(resolution)?;
        debug!(
            width = resolution.width,
            height = resolution.height,
            vsync = settings.vsync,
            "video initialized"
        );

        Ok(Self {
            framebuffer: Some(framebuffer),
            caches: Some(caches),
            palette: Palette::from_rgb(palette),
            settings,
            pending_gamma: None,
            resolution,
            stats: VideoStats {
                framebuffer_allocations: 1,
                ..VideoStats::default()
            },
        })
    }

    /// Rebuild the whole palette from 256 RGB triples.
    pub fn set_palette(&mut self, palette: &[u8; PALETTE_BYTES]) {
        self.palette.set_rgb(palette);
    }

    /// Palette shifts (damage flashes, powerups) are full rebuilds too.
    pub fn shift_palette(&mut self, palette: &[u8; PALETTE_BYTES]) {
        self.set_palette(palette);
    }

    /// Reallocate the framebuffer at the resolution matching `scale`.
    ///
    /// The old buffer is released before the new one is allocated. Gamma is
    /// forced to [`FORCED_GAMMA`] until the next `present`, which restores
    /// the value in effect before the first pending change.
    pub fn change_resolution(&mut self, scale: f32) -> Result<(), VideoError> {
        let resolution = RESOLUTIONS
            .iter()
            .copied()
            .find(|r| (r.scale - scale).abs() < f32::EPSILON)
            .unwrap_or(RESOLUTIONS[0]);

        if self.framebuffer.take().is_some() {
            self.stats.framebuffer_releases += 1;
        }
        self.framebuffer = Some(IndexedFramebuffer::new(resolution.width, resolution.height)?);
        self.stats.framebuffer_allocations += 1;
        self.resolution = resolution;

        self.pending_gamma.get_or_insert(self.settings.gamma);
        self.settings.gamma = FORCED_GAMMA;
        debug!(width = resolution.width, height = resolution.height, "resolution changed");
        Ok(())
    }

    /// Resolve the framebuffer into the host's back buffer and swap.
    ///
    /// `dirty` is accepted for the engine's benefit; the whole surface is
    /// resolved every frame.
    pub fn present<D: Display>(&mut self, display: &mut D, dirty: &[Rect]) -> Result<(), VideoError> {
        let framebuffer = self.framebuffer.as_ref().ok_or(VideoError::NotInitialized)?;

        if let Some(gamma) = self.pending_gamma.take() {
            self.settings.gamma = gamma;
            debug!(gamma, "gamma restored");
        }

        resolve(framebuffer, &self.palette, &mut display.framebuffer());
        display.flush();
        display.swap_buffers();
        if self.settings.vsync {
            display.wait_for_vsync();
        }

        self.stats.frames_presented += 1;
        trace!(frame = self.stats.frames_presented, dirty = dirty.len(), "presented");
        Ok(())
    }

    /// Release the framebuffer and raster caches.
    pub fn shutdown(&mut self) {
        if self.framebuffer.take().is_some() {
            self.stats.framebuffer_releases += 1;
        }
        self.caches = None;
        debug!("video shut down");
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.framebuffer.is_some()
    }

    #[must_use]
    pub fn framebuffer(&self) -> Option<&IndexedFramebuffer> {
        self.framebuffer.as_ref()
    }

    pub fn framebuffer_mut(&mut self) -> Option<&mut IndexedFramebuffer> {
        self.framebuffer.as_mut()
    }

    pub fn caches_mut(&mut self) -> Option<&mut RasterCaches> {
        self.caches.as_mut()
    }

    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    #[must_use]
    pub fn settings(&self) -> VideoSettings {
        self.settings
    }

    pub fn set_vsync(&mut self, vsync: bool) {
        self.settings.vsync = vsync;
    }

    /// Set gamma directly. A pending restore from a resolution change still
    /// runs on the next `present`.
    pub fn set_gamma(&mut self, gamma: f32) {
        self.settings.gamma = gamma;
    }

    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Aspect correction relative to a 320x240 display.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        (self.resolution.height as f32 / self.resolution.width as f32) * (320.0 / 240.0)
    }

    /// Menu text describing the active resolution.
    #[must_use]
    pub fn resolution_text(&self) -> String {
        format!(
            "Current Resolution: {} x {}",
            self.resolution.width, self.resolution.height
        )
    }

    #[must_use]
    pub fn stats(&self) -> VideoStats {
        self.stats
    }
}
