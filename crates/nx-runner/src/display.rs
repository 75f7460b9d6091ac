//! Display hosts: a `pixels` window and an in-memory surface for headless
//! runs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use nx_port::host::{Display, Surface};
use pixels::{Pixels, SurfaceTexture};
use tracing::{error, warn};
use winit::window::Window;

/// Console screen dimensions.
pub const SCREEN_WIDTH: u32 = 1280;
pub const SCREEN_HEIGHT: u32 = 720;

/// Vertical blank interval at 60 Hz.
const FRAME_DURATION: Duration = Duration::from_micros(16_667);

/// Front and back RGBA surfaces.
struct SwapChain {
    width: u32,
    height: u32,
    buffers: [Vec<u32>; 2],
    back: usize,
}

impl SwapChain {
    fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            buffers: [vec![0; len], vec![0; len]],
            back: 0,
        }
    }

    fn surface(&mut self) -> Surface<'_> {
        Surface {
            width: self.width,
            height: self.height,
            pixels: &mut self.buffers[self.back],
        }
    }

    fn back(&self) -> &[u32] {
        &self.buffers[self.back]
    }

    fn front(&self) -> &[u32] {
        &self.buffers[self.back ^ 1]
    }

    fn swap(&mut self) {
        self.back ^= 1;
    }
}

/// Sleeps until the next 60 Hz boundary.
struct VblankPacer {
    next: Instant,
}

impl VblankPacer {
    fn new() -> Self {
        Self {
            next: Instant::now() + FRAME_DURATION,
        }
    }

    fn wait(&mut self) {
        let now = Instant::now();
        if now < self.next {
            std::thread::sleep(self.next - now);
            self.next += FRAME_DURATION;
        } else {
            // Fell behind: resynchronise.
            self.next = now + FRAME_DURATION;
        }
    }
}

/// Copy packed RGBA words into a byte frame in R, G, B, A order.
pub fn copy_rgba(src: &[u32], frame: &mut [u8]) {
    for (dst, &px) in frame.chunks_exact_mut(4).zip(src) {
        dst.copy_from_slice(&px.to_le_bytes());
    }
}

/// Window display backed by `pixels`.
pub struct PixelsDisplay {
    pixels: Pixels<'static>,
    chain: SwapChain,
    pacer: VblankPacer,
    lost: bool,
}

impl PixelsDisplay {
    pub fn new(window: Arc<Window>) -> Result<Self, pixels::Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width.max(1), size.height.max(1), window);
        let pixels = Pixels::new(SCREEN_WIDTH, SCREEN_HEIGHT, surface)?;
        Ok(Self {
            pixels,
            chain: SwapChain::new(SCREEN_WIDTH, SCREEN_HEIGHT),
            pacer: VblankPacer::new(),
            lost: false,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let Err(e) = self.pixels.resize_surface(width, height) {
            warn!("surface resize to {width}x{height} failed: {e}");
        }
    }

    /// Whether the last swap failed to reach the screen.
    #[must_use]
    pub fn is_lost(&self) -> bool {
        self.lost
    }
}

impl Display for PixelsDisplay {
    fn framebuffer(&mut self) -> Surface<'_> {
        self.chain.surface()
    }

    fn flush(&mut self) {
        copy_rgba(self.chain.back(), self.pixels.frame_mut());
    }

    fn swap_buffers(&mut self) {
        if let Err(e) = self.pixels.render() {
            error!("render failed: {e}");
            self.lost = true;
        }
        self.chain.swap();
    }

    fn wait_for_vsync(&mut self) {
        self.pacer.wait();
    }
}

/// Display that presents into memory. Vsync is paced like the window so
/// headless timing matches.
pub struct HeadlessDisplay {
    chain: SwapChain,
    pacer: Option<VblankPacer>,
    frames: u64,
}

impl HeadlessDisplay {
    #[must_use]
    pub fn new(paced: bool) -> Self {
        Self {
            chain: SwapChain::new(SCREEN_WIDTH, SCREEN_HEIGHT),
            pacer: paced.then(VblankPacer::new),
            frames: 0,
        }
    }

    /// The most recently presented surface.
    #[must_use]
    pub fn front(&self) -> &[u32] {
        self.chain.front()
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Display for HeadlessDisplay {
    fn framebuffer(&mut self) -> Surface<'_> {
        self.chain.surface()
    }

    fn flush(&mut self) {}

    fn swap_buffers(&mut self) {
        self.chain.swap();
        self.frames += 1;
    }

    fn wait_for_vsync(&mut self) {
        if let Some(pacer) = self.pacer.as_mut() {
            pacer.wait();
        }
    }
}
