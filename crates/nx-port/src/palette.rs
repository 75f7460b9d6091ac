//! 256-entry RGBA palette.
//!
//! The engine describes colours as 256 packed RGB triples (768 bytes). The
//! presenter expands them to 32-bit RGBA words once per palette change so the
//! per-frame resolve is a single table lookup per pixel.

/// Number of palette entries.
pub const PALETTE_SIZE: usize = 256;

/// Size of the engine's packed RGB palette in bytes.
pub const PALETTE_BYTES: usize = PALETTE_SIZE * 3;

/// Pack one colour as RGBA with alpha forced to fully opaque.
///
/// Red lands in the low byte, so on a little-endian host the word's bytes
/// read R, G, B, A in memory order.
#[must_use]
pub const fn pack_rgba(r: u8, g: u8, b: u8) -> u32 {
    r as u32 | (g as u32) << 8 | (b as u32) << 16 | 0xFF << 24
}

/// Split a packed word back into `[r, g, b, a]`.
#[must_use]
pub const fn unpack_rgba(colour: u32) -> [u8; 4] {
    colour.to_le_bytes()
}

/// Palette lookup table: index → packed RGBA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [u32; PALETTE_SIZE],
}

impl Palette {
    /// Build a palette from 256 packed RGB triples.
    #[must_use]
    pub fn from_rgb(rgb: &[u8; PALETTE_BYTES]) -> Self {
        let mut palette = Self {
            entries: [0; PALETTE_SIZE],
        };
        palette.set_rgb(rgb);
        palette
    }

    /// Rebuild every entry from 256 packed RGB triples.
    pub fn set_rgb(&mut self, rgb: &[u8; PALETTE_BYTES]) {
        for (entry, triple) in self.entries.iter_mut().zip(rgb.chunks_exact(3)) {
            *entry = pack_rgba(triple[0], triple[1], triple[2]);
        }
    }

    #[must_use]
    pub fn entry(&self, index: u8) -> u32 {
        self.entries[index as usize]
    }

    #[must_use]
    pub fn entries(&self) -> &[u32; PALETTE_SIZE] {
        &self.entries
    }
}

impl Default for Palette {
    /// All entries opaque black.
    fn default() -> Self {
        Self {
            entries: [pack_rgba(0, 0, 0); PALETTE_SIZE],
        }
    }
}
