//! Font loading and glyph rasterization
//!
//! Wraps fontdue behind a small engine type whose lifetime is scoped to
//! the atlas sub-pipeline: constructed right before the first atlas step
//! and dropped unconditionally when the pipeline finishes or fails.
//! Nothing here is thread-safe and nothing needs to be - the pipeline is
//! single-threaded by design.

use thiserror::Error;

/// Fatal font error. Failing to construct the primary font aborts the
/// whole atlas sub-pipeline.
#[derive(Debug, Clone, Error)]
pub enum FontError {
    #[error("failed to construct font '{name}': {message}")]
    Construct { name: String, message: String },
    #[error("no font loaded at slot {0}")]
    BadSlot(usize),
}

/// Handle to a loaded font within the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSlot(usize);

/// A rasterized glyph: alpha coverage plus placement metrics.
#[derive(Debug, Clone)]
pub struct RasterGlyph {
    pub width: u32,
    pub height: u32,
    /// Horizontal advance in pixels at the rasterized size.
    pub advance: f32,
    /// Offset of the bitmap from the glyph origin.
    pub xmin: i32,
    pub ymin: i32,
    /// Row-major alpha coverage, `width * height` bytes.
    pub coverage: Vec<u8>,
}

/// Font engine holding the primary and fallback fonts of one atlas run.
pub struct FontEngine {
    fonts: Vec<(String, fontdue::Font)>,
}

impl FontEngine {
    pub fn new() -> Self {
        Self { fonts: Vec::new() }
    }

    /// Load a font from raw bytes. The name is used in diagnostics only.
    pub fn load(&mut self, name: &str, bytes: &[u8]) -> Result<FontSlot, FontError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()).map_err(
            |message| FontError::Construct {
                name: name.to_string(),
                message: message.to_string(),
            },
        )?;
        self.fonts.push((name.to_string(), font));
        Ok(FontSlot(self.fonts.len() - 1))
    }

    pub fn name(&self, slot: FontSlot) -> &str {
        self.fonts
            .get(slot.0)
            .map(|(name, _)| name.as_str())
            .unwrap_or("?")
    }

    fn font(&self, slot: FontSlot) -> Result<&fontdue::Font, FontError> {
        self.fonts
            .get(slot.0)
            .map(|(_, font)| font)
            .ok_or(FontError::BadSlot(slot.0))
    }

    /// Whether the font has a real glyph (not .notdef) for a character.
    pub fn has_glyph(&self, slot: FontSlot, c: char) -> bool {
        self.font(slot)
            .map(|font| font.lookup_glyph_index(c) != 0)
            .unwrap_or(false)
    }

    /// Bitmap extent of a glyph at the given pixel size, without
    /// rasterizing its coverage.
    pub fn glyph_extent(&self, slot: FontSlot, c: char, px: f32) -> (u32, u32) {
        self.font(slot)
            .map(|font| {
                let metrics = font.metrics(c, px);
                (metrics.width as u32, metrics.height as u32)
            })
            .unwrap_or((0, 0))
    }

    /// Rasterize one glyph at the given pixel size.
    pub fn rasterize(&self, slot: FontSlot, c: char, px: f32) -> Result<RasterGlyph, FontError> {
        let font = self.font(slot)?;
        let (metrics, coverage) = font.rasterize(c, px);
        Ok(RasterGlyph {
            width: metrics.width as u32,
            height: metrics.height as u32,
            advance: metrics.advance_width,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            coverage,
        })
    }
}

impl Default for FontEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_font_bytes_fail_construction() {
        let mut engine = FontEngine::new();
        let err = engine.load("broken", &[0u8; 16]).unwrap_err();
        match err {
            FontError::Construct { name, .. } => assert_eq!(name, "broken"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_bad_slot_reported() {
        let engine = FontEngine::new();
        assert!(!engine.has_glyph(FontSlot(3), 'a'));
        assert!(matches!(
            engine.rasterize(FontSlot(3), 'a', 16.0),
            Err(FontError::BadSlot(3))
        ));
    }
}
