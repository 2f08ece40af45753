//! Glyph atlas synthesis
//!
//! Given the characters a language group needs and a font, searches
//! atlas dimensions and point sizes for the smallest single texture page
//! that holds every glyph at the sharpest size, then materializes the
//! winning attempt into an image plus a metadata sidecar. Characters the
//! primary font cannot carry go through an ordered fallback font chain.
//!
//! Packing uses shelf bin packing: glyphs sorted tallest first, placed
//! into horizontal shelves.

use std::collections::BTreeSet;

use image::{Rgba, RgbaImage};
use serde::Serialize;

use crate::charset::RequiredChars;
use crate::font::{FontEngine, FontError, FontSlot};

/// Power-of-two dimension ladder searched for atlas pages.
pub const SIZE_LADDER: [u32; 5] = [256, 512, 1024, 2048, 4096];

/// Transparent background for atlas pages.
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Source of glyph coverage and extents for packing.
///
/// The pipeline uses a [`FontEngine`] behind this; the search tests use
/// synthetic glyphs so search behavior is pinned down independently of
/// any real font file.
pub trait GlyphSource {
    fn has_glyph(&self, c: char) -> bool;
    /// Bitmap extent of the glyph at the given pixel size.
    fn glyph_extent(&self, c: char, px: f32) -> (u32, u32);
}

/// Glyph source backed by one engine font.
pub struct EngineGlyphs<'a> {
    engine: &'a FontEngine,
    slot: FontSlot,
}

impl<'a> EngineGlyphs<'a> {
    pub fn new(engine: &'a FontEngine, slot: FontSlot) -> Self {
        Self { engine, slot }
    }
}

impl GlyphSource for EngineGlyphs<'_> {
    fn has_glyph(&self, c: char) -> bool {
        self.engine.has_glyph(self.slot, c)
    }

    fn glyph_extent(&self, c: char, px: f32) -> (u32, u32) {
        self.engine.glyph_extent(self.slot, c, px)
    }
}

/// Placement of one glyph within an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphPlacement {
    pub ch: char,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// One packing attempt at a fixed (font size, width, height).
///
/// Transient during the search; only the best attempt is materialized.
#[derive(Debug, Clone)]
pub struct AtlasAttempt {
    pub font_size: u32,
    pub width: u32,
    pub height: u32,
    /// Characters not on the page: absent from the font, or out of room.
    pub missing: BTreeSet<char>,
    pub placements: Vec<GlyphPlacement>,
}

impl AtlasAttempt {
    /// Every required character made it onto the single page.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// A shelf in the shelf packing algorithm.
#[derive(Debug)]
struct Shelf {
    y: u32,
    height: u32,
    width_used: u32,
}

/// Try to place a padded rectangle in the given shelves.
fn try_place(
    shelves: &mut Vec<Shelf>,
    padded_w: u32,
    padded_h: u32,
    max: (u32, u32),
) -> Option<(u32, u32)> {
    for shelf in shelves.iter_mut() {
        if padded_h <= shelf.height && shelf.width_used + padded_w <= max.0 {
            let pos = (shelf.width_used, shelf.y);
            shelf.width_used += padded_w;
            return Some(pos);
        }
    }

    let new_shelf_y = shelves.last().map(|s| s.y + s.height).unwrap_or(0);
    if new_shelf_y + padded_h <= max.1 && padded_w <= max.0 {
        shelves.push(Shelf { y: new_shelf_y, height: padded_h, width_used: padded_w });
        return Some((0, new_shelf_y));
    }

    None
}

/// Pack every required character onto one page at a fixed size.
///
/// Glyphs are sorted tallest first (better shelf packing), ties broken
/// by code point so the result is deterministic.
pub fn try_pack(
    source: &dyn GlyphSource,
    chars: &RequiredChars,
    font_size: u32,
    width: u32,
    height: u32,
    padding: u32,
) -> AtlasAttempt {
    let mut missing = BTreeSet::new();
    let mut measured: Vec<(char, u32, u32)> = Vec::new();

    for c in chars.chars() {
        if !source.has_glyph(c) {
            missing.insert(c);
            continue;
        }
        let (w, h) = source.glyph_extent(c, font_size as f32);
        measured.push((c, w, h));
    }

    measured.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

    let mut shelves: Vec<Shelf> = Vec::new();
    let mut placements = Vec::new();
    for (c, w, h) in measured {
        match try_place(&mut shelves, w + padding, h + padding, (width, height)) {
            Some((x, y)) => placements.push(GlyphPlacement { ch: c, x, y, w, h }),
            None => {
                missing.insert(c);
            }
        }
    }

    AtlasAttempt { font_size, width, height, missing, placements }
}

/// Search atlas dimensions and font sizes for the best attempt.
///
/// Width walks the ladder smallest first; height walks the ladder up to
/// the width's rung; the font size grows from the configured minimum
/// while a complete pack still fits. The first size that no longer fits
/// after a success ends the search with the last success - smallest
/// dimensions, sharpest text. If nothing ever fits completely the best
/// partial attempt is returned (fewest missing characters; ties keep
/// the first found in width-major, height, font-size order).
pub fn search_atlas(
    source: &dyn GlyphSource,
    chars: &RequiredChars,
    min_font_size: u32,
    padding: u32,
) -> AtlasAttempt {
    let min_font_size = min_font_size.max(1);

    if chars.is_empty() {
        return AtlasAttempt {
            font_size: min_font_size,
            width: SIZE_LADDER[0],
            height: SIZE_LADDER[0],
            missing: BTreeSet::new(),
            placements: Vec::new(),
        };
    }

    let mut best_partial: Option<AtlasAttempt> = None;

    for (rung, &width) in SIZE_LADDER.iter().enumerate() {
        for &height in &SIZE_LADDER[..=rung] {
            let mut best_complete: Option<AtlasAttempt> = None;
            let mut font_size = min_font_size;
            loop {
                let attempt = try_pack(source, chars, font_size, width, height, padding);
                if attempt.is_complete() {
                    best_complete = Some(attempt);
                    // Keep growing while it still fits - maximize sharpness.
                    font_size += 1;
                    if font_size > *SIZE_LADDER.last().unwrap() {
                        // Degenerate glyph source; the page can't be outgrown.
                        return best_complete.unwrap();
                    }
                    continue;
                }
                if let Some(complete) = best_complete {
                    // First size that no longer fits after a success.
                    return complete;
                }
                let better = best_partial
                    .as_ref()
                    .map(|best| attempt.missing.len() < best.missing.len())
                    .unwrap_or(true);
                if better {
                    best_partial = Some(attempt);
                }
                break;
            }
        }
    }

    // Best effort; the caller logs the remaining missing characters and
    // pushes them through the fallback chain.
    best_partial.expect("non-empty charset always produces an attempt")
}

/// One glyph's rect and metrics in atlas metadata.
#[derive(Debug, Clone, Serialize)]
pub struct GlyphFrame {
    pub ch: char,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub xmin: i32,
    pub ymin: i32,
    pub advance: f32,
}

/// Metadata sidecar written next to each atlas page.
#[derive(Debug, Clone, Serialize)]
pub struct AtlasMetadata {
    pub image: String,
    pub size: [u32; 2],
    pub font: String,
    pub font_size: u32,
    pub glyphs: std::collections::BTreeMap<String, GlyphFrame>,
}

/// A materialized atlas page.
#[derive(Debug)]
pub struct AtlasPage {
    pub image: RgbaImage,
    pub metadata: AtlasMetadata,
}

fn glyph_key(c: char) -> String {
    format!("U+{:04X}", c as u32)
}

/// Render an attempt's placements into a real atlas page.
pub fn materialize(
    engine: &FontEngine,
    slot: FontSlot,
    attempt: &AtlasAttempt,
    image_name: &str,
) -> Result<AtlasPage, FontError> {
    let mut image = RgbaImage::from_pixel(attempt.width, attempt.height, TRANSPARENT);
    let mut glyphs = std::collections::BTreeMap::new();

    for placement in &attempt.placements {
        let glyph = engine.rasterize(slot, placement.ch, attempt.font_size as f32)?;
        for gy in 0..glyph.height.min(placement.h) {
            for gx in 0..glyph.width.min(placement.w) {
                let alpha = glyph.coverage[(gy * glyph.width + gx) as usize];
                let x = placement.x + gx;
                let y = placement.y + gy;
                if x < image.width() && y < image.height() {
                    image.put_pixel(x, y, Rgba([255, 255, 255, alpha]));
                }
            }
        }
        glyphs.insert(
            glyph_key(placement.ch),
            GlyphFrame {
                ch: placement.ch,
                x: placement.x,
                y: placement.y,
                w: placement.w,
                h: placement.h,
                xmin: glyph.xmin,
                ymin: glyph.ymin,
                advance: glyph.advance,
            },
        );
    }

    let metadata = AtlasMetadata {
        image: format!("{}.png", image_name),
        size: [attempt.width, attempt.height],
        font: engine.name(slot).to_string(),
        font_size: attempt.font_size,
        glyphs,
    };

    Ok(AtlasPage { image, metadata })
}

/// First-fit assignment of leftover characters to fallback fonts.
#[derive(Debug, Default)]
pub struct FallbackReport {
    /// Characters each fallback (by chain index) ended up owning.
    pub owned: Vec<(usize, Vec<char>)>,
    /// Characters no fallback could carry.
    pub unresolved: Vec<char>,
    /// One warning per unresolved character, naming the offending
    /// identifier where one is known.
    pub warnings: Vec<String>,
}

/// Walk the fallback chain for the characters the primary atlas lacks.
///
/// Each font is attacked independently, first fit owns the character. A
/// fallback that adds nothing beyond the always-include ASCII coverage
/// is skipped entirely. Characters left over after the chain are soft
/// failures: warned per character, never a hard stop.
pub fn assign_fallbacks(
    chain: &[&dyn GlyphSource],
    missing: &BTreeSet<char>,
    required: &RequiredChars,
) -> FallbackReport {
    let mut report = FallbackReport::default();
    let mut remaining: BTreeSet<char> = missing.clone();

    for (index, source) in chain.iter().enumerate() {
        if remaining.is_empty() {
            break;
        }

        // Default-engine-coverage check: skip fonts that would only
        // contribute ASCII the primary already handles.
        let adds_beyond_ascii = remaining
            .iter()
            .any(|&c| !c.is_ascii() && source.has_glyph(c));
        if !adds_beyond_ascii {
            continue;
        }

        let mut owned = Vec::new();
        remaining.retain(|&c| {
            if source.has_glyph(c) {
                owned.push(c);
                false
            } else {
                true
            }
        });
        if !owned.is_empty() {
            report.owned.push((index, owned));
        }
    }

    for c in remaining {
        let owner = required.owner(c).unwrap_or("<built-in set>");
        report.warnings.push(format!(
            "glyph U+{:04X} '{}' (first required by '{}') not found in the primary font or any fallback",
            c as u32, c, owner
        ));
        report.unresolved.push(c);
    }

    report
}

/// Pack one fallback font's owned characters at a fixed size.
///
/// Fallback fonts are not searched; the page just grows along the
/// ladder until everything fits (or the ladder ends, best effort).
pub fn pack_fallback(
    source: &dyn GlyphSource,
    chars: &[char],
    font_size: u32,
    padding: u32,
) -> AtlasAttempt {
    let mut required = RequiredChars::default();
    for &c in chars {
        required.add_char(c);
    }

    let mut best: Option<AtlasAttempt> = None;
    for &size in &SIZE_LADDER {
        let attempt = try_pack(source, &required, font_size, size, size, padding);
        if attempt.is_complete() {
            return attempt;
        }
        let better = best
            .as_ref()
            .map(|b| attempt.missing.len() < b.missing.len())
            .unwrap_or(true);
        if better {
            best = Some(attempt);
        }
    }
    best.expect("ladder is non-empty")
}
