use crate::error::CubeError;
use crate::transform::Image;

/// Source of 8x8 character bitmaps
///
/// Implement this trait to plug in a font table. Bitmaps are returned in
/// their native reading orientation: row 0 at the top, column 0 on the left.
pub trait GlyphLookup {
    /// Bitmap for `ch`, or `None` if the font has no glyph for it
    fn lookup(&self, ch: char) -> Option<Image>;

    /// Check if the font can render `ch`
    ///
    /// Overrides must agree with [`GlyphLookup::lookup`]; a character reported
    /// as supported is still rejected if `lookup` has no bitmap for it.
    fn is_supported(&self, ch: char) -> bool {
        self.lookup(ch).is_some()
    }

    /// Check every character of `text`
    ///
    /// Returns the first unsupported character as an error.
    fn validate(&self, text: &str) -> Result<(), CubeError> {
        match text.chars().find(|&ch| !self.is_supported(ch)) {
            Some(ch) => Err(CubeError::UnsupportedCharacter(ch)),
            None => Ok(()),
        }
    }
}

impl<G: GlyphLookup + ?Sized> GlyphLookup for &G {
    fn lookup(&self, ch: char) -> Option<Image> {
        (**self).lookup(ch)
    }

    fn is_supported(&self, ch: char) -> bool {
        (**self).is_supported(ch)
    }
}
