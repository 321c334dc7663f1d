//! Output format configuration types

/// Container written by the frame sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// Lossless PNG, 8-bit RGBA color and 16-bit grayscale depth
    #[default]
    Png,
    /// TIFF with selectable compression
    Tiff,
}

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    #[default]
    None,
    /// LZW compression (slow, good compression)
    Lzw,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - balanced
    DeflateBalanced,
    /// Deflate compression - best compression (slower)
    DeflateBest,
}
