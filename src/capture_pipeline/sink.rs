//! Frame sink module
//!
//! Turns in-memory frames into sequentially numbered image files.

mod writer;
mod png_writer;
mod standard_tiff_writer;
mod frame_sink;
pub mod types;


pub use writer::ImageWriter;
pub use png_writer::PngWriter;
pub use standard_tiff_writer::StandardTiffWriter;
pub use frame_sink::FrameSink;
pub use types::{ImageFormat, TiffCompression};
