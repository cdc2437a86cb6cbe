//! Stroke datasets: the collected-sample text format and a seeded synthetic generator.

pub mod collected;
pub mod synthetic;

pub use collected::{format_line, load_collected, parse_line, read_collected};
pub use synthetic::{render_stream, StrokeDataset, StrokeDatasetConfig, StrokeTemplate};
