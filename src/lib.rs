//! # sprite-faces
//!
//! Unsupervised face-grid geometry inference for character sprite sheets.
//!
//! A sprite sheet holds a character's body artwork with a grid of
//! interchangeable face (expression) tiles below it. This crate infers,
//! without annotation:
//! - **Face tile size**: the side of one expression tile
//! - **Body region**: where the face rows end and the body sprite begins
//! - **Reference face**: where a face sits on the body sprite
//! - **Certainty**: a heuristic confidence for the whole record
//!
//! ## Algorithm Overview
//!
//! 1. Composite the sheet against black and pad it with black rows on top
//! 2. For tile sizes 256, 512, ... (while two tiles fit):
//!    - Take the first mostly non-black tile from the bottom left
//!    - Take the next such tile to its right
//!    - Keep the size if both tiles look alike
//! 3. Try the surviving sizes smallest first:
//!    - Walk up the left tile column until two rows in a row stop looking
//!      like the reference face; everything above is body
//!    - Search the reference face on the body and reject the size if it is
//!      not found there
//! 4. Without any surviving size the sheet is a full body sprite
//!
//! ## Quick Start
//!
//! ```rust
//! use image::{Rgb, RgbImage};
//! use sprite_faces::SheetAnalyzerBuilder;
//!
//! let analyzer = SheetAnalyzerBuilder::new()
//!     .min_face_dimension(16)
//!     .padding_top(10)
//!     .build()
//!     .unwrap();
//!
//! // A plain sheet without any repeating tiles.
//! let sheet = RgbImage::from_fn(48, 32, |x, y| Rgb([(x * 5) as u8, (y * 7) as u8, 0]));
//! let geometry = analyzer.analyze(&sheet);
//! println!("{} sheet, certainty {:.2}", geometry.layout, geometry.certainty);
//! ```
//!
//! ## Custom Similarity
//!
//! Implement the [`Similarity`] trait to swap the scoring primitive:
//!
//! ```rust
//! use sprite_faces::{Match, Region, Similarity};
//!
//! struct AlwaysAlike;
//!
//! impl Similarity for AlwaysAlike {
//!     fn compare(&self, _a: &Region<'_>, _b: &Region<'_>) -> f64 {
//!         1.0
//!     }
//!     fn locate(&self, haystack: &Region<'_>, needle: &Region<'_>) -> Option<Match> {
//!         (needle.width() <= haystack.width() && needle.height() <= haystack.height())
//!             .then_some(Match { score: 1.0, x: 0, y: 0 })
//!     }
//! }
//! ```

mod analyzer;
mod buffer;
pub mod compositor;
mod error;
mod estimator;
mod resolver;
pub mod sheet;
mod similarity;
mod tiles;
mod types;

pub use analyzer::{AnalyzerConfig, SheetAnalyzer, SheetAnalyzerBuilder};
pub use buffer::{luma, Region};
pub use error::{Error, Result};
pub use estimator::{candidate_dimensions, estimate_candidates, Alignment, Candidate, CandidateSet};
pub use resolver::{resolve, scan_body_boundary};
pub use sheet::{annotate_sheets, load_sheets, save_sheets, BatchOptions, SheetDescriptor, SheetOutcome};
pub use similarity::{Match, NormedCrossCorrelation, Similarity};
pub use tiles::{find_first_tile, find_tile, Tile};
pub use types::{LayoutKind, SheetGeometry};
