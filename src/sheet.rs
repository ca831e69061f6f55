//! Sprite sheet descriptors and the batch annotation driver.
//!
//! A data file is a JSON array of descriptors. Each descriptor carries at
//! least a `path` to its image; any other fields are preserved as they are,
//! in their original order after `path`, which is always written first.
//! Annotation merges the inferred geometry into
//! each descriptor under the field names the renderer reads:
//!
//! | field           | meaning                                   |
//! |-----------------|-------------------------------------------|
//! | `bodyHeight`    | height of the body sprite                 |
//! | `bodyWidth`     | width of the body sprite                  |
//! | `eWidth`        | expression tile width                     |
//! | `eHeight`       | expression tile height                    |
//! | `headX`/`headY` | position of the face on the body          |
//! | `dialogOffsetX` | horizontal dialog offset (always 0)       |
//! | `specialFormat` | 0 = body with expressions, 1 = full body  |
//! | `certainty`     | confidence in `[0, 1]`                    |
//!
//! `dialogOffsetY` is calibrated by hand and never written.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analyzer::SheetAnalyzer;
use crate::error::Result;
use crate::similarity::Similarity;
use crate::types::{LayoutKind, SheetGeometry};

/// Certainty at or above which a sheet counts as manually calibrated.
pub const MANUAL_CERTAINTY: f64 = 100.0;

/// Certainty a sheet needs before it is considered approved.
pub const APPROVED_CERTAINTY: f64 = 0.99;

/// Face fields cleared when a sheet turns out to be a full body sprite.
const FACE_FIELDS: [&str; 4] = ["eWidth", "eHeight", "headX", "headY"];

/// One entry of a sheet data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetDescriptor {
    pub path: PathBuf,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SheetDescriptor {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            fields: Map::new(),
        }
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    fn is_set(&self, key: &str) -> bool {
        self.fields.get(key).is_some_and(|v| !v.is_null())
    }

    pub fn certainty(&self) -> Option<f64> {
        self.number("certainty")
    }

    /// Hand-corrected sheets are marked with a certainty of 100 or more.
    pub fn is_manually_calibrated(&self) -> bool {
        self.certainty().is_some_and(|c| c >= MANUAL_CERTAINTY)
    }

    /// Whether expression tiles have been located on this sheet.
    pub fn has_expressions(&self) -> bool {
        let positive = |key| self.number(key).is_some_and(|v| v > 0.0);
        positive("eWidth") && positive("eHeight") && self.is_set("headX") && self.is_set("headY")
    }

    /// Whether the sheet is ready for display: both dialog offsets are set
    /// and the geometry is (nearly) certain.
    pub fn is_approved(&self) -> bool {
        self.is_set("dialogOffsetX")
            && self.is_set("dialogOffsetY")
            && self.certainty().is_some_and(|c| c >= APPROVED_CERTAINTY)
    }

    /// The layout recorded on the descriptor, if any.
    pub fn layout(&self) -> Option<LayoutKind> {
        let code = self.fields.get("specialFormat")?.as_u64()?;
        u8::try_from(code).ok()?.try_into().ok()
    }

    /// Merge `geometry` into the descriptor's fields.
    pub fn apply_geometry(&mut self, geometry: &SheetGeometry) {
        let fields = &mut self.fields;
        fields.insert("bodyHeight".into(), geometry.body_height.into());
        fields.insert("bodyWidth".into(), geometry.body_width.into());

        match geometry.face_dimension {
            Some(dim) => {
                fields.insert("eWidth".into(), dim.into());
                fields.insert("eHeight".into(), dim.into());
                fields.insert("headX".into(), geometry.reference_face_x.into());
                fields.insert("headY".into(), geometry.reference_face_y.into());
            }
            None => {
                for key in FACE_FIELDS {
                    if fields.contains_key(key) {
                        fields.insert(key.into(), Value::Null);
                    }
                }
            }
        }
        if let Some(offset) = geometry.dialog_offset_x {
            fields.insert("dialogOffsetX".into(), offset.into());
        }
        fields.insert("specialFormat".into(), geometry.layout.code().into());
        fields.insert("certainty".into(), geometry.certainty.into());
    }
}

/// Read a sheet data file.
pub fn load_sheets<P: AsRef<Path>>(path: P) -> Result<Vec<SheetDescriptor>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Write a sheet data file, replacing any existing content.
pub fn save_sheets<P: AsRef<Path>>(path: P, sheets: &[SheetDescriptor], pretty: bool) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, sheets)?;
    } else {
        serde_json::to_writer(&mut writer, sheets)?;
    }
    writer.flush()?;
    Ok(())
}

/// Options for [`annotate_sheets`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Number of worker threads.
    pub jobs: usize,
    /// Directory relative image paths are resolved against.
    pub base_dir: Option<PathBuf>,
    /// Re-analyze sheets that were calibrated by hand.
    pub recalibrate_manual: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            base_dir: None,
            recalibrate_manual: false,
        }
    }
}

/// Outcome for one descriptor of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetOutcome {
    Annotated(SheetGeometry),
    /// Left alone because it was calibrated by hand.
    SkippedManual,
}

fn image_path(sheet: &SheetDescriptor, base_dir: Option<&Path>) -> PathBuf {
    match base_dir {
        Some(dir) if sheet.path.is_relative() => dir.join(&sheet.path),
        _ => sheet.path.clone(),
    }
}

/// Analyze every sheet and merge the results into the descriptors.
///
/// Sheets are independent and run on a pool of `options.jobs` threads. The
/// first image that fails to decode aborts the batch; descriptors may then be
/// partially annotated and should not be saved.
pub fn annotate_sheets<S: Similarity>(
    analyzer: &SheetAnalyzer<S>,
    sheets: &mut [SheetDescriptor],
    options: &BatchOptions,
) -> Result<Vec<SheetOutcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.max(1))
        .build()?;
    let base_dir = options.base_dir.as_deref();

    pool.install(|| {
        sheets
            .par_iter_mut()
            .map(|sheet| {
                if sheet.is_manually_calibrated() && !options.recalibrate_manual {
                    info!(
                        "Skipping manually calibrated sheet {}",
                        sheet.path.display()
                    );
                    return Ok(SheetOutcome::SkippedManual);
                }
                let geometry = analyzer.analyze_path(image_path(sheet, base_dir))?;
                sheet.apply_geometry(&geometry);
                info!("{}: {:?}", sheet.path.display(), geometry);
                Ok(SheetOutcome::Annotated(geometry))
            })
            .collect()
    })
}
