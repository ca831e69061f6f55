use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::RgbImage;
use log::info;
use serde::{Deserialize, Serialize};

use crate::compositor::{self, DEFAULT_INVERT_BLACK_RATIO};
use crate::error::{Error, Result};
use crate::estimator::estimate_candidates;
use crate::resolver::resolve;
use crate::similarity::{NormedCrossCorrelation, Similarity};
use crate::types::SheetGeometry;

/// Tuning knobs for face geometry inference.
///
/// The defaults match sheets with expression tiles of 256 px and up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Smallest face tile size tried; larger sizes double from here.
    pub min_face_dimension: u32,
    /// A face sample may be at most this share black.
    pub max_background_ratio: f64,
    /// Two tiles must score above this to count as the same kind of face.
    pub min_face_similarity: f64,
    /// The reference face must be found on the body with at least this score.
    pub min_face_body_similarity: f64,
    /// Black rows added above the sheet before analysis.
    pub padding_top: u32,
    /// Composited sheets blacker than this are inverted on load.
    pub invert_black_ratio: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_face_dimension: 256,
            max_background_ratio: 0.75,
            min_face_similarity: 0.9,
            min_face_body_similarity: 0.50,
            padding_top: 150,
            invert_black_ratio: DEFAULT_INVERT_BLACK_RATIO,
        }
    }
}

impl AnalyzerConfig {
    /// Load a configuration from a JSON file. Missing fields keep their
    /// defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_face_dimension == 0 {
            return Err(Error::InvalidConfig(
                "minFaceDimension must be positive".into(),
            ));
        }
        let ratios = [
            ("maxBackgroundRatio", self.max_background_ratio),
            ("minFaceSimilarity", self.min_face_similarity),
            ("minFaceBodySimilarity", self.min_face_body_similarity),
            ("invertBlackRatio", self.invert_black_ratio),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Infers face grid geometry for sprite sheets.
///
/// # Usage
///
/// ```ignore
/// let analyzer = SheetAnalyzer::default();
/// let geometry = analyzer.analyze_path("sheet.png")?;
/// println!("{:?} faces of {:?} px", geometry.layout, geometry.face_dimension);
/// ```
#[derive(Debug, Clone)]
pub struct SheetAnalyzer<S = NormedCrossCorrelation> {
    config: AnalyzerConfig,
    similarity: S,
}

impl Default for SheetAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default(), NormedCrossCorrelation)
    }
}

impl<S: Similarity> SheetAnalyzer<S> {
    pub fn new(config: AnalyzerConfig, similarity: S) -> Self {
        Self { config, similarity }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Load the sheet at `path` and infer its geometry.
    pub fn analyze_path<P: AsRef<Path>>(&self, path: P) -> Result<SheetGeometry> {
        let path = path.as_ref();
        info!("Analyzing {}", path.display());
        let sheet = compositor::load(path, self.config.invert_black_ratio)?;
        Ok(self.analyze(&sheet))
    }

    /// Infer the geometry of an already composited, unpadded sheet.
    pub fn analyze(&self, sheet: &RgbImage) -> SheetGeometry {
        let padded = compositor::pad_top(sheet, self.config.padding_top);
        let candidates = estimate_candidates(&padded, &self.config, &self.similarity);
        info!("Face size candidates: {:?}", candidates.dimensions());
        resolve(&padded, candidates, &self.config, &self.similarity)
    }
}

/// Builder for a validated [`SheetAnalyzer`].
pub struct SheetAnalyzerBuilder<S = NormedCrossCorrelation> {
    config: AnalyzerConfig,
    similarity: S,
}

impl SheetAnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            config: AnalyzerConfig::default(),
            similarity: NormedCrossCorrelation,
        }
    }
}

impl Default for SheetAnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Similarity> SheetAnalyzerBuilder<S> {
    /// Replace the whole configuration.
    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn min_face_dimension(mut self, dim: u32) -> Self {
        self.config.min_face_dimension = dim;
        self
    }

    pub fn padding_top(mut self, rows: u32) -> Self {
        self.config.padding_top = rows;
        self
    }

    /// Use a different similarity primitive.
    pub fn similarity<T: Similarity>(self, similarity: T) -> SheetAnalyzerBuilder<T> {
        SheetAnalyzerBuilder {
            config: self.config,
            similarity,
        }
    }

    /// Validate the configuration and build the analyzer.
    pub fn build(self) -> Result<SheetAnalyzer<S>> {
        self.config.validate()?;
        Ok(SheetAnalyzer::new(self.config, self.similarity))
    }
}
