//! Multi-scale guess of the face tile size.
//!
//! For each candidate size the estimator samples two neighbouring usable
//! tiles from the bottom of the sheet. If they look alike, the size is kept
//! as a [`Candidate`]; the resolver decides between the survivors.

use std::collections::BTreeMap;

use image::RgbImage;
use log::{debug, info};

use crate::analyzer::AnalyzerConfig;
use crate::buffer::Region;
use crate::similarity::Similarity;
use crate::tiles::{find_first_tile, find_tile};

/// Side of the sheet the face grid is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Alignment {
    Left,
}

impl std::fmt::Display for Alignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alignment::Left => f.write_str("left"),
        }
    }
}

/// A plausible face tile size together with the evidence for it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub dimension: u32,
    pub alignment: Alignment,
    /// Similarity between the two sampled tiles.
    pub similarity: f64,
    /// The first sampled tile, used as the face reference.
    pub sample: RgbImage,
    /// Origin of the sample in the analysed buffer.
    pub origin: (u32, u32),
}

impl Candidate {
    pub fn key(&self) -> (u32, Alignment) {
        (self.dimension, self.alignment)
    }
}

/// Candidates keyed by `(dimension, alignment)`, ordered smallest first.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    entries: BTreeMap<(u32, Alignment), Candidate>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a candidate, replacing any previous one with the same key.
    pub fn insert(&mut self, candidate: Candidate) {
        self.entries.insert(candidate.key(), candidate);
    }

    /// The candidate with the smallest dimension.
    pub fn smallest(&self) -> Option<&Candidate> {
        self.entries.values().next()
    }

    /// Remove a candidate, returning it if it was present.
    pub fn discard(&mut self, key: (u32, Alignment)) -> Option<Candidate> {
        self.entries.remove(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Candidate dimensions in ascending order.
    pub fn dimensions(&self) -> Vec<u32> {
        self.entries.keys().map(|(dim, _)| *dim).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.entries.values()
    }
}

/// Tile sizes tried for an image of the given size: `min`, `2·min`, … while
/// two tiles still fit along both axes.
pub fn candidate_dimensions(min_dimension: u32, rows: u32, cols: u32) -> Vec<u32> {
    if min_dimension == 0 {
        return Vec::new();
    }
    std::iter::successors(Some(min_dimension), |d| d.checked_mul(2))
        .take_while(|d| d.checked_mul(2).is_some_and(|two| two <= rows && two <= cols))
        .collect()
}

/// Collect face size candidates for the (padded) sheet buffer.
pub fn estimate_candidates<S: Similarity>(
    image: &RgbImage,
    config: &AnalyzerConfig,
    similarity: &S,
) -> CandidateSet {
    let full = Region::full(image);
    let mut candidates = CandidateSet::new();

    for dim in candidate_dimensions(config.min_face_dimension, image.height(), image.width()) {
        let first = find_first_tile(&full, dim, config.max_background_ratio);
        let second = first.and_then(|first| {
            find_tile(
                &full,
                dim,
                first.x + dim,
                first.y as i64,
                config.max_background_ratio,
            )
        });

        let (Some(first), Some(second)) = (first, second) else {
            info!("Dimensions of {} skipped due to bad face samples.", dim);
            continue;
        };

        let score = similarity.compare(&first.region, &second.region);
        debug!(
            "{}: ({}, {}) vs ({}, {}) scored {:.4}",
            dim, first.x, first.y, second.x, second.y, score
        );
        if score > config.min_face_similarity {
            candidates.insert(Candidate {
                dimension: dim,
                alignment: Alignment::Left,
                similarity: score,
                sample: first.region.to_image(),
                origin: (first.x, first.y),
            });
        }
    }

    candidates
}
