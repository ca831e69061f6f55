//! Turn face size candidates into a final sheet geometry.
//!
//! Candidates are tried smallest first. Large tiles tend to score too well
//! against their neighbours, and every candidate already passed the
//! similarity threshold, so the smallest size wins over the best score.
//!
//! For the chosen size the resolver walks up the left column of the sheet
//! one tile at a time. The body starts where two consecutive tiles no longer
//! look like the reference face. A sheet missing the first face of two
//! consecutive rows would fool this, which is accepted.
//!
//! Finally the reference face is searched for inside the body region; a
//! poor best match marks the candidate as a false positive.

use image::RgbImage;
use log::{debug, info};

use crate::analyzer::AnalyzerConfig;
use crate::buffer::Region;
use crate::estimator::CandidateSet;
use crate::similarity::Similarity;
use crate::types::SheetGeometry;

/// Progress of the upward boundary scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    NotFound,
    /// A single non-face row was seen; its bottom edge is the body's lower
    /// edge unless a face shows up in the next row.
    Provisional(u32),
}

/// Scan the left tile column upwards and return the lower edge of the body
/// region, or `None` if no row ever failed to look like a face.
pub fn scan_body_boundary<S: Similarity>(
    image: &Region<'_>,
    reference: &Region<'_>,
    dim: u32,
    min_face_similarity: f64,
    similarity: &S,
) -> Option<u32> {
    if dim == 0 || dim > image.width() || dim > image.height() {
        return None;
    }

    let mut state = Boundary::NotFound;
    let mut top = image.height() - dim;
    while top > 0 {
        let strip = image.sub(0, top, dim, dim)?;
        let bottom = top + dim;
        let score = similarity.compare(reference, &strip);

        if score < min_face_similarity {
            debug!(
                "{:.4} -> (0, {}) => ({}, {}) is not a face.",
                score, top, dim, bottom
            );
            if let Boundary::Provisional(_) = state {
                break;
            }
            state = Boundary::Provisional(bottom);
            debug!("New body prediction: (0, 0) => ({}, {})", image.width(), bottom);
        } else if let Boundary::Provisional(_) = state {
            state = Boundary::NotFound;
        }

        // A strip reaching above row 0 ends the scan.
        top = top.saturating_sub(dim);
    }

    match state {
        Boundary::Provisional(y) => Some(y),
        Boundary::NotFound => None,
    }
}

/// Pick the geometry for the padded sheet buffer, draining `candidates`.
pub fn resolve<S: Similarity>(
    image: &RgbImage,
    mut candidates: CandidateSet,
    config: &AnalyzerConfig,
    similarity: &S,
) -> SheetGeometry {
    let full = Region::full(image);
    let (rows, cols) = (image.height(), image.width());
    let padding = config.padding_top;
    let unpadded_height = rows.saturating_sub(padding);

    while let Some(candidate) = candidates.smallest() {
        let key = candidate.key();
        let dim = candidate.dimension;
        info!(
            "Most probable dimensions for this sprite sheet's faces: {} aligned to the {} side.",
            dim, candidate.alignment
        );

        let reference = Region::full(&candidate.sample);
        let body_y = scan_body_boundary(
            &full,
            &reference,
            dim,
            config.min_face_similarity,
            similarity,
        )
        .unwrap_or(rows);

        let body = full.sub(0, 0, cols, body_y);
        let located = body
            .filter(|body| {
                !reference.is_empty()
                    && body.height() >= reference.height()
                    && body.width() >= reference.width()
            })
            .and_then(|body| similarity.locate(&body, &reference));

        let Some(best) = located else {
            info!("Invalid face and/or body dimensions.");
            return SheetGeometry::full_body(unpadded_height, cols);
        };

        if best.score < config.min_face_body_similarity {
            info!(
                "Failed to find face on body. Assuming false positive. ({:.4})",
                best.score
            );
            candidates.discard(key);
            continue;
        }

        let certainty = (candidate.similarity + best.score) / 2.0;
        let geometry = SheetGeometry::normal(
            body_y.saturating_sub(padding),
            cols,
            dim,
            (best.x as i64, best.y as i64 - padding as i64),
            certainty,
        );
        info!("Resolved sheet geometry: {:?}", geometry);
        return geometry;
    }

    info!("No probable faces detected. This is likely a full body sprite.");
    SheetGeometry::full_body(unpadded_height, cols)
}
