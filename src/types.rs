use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How a sprite sheet is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum LayoutKind {
    /// A body sprite with a grid of expression tiles.
    Normal,
    /// A full body sprite without an expression grid.
    FullBody,
}

impl LayoutKind {
    /// Numeric code stored in the sheet's `specialFormat` field.
    pub const fn code(self) -> u8 {
        match self {
            LayoutKind::Normal => 0,
            LayoutKind::FullBody => 1,
        }
    }
}

impl From<LayoutKind> for u8 {
    fn from(kind: LayoutKind) -> Self {
        kind.code()
    }
}

impl TryFrom<u8> for LayoutKind {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(LayoutKind::Normal),
            1 => Ok(LayoutKind::FullBody),
            other => Err(Error::UnknownLayout(other)),
        }
    }
}

impl std::fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutKind::Normal => f.write_str("normal"),
            LayoutKind::FullBody => f.write_str("full body"),
        }
    }
}

/// Geometry inferred for one sprite sheet.
///
/// All coordinates are in the unpadded sheet's space. `reference_face_y` may
/// be negative when the best face match reaches into the area above the
/// sheet's top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetGeometry {
    pub body_height: u32,
    pub body_width: u32,
    /// Side of a face tile; present exactly for [`LayoutKind::Normal`].
    pub face_dimension: Option<u32>,
    pub reference_face_x: Option<i64>,
    pub reference_face_y: Option<i64>,
    pub dialog_offset_x: Option<i64>,
    pub layout: LayoutKind,
    /// Heuristic confidence in `[0, 1]`.
    pub certainty: f64,
}

impl SheetGeometry {
    /// A sheet with no detectable expression grid.
    pub fn full_body(body_height: u32, body_width: u32) -> Self {
        Self {
            body_height,
            body_width,
            face_dimension: None,
            reference_face_x: None,
            reference_face_y: None,
            dialog_offset_x: None,
            layout: LayoutKind::FullBody,
            certainty: 0.0,
        }
    }

    /// A body sprite with `face_dimension`-sized expression tiles.
    pub fn normal(
        body_height: u32,
        body_width: u32,
        face_dimension: u32,
        reference_face: (i64, i64),
        certainty: f64,
    ) -> Self {
        Self {
            body_height,
            body_width,
            face_dimension: Some(face_dimension),
            reference_face_x: Some(reference_face.0),
            reference_face_y: Some(reference_face.1),
            dialog_offset_x: Some(0),
            layout: LayoutKind::Normal,
            certainty: certainty.clamp(0.0, 1.0),
        }
    }

    pub fn has_faces(&self) -> bool {
        self.layout == LayoutKind::Normal
    }
}
