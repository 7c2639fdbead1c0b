use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Geometry of the four coordinates on a label line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelGeometry {
    /// `cx cy w h`, normalized.
    #[default]
    Center,
    /// `x1 y1 x2 y2`, normalized.
    Corner,
}

/// A single normalized box with its class id; one per label file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxLabel {
    pub class_id: usize,
    pub geometry: LabelGeometry,
    pub coords: [f64; 4],
}

impl BoxLabel {
    /// Normalize a pixel box `[x1, y1, x2, y2]` against the frame size.
    /// The box is clamped to the frame first so coordinates stay in [0,1].
    pub fn from_pixel_box(
        class_id: usize,
        bbox_px: [f32; 4],
        size: (u32, u32),
        geometry: LabelGeometry,
    ) -> Result<Self, ContractError> {
        let (w, h) = size;
        if w == 0 || h == 0 {
            return Err(ContractError::EmptyFrame(w, h));
        }
        let (wf, hf) = (w as f64, h as f64);
        let x1 = (bbox_px[0] as f64).clamp(0.0, wf);
        let y1 = (bbox_px[1] as f64).clamp(0.0, hf);
        let x2 = (bbox_px[2] as f64).clamp(0.0, wf);
        let y2 = (bbox_px[3] as f64).clamp(0.0, hf);
        if x1 > x2 || y1 > y2 {
            return Err(ContractError::LabelInverted([x1, y1, x2, y2]));
        }
        let coords = match geometry {
            LabelGeometry::Center => [
                (x1 + x2) / 2.0 / wf,
                (y1 + y2) / 2.0 / hf,
                (x2 - x1) / wf,
                (y2 - y1) / hf,
            ],
            LabelGeometry::Corner => [x1 / wf, y1 / hf, x2 / wf, y2 / hf],
        };
        let label = Self {
            class_id,
            geometry,
            coords,
        };
        label.validate()?;
        Ok(label)
    }

    pub fn validate(&self) -> Result<(), ContractError> {
        let c = self.coords;
        if c.iter().any(|v| !v.is_finite() || *v < 0.0 || *v > 1.0) {
            return Err(ContractError::LabelOutOfRange(c));
        }
        if self.geometry == LabelGeometry::Corner && (c[0] > c[2] || c[1] > c[3]) {
            return Err(ContractError::LabelInverted(c));
        }
        Ok(())
    }

    /// `"<classId> <v1> <v2> <v3> <v4>\n"` with six decimals.
    pub fn to_line(&self) -> String {
        let [a, b, c, d] = self.coords;
        format!("{} {a:.6} {b:.6} {c:.6} {d:.6}\n", self.class_id)
    }

    pub fn parse(line: &str, geometry: LabelGeometry) -> Result<Self, ContractError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(ContractError::LabelFieldCount(fields.len()));
        }
        let class_id = fields[0]
            .parse::<usize>()
            .map_err(|_| ContractError::LabelNumber {
                index: 0,
                raw: fields[0].to_string(),
            })?;
        let mut coords = [0f64; 4];
        for (i, raw) in fields[1..].iter().enumerate() {
            coords[i] = raw.parse().map_err(|_| ContractError::LabelNumber {
                index: i + 1,
                raw: raw.to_string(),
            })?;
        }
        let label = Self {
            class_id,
            geometry,
            coords,
        };
        label.validate()?;
        Ok(label)
    }

    /// Normalized corners `[x1, y1, x2, y2]` regardless of geometry.
    pub fn corners(&self) -> [f64; 4] {
        let [a, b, c, d] = self.coords;
        match self.geometry {
            LabelGeometry::Center => [a - c / 2.0, b - d / 2.0, a + c / 2.0, b + d / 2.0],
            LabelGeometry::Corner => [a, b, c, d],
        }
    }

    /// Back to pixel corners `[x1, y1, x2, y2]`.
    pub fn to_pixel_box(&self, size: (u32, u32)) -> [f64; 4] {
        let (wf, hf) = (size.0 as f64, size.1 as f64);
        let [x1, y1, x2, y2] = self.corners();
        [x1 * wf, y1 * hf, x2 * wf, y2 * hf]
    }
}
