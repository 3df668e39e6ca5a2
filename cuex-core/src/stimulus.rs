use crate::factors::CueValue;
use serde::{Deserialize, Serialize};

pub const MASK_CELLS_PER_SIDE: usize = 4;
pub const MASK_CELLS: usize = MASK_CELLS_PER_SIDE * MASK_CELLS_PER_SIDE;

/// Everything the display collaborator may be asked to put on screen.
#[derive(Debug, Clone, PartialEq)]
pub enum Stimulus {
    Cue(CueValue),
    Target { rgb: [u8; 3] },
    Mask(MaskGrid),
    /// Colour wheel, rotated so that hue 0 sits at `rotation_deg`.
    Wheel { rotation_deg: f64 },
    /// Cross shown during the inter-trial interval.
    Fixation,
}

impl Stimulus {
    pub fn kind(&self) -> &'static str {
        match self {
            Stimulus::Cue(_) => "cue",
            Stimulus::Target { .. } => "target",
            Stimulus::Mask(_) => "mask",
            Stimulus::Wheel { .. } => "wheel",
            Stimulus::Fixation => "fixation",
        }
    }
}

/// Post-target mask: a square grid of cells, each painted with a hue taken
/// from the colour wheel.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskGrid {
    hues: [u16; MASK_CELLS],
}

impl MaskGrid {
    /// Hues are reduced modulo 360.
    pub fn from_hues(hues: [u16; MASK_CELLS]) -> Self {
        Self {
            hues: hues.map(|h| h % 360),
        }
    }

    pub fn hue(&self, row: usize, col: usize) -> Option<u16> {
        if row >= MASK_CELLS_PER_SIDE || col >= MASK_CELLS_PER_SIDE {
            return None;
        }
        Some(self.hues[row * MASK_CELLS_PER_SIDE + col])
    }

    pub fn cell_rgb(&self, row: usize, col: usize) -> Option<[u8; 3]> {
        self.hue(row, col).map(|h| hue_to_rgb(h as f64))
    }

    pub fn hues(&self) -> &[u16; MASK_CELLS] {
        &self.hues
    }
}

/// Fully saturated colour for a wheel angle in degrees.
pub fn hue_to_rgb(angle_deg: f64) -> [u8; 3] {
    let h = angle_deg.rem_euclid(360.0) / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    [r, g, b].map(|c: f64| (c * 255.0).round() as u8)
}

/// Stimulus geometry in degrees of visual angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusSet {
    pub cue_size_deg: f64,
    pub target_size_deg: f64,
    pub wheel_diameter_deg: f64,
    pub wheel_thickness_deg: f64,
    pub cursor_diameter_deg: f64,
    pub cursor_thickness_deg: f64,
    pub fixation_thickness_deg: f64,
    pub mask_outline_deg: f64,
}

impl Default for StimulusSet {
    fn default() -> Self {
        Self {
            cue_size_deg: 1.0,
            target_size_deg: 3.0,
            wheel_diameter_deg: 12.0,
            wheel_thickness_deg: 1.5,
            cursor_diameter_deg: 1.0,
            cursor_thickness_deg: 0.2,
            fixation_thickness_deg: 0.1,
            mask_outline_deg: 0.05,
        }
    }
}

impl StimulusSet {
    pub fn cue_text(cue: CueValue) -> &'static str {
        match cue {
            CueValue::Short => "----",
            CueValue::Long => "----------------",
        }
    }

    /// Edge length of one mask cell; the mask covers the target.
    pub fn mask_cell_deg(&self) -> f64 {
        self.target_size_deg / MASK_CELLS_PER_SIDE as f64
    }
}
