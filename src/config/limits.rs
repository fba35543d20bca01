//! Bed envelope soft limits.
//!
//! The printable area narrows as the bed rises toward the print head, so the
//! X/Y extents depend on the current Z height through stacked height bands.

use serde::Deserialize;

use crate::motor::Axis;

/// Closed range `[min, max]` in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Extent {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

impl Extent {
    /// Create a new extent.
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Check if the extent is non-empty.
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    /// Check if a value is within the extent (bounds included).
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Length of the extent.
    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

/// One height band of the bed envelope.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BedBand {
    /// Heights covered by this band.
    pub z: Extent,
    /// Reachable X range while Z is inside this band.
    pub x: Extent,
    /// Reachable Y range while Z is inside this band.
    pub y: Extent,
}

impl BedBand {
    /// Extent for a horizontal axis, `None` for Z and E.
    pub fn extent(&self, axis: Axis) -> Option<Extent> {
        match axis {
            Axis::X => Some(self.x),
            Axis::Y => Some(self.y),
            Axis::Z | Axis::E => None,
        }
    }
}

/// Z-dependent soft limits for the horizontal axes.
///
/// Received targets outside the band at the current height are clamped onto
/// it; a move is never refused for leaving the envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct BedEnvelope {
    /// Height bands ordered from the lowest to the highest.
    pub bands: heapless::Vec<BedBand, 4>,
}

impl BedEnvelope {
    /// Check if bands are stacked in ascending order with non-empty extents.
    pub fn is_valid(&self) -> bool {
        !self.bands.is_empty()
            && self.bands.iter().all(|b| b.x.is_valid() && b.y.is_valid() && b.z.is_valid())
            && self.bands.windows(2).all(|w| w[0].z.max <= w[1].z.min)
    }

    /// Band that applies at height `z`.
    ///
    /// The first band whose top lies above `z` wins; anything higher falls
    /// into the top band.
    pub fn band_at(&self, z: f32) -> Option<&BedBand> {
        self.bands
            .iter()
            .find(|band| z < band.z.max)
            .or_else(|| self.bands.last())
    }

    /// Clamp a horizontal target into the band at height `z`.
    ///
    /// Targets inside the band, and targets for Z and E, pass through
    /// unchanged.
    pub fn apply(&self, axis: Axis, z: f32, target: f32) -> f32 {
        match self.band_at(z).and_then(|band| band.extent(axis)) {
            Some(extent) if !extent.contains(target) => target.clamp(extent.min, extent.max),
            _ => target,
        }
    }

    /// Full reachable range of a horizontal axis across every band.
    pub fn overall(&self, axis: Axis) -> Option<Extent> {
        self.bands
            .iter()
            .filter_map(|band| band.extent(axis))
            .reduce(|a, b| Extent::new(a.min.min(b.min), a.max.max(b.max)))
    }
}

impl Default for BedEnvelope {
    fn default() -> Self {
        let bands = [
            BedBand {
                z: Extent::new(0.0, 5.0),
                x: Extent::new(-2.0, 106.0),
                y: Extent::new(-2.0, 105.0),
            },
            BedBand {
                z: Extent::new(5.0, 73.5),
                x: Extent::new(-2.0, 106.0),
                y: Extent::new(-9.0, 105.0),
            },
            BedBand {
                z: Extent::new(73.5, 112.0),
                x: Extent::new(7.0, 97.0),
                y: Extent::new(9.0, 85.0),
            },
        ];
        Self {
            bands: heapless::Vec::from_slice(&bands).unwrap_or_default(),
        }
    }
}
