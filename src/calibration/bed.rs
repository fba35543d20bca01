//! Bed center Z0 and bed orientation calibration.

use crate::error::Result;
use crate::geometry::Corner;
use crate::hal::Board;
use crate::log::{info, warning};
use crate::motion::{Mode, MotionController, MoveCommand, Tasks};
use crate::motor::Axis;
use crate::storage::layout;

/// Height Z is raised to before and after probing.
pub const PROBE_CLEARANCE: f32 = 3.0;

/// Calibration path relative to the bed center, in units of the calibration
/// distance, with the corner probed at each stop.
const ORIENTATION_PATH: [(f32, f32, Option<Corner>); 7] = [
    (-1.0, 0.0, None),
    (-1.0, -1.0, Some(Corner::FrontLeft)),
    (1.0, -1.0, Some(Corner::FrontRight)),
    (1.0, 1.0, Some(Corner::BackRight)),
    (-1.0, 1.0, Some(Corner::BackLeft)),
    (-1.0, 0.0, None),
    (0.0, 0.0, None),
];

impl<'a, B: Board> MotionController<'a, B> {
    /// Find the bed surface at the center and make it Z = 0.
    pub fn calibrate_bed_center_z0(&mut self) -> Result<()> {
        self.move_to_height(self.axes.value(Axis::Z) + PROBE_CLEARANCE)?;
        self.home_xy(false)?;
        self.move_to_z0()?;
        self.save_z_as_bed_center_z0()?;
        self.move_to_height(PROBE_CLEARANCE)
    }

    /// Declare the current Z the bed center surface.
    ///
    /// Clears the global bed height offset.
    pub fn save_z_as_bed_center_z0(&mut self) -> Result<()> {
        self.storage.set_bed_height_offset(0.0)?;
        self.update_bed_changes(false)?;
        self.axes.set_value(Axis::Z, 0.0);
        self.axes.set_valid(Axis::Z, true);
        Ok(())
    }

    /// Measure the height of each calibration corner relative to the center.
    ///
    /// The measured heights are stored as the new orientation, with every
    /// corner offset cleared, only when the whole run succeeds. On failure
    /// the stored calibration is left as it was and reloaded.
    pub fn calibrate_bed_orientation(&mut self) -> Result<()> {
        let saved_mode = self.state.mode;
        let saved_feed_rate = self.state.feed_rate;

        let measured = self.measure_corners();

        self.state.mode = saved_mode;
        self.state.feed_rate = saved_feed_rate;

        match measured {
            Ok(heights) => {
                for (corner, height) in Corner::ALL.into_iter().zip(heights) {
                    self.storage.set_bed_offset(corner, 0.0)?;
                    self.storage.set_bed_orientation(corner, height)?;
                }
                self.storage
                    .set_bed_orientation_version(layout::BED_ORIENTATION_VERSION_CURRENT)?;
                info!("bed orientation calibrated");
                self.update_bed_changes(false)
            }
            Err(error) => {
                if self.update_bed_changes(false).is_err() {
                    warning!("bed calibration could not be reloaded");
                }
                Err(error)
            }
        }
    }

    /// Probe every corner. Heights are returned in storage order.
    fn measure_corners(&mut self) -> Result<[f32; 4]> {
        self.calibrate_bed_center_z0()?;

        let center_x = self.config.bed.center_x.value();
        let center_y = self.config.bed.center_y.value();
        let distance = self.config.bed.calibration_distance.value();
        let feed_rate = self.config.axes.x.feed.max.value();

        let mut heights = [0.0; 4];
        for (dx, dy, corner) in ORIENTATION_PATH {
            self.state.mode = Mode::Absolute;
            let command = MoveCommand::new()
                .with(Axis::X, center_x + dx * distance)
                .with(Axis::Y, center_y + dy * distance)
                .feed(feed_rate);
            self.move_axes(&command, Tasks::BACKLASH)?;

            if let Some(corner) = corner {
                self.move_to_z0()?;
                let height = self.axes.value(Axis::Z);
                self.bed.set_corner_height(corner, height);
                if let Some(index) = Corner::ALL.iter().position(|c| *c == corner) {
                    heights[index] = height;
                }
            }
            self.move_to_height(PROBE_CLEARANCE)?;
        }
        Ok(heights)
    }
}
