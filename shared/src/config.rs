use thiserror::Error;

/// Rejected world geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldConfigError {
    #[error("{field} must be finite and > 0")]
    NotPositive { field: &'static str },
    #[error("{field} must be finite and >= 0")]
    Negative { field: &'static str },
    #[error("cell_size ({cell_size}) must not exceed the world extent ({extent})")]
    CellTooLarge { cell_size: f64, extent: f64 },
}

/// World geometry shared by the server and its clients.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export, export_to = "../../client/js/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WorldConfig {
    /// World extent along x (world units)
    pub width: f64,
    /// World extent along y (world units)
    pub height: f64,
    /// Edge length of one spatial grid cell. Should be at least the largest
    /// entity diameter and well below the view extents.
    pub cell_size: f64,
    /// Half of the view rectangle width used for per-client sync
    pub view_half_width: f64,
    /// Half of the view rectangle height used for per-client sync
    pub view_half_height: f64,
    /// Collision radius of a player
    pub player_size: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 4000.0,
            height: 4000.0,
            cell_size: 200.0,
            view_half_width: 800.0,  // 1600px wide client view
            view_half_height: 450.0, // 900px tall client view
            player_size: 20.0,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), WorldConfigError> {
        let positive = [
            ("width", self.width),
            ("height", self.height),
            ("cell_size", self.cell_size),
            ("player_size", self.player_size),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(WorldConfigError::NotPositive { field });
            }
        }
        let non_negative = [
            ("view_half_width", self.view_half_width),
            ("view_half_height", self.view_half_height),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(WorldConfigError::Negative { field });
            }
        }
        let extent = self.width.max(self.height);
        if self.cell_size > extent {
            return Err(WorldConfigError::CellTooLarge {
                cell_size: self.cell_size,
                extent,
            });
        }
        Ok(())
    }

    /// Number of grid rows (y axis)
    pub fn rows(&self) -> usize {
        (self.height / self.cell_size).ceil() as usize
    }

    /// Number of grid columns (x axis)
    pub fn cols(&self) -> usize {
        (self.width / self.cell_size).ceil() as usize
    }
}
