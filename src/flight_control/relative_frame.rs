use super::common::Vec3D;
use serde::Deserialize;
use std::f64::consts::FRAC_PI_2;
use strum_macros::Display;

/// Reference frame of a relative move.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RelativeFrame {
    /// `right` along +X, `up` along +Y, `forward` along -Z.
    World,
    /// `forward` along the vehicle heading, `right` along heading + 90°.
    Body,
}

impl RelativeFrame {
    /// Computes the absolute target of a relative move.
    ///
    /// # Arguments
    /// * `origin` - Current vehicle position.
    /// * `heading` - Current vehicle heading in radians (only used for [`RelativeFrame::Body`]).
    /// * `forward`, `right`, `up` - Offsets in the selected frame.
    pub fn resolve(
        self,
        origin: Vec3D<f64>,
        heading: f64,
        forward: f64,
        right: f64,
        up: f64,
    ) -> Vec3D<f64> {
        let offset = match self {
            RelativeFrame::World => Vec3D::new(right, up, -forward),
            RelativeFrame::Body => {
                let (fwd_sin, fwd_cos) = heading.sin_cos();
                let (right_sin, right_cos) = (heading + FRAC_PI_2).sin_cos();
                Vec3D::new(
                    forward * fwd_cos + right * right_cos,
                    up,
                    forward * fwd_sin + right * right_sin,
                )
            }
        };
        origin + offset
    }
}
