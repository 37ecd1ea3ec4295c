use std::fmt::{Display, Formatter};
use std::str::FromStr;

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::PackageError;

/// A 128 bit engine guid. Accepts the usual textual forms on input (with or without hyphens and braces) and always
/// prints as 32 lowercase hex digits without separators.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Guid {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
}

impl FromStr for Guid {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s
            .chars()
            .filter(|&c| !matches!(c, '-' | '{' | '}'))
            .collect();

        if digits.len() != 32 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PackageError::format(format!(
                "Guid {} is not made of 32 hex digits",
                s
            )));
        }

        let part = |i: usize| u32::from_str_radix(&digits[i * 8..(i + 1) * 8], 16);
        Ok(Guid {
            a: part(0).map_err(|_| PackageError::format("Invalid guid part a"))?,
            b: part(1).map_err(|_| PackageError::format("Invalid guid part b"))?,
            c: part(2).map_err(|_| PackageError::format("Invalid guid part c"))?,
            d: part(3).map_err(|_| PackageError::format("Invalid guid part d"))?,
        })
    }
}

impl TryFrom<String> for Guid {
    type Error = PackageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Guid> for String {
    fn from(value: Guid) -> Self {
        value.to_string()
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:08x}{:08x}{:08x}{:08x}", self.a, self.b, self.c, self.d)
    }
}

/// Euler rotation in degrees, engine axis convention.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Rotator {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Rotator {
    pub const ZERO: Rotator = Rotator {
        pitch: 0.0,
        yaw: 0.0,
        roll: 0.0,
    };

    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Rotator { pitch, yaw, roll }
    }

    /// Every axis clamped into (-180, 180].
    pub fn normalized(&self) -> Rotator {
        Rotator {
            pitch: normalize_axis(self.pitch),
            yaw: normalize_axis(self.yaw),
            roll: normalize_axis(self.roll),
        }
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.pitch, self.yaw, self.roll]
    }

    /// Same decomposition the engine uses, including its gimbal lock handling around +-90 degrees pitch.
    pub fn from_quat(q: DQuat) -> Rotator {
        const SINGULARITY_THRESHOLD: f64 = 0.4999995;

        let singularity_test = q.z * q.x - q.w * q.y;
        let yaw_y = 2.0 * (q.w * q.z + q.x * q.y);
        let yaw_x = 1.0 - 2.0 * (q.y * q.y + q.z * q.z);
        let yaw = yaw_y.atan2(yaw_x).to_degrees();

        if singularity_test < -SINGULARITY_THRESHOLD {
            Rotator {
                pitch: -90.0,
                yaw,
                roll: normalize_axis(-yaw - 2.0 * q.x.atan2(q.w).to_degrees()),
            }
        } else if singularity_test > SINGULARITY_THRESHOLD {
            Rotator {
                pitch: 90.0,
                yaw,
                roll: normalize_axis(yaw - 2.0 * q.x.atan2(q.w).to_degrees()),
            }
        } else {
            Rotator {
                pitch: (2.0 * singularity_test).asin().to_degrees(),
                yaw,
                roll: (-2.0 * (q.w * q.x + q.y * q.z))
                    .atan2(1.0 - 2.0 * (q.x * q.x + q.y * q.y))
                    .to_degrees(),
            }
        }
    }
}

pub fn normalize_axis(angle: f64) -> f64 {
    let mut angle = angle % 360.0;
    if angle < 0.0 {
        angle += 360.0;
    }

    if angle > 180.0 { angle - 360.0 } else { angle }
}

fn one() -> DVec3 {
    DVec3::ONE
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transform {
    #[serde(default)]
    pub rotation: DQuat,
    #[serde(default)]
    pub translation: DVec3,
    #[serde(rename = "Scale3D", default = "one")]
    pub scale_3d: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
        scale_3d: DVec3::ONE,
    };
}
