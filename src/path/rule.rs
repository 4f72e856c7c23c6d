//! Per-template rules hooked into path generation

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;
use crate::spline::ControlPoint;
use super::strategy::PathStrategy;

/// One-shot overrides for a random walk, applied before the segment is generated
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomTarget {
    pub pitch: Option<f32>,
    pub yaw: Option<f32>,
    pub roll: Option<f32>,
    pub pitch_step: Option<f32>,
    pub yaw_step: Option<f32>,
    pub roll_step: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PathRule {
    RandomTarget(RandomTarget),
    /// Move every generated point, in generator space
    Offset(Vec3),
}

impl PathRule {
    pub fn before_generation(&self, strategy: &mut PathStrategy) {
        let PathRule::RandomTarget(rule) = self else {
            return;
        };
        let PathStrategy::Random(random) = strategy else {
            log::debug!("Random target rule ignored by {} strategy", strategy.name());
            return;
        };
        if let Some(v) = rule.yaw {
            random.set_target_yaw(v);
        }
        if let Some(v) = rule.pitch {
            random.set_target_pitch(v);
        }
        if let Some(v) = rule.roll {
            random.set_target_roll(v);
        }
        if let Some(v) = rule.yaw_step {
            random.set_yaw_step(v);
        }
        if let Some(v) = rule.pitch_step {
            random.set_pitch_step(v);
        }
        if let Some(v) = rule.roll_step {
            random.set_roll_step(v);
        }
    }

    pub fn post_generation(&self, points: &mut [ControlPoint]) {
        if let PathRule::Offset(offset) = self {
            for point in points {
                point.translate(*offset);
            }
        }
    }
}
