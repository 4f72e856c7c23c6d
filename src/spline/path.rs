//! Arclength-uniform cached path over a spline
//!
//! A [`SplinePath`] owns a [`Spline`] and a table of samples spaced evenly by
//! distance along it. Queries in [`EvaluateMode::Cached`] interpolate the table,
//! while [`EvaluateMode::Accurate`] maps the percent back to the curve
//! parameter and evaluates the spline directly.

use crate::core::types::{Percent, Vec3};
use crate::math::Transform;
use super::curve::Spline;
use super::sample::Sample;

/// Raw curve evaluations per cached sample when measuring arclength
const OVERSAMPLE: usize = 4;

/// How a path query reads the curve
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EvaluateMode {
    #[default]
    Cached,
    Accurate,
}

/// Direction of travel along a path
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TravelDirection {
    #[default]
    Forward,
    Backward,
}

/// Spline plus its arclength-uniform sample table
#[derive(Clone, Debug, Default)]
pub struct SplinePath {
    spline: Spline,
    samples: Vec<Sample>,
    /// Curve parameter of each cached sample
    params: Vec<f64>,
    length: f32,
}

impl SplinePath {
    /// Build the sample table for `spline`
    pub fn new(spline: Spline) -> Self {
        let mut path = Self {
            spline,
            ..Default::default()
        };
        path.rebuild();
        path
    }

    /// Path over a fixed list of samples without an underlying curve
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        let n = samples.len();
        let params = (0..n).map(|i| index_percent(i, n)).collect();
        let mut path = Self {
            spline: Spline::default(),
            samples,
            params,
            length: 0.0,
        };
        path.length = path.measure_samples();
        path
    }

    pub fn spline(&self) -> &Spline {
        &self.spline
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total cached length
    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn first_sample(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last_sample(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Replace the spline and recompute the table
    pub fn set_spline(&mut self, spline: Spline) {
        self.spline = spline;
        self.rebuild();
    }

    /// Recompute the cached samples from the spline
    pub fn rebuild(&mut self) {
        self.samples.clear();
        self.params.clear();
        let count = self.spline.iterations();
        if count == 0 {
            self.length = 0.0;
            return;
        }
        if count == 1 {
            self.samples.push(self.spline.evaluate(0.0));
            self.params.push(0.0);
            self.length = 0.0;
            return;
        }

        // Dense raw pass for cumulative distance by curve parameter
        let raw_count = (count - 1) * OVERSAMPLE + 1;
        let mut raw_t = Vec::with_capacity(raw_count);
        let mut raw_dist = Vec::with_capacity(raw_count);
        let mut prev = self.spline.evaluate_position(0.0);
        let mut total = 0.0f32;
        for i in 0..raw_count {
            let t = index_percent(i, raw_count);
            let pos = self.spline.evaluate_position(t);
            total += pos.distance(prev);
            prev = pos;
            raw_t.push(t);
            raw_dist.push(total);
        }

        self.samples.reserve(count);
        self.params.reserve(count);
        for k in 0..count {
            let percent = index_percent(k, count);
            let t = if total <= f32::EPSILON {
                percent
            } else {
                param_at_distance(&raw_t, &raw_dist, total * percent as f32)
            };
            let mut sample = self.spline.evaluate(t);
            sample.percent = percent;
            self.samples.push(sample);
            self.params.push(t);
        }
        self.length = self.measure_samples();
    }

    fn measure_samples(&self) -> f32 {
        self.samples
            .windows(2)
            .map(|w| w[0].position.distance(w[1].position))
            .sum()
    }

    /// Replace the first cached sample, keeping its percent at 0
    ///
    /// Used to weld a path onto the end of the previous one.
    pub fn stitch_start(&mut self, mut sample: Sample) {
        if let Some(first) = self.samples.first_mut() {
            sample.percent = 0.0;
            *first = sample;
            self.length = self.measure_samples();
        }
    }

    /// Cached sample index and blend factor for `percent`
    fn cached_index(&self, percent: Percent) -> (usize, f32) {
        let n = self.samples.len();
        let v = percent.clamp(0.0, 1.0) * (n - 1) as f64;
        let index = (v.floor() as usize).min(n.saturating_sub(2));
        (index, (v - index as f64).clamp(0.0, 1.0) as f32)
    }

    /// Curve parameter for a path percent, via the cached table
    fn param_at(&self, percent: Percent) -> f64 {
        if self.params.len() < 2 {
            return percent;
        }
        let (i, u) = self.cached_index(percent);
        self.params[i] + (self.params[i + 1] - self.params[i]) * u as f64
    }

    /// Sample at `percent`
    pub fn evaluate(&self, percent: Percent, mode: EvaluateMode) -> Sample {
        let percent = percent.clamp(0.0, 1.0);
        match self.samples.len() {
            0 => return Sample { percent, ..Default::default() },
            1 => return Sample { percent, ..self.samples[0] },
            _ => {}
        }
        match mode {
            EvaluateMode::Cached => {
                let (i, u) = self.cached_index(percent);
                let mut sample = Sample::lerp(&self.samples[i], &self.samples[i + 1], u);
                sample.percent = percent;
                sample
            }
            EvaluateMode::Accurate => {
                if self.spline.points.len() < 2 {
                    return self.evaluate(percent, EvaluateMode::Cached);
                }
                let mut sample = self.spline.evaluate(self.param_at(percent));
                sample.percent = percent;
                sample
            }
        }
    }

    /// Position at `percent`, read from the cache
    pub fn evaluate_position(&self, percent: Percent) -> Vec3 {
        match self.samples.len() {
            0 => Vec3::ZERO,
            1 => self.samples[0].position,
            _ => {
                let (i, u) = self.cached_index(percent);
                self.samples[i].position.lerp(self.samples[i + 1].position, u)
            }
        }
    }

    /// Length of the path between two percents, in either order
    pub fn calculate_length(&self, from: Percent, to: Percent) -> f32 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        let from = from.clamp(0.0, 1.0);
        let to = to.clamp(0.0, 1.0);

        let (from_index, _) = self.cached_index(from);
        let (to_index, _) = self.cached_index(to);
        let mut length = 0.0;
        let mut prev = self.evaluate_position(from);
        for i in from_index + 1..=to_index {
            let pos = self.samples[i].position;
            length += prev.distance(pos);
            prev = pos;
        }
        length + prev.distance(self.evaluate_position(to))
    }

    /// Move `distance` along the path from `start`
    ///
    /// Returns the reached percent and the distance actually covered, which is
    /// shorter than requested when the path end is hit.
    pub fn travel(&self, start: Percent, distance: f32, direction: TravelDirection) -> (Percent, f32) {
        let start = start.clamp(0.0, 1.0);
        if self.samples.len() < 2 || distance <= 0.0 {
            return (start, 0.0);
        }
        let n = self.samples.len();
        let step_percent = |i: usize| index_percent(i, n);

        let (index, _) = self.cached_index(start);
        let mut traveled = 0.0f32;
        let mut prev_pos = self.evaluate_position(start);
        let mut prev_percent = start;

        match direction {
            TravelDirection::Forward => {
                for i in index + 1..n {
                    let next_percent = step_percent(i);
                    if next_percent <= prev_percent {
                        continue;
                    }
                    let pos = self.samples[i].position;
                    let step = prev_pos.distance(pos);
                    if traveled + step >= distance {
                        let t = if step > 0.0 { (distance - traveled) / step } else { 0.0 };
                        let percent = prev_percent + (next_percent - prev_percent) * t as f64;
                        return (percent, distance);
                    }
                    traveled += step;
                    prev_pos = pos;
                    prev_percent = next_percent;
                }
                (1.0, traveled)
            }
            TravelDirection::Backward => {
                let mut i = index as isize;
                if step_percent(index) >= start {
                    i -= 1;
                }
                while i >= 0 {
                    let next_percent = step_percent(i as usize);
                    let pos = self.samples[i as usize].position;
                    let step = prev_pos.distance(pos);
                    if traveled + step >= distance {
                        let t = if step > 0.0 { (distance - traveled) / step } else { 0.0 };
                        let percent = prev_percent + (next_percent - prev_percent) * t as f64;
                        return (percent, distance);
                    }
                    traveled += step;
                    prev_pos = pos;
                    prev_percent = next_percent;
                    i -= 1;
                }
                (0.0, traveled)
            }
        }
    }

    /// Closest sample to `point` within the `from..=to` percent range
    pub fn project(&self, point: Vec3, from: Percent, to: Percent) -> Sample {
        let n = self.samples.len();
        if n < 2 {
            return self.evaluate(from, EvaluateMode::Cached);
        }
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        let (first, _) = self.cached_index(from);
        let (last, last_u) = self.cached_index(to);
        let last = if last_u > 0.0 { last + 1 } else { last };

        let mut closest = first;
        let mut closest_dist = f32::MAX;
        for i in first..=last.min(n - 1) {
            let d = self.samples[i].position.distance_squared(point);
            if d < closest_dist {
                closest_dist = d;
                closest = i;
            }
        }

        // Refine on the two spans touching the closest sample
        let mut best_percent = index_percent(closest, n);
        let mut best_dist = closest_dist;
        for (a, b) in [(closest.wrapping_sub(1), closest), (closest, closest + 1)] {
            if a >= n || b >= n {
                continue;
            }
            let pa = self.samples[a].position;
            let pb = self.samples[b].position;
            let t = project_on_segment(pa, pb, point);
            let dist = pa.lerp(pb, t).distance_squared(point);
            if dist < best_dist {
                best_dist = dist;
                let percent_a = index_percent(a, n);
                let percent_b = index_percent(b, n);
                best_percent = percent_a + (percent_b - percent_a) * t as f64;
            }
        }

        self.evaluate(best_percent.clamp(from, to), EvaluateMode::Cached)
    }

    /// Move the whole path, spline and samples alike
    pub fn transform(&mut self, transform: &Transform) {
        self.spline.transform(transform);
        for sample in &mut self.samples {
            *sample = sample.transformed(transform);
        }
    }

    /// Translate the path without rebuilding
    pub fn translate(&mut self, offset: Vec3) {
        for point in &mut self.spline.points {
            point.translate(offset);
        }
        for sample in &mut self.samples {
            sample.position += offset;
        }
    }
}

#[inline]
fn index_percent(index: usize, count: usize) -> Percent {
    if count < 2 {
        0.0
    } else {
        index as f64 / (count - 1) as f64
    }
}

/// Binary search of the cumulative distance table, as in arclength resampling
fn param_at_distance(raw_t: &[f64], raw_dist: &[f32], target: f32) -> f64 {
    let idx = raw_dist.partition_point(|&d| d < target);
    if idx == 0 {
        return raw_t[0];
    }
    if idx >= raw_dist.len() {
        return raw_t[raw_t.len() - 1];
    }
    let d0 = raw_dist[idx - 1];
    let d1 = raw_dist[idx];
    let u = if d1 > d0 { ((target - d0) / (d1 - d0)) as f64 } else { 0.0 };
    raw_t[idx - 1] + (raw_t[idx] - raw_t[idx - 1]) * u
}

fn project_on_segment(a: Vec3, b: Vec3, point: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return 0.0;
    }
    ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0)
}
