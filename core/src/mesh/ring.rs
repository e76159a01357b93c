//! Closed 2D cross-section profiles for columns.

use std::f32::consts::PI;

use crate::error::{GeometryError, GeometryResult};
use crate::math::{self, Vec2};

/// Where a ring's points came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RingSource {
    /// Regular N-gon generated from a radius.
    Regular { radius: f32 },
    /// Caller-supplied vertices.
    Explicit,
}

/// A closed, counter-clockwise ring of exactly `resolution` points.
#[derive(Debug, Clone, PartialEq)]
pub struct RingProfile {
    points: Vec<Vec2>,
    source: RingSource,
}

impl RingProfile {
    /// Regular N-gon: point `j` sits at angle `j * 2PI / resolution`.
    pub fn regular(radius: f32, resolution: u32) -> GeometryResult<Self> {
        if !radius.is_finite() {
            return Err(GeometryError::invalid(format!(
                "ring radius must be finite, got {radius}"
            )));
        }
        let step = 2.0 * PI / resolution.max(1) as f32;
        let points = (0..resolution)
            .map(|j| {
                let angle = j as f32 * step;
                Vec2::new(angle.cos() * radius, angle.sin() * radius)
            })
            .collect();
        Ok(Self {
            points,
            source: RingSource::Regular { radius },
        })
    }

    /// Ring from explicit vertices.
    ///
    /// Requires at least `resolution` points; the winding of the whole list
    /// is normalized to counter-clockwise before the first `resolution`
    /// points are kept.
    pub fn from_vertices(vertices: &[[f32; 2]], resolution: u32) -> GeometryResult<Self> {
        let resolution = resolution as usize;
        if vertices.len() < resolution {
            return Err(GeometryError::invalid(format!(
                "ring has {} vertices, resolution requires {resolution}",
                vertices.len()
            )));
        }
        if let Some(index) = vertices
            .iter()
            .position(|v| !math::all_finite(v.as_slice()))
        {
            return Err(GeometryError::invalid(format!(
                "ring vertex {index} is not finite"
            )));
        }

        let mut points: Vec<Vec2> = vertices.iter().map(|v| Vec2::new(v[0], v[1])).collect();
        if math::make_counter_clockwise(&mut points) {
            log::debug!(
                "Reversed clockwise ring of {} vertices to counter-clockwise",
                points.len()
            );
        }
        points.truncate(resolution);

        Ok(Self {
            points,
            source: RingSource::Explicit,
        })
    }

    /// Number of points in the ring.
    pub fn resolution(&self) -> u32 {
        self.points.len() as u32
    }

    /// The ring's points, counter-clockwise.
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Where the points came from.
    pub fn source(&self) -> RingSource {
        self.source
    }

    /// Mean centroid-to-vertex distance scaled by `cos(PI / resolution)`.
    ///
    /// For a regular N-gon this is the apothem. Distances are taken from the
    /// centroid, not the column origin, so an off-centre ring reports the
    /// inset of its own outline.
    pub fn edge_distance(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        let center = math::centroid(&self.points);
        let n = self.points.len() as f32;
        let mean = self
            .points
            .iter()
            .map(|p| (p - center).norm())
            .sum::<f32>()
            / n;
        (PI / n).cos() * mean
    }
}
