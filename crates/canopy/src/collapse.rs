//! Collapse areas: regions of the envelope that have stopped flying.
//!
//! The set is rebuilt from per-cell openness every tick and never carried
//! over. Areas merge whenever the gap between their boundaries drops below a
//! class-dependent threshold; a merged area is the smallest sphere holding
//! both parts.

use engine_core::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollapseArea {
    /// Canopy local space.
    pub center: Vec3,
    pub radius: f32,
}

impl CollapseArea {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
        }
    }

    /// Distance between the two boundaries (negative when overlapping).
    pub fn gap(&self, other: &CollapseArea) -> f32 {
        self.center.distance(other.center) - (self.radius + other.radius)
    }

    pub fn can_unite(&self, other: &CollapseArea, threshold: f32) -> bool {
        self.gap(other) < threshold
    }

    pub fn contains(&self, point: Vec3) -> bool {
        self.center.distance(point) <= self.radius
    }

    /// Smallest sphere enclosing both areas.
    pub fn united(&self, other: &CollapseArea) -> CollapseArea {
        let offset = other.center - self.center;
        let d = offset.length();
        if d + other.radius <= self.radius {
            return *self;
        }
        if d + self.radius <= other.radius {
            return *other;
        }
        let radius = 0.5 * (d + self.radius + other.radius);
        let center = self.center + offset / d * (radius - self.radius);
        CollapseArea { center, radius }
    }

    pub fn unite(&mut self, other: &CollapseArea) {
        *self = self.united(other);
    }
}

/// Externally supplied state of one canopy cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSample {
    /// Canopy local space.
    pub center: Vec3,
    pub radius: f32,
    /// 1 = fully pressurised, 0 = fully deflated.
    pub openness: f32,
}

#[derive(Debug, Clone)]
pub struct CollapseModel {
    areas: Vec<CollapseArea>,
    inactive: Vec<bool>,
    capacity: usize,
    union_threshold: f32,
    collapse_radius: f32,
    trigger_openness: f32,
    /// Set while rebuilds keep hitting `capacity`; the warning fires once
    /// per such run.
    truncating: bool,
}

impl CollapseModel {
    pub fn new(capacity: usize, union_threshold: f32, collapse_radius: f32, trigger_openness: f32) -> Self {
        Self {
            areas: Vec::with_capacity(capacity),
            inactive: Vec::new(),
            capacity,
            union_threshold,
            collapse_radius,
            trigger_openness,
            truncating: false,
        }
    }

    pub fn areas(&self) -> &[CollapseArea] {
        &self.areas
    }

    pub fn is_inactive(&self, cell: usize) -> bool {
        self.inactive.get(cell).copied().unwrap_or(false)
    }

    /// Fraction of cells that produce no lift.
    pub fn inactive_fraction(&self) -> f32 {
        if self.inactive.is_empty() {
            return 0.0;
        }
        let n = self.inactive.iter().filter(|&&i| i).count();
        n as f32 / self.inactive.len() as f32
    }

    /// Inactive fraction over the cells on one side of the span.
    pub fn side_inactive_fraction(&self, cells: &[CellSample], left: bool) -> f32 {
        let mut total = 0;
        let mut dead = 0;
        for (i, cell) in cells.iter().enumerate() {
            if (cell.center.x < 0.0) == left {
                total += 1;
                if self.is_inactive(i) {
                    dead += 1;
                }
            }
        }
        if total == 0 {
            0.0
        } else {
            dead as f32 / total as f32
        }
    }

    pub fn is_truncating(&self) -> bool {
        self.truncating
    }

    pub fn clear(&mut self) {
        self.areas.clear();
        self.inactive.clear();
        self.truncating = false;
    }

    /// Discard the previous set and rebuild it from the current cells.
    pub fn rebuild(&mut self, cells: &[CellSample]) {
        self.areas.clear();
        let mut truncated = 0usize;
        for cell in cells.iter().filter(|c| c.openness < self.trigger_openness) {
            let seed = CollapseArea::new(cell.center, cell.radius);
            if let Some(area) = self
                .areas
                .iter_mut()
                .find(|a| a.can_unite(&seed, self.union_threshold))
            {
                area.unite(&seed);
            } else if self.areas.len() < self.capacity {
                self.areas.push(seed);
            } else {
                truncated += 1;
            }
        }
        if truncated > 0 && !self.truncating {
            log::warn!(
                "Collapse area limit {} reached, {} triggered cells ignored",
                self.capacity,
                truncated
            );
        }
        self.truncating = truncated > 0;

        // Growing an area can bring it within reach of another one.
        'merge: loop {
            for i in 0..self.areas.len() {
                for j in (i + 1)..self.areas.len() {
                    if self.areas[i].can_unite(&self.areas[j], self.union_threshold) {
                        let other = self.areas.swap_remove(j);
                        self.areas[i].unite(&other);
                        continue 'merge;
                    }
                }
            }
            break;
        }

        let big: Vec<&CollapseArea> = self
            .areas
            .iter()
            .filter(|a| a.radius > self.collapse_radius)
            .collect();
        self.inactive.clear();
        self.inactive
            .extend(cells.iter().map(|c| big.iter().any(|a| a.contains(c.center))));
        log::trace!(
            "Collapse rebuild: {} areas, {:.2} inactive",
            self.areas.len(),
            self.inactive_fraction()
        );
    }
}
