use crate::*;

/// Default number of sample points per axis inside one cell.
pub const DEFAULT_SAMPLES_PER_AXIS: u32 = 8;

/// Sample tally for one grid cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CellCoverage {
    pub cleared: u32,
    pub sampled: u32,
}

impl CellCoverage {
    pub fn fraction(self) -> f64 {
        if self.sampled == 0 {
            0.0
        } else {
            f64::from(self.cleared) / f64::from(self.sampled)
        }
    }

    /// Strictly greater than `threshold`.
    pub fn exceeds(self, threshold: f64) -> bool {
        self.sampled > 0 && f64::from(self.cleared) > threshold * f64::from(self.sampled)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CoverageReport {
    cells: [CellCoverage; CELL_COUNT],
}

impl CoverageReport {
    pub fn cell(&self, index: CellIndex) -> CellCoverage {
        self.cells[usize::from(index)]
    }

    pub fn cell_fraction(&self, index: CellIndex) -> f64 {
        self.cell(index).fraction()
    }

    pub fn cleared_total(&self) -> u32 {
        self.cells.iter().map(|cell| cell.cleared).sum()
    }

    pub fn sampled_total(&self) -> u32 {
        self.cells.iter().map(|cell| cell.sampled).sum()
    }

    /// Cleared share of all samples, as a percentage rounded half up.
    pub fn progress_percent(&self) -> u8 {
        let sampled = u64::from(self.sampled_total());
        if sampled == 0 {
            return 0;
        }
        let cleared = u64::from(self.cleared_total());
        ((cleared * 200 + sampled) / (sampled * 2)).min(100) as u8
    }
}

/// Samples an evenly spaced lattice inside each of the 3x3 cells and counts
/// the points whose alpha is exactly zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CoverageSampler {
    samples_per_axis: u32,
}

impl Default for CoverageSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLES_PER_AXIS)
    }
}

impl CoverageSampler {
    pub fn new(samples_per_axis: u32) -> Self {
        Self {
            samples_per_axis: samples_per_axis.max(1),
        }
    }

    pub fn samples_per_cell(&self) -> u32 {
        self.samples_per_axis * self.samples_per_axis
    }

    pub fn sample(&self, source: &impl AlphaSource) -> Result<CoverageReport> {
        let (width, height) = source.size();
        let side = u32::from(GRID_SIDE);
        if width < side || height < side {
            return Err(ScratchError::InvalidSurfaceSize(width, height));
        }

        let cell_width = f64::from(width) / f64::from(side);
        let cell_height = f64::from(height) / f64::from(side);
        let n = self.samples_per_axis;
        // sample at the centre of each sub-cell
        let offset = |step: u32, extent: f64| (f64::from(step) + 0.5) * extent / f64::from(n);

        let mut report = CoverageReport::default();
        for index in all_cells() {
            let (col, row) = cell_coords(index);
            let left = f64::from(col) * cell_width;
            let top = f64::from(row) * cell_height;
            let cell = &mut report.cells[usize::from(index)];

            for sx in 0..n {
                let x = ((left + offset(sx, cell_width)) as u32).min(width - 1);
                for sy in 0..n {
                    let y = ((top + offset(sy, cell_height)) as u32).min(height - 1);
                    cell.sampled += 1;
                    if source.alpha_at(x, y) == 0 {
                        cell.cleared += 1;
                    }
                }
            }
        }

        Ok(report)
    }
}
