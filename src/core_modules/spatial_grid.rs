// THEORY:
// The `SpatialGrid` is the locality structure of the linking engine. It buckets
// globules into fixed-size rectangular cells so that "which globules are near
// this crescent?" costs a handful of cell lookups instead of a scan over every
// globule in the image. A naive all-pairs search is O(crescents × globules);
// with the grid, each query touches only the globules that share a small
// neighborhood of cells with the query point.
//
// Key architectural principles:
// 1.  **Slot Indices, Not Copies**: Cells store the position of each globule in
//     the caller's input slice. The grid never owns particle data, and the
//     indices it returns are the same identities the orchestrator uses for its
//     exclusivity bookkeeping.
// 2.  **Total Assignment**: Every globule lands in exactly one cell. Particles
//     whose centroid falls outside the nominal image bounds are clamped into
//     the edge cells rather than dropped, so nothing silently disappears
//     before matching.
// 3.  **Approximate Neighborhood**: A query returns the contents of the
//     (2r+1)×(2r+1) block of cells around the query point. This is an
//     approximation, not an exact radius search: a candidate further than the
//     covered cells is invisible at that reach, however permissive the
//     matcher's own radius cutoff is. The reach is a tunable parameter.

use crate::core_modules::particle::Particle;

/// A fixed-cell spatial index over one image's globules.
pub struct SpatialGrid {
    /// The width of the grid in cells.
    grid_width: u32,
    /// The height of the grid in cells.
    grid_height: u32,
    /// The width of a single cell in pixels.
    cell_width: u32,
    /// The height of a single cell in pixels.
    cell_height: u32,
    /// Per-cell slot indices into the globule slice the grid was built from,
    /// stored row-major.
    cells: Vec<Vec<usize>>,
}

impl SpatialGrid {
    /// Builds the index for one image. Cell dimensions must be non-zero; the
    /// pipeline validates its configuration before any grid is built.
    pub fn build(
        globules: &[Particle],
        image_width: u32,
        image_height: u32,
        cell_width: u32,
        cell_height: u32,
    ) -> Self {
        // One guard row/column past the nominal image edge, so clamping only
        // fires for coordinates outside the image itself.
        let grid_width = image_width.div_ceil(cell_width) + 1;
        let grid_height = image_height.div_ceil(cell_height) + 1;
        let mut cells = vec![Vec::new(); (grid_width * grid_height) as usize];

        for (slot, globule) in globules.iter().enumerate() {
            let cx = clamped_cell(globule.x, cell_width, grid_width - 1);
            let cy = clamped_cell(globule.y, cell_height, grid_height - 1);
            cells[(cy * grid_width + cx) as usize].push(slot);
        }

        Self {
            grid_width,
            grid_height,
            cell_width,
            cell_height,
            cells,
        }
    }

    /// Maps a point to its cell coordinates, clamped to the grid bounds.
    pub fn cell_of(&self, x: f64, y: f64) -> (u32, u32) {
        (
            clamped_cell(x, self.cell_width, self.grid_width - 1),
            clamped_cell(y, self.cell_height, self.grid_height - 1),
        )
    }

    /// Returns the slot indices of every globule within `reach` cells of the
    /// cell containing `(x, y)`, in no particular order.
    pub fn neighborhood(&self, x: f64, y: f64, reach: u32) -> Vec<usize> {
        let (cx, cy) = self.cell_of(x, y);
        let reach = reach as i64;
        let mut found = Vec::new();

        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let nx = cx as i64 + dx;
                let ny = cy as i64 + dy;
                if nx < 0 || ny < 0 || nx >= self.grid_width as i64 || ny >= self.grid_height as i64
                {
                    continue;
                }
                let index = (ny as u32 * self.grid_width + nx as u32) as usize;
                found.extend_from_slice(&self.cells[index]);
            }
        }

        found
    }

    pub fn grid_width(&self) -> u32 {
        self.grid_width
    }

    pub fn grid_height(&self) -> u32 {
        self.grid_height
    }
}

/// Floor-divides a coordinate into a cell index, clamping negative and
/// out-of-range values into the valid `0..=max_index` range.
fn clamped_cell(value: f64, cell_size: u32, max_index: u32) -> u32 {
    let raw = (value / cell_size as f64).floor();
    if raw < 0.0 {
        0
    } else {
        // The float-to-int cast saturates, so huge coordinates clamp cleanly.
        (raw as u32).min(max_index)
    }
}
