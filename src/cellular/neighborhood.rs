//! Grid neighbourhoods.

/// Cells considered neighbours of a grid cell.
pub trait Neighborhood: Send + Sync {
    /// Coordinates of the neighbours of `(x, y)` on a `width × height` grid.
    ///
    /// Never contains `(x, y)` itself nor duplicates.
    fn neighbors(&self, x: usize, y: usize, width: usize, height: usize) -> Vec<(usize, usize)>;
}

/// All cells within Chebyshev distance `radius`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MooreNeighborhood {
    pub radius: usize,
    /// Wrap around the grid edges.
    pub toroidal: bool,
}

impl Default for MooreNeighborhood {
    fn default() -> Self {
        Self {
            radius: 1,
            toroidal: true,
        }
    }
}

impl Neighborhood for MooreNeighborhood {
    fn neighbors(&self, x: usize, y: usize, width: usize, height: usize) -> Vec<(usize, usize)> {
        let r = self.radius as i64;
        let offsets = (-r..=r).flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)));
        resolve(offsets, x, y, width, height, self.toroidal)
    }
}

/// All cells within Manhattan distance `radius`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VonNeumannNeighborhood {
    pub radius: usize,
    /// Wrap around the grid edges.
    pub toroidal: bool,
}

impl Default for VonNeumannNeighborhood {
    fn default() -> Self {
        Self {
            radius: 1,
            toroidal: true,
        }
    }
}

impl Neighborhood for VonNeumannNeighborhood {
    fn neighbors(&self, x: usize, y: usize, width: usize, height: usize) -> Vec<(usize, usize)> {
        let r = self.radius as i64;
        let offsets = (-r..=r)
            .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
            .filter(move |(dx, dy)| dx.abs() + dy.abs() <= r);
        resolve(offsets, x, y, width, height, self.toroidal)
    }
}

/// Maps offsets to cells, wrapping or clipping at the edges.
fn resolve<I>(
    offsets: I,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    toroidal: bool,
) -> Vec<(usize, usize)>
where
    I: Iterator<Item = (i64, i64)>,
{
    let (w, h) = (width as i64, height as i64);
    let mut cells = Vec::new();

    for (dx, dy) in offsets {
        let (nx, ny) = (x as i64 + dx, y as i64 + dy);
        let cell = if toroidal {
            (nx.rem_euclid(w) as usize, ny.rem_euclid(h) as usize)
        } else if (0..w).contains(&nx) && (0..h).contains(&ny) {
            (nx as usize, ny as usize)
        } else {
            continue;
        };
        if cell != (x, y) && !cells.contains(&cell) {
            cells.push(cell);
        }
    }
    cells
}
