use nalgebra::Point3;

/// One trajectory frame: atom positions in file order plus an optional unit
/// cell `[a, b, c, alpha, beta, gamma]` (Angstroms and degrees).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub positions: Vec<Point3<f64>>,
    pub unit_cell: Option<[f64; 6]>,
}

impl Frame {
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        Self {
            positions,
            unit_cell: None,
        }
    }

    pub fn n_atoms(&self) -> usize {
        self.positions.len()
    }
}
