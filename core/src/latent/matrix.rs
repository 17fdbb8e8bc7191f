/// Row-major dense matrix of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DenseMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![0.0; rows * cols] }
    }

    /// Build from row slices; all rows must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        assert!(rows.iter().all(|r| r.len() == cols), "ragged rows");
        let data = rows.iter().flatten().copied().collect();
        Self { rows: rows.len(), cols, data }
    }

    /// Build from column vectors of equal length `rows`.
    pub fn from_columns(rows: usize, columns: &[Vec<f64>]) -> Self {
        let mut m = Self::zeros(rows, columns.len());
        for (c, column) in columns.iter().enumerate() {
            for (r, &v) in column.iter().enumerate() {
                m.set(r, c, v);
            }
        }
        m
    }

    pub fn rows(&self) -> usize { self.rows }

    pub fn cols(&self) -> usize { self.cols }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 { self.data[row * self.cols + col] }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) { self.data[row * self.cols + col] = value; }

    pub fn row(&self, row: usize) -> &[f64] { &self.data[row * self.cols..(row + 1) * self.cols] }

    pub fn column(&self, col: usize) -> Vec<f64> { (0..self.rows).map(|r| self.get(r, col)).collect() }
}
