// Dense row-major table indexed by (timestep, symbol).

use std::ops::{Index, IndexMut};

use crate::ShapeError;

/// A `rows x cols` table stored contiguously in row-major order.
///
/// Rows are timesteps and columns are symbols throughout the workspace: a
/// channel likelihood table is `tau x q_out`, an a-posteriori table is
/// `tau x q_in`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Clone> Table<T> {
    /// Create a table with every cell set to `fill`.
    pub fn new(rows: usize, cols: usize, fill: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![fill; rows * cols],
        }
    }

    /// Build a table from nested rows. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, ShapeError> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        let count = rows.len();
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != cols {
                return Err(ShapeError::Ragged {
                    row,
                    expected: cols,
                    actual: values.len(),
                });
            }
            data.extend(values);
        }
        Ok(Self {
            rows: count,
            cols,
            data,
        })
    }

    /// Wrap a flat row-major vector.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, ShapeError> {
        if data.len() != rows * cols {
            return Err(ShapeError::Length {
                rows,
                cols,
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Resize to `rows x cols` and overwrite every cell with `fill`.
    ///
    /// Keeps the allocation when the table shrinks or stays the same size.
    pub fn reset(&mut self, rows: usize, cols: usize, fill: T) {
        self.rows = rows;
        self.cols = cols;
        self.data.clear();
        self.data.resize(rows * cols, fill);
    }

    /// Overwrite every cell with `value`.
    pub fn fill(&mut self, value: T) {
        for cell in &mut self.data {
            *cell = value.clone();
        }
    }

    /// Apply `f` to every cell, producing a table of the same shape.
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Table<U> {
        Table {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Copy rows `start..end` into a new table.
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        assert!(
            start <= end && end <= self.rows,
            "row range {start}..{end} out of bounds for {} rows",
            self.rows
        );
        Self {
            rows: end - start,
            cols: self.cols,
            data: self.data[start * self.cols..end * self.cols].to_vec(),
        }
    }
}

impl<T> Table<T> {
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Shape as `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn row(&self, r: usize) -> &[T] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, r: usize) -> &mut [T] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Split into rows `[0, r)` and `[r, rows)`, both mutable, so one row can
    /// be computed from its neighbour in place.
    pub fn split_rows_mut(&mut self, r: usize) -> (&mut [T], &mut [T]) {
        assert!(r <= self.rows, "split row {r} out of range (rows {})", self.rows);
        self.data.split_at_mut(r * self.cols)
    }

    /// Iterate over rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks_exact panics on a zero chunk size
        let cols = self.cols.max(1);
        self.data.chunks_exact(cols).take(self.rows)
    }

    /// The underlying row-major storage.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

}

impl<T> Index<(usize, usize)> for Table<T> {
    type Output = T;

    #[inline]
    fn index(&self, (r, c): (usize, usize)) -> &T {
        assert!(c < self.cols, "column {c} out of range ({})", self.cols);
        &self.data[r * self.cols + c]
    }
}

impl<T> IndexMut<(usize, usize)> for Table<T> {
    #[inline]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut T {
        assert!(c < self.cols, "column {c} out of range ({})", self.cols);
        &mut self.data[r * self.cols + c]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_is_filled() {
        let t = Table::new(3, 2, 0.5);
        assert_eq!(t.shape(), (3, 2));
        assert!(t.as_slice().iter().all(|&v| v == 0.5));
    }

    #[test]
    fn from_rows_row_major() {
        let t = Table::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(t.shape(), (2, 3));
        assert_eq!(t[(1, 0)], 4);
        assert_eq!(t.row(0), &[1, 2, 3]);
        assert_eq!(t.as_slice(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn from_rows_rejects_ragged() {
        let err = Table::from_rows(vec![vec![1, 2], vec![3]]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::Ragged {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn from_vec_checks_length() {
        assert!(Table::from_vec(2, 2, vec![0; 4]).is_ok());
        let err = Table::from_vec(2, 2, vec![0; 3]).unwrap_err();
        assert!(matches!(err, ShapeError::Length { actual: 3, .. }));
    }

    #[test]
    fn reset_changes_shape() {
        let mut t = Table::new(4, 4, 1u8);
        t.reset(2, 3, 7);
        assert_eq!(t.shape(), (2, 3));
        assert_eq!(t.as_slice(), &[7; 6]);
    }

    #[test]
    fn index_mut_writes_cell() {
        let mut t = Table::new(2, 2, 0);
        t[(1, 1)] = 9;
        assert_eq!(t.row(1), &[0, 9]);
    }

    #[test]
    #[should_panic(expected = "column 2 out of range")]
    fn column_past_the_end_panics() {
        // Would otherwise alias cell (1, 0).
        let t = Table::new(2, 2, 0);
        let _ = t[(0, 2)];
    }

    #[test]
    fn split_rows_mut_allows_row_to_row_update() {
        let mut t = Table::from_rows(vec![vec![1, 2], vec![0, 0]]).unwrap();
        let (head, tail) = t.split_rows_mut(1);
        tail[0] = head[0] * 10;
        tail[1] = head[1] * 10;
        assert_eq!(t.row(1), &[10, 20]);
    }

    #[test]
    fn iter_rows_yields_each_row() {
        let t = Table::from_rows(vec![vec![1, 2], vec![3, 4], vec![5, 6]]).unwrap();
        let rows: Vec<&[i32]> = t.iter_rows().collect();
        assert_eq!(rows, vec![&[1, 2][..], &[3, 4][..], &[5, 6][..]]);
    }

    #[test]
    fn slice_rows_copies_range() {
        let t = Table::from_rows(vec![vec![1], vec![2], vec![3]]).unwrap();
        let s = t.slice_rows(1, 3);
        assert_eq!(s.as_slice(), &[2, 3]);
    }

    #[test]
    fn map_preserves_shape() {
        let t = Table::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
        let doubled = t.map(|&v| v as f64 * 2.0);
        assert_eq!(doubled.shape(), (2, 2));
        assert_eq!(doubled[(1, 1)], 8.0);
    }
}
