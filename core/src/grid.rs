//! Dense (level, player) matrices.
//!
//! Row-major storage. Rows are levels, columns are players. A grid with
//! one column is a per-level column vector and broadcasts across players.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows:  usize,
    cols:  usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                cells.push(f(r, c));
            }
        }
        Self { rows, cols, cells }
    }

    /// Like `from_fn`, but the cell constructor may fail.
    pub fn try_from_fn<E>(
        rows: usize,
        cols: usize,
        mut f: impl FnMut(usize, usize) -> Result<T, E>,
    ) -> Result<Self, E> {
        let mut cells = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                cells.push(f(r, c)?);
            }
        }
        Ok(Self { rows, cols, cells })
    }

    /// A `(values.len(), 1)` column grid.
    pub fn column(values: Vec<T>) -> Self {
        Self { rows: values.len(), cols: 1, cells: values }
    }

    pub fn rows(&self) -> usize { self.rows }
    pub fn cols(&self) -> usize { self.cols }
    pub fn shape(&self) -> (usize, usize) { (self.rows, self.cols) }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks(0) panics; an empty-column grid has no cells anyway.
        self.cells.chunks(self.cols.max(1))
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            rows:  self.rows,
            cols:  self.cols,
            cells: self.cells.iter().map(f).collect(),
        }
    }

    fn expect_column(&self) -> SimResult<()> {
        if self.cols != 1 {
            return Err(SimError::ShapeMismatch {
                expected: (self.rows, 1),
                actual:   self.shape(),
            });
        }
        Ok(())
    }
}

impl<T: Clone> Grid<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self { rows, cols, cells: vec![value; rows * cols] }
    }

    /// Repeat a `(rows, 1)` column across `n` columns.
    pub fn tile_columns(&self, n: usize) -> SimResult<Grid<T>> {
        self.expect_column()?;
        Ok(Grid::from_fn(self.rows, n, |r, _| self.cells[r].clone()))
    }

    /// Combine every cell with the value of `column` in the same row.
    pub fn zip_broadcast_column<U: Clone, V>(
        &self,
        column: &Grid<U>,
        mut f: impl FnMut(&T, &U) -> V,
    ) -> SimResult<Grid<V>> {
        column.expect_column()?;
        if column.rows != self.rows {
            return Err(SimError::ShapeMismatch {
                expected: (self.rows, 1),
                actual:   column.shape(),
            });
        }
        Ok(Grid::from_fn(self.rows, self.cols, |r, c| {
            f(&self.cells[r * self.cols + c], &column.cells[r])
        }))
    }
}

impl Grid<bool> {
    /// Whether any row is set in each column. Length `cols`.
    pub fn any_per_column(&self) -> Vec<bool> {
        (0..self.cols)
            .map(|c| (0..self.rows).any(|r| self.cells[r * self.cols + c]))
            .collect()
    }

    /// Index of the first set cell in each row, 0 when the row is all unset.
    /// Length `rows`.
    pub fn argmax_per_row(&self) -> Vec<usize> {
        self.iter_rows()
            .take(self.rows)
            .map(|row| row.iter().position(|&v| v).unwrap_or(0))
            .collect()
    }

    pub fn count_set(&self) -> usize {
        self.cells.iter().filter(|&&v| v).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_repeats_column_values() {
        let col = Grid::column(vec![1u32, 2, 3]);
        let tiled = col.tile_columns(4).unwrap();
        assert_eq!(tiled.shape(), (3, 4));
        assert_eq!(tiled.row(1), &[2, 2, 2, 2]);
    }

    #[test]
    fn tile_rejects_non_column() {
        let g = Grid::filled(2, 2, 0u32);
        assert!(matches!(g.tile_columns(3), Err(SimError::ShapeMismatch { .. })));
    }

    #[test]
    fn broadcast_compare_against_column() {
        let g = Grid::from_fn(2, 3, |r, c| (r * 10 + c) as u32);
        let thresholds = Grid::column(vec![1u32, 11]);
        let mask = g.zip_broadcast_column(&thresholds, |v, t| v > t).unwrap();
        assert_eq!(mask.row(0), &[false, false, true]);
        assert_eq!(mask.row(1), &[false, false, true]);
    }

    #[test]
    fn broadcast_rejects_row_count_mismatch() {
        let g = Grid::filled(2, 3, 0u32);
        let col = Grid::column(vec![0u32; 3]);
        assert!(g.zip_broadcast_column(&col, |a, b| a > b).is_err());
    }

    #[test]
    fn axis_reductions() {
        let mask = Grid::column(vec![false, true, false])
            .tile_columns(1)
            .unwrap();
        assert_eq!(mask.any_per_column(), vec![true]);

        let mask = Grid::from_fn(3, 4, |r, c| match r {
            0 => false,
            1 => c >= 2,
            _ => true,
        });
        assert_eq!(mask.any_per_column(), vec![true, true, true, true]);
        // All-false rows report index 0.
        assert_eq!(mask.argmax_per_row(), vec![0, 2, 0]);
        assert_eq!(mask.count_set(), 6);
    }

    #[test]
    fn get_is_bounds_checked() {
        let g = Grid::filled(2, 2, 5u32);
        assert_eq!(g.get(1, 1), Some(&5));
        assert_eq!(g.get(2, 0), None);
        assert_eq!(g.get(0, 2), None);
    }
}
