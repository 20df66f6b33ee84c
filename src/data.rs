//! Data
//!
//! Read-only views over training data: a column major [`Matrix`] of raw values
//! and the [`Dataset`] contract the tree builder consumes.
use crate::errors::DecisionTreeError;
use crate::utils::{argmax_count, is_missing};
use hashbrown::HashMap;

/// Contiguous Column Major Matrix data container.
///
/// Values are category encodings stored as `f64`, so that a missing value
/// can be represented by a sentinel (`NaN` by default).
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Indices into the data row-wise.
    pub index: Vec<usize>,
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
    stride1: usize,
    stride2: usize,
}

impl<'a, T> Matrix<'a, T> {
    // Defaults to column major
    /// Create a new Matrix.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        Matrix {
            data,
            index: (0..rows).collect(),
            rows,
            cols,
            stride1: rows,
            stride2: 1,
        }
    }

    /// Get a single reference to an item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[self.item_index(i, j)]
    }

    fn item_index(&self, i: usize, j: usize) -> usize {
        let mut idx = self.stride2 * i;
        idx += j * self.stride1;
        idx
    }

    /// Get access to a row of the data, as an iterator.
    pub fn get_row_iter(&self, row: usize) -> std::iter::StepBy<std::iter::Skip<std::slice::Iter<'a, T>>> {
        self.data.iter().skip(row).step_by(self.rows)
    }

    /// Get an entire column in the matrix.
    ///
    /// * `col` - The index of the column to get.
    pub fn get_col(&self, col: usize) -> &[T] {
        let i = self.item_index(0, col);
        let j = self.item_index(self.rows, col);
        &self.data[i..j]
    }
}

impl<'a, T> Matrix<'a, T>
where
    T: Copy,
{
    /// Get a row of the data as a vector.
    pub fn get_row(&self, row: usize) -> Vec<T> {
        self.get_row_iter(row).copied().collect()
    }
}

/// The row/column accessor the builder, splitter and pruner read from.
///
/// Feature values are category codes in `[0, distinct_value_count(col))`,
/// `None` standing for a missing value. A column with a distinct value
/// count of zero is not categorical and is never split on.
pub trait Dataset {
    /// Number of rows.
    fn rows(&self) -> usize;
    /// Number of feature columns.
    fn cols(&self) -> usize;
    /// Number of distinct encoded values of a column, 0 for a non-categorical column.
    fn distinct_value_count(&self, col: usize) -> usize;
    /// Category code of a cell, `None` when missing or when the column is not categorical.
    fn value(&self, row: usize, col: usize) -> Option<usize>;
    /// Class of a row.
    fn label(&self, row: usize) -> usize;
    /// Number of classes, labels are encoded `0..n_classes`.
    fn n_classes(&self) -> usize;

    fn is_categorical(&self, col: usize) -> bool {
        self.distinct_value_count(col) > 0
    }

    /// Number of rows of each class among `rows`.
    fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes()];
        for r in rows {
            counts[self.label(*r)] += 1;
        }
        counts
    }

    /// Most common class among `rows`, ties go to the lowest class.
    fn majority_label(&self, rows: &[usize]) -> usize {
        argmax_count(&self.class_counts(rows))
    }
}

/// A [`Dataset`] over a column major matrix of category codes and a label slice.
pub struct CategoricalDataset<'a> {
    data: &'a Matrix<'a, f64>,
    y: Vec<usize>,
    value_counts: Vec<usize>,
    n_classes: usize,
    missing: f64,
}

impl<'a> CategoricalDataset<'a> {
    /// Build a dataset, inferring every column's distinct value count
    /// as the largest observed code plus one. A column holding only missing
    /// values gets a count of zero.
    ///
    /// * `data` - Feature codes, one column per feature.
    /// * `y` - Class of every row.
    /// * `missing` - Value to consider missing.
    pub fn new(data: &'a Matrix<'a, f64>, y: &[f64], missing: f64) -> Result<Self, DecisionTreeError> {
        let mut value_counts = Vec::with_capacity(data.cols);
        for col in 0..data.cols {
            let mut count = 0;
            for (row, v) in data.get_col(col).iter().enumerate() {
                if is_missing(v, &missing) {
                    continue;
                }
                let next = category_code(*v)
                    .and_then(|code| code.checked_add(1))
                    .ok_or(DecisionTreeError::InvalidCategory(row, col, *v))?;
                count = count.max(next);
            }
            value_counts.push(count);
        }
        Self::with_value_counts(data, y, missing, value_counts)
    }

    /// Build a dataset with explicit distinct value counts.
    /// A count of zero marks a column as non-categorical.
    pub fn with_value_counts(
        data: &'a Matrix<'a, f64>,
        y: &[f64],
        missing: f64,
        value_counts: Vec<usize>,
    ) -> Result<Self, DecisionTreeError> {
        if data.rows != y.len() {
            return Err(DecisionTreeError::InputShape(data.rows, y.len()));
        }
        if value_counts.len() != data.cols {
            return Err(DecisionTreeError::FeatureCount(data.cols, value_counts.len()));
        }
        for (col, count) in value_counts.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            for (row, v) in data.get_col(col).iter().enumerate() {
                if !is_missing(v, &missing) && !is_category(*v, *count) {
                    return Err(DecisionTreeError::InvalidCategory(row, col, *v));
                }
            }
        }
        let y = encode_labels(y)?;
        let n_classes = y.iter().max().map_or(0, |m| m + 1);
        Ok(CategoricalDataset {
            data,
            y,
            value_counts,
            n_classes,
            missing,
        })
    }

}

impl Dataset for CategoricalDataset<'_> {
    fn rows(&self) -> usize {
        self.data.rows
    }

    fn cols(&self) -> usize {
        self.data.cols
    }

    fn distinct_value_count(&self, col: usize) -> usize {
        self.value_counts[col]
    }

    fn value(&self, row: usize, col: usize) -> Option<usize> {
        if self.value_counts[col] == 0 {
            return None;
        }
        let v = self.data.get(row, col);
        if is_missing(v, &self.missing) {
            None
        } else {
            Some(*v as usize)
        }
    }

    fn label(&self, row: usize) -> usize {
        self.y[row]
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}

/// Category code of a value, `None` unless it is a finite non-negative
/// integer that fits in a `usize`.
#[inline]
pub(crate) fn category_code(v: f64) -> Option<usize> {
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v < usize::MAX as f64 {
        Some(v as usize)
    } else {
        None
    }
}

#[inline]
fn is_category(v: f64, count: usize) -> bool {
    category_code(v).is_some_and(|code| code < count)
}

/// Convert float labels to class indices, rejecting anything that is not a
/// non-negative integer.
pub fn encode_labels(y: &[f64]) -> Result<Vec<usize>, DecisionTreeError> {
    y.iter()
        .enumerate()
        .map(|(row, v)| {
            category_code(*v).ok_or(DecisionTreeError::InvalidLabel(row, *v))
        })
        .collect()
}

/// Most common non-missing value of every column, ties going to the lowest value.
/// Columns without any observed value keep the missing sentinel.
pub fn column_modes(data: &Matrix<f64>, missing: f64) -> Vec<f64> {
    (0..data.cols)
        .map(|col| {
            let mut counts: HashMap<usize, usize> = HashMap::new();
            for v in data.get_col(col).iter().filter(|v| !is_missing(v, &missing)) {
                if let Some(code) = category_code(*v) {
                    *counts.entry(code).or_default() += 1;
                }
            }
            counts
                .into_iter()
                .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then(vb.cmp(va)))
                .map_or(missing, |(code, _)| code as f64)
        })
        .collect()
}

/// Copy of a column major buffer with every missing cell replaced by its column's fill value.
pub fn impute(data: &Matrix<f64>, fill: &[f64], missing: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(data.rows * data.cols);
    for (col, f) in fill.iter().enumerate().take(data.cols) {
        out.extend(
            data.get_col(col)
                .iter()
                .map(|v| if is_missing(v, &missing) { *f } else { *v }),
        );
    }
    out
}

/// Column major copy of the given rows of a matrix, in the order given.
pub fn take_rows(data: &Matrix<f64>, rows: &[usize]) -> Vec<f64> {
    let mut out = Vec::with_capacity(rows.len() * data.cols);
    for col in 0..data.cols {
        let column = data.get_col(col);
        out.extend(rows.iter().map(|r| column[*r]));
    }
    out
}
