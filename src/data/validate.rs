/// Minimum number of columns an upload needs: the compound index plus at
/// least one variable.
pub const MIN_COLUMNS: usize = 2;

/// Anything with a column count.
pub trait TableShape {
    fn n_columns(&self) -> usize;
}

/// Acceptance gate for an uploaded table.
///
/// Only the width is checked. Cell types, nulls and header consistency are
/// left to later stages. A `false` result means the upload is rejected and
/// nothing downstream runs.
pub fn validate_shape<T: TableShape + ?Sized>(table: &T) -> bool {
    table.n_columns() >= MIN_COLUMNS
}
