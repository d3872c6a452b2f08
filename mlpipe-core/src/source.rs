//! Loader trait for pipeline input

use std::fmt::Debug;

use crate::binder::{RecordSchema, Row};
use crate::error::Result;

/// The first stage of a pipeline: produces positional rows for a record type
///
/// Loaders only deal with raw cells. Converting rows into columns is the
/// schema binder's job, so the same loader serves training and any other
/// consumer of the record type.
pub trait Loader: Debug + Send + Sync {
    /// Description of the data source used in errors and logs
    fn describe(&self) -> String;

    /// Read every row of the source
    ///
    /// Cells bound to a field of `schema` must already carry that field's
    /// kind; cells no field binds may be left as text.
    fn load(&self, schema: &RecordSchema) -> Result<Vec<Row>>;

    /// Provides a hint about the total number of rows (if known)
    fn row_count_hint(&self) -> Option<usize> {
        None
    }
}
