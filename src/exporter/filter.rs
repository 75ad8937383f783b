//! Row filters applied, in declaration order, before splitting. Each filter
//! may drop rows of every column uniformly (e.g. a bounding filter trims to
//! `[lo, hi]` on one column).

use crate::Error;
use crate::data_container::{DataContainer, SubCategory};

/// Computes the row indices to keep for one category's data.
pub trait Filter {
    fn keep_rows(&self, container: &DataContainer, category: &SubCategory) -> Result<Vec<usize>, Error>;
}

/// Keeps rows where `variable`'s value falls within `[lower_bound,
/// upper_bound]` (either bound optional; a missing value fails the test on
/// whichever bound is set).
#[derive(Debug, Clone)]
pub struct BoundingFilter {
    pub variable: String,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
}

impl Filter for BoundingFilter {
    fn keep_rows(&self, container: &DataContainer, category: &SubCategory) -> Result<Vec<usize>, Error> {
        let obj = container.get(&self.variable, category)?;
        let num_rows = obj.dims().first().copied().unwrap_or(0);
        let row_stride: usize = obj.dims().iter().skip(1).product::<usize>().max(1);

        let values = row_scalars(obj, row_stride)?;
        Ok((0..num_rows)
            .filter(|&r| {
                let Some(v) = values[r] else { return false };
                self.lower_bound.is_none_or(|lo| v >= lo) && self.upper_bound.is_none_or(|hi| v <= hi)
            })
            .collect())
    }
}

/// Extracts each row's first cell as `f64`, or `None` if missing/non-numeric.
fn row_scalars(obj: &crate::DataObject, row_stride: usize) -> Result<Vec<Option<f64>>, Error> {
    use crate::DataObject::*;
    macro_rules! per_row {
        ($data:expr, $missing:expr) => {
            $data
                .chunks(row_stride.max(1))
                .map(|chunk| chunk.first().filter(|v| **v != $missing).map(|v| *v as f64))
                .collect()
        };
    }
    Ok(match obj {
        I32(c) => per_row!(c.data, c.missing),
        U32(c) => per_row!(c.data, c.missing),
        I64(c) => per_row!(c.data, c.missing),
        U64(c) => per_row!(c.data, c.missing),
        F32(c) => per_row!(c.data, c.missing),
        F64(c) => per_row!(c.data, c.missing),
        String(_) => {
            return Err(Error::InvalidTypeOverride("numeric".to_string(), "string".to_string()));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataObject;

    #[test]
    fn bounding_filter_keeps_in_range_rows() {
        let mut dc = DataContainer::new();
        dc.add(
            "lat",
            DataObject::from_f64("lat".to_string(), vec![4], vec![10.0, 50.0, -90.0, 25.0]),
            &vec![],
        )
        .unwrap();
        let filter = BoundingFilter {
            variable: "lat".to_string(),
            lower_bound: Some(0.0),
            upper_bound: Some(60.0),
        };
        let keep = filter.keep_rows(&dc, &vec![]).unwrap();
        assert_eq!(keep, vec![0, 1, 3]);
    }
}
