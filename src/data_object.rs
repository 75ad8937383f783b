//! The polymorphic typed column, [`DataObject`]: an enum over seven
//! concrete storage kinds dispatching through inherent `match` methods
//! rather than a generic `DataObject<T>` — per the corpus design note that
//! erasing at the container boundary is simpler than threading a type
//! parameter through every consumer. Grounded on
//! `core/include/bufr/DataObject.h` (`DataObjectBase` + `DataObject<T>` +
//! the `std::string` specialization).

use crate::Error;
use crate::Value;
use crate::subset_table::TypeInfo;

/// One typed, possibly multi-dimensional column of decoded BUFR data.
#[derive(Debug, Clone, PartialEq)]
pub enum DataObject {
    I32(Column<i32>),
    U32(Column<u32>),
    I64(Column<i64>),
    U64(Column<u64>),
    F32(Column<f32>),
    F64(Column<f64>),
    String(Column<String>),
}

/// Shared metadata plus the typed buffer, flattened row-major
/// (`idxFromLoc`: `offset = sum(loc[i] * stride[i])`, `stride` the usual
/// C-order strides of `dims`).
#[derive(Debug, Clone, PartialEq)]
pub struct Column<T> {
    pub field_name: String,
    pub group_by_field_name: Option<String>,
    pub query: String,
    pub dims: Vec<usize>,
    pub dim_paths: Vec<String>,
    pub data: Vec<T>,
    pub missing: T,
}

impl<T: Clone> Column<T> {
    fn new(field_name: String, dims: Vec<usize>, data: Vec<T>, missing: T) -> Self {
        Column {
            field_name,
            group_by_field_name: None,
            query: String::new(),
            dims,
            dim_paths: vec![],
            data,
            missing,
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $col:ident => $body:expr) => {
        match $self {
            DataObject::I32($col) => $body,
            DataObject::U32($col) => $body,
            DataObject::I64($col) => $body,
            DataObject::U64($col) => $body,
            DataObject::F32($col) => $body,
            DataObject::F64($col) => $body,
            DataObject::String($col) => $body,
        }
    };
}

impl DataObject {
    pub fn from_i32(field_name: String, dims: Vec<usize>, data: Vec<i32>) -> Self {
        DataObject::I32(Column::new(field_name, dims, data, i32::MAX))
    }

    pub fn from_u32(field_name: String, dims: Vec<usize>, data: Vec<u32>) -> Self {
        DataObject::U32(Column::new(field_name, dims, data, u32::MAX))
    }

    pub fn from_i64(field_name: String, dims: Vec<usize>, data: Vec<i64>) -> Self {
        DataObject::I64(Column::new(field_name, dims, data, i64::MAX))
    }

    pub fn from_u64(field_name: String, dims: Vec<usize>, data: Vec<u64>) -> Self {
        DataObject::U64(Column::new(field_name, dims, data, u64::MAX))
    }

    pub fn from_f32(field_name: String, dims: Vec<usize>, data: Vec<f32>) -> Self {
        DataObject::F32(Column::new(field_name, dims, data, f32::MAX))
    }

    pub fn from_f64(field_name: String, dims: Vec<usize>, data: Vec<f64>) -> Self {
        DataObject::F64(Column::new(field_name, dims, data, f64::MAX))
    }

    pub fn from_strings(field_name: String, dims: Vec<usize>, data: Vec<String>) -> Self {
        DataObject::String(Column::new(field_name, dims, data, String::new()))
    }

    /// Builds the appropriately typed column for a leaf's decoded values,
    /// per its [`TypeInfo`]: CCITT IA5 leaves become [`DataObject::String`],
    /// scaled (`scale != 0`) leaves become [`DataObject::F64`], leaves wider
    /// than 32 bits become [`DataObject::I64`], everything else
    /// [`DataObject::I32`].
    pub fn from_values(
        field_name: String,
        dims: Vec<usize>,
        type_info: TypeInfo,
        values: Vec<Value>,
    ) -> Result<DataObject, Error> {
        let expected: usize = dims.iter().product();
        if values.len() != expected {
            return Err(Error::ShapeMismatch(format!(
                "field \"{field_name}\": {} values for dims {dims:?} (expected {expected})",
                values.len()
            )));
        }

        Ok(if type_info.is_string {
            let data = values
                .into_iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_default())
                .collect();
            DataObject::from_strings(field_name, dims, data)
        } else if type_info.scale != 0 {
            let data = values.into_iter().map(|v| v.to_f64().unwrap_or(f64::MAX)).collect();
            DataObject::from_f64(field_name, dims, data)
        } else if type_info.needs_wide_int() {
            let data = values
                .into_iter()
                .map(|v| v.to_f64().map(|f| f as i64).unwrap_or(i64::MAX))
                .collect();
            DataObject::from_i64(field_name, dims, data)
        } else {
            let data = values
                .into_iter()
                .map(|v| v.to_f64().map(|f| f as i32).unwrap_or(i32::MAX))
                .collect();
            DataObject::from_i32(field_name, dims, data)
        })
    }

    pub fn field_name(&self) -> &str {
        dispatch!(self, c => c.field_name.as_str())
    }

    pub fn set_field_name(&mut self, name: String) {
        dispatch!(self, c => c.field_name = name)
    }

    pub fn group_by_field_name(&self) -> Option<&str> {
        dispatch!(self, c => c.group_by_field_name.as_deref())
    }

    pub fn set_group_by_field_name(&mut self, name: Option<String>) {
        dispatch!(self, c => c.group_by_field_name = name)
    }

    pub fn set_query(&mut self, query: String) {
        dispatch!(self, c => c.query = query)
    }

    pub fn set_dim_paths(&mut self, paths: Vec<String>) {
        dispatch!(self, c => c.dim_paths = paths)
    }

    pub fn dim_paths(&self) -> &[String] {
        dispatch!(self, c => c.dim_paths.as_slice())
    }

    pub fn dims(&self) -> &[usize] {
        dispatch!(self, c => c.dims.as_slice())
    }

    pub fn set_dims(&mut self, dims: Vec<usize>) {
        dispatch!(self, c => c.dims = dims)
    }

    pub fn size(&self) -> usize {
        self.dims().iter().product()
    }

    pub fn is_string(&self) -> bool {
        matches!(self, DataObject::String(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataObject::I32(_) | DataObject::U32(_) | DataObject::I64(_) | DataObject::U64(_)
        )
    }

    /// Whether `dims_a` and `dims_b` agree on every axis but the first (the
    /// row/"Location" axis), i.e. they came from the same dim path.
    pub fn has_same_path(&self, other: &DataObject) -> bool {
        self.dim_paths() == other.dim_paths()
    }

    /// Multiplies every element by `factor`. Integer columns reject a
    /// non-integer factor.
    pub fn multiply_by(&mut self, factor: f64) -> Result<(), Error> {
        if self.is_integer() && factor.fract() != 0.0 {
            return Err(Error::NonIntegerScalingOfIntField(self.field_name().to_string()));
        }
        match self {
            DataObject::I32(c) => scale_int(&mut c.data, c.missing, factor),
            DataObject::U32(c) => scale_int(&mut c.data, c.missing, factor),
            DataObject::I64(c) => scale_int(&mut c.data, c.missing, factor),
            DataObject::U64(c) => scale_int(&mut c.data, c.missing, factor),
            DataObject::F32(c) => scale_float(&mut c.data, c.missing, factor as f32),
            DataObject::F64(c) => scale_float(&mut c.data, c.missing, factor),
            DataObject::String(c) => {
                return Err(Error::Invalid(format!(
                    "cannot scale string field \"{}\"",
                    c.field_name
                )));
            }
        }
        Ok(())
    }

    /// Adds `offset` to every element.
    pub fn offset_by(&mut self, offset: f64) -> Result<(), Error> {
        match self {
            DataObject::I32(c) => offset_int(&mut c.data, c.missing, offset),
            DataObject::U32(c) => offset_int(&mut c.data, c.missing, offset),
            DataObject::I64(c) => offset_int(&mut c.data, c.missing, offset),
            DataObject::U64(c) => offset_int(&mut c.data, c.missing, offset),
            DataObject::F32(c) => offset_float(&mut c.data, c.missing, offset as f32),
            DataObject::F64(c) => offset_float(&mut c.data, c.missing, offset),
            DataObject::String(c) => {
                return Err(Error::Invalid(format!(
                    "cannot offset string field \"{}\"",
                    c.field_name
                )));
            }
        }
        Ok(())
    }

    /// Appends `other`'s rows (axis 0) to this column. Requires identical
    /// trailing dims and element type.
    pub fn append(&mut self, other: &DataObject) -> Result<(), Error> {
        fn check_trailing(a: &[usize], b: &[usize]) -> Result<(), Error> {
            if a.get(1..) != b.get(1..) {
                return Err(Error::ShapeMismatch(format!(
                    "cannot append dims {b:?} onto {a:?}"
                )));
            }
            Ok(())
        }
        match (self, other) {
            (DataObject::I32(a), DataObject::I32(b)) => {
                check_trailing(&a.dims, &b.dims)?;
                a.data.extend_from_slice(&b.data);
                a.dims[0] += b.dims.first().copied().unwrap_or(0);
            }
            (DataObject::U32(a), DataObject::U32(b)) => {
                check_trailing(&a.dims, &b.dims)?;
                a.data.extend_from_slice(&b.data);
                a.dims[0] += b.dims.first().copied().unwrap_or(0);
            }
            (DataObject::I64(a), DataObject::I64(b)) => {
                check_trailing(&a.dims, &b.dims)?;
                a.data.extend_from_slice(&b.data);
                a.dims[0] += b.dims.first().copied().unwrap_or(0);
            }
            (DataObject::U64(a), DataObject::U64(b)) => {
                check_trailing(&a.dims, &b.dims)?;
                a.data.extend_from_slice(&b.data);
                a.dims[0] += b.dims.first().copied().unwrap_or(0);
            }
            (DataObject::F32(a), DataObject::F32(b)) => {
                check_trailing(&a.dims, &b.dims)?;
                a.data.extend_from_slice(&b.data);
                a.dims[0] += b.dims.first().copied().unwrap_or(0);
            }
            (DataObject::F64(a), DataObject::F64(b)) => {
                check_trailing(&a.dims, &b.dims)?;
                a.data.extend_from_slice(&b.data);
                a.dims[0] += b.dims.first().copied().unwrap_or(0);
            }
            (DataObject::String(a), DataObject::String(b)) => {
                check_trailing(&a.dims, &b.dims)?;
                a.data.extend_from_slice(&b.data);
                a.dims[0] += b.dims.first().copied().unwrap_or(0);
            }
            _ => {
                return Err(Error::ShapeMismatch(format!(
                    "cannot append a {} column onto a {} column",
                    other.kind_name(),
                    self.kind_name()
                )));
            }
        }
        Ok(())
    }

    /// Selects rows (axis 0) by index, preserving trailing dims.
    pub fn slice(&self, rows: &[usize]) -> DataObject {
        fn do_slice<T: Clone>(c: &Column<T>, rows: &[usize]) -> Column<T> {
            let row_stride: usize = c.dims.iter().skip(1).product();
            let mut data = Vec::with_capacity(rows.len() * row_stride.max(1));
            for &r in rows {
                data.extend_from_slice(&c.data[r * row_stride..(r + 1) * row_stride]);
            }
            let mut dims = c.dims.clone();
            if let Some(first) = dims.first_mut() {
                *first = rows.len();
            }
            Column {
                field_name: c.field_name.clone(),
                group_by_field_name: c.group_by_field_name.clone(),
                query: c.query.clone(),
                dims,
                dim_paths: c.dim_paths.clone(),
                data,
                missing: c.missing.clone(),
            }
        }
        match self {
            DataObject::I32(c) => DataObject::I32(do_slice(c, rows)),
            DataObject::U32(c) => DataObject::U32(do_slice(c, rows)),
            DataObject::I64(c) => DataObject::I64(do_slice(c, rows)),
            DataObject::U64(c) => DataObject::U64(do_slice(c, rows)),
            DataObject::F32(c) => DataObject::F32(do_slice(c, rows)),
            DataObject::F64(c) => DataObject::F64(do_slice(c, rows)),
            DataObject::String(c) => DataObject::String(do_slice(c, rows)),
        }
    }

    /// A stable hash per row, used by `DataContainer::deduplicate` to build
    /// a composite dedup key across several fields.
    pub fn hash_rows(&self) -> Vec<u64> {
        use std::hash::{Hash, Hasher};
        fn hash_each<T: Hash>(data: &[T], row_stride: usize, num_rows: usize) -> Vec<u64> {
            (0..num_rows)
                .map(|r| {
                    let mut hasher = std::collections::hash_map::DefaultHasher::new();
                    data[r * row_stride..(r + 1) * row_stride.max(1)]
                        .iter()
                        .for_each(|v| v.hash(&mut hasher));
                    hasher.finish()
                })
                .collect()
        }
        let num_rows = self.dims().first().copied().unwrap_or(0);
        let row_stride: usize = self.dims().iter().skip(1).product::<usize>().max(1);
        match self {
            DataObject::I32(c) => hash_each(&c.data, row_stride, num_rows),
            DataObject::U32(c) => hash_each(&c.data, row_stride, num_rows),
            DataObject::I64(c) => hash_each(&c.data, row_stride, num_rows),
            DataObject::U64(c) => hash_each(&c.data, row_stride, num_rows),
            DataObject::F32(c) => hash_each(
                &c.data.iter().map(|f| f.to_bits()).collect::<Vec<_>>(),
                row_stride,
                num_rows,
            ),
            DataObject::F64(c) => hash_each(
                &c.data.iter().map(|f| f.to_bits()).collect::<Vec<_>>(),
                row_stride,
                num_rows,
            ),
            DataObject::String(c) => hash_each(&c.data, row_stride, num_rows),
        }
    }

    /// Validates that every row repeats the same leading-axis pattern (as a
    /// dimension-coordinate source must) and returns that pattern as a new
    /// 1-D `DataObject`. Errs with [`Error::NonRepeatingDimensionSource`]
    /// otherwise.
    pub fn create_dimension_from_data(&self, dim_name: &str) -> Result<DataObject, Error> {
        fn extract<T: Clone + PartialEq>(
            data: &[T],
            dims: &[usize],
            missing: &T,
            name: &str,
        ) -> Result<(Vec<T>, Vec<usize>), Error> {
            let num_rows = dims.first().copied().unwrap_or(1);
            let row_stride: usize = dims.iter().skip(1).product::<usize>().max(1);
            if num_rows == 0 {
                return Ok((vec![], vec![row_stride]));
            }
            let first = &data[0..row_stride];
            for r in 1..num_rows {
                let row = &data[r * row_stride..(r + 1) * row_stride];
                let matches = row.iter().zip(first).all(|(a, b)| a == b || a == missing || b == missing);
                if !matches {
                    return Err(Error::NonRepeatingDimensionSource(name.to_string()));
                }
            }
            Ok((first.to_vec(), vec![row_stride]))
        }
        Ok(match self {
            DataObject::I32(c) => {
                let (data, dims) = extract(&c.data, &c.dims, &c.missing, dim_name)?;
                DataObject::from_i32(dim_name.to_string(), dims, data)
            }
            DataObject::U32(c) => {
                let (data, dims) = extract(&c.data, &c.dims, &c.missing, dim_name)?;
                DataObject::from_u32(dim_name.to_string(), dims, data)
            }
            DataObject::I64(c) => {
                let (data, dims) = extract(&c.data, &c.dims, &c.missing, dim_name)?;
                DataObject::from_i64(dim_name.to_string(), dims, data)
            }
            DataObject::U64(c) => {
                let (data, dims) = extract(&c.data, &c.dims, &c.missing, dim_name)?;
                DataObject::from_u64(dim_name.to_string(), dims, data)
            }
            DataObject::F32(c) => {
                let (data, dims) = extract(&c.data, &c.dims, &c.missing, dim_name)?;
                DataObject::from_f32(dim_name.to_string(), dims, data)
            }
            DataObject::F64(c) => {
                let (data, dims) = extract(&c.data, &c.dims, &c.missing, dim_name)?;
                DataObject::from_f64(dim_name.to_string(), dims, data)
            }
            DataObject::String(c) => {
                let (data, dims) = extract(&c.data, &c.dims, &c.missing, dim_name)?;
                DataObject::from_strings(dim_name.to_string(), dims, data)
            }
        })
    }

    fn kind_name(&self) -> &'static str {
        match self {
            DataObject::I32(_) => "i32",
            DataObject::U32(_) => "u32",
            DataObject::I64(_) => "i64",
            DataObject::U64(_) => "u64",
            DataObject::F32(_) => "f32",
            DataObject::F64(_) => "f64",
            DataObject::String(_) => "string",
        }
    }
}

/// Scales an integer column's elements through an `i128` intermediate
/// (wide enough to round-trip any of `i32`/`u32`/`i64`/`u64` losslessly).
fn scale_int<T>(data: &mut [T], missing: T, factor: f64)
where
    T: Copy + PartialEq + Into<i128> + TryFrom<i128>,
{
    for v in data.iter_mut() {
        if *v == missing {
            continue;
        }
        let scaled = ((*v).into() as f64 * factor).round() as i128;
        if let Ok(t) = T::try_from(scaled) {
            *v = t;
        }
    }
}

fn offset_int<T>(data: &mut [T], missing: T, offset: f64)
where
    T: Copy + PartialEq + Into<i128> + TryFrom<i128>,
{
    for v in data.iter_mut() {
        if *v == missing {
            continue;
        }
        let shifted = ((*v).into() as f64 + offset).round() as i128;
        if let Ok(t) = T::try_from(shifted) {
            *v = t;
        }
    }
}

fn scale_float<T: Copy + PartialEq + std::ops::Mul<Output = T>>(data: &mut [T], missing: T, factor: T) {
    for v in data.iter_mut() {
        if *v != missing {
            *v = *v * factor;
        }
    }
}

fn offset_float<T: Copy + PartialEq + std::ops::Add<Output = T>>(data: &mut [T], missing: T, offset: T) {
    for v in data.iter_mut() {
        if *v != missing {
            *v = *v + offset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiply_rejects_non_integer_factor_on_int_column() {
        let mut obj = DataObject::from_i32("x".to_string(), vec![2], vec![1, 2]);
        assert!(matches!(
            obj.multiply_by(1.5),
            Err(Error::NonIntegerScalingOfIntField(_))
        ));
    }

    #[test]
    fn multiply_allows_integer_factor() {
        let mut obj = DataObject::from_i32("x".to_string(), vec![2], vec![1, 2]);
        obj.multiply_by(3.0).unwrap();
        if let DataObject::I32(c) = &obj {
            assert_eq!(c.data, vec![3, 6]);
        } else {
            panic!("wrong variant");
        }
    }

    #[test]
    fn offset_skips_missing_sentinel() {
        let mut obj = DataObject::from_i32("x".to_string(), vec![2], vec![1, i32::MAX]);
        obj.offset_by(10.0).unwrap();
        if let DataObject::I32(c) = &obj {
            assert_eq!(c.data, vec![11, i32::MAX]);
        } else {
            panic!("wrong variant");
        }
    }

    #[test]
    fn append_checks_trailing_shape() {
        let mut a = DataObject::from_i32("x".to_string(), vec![1, 2], vec![1, 2]);
        let b = DataObject::from_i32("x".to_string(), vec![1, 3], vec![1, 2, 3]);
        assert!(matches!(a.append(&b), Err(Error::ShapeMismatch(_))));

        let b_ok = DataObject::from_i32("x".to_string(), vec![1, 2], vec![3, 4]);
        a.append(&b_ok).unwrap();
        assert_eq!(a.dims(), &[2, 2]);
    }

    #[test]
    fn slice_preserves_trailing_dims() {
        let obj = DataObject::from_i32("x".to_string(), vec![3, 2], vec![1, 2, 3, 4, 5, 6]);
        let sliced = obj.slice(&[0, 2]);
        assert_eq!(sliced.dims(), &[2, 2]);
        if let DataObject::I32(c) = &sliced {
            assert_eq!(c.data, vec![1, 2, 5, 6]);
        } else {
            panic!("wrong variant");
        }
    }

    #[test]
    fn create_dimension_from_data_accepts_repeating_pattern() {
        let obj = DataObject::from_i32("chnm".to_string(), vec![2, 3], vec![1, 2, 3, 1, 2, 3]);
        let dim = obj.create_dimension_from_data("channel").unwrap();
        assert_eq!(dim.dims(), &[3]);
    }

    #[test]
    fn create_dimension_from_data_rejects_mismatched_rows() {
        let obj = DataObject::from_i32("chnm".to_string(), vec![2, 3], vec![1, 2, 3, 9, 9, 9]);
        assert!(matches!(
            obj.create_dimension_from_data("channel"),
            Err(Error::NonRepeatingDimensionSource(_))
        ));
    }

    #[test]
    fn hash_rows_is_stable_and_row_scoped() {
        let obj = DataObject::from_i32("x".to_string(), vec![2, 2], vec![1, 2, 1, 2]);
        let hashes = obj.hash_rows();
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes[0], hashes[1]);
    }
}
