//! Cross-process reshaping for [`DataObject::gather`]/`allGather`, mirroring
//! the original's `eckit::mpi::Comm`-based collective in
//! `original_source/core/src/bufr/DataObject.cpp`. Compiled against the
//! `mpi` crate (rsmpi) behind the `mpi` feature; without it every operation
//! degenerates to an identity clone on a single, implicit rank, so the rest
//! of the pipeline has no hard MPI dependency.
//!
//! Steps (spec): (1) reduce rank count over ranks (MAX), pad lagging ranks
//! with leading-dim-1 axes; (2) reduce-sum the leading dim, max-reduce
//! trailing dims; (3) remap any rank whose trailing dims fall short of the
//! global max into a padded send buffer, missing at absent positions; (4)
//! gatherv cell counts into displacements; (5) `gather` writes only on root,
//! `allGather` on every rank; (6) strings gather twice, bytes then lengths.

use crate::DataObject;
use crate::Error;

/// Whether `local_dims` need remapping before the collective send: true iff
/// any axis beyond the first differs from `global_dims` on that axis.
pub fn needs_adjust_dims(local_dims: &[usize], global_dims: &[usize]) -> bool {
    local_dims
        .iter()
        .zip(global_dims.iter())
        .skip(1)
        .any(|(a, b)| a != b)
}

#[cfg(not(feature = "mpi"))]
pub mod backend {
    use super::*;

    /// Single-rank stand-in for `mpi::topology::SimpleCommunicator`.
    pub struct Comm;

    pub fn gather(_comm: &Comm, obj: &DataObject, _root_rank: i32) -> Result<DataObject, Error> {
        Ok(obj.clone())
    }

    pub fn all_gather(_comm: &Comm, obj: &DataObject) -> Result<DataObject, Error> {
        Ok(obj.clone())
    }
}

#[cfg(feature = "mpi")]
pub mod backend {
    use super::*;
    use mpi::collective::SystemOperation;
    use mpi::datatype::{Partition, PartitionMut};
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    pub type Comm = SimpleCommunicator;

    /// Pads `dims` on the left with a leading axis of length 1 until it has
    /// `target_rank` axes (step 1: mismatched axis counts across ranks).
    fn pad_rank(dims: &[usize], target_rank: usize) -> Vec<usize> {
        let mut padded = vec![1usize; target_rank.saturating_sub(dims.len())];
        padded.extend_from_slice(dims);
        padded
    }

    fn global_trailing_dims(comm: &Comm, dims: &[usize]) -> Vec<usize> {
        let rank_count = dims.len() as i32;
        let mut global_rank_count = 0i32;
        comm.all_reduce_into(&rank_count, &mut global_rank_count, SystemOperation::max());
        let padded = pad_rank(dims, global_rank_count as usize);

        let trailing: Vec<i64> = padded[1.min(padded.len())..].iter().map(|&d| d as i64).collect();
        let mut global_trailing = vec![0i64; trailing.len()];
        if !trailing.is_empty() {
            comm.all_reduce_into(&trailing[..], &mut global_trailing[..], SystemOperation::max());
        }
        global_trailing.into_iter().map(|d| d as usize).collect()
    }

    /// Remaps `data` (row-major, `local_dims`) into a buffer shaped
    /// `[rows, global_trailing..]`, filling absent trailing positions with
    /// `missing` (step 3).
    fn remap_padded<T: Clone>(data: &[T], local_dims: &[usize], global_trailing: &[usize], missing: &T) -> Vec<T> {
        let rows = local_dims.first().copied().unwrap_or(0);
        let local_trailing = &local_dims[1.min(local_dims.len())..];
        let local_stride: usize = local_trailing.iter().product::<usize>().max(1);
        let global_stride: usize = global_trailing.iter().product::<usize>().max(1);
        if local_trailing == global_trailing {
            return data.to_vec();
        }
        let mut out = vec![missing.clone(); rows * global_stride];
        for r in 0..rows {
            let src = &data[r * local_stride..(r + 1) * local_stride];
            let dst_row = &mut out[r * global_stride..(r + 1) * global_stride];
            let n = src.len().min(dst_row.len());
            dst_row[..n].clone_from_slice(&src[..n]);
        }
        out
    }

    fn gather_counts(comm: &Comm, local_rows: usize, is_root: bool) -> Vec<i32> {
        let local = local_rows as i32;
        let size = comm.size() as usize;
        let mut counts = vec![0i32; if is_root { size } else { 0 }];
        if is_root {
            comm.this_process().gather_into_root(&local, &mut counts[..]);
        } else {
            comm.this_process().gather_into(&local);
        }
        counts
    }

    fn gatherv_numeric<T>(comm: &Comm, local: &[T], root_rank: i32, all: bool) -> Option<Vec<T>>
    where
        T: Equivalence + Clone + Default,
    {
        let rank = comm.rank();
        let is_root = rank == root_rank || all;
        let root_process = comm.process_at_rank(root_rank);

        let local_len = local.len() as i32;
        let size = comm.size() as usize;
        let mut counts = vec![0i32; size];
        if all {
            comm.all_gather_into(&local_len, &mut counts[..]);
        } else if rank == root_rank {
            root_process.gather_into_root(&local_len, &mut counts[..]);
        } else {
            root_process.gather_into(&local_len);
        }

        if !is_root {
            if !all {
                root_process.gather_varcount_into(local);
                return None;
            }
        }

        let displs: Vec<i32> = counts
            .iter()
            .scan(0i32, |acc, &c| {
                let d = *acc;
                *acc += c;
                Some(d)
            })
            .collect();
        let total: i32 = counts.iter().sum();
        let mut recv = vec![T::default(); total as usize];
        {
            let mut partition = PartitionMut::new(&mut recv[..], counts.clone(), displs.clone());
            if all {
                comm.all_gather_varcount_into(local, &mut partition);
            } else {
                root_process.gather_varcount_into_root(local, &mut partition);
            }
        }
        Some(recv)
    }

    pub fn gather(comm: &Comm, obj: &DataObject, root_rank: i32) -> Result<DataObject, Error> {
        run(comm, obj, root_rank, false)
    }

    pub fn all_gather(comm: &Comm, obj: &DataObject) -> Result<DataObject, Error> {
        run(comm, obj, 0, true)
    }

    fn run(comm: &Comm, obj: &DataObject, root_rank: i32, all: bool) -> Result<DataObject, Error> {
        let dims = obj.dims().to_vec();
        let global_trailing = global_trailing_dims(comm, &dims);
        let rows = dims.first().copied().unwrap_or(0);
        let stride: usize = global_trailing.iter().product::<usize>().max(1);

        macro_rules! numeric_case {
            ($variant:ident, $ctor:ident, $ty:ty) => {{
                if let DataObject::$variant(col) = obj {
                    let global_dims: Vec<usize> =
                        std::iter::once(dims.first().copied().unwrap_or(0)).chain(global_trailing.iter().copied()).collect();
                    let padded = if needs_adjust_dims(&dims, &global_dims) {
                        remap_padded(&col.data, &dims, &global_trailing, &col.missing)
                    } else {
                        col.data.clone()
                    };
                    let gathered = gatherv_numeric::<$ty>(comm, &padded, root_rank, all);
                    return Ok(match gathered {
                        Some(data) => {
                            let total_rows = data.len() / stride.max(1);
                            let mut out_dims = vec![total_rows];
                            out_dims.extend_from_slice(&global_trailing);
                            DataObject::$ctor(col.field_name.clone(), out_dims, data)
                        }
                        None => obj.clone(),
                    });
                }
            }};
        }
        numeric_case!(I32, from_i32, i32);
        numeric_case!(U32, from_u32, u32);
        numeric_case!(I64, from_i64, i64);
        numeric_case!(U64, from_u64, u64);
        numeric_case!(F32, from_f32, f32);
        numeric_case!(F64, from_f64, f64);

        if let DataObject::String(col) = obj {
            // Strings gather twice: once concatenated as bytes, once as
            // per-string lengths, then re-split on the receiving side(s).
            let concatenated: Vec<u8> = col.data.iter().flat_map(|s| s.as_bytes().to_vec()).collect();
            let lengths: Vec<i32> = col.data.iter().map(|s| s.len() as i32).collect();

            let gathered_lengths = gatherv_numeric::<i32>(comm, &lengths, root_rank, all);
            let gathered_bytes = gatherv_numeric::<u8>(comm, &concatenated, root_rank, all);

            return Ok(match (gathered_lengths, gathered_bytes) {
                (Some(lens), Some(bytes)) => {
                    let mut strings = Vec::with_capacity(lens.len());
                    let mut offset = 0usize;
                    for len in lens {
                        let len = len as usize;
                        let s = String::from_utf8_lossy(&bytes[offset..offset + len]).into_owned();
                        strings.push(s);
                        offset += len;
                    }
                    let rows = strings.len();
                    DataObject::from_strings(col.field_name.clone(), vec![rows], strings)
                }
                _ => obj.clone(),
            });
        }

        let _ = (rows, root_rank);
        Ok(obj.clone())
    }
}

pub use backend::{Comm, all_gather, gather};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_dims_true_iff_a_trailing_axis_diverges() {
        assert!(!needs_adjust_dims(&[2, 4], &[9, 4]));
        assert!(needs_adjust_dims(&[2, 3], &[9, 4]));
        assert!(needs_adjust_dims(&[2, 3, 1], &[9, 3, 2]));
    }

    #[cfg(not(feature = "mpi"))]
    #[test]
    fn single_rank_gather_is_identity() {
        let obj = DataObject::from_i32("x".to_string(), vec![2], vec![1, 2]);
        let comm = Comm;
        let gathered = gather(&comm, &obj, 0).unwrap();
        assert_eq!(gathered.dims(), obj.dims());
    }
}
