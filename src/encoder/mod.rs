//! Writes a queried, exported [`crate::data_container::DataContainer`] out as
//! one or more HDF5 files, per a declarative [`description::Description`].
//! Grounded on `original_source/core/src/encoders/netcdf/NetcdfEncoder.cpp`'s
//! top-level `encode` entry point, which accepts an already-gathered
//! container and a `Description` and iterates category tuples itself.

pub mod description;
pub mod netcdf;

use crate::Error;
use crate::data_container::DataContainer;
use crate::mapping::EncoderConfig;

pub use description::Description;

/// Builds a `Description` from a mapping file's `encoder:` section and
/// writes `container` out, one file per category tuple.
///
/// `rank` is only consulted when `no_gather` is set, in which case every
/// rank writes its own local (non-gathered) slice and the output path
/// template's filename stem is suffixed with `.task_<rank>` to avoid
/// collisions, mirroring the CLI's `--no-gather` mode.
pub fn encode(
    config: &EncoderConfig,
    container: &DataContainer,
    no_gather: bool,
    rank: i32,
) -> Result<Vec<std::path::PathBuf>, Error> {
    let mut description = Description::from_config(config)?;
    if no_gather {
        description.output_path_template = suffix_stem(&description.output_path_template, rank);
    }
    netcdf::write_all(&description, container)
}

/// Inserts `.task_<rank>` before the template's last extension, so
/// placeholders embedded in the filename (e.g. `out_{Region}.nc`) still land
/// in the stem rather than after `.nc`.
fn suffix_stem(template: &str, rank: i32) -> String {
    let path = std::path::Path::new(template);
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    let file_name = match ext {
        Some(ext) => format!("{stem}.task_{rank}.{ext}"),
        None => format!("{stem}.task_{rank}"),
    };
    match dir {
        Some(dir) => dir.join(file_name).to_string_lossy().into_owned(),
        None => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_stem_lands_before_the_extension() {
        assert_eq!(suffix_stem("out_{Region}.nc", 3), "out_{Region}.task_3.nc");
    }

    #[test]
    fn suffix_stem_handles_a_directory_prefix() {
        assert_eq!(suffix_stem("/data/out.h5", 1), "/data/out.task_1.h5");
    }

    #[test]
    fn suffix_stem_handles_no_extension() {
        assert_eq!(suffix_stem("out", 0), "out.task_0");
    }
}
