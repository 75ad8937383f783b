//! Command-line front end: reads a BUFR archive through a declarative
//! mapping file and writes one or more HDF5 output files. Grounded on
//! `examples/dump.rs`'s `clap::Parser` + `Result<(), Error>` `main` shape,
//! carried over into the query/export/encode pipeline this binary drives.

use std::path::PathBuf;

use bufr_query::data_container::DataContainer;
use bufr_query::mapping::Mapping;
use bufr_query::provider::{BufrFileProvider, DataProvider, RunParameters};
use bufr_query::query::QuerySet;
use bufr_query::query_runner::QueryRunner;
use bufr_query::result_set::ResultSet;
use bufr_query::{Error, encoder};

#[derive(clap::Parser)]
#[command(author, version, about = "Query a BUFR archive into an HDF5 file", long_about = None)]
struct Args {
    /// Path to a BUFR archive.
    #[arg(index = 1)]
    src: PathBuf,

    /// Path to the YAML mapping file declaring queries, splits and output layout.
    #[arg(index = 2)]
    mapping: PathBuf,

    /// Output path (templated per category, see the mapping's `outputPathTemplate`).
    #[arg(index = 3)]
    out: PathBuf,

    /// Path to a supplemental Table B/C/D definitions file.
    #[arg(short = 't', long)]
    table_path: Option<PathBuf>,

    /// Maximum number of messages to read.
    #[arg(short = 'n', long)]
    num_messages: Option<usize>,

    /// Skip the collective MPI gather, writing each rank's local slice to a
    /// `.task_<rank>`-suffixed path instead.
    #[arg(long)]
    no_gather: bool,
}

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = <Args as clap::Parser>::parse();

    let mapping = Mapping::from_yaml_path(&args.mapping)?;

    // The CLI's positional `out` wins over the mapping's own template.
    let mut encoder_config = mapping.encoder;
    encoder_config.output_path_template = args.out.to_string_lossy().into_owned();

    let mut query_set = QuerySet::with_subsets(mapping.bufr.subsets.clone());
    for variable in &mapping.bufr.variables {
        query_set.add(&variable.name, &variable.query)?;
    }

    // Table B/C/D lookup uses a built-in static table set; this crate
    // doesn't reimplement a binary table-definitions parser, so a supplied
    // `-t` path only gets a warning rather than changing behavior.
    if let Some(path) = &args.table_path {
        log::warn!("supplemental table path {} given but table loading is fixed at compile time; ignoring", path.display());
    }
    let tables = bufr_query::Tables::default();

    let mut provider = BufrFileProvider::new();
    provider.open_with_tables(&args.src, tables)?;

    let mut runner = QueryRunner::new(query_set);
    let mut result_set = ResultSet::new();

    let mut params = RunParameters::new();
    if let Some(n) = args.num_messages {
        params = params.with_num_messages(n);
    }

    provider.run(&params, &mut || true, &mut |_header, table, next_event| {
        if runner.query_set().includes_subset(&table.subset_name) {
            runner.accumulate(table, next_event, &mut result_set)
        } else {
            loop {
                if let bufr_query::DataEvent::Eof = next_event()? {
                    return Ok(());
                }
            }
        }
    })?;
    provider.close()?;

    let mut raw = DataContainer::new();
    for variable in &mapping.bufr.variables {
        let group_by = variable.group_by.as_deref();
        let mut obj = result_set.get(&variable.name, group_by)?;
        obj.set_query(variable.query.clone());
        if let Some(gb) = &variable.group_by {
            obj.set_group_by_field_name(Some(gb.clone()));
        }
        raw.add(&variable.name, obj, &vec![])?;
    }

    let exporter = mapping.bufr.to_exporter();
    let exported = exporter.export(&raw)?;

    let rank = 0;
    let written = encoder::encode(&encoder_config, &exported, args.no_gather, rank)?;
    for path in written {
        log::info!("wrote {}", path.display());
    }

    Ok(())
}
