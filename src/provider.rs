//! Adapts the byte-level BUFR decoder to a stable message-source interface,
//! so the query/accumulation layer never depends on [`crate::reader`]'s
//! concrete stack machinery. Grounded on the `DataProvider`/`NcepDataProvider`
//! split in `original_source` (`DataProvider.h`, `NcepDataProvider.cpp`):
//! there, a decoded message's structure is exposed to query resolution as
//! the BUFRLIB structural arrays (`isc`, `link`, `itp`, `tag`, `jmpb`,
//! `irf`); here it's exposed instead as a [`SubsetTable`] built straight off
//! the already-resolved descriptor tree `reader::DataSpec` provides, since
//! `DataSpec::root_descriptors` already carries that structure without
//! needing to re-derive it from parallel index arrays.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use chrono::NaiveDateTime;

use crate::subset_table::SubsetTable;
use crate::{DataEvent, DataReader, DataSpec, Error, HeaderSections, ResolvedDescriptor, Tables, ensure_end_section};

/// Paths currently held open by a [`BufrFileProvider`], process-wide. Mirrors
/// BUFRLIB's fixed-logical-unit model: opening a path already open by
/// another provider is rejected with [`Error::FileUnitBusy`] rather than
/// silently sharing the cursor.
fn open_paths() -> &'static Mutex<HashSet<PathBuf>> {
    static PATHS: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    PATHS.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Scope and time window for a [`DataProvider::run`] pass, mirroring
/// BUFRLIB's `datetimerange`/message-count subsetting knobs.
#[derive(Debug, Clone, Default)]
pub struct RunParameters {
    /// Number of leading messages to skip.
    pub offset: usize,
    /// Maximum number of messages to visit; `None` means "all".
    pub num_messages: Option<usize>,
    pub start_time: Option<NaiveDateTime>,
    pub stop_time: Option<NaiveDateTime>,
}

impl RunParameters {
    pub fn new() -> Self {
        RunParameters::default()
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_num_messages(mut self, n: usize) -> Self {
        self.num_messages = Some(n);
        self
    }

    pub fn with_time_range(mut self, start: NaiveDateTime, stop: NaiveDateTime) -> Self {
        self.start_time = Some(start);
        self.stop_time = Some(stop);
        self
    }
}

/// A source of BUFR messages the query/accumulation layer can drive without
/// knowing how (or whether) the bytes come from a file.
pub trait DataProvider {
    fn open(&mut self, path: &Path) -> Result<(), Error> {
        self.open_with_tables(path, Tables::default())
    }

    fn open_with_tables(&mut self, path: &Path, tables: Tables) -> Result<(), Error>;

    fn close(&mut self) -> Result<(), Error>;

    fn rewind(&mut self) -> Result<(), Error>;

    /// Counts messages in the file, consuming and restoring the cursor.
    fn num_messages(&mut self) -> Result<usize, Error>;

    /// Visits every message in `params`'s scope, invoking `on_message` with
    /// the message's header, its [`SubsetTable`], and an event source the
    /// callback can pump with [`DataReader::read_event`] until
    /// [`DataEvent::Eof`]. `keep_running` is checked before each message;
    /// once it returns `false` the pass stops early without error.
    fn run(
        &mut self,
        params: &RunParameters,
        keep_running: &mut dyn FnMut() -> bool,
        on_message: &mut dyn FnMut(
            &HeaderSections,
            &SubsetTable,
            &mut dyn FnMut() -> Result<DataEvent, Error>,
        ) -> Result<(), Error>,
    ) -> Result<(), Error>;
}

/// A [`DataProvider`] reading messages back-to-back out of one open file.
pub struct BufrFileProvider {
    path: Option<PathBuf>,
    file: Option<BufReader<File>>,
    tables: Tables,
}

impl Default for BufrFileProvider {
    fn default() -> Self {
        BufrFileProvider {
            path: None,
            file: None,
            tables: Tables::default(),
        }
    }
}

impl BufrFileProvider {
    pub fn new() -> Self {
        BufrFileProvider::default()
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for BufrFileProvider {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl DataProvider for BufrFileProvider {
    fn open_with_tables(&mut self, path: &Path, tables: Tables) -> Result<(), Error> {
        let mut held = open_paths().lock().expect("open_paths mutex poisoned");
        if held.contains(path) {
            return Err(Error::FileUnitBusy);
        }
        let file = File::open(path)?;
        held.insert(path.to_path_buf());
        drop(held);

        self.path = Some(path.to_path_buf());
        self.file = Some(BufReader::new(file));
        self.tables = tables;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        if let Some(path) = self.path.take() {
            open_paths().lock().expect("open_paths mutex poisoned").remove(&path);
        }
        self.file = None;
        Ok(())
    }

    fn rewind(&mut self) -> Result<(), Error> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Invalid("provider is not open".to_string()))?;
        file.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    fn num_messages(&mut self) -> Result<usize, Error> {
        let mut count = 0usize;
        self.run(&RunParameters::new(), &mut || true, &mut |_header, _table, next_event| {
            loop {
                if let DataEvent::Eof = next_event()? {
                    break;
                }
            }
            count += 1;
            Ok(())
        })?;
        self.rewind()?;
        Ok(count)
    }

    fn run(
        &mut self,
        params: &RunParameters,
        keep_running: &mut dyn FnMut() -> bool,
        on_message: &mut dyn FnMut(
            &HeaderSections,
            &SubsetTable,
            &mut dyn FnMut() -> Result<DataEvent, Error>,
        ) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Invalid("provider is not open".to_string()))?;
        let tables = &self.tables;

        let mut index = 0usize;
        let mut emitted = 0usize;
        loop {
            if !keep_running() {
                break;
            }
            let header = match HeaderSections::read(&mut *file) {
                Ok(h) => h,
                Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            };
            let data_spec = DataSpec::from_data_description(&header.data_description_section, tables)?;
            let mut data_reader = DataReader::new(&mut *file, &data_spec)?;

            let within_scope = index >= params.offset
                && params.num_messages.is_none_or(|n| emitted < n)
                && within_time_range(&header, params);

            if within_scope {
                let subset_table = build_subset_table(&header, &data_spec);
                on_message(&header, &subset_table, &mut || data_reader.read_event())?;
                emitted += 1;
            } else {
                drain(&mut data_reader)?;
            }

            ensure_end_section(header.indicator_section.edition_number, &mut *file)?;
            index += 1;
            if params.num_messages.is_some_and(|n| emitted >= n) {
                break;
            }
        }
        Ok(())
    }
}

fn drain<R: std::io::Read>(data_reader: &mut DataReader<'_, R>) -> Result<(), Error> {
    loop {
        if let DataEvent::Eof = data_reader.read_event()? {
            return Ok(());
        }
    }
}

fn within_time_range(header: &HeaderSections, params: &RunParameters) -> bool {
    if params.start_time.is_none() && params.stop_time.is_none() {
        return true;
    }
    let Some(message_time) = typical_time(header) else {
        return true;
    };
    if let Some(start) = params.start_time {
        if message_time < start {
            return false;
        }
    }
    if let Some(stop) = params.stop_time {
        if message_time > stop {
            return false;
        }
    }
    true
}

fn typical_time(header: &HeaderSections) -> Option<NaiveDateTime> {
    let id = &header.identification_section;
    chrono::NaiveDate::from_ymd_opt(id.typical_year as i32, id.typical_month as u32, id.typical_day as u32)
        .and_then(|d| d.and_hms_opt(id.typical_hour as u32, id.typical_minute as u32, id.typical_second as u32))
}

/// The root descriptor tree, shaped by [`SubsetTable::from_resolved`]. Named
/// after the single wrapping Table D sequence when there is one, else a
/// synthetic name built from the message's data category.
fn build_subset_table(header: &HeaderSections, data_spec: &DataSpec<'_>) -> SubsetTable {
    let name = subset_name(header, &data_spec.root_descriptors);
    SubsetTable::from_resolved(name, &data_spec.root_descriptors)
}

fn subset_name(header: &HeaderSections, descriptors: &[ResolvedDescriptor<'_>]) -> String {
    if let [ResolvedDescriptor::Sequence(entry, _)] = descriptors {
        return entry.mnemonic.to_string();
    }
    let id = &header.identification_section;
    format!("CAT{}-{}", id.data_category, id.international_data_sub_category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_the_same_path_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("msg.bufr");
        std::fs::write(&path, b"not a real bufr file").unwrap();

        let mut a = BufrFileProvider::new();
        a.open(&path).unwrap();

        let mut b = BufrFileProvider::new();
        assert!(matches!(b.open(&path), Err(Error::FileUnitBusy)));

        a.close().unwrap();
        b.open(&path).unwrap();
    }

    #[test]
    fn run_parameters_builder() {
        let params = RunParameters::new().with_offset(2).with_num_messages(5);
        assert_eq!(params.offset, 2);
        assert_eq!(params.num_messages, Some(5));
    }
}
