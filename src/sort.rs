use std::cmp::{max, Ordering};
use std::path::PathBuf;

use anyhow::{bail, Context};
use rlimit::{getrlimit, setrlimit, Resource};

use crate::address_family::AddressFamily;
use crate::comparator::NodeComparator;
use crate::config::Config;
use crate::field::Field;
use crate::field_type::FieldType;
use crate::input::{InputQueue, NodeFiller};
use crate::merge::MAX_FAN_IN;
use crate::node::NodeLayout;
use crate::order::Order;
use crate::presorted;
use crate::record_stream::{RawRecordReader, RawRecordWriter, RecordSink};
use crate::run_store::RunStore;
use crate::sorter;

/// Default upper bound on the in-core buffer.
const DEFAULT_SORT_BUFFER_SIZE: usize = 256 * 1024 * 1024;

/// Sort fixed-width flow record files by a multi-field key
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use flow_record_sort::field::Field;
/// use flow_record_sort::field_type::FieldType;
/// use flow_record_sort::sort::Sort;
///
/// // sort 32 byte flow records by source address then destination port
/// fn sort_flows(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
///     let mut flow_sort = Sort::new(vec![input], output);
///     flow_sort.with_record_size(32);
///     flow_sort.add_field(Field::new(0, 4, FieldType::Addr).with_str_name("sip"));
///     flow_sort.add_field(Field::new(10, 2, FieldType::Uint).with_str_name("dport"));
///
///     // set the directory for intermediate results. The default is the
///     // system temp dir - std::env::temp_dir(), however, for large inputs
///     // it is recommended to provide a dedicated directory, preferably on
///     // the same file system as the output result.
///     flow_sort.with_tmp_dir(tmp);
///
///     flow_sort.sort()
/// }
/// ```
pub struct Sort {
    input_files: Vec<PathBuf>,
    output: PathBuf,
    tmp: PathBuf,
    record_size: usize,
    fields: Vec<Field>,
    address_family: AddressFamily,
    order: Order,
    presorted: bool,
    sort_buffer_size: usize,
    open_files: usize,
}

impl Sort {
    /// Create a default Sort definition.
    ///
    /// A default Sort definition will use the system temporary directory as
    /// defined by std::env::temp_dir().
    /// * the record size must be set with [with_record_size](Self::with_record_size)
    ///   before sorting
    /// * the complete record is compared as a single opaque byte field
    /// * the address family is [AddressFamily::V4]
    /// * default [Order] is Asc
    /// * the in-core buffer is capped at 256 MB
    /// * at most 512 spill files are opened simultaneously while merging
    ///
    /// The Sort implementation will increase the file descriptor rlimit to
    /// accommodate the configured merge fan-in
    pub fn new(input_files: Vec<PathBuf>, output: PathBuf) -> Sort {
        Sort {
            input_files,
            output,
            tmp: std::env::temp_dir(),
            record_size: 0,
            fields: vec![],
            address_family: AddressFamily::V4,
            order: Order::Asc,
            presorted: false,
            sort_buffer_size: DEFAULT_SORT_BUFFER_SIZE,
            open_files: MAX_FAN_IN,
        }
    }

    /// Set directory for intermediate files. By default use std::env::temp_dir()
    /// It is recommended for large inputs to create a dedicated directory for
    /// intermediate files on the same file system as the output target
    pub fn with_tmp_dir(&mut self, tmp: PathBuf) {
        self.tmp = tmp;
    }

    /// Set the fixed record width in bytes. Required.
    pub fn with_record_size(&mut self, record_size: usize) {
        self.record_size = record_size;
    }

    /// Add field specification. The default is to treat the complete record
    /// as a single opaque byte field
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Replace all fields with the `fields` value.
    pub fn with_fields(&mut self, fields: Vec<Field>) {
        self.fields = fields;
    }

    /// Set the [AddressFamily] deciding the width of Addr fields. The
    /// default is V4
    pub fn with_address_family(&mut self, address_family: AddressFamily) {
        self.address_family = address_family;
    }

    /// Set [Order]
    pub fn with_order(&mut self, order: Order) {
        self.order = order;
    }

    /// Assert that every input is already sorted under the configured fields
    /// and order. The in-core stage is skipped and inputs are merged
    /// directly
    pub fn with_presorted(&mut self, presorted: bool) {
        self.presorted = presorted;
    }

    /// Set the upper bound in bytes for the in-core sort buffer. The default
    /// is 256 MB
    pub fn with_sort_buffer_size(&mut self, sort_buffer_size: usize) {
        self.sort_buffer_size = sort_buffer_size;
    }

    /// Set the number of spill files opened simultaneously while merging.
    /// The default is 512
    pub fn with_open_files(&mut self, open_files: usize) {
        self.open_files = open_files;
    }

    /// Sort input files into the output file
    pub fn sort(&self) -> Result<(), anyhow::Error> {
        let config = self.create_config()?;
        let (current_soft, current_hard) = Self::get_rlimits()?;
        log::info!(
            "Current rlimit NOFILE, soft: {}, hard: {}",
            current_soft,
            current_hard
        );
        let new_soft = max((config.fan_in() + 256) as u64, current_soft).min(current_hard);
        log::info!(
            "Set new rlimit NOFILE, soft: {}, hard: {}",
            new_soft,
            current_hard
        );
        Self::set_rlimits(new_soft, current_hard)?;
        let result = Self::internal_sort(&self.input_files, &config, &self.output);
        log::info!(
            "Restore rlimit NOFILE, soft: {}, hard: {}",
            current_soft,
            current_hard
        );
        Self::set_rlimits(current_soft, current_hard)?;
        result
    }

    /// Verify that every input file is already ordered under the configured
    /// fields and order
    pub fn check(&self) -> Result<bool, anyhow::Error> {
        let config = self.create_config()?;

        let mut result = true;
        for path in &self.input_files {
            result = Self::internal_check(path, &config)?;
            if !result {
                break;
            }
        }
        Ok(result)
    }

    fn get_rlimits() -> Result<(u64, u64), anyhow::Error> {
        getrlimit(Resource::NOFILE).with_context(|| "getrlimit")
    }

    fn set_rlimits(soft: u64, hard: u64) -> Result<(), anyhow::Error> {
        setrlimit(Resource::NOFILE, soft, hard)
            .with_context(|| format!("set rlimit NOFILE, soft: {}, hard: {}", soft, hard))?;
        Ok(())
    }

    fn create_config(&self) -> Result<Config, anyhow::Error> {
        if self.record_size == 0 {
            bail!("record size must be set before sorting");
        }
        if self.open_files < 2 {
            bail!("at least 2 open files are required to merge");
        }
        let metadata = self
            .tmp
            .metadata()
            .with_context(|| format!("temp dir {}", self.tmp.display()))?;
        if !metadata.is_dir() {
            bail!("temp dir {} is not a directory", self.tmp.display());
        }
        if metadata.permissions().readonly() {
            bail!("temp dir {} is not writable", self.tmp.display());
        }

        let fields = if self.fields.is_empty() {
            vec![Field::new(0, self.record_size, FieldType::Bytes).with_str_name("record")]
        } else {
            self.fields.clone()
        };
        let layout = NodeLayout::compute(self.record_size, &fields, self.address_family)?;
        let comparator = NodeComparator::compile(
            &fields,
            self.address_family,
            &layout,
            self.order.clone(),
        );

        let config = Config::new(
            self.tmp.clone(),
            "run-".to_string(),
            ".spill".to_string(),
            layout,
            fields,
            comparator,
            self.presorted,
            self.sort_buffer_size,
            self.open_files,
        );
        Ok(config)
    }

    fn internal_sort(
        input_files: &[PathBuf],
        config: &Config,
        output: &PathBuf,
    ) -> Result<(), anyhow::Error> {
        log::info!("Start flow record sort");
        // the store removes every spill file it ever created when it drops,
        // on fatal paths included
        let mut store = RunStore::new(config);
        let mut inputs = InputQueue::new(input_files, config.record_size());
        let mut sink = RawRecordWriter::create(output, config.record_size())?;

        if config.presorted() {
            presorted::merge_presorted(config, &mut inputs, &mut store, &mut sink)?;
        } else {
            sorter::sort_random(config, &mut inputs, &mut store, &mut sink)?;
        }

        sink.finish()?;
        log::info!("Finish flow record sort");
        Ok(())
    }

    pub(crate) fn internal_check(path: &PathBuf, config: &Config) -> Result<bool, anyhow::Error> {
        let mut source = RawRecordReader::open(path, config.record_size())?;
        let filler = NodeFiller::new(config);
        let mut previous = vec![0u8; config.node_size()];
        let mut current = vec![0u8; config.node_size()];
        let mut have_previous = false;
        while filler.fill(&mut source, &mut current)? {
            if have_previous
                && config.comparator().compare(&previous, &current)? == Ordering::Greater
            {
                return Ok(false);
            }
            std::mem::swap(&mut previous, &mut current);
            have_previous = true;
        }
        Ok(true)
    }
}
