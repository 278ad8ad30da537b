//! This crate implements an external merge sort for files of fixed-width
//! network flow records.
//!
//! Flow collectors routinely emit more records than fit in memory. This
//! implementation collects records into a single in-core buffer that grows
//! in chunks under allocation pressure, spills sorted runs to a working
//! directory when the buffer is exhausted, and merges an unbounded number of
//! runs through a bounded file-descriptor window. Inputs that are already
//! individually sorted can be merged directly, skipping the in-core stage
//! and, when they fit one descriptor window, touching no temporary file at
//! all.
//!
//! Records are compared under an ordered list of key fields: raw byte
//! regions, big-endian unsigned integers, network addresses in either
//! address family, predicate-gated integers (ICMP type/code and friends),
//! and opaque keys materialized per record and compared through a caller
//! supplied callback.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use flow_record_sort::field::Field;
//! use flow_record_sort::field_type::FieldType;
//! use flow_record_sort::sort::Sort;
//!
//! // optimized for use with Jemalloc
//! use tikv_jemallocator::Jemalloc;
//! #[global_allocator]
//! static GLOBAL: Jemalloc = Jemalloc;
//!
//! fn sort_flows(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
//!     let mut flow_sort = Sort::new(vec![input], output);
//!
//!     // 32 byte records, ordered by the 4 byte source address at offset 0,
//!     // ties broken by the destination port at offset 10
//!     flow_sort.with_record_size(32);
//!     flow_sort.add_field(Field::new(0, 4, FieldType::Addr));
//!     flow_sort.add_field(Field::new(10, 2, FieldType::Uint));
//!
//!     // set the directory for intermediate results. The default is the
//!     // system temp dir - std::env::temp_dir(), however, for large inputs
//!     // it is recommended to provide a dedicated directory on the same
//!     // file system as the output result.
//!     flow_sort.with_tmp_dir(tmp);
//!
//!     flow_sort.sort()
//! }
//! ```
//!

pub(crate) mod buffer;
pub(crate) mod comparator;
pub(crate) mod config;
pub(crate) mod heap;
pub(crate) mod input;
pub(crate) mod merge;
pub(crate) mod node;
pub(crate) mod presorted;
pub(crate) mod run_store;
pub(crate) mod sorter;

pub mod address_family;
pub mod field;
pub mod field_type;
pub mod order;
pub mod record_stream;
pub mod sort;
