use std::path::{Path, PathBuf};

use anyhow::Error;
use simple_logger::SimpleLogger;

use flow_record_sort::field::Field;
use flow_record_sort::field_type::FieldType;
use flow_record_sort::order::Order;
use flow_record_sort::record_stream::{RawRecordWriter, RecordSink};
use flow_record_sort::sort::Sort;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

// demo flow record: sip(4) dip(4) sport(2) dport(2) proto(1) pad(3)
const RECORD_SIZE: usize = 16;

fn write_random_flows(path: &Path, count: usize) -> Result<(), Error> {
    let mut writer = RawRecordWriter::create(path, RECORD_SIZE)?;
    for _ in 0..count {
        let mut record = [0u8; RECORD_SIZE];
        let bytes: [u8; 13] = rand::random();
        record[..13].copy_from_slice(&bytes);
        writer.write_record(&record)?;
    }
    writer.finish()
}

fn sort_by_source(input: &Path, output: &Path, tmp: &Path) -> Result<(), Error> {
    let mut flow_sort = Sort::new(vec![input.to_path_buf()], output.to_path_buf());
    flow_sort.with_record_size(RECORD_SIZE);
    flow_sort.add_field(Field::new(0, 4, FieldType::Addr).with_str_name("sip"));
    flow_sort.add_field(Field::new(10, 2, FieldType::Uint).with_str_name("dport"));
    flow_sort.with_tmp_dir(tmp.to_path_buf());
    flow_sort.sort()
}

fn sort_records_descending(input: &Path, output: &Path, tmp: &Path) -> Result<(), Error> {
    // no fields configured: the whole record is the key
    let mut flow_sort = Sort::new(vec![input.to_path_buf()], output.to_path_buf());
    flow_sort.with_record_size(RECORD_SIZE);
    flow_sort.with_order(Order::Desc);
    flow_sort.with_tmp_dir(tmp.to_path_buf());
    flow_sort.sort()
}

fn merge_presorted(inputs: Vec<PathBuf>, output: &Path, tmp: &Path) -> Result<(), Error> {
    let mut flow_sort = Sort::new(inputs, output.to_path_buf());
    flow_sort.with_record_size(RECORD_SIZE);
    flow_sort.add_field(Field::new(0, 4, FieldType::Addr).with_str_name("sip"));
    flow_sort.add_field(Field::new(10, 2, FieldType::Uint).with_str_name("dport"));
    flow_sort.with_presorted(true);
    flow_sort.with_tmp_dir(tmp.to_path_buf());
    flow_sort.sort()
}

// cargo run -r --example sort_flow_file
pub fn main() -> Result<(), Error> {
    SimpleLogger::new().init()?;

    let demo_dir = PathBuf::from("./target/demo/");
    std::fs::create_dir_all(&demo_dir)?;
    let first_random = demo_dir.join("random-a.frs");
    let second_random = demo_dir.join("random-b.frs");
    let first_sorted = demo_dir.join("sorted-a.frs");
    let second_sorted = demo_dir.join("sorted-b.frs");
    let descending = demo_dir.join("descending.frs");
    let merged = demo_dir.join("merged.frs");

    write_random_flows(&first_random, 100_000)?;
    write_random_flows(&second_random, 100_000)?;

    sort_by_source(&first_random, &first_sorted, &demo_dir)?;
    sort_by_source(&second_random, &second_sorted, &demo_dir)?;
    sort_records_descending(&first_random, &descending, &demo_dir)?;
    merge_presorted(vec![first_sorted, second_sorted], &merged, &demo_dir)?;

    Ok(())
}
