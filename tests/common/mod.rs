use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use data_encoding::HEXLOWER;

use flow_record_sort::record_stream::{RawRecordReader, RawRecordWriter, RecordSink, RecordSource};

/// Width of the u64 test records most scenarios use.
pub const RECORD_SIZE: usize = 8;

pub fn setup() {
    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();

    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path).unwrap_or_else(|_| {
            panic!("Failed to create results directory: {:?}", results_dir_path)
        });
    }
}

pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result
}

/// A fresh empty directory for one test's spill files, so spill cleanup can
/// be asserted by counting entries.
#[allow(dead_code)]
pub fn temp_dir(dir: &str) -> PathBuf {
    let path = temp_file_name(dir);
    fs::create_dir_all(&path)
        .unwrap_or_else(|_| panic!("Failed to create temp directory: {:?}", path));
    path
}

#[allow(dead_code)]
pub fn dir_entries(path: &PathBuf) -> usize {
    fs::read_dir(path).unwrap().count()
}

#[allow(dead_code)]
pub fn write_keys(path: &PathBuf, keys: &[u64]) -> Result<(), anyhow::Error> {
    let mut writer = RawRecordWriter::create(path, RECORD_SIZE)?;
    for key in keys {
        writer.write_record(&key.to_be_bytes())?;
    }
    writer.finish()
}

#[allow(dead_code)]
pub fn read_keys(path: &PathBuf) -> Result<Vec<u64>, anyhow::Error> {
    let mut reader = RawRecordReader::open(path, RECORD_SIZE)?;
    let mut keys = Vec::new();
    let mut record = [0u8; RECORD_SIZE];
    while reader.read_record(&mut record)? {
        keys.push(u64::from_be_bytes(record));
    }
    Ok(keys)
}

#[allow(dead_code)]
pub fn write_raw_records(
    path: &PathBuf,
    record_size: usize,
    records: &[Vec<u8>],
) -> Result<(), anyhow::Error> {
    let mut writer = RawRecordWriter::create(path, record_size)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.finish()
}

#[allow(dead_code)]
pub fn read_raw_records(
    path: &PathBuf,
    record_size: usize,
) -> Result<Vec<Vec<u8>>, anyhow::Error> {
    let mut reader = RawRecordReader::open(path, record_size)?;
    let mut records = Vec::new();
    let mut record = vec![0u8; record_size];
    while reader.read_record(&mut record)? {
        records.push(record.clone());
    }
    Ok(records)
}
