use std::fs;
use std::path::PathBuf;

use flow_record_sort::field::Field;
use flow_record_sort::field_type::FieldType;
use flow_record_sort::sort::Sort;

mod common;

fn key_sort(inputs: Vec<PathBuf>, output: PathBuf, tmp: PathBuf) -> Sort {
    let mut flow_sort = Sort::new(inputs, output);
    flow_sort.with_record_size(common::RECORD_SIZE);
    flow_sort.add_field(Field::new(0, 8, FieldType::Uint).with_str_name("key"));
    flow_sort.with_tmp_dir(tmp);
    flow_sort
}

#[test]
fn test_single_spill_cycle() -> Result<(), anyhow::Error> {
    common::setup();
    let tmp = common::temp_dir("./target/results/");
    let input = common::temp_file_name("./target/results/");
    common::write_keys(&input, &[9, 8, 7, 6, 5, 4, 3, 2, 1, 0])?;
    let output = common::temp_file_name("./target/results/");

    // room for exactly 4 records: two full spills plus a final run of 2
    let mut flow_sort = key_sort(vec![input.clone()], output.clone(), tmp.clone());
    flow_sort.with_sort_buffer_size(4 * common::RECORD_SIZE);
    flow_sort.sort()?;

    assert_eq!(
        common::read_keys(&output)?,
        vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9]
    );
    assert_eq!(common::dir_entries(&tmp), 0);
    fs::remove_file(input)?;
    fs::remove_file(output)?;
    Ok(())
}

#[test]
fn test_fan_in_overflow_cascades() -> Result<(), anyhow::Error> {
    common::setup();
    let tmp = common::temp_dir("./target/results/");
    let input = common::temp_file_name("./target/results/");
    let keys: Vec<u64> = (0..14).rev().collect();
    common::write_keys(&input, &keys)?;
    let output = common::temp_file_name("./target/results/");

    // 7 runs of 2 records merged through a 3 wide window: two cascading
    // passes feed intermediate runs before the final pass reaches the output
    let mut flow_sort = key_sort(vec![input.clone()], output.clone(), tmp.clone());
    flow_sort.with_sort_buffer_size(2 * common::RECORD_SIZE);
    flow_sort.with_open_files(3);
    flow_sort.sort()?;

    let expected: Vec<u64> = (0..14).collect();
    assert_eq!(common::read_keys(&output)?, expected);
    assert_eq!(common::dir_entries(&tmp), 0);
    fs::remove_file(input)?;
    fs::remove_file(output)?;
    Ok(())
}

#[test]
fn test_many_runs_from_many_inputs() -> Result<(), anyhow::Error> {
    common::setup();
    let tmp = common::temp_dir("./target/results/");
    let mut inputs = Vec::new();
    let mut all_keys = Vec::new();
    for _ in 0..5 {
        let keys: Vec<u64> = (0..2_000).map(|_| rand::random::<u64>()).collect();
        let path = common::temp_file_name("./target/results/");
        common::write_keys(&path, &keys)?;
        all_keys.extend_from_slice(&keys);
        inputs.push(path);
    }
    let output = common::temp_file_name("./target/results/");

    let mut flow_sort = key_sort(inputs.clone(), output.clone(), tmp.clone());
    flow_sort.with_sort_buffer_size(128 * common::RECORD_SIZE);
    flow_sort.with_open_files(8);
    flow_sort.sort()?;

    all_keys.sort();
    assert_eq!(common::read_keys(&output)?, all_keys);
    assert_eq!(common::dir_entries(&tmp), 0);
    for path in inputs {
        fs::remove_file(path)?;
    }
    fs::remove_file(output)?;
    Ok(())
}
