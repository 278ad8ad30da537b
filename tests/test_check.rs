use std::fs;
use std::path::PathBuf;

use flow_record_sort::field::Field;
use flow_record_sort::field_type::FieldType;
use flow_record_sort::order::Order;
use flow_record_sort::sort::Sort;

mod common;

fn key_sort(inputs: Vec<PathBuf>) -> Sort {
    let mut flow_sort = Sort::new(inputs, PathBuf::new());
    flow_sort.with_record_size(common::RECORD_SIZE);
    flow_sort.add_field(Field::new(0, 8, FieldType::Uint).with_str_name("key"));
    flow_sort
}

#[test]
fn test_check_sorted() -> Result<(), anyhow::Error> {
    common::setup();
    let input = common::temp_file_name("./target/results/");
    common::write_keys(&input, &[1, 2, 2, 5, 9])?;

    let flow_sort = key_sort(vec![input.clone(), input.clone()]);
    assert_eq!(flow_sort.check()?, true);
    fs::remove_file(input)?;
    Ok(())
}

#[test]
fn test_check_sorted_desc() -> Result<(), anyhow::Error> {
    common::setup();
    let input = common::temp_file_name("./target/results/");
    common::write_keys(&input, &[9, 5, 2, 1])?;

    let mut flow_sort = key_sort(vec![input.clone()]);
    flow_sort.with_order(Order::Desc);
    assert_eq!(flow_sort.check()?, true);
    fs::remove_file(input)?;
    Ok(())
}

#[test]
fn test_check_not_sorted() -> Result<(), anyhow::Error> {
    common::setup();
    let input = common::temp_file_name("./target/results/");
    common::write_keys(&input, &[1, 3, 2])?;

    let flow_sort = key_sort(vec![input.clone()]);
    assert_eq!(flow_sort.check()?, false);
    fs::remove_file(input)?;
    Ok(())
}
