use std::path::PathBuf;

use crate::comparator::NodeComparator;
use crate::field::Field;
use crate::node::NodeLayout;

/// Immutable configuration of one sort invocation, threaded through every
/// stage instead of process-wide state. The sort order lives inside the
/// comparator.
#[derive(Clone)]
pub(crate) struct Config {
    tmp: PathBuf,
    tmp_prefix: String,
    tmp_suffix: String,
    layout: NodeLayout,
    fields: Vec<Field>,
    comparator: NodeComparator,
    presorted: bool,
    sort_buffer_size: usize,
    fan_in: usize,
}

impl Config {
    pub(crate) fn new(
        tmp: PathBuf,
        tmp_prefix: String,
        tmp_suffix: String,
        layout: NodeLayout,
        fields: Vec<Field>,
        comparator: NodeComparator,
        presorted: bool,
        sort_buffer_size: usize,
        fan_in: usize,
    ) -> Config {
        Config {
            tmp,
            tmp_prefix,
            tmp_suffix,
            layout,
            fields,
            comparator,
            presorted,
            sort_buffer_size,
            fan_in,
        }
    }

    pub(crate) fn tmp(&self) -> &PathBuf {
        &self.tmp
    }

    pub(crate) fn tmp_prefix(&self) -> &String {
        &self.tmp_prefix
    }

    pub(crate) fn tmp_suffix(&self) -> &String {
        &self.tmp_suffix
    }

    pub(crate) fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    pub(crate) fn record_size(&self) -> usize {
        self.layout.record_size()
    }

    pub(crate) fn node_size(&self) -> usize {
        self.layout.node_size()
    }

    pub(crate) fn fields(&self) -> &Vec<Field> {
        &self.fields
    }

    pub(crate) fn comparator(&self) -> &NodeComparator {
        &self.comparator
    }

    pub(crate) fn presorted(&self) -> bool {
        self.presorted
    }

    pub(crate) fn sort_buffer_size(&self) -> usize {
        self.sort_buffer_size
    }

    pub(crate) fn fan_in(&self) -> usize {
        self.fan_in
    }

    #[cfg(test)]
    pub(crate) fn for_tests(tmp: PathBuf, node_size: usize) -> Config {
        use crate::address_family::AddressFamily;
        use crate::field_type::FieldType;
        use crate::order::Order;

        let fields = vec![Field::new(0, node_size, FieldType::Bytes)];
        let layout = NodeLayout::compute(node_size, &fields, AddressFamily::V4).unwrap();
        let comparator =
            NodeComparator::compile(&fields, AddressFamily::V4, &layout, Order::Asc);
        Config::new(
            tmp,
            "run-".to_string(),
            ".spill".to_string(),
            layout,
            fields,
            comparator,
            false,
            1 << 20,
            512,
        )
    }
}
