use std::cmp::Ordering;
use std::sync::Arc;

use crate::address_family::AddressFamily;
use crate::field::Field;
use crate::field_type::{FieldType, KeyCompareFn, RecordPredicate};
use crate::node::NodeLayout;
use crate::order::Order;

enum CompiledKind {
    Bytes,
    Uint,
    Conditional(RecordPredicate),
    KeySuffix(KeyCompareFn),
}

struct CompiledField {
    // byte offset into the node, suffix fields already rebased past the record
    offset: usize,
    width: usize,
    kind: CompiledKind,
}

/// Ordered multi-field comparison over two node slabs. The first field that
/// compares unequal decides; descending order flips the sign per field so
/// ties still fall through to the next field.
#[derive(Clone)]
pub(crate) struct NodeComparator {
    fields: Arc<Vec<CompiledField>>,
    record_size: usize,
    order: Order,
}

impl NodeComparator {
    pub(crate) fn compile(
        fields: &[Field],
        family: AddressFamily,
        layout: &NodeLayout,
        order: Order,
    ) -> NodeComparator {
        let compiled = fields
            .iter()
            .map(|field| match field.field_type() {
                FieldType::Bytes => CompiledField {
                    offset: field.offset(),
                    width: field.width(),
                    kind: CompiledKind::Bytes,
                },
                FieldType::Uint => CompiledField {
                    offset: field.offset(),
                    width: field.width(),
                    kind: CompiledKind::Uint,
                },
                // addresses are already big-endian with the narrower family
                // zero extended, so they compare as raw bytes
                FieldType::Addr => CompiledField {
                    offset: field.offset(),
                    width: family.width(),
                    kind: CompiledKind::Bytes,
                },
                FieldType::Conditional(predicate) => CompiledField {
                    offset: field.offset(),
                    width: field.width(),
                    kind: CompiledKind::Conditional(predicate.clone()),
                },
                FieldType::KeySuffix(_, compare) => CompiledField {
                    offset: layout.record_size() + field.offset(),
                    width: field.width(),
                    kind: CompiledKind::KeySuffix(compare.clone()),
                },
            })
            .collect();

        NodeComparator {
            fields: Arc::new(compiled),
            record_size: layout.record_size(),
            order,
        }
    }

    /// Compare two nodes. Key-suffix callbacks may fail; a failure aborts
    /// the sort.
    pub(crate) fn compare(&self, a: &[u8], b: &[u8]) -> Result<Ordering, anyhow::Error> {
        for field in self.fields.iter() {
            let ordering = self.compare_field(field, a, b)?;
            if ordering != Ordering::Equal {
                return Ok(match self.order {
                    Order::Asc => ordering,
                    Order::Desc => ordering.reverse(),
                });
            }
        }
        Ok(Ordering::Equal)
    }

    fn compare_field(
        &self,
        field: &CompiledField,
        a: &[u8],
        b: &[u8],
    ) -> Result<Ordering, anyhow::Error> {
        let a_bytes = &a[field.offset..field.offset + field.width];
        let b_bytes = &b[field.offset..field.offset + field.width];
        match &field.kind {
            CompiledKind::Bytes => Ok(a_bytes.cmp(b_bytes)),
            CompiledKind::Uint => Ok(be_uint(a_bytes).cmp(&be_uint(b_bytes))),
            CompiledKind::Conditional(predicate) => {
                let a_value = if predicate(&a[..self.record_size]) {
                    be_uint(a_bytes)
                } else {
                    0
                };
                let b_value = if predicate(&b[..self.record_size]) {
                    be_uint(b_bytes)
                } else {
                    0
                };
                Ok(a_value.cmp(&b_value))
            }
            CompiledKind::KeySuffix(compare) => compare(a_bytes, b_bytes),
        }
    }
}

fn be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}
