use anyhow::{anyhow, bail};

use crate::address_family::AddressFamily;
use crate::field::Field;
use crate::field_type::FieldType;

/// Layout of the fixed-width node slab used throughout a sort invocation:
/// the raw record followed by the key-suffix region holding materialized
/// keys. All nodes of an invocation share this layout.
#[derive(Clone, Copy, Debug)]
pub(crate) struct NodeLayout {
    record_size: usize,
    node_size: usize,
}

impl NodeLayout {
    /// Compute the layout from the configured fields and validate every
    /// field extent against it.
    pub(crate) fn compute(
        record_size: usize,
        fields: &[Field],
        family: AddressFamily,
    ) -> Result<NodeLayout, anyhow::Error> {
        if record_size == 0 {
            bail!("record size must be set and greater than zero");
        }

        let mut suffix_extents: Vec<(usize, usize)> = Vec::new();
        for field in fields {
            match field.field_type() {
                FieldType::Bytes => {
                    if field.width() == 0 {
                        bail!("{}: zero width", field.describe());
                    }
                    Self::check_record_extent(record_size, field, field.width())?;
                }
                FieldType::Uint | FieldType::Conditional(_) => {
                    if field.width() == 0 || field.width() > 8 {
                        bail!(
                            "{}: integer width must be 1 to 8 bytes, got {}",
                            field.describe(),
                            field.width()
                        );
                    }
                    Self::check_record_extent(record_size, field, field.width())?;
                }
                FieldType::Addr => {
                    Self::check_record_extent(record_size, field, family.width())?;
                }
                FieldType::KeySuffix(_, _) => {
                    if field.width() == 0 {
                        bail!("{}: zero width", field.describe());
                    }
                    suffix_extents.push((field.offset(), field.width()));
                }
            }
        }

        suffix_extents.sort();
        let mut suffix_len = 0;
        for (offset, width) in suffix_extents {
            if offset < suffix_len {
                bail!("overlapping key-suffix fields at suffix offset {}", offset);
            }
            suffix_len = offset + width;
        }

        Ok(NodeLayout {
            record_size,
            node_size: record_size + suffix_len,
        })
    }

    fn check_record_extent(
        record_size: usize,
        field: &Field,
        width: usize,
    ) -> Result<(), anyhow::Error> {
        if field.offset() + width > record_size {
            Err(anyhow!(
                "{}: extent {}..{} exceeds record size {}",
                field.describe(),
                field.offset(),
                field.offset() + width,
                record_size
            ))
        } else {
            Ok(())
        }
    }

    pub(crate) fn record_size(&self) -> usize {
        self.record_size
    }

    pub(crate) fn node_size(&self) -> usize {
        self.node_size
    }

    /// The record portion of a node.
    pub(crate) fn record_of<'a>(&self, node: &'a [u8]) -> &'a [u8] {
        &node[..self.record_size]
    }
}

/// One-node-at-a-time producer feeding a merge slot. Implemented by spill
/// file readers and, on the presorted path, by the input adapter.
pub(crate) trait NodeSource {
    /// Read the next node into `node`. Returns false on clean end of the
    /// source; any short read is an error.
    fn next_node(&mut self, node: &mut [u8]) -> Result<bool, anyhow::Error>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::address_family::AddressFamily;
    use crate::field::Field;
    use crate::field_type::{FieldType, KeyCompareFn, KeyExtractFn};
    use crate::node::NodeLayout;

    #[test]
    fn test_plain_record_layout() -> Result<(), anyhow::Error> {
        let fields = vec![Field::new(0, 8, FieldType::Uint)];
        let layout = NodeLayout::compute(16, &fields, AddressFamily::V4)?;
        assert_eq!(layout.record_size(), 16);
        assert_eq!(layout.node_size(), 16);
        Ok(())
    }

    #[test]
    fn test_key_suffix_extends_node() -> Result<(), anyhow::Error> {
        let extract: KeyExtractFn = Arc::new(|_, _| Ok(()));
        let compare: KeyCompareFn = Arc::new(|a, b| Ok(a.cmp(b)));
        let fields = vec![
            Field::new(0, 4, FieldType::Addr),
            Field::new(0, 6, FieldType::KeySuffix(extract.clone(), compare.clone())),
            Field::new(6, 2, FieldType::KeySuffix(extract, compare)),
        ];
        let layout = NodeLayout::compute(16, &fields, AddressFamily::V4)?;
        assert_eq!(layout.node_size(), 24);
        Ok(())
    }

    #[test]
    fn test_rejects_bad_extents() {
        let fields = vec![Field::new(14, 4, FieldType::Uint)];
        assert!(NodeLayout::compute(16, &fields, AddressFamily::V4).is_err());

        let fields = vec![Field::new(4, 0, FieldType::Uint)];
        assert!(NodeLayout::compute(16, &fields, AddressFamily::V4).is_err());

        // a 16 byte address does not fit a 12 byte record
        let fields = vec![Field::new(0, 0, FieldType::Addr)];
        assert!(NodeLayout::compute(12, &fields, AddressFamily::Dual).is_err());
    }

    #[test]
    fn test_rejects_overlapping_suffix_fields() {
        let extract: KeyExtractFn = Arc::new(|_, _| Ok(()));
        let compare: KeyCompareFn = Arc::new(|a, b| Ok(a.cmp(b)));
        let fields = vec![
            Field::new(0, 4, FieldType::KeySuffix(extract.clone(), compare.clone())),
            Field::new(2, 4, FieldType::KeySuffix(extract, compare)),
        ];
        assert!(NodeLayout::compute(8, &fields, AddressFamily::V4).is_err());
    }
}
