use std::cmp::Ordering;

use anyhow::{anyhow, bail};

use crate::comparator::NodeComparator;

/// Divisor for the first buffer chunk; raised when the allocator refuses.
pub(crate) const SORT_NUM_CHUNKS: usize = 6;
/// Smallest chunk worth retrying for. Failing to allocate less than this is
/// fatal.
pub(crate) const MIN_IN_CORE_RECORDS: usize = 4096;

/// The single in-core buffer of the random path: a contiguous slab of
/// `capacity_records` nodes, grown one chunk at a time toward `max_records`.
///
/// Growing in chunks converts latent overcommit failures into a clean
/// fall-back: when the allocator refuses a grow step the buffer freezes at
/// its current size and the sorter spills from then on.
pub(crate) struct SortBuffer {
    data: Vec<u8>,
    node_size: usize,
    count: usize,
    capacity_records: usize,
    chunk_records: usize,
    max_records: usize,
    frozen: bool,
}

impl SortBuffer {
    pub(crate) fn allocate(
        node_size: usize,
        sort_buffer_size: usize,
    ) -> Result<SortBuffer, anyhow::Error> {
        let max_records = (sort_buffer_size / node_size).min(u32::MAX as usize);
        if max_records == 0 {
            bail!(
                "sort buffer of {} bytes cannot hold a single {} byte node",
                sort_buffer_size,
                node_size
            );
        }

        let mut num_chunks = SORT_NUM_CHUNKS;
        loop {
            let chunk = (max_records / num_chunks).max(1);
            let mut data: Vec<u8> = Vec::new();
            match data.try_reserve_exact(chunk * node_size) {
                Ok(()) => {
                    data.resize(chunk * node_size, 0);
                    log::trace!(
                        "sort buffer starts at {} of at most {} records",
                        chunk,
                        max_records
                    );
                    return Ok(SortBuffer {
                        data,
                        node_size,
                        count: 0,
                        capacity_records: chunk,
                        chunk_records: chunk,
                        max_records,
                        frozen: false,
                    });
                }
                Err(_) if chunk >= MIN_IN_CORE_RECORDS => {
                    num_chunks += 1;
                }
                Err(e) => {
                    return Err(anyhow!(
                        "failed to allocate the initial sort buffer chunk of {} records: {}",
                        chunk,
                        e
                    ));
                }
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.count
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Ensure a free node slot exists, growing by one chunk when the buffer
    /// is full. Returns false when the buffer is at its limit, either
    /// `max_records` or a frozen size after a refused grow, and the caller
    /// must spill.
    pub(crate) fn make_room(&mut self) -> bool {
        if self.count < self.capacity_records {
            return true;
        }
        if self.frozen || self.capacity_records == self.max_records {
            return false;
        }
        let target = (self.capacity_records + self.chunk_records).min(self.max_records);
        let additional = (target - self.capacity_records) * self.node_size;
        match self.data.try_reserve_exact(additional) {
            Ok(()) => {
                self.data.resize(target * self.node_size, 0);
                self.capacity_records = target;
                true
            }
            Err(_) => {
                log::debug!(
                    "sort buffer growth refused at {} records, freezing",
                    self.capacity_records
                );
                self.frozen = true;
                false
            }
        }
    }

    /// The next free node slot. Call [make_room](Self::make_room) first and
    /// [commit](Self::commit) once the slot holds a record.
    pub(crate) fn free_slot(&mut self) -> &mut [u8] {
        let start = self.count * self.node_size;
        &mut self.data[start..start + self.node_size]
    }

    pub(crate) fn commit(&mut self) {
        self.count += 1;
    }

    pub(crate) fn reset(&mut self) {
        self.count = 0;
    }

    pub(crate) fn node(&self, index: usize) -> &[u8] {
        let start = index * self.node_size;
        &self.data[start..start + self.node_size]
    }

    /// Sort the valid range in place and return the node permutation. The
    /// slabs never move; an index permutation is cheaper than swapping
    /// fixed-width nodes around.
    pub(crate) fn sorted_indices(
        &self,
        comparator: &NodeComparator,
    ) -> Result<Vec<u32>, anyhow::Error> {
        let mut indices: Vec<u32> = (0..self.count as u32).collect();
        let mut compare_error = None;
        indices.sort_unstable_by(|&a, &b| {
            if compare_error.is_some() {
                return Ordering::Equal;
            }
            match comparator.compare(self.node(a as usize), self.node(b as usize)) {
                Ok(ordering) => ordering,
                Err(e) => {
                    compare_error = Some(e);
                    Ordering::Equal
                }
            }
        });
        match compare_error {
            Some(e) => Err(e),
            None => Ok(indices),
        }
    }

    #[cfg(test)]
    pub(crate) fn capacity_records(&self) -> usize {
        self.capacity_records
    }
}

#[cfg(test)]
mod tests {
    use crate::address_family::AddressFamily;
    use crate::comparator::NodeComparator;
    use crate::field::Field;
    use crate::field_type::FieldType;
    use crate::node::NodeLayout;
    use crate::order::Order;

    use super::SortBuffer;

    #[test]
    fn test_grows_in_chunks_up_to_max() -> Result<(), anyhow::Error> {
        // 4 records of 8 bytes; the initial chunk is a single record
        let mut buffer = SortBuffer::allocate(8, 32)?;
        assert_eq!(buffer.capacity_records(), 1);
        for i in 0..4u8 {
            assert!(buffer.make_room());
            buffer.free_slot()[0] = i;
            buffer.commit();
        }
        assert_eq!(buffer.capacity_records(), 4);
        assert!(!buffer.make_room());
        assert_eq!(buffer.len(), 4);
        buffer.reset();
        assert!(buffer.is_empty());
        assert!(buffer.make_room());
        Ok(())
    }

    #[test]
    fn test_rejects_buffer_below_one_node() {
        assert!(SortBuffer::allocate(64, 32).is_err());
    }

    #[test]
    fn test_sorted_indices_orders_nodes() -> Result<(), anyhow::Error> {
        let fields = vec![Field::new(0, 8, FieldType::Uint)];
        let layout = NodeLayout::compute(8, &fields, AddressFamily::V4)?;
        let comparator = NodeComparator::compile(&fields, AddressFamily::V4, &layout, Order::Asc);

        let mut buffer = SortBuffer::allocate(8, 1024)?;
        for key in [5u64, 1, 9, 3] {
            assert!(buffer.make_room());
            buffer.free_slot().copy_from_slice(&key.to_be_bytes());
            buffer.commit();
        }
        let order = buffer.sorted_indices(&comparator)?;
        let keys: Vec<u64> = order
            .iter()
            .map(|&i| u64::from_be_bytes(buffer.node(i as usize).try_into().unwrap()))
            .collect();
        assert_eq!(keys, vec![1, 3, 5, 9]);
        Ok(())
    }
}
