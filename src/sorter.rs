use anyhow::bail;

use crate::buffer::SortBuffer;
use crate::config::Config;
use crate::input::{InputQueue, NextInput, NodeFiller};
use crate::merge::merge_runs;
use crate::record_stream::RecordSink;
use crate::run_store::RunStore;

/// The random path: collect records into the in-core buffer, spill sorted
/// runs when it is full, and either emit straight from memory or hand the
/// runs to the merger.
pub(crate) fn sort_random(
    config: &Config,
    inputs: &mut InputQueue,
    store: &mut RunStore,
    sink: &mut dyn RecordSink,
) -> Result<(), anyhow::Error> {
    let comparator = config.comparator();
    let layout = config.layout();
    let filler = NodeFiller::new(config);
    let mut buffer = SortBuffer::allocate(config.node_size(), config.sort_buffer_size())?;
    let mut spilled = false;

    loop {
        let mut source = match inputs.next_input()? {
            NextInput::Done => break,
            NextInput::Exhausted => {
                // only one input is ever open on this path
                bail!("descriptor limit reached while opening an input stream");
            }
            NextInput::Stream(source) => source,
        };
        loop {
            if !buffer.make_room() {
                let order = buffer.sorted_indices(comparator)?;
                store.write_sorted_buffer(&buffer, &order)?;
                spilled = true;
                buffer.reset();
            }
            if !filler.fill(source.as_mut(), buffer.free_slot())? {
                break;
            }
            buffer.commit();
        }
    }

    if !spilled {
        // everything fit in core, no merge needed
        log::debug!("sorted {} records in core", buffer.len());
        let order = buffer.sorted_indices(comparator)?;
        for &index in &order {
            sink.write_record(layout.record_of(buffer.node(index as usize)))?;
        }
        return Ok(());
    }

    if !buffer.is_empty() {
        let order = buffer.sorted_indices(comparator)?;
        store.write_sorted_buffer(&buffer, &order)?;
        buffer.reset();
    }
    merge_runs(config, store, sink)
}
