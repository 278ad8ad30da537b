use anyhow::{anyhow, Context};

use crate::comparator::NodeComparator;
use crate::config::Config;
use crate::heap::SlotHeap;
use crate::node::{NodeLayout, NodeSource};
use crate::record_stream::RecordSink;
use crate::run_store::{is_handle_exhausted, RunStore, RunWriter};

/// Hard cap on sources opened simultaneously in one merge pass. Chosen well
/// below the common per-process NOFILE soft limit; the cascading pass
/// protocol keeps the total number of mergeable runs unbounded anyway.
pub(crate) const MAX_FAN_IN: usize = 512;

/// One open source of a merge pass: its read handle and a one-node buffer.
pub(crate) struct MergeSlot {
    source: Box<dyn NodeSource>,
    node: Vec<u8>,
}

impl MergeSlot {
    pub(crate) fn new(source: Box<dyn NodeSource>, node_size: usize) -> MergeSlot {
        MergeSlot {
            source,
            node: vec![0u8; node_size],
        }
    }
}

/// Where a merge pass sends its nodes: an intermediate run when sources
/// remain for a later pass, the final record stream otherwise.
pub(crate) enum PassOutput<'a> {
    Run(&'a mut RunWriter),
    Final(&'a mut dyn RecordSink, &'a NodeLayout),
}

impl PassOutput<'_> {
    fn write_node(&mut self, node: &[u8]) -> Result<(), anyhow::Error> {
        match self {
            PassOutput::Run(writer) => writer.write_node(node),
            PassOutput::Final(sink, layout) => sink.write_record(layout.record_of(node)),
        }
    }
}

/// Merge every run in the store into `sink`, opening at most
/// [fan_in](Config::fan_in) runs per pass and cascading the surplus into
/// intermediate runs.
pub(crate) fn merge_runs(
    config: &Config,
    store: &mut RunStore,
    sink: &mut dyn RecordSink,
) -> Result<(), anyhow::Error> {
    let node_size = config.node_size();
    let mut lo = 0;
    loop {
        let last = store
            .last_id()
            .ok_or_else(|| anyhow!("merge invoked without any run"))?;
        let hi_limit = last.min(lo + config.fan_in() - 1);

        // The pass output is created ahead of the source opens so its id is
        // above every pending run.
        let (mid, writer) = store.create()?;

        let mut slots: Vec<MergeSlot> = Vec::new();
        let mut hi = lo;
        for id in lo..=hi_limit {
            match store.open(id) {
                Ok(reader) => {
                    slots.push(MergeSlot::new(Box::new(reader), node_size));
                    hi = id;
                }
                Err(e) if is_handle_exhausted(&e) && !slots.is_empty() => {
                    log::debug!(
                        "descriptor limit opening run {}, window tightened to {}..{}",
                        id,
                        lo,
                        hi
                    );
                    break;
                }
                Err(e) => return Err(e).with_context(|| format!("opening run {} to merge", id)),
            }
        }

        // the window covers every pending run only when it reaches mid - 1
        if hi == mid - 1 {
            log::info!("Merging runs {}..{} into the output", lo, hi);
            drop(writer);
            let mut output = PassOutput::Final(&mut *sink, config.layout());
            merge_window(&mut slots, config.comparator(), &mut output)?;
            drop(slots);
            for id in lo..=hi {
                store.remove(id);
            }
            store.remove(mid);
            return Ok(());
        }

        log::info!("Merging runs {}..{} into run {}", lo, hi, mid);
        let mut writer = writer;
        {
            let mut output = PassOutput::Run(&mut writer);
            merge_window(&mut slots, config.comparator(), &mut output)?;
        }
        writer.finish()?;
        drop(slots);
        for id in lo..=hi {
            store.remove(id);
        }
        lo = hi + 1;
    }
}

/// Merge the open slots into `output` until every source is drained.
pub(crate) fn merge_window(
    slots: &mut [MergeSlot],
    comparator: &NodeComparator,
    output: &mut PassOutput,
) -> Result<(), anyhow::Error> {
    let mut heap = SlotHeap::with_capacity(slots.len());
    for index in 0..slots.len() {
        let filled = {
            let MergeSlot { source, node } = &mut slots[index];
            source.next_node(node)?
        };
        // an empty source is not an error, it simply never enters the heap
        if filled {
            heap.insert(index, |a, b| comparator.compare(&slots[a].node, &slots[b].node))?;
        }
    }

    while heap.len() > 1 {
        let top = match heap.peek() {
            Some(top) => top,
            None => break,
        };
        output.write_node(&slots[top].node)?;
        let refilled = {
            let MergeSlot { source, node } = &mut slots[top];
            source.next_node(node)?
        };
        if refilled {
            heap.replace_top(top, |a, b| {
                comparator.compare(&slots[a].node, &slots[b].node)
            })?;
        } else {
            heap.extract_top(|a, b| comparator.compare(&slots[a].node, &slots[b].node))?;
        }
    }

    // a single remaining source needs no more comparisons
    if let Some(index) = heap.peek() {
        let MergeSlot { source, node } = &mut slots[index];
        output.write_node(node)?;
        while source.next_node(node)? {
            output.write_node(node)?;
        }
    }
    Ok(())
}
