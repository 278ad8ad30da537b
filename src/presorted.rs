use anyhow::bail;

use crate::config::Config;
use crate::input::{InputNodeSource, InputQueue, NextInput, NodeFiller};
use crate::merge::{merge_runs, merge_window, MergeSlot, PassOutput};
use crate::record_stream::RecordSink;
use crate::run_store::RunStore;

/// Merge inputs the caller asserts are already sorted. The in-core buffer is
/// skipped entirely: input streams occupy merge slots directly. When the
/// streams outnumber the descriptor window they are cascaded into
/// intermediate runs, which the bounded-fan-in merger then finishes off.
pub(crate) fn merge_presorted(
    config: &Config,
    inputs: &mut InputQueue,
    store: &mut RunStore,
    sink: &mut dyn RecordSink,
) -> Result<(), anyhow::Error> {
    let filler = NodeFiller::new(config);
    let node_size = config.node_size();
    let mut wrote_runs = false;

    loop {
        let mut slots: Vec<MergeSlot> = Vec::new();
        while slots.len() < config.fan_in() && inputs.remaining() > 0 {
            match inputs.next_input()? {
                NextInput::Stream(source) => {
                    let source = InputNodeSource::new(source, filler.clone());
                    slots.push(MergeSlot::new(Box::new(source), node_size));
                }
                NextInput::Exhausted => {
                    if slots.is_empty() {
                        bail!("descriptor limit reached before any input stream could be opened");
                    }
                    log::debug!(
                        "descriptor limit after {} input streams, cascading early",
                        slots.len()
                    );
                    break;
                }
                NextInput::Done => break,
            }
        }
        if slots.is_empty() {
            break;
        }

        let done = inputs.remaining() == 0;
        if done && !wrote_runs {
            // every stream fits one window: straight to the output, no
            // temp file is ever created
            log::info!("Merging {} presorted inputs into the output", slots.len());
            let mut output = PassOutput::Final(&mut *sink, config.layout());
            merge_window(&mut slots, config.comparator(), &mut output)?;
            return Ok(());
        }

        let (id, mut writer) = store.create()?;
        log::debug!("Cascading {} presorted inputs into run {}", slots.len(), id);
        {
            let mut output = PassOutput::Run(&mut writer);
            merge_window(&mut slots, config.comparator(), &mut output)?;
        }
        writer.finish()?;
        wrote_runs = true;
        if done {
            break;
        }
    }

    if wrote_runs {
        merge_runs(config, store, sink)?;
    }
    Ok(())
}
