use std::path::PathBuf;

use crate::config::Config;
use crate::field_type::{FieldType, KeyExtractFn};
use crate::node::NodeSource;
use crate::record_stream::{RawRecordReader, RecordSource};
use crate::run_store::is_handle_exhausted;

/// Outcome of asking for the next input stream.
pub(crate) enum NextInput {
    Stream(Box<dyn RecordSource>),
    /// Out of descriptors. The presorted path reacts by cascading the
    /// streams it already holds into an intermediate run.
    Exhausted,
    Done,
}

/// Hands out the configured input streams one at a time, in order.
pub(crate) struct InputQueue {
    paths: Vec<PathBuf>,
    next: usize,
    record_size: usize,
}

impl InputQueue {
    pub(crate) fn new(paths: &[PathBuf], record_size: usize) -> InputQueue {
        InputQueue {
            paths: paths.to_vec(),
            next: 0,
            record_size,
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.paths.len() - self.next
    }

    pub(crate) fn next_input(&mut self) -> Result<NextInput, anyhow::Error> {
        if self.next == self.paths.len() {
            return Ok(NextInput::Done);
        }
        match RawRecordReader::open(&self.paths[self.next], self.record_size) {
            Ok(reader) => {
                log::trace!("opened input {}", self.paths[self.next].display());
                self.next += 1;
                Ok(NextInput::Stream(Box::new(reader)))
            }
            Err(e) if is_handle_exhausted(&e) => Ok(NextInput::Exhausted),
            Err(e) => Err(e),
        }
    }
}

/// Materializes one record plus its key suffix into a node slab.
#[derive(Clone)]
pub(crate) struct NodeFiller {
    record_size: usize,
    // suffix-relative offset, width, extractor
    extractors: Vec<(usize, usize, KeyExtractFn)>,
}

impl NodeFiller {
    pub(crate) fn new(config: &Config) -> NodeFiller {
        let extractors = config
            .fields()
            .iter()
            .filter_map(|field| match field.field_type() {
                FieldType::KeySuffix(extract, _) => {
                    Some((field.offset(), field.width(), extract.clone()))
                }
                _ => None,
            })
            .collect();
        NodeFiller {
            record_size: config.record_size(),
            extractors,
        }
    }

    /// Read one record from `source` into `node` and fill every key-suffix
    /// field. Returns false on clean end of stream.
    pub(crate) fn fill(
        &self,
        source: &mut dyn RecordSource,
        node: &mut [u8],
    ) -> Result<bool, anyhow::Error> {
        let (record, suffix) = node.split_at_mut(self.record_size);
        if !source.read_record(record)? {
            return Ok(false);
        }
        for (offset, width, extract) in &self.extractors {
            extract(record, &mut suffix[*offset..offset + width])?;
        }
        Ok(true)
    }
}

/// Adapter that lets an input stream occupy a merge slot directly on the
/// presorted path.
pub(crate) struct InputNodeSource {
    source: Box<dyn RecordSource>,
    filler: NodeFiller,
}

impl InputNodeSource {
    pub(crate) fn new(source: Box<dyn RecordSource>, filler: NodeFiller) -> InputNodeSource {
        InputNodeSource { source, filler }
    }
}

impl NodeSource for InputNodeSource {
    fn next_node(&mut self, node: &mut [u8]) -> Result<bool, anyhow::Error> {
        self.filler.fill(self.source.as_mut(), node)
    }
}
