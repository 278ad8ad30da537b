use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use tempfile::Builder;

use crate::buffer::SortBuffer;
use crate::config::Config;
use crate::node::NodeSource;
use crate::record_stream::read_full;

/// Manages the numbered spill files of one sort invocation. Ids grow
/// monotonically; every file ever created is removed by the time the store
/// is dropped, whatever the exit path.
pub(crate) struct RunStore {
    tmp: PathBuf,
    tmp_prefix: String,
    tmp_suffix: String,
    node_size: usize,
    paths: Vec<Option<PathBuf>>,
}

impl RunStore {
    pub(crate) fn new(config: &Config) -> RunStore {
        RunStore {
            tmp: config.tmp().clone(),
            tmp_prefix: config.tmp_prefix().clone(),
            tmp_suffix: config.tmp_suffix().clone(),
            node_size: config.node_size(),
            paths: Vec::new(),
        }
    }

    /// Highest run id created so far.
    pub(crate) fn last_id(&self) -> Option<usize> {
        self.paths.len().checked_sub(1)
    }

    /// Create the next numbered run and return a sequential writer for it.
    pub(crate) fn create(&mut self) -> Result<(usize, RunWriter), anyhow::Error> {
        let id = self.paths.len();
        let tmp_file = Builder::new()
            .prefix(self.tmp_prefix.as_str())
            .suffix(self.tmp_suffix.as_str())
            .tempfile_in(&self.tmp)
            .with_context(|| {
                format!("failed to create run {} in {}", id, self.tmp.display())
            })?;
        let (file, path) = tmp_file
            .keep()
            .map_err(|e| anyhow!("failed to persist run {}: {}", id, e))?;
        self.paths.push(Some(path));
        log::trace!("created run {}", id);
        Ok((
            id,
            RunWriter {
                writer: BufWriter::new(file),
                id,
            },
        ))
    }

    /// Open run `id` for reading. Descriptor or memory exhaustion is left
    /// classifiable through [is_handle_exhausted]; the merger reacts to it
    /// by tightening its window.
    pub(crate) fn open(&self, id: usize) -> Result<RunReader, anyhow::Error> {
        let path = self.paths[id]
            .as_ref()
            .ok_or_else(|| anyhow!("run {} was already removed", id))?;
        let file = File::open(path).with_context(|| format!("run {}: {}", id, path.display()))?;
        let length = file
            .metadata()
            .with_context(|| format!("run {}: {}", id, path.display()))?
            .len();
        if length % self.node_size as u64 != 0 {
            bail!(
                "run {} holds a non-integral node count: {} bytes of {} byte nodes",
                id,
                length,
                self.node_size
            );
        }
        Ok(RunReader {
            reader: BufReader::new(file),
            id,
        })
    }

    /// Unlink run `id`. Idempotent; failures are only logged since removal
    /// is retried on teardown.
    pub(crate) fn remove(&mut self, id: usize) {
        if let Some(path) = self.paths[id].take() {
            log::trace!("removing run {}", id);
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("failed to remove run {} at {}: {}", id, path.display(), e);
            }
        }
    }

    /// Write the sorted contents of `buffer` as a fresh run: create, write
    /// every node in `order`, close. Returns the new run id.
    pub(crate) fn write_sorted_buffer(
        &mut self,
        buffer: &SortBuffer,
        order: &[u32],
    ) -> Result<usize, anyhow::Error> {
        let (id, mut writer) = self.create()?;
        for &index in order {
            writer.write_node(buffer.node(index as usize))?;
        }
        writer.finish()?;
        log::debug!("spilled {} records to run {}", order.len(), id);
        Ok(id)
    }
}

impl Drop for RunStore {
    fn drop(&mut self) {
        for id in 0..self.paths.len() {
            self.remove(id);
        }
    }
}

pub(crate) struct RunWriter {
    writer: BufWriter<File>,
    id: usize,
}

impl RunWriter {
    pub(crate) fn write_node(&mut self, node: &[u8]) -> Result<(), anyhow::Error> {
        self.writer
            .write_all(node)
            .with_context(|| format!("write to run {}", self.id))
    }

    pub(crate) fn finish(mut self) -> Result<(), anyhow::Error> {
        self.writer
            .flush()
            .with_context(|| format!("close of run {}", self.id))
    }
}

pub(crate) struct RunReader {
    reader: BufReader<File>,
    id: usize,
}

impl NodeSource for RunReader {
    fn next_node(&mut self, node: &mut [u8]) -> Result<bool, anyhow::Error> {
        read_full(&mut self.reader, node).with_context(|| format!("read from run {}", self.id))
    }
}

/// True when the error chain bottoms out in descriptor or memory
/// exhaustion, the two conditions the merge protocols absorb by shrinking
/// their window.
pub(crate) fn is_handle_exhausted(error: &anyhow::Error) -> bool {
    match error.root_cause().downcast_ref::<std::io::Error>() {
        Some(io_error) => matches!(
            io_error.raw_os_error(),
            Some(libc::EMFILE) | Some(libc::ENFILE) | Some(libc::ENOMEM)
        ),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::config::Config;
    use crate::node::NodeSource;

    use super::RunStore;

    fn store_in(dir: &TempDir, node_size: usize) -> RunStore {
        let config = Config::for_tests(dir.path().to_path_buf(), node_size);
        RunStore::new(&config)
    }

    #[test]
    fn test_ids_are_monotonic_and_files_roundtrip() -> Result<(), anyhow::Error> {
        let dir = TempDir::new()?;
        let mut store = store_in(&dir, 4);

        let (id, mut writer) = store.create()?;
        assert_eq!(id, 0);
        writer.write_node(&[1, 2, 3, 4])?;
        writer.finish()?;
        let (id, writer) = store.create()?;
        assert_eq!(id, 1);
        writer.finish()?;
        assert_eq!(store.last_id(), Some(1));

        let mut reader = store.open(0)?;
        let mut node = [0u8; 4];
        assert!(reader.next_node(&mut node)?);
        assert_eq!(node, [1, 2, 3, 4]);
        assert!(!reader.next_node(&mut node)?);
        Ok(())
    }

    #[test]
    fn test_remove_is_idempotent() -> Result<(), anyhow::Error> {
        let dir = TempDir::new()?;
        let mut store = store_in(&dir, 4);
        let (id, writer) = store.create()?;
        writer.finish()?;
        store.remove(id);
        store.remove(id);
        assert!(store.open(id).is_err());
        Ok(())
    }

    #[test]
    fn test_drop_removes_everything() -> Result<(), anyhow::Error> {
        let dir = TempDir::new()?;
        {
            let mut store = store_in(&dir, 4);
            for _ in 0..3 {
                let (_, writer) = store.create()?;
                writer.finish()?;
            }
            assert_eq!(std::fs::read_dir(dir.path())?.count(), 3);
        }
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_non_integral_run_is_fatal() -> Result<(), anyhow::Error> {
        let dir = TempDir::new()?;
        let mut store = store_in(&dir, 4);
        let (id, mut writer) = store.create()?;
        writer.write_node(&[0u8; 3])?;
        writer.finish()?;
        assert!(store.open(id).is_err());
        Ok(())
    }
}
