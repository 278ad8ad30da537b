use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Predicate over the raw record bytes. Gates a
/// [Conditional](FieldType::Conditional) field.
pub type RecordPredicate = Arc<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// Materializes key bytes from the raw record into a slice of the node's
/// key suffix. Called once per record on ingest.
pub type KeyExtractFn = Arc<dyn Fn(&[u8], &mut [u8]) -> Result<(), anyhow::Error> + Send + Sync>;

/// Compares two materialized key-suffix slices. A failure aborts the sort.
pub type KeyCompareFn =
    Arc<dyn Fn(&[u8], &[u8]) -> Result<Ordering, anyhow::Error> + Send + Sync>;

/// Field type
#[derive(Clone)]
pub enum FieldType {
    /// Raw record bytes compared lexicographically
    Bytes,
    /// Big-endian unsigned integer, 1 to 8 bytes wide
    Uint,
    /// Network address. The width is taken from the configured
    /// [AddressFamily](crate::address_family::AddressFamily), not from the
    /// field.
    Addr,
    /// Big-endian unsigned integer that compares as zero unless the record
    /// satisfies the predicate, keeping the comparator total. The classic
    /// case is the ICMP type/code pair, which is meaningful only when the
    /// record's transport protocol is ICMP.
    Conditional(RecordPredicate),
    /// Key bytes computed from the record into the node's key suffix on
    /// ingest and compared with an opaque callback. The field offset and
    /// width address the suffix region, not the record.
    KeySuffix(KeyExtractFn, KeyCompareFn),
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Bytes => write!(f, "Bytes"),
            FieldType::Uint => write!(f, "Uint"),
            FieldType::Addr => write!(f, "Addr"),
            FieldType::Conditional(_) => write!(f, "Conditional"),
            FieldType::KeySuffix(_, _) => write!(f, "KeySuffix"),
        }
    }
}
