/// Address family mode for [Addr](crate::field_type::FieldType::Addr) fields.
///
/// The mode is global to a sort invocation and decides how many record bytes
/// an address field occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressFamily {
    /// 4 byte IPv4 addresses
    V4,
    /// 16 byte addresses. In dual-stack data IPv4 addresses are stored
    /// zero extended at the high end, so a plain big-endian comparison
    /// orders both families consistently.
    Dual,
}

impl AddressFamily {
    pub(crate) fn width(&self) -> usize {
        match self {
            AddressFamily::V4 => 4,
            AddressFamily::Dual => 16,
        }
    }
}
