pub mod frame;
pub mod writers;

/// Magic/version sentinel opening every response header.
pub const HEADER_MAGIC: u32 = 1111;
/// Secondary sentinel following the magic.
pub const HEADER_SENTINEL: u16 = 201;
/// Marker byte standing in for a SQL NULL column value.
pub const NULL_VALUE_MARKER: u8 = 0xFF;
/// First byte of the long form of a length-prefixed block.
pub const LONG_BLOCK_MARKER: u8 = 0xFE;
/// Payloads shorter than this use the single-byte length form.
pub const SHORT_BLOCK_LIMIT: usize = 254;
/// Terminator of a query unit when more queries follow.
pub const MORE_QUERIES: u8 = 0x01;
/// Terminator of the last query unit.
pub const BATCH_END: u8 = 0x00;
