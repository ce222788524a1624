use crate::backend::{FieldMeta, RowValues};
use crate::protocol::frame::FrameWriter;
use crate::protocol::{HEADER_MAGIC, HEADER_SENTINEL, NULL_VALUE_MARKER};

/// Writes the fixed 16-byte preamble of every response. `errno` is zero on
/// success; a non-zero value is followed by a length-prefixed message block
/// written by the dispatcher.
pub fn write_connect_header(w: &mut FrameWriter, errno: u16) {
    w.put_long_be(HEADER_MAGIC);
    w.put_short_be(HEADER_SENTINEL);
    w.put_long_be(u32::from(errno));
    w.put_zeros(6);
}

/// Writes the fixed 32-byte preamble of one query unit.
pub fn write_result_set_header(
    w: &mut FrameWriter,
    errno: u16,
    affected_rows: u64,
    insert_id: u64,
    num_fields: usize,
    num_rows: usize,
) {
    w.put_long_be(u32::from(errno));
    w.put_long_be(affected_rows as u32);
    w.put_long_be(insert_id as u32);
    w.put_long_be(num_fields as u32);
    w.put_long_be(num_rows as u32);
    w.put_zeros(12);
}

/// Per field, in declaration order: name block, table block, then the type
/// code, flag bits and display length as big-endian longs.
pub fn write_fields_header(w: &mut FrameWriter, fields: &[FieldMeta]) {
    for field in fields {
        w.put_block(field.name.as_bytes());
        w.put_block(field.table.as_bytes());
        w.put_long_be(field.type_code);
        w.put_long_be(field.flags);
        w.put_long_be(field.display_len);
    }
}

/// Row data in server order. NULL is the single marker byte, everything
/// else a length-prefixed block of the raw text-protocol bytes.
pub fn write_row_data(w: &mut FrameWriter, rows: &[RowValues]) {
    for row in rows {
        for value in row {
            match value {
                Some(bytes) => w.put_block(bytes),
                None => w.put_u8(NULL_VALUE_MARKER),
            }
        }
    }
}

/// Connect-probe payload: display address, protocol version, server version,
/// each as a length-prefixed block.
pub fn write_conn_info(
    w: &mut FrameWriter,
    display_addr: &str,
    protocol_version: &str,
    server_version: &str,
) {
    w.put_block(display_addr.as_bytes());
    w.put_block(protocol_version.as_bytes());
    w.put_block(server_version.as_bytes());
}

#[cfg(test)]
mod tests {
    use crate::backend::FieldMeta;
    use crate::protocol::frame::FrameWriter;
    use crate::protocol::writers::*;

    #[test]
    fn test_connect_header_layout() {
        let mut w = FrameWriter::new();
        write_connect_header(&mut w, 1045);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 16);
        // longBE(1111) ‖ shortBE(201) ‖ longBE(1045) ‖ zeros(6)
        assert_eq!(
            bytes,
            vec![
                0x00, 0x00, 0x04, 0x57, 0x00, 0xC9, 0x00, 0x00, 0x04, 0x15, 0x00, 0x00, 0x00,
                0x00, 0x00, 0x00
            ]
        );
    }

    #[test]
    fn test_result_set_header_layout() {
        let mut w = FrameWriter::new();
        write_result_set_header(&mut w, 0, 3, 7, 2, 5);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[0..4], &0u32.to_be_bytes());
        assert_eq!(&bytes[4..8], &3u32.to_be_bytes());
        assert_eq!(&bytes[8..12], &7u32.to_be_bytes());
        assert_eq!(&bytes[12..16], &2u32.to_be_bytes());
        assert_eq!(&bytes[16..20], &5u32.to_be_bytes());
        assert_eq!(&bytes[20..32], &[0u8; 12]);
    }

    #[test]
    fn test_fields_header_order() {
        let field = FieldMeta {
            name: "a".to_string(),
            table: "t".to_string(),
            type_code: 8,
            flags: 1,
            display_len: 20,
        };
        let mut w = FrameWriter::new();
        write_fields_header(&mut w, &[field]);
        let bytes = w.into_bytes();
        let mut expected = vec![1, b'a', 1, b't'];
        expected.extend_from_slice(&8u32.to_be_bytes());
        expected.extend_from_slice(&1u32.to_be_bytes());
        expected.extend_from_slice(&20u32.to_be_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_row_data_null_marker() {
        let rows = vec![vec![None, Some(b"1".to_vec())]];
        let mut w = FrameWriter::new();
        write_row_data(&mut w, &rows);
        assert_eq!(w.into_bytes(), vec![0xFF, 1, b'1']);
    }
}
