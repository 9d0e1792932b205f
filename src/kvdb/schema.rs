// Key encoding conventions for the wide-column tables.
pub mod keys {
    /// Separates a row key from a column qualifier in the physical store.
    /// Row keys are hex digits and ':' only, so '#' never collides.
    pub const CELL_SEPARATOR: char = '#';

    /// Length of a transaction id in hex characters.
    pub const TRX_ID_HEX_LEN: usize = 64;

    /// Separates the trx id from the block suffix in a trx row key.
    pub const ROW_SEPARATOR: char = ':';

    // example: "fffe7960#meta:written"
    pub fn cell_key(row_key: &str, qualifier: &str) -> String {
        format!("{}{}{}", row_key, CELL_SEPARATOR, qualifier)
    }

    pub fn split_cell_key(cell_key: &str) -> Option<(&str, &str)> {
        cell_key.split_once(CELL_SEPARATOR)
    }

    /// Block rows are keyed `u32::MAX - num` so the newest block sorts
    /// first. Scanning the table forward therefore yields descending block
    /// numbers; `decode_block_key` recovers the real number.
    pub fn encode_block_key(block_num: u32) -> String {
        format!("{:08x}", u32::MAX - block_num)
    }

    pub fn decode_block_key(row_key: &str) -> Option<u32> {
        if row_key.len() != 8 {
            return None;
        }
        let raw = u32::from_str_radix(row_key, 16).ok()?;
        Some(u32::MAX - raw)
    }

    // example: "ab…cd:0001e240" (64-hex trx id, ':', 8-hex block num)
    pub fn encode_trx_key(trx_id: &str, block_num: u32) -> String {
        format!("{}{}{:08x}", trx_id, ROW_SEPARATOR, block_num)
    }

    pub fn decode_trx_key(row_key: &str) -> Option<(&str, u32)> {
        let (trx_id, block_hex) = row_key.split_once(ROW_SEPARATOR)?;
        if trx_id.len() != TRX_ID_HEX_LEN {
            return None;
        }
        let block_num = u32::from_str_radix(block_hex, 16).ok()?;
        Some((trx_id, block_num))
    }
}
