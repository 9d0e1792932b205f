use crate::chains::{ChainSpec, Protocol};

/// ETH blocks table: rows live under the `blkn:` prefix, header and uncle
/// columns replace the EOS block payload column.
pub static CHAIN_SPEC: ChainSpec = ChainSpec {
    protocol: Protocol::Eth,
    block_key_prefix: "blkn:",
    required_block_columns: &[
        "block:header",
        "meta:irreversible",
        "meta:mapping",
        "meta:written",
        "trx:refs",
        "block:uncles",
    ],
    trx_written_column: "written",
};
