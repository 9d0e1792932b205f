use crate::chains::{ChainSpec, Protocol};

/// EOS blocks table: bare inverted keys, block payload plus transaction ref
/// columns required for a fully-written row.
pub static CHAIN_SPEC: ChainSpec = ChainSpec {
    protocol: Protocol::Eos,
    block_key_prefix: "",
    required_block_columns: &[
        "block",
        "meta:irreversible",
        "meta:written",
        "trx:refs",
        "trx:trace-refs",
    ],
    trx_written_column: "written",
};
