//! Consensus and policy constants used by the transaction engine

/// Maximum block weight (BIP141)
pub const MAX_BLOCK_WEIGHT: u64 = 4_000_000;

/// Weight kept free for the block header and coinbase transaction
pub const COINBASE_RESERVED_WEIGHT: u64 = 4_000;

/// Satoshis per BTC
pub const SATOSHIS_PER_BTC: i64 = 100_000_000;

/// Block subsidy paid by the coinbase: 12.5 BTC in satoshis
pub const BLOCK_SUBSIDY: i64 = 25 * SATOSHIS_PER_BTC / 2;

/// Sequence number for final inputs
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// Inputs with a sequence strictly below this signal BIP125 replaceability
pub const SEQUENCE_RBF_THRESHOLD: u32 = 0xfffffffe;

/// Previous output index used by coinbase inputs
pub const COINBASE_VOUT: u32 = 0xffffffff;

/// Coinbase witness reserved value (BIP141)
pub const WITNESS_RESERVED_VALUE: [u8; 32] = [0u8; 32];

/// Header that prefixes the witness commitment in the coinbase OP_RETURN output
pub const WITNESS_COMMITMENT_HEADER: [u8; 4] = [0xaa, 0x21, 0xa9, 0xed];

/// Marker and flag bytes inserted after the version in witness serialization
pub const SEGWIT_MARKER: u8 = 0x00;
pub const SEGWIT_FLAG: u8 = 0x01;

/// Block header version used by the miner
pub const BLOCK_VERSION: i32 = 4;

/// Compact difficulty bits written into mined headers
pub const DEFAULT_BITS: u32 = 0x1f00ffff;

/// Proof-of-work target as a big-endian 256-bit number
pub const DEFAULT_TARGET: [u8; 32] = [
    0x00, 0x00, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// secp256k1 group order n, big-endian
pub const SECP256K1_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b,
    0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// Tagged hash tags (BIP340/341)
pub const TAG_TAP_SIGHASH: &str = "TapSighash";
pub const TAG_TAP_LEAF: &str = "TapLeaf";
pub const TAG_TAP_BRANCH: &str = "TapBranch";
pub const TAG_TAP_TWEAK: &str = "TapTweak";

/// Taproot annex marker: first byte of the annex witness item
pub const TAPROOT_ANNEX_TAG: u8 = 0x50;

/// Tapscript leaf version (BIP342)
pub const TAPROOT_LEAF_TAPSCRIPT: u8 = 0xc0;

/// Control block sizes: 33 byte base plus 32 bytes per merkle path node
pub const TAPROOT_CONTROL_BASE_SIZE: usize = 33;
pub const TAPROOT_CONTROL_NODE_SIZE: usize = 32;
pub const TAPROOT_CONTROL_MAX_NODES: usize = 128;

/// Maximum public keys accepted by OP_CHECKMULTISIG
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;

/// Expected scriptPubKey lengths per output type
pub const P2PKH_SCRIPT_LEN: usize = 25;
pub const P2SH_SCRIPT_LEN: usize = 23;
pub const P2WPKH_SCRIPT_LEN: usize = 22;
pub const P2WSH_SCRIPT_LEN: usize = 34;
pub const P2TR_SCRIPT_LEN: usize = 34;

/// scriptSig lengths identifying wrapped segwit spends of a P2SH output
pub const P2SH_P2WPKH_SCRIPTSIG_LEN: usize = 23;
pub const P2SH_P2WSH_SCRIPTSIG_LEN: usize = 35;

/// Address version bytes (mainnet)
pub const P2PKH_ADDRESS_VERSION: u8 = 0x00;
pub const P2SH_ADDRESS_VERSION: u8 = 0x05;

/// Human readable part for mainnet segwit addresses
pub const SEGWIT_HRP: &str = "bc";
