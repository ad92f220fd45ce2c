//! Bitcoin Script opcode constants
//!
//! Only the opcodes the interpreter executes or the disassembler names are
//! listed here.

// ============================================================================
// PUSH DATA OPCODES (0x00 - 0x4e)
// ============================================================================

/// OP_0 / OP_FALSE - Push empty array
pub const OP_0: u8 = 0x00;

pub const OP_PUSHBYTES_1: u8 = 0x01;
pub const OP_PUSHBYTES_20: u8 = 0x14;
pub const OP_PUSHBYTES_32: u8 = 0x20;
pub const OP_PUSHBYTES_75: u8 = 0x4b;

/// OP_PUSHDATA1 - Next byte is the data length
pub const OP_PUSHDATA1: u8 = 0x4c;

/// OP_PUSHDATA2 - Next 2 bytes (little-endian) are the data length
pub const OP_PUSHDATA2: u8 = 0x4d;

/// OP_PUSHDATA4 - Next 4 bytes (little-endian) are the data length
pub const OP_PUSHDATA4: u8 = 0x4e;

// ============================================================================
// PUSH VALUE OPCODES (0x4f - 0x60)
// ============================================================================

pub const OP_1NEGATE: u8 = 0x4f;

/// OP_1 / OP_TRUE
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;

// ============================================================================
// FLOW CONTROL
// ============================================================================

pub const OP_NOP: u8 = 0x61;
pub const OP_IF: u8 = 0x63;
pub const OP_NOTIF: u8 = 0x64;
pub const OP_ELSE: u8 = 0x67;
pub const OP_ENDIF: u8 = 0x68;
pub const OP_VERIFY: u8 = 0x69;
pub const OP_RETURN: u8 = 0x6a;

// ============================================================================
// STACK
// ============================================================================

pub const OP_IFDUP: u8 = 0x73;
pub const OP_DROP: u8 = 0x75;
pub const OP_DUP: u8 = 0x76;
pub const OP_OVER: u8 = 0x78;
pub const OP_ROT: u8 = 0x7b;
pub const OP_SWAP: u8 = 0x7c;
pub const OP_SIZE: u8 = 0x82;

// ============================================================================
// BITWISE / ARITHMETIC
// ============================================================================

pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_1ADD: u8 = 0x8b;
pub const OP_GREATERTHAN: u8 = 0xa0;

// ============================================================================
// CRYPTO
// ============================================================================

pub const OP_RIPEMD160: u8 = 0xa6;
pub const OP_SHA1: u8 = 0xa7;
pub const OP_SHA256: u8 = 0xa8;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_HASH256: u8 = 0xaa;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
pub const OP_CHECKMULTISIG: u8 = 0xae;

// ============================================================================
// LOCKTIME
// ============================================================================

pub const OP_CHECKLOCKTIMEVERIFY: u8 = 0xb1;
pub const OP_CHECKSEQUENCEVERIFY: u8 = 0xb2;

/// Name of an opcode in the record `_asm` dialect, if it has one.
///
/// Push opcodes (0x01..=0x4e) are rendered by the disassembler together with
/// their data and are not covered here.
pub fn opcode_name(opcode: u8) -> Option<&'static str> {
    let name = match opcode {
        OP_0 => "OP_0",
        OP_1NEGATE => "OP_PUSHNUM_NEG1",
        0x51..=0x60 => PUSHNUM_NAMES[(opcode - OP_1) as usize],
        OP_NOP => "OP_NOP",
        OP_IF => "OP_IF",
        OP_NOTIF => "OP_NOTIF",
        OP_ELSE => "OP_ELSE",
        OP_ENDIF => "OP_ENDIF",
        OP_VERIFY => "OP_VERIFY",
        OP_RETURN => "OP_RETURN",
        OP_IFDUP => "OP_IFDUP",
        OP_DROP => "OP_DROP",
        OP_DUP => "OP_DUP",
        OP_OVER => "OP_OVER",
        OP_ROT => "OP_ROT",
        OP_SWAP => "OP_SWAP",
        OP_SIZE => "OP_SIZE",
        OP_EQUAL => "OP_EQUAL",
        OP_EQUALVERIFY => "OP_EQUALVERIFY",
        OP_1ADD => "OP_1ADD",
        OP_GREATERTHAN => "OP_GREATERTHAN",
        OP_RIPEMD160 => "OP_RIPEMD160",
        OP_SHA1 => "OP_SHA1",
        OP_SHA256 => "OP_SHA256",
        OP_HASH160 => "OP_HASH160",
        OP_HASH256 => "OP_HASH256",
        OP_CHECKSIG => "OP_CHECKSIG",
        OP_CHECKSIGVERIFY => "OP_CHECKSIGVERIFY",
        OP_CHECKMULTISIG => "OP_CHECKMULTISIG",
        OP_CHECKLOCKTIMEVERIFY => "OP_CLTV",
        OP_CHECKSEQUENCEVERIFY => "OP_CSV",
        _ => return None,
    };
    Some(name)
}

const PUSHNUM_NAMES: [&str; 16] = [
    "OP_PUSHNUM_1", "OP_PUSHNUM_2", "OP_PUSHNUM_3", "OP_PUSHNUM_4",
    "OP_PUSHNUM_5", "OP_PUSHNUM_6", "OP_PUSHNUM_7", "OP_PUSHNUM_8",
    "OP_PUSHNUM_9", "OP_PUSHNUM_10", "OP_PUSHNUM_11", "OP_PUSHNUM_12",
    "OP_PUSHNUM_13", "OP_PUSHNUM_14", "OP_PUSHNUM_15", "OP_PUSHNUM_16",
];
