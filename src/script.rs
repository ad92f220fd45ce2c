//! Script execution engine
//!
//! A stack machine over a byte-string program. Conditional execution is
//! tracked by a stack of flags; an opcode runs only when every enclosing
//! branch is taken. Signature opcodes are bound to one (transaction, input)
//! pair and compute their digest through the sighash module.

use crate::constants::*;
use crate::error::{EngineError, Result};
use crate::hashing::{double_sha256, hash160, ripemd160, sha1, sha256};
use crate::opcodes::*;
use crate::sighash::{legacy_sighash, p2wsh_script_code, segwit_v0_sighash, taproot_sighash};
use crate::signature::{der_to_compact, split_schnorr_signature, split_sighash_byte, SignatureVerifier};
use crate::taproot::split_annex;
use crate::transaction::Transaction;
use crate::types::*;

// ============================================================================
// INSTRUCTION DECODING
// ============================================================================

/// One decoded script element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// Data push (OP_PUSHBYTES_N or OP_PUSHDATA1/2/4) with its payload
    PushBytes { opcode: u8, data: &'a [u8] },
    /// Any other opcode, including OP_0 and OP_1..OP_16
    Op(u8),
}

/// Iterator over the instructions of a script; yields an error and stops
/// when a push runs past the end of the program.
pub struct Instructions<'a> {
    script: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Instructions<'a> {
    pub fn new(script: &'a [u8]) -> Self {
        Self { script, pos: 0, done: false }
    }

    fn read(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.script.len()).ok_or_else(|| {
            EngineError::Decode(format!("push of {} bytes at offset {} runs past end of script", len, self.pos))
        })?;
        let data = &self.script[self.pos..end];
        self.pos = end;
        Ok(data)
    }

    fn read_len(&mut self, width: usize) -> Result<usize> {
        let bytes = self.read(width)?;
        let mut buf = [0u8; 4];
        buf[..width].copy_from_slice(bytes);
        Ok(u32::from_le_bytes(buf) as usize)
    }

    fn next_instruction(&mut self, opcode: u8) -> Result<Instruction<'a>> {
        let len = match opcode {
            OP_PUSHBYTES_1..=OP_PUSHBYTES_75 => opcode as usize,
            OP_PUSHDATA1 => self.read_len(1)?,
            OP_PUSHDATA2 => self.read_len(2)?,
            OP_PUSHDATA4 => self.read_len(4)?,
            _ => return Ok(Instruction::Op(opcode)),
        };
        Ok(Instruction::PushBytes { opcode, data: self.read(len)? })
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.script.len() {
            return None;
        }
        let opcode = self.script[self.pos];
        self.pos += 1;
        let result = self.next_instruction(opcode);
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

/// Collect the data pushed by a push-only script (scriptSig); OP_0 yields an
/// empty item. Any non-push opcode is an error.
pub fn push_data_items(script: &[u8]) -> Result<Vec<ByteString>> {
    let mut items = Vec::new();
    for instruction in Instructions::new(script) {
        match instruction? {
            Instruction::PushBytes { data, .. } => items.push(data.to_vec()),
            Instruction::Op(OP_0) => items.push(Vec::new()),
            Instruction::Op(opcode) => {
                return Err(EngineError::ScriptExecution(format!(
                    "non-push opcode 0x{:02x} in push-only script",
                    opcode
                )))
            }
        }
    }
    Ok(items)
}

/// Disassemble a script into the `_asm` text form
/// (`OP_DUP OP_HASH160 OP_PUSHBYTES_20 <hex> OP_EQUALVERIFY OP_CHECKSIG`).
pub fn to_asm(script: &[u8]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for instruction in Instructions::new(script) {
        match instruction {
            Ok(Instruction::PushBytes { opcode, data }) => {
                let name = match opcode {
                    OP_PUSHDATA1 => "OP_PUSHDATA1".to_string(),
                    OP_PUSHDATA2 => "OP_PUSHDATA2".to_string(),
                    OP_PUSHDATA4 => "OP_PUSHDATA4".to_string(),
                    n => format!("OP_PUSHBYTES_{}", n),
                };
                parts.push(name);
                parts.push(hex::encode(data));
            }
            Ok(Instruction::Op(opcode)) => match opcode_name(opcode) {
                Some(name) => parts.push(name.to_string()),
                None => parts.push(format!("OP_UNKNOWN_{:#04x}", opcode)),
            },
            Err(_) => {
                parts.push("<push past end>".to_string());
                break;
            }
        }
    }
    parts.join(" ")
}

// ============================================================================
// NUMERIC ENCODING
// ============================================================================

/// CastToBool: any non-zero byte is true, except a lone sign bit (negative zero)
pub fn cast_to_bool(value: &[u8]) -> bool {
    for (i, byte) in value.iter().enumerate() {
        if *byte != 0 {
            return !(i == value.len() - 1 && *byte == 0x80);
        }
    }
    false
}

/// Decode a little-endian sign-magnitude script number of at most `max_len` bytes
pub fn decode_script_num(bytes: &[u8], max_len: usize) -> Result<i64> {
    if bytes.len() > max_len {
        return Err(EngineError::Decode(format!(
            "script number of {} bytes exceeds {}",
            bytes.len(),
            max_len
        )));
    }
    let Some((last, _)) = bytes.split_last() else {
        return Ok(0);
    };
    let mut value: i64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        value |= (*byte as i64) << (8 * i);
    }
    if last & 0x80 != 0 {
        let mask = !(0x80i64 << (8 * (bytes.len() - 1)));
        return Ok(-(value & mask));
    }
    Ok(value)
}

pub fn encode_script_num(value: i64) -> ByteString {
    if value == 0 {
        return Vec::new();
    }
    let negative = value < 0;
    let mut abs = value.unsigned_abs();
    let mut out = Vec::new();
    while abs > 0 {
        out.push((abs & 0xff) as u8);
        abs >>= 8;
    }
    if out.last().map_or(false, |b| b & 0x80 != 0) {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        if let Some(last) = out.last_mut() {
            *last |= 0x80;
        }
    }
    out
}

fn encode_bool(value: bool) -> ByteString {
    if value {
        vec![1]
    } else {
        Vec::new()
    }
}

// ============================================================================
// STACK
// ============================================================================

/// Execution stack plus the nesting flags of open IF/NOTIF blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptStack {
    items: Vec<ByteString>,
    exec_flags: Vec<bool>,
}

impl ScriptStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: ByteString) {
        self.items.push(item);
    }

    pub fn pop(&mut self, opcode: &'static str) -> Result<ByteString> {
        self.items.pop().ok_or(EngineError::StackUnderflow(opcode))
    }

    pub fn top(&self) -> Option<&ByteString> {
        self.items.last()
    }

    fn peek(&self, depth: usize, opcode: &'static str) -> Result<&ByteString> {
        if depth >= self.items.len() {
            return Err(EngineError::StackUnderflow(opcode));
        }
        Ok(&self.items[self.items.len() - 1 - depth])
    }

    pub fn items(&self) -> &[ByteString] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop all items and open conditionals
    pub fn clear(&mut self) {
        self.items.clear();
        self.exec_flags.clear();
    }

    /// AND of every enclosing branch flag
    pub fn should_execute(&self) -> bool {
        self.exec_flags.iter().all(|flag| *flag)
    }
}

// ============================================================================
// INTERPRETER
// ============================================================================

/// Which digest algorithm signature opcodes use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigVersion {
    /// Legacy sighash; scriptCode is the executing script
    Base,
    /// BIP143; the spent amount is committed
    WitnessV0 { amount: i64 },
    /// BIP342 tapscript leaf
    Tapscript { leaf_hash: Hash },
}

struct SigningContext<'a> {
    tx: &'a Transaction,
    input_index: usize,
    verifier: &'a dyn SignatureVerifier,
    sig_version: SigVersion,
}

/// Script interpreter, optionally bound to one input of a transaction
pub struct Interpreter<'a> {
    stack: ScriptStack,
    context: Option<SigningContext<'a>>,
}

impl Default for Interpreter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Interpreter<'a> {
    /// Interpreter with no transaction; signature and timelock opcodes fail
    pub fn new() -> Self {
        Self { stack: ScriptStack::new(), context: None }
    }

    pub fn for_input(
        tx: &'a Transaction,
        input_index: usize,
        verifier: &'a dyn SignatureVerifier,
        sig_version: SigVersion,
    ) -> Self {
        Self {
            stack: ScriptStack::new(),
            context: Some(SigningContext { tx, input_index, verifier, sig_version }),
        }
    }

    pub fn stack(&self) -> &ScriptStack {
        &self.stack
    }

    /// Push raw data (witness items are data, not script)
    pub fn push(&mut self, item: ByteString) {
        self.stack.push(item);
    }

    /// Clear the stack and switch digest algorithm between validation phases
    pub fn reset(&mut self, sig_version: SigVersion) {
        self.stack.clear();
        if let Some(context) = self.context.as_mut() {
            context.sig_version = sig_version;
        }
    }

    /// Execute: 𝒮𝒞 → 𝔹* (top of stack after the whole program, empty if the stack is empty)
    pub fn execute(&mut self, script: &[u8]) -> Result<ByteString> {
        self.stack.exec_flags.clear();
        for instruction in Instructions::new(script) {
            self.step(instruction?, script)?;
        }
        if !self.stack.exec_flags.is_empty() {
            return Err(EngineError::ScriptExecution("unbalanced conditional".to_string()));
        }
        Ok(self.stack.top().cloned().unwrap_or_default())
    }

    /// Execute and interpret the resulting top as a boolean
    pub fn execute_bool(&mut self, script: &[u8]) -> Result<bool> {
        Ok(cast_to_bool(&self.execute(script)?))
    }

    fn step(&mut self, instruction: Instruction<'_>, script: &[u8]) -> Result<()> {
        let executing = self.stack.should_execute();
        match instruction {
            Instruction::PushBytes { data, .. } => {
                if executing {
                    self.stack.push(data.to_vec());
                }
                Ok(())
            }
            Instruction::Op(opcode @ (OP_IF | OP_NOTIF | OP_ELSE | OP_ENDIF)) => self.conditional(opcode, executing),
            Instruction::Op(_) if !executing => Ok(()),
            Instruction::Op(opcode) => self.execute_opcode(opcode, script),
        }
    }

    fn conditional(&mut self, opcode: u8, executing: bool) -> Result<()> {
        match opcode {
            OP_IF | OP_NOTIF => {
                // the condition is only consumed inside a taken branch
                let mut value = false;
                if executing {
                    let name = if opcode == OP_IF { "OP_IF" } else { "OP_NOTIF" };
                    value = cast_to_bool(&self.stack.pop(name)?);
                    if opcode == OP_NOTIF {
                        value = !value;
                    }
                }
                self.stack.exec_flags.push(value);
                Ok(())
            }
            OP_ELSE => match self.stack.exec_flags.last_mut() {
                Some(flag) => {
                    *flag = !*flag;
                    Ok(())
                }
                None => Err(EngineError::ScriptExecution("OP_ELSE without OP_IF".to_string())),
            },
            _ => match self.stack.exec_flags.pop() {
                Some(_) => Ok(()),
                None => Err(EngineError::ScriptExecution("OP_ENDIF without OP_IF".to_string())),
            },
        }
    }

    fn execute_opcode(&mut self, opcode: u8, script: &[u8]) -> Result<()> {
        let stack = &mut self.stack;
        match opcode {
            OP_0 => stack.push(Vec::new()),
            OP_1NEGATE => stack.push(encode_script_num(-1)),
            OP_1..=OP_16 => stack.push(vec![opcode - OP_1 + 1]),

            OP_NOP => {}
            OP_VERIFY => {
                if !cast_to_bool(&stack.pop("OP_VERIFY")?) {
                    return Err(EngineError::VerifyFailed("OP_VERIFY"));
                }
            }
            OP_RETURN => return Err(EngineError::ScriptExecution("OP_RETURN encountered".to_string())),

            OP_IFDUP => {
                let top = stack.peek(0, "OP_IFDUP")?.clone();
                if cast_to_bool(&top) {
                    stack.push(top);
                }
            }
            OP_DROP => {
                stack.pop("OP_DROP")?;
            }
            OP_DUP => {
                let top = stack.peek(0, "OP_DUP")?.clone();
                stack.push(top);
            }
            OP_OVER => {
                let second = stack.peek(1, "OP_OVER")?.clone();
                stack.push(second);
            }
            OP_ROT => {
                // x1 x2 x3 → x2 x3 x1
                stack.peek(2, "OP_ROT")?;
                let x1 = stack.items.remove(stack.items.len() - 3);
                stack.push(x1);
            }
            OP_SWAP => {
                stack.peek(1, "OP_SWAP")?;
                let len = stack.items.len();
                stack.items.swap(len - 1, len - 2);
            }
            OP_SIZE => {
                let size = stack.peek(0, "OP_SIZE")?.len();
                stack.push(encode_script_num(size as i64));
            }

            OP_EQUAL | OP_EQUALVERIFY => {
                let name = if opcode == OP_EQUAL { "OP_EQUAL" } else { "OP_EQUALVERIFY" };
                let b = stack.pop(name)?;
                let a = stack.pop(name)?;
                if opcode == OP_EQUALVERIFY {
                    if a != b {
                        return Err(EngineError::VerifyFailed("OP_EQUALVERIFY"));
                    }
                } else {
                    stack.push(encode_bool(a == b));
                }
            }
            OP_1ADD => {
                let n = decode_script_num(&stack.pop("OP_1ADD")?, 4)?;
                stack.push(encode_script_num(n + 1));
            }
            OP_GREATERTHAN => {
                let b = decode_script_num(&stack.pop("OP_GREATERTHAN")?, 4)?;
                let a = decode_script_num(&stack.pop("OP_GREATERTHAN")?, 4)?;
                stack.push(encode_bool(a > b));
            }

            OP_RIPEMD160 => {
                let item = stack.pop("OP_RIPEMD160")?;
                stack.push(ripemd160(&item).to_vec());
            }
            OP_SHA1 => {
                let item = stack.pop("OP_SHA1")?;
                stack.push(sha1(&item).to_vec());
            }
            OP_SHA256 => {
                let item = stack.pop("OP_SHA256")?;
                stack.push(sha256(&item).to_vec());
            }
            OP_HASH160 => {
                let item = stack.pop("OP_HASH160")?;
                stack.push(hash160(&item).to_vec());
            }
            OP_HASH256 => {
                let item = stack.pop("OP_HASH256")?;
                stack.push(double_sha256(&item).to_vec());
            }

            OP_CHECKSIG | OP_CHECKSIGVERIFY => {
                let name = if opcode == OP_CHECKSIG { "OP_CHECKSIG" } else { "OP_CHECKSIGVERIFY" };
                let pubkey = self.stack.pop(name)?;
                let signature = self.stack.pop(name)?;
                let valid = self.check_signature(&signature, &pubkey, script)?;
                if opcode == OP_CHECKSIGVERIFY {
                    if !valid {
                        return Err(EngineError::VerifyFailed("OP_CHECKSIGVERIFY"));
                    }
                } else {
                    self.stack.push(encode_bool(valid));
                }
            }
            OP_CHECKMULTISIG => self.check_multisig(script)?,

            OP_CHECKLOCKTIMEVERIFY => {
                let (tx, _) = self.bound_input("OP_CHECKLOCKTIMEVERIFY")?;
                let required = decode_script_num(self.stack.peek(0, "OP_CHECKLOCKTIMEVERIFY")?, 5)?;
                if required < 0 || required > tx.locktime() as i64 {
                    return Err(EngineError::VerifyFailed("OP_CHECKLOCKTIMEVERIFY"));
                }
            }
            OP_CHECKSEQUENCEVERIFY => {
                let (tx, index) = self.bound_input("OP_CHECKSEQUENCEVERIFY")?;
                let sequence = tx.input(index)?.sequence;
                let required = decode_script_num(self.stack.peek(0, "OP_CHECKSEQUENCEVERIFY")?, 5)?;
                if required < 0 || required > sequence as i64 {
                    return Err(EngineError::VerifyFailed("OP_CHECKSEQUENCEVERIFY"));
                }
            }

            _ => return Err(EngineError::NotImplemented(opcode)),
        }
        Ok(())
    }

    fn bound_input(&self, opcode: &str) -> Result<(&'a Transaction, usize)> {
        self.context
            .as_ref()
            .map(|c| (c.tx, c.input_index))
            .ok_or_else(|| EngineError::ScriptExecution(format!("{} requires a transaction context", opcode)))
    }

    /// OP_CHECKMULTISIG: N pubkeys, M signatures, signatures in pubkey order,
    /// plus the extra dummy element consumed last.
    fn check_multisig(&mut self, script: &[u8]) -> Result<()> {
        if let Some(SigningContext { sig_version: SigVersion::Tapscript { .. }, .. }) = self.context {
            return Err(EngineError::ScriptExecution("OP_CHECKMULTISIG is disabled in tapscript".to_string()));
        }

        let n = decode_script_num(&self.stack.pop("OP_CHECKMULTISIG")?, 4)?;
        if n < 0 || n > MAX_PUBKEYS_PER_MULTISIG as i64 {
            return Err(EngineError::InvalidMultisig(format!("pubkey count {} out of range", n)));
        }
        let mut pubkeys = Vec::with_capacity(n as usize);
        for _ in 0..n {
            pubkeys.push(self.stack.pop("OP_CHECKMULTISIG")?);
        }
        pubkeys.reverse();

        let m = decode_script_num(&self.stack.pop("OP_CHECKMULTISIG")?, 4)?;
        if m < 0 || m > n {
            return Err(EngineError::InvalidMultisig(format!("{} signatures required of {} keys", m, n)));
        }
        let mut signatures = Vec::with_capacity(m as usize);
        for _ in 0..m {
            signatures.push(self.stack.pop("OP_CHECKMULTISIG")?);
        }
        signatures.reverse();

        self.stack.pop("OP_CHECKMULTISIG dummy")?;

        let mut valid = 0usize;
        let mut key_index = 0usize;
        while valid < signatures.len() && key_index < pubkeys.len() {
            if self.check_signature(&signatures[valid], &pubkeys[key_index], script)? {
                valid += 1;
            }
            key_index += 1;
        }

        self.stack.push(encode_bool(valid >= signatures.len()));
        Ok(())
    }

    fn check_signature(&self, signature: &[u8], pubkey: &[u8], script: &[u8]) -> Result<bool> {
        let context = self
            .context
            .as_ref()
            .ok_or_else(|| EngineError::ScriptExecution("signature check requires a transaction context".to_string()))?;
        if signature.is_empty() {
            return Ok(false);
        }

        match context.sig_version {
            SigVersion::Base | SigVersion::WitnessV0 { .. } => {
                let (der, sighash_type) = split_sighash_byte(signature)?;
                let compact = der_to_compact(der)?;
                let digest = match context.sig_version {
                    SigVersion::WitnessV0 { amount } => segwit_v0_sighash(
                        context.tx,
                        context.input_index,
                        &p2wsh_script_code(script),
                        amount,
                        sighash_type,
                    )?,
                    _ => legacy_sighash(context.tx, context.input_index, script, sighash_type)?,
                };
                Ok(context.verifier.verify_ecdsa(pubkey, &digest, &compact))
            }
            SigVersion::Tapscript { leaf_hash } => {
                let xonly: [u8; 32] = pubkey.try_into().map_err(|_| {
                    EngineError::InvalidSignature(format!("tapscript pubkey of {} bytes", pubkey.len()))
                })?;
                let (sig, sighash_type) = split_schnorr_signature(signature)?;
                let input = context.tx.input(context.input_index)?;
                let (_, annex) = split_annex(&input.witness);
                let digest = taproot_sighash(context.tx, context.input_index, sighash_type, annex, Some(&leaf_hash))?;
                Ok(context.verifier.verify_schnorr(&xonly, &digest, &sig))
            }
        }
    }
}
