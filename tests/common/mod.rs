//! Shared fixtures: mainnet transactions in the record format and helpers
//! for building freshly signed spends.

#![allow(dead_code)]

use btc_tx_engine::hashing::hash160;
use btc_tx_engine::record::load_records_from_str;
use btc_tx_engine::*;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Four key-path taproot inputs, SIGHASH_DEFAULT; confirmed in block 834464
pub const TAPROOT_RECORD: &str = r#"{
    "version": 1,
    "locktime": 273,
    "vin": [
        {
            "txid": "888888f6769c8b9c5a6be21a0232759104ecf4d69692bb3e20945fad4376223e",
            "vout": 1,
            "prevout": {
                "scriptpubkey": "512077387a1382d46a7cf5bb119bbc623a2586cfce066f8208cb91cf71d7bb9cfb80",
                "scriptpubkey_asm": "OP_PUSHNUM_1 OP_PUSHBYTES_32 77387a1382d46a7cf5bb119bbc623a2586cfce066f8208cb91cf71d7bb9cfb80",
                "scriptpubkey_type": "v1_p2tr",
                "scriptpubkey_address": "bc1pwuu85yuz6348eadmzxdmcc36ykrvlnsxd7pq3ju3eaca0wuulwqq3zl3au",
                "value": 1697
            },
            "scriptsig": "",
            "scriptsig_asm": "",
            "witness": ["926b7ed7fb6fb15f45b78818b8728b87d46f830b27f7d8a7e1edf5a4ff79d3a162eb3ad949292a2f4d3f3493179a51d35b7771595256276cec9860aec7b7acc6"],
            "is_coinbase": false,
            "sequence": 357913941
        },
        {
            "txid": "000051b68e30ae3c92a6bab21593329e9fdf88127c0331f792d38809c44795e9",
            "vout": 1,
            "prevout": {
                "scriptpubkey": "512077387a1382d46a7cf5bb119bbc623a2586cfce066f8208cb91cf71d7bb9cfb80",
                "scriptpubkey_asm": "OP_PUSHNUM_1 OP_PUSHBYTES_32 77387a1382d46a7cf5bb119bbc623a2586cfce066f8208cb91cf71d7bb9cfb80",
                "scriptpubkey_type": "v1_p2tr",
                "scriptpubkey_address": "bc1pwuu85yuz6348eadmzxdmcc36ykrvlnsxd7pq3ju3eaca0wuulwqq3zl3au",
                "value": 1512
            },
            "scriptsig": "",
            "scriptsig_asm": "",
            "witness": ["24056ce53b8920b5084b10966cfd38637e57cb6a9460d5d00c42a8ff344ee75b7aa3efdbb7188b2814d3576c4ab656062498a1f4bc13e05fa027ccb39c71bba9"],
            "is_coinbase": false,
            "sequence": 4294967295
        },
        {
            "txid": "88888e34d79d3adabf5befcb61dfbb3ed07743b596520d898dd23d7abdd3c9cf",
            "vout": 1,
            "prevout": {
                "scriptpubkey": "512077387a1382d46a7cf5bb119bbc623a2586cfce066f8208cb91cf71d7bb9cfb80",
                "scriptpubkey_asm": "OP_PUSHNUM_1 OP_PUSHBYTES_32 77387a1382d46a7cf5bb119bbc623a2586cfce066f8208cb91cf71d7bb9cfb80",
                "scriptpubkey_type": "v1_p2tr",
                "scriptpubkey_address": "bc1pwuu85yuz6348eadmzxdmcc36ykrvlnsxd7pq3ju3eaca0wuulwqq3zl3au",
                "value": 1483
            },
            "scriptsig": "",
            "scriptsig_asm": "",
            "witness": ["7729fd1ae1693aa3101e5eaa4238df7f585ae45a24d4de7479a8d864d571af32e0abb1beaf369586c1b7d4bb3a515545322e494d6cd047d714b8b98bcd2dc2fe"],
            "is_coinbase": false,
            "sequence": 4294967295
        },
        {
            "txid": "546d4f701b0757cb14afb4ca52e578fb0044ad2f70f7f2da7e21308e8caf227f",
            "vout": 0,
            "prevout": {
                "scriptpubkey": "512077387a1382d46a7cf5bb119bbc623a2586cfce066f8208cb91cf71d7bb9cfb80",
                "scriptpubkey_asm": "OP_PUSHNUM_1 OP_PUSHBYTES_32 77387a1382d46a7cf5bb119bbc623a2586cfce066f8208cb91cf71d7bb9cfb80",
                "scriptpubkey_type": "v1_p2tr",
                "scriptpubkey_address": "bc1pwuu85yuz6348eadmzxdmcc36ykrvlnsxd7pq3ju3eaca0wuulwqq3zl3au",
                "value": 1000
            },
            "scriptsig": "",
            "scriptsig_asm": "",
            "witness": ["b729342fddf67e1e6e37d7b7aee84edd37b36b0e05dff69e2f036c660d5f1909ae7a278db33d6d85270e15a8dd612f4cff633b7d8bbe2bf9afdba0b7024fcff6"],
            "is_coinbase": false,
            "sequence": 4294967295
        }
    ],
    "vout": [
        {
            "scriptpubkey": "5120a15e30586a58e86361659c3aa59f6f1441af61e969aa49b8195bd13e55edf759",
            "scriptpubkey_asm": "OP_PUSHNUM_1 OP_PUSHBYTES_32 a15e30586a58e86361659c3aa59f6f1441af61e969aa49b8195bd13e55edf759",
            "scriptpubkey_type": "v1_p2tr",
            "scriptpubkey_address": "bc1p590rqkr2tr5xxct9nsa2t8m0z3q67c0fdx4ynwqet0gnu40d7avsevzhhk",
            "value": 3624
        }
    ]
}"#;

pub const TAPROOT_TXID: &str = "00000964b698b728022e6d180add7b2c060676e522ab2907f06198af7b2d0b99";

pub const TAPROOT_HEX: &str = "010000000001043e227643ad5f94203ebb9296d6f4ec04917532021ae26b5a9c8b9c76f6888888010000000055555515e99547c40988d392f731037c1288df9f9e329315b2baa6923cae308eb65100000100000000ffffffffcfc9d3bd7a3dd28d890d5296b54377d03ebbdf61cbef5bbfda3a9dd7348e88880100000000ffffffff7f22af8c8e30217edaf2f7702fad4400fb78e552cab4af14cb57071b704f6d540000000000ffffffff01280e000000000000225120a15e30586a58e86361659c3aa59f6f1441af61e969aa49b8195bd13e55edf7590140926b7ed7fb6fb15f45b78818b8728b87d46f830b27f7d8a7e1edf5a4ff79d3a162eb3ad949292a2f4d3f3493179a51d35b7771595256276cec9860aec7b7acc6014024056ce53b8920b5084b10966cfd38637e57cb6a9460d5d00c42a8ff344ee75b7aa3efdbb7188b2814d3576c4ab656062498a1f4bc13e05fa027ccb39c71bba901407729fd1ae1693aa3101e5eaa4238df7f585ae45a24d4de7479a8d864d571af32e0abb1beaf369586c1b7d4bb3a515545322e494d6cd047d714b8b98bcd2dc2fe0140b729342fddf67e1e6e37d7b7aee84edd37b36b0e05dff69e2f036c660d5f1909ae7a278db33d6d85270e15a8dd612f4cff633b7d8bbe2bf9afdba0b7024fcff611010000";

/// Single P2WPKH input paying to a taproot output and back to itself
pub const P2WPKH_RECORD: &str = r#"{
    "version": 1,
    "locktime": 0,
    "vin": [{
        "txid": "f3898029a8699bd8b71dc6f20e7ec2762a945a30d6a9f18034ce92a9d6cdd26c",
        "vout": 1,
        "prevout": {
            "scriptpubkey": "00144639af50cc9b5fcc4fc09644c0140078b2d2356c",
            "scriptpubkey_asm": "OP_0 OP_PUSHBYTES_20 4639af50cc9b5fcc4fc09644c0140078b2d2356c",
            "scriptpubkey_type": "v0_p2wpkh",
            "scriptpubkey_address": "bc1qgcu675xvnd0ucn7qjezvq9qq0zedydtv07pqxg",
            "value": 338586
        },
        "scriptsig": "",
        "scriptsig_asm": "",
        "witness": [
            "30450221008f05cd9bc6679ad3b1e5316370a71779d587d9ff9ceaebb9dfa97288e6abf7fb02203951f6ea925965c7719039984929bac73e7934c86237dc40d72459a694f378ec01",
            "02bb0543170d1752bfb0d173724effdc58a708c53d5154e56364e6cb19fd993a73"
        ],
        "is_coinbase": false,
        "sequence": 4294967293
    }],
    "vout": [
        {
            "scriptpubkey": "5120b09182bc1fc70f752d4d885ec8e68156325b75881de16bb1b5d3e3bf53ff01fd",
            "scriptpubkey_asm": "OP_PUSHNUM_1 OP_PUSHBYTES_32 b09182bc1fc70f752d4d885ec8e68156325b75881de16bb1b5d3e3bf53ff01fd",
            "scriptpubkey_type": "v1_p2tr",
            "scriptpubkey_address": "bc1pkzgc90qlcu8h2t2d3p0v3e5p2ce9kavgrhskhvd4603m75llq87s2eyxqn",
            "value": 2576
        },
        {
            "scriptpubkey": "00144639af50cc9b5fcc4fc09644c0140078b2d2356c",
            "scriptpubkey_asm": "OP_0 OP_PUSHBYTES_20 4639af50cc9b5fcc4fc09644c0140078b2d2356c",
            "scriptpubkey_type": "v0_p2wpkh",
            "scriptpubkey_address": "bc1qgcu675xvnd0ucn7qjezvq9qq0zedydtv07pqxg",
            "value": 333840
        }
    ]
}"#;

/// Legacy P2PKH spend, one input and two P2PKH outputs
pub const P2PKH_HEX: &str = "020000000125c9f7c56ab4b9c358cb159175de542b41c7d38bf862a045fa5da51979e37ffb010000006b4830450221008f619822a97841ffd26eee942d41c1c4704022af2dd42600f006336ce686353a0220659476204210b21d605baab00bef7005ff30e878e911dc99413edb6c1e022acd012102c371793f2e19d1652408efef67704a2e9953a43a9dd54360d56fc93277a5667dffffffff0254e80500000000001976a9141ef7874d338d24ecf6577e6eadeeee6cd579c67188acc8910000000000001976a9142e391b6c47778d35586b1f4154cbc6b06dc9840c88ac00000000";

pub const P2PKH_PUBKEY: &str = "02c371793f2e19d1652408efef67704a2e9953a43a9dd54360d56fc93277a5667d";

/// Two P2WPKH inputs, P2WSH and P2WPKH outputs
pub const P2WPKH_TWO_INPUT_HEX: &str = "01000000000102de4879b9137defa55479f365334d67e59ef146c0146a71e70161ef7e7cc65fb40100000000ffffffffe7b2f24ec6fde8d97cab15e885e68b45899a06ba4385c753793ed6ceb3771d560000000000ffffffff02a0b6760000000000220020e84d3f6e5cbdc0edf746db92890753c7cbb0a5d56e046be6015819f3b4bd8abc552a000000000000160014a8f98809869fce19104d18efad1273e8919736870247304402203e6a1971bbf6c42136fc8dfcf11efa115472ae063d0345f446b6383c2f17380b02204b126ed182a51bb32f90276fea4c7c0b9a9ba22df5d2fde7d3c45c0b55422656012102e7d637bf72bdd26390a93535e7f70d0dc3091fc0768ac973d82d94fa09c48da502473044022072f357d0ab64f4c828579eb1e8626d9b938b3d2948766f94add00859338bcd1a02200a52417f8b556154a5112ab4445e42b0e28a64e09fe6bdea2712cb59e447056f012102e7d637bf72bdd26390a93535e7f70d0dc3091fc0768ac973d82d94fa09c48da500000000";

pub const P2WPKH_TWO_INPUT_TXID: &str = "6673948216970832a7695c3873a284d5bcbd52c601f546e02df9b95739b84bdc";

/// P2WSH hash-time-locked spend through the preimage branch:
/// witness = [sig, pubkey, preimage, 0x01, witness script]
pub const P2WSH_HTLC_HEX: &str = "0200000000010130d1c40780728b4e30c53333fa7e38bd8ebed021c05ec135592ad17a078513a50000000000fdffffff034372160000000000220020d333523199087a0d8faad8667ba5540d93b7041ce0af2f10248565edb86a55fc52e86d0200000000220020af9746c91370a2132c85fad6641650e5c160f3522b748b15120d03695dcfd4c36e8cf00000000000160014bb9daf27204b53a37612eace73520b0774c119f805483045022100f9beb9585cc5b8487264898c532c10c862d24b98a53688ddf2b6800bb049d6b2022001d3ce09fa560efafe553214356151dde3046463214939b34cf27500969c83fd0121030681010e3431c0a31da520cf46a2b2c1d645a0d486918139f7e3f8c7fda677ab201769d10a9a7e8506e14edc4801e40cc24699ec4d4086ddcc186e33fe458470c601015b63a820406af310092ba4cc3d12b65d573c0acd25d63a97905c8cf38a77b524dee657e88876a914bb9daf27204b53a37612eace73520b0774c119f867022001b27576a9142c3debdb231b31b42a8877fc3b16de014b13f10b6888ac00000000";

pub const P2WSH_HTLC_WTXID: &str = "e1e26f00f9723648e4c13a308f074e516b08dcbf86c28a4847ec2bfb52c39355";

pub fn load_one(json: &str) -> Transaction {
    load_records_from_str(json).unwrap().remove(0)
}

pub fn p2pkh_script(pubkey: &[u8]) -> Vec<u8> {
    let mut script = vec![0x76, 0xa9, 0x14];
    script.extend_from_slice(&hash160(pubkey));
    script.extend_from_slice(&[0x88, 0xac]);
    script
}

pub fn p2wpkh_script(pubkey: &[u8]) -> Vec<u8> {
    let mut script = vec![0x00, 0x14];
    script.extend_from_slice(&hash160(pubkey));
    script
}

pub fn push(data: &[u8]) -> Vec<u8> {
    let mut out = vec![data.len() as u8];
    out.extend_from_slice(data);
    out
}

/// Deterministic key from a one-byte seed
pub fn keypair(seed: u8) -> (SecretKey, Vec<u8>) {
    let secp = Secp256k1::new();
    let sk = SecretKey::from_slice(&[seed; 32]).unwrap();
    let pk = PublicKey::from_secret_key(&secp, &sk).serialize().to_vec();
    (sk, pk)
}

/// Same transaction with every input's unlocking data replaced
pub fn with_unlocking(tx: &Transaction, unlocking: Vec<(Vec<u8>, Vec<Vec<u8>>)>) -> Transaction {
    let mut builder = TransactionBuilder::new(tx.version(), tx.locktime());
    for (input, (script_sig, witness)) in tx.inputs().iter().zip(unlocking) {
        builder = builder.add_input(Input::new(
            input.outpoint,
            input.prevout.clone(),
            script_sig,
            witness,
            input.sequence,
        ));
    }
    for output in tx.outputs() {
        builder = builder.add_output(output.clone());
    }
    builder.finish()
}

/// Unsigned one-input spend of `prevout`
pub fn unsigned_spend(prevout: Output, fill: u8, output_value: i64, sequence: u32) -> Transaction {
    TransactionBuilder::new(2, 0)
        .add_input(Input::new(OutPoint::new([fill; 32], 0), Some(prevout), vec![], vec![], sequence))
        .add_output(Output::from_script(output_value, p2wpkh_script(&[0x03; 33])))
        .finish()
}
