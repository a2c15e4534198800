/// Minimal ABI handling: selector computation, calldata parsing against a
/// fixed signature set, and revoke calldata encoding.
///
/// This is not a general ABI codec. The pipeline only needs to recognize a
/// known set of approval / liquidity / staking entrypoints and pull static
/// words out of their calldata; dynamic arguments decode as raw words.
use alloy::primitives::{keccak256, Address, U256};

/// Parameter kinds we decode from static calldata words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Uint,
    Bool,
    /// Anything else (tuples, bytes, offsets) kept as the raw word
    Raw,
}

/// A decoded static argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
    Raw([u8; 32]),
}

impl AbiValue {
    pub fn as_address(&self) -> Option<Address> {
        match self {
            AbiValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            AbiValue::Uint(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// One recognizable function signature
#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub name: &'static str,
    pub signature: &'static str,
    pub params: &'static [ParamType],
    selector: [u8; 4],
}

impl FunctionSig {
    pub fn new(name: &'static str, signature: &'static str, params: &'static [ParamType]) -> Self {
        Self {
            name,
            signature,
            params,
            selector: selector(signature),
        }
    }

    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }
}

/// A parsed transaction input: function name plus its static arguments
#[derive(Debug, Clone)]
pub struct ParsedCall {
    pub name: String,
    pub signature: String,
    pub args: Vec<AbiValue>,
}

/// 4-byte function selector of a canonical signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Strip an optional 0x prefix and decode hex
pub fn decode_hex(input: &str) -> Option<Vec<u8>> {
    let trimmed = input.trim().trim_start_matches("0x");
    if trimmed.is_empty() {
        return Some(Vec::new());
    }
    hex::decode(trimmed).ok()
}

/// Match transaction input bytes against a signature set and decode the
/// static argument words. Returns None for unrecognized or malformed input.
pub fn parse_input(input: &str, signatures: &[FunctionSig]) -> Option<ParsedCall> {
    let bytes = decode_hex(input)?;
    if bytes.len() < 4 {
        return None;
    }
    let sel: [u8; 4] = bytes[..4].try_into().ok()?;
    let sig = signatures.iter().find(|s| s.selector() == sel)?;

    let data = &bytes[4..];
    let mut args = Vec::with_capacity(sig.params.len());
    for (i, param) in sig.params.iter().enumerate() {
        let start = i * 32;
        let end = start + 32;
        if end > data.len() {
            return None;
        }
        let word: [u8; 32] = data[start..end].try_into().ok()?;
        args.push(decode_word(*param, &word));
    }

    Some(ParsedCall {
        name: sig.name.to_string(),
        signature: sig.signature.to_string(),
        args,
    })
}

fn decode_word(param: ParamType, word: &[u8; 32]) -> AbiValue {
    match param {
        ParamType::Address => AbiValue::Address(Address::from_slice(&word[12..])),
        ParamType::Uint => AbiValue::Uint(U256::from_be_bytes(*word)),
        ParamType::Bool => AbiValue::Bool(word[31] != 0),
        ParamType::Raw => AbiValue::Raw(*word),
    }
}

// =============================================================================
// ENCODING (revoke calldata)
// =============================================================================

fn encode_address(address: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

/// `approve(spender, 0)`: zeroes out an ERC-20 allowance
pub fn encode_erc20_revoke(spender: Address) -> String {
    let mut calldata = Vec::with_capacity(4 + 64);
    calldata.extend_from_slice(&selector("approve(address,uint256)"));
    calldata.extend_from_slice(&encode_address(spender));
    calldata.extend_from_slice(&[0u8; 32]);
    format!("0x{}", hex::encode(calldata))
}

/// `setApprovalForAll(operator, false)`: drops a collection-wide approval
pub fn encode_nft_revoke(operator: Address) -> String {
    let mut calldata = Vec::with_capacity(4 + 64);
    calldata.extend_from_slice(&selector("setApprovalForAll(address,bool)"));
    calldata.extend_from_slice(&encode_address(operator));
    calldata.extend_from_slice(&[0u8; 32]);
    format!("0x{}", hex::encode(calldata))
}

/// `allowance(owner, spender)` read calldata
pub fn encode_allowance_call(owner: Address, spender: Address) -> String {
    let mut calldata = Vec::with_capacity(4 + 64);
    calldata.extend_from_slice(&selector("allowance(address,address)"));
    calldata.extend_from_slice(&encode_address(owner));
    calldata.extend_from_slice(&encode_address(spender));
    format!("0x{}", hex::encode(calldata))
}

/// `isApprovedForAll(owner, operator)` read calldata
pub fn encode_is_approved_for_all_call(owner: Address, operator: Address) -> String {
    let mut calldata = Vec::with_capacity(4 + 64);
    calldata.extend_from_slice(&selector("isApprovedForAll(address,address)"));
    calldata.extend_from_slice(&encode_address(owner));
    calldata.extend_from_slice(&encode_address(operator));
    format!("0x{}", hex::encode(calldata))
}

/// `balanceOf(owner)` read calldata
pub fn encode_balance_of_call(owner: Address) -> String {
    let mut calldata = Vec::with_capacity(4 + 32);
    calldata.extend_from_slice(&selector("balanceOf(address)"));
    calldata.extend_from_slice(&encode_address(owner));
    format!("0x{}", hex::encode(calldata))
}

// =============================================================================
// RESULT DECODING (eth_call return data)
// =============================================================================

/// Decode a single uint256 return value
pub fn decode_uint_result(result: &str) -> Option<U256> {
    let bytes = decode_hex(result)?;
    if bytes.is_empty() {
        return None;
    }
    if bytes.len() > 32 {
        let word: [u8; 32] = bytes[..32].try_into().ok()?;
        return Some(U256::from_be_bytes(word));
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Some(U256::from_be_bytes(word))
}

/// Decode a single bool return value
pub fn decode_bool_result(result: &str) -> Option<bool> {
    decode_uint_result(result).map(|v| !v.is_zero())
}

/// Decode an ABI-encoded dynamic string return value (offset, length, data)
pub fn decode_string_result(result: &str) -> Option<String> {
    let bytes = decode_hex(result)?;
    if bytes.len() < 64 {
        return None;
    }
    let offset = U256::from_be_bytes::<32>(bytes[..32].try_into().ok()?);
    let offset: usize = offset.try_into().ok()?;
    if offset + 32 > bytes.len() {
        return None;
    }
    let length = U256::from_be_bytes::<32>(bytes[offset..offset + 32].try_into().ok()?);
    let length: usize = length.try_into().ok()?;
    let start = offset + 32;
    if start + length > bytes.len() {
        return None;
    }
    let text = String::from_utf8_lossy(&bytes[start..start + length])
        .trim_end_matches('\0')
        .trim()
        .to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Last 20 bytes of a 32-byte storage word, as an address (EIP-1967 reads)
pub fn decode_address_from_word(result: &str) -> Option<Address> {
    let bytes = decode_hex(result)?;
    if bytes.len() != 32 {
        return None;
    }
    let address = Address::from_slice(&bytes[12..]);
    if address == Address::ZERO {
        None
    } else {
        Some(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const PARAMS_APPROVE: &[ParamType] = &[ParamType::Address, ParamType::Uint];

    fn approve_sig() -> FunctionSig {
        FunctionSig::new("approve", "approve(address,uint256)", PARAMS_APPROVE)
    }

    #[test]
    fn test_known_selectors() {
        // Spot checks against well-known selector values
        assert_eq!(
            hex::encode(selector("approve(address,uint256)")),
            "095ea7b3"
        );
        assert_eq!(
            hex::encode(selector("setApprovalForAll(address,bool)")),
            "a22cb465"
        );
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(
            hex::encode(selector("allowance(address,address)")),
            "dd62ed3e"
        );
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
        assert_eq!(hex::encode(selector("name()")), "06fdde03");
        assert_eq!(hex::encode(selector("decimals()")), "313ce567");
        assert_eq!(hex::encode(selector("upgradeTo(address)")), "3659cfe6");
    }

    #[test]
    fn test_parse_approve_calldata() {
        let spender = Address::from_str("0x1111111111111111111111111111111111111111").unwrap();
        // Unlimited approval: 2^256 - 1
        let input = format!(
            "0x095ea7b3{}{}",
            hex::encode({
                let mut w = [0u8; 32];
                w[12..].copy_from_slice(spender.as_slice());
                w
            }),
            "f".repeat(64)
        );

        let parsed = parse_input(&input, &[approve_sig()]).unwrap();
        assert_eq!(parsed.name, "approve");
        assert_eq!(parsed.args[0].as_address(), Some(spender));
        assert_eq!(parsed.args[1].as_uint(), Some(U256::MAX));
    }

    #[test]
    fn test_parse_rejects_unknown_selector_and_short_input() {
        assert!(parse_input("0xdeadbeef", &[approve_sig()]).is_none());
        assert!(parse_input("0x09", &[approve_sig()]).is_none());
        assert!(parse_input("0x", &[approve_sig()]).is_none());
        // Right selector, truncated args
        assert!(parse_input("0x095ea7b300", &[approve_sig()]).is_none());
    }

    #[test]
    fn test_revoke_round_trip() {
        let spender = Address::from_str("0x2222222222222222222222222222222222222222").unwrap();
        let revoke = encode_erc20_revoke(spender);

        // Reapplying the revoke calldata as an intent parses to a zero approval
        let parsed = parse_input(&revoke, &[approve_sig()]).unwrap();
        assert_eq!(parsed.args[0].as_address(), Some(spender));
        assert_eq!(parsed.args[1].as_uint(), Some(U256::ZERO));
    }

    #[test]
    fn test_nft_revoke_encodes_false() {
        let operator = Address::from_str("0x3333333333333333333333333333333333333333").unwrap();
        let revoke = encode_nft_revoke(operator);
        const PARAMS: &[ParamType] = &[ParamType::Address, ParamType::Bool];
        let sig = FunctionSig::new(
            "setApprovalForAll",
            "setApprovalForAll(address,bool)",
            PARAMS,
        );
        let parsed = parse_input(&revoke, &[sig]).unwrap();
        assert_eq!(parsed.args[1].as_bool(), Some(false));
    }

    #[test]
    fn test_decode_uint_result() {
        assert_eq!(
            decode_uint_result("0x0000000000000000000000000000000000000000000000000000000000000007"),
            Some(U256::from(7))
        );
        assert_eq!(decode_uint_result("0x"), None);
    }

    #[test]
    fn test_decode_string_result() {
        // "USDC" ABI-encoded: offset 0x20, length 4, padded data
        let encoded = format!(
            "0x{}{}{}",
            format!("{:0>64}", "20"),
            format!("{:0>64}", "4"),
            format!("{:0<64}", hex::encode("USDC"))
        );
        assert_eq!(decode_string_result(&encoded), Some("USDC".to_string()));
        assert_eq!(decode_string_result("0x"), None);
    }

    #[test]
    fn test_decode_address_from_word_zero_is_none() {
        let zero = format!("0x{}", "0".repeat(64));
        assert!(decode_address_from_word(&zero).is_none());

        let implementation = format!("0x{}{}", "0".repeat(24), "ab".repeat(20));
        assert!(decode_address_from_word(&implementation).is_some());
    }
}
