/// Function-signature sets the analyzers match transaction input against
use crate::adapter::abi::{FunctionSig, ParamType};
use once_cell::sync::Lazy;

const APPROVE_PARAMS: &[ParamType] = &[ParamType::Address, ParamType::Uint];
const SET_APPROVAL_PARAMS: &[ParamType] = &[ParamType::Address, ParamType::Bool];
// permit(owner, spender, value, deadline, v, r, s)
const PERMIT_PARAMS: &[ParamType] = &[
    ParamType::Address,
    ParamType::Address,
    ParamType::Uint,
    ParamType::Uint,
    ParamType::Uint,
    ParamType::Raw,
    ParamType::Raw,
];
// Permit2 entrypoints carry nested tuples; only the head words matter for
// detection, the rest decode as raw offsets
const PERMIT2_PARAMS: &[ParamType] = &[ParamType::Raw, ParamType::Raw, ParamType::Raw, ParamType::Raw];

/// Approval-intent entrypoints recognized by the approval analyzer
pub static APPROVAL_SIGNATURES: Lazy<Vec<FunctionSig>> = Lazy::new(|| {
    vec![
        FunctionSig::new("approve", "approve(address,uint256)", APPROVE_PARAMS),
        FunctionSig::new(
            "setApprovalForAll",
            "setApprovalForAll(address,bool)",
            SET_APPROVAL_PARAMS,
        ),
        FunctionSig::new(
            "permit",
            "permit(address,address,uint256,uint256,uint8,bytes32,bytes32)",
            PERMIT_PARAMS,
        ),
        FunctionSig::new(
            "permitTransferFrom",
            "permitTransferFrom(((address,uint256),uint256,uint256),(address,uint256),address,bytes)",
            PERMIT2_PARAMS,
        ),
        FunctionSig::new(
            "permitWitnessTransferFrom",
            "permitWitnessTransferFrom(((address,uint256),uint256,uint256),(address,uint256),address,bytes32,string,bytes)",
            PERMIT2_PARAMS,
        ),
        FunctionSig::new(
            "permitTransferFrom",
            "permitTransferFrom(((address,uint256)[],uint256,uint256),(address,uint256)[],address,bytes)",
            PERMIT2_PARAMS,
        ),
    ]
});

const ADD_LIQUIDITY_PARAMS: &[ParamType] = &[
    ParamType::Address,
    ParamType::Address,
    ParamType::Uint,
    ParamType::Uint,
    ParamType::Uint,
    ParamType::Uint,
    ParamType::Address,
    ParamType::Uint,
];
const ADD_LIQUIDITY_ETH_PARAMS: &[ParamType] = &[
    ParamType::Address,
    ParamType::Uint,
    ParamType::Uint,
    ParamType::Uint,
    ParamType::Address,
    ParamType::Uint,
];
const SINGLE_UINT_PARAMS: &[ParamType] = &[ParamType::Uint];
const DEPOSIT_TO_PARAMS: &[ParamType] = &[ParamType::Uint, ParamType::Address];

/// Deposit-like entrypoints the LP/stake analyzer looks for
pub static LP_STAKE_SIGNATURES: Lazy<Vec<FunctionSig>> = Lazy::new(|| {
    vec![
        FunctionSig::new(
            "addLiquidity",
            "addLiquidity(address,address,uint256,uint256,uint256,uint256,address,uint256)",
            ADD_LIQUIDITY_PARAMS,
        ),
        FunctionSig::new(
            "addLiquidityETH",
            "addLiquidityETH(address,uint256,uint256,uint256,address,uint256)",
            ADD_LIQUIDITY_ETH_PARAMS,
        ),
        FunctionSig::new("stake", "stake(uint256)", SINGLE_UINT_PARAMS),
        FunctionSig::new("deposit", "deposit(uint256)", SINGLE_UINT_PARAMS),
        FunctionSig::new("deposit", "deposit(uint256,address)", DEPOSIT_TO_PARAMS),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::abi::parse_input;

    #[test]
    fn test_approval_set_recognizes_approve() {
        let input = format!("0x095ea7b3{}{}", "0".repeat(64), "f".repeat(64));
        let parsed = parse_input(&input, &APPROVAL_SIGNATURES).unwrap();
        assert_eq!(parsed.name, "approve");
    }

    #[test]
    fn test_lp_set_recognizes_stake() {
        // stake(uint256) selector: keccak("stake(uint256)")[..4] = 0xa694fc3a
        let input = format!("0xa694fc3a{}", "0".repeat(64));
        let parsed = parse_input(&input, &LP_STAKE_SIGNATURES).unwrap();
        assert_eq!(parsed.name, "stake");
        assert_eq!(parsed.signature, "stake(uint256)");
    }

    #[test]
    fn test_sets_do_not_overlap() {
        for approval in APPROVAL_SIGNATURES.iter() {
            for lp in LP_STAKE_SIGNATURES.iter() {
                assert_ne!(approval.selector(), lp.selector());
            }
        }
    }
}
