//! EIP-712 typed-data struct definitions.
//!
//! Field order and widths here are load-bearing: they must stay bit-identical
//! to what on-chain settlement expects, the same way `crates/cow-amm`'s
//! `GPv2Order` mirrors the Solidity struct it settles against.

use alloy_sol_types::sol;

sol! {
    /// Primary type for the `IntentSettlement` EIP-712 domain.
    #[derive(Debug)]
    struct IntentTypedData {
        address tokenIn;
        address tokenOut;
        uint256 amountIn;
        uint16 maxSlippageBps;
        uint256 deadline;
        uint256 chainId;
        address receiver;
        uint256 nonce;
    }
}

sol! {
    /// Primary type for the `IntentBidding` EIP-712 domain.
    #[derive(Debug)]
    struct BidTypedData {
        bytes32 intentHash;
        uint256 quoteOut;
        uint16 solverFeeBps;
        bytes calldataHint;
        uint32 ttlMs;
    }
}
