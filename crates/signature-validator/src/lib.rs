//! Off-chain EIP-712 signature verification (C1).
//!
//! Every signer here is an externally-owned account recovering via ECDSA;
//! there is no EIP-1271 contract-wallet path, so this crate has no RPC
//! dependency, unlike the on-chain order-signature checks this pattern is
//! modeled on.

use {
    alloy_primitives::{Address, B256},
    alloy_sol_types::{eip712_domain, Eip712Domain, SolStruct},
    model::{
        eip712::{BidTypedData, IntentTypedData},
        Amount, Hash,
    },
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    #[error("recovered signer does not match claimed signer")]
    SignerMismatch,
    #[error("signature is not in canonical low-s form")]
    NonCanonicalSignature,
}

fn intent_domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    eip712_domain! {
        name: "IntentSettlement",
        version: "1",
        chain_id: chain_id,
        verifying_contract: verifying_contract,
    }
}

fn bid_domain(chain_id: u64, verifying_contract: Address) -> Eip712Domain {
    eip712_domain! {
        name: "IntentBidding",
        version: "1",
        chain_id: chain_id,
        verifying_contract: verifying_contract,
    }
}

/// Computes the hash identifying an intent (§4.2): the EIP-712 signing hash
/// over the `IntentSettlement` domain.
pub fn intent_hash(
    data: &IntentTypedData,
    chain_id: u64,
    settlement_contract: Address,
) -> Hash {
    data.eip712_signing_hash(&intent_domain(chain_id, settlement_contract))
}

/// Computes the hash identifying a bid (§4.6): the EIP-712 signing hash over
/// the `IntentBidding` domain.
pub fn bid_hash(data: &BidTypedData, chain_id: u64, settlement_contract: Address) -> Hash {
    data.eip712_signing_hash(&bid_domain(chain_id, settlement_contract))
}

/// Recovers the signer from a 65-byte `(r, s, v)` signature over
/// `signing_hash`. Rejects non-canonical (high-s) signatures up front,
/// mirroring the on-chain contract's `ecrecover` rules. No caller-supplied
/// address is ever trusted — the signer is whatever this recovers.
pub fn recover_signer(signing_hash: B256, signature: &[u8; 65]) -> Result<Address, ValidationError> {
    let sig = alloy_primitives::Signature::from_raw(signature.as_slice())
        .map_err(|err| ValidationError::MalformedSignature(err.to_string()))?;

    // secp256k1 order / 2; signatures with a higher `s` are the
    // malleable counterpart of a canonical one and rejected on sight.
    let half_order = alloy_primitives::U256::from_str_radix(
        "7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0",
        16,
    )
    .expect("valid constant");
    if sig.s() > half_order {
        return Err(ValidationError::NonCanonicalSignature);
    }

    sig.recover_address_from_prehash(&signing_hash)
        .map_err(|err| ValidationError::MalformedSignature(err.to_string()))
}

/// Recovers the signer and additionally checks it against `claimed_signer`.
/// Used only where a caller asserts an identity that must then be confirmed
/// (neither the intent nor bid admission paths do this — see
/// [`verify_intent`]/[`verify_bid`] — but a future endpoint might).
pub fn recover_and_verify(
    signing_hash: B256,
    signature: &[u8; 65],
    claimed_signer: Address,
) -> Result<(), ValidationError> {
    let recovered = recover_signer(signing_hash, signature)?;
    if recovered != claimed_signer {
        return Err(ValidationError::SignerMismatch);
    }
    Ok(())
}

/// Verifies a signed intent payload end to end: recomputes the typed-data
/// hash and recovers the signer from the signature (§4.5 step 2). The
/// returned address is the signer of record; nothing upstream supplies one.
pub fn verify_intent(
    data: &IntentTypedData,
    chain_id: u64,
    settlement_contract: Address,
    signature: &[u8; 65],
) -> Result<(Hash, Address), ValidationError> {
    let hash = intent_hash(data, chain_id, settlement_contract);
    let signer = recover_signer(hash, signature)?;
    Ok((hash, signer))
}

/// Verifies a signed bid payload end to end (§4.6 step 1), returning the
/// recovered solver identity.
pub fn verify_bid(
    data: &BidTypedData,
    chain_id: u64,
    settlement_contract: Address,
    signature: &[u8; 65],
) -> Result<(Hash, Address), ValidationError> {
    let hash = bid_hash(data, chain_id, settlement_contract);
    let signer = recover_signer(hash, signature)?;
    Ok((hash, signer))
}

/// Converts an intent's decimal-typed fields into the ABI-typed struct
/// EIP-712 hashes over.
pub fn intent_typed_data(
    token_in: Address,
    token_out: Address,
    amount_in: Amount,
    max_slippage_bps: u16,
    deadline: Amount,
    chain_id: Amount,
    receiver: Address,
    nonce: Amount,
) -> IntentTypedData {
    IntentTypedData {
        tokenIn: token_in,
        tokenOut: token_out,
        amountIn: amount_in,
        maxSlippageBps: max_slippage_bps,
        deadline,
        chainId: chain_id,
        receiver,
        nonce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length_signature() {
        let data = IntentTypedData {
            tokenIn: Address::ZERO,
            tokenOut: Address::ZERO,
            amountIn: Amount::from(1u8),
            maxSlippageBps: 10,
            deadline: Amount::from(1u8),
            chainId: Amount::from(1u8),
            receiver: Address::ZERO,
            nonce: Amount::from(1u8),
        };
        let hash = intent_hash(&data, 1, Address::ZERO);
        let bad_sig = [0u8; 65];
        let err = recover_and_verify(hash, &bad_sig, Address::ZERO).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedSignature(_)));
    }
}
