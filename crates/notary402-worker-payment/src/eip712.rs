//! L1: EIP-712 domain/struct hashing and ECDSA signer recovery for
//! `ReceiveWithAuthorization`.

use alloy_primitives::{Address, FixedBytes, Signature, U256};
use alloy_sol_types::{SolStruct, eip712_domain, sol};

use crate::error::PaymentWorkerError;

sol! {
    struct ReceiveWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
}

pub const USDC_EIP712_NAME: &str = "USD Coin";
pub const USDC_EIP712_VERSION: &str = "2";

pub struct AuthorizationFields {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub valid_after: U256,
    pub valid_before: U256,
    pub nonce: FixedBytes<32>,
}

/// Recovers the signer of a `ReceiveWithAuthorization` EIP-712 message.
///
/// `v` is normalized to `{27, 28}` before recovery: callers that pass
/// `{0, 1}` per EIP-155-style encoding are adjusted automatically.
pub fn recover_signer(
    fields: &AuthorizationFields,
    verifying_contract: Address,
    chain_id: u64,
    v: u8,
    r: [u8; 32],
    s: [u8; 32],
) -> Result<Address, PaymentWorkerError> {
    let domain = eip712_domain! {
        name: USDC_EIP712_NAME,
        version: USDC_EIP712_VERSION,
        chain_id: chain_id,
        verifying_contract: verifying_contract,
    };
    let message = ReceiveWithAuthorization {
        from: fields.from,
        to: fields.to,
        value: fields.value,
        validAfter: fields.valid_after,
        validBefore: fields.valid_before,
        nonce: fields.nonce,
    };
    let digest = message.eip712_signing_hash(&domain);

    let normalized_v = if v < 27 { v + 27 } else { v };
    let mut raw = [0u8; 65];
    raw[..32].copy_from_slice(&r);
    raw[32..64].copy_from_slice(&s);
    raw[64] = normalized_v;

    let signature = Signature::from_raw_array(&raw)
        .map_err(|e| PaymentWorkerError::InvalidSignature(e.to_string()))?;

    signature
        .recover_address_from_prehash(&digest)
        .map_err(|e| PaymentWorkerError::InvalidSignature(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mutating a single byte of `r` must change recovery to some other
    /// address (never silently recover the same signer). This is the
    /// "tampering with any single field changes recovery" property (§8.3).
    #[test]
    fn tampering_with_r_changes_recovered_address() {
        let fields = AuthorizationFields {
            from: Address::repeat_byte(0x11),
            to: Address::repeat_byte(0x22),
            value: U256::from(1000u64),
            valid_after: U256::from(0u64),
            valid_before: U256::from(9_999_999_999u64),
            nonce: FixedBytes::<32>::repeat_byte(0x33),
        };
        let verifying_contract = Address::repeat_byte(0x33);
        let r = [0x11u8; 32];
        let s = [0x44u8; 32];

        let recovered_a = recover_signer(&fields, verifying_contract, 84532, 27, r, s);
        let mut tampered_r = r;
        tampered_r[0] ^= 0x01;
        let recovered_b = recover_signer(&fields, verifying_contract, 84532, 27, tampered_r, s);

        // Either recovery fails (most likely for a random signature) or it
        // succeeds with a different address; it must never silently yield
        // the same address as an untampered signature would.
        match (recovered_a, recovered_b) {
            (Ok(a), Ok(b)) => assert_ne!(a, b),
            _ => {}
        }
    }

    #[test]
    fn normalizes_low_v_values_before_recovery() {
        let fields = AuthorizationFields {
            from: Address::repeat_byte(0x11),
            to: Address::repeat_byte(0x22),
            value: U256::from(1u64),
            valid_after: U256::from(0u64),
            valid_before: U256::from(1u64),
            nonce: FixedBytes::<32>::ZERO,
        };
        let verifying_contract = Address::repeat_byte(0x33);
        let r = [0x01u8; 32];
        let s = [0x02u8; 32];
        // Both should attempt recovery through the same normalized path;
        // what matters is that v=0 doesn't panic where v=27 wouldn't.
        let _ = recover_signer(&fields, verifying_contract, 84532, 0, r, s);
        let _ = recover_signer(&fields, verifying_contract, 84532, 27, r, s);
    }
}
