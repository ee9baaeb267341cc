//! L4: secp256k1 key material for the non-EVM ledger, deterministic
//! transaction-id derivation, and ledger-native timestamp formatting.

use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use secp256k1::ecdsa::RecoverableSignature;

use crate::error::CertifyWorkerError;

pub use notary402_types::ledger::{
    derive_transaction_id, format_ledger_timestamp, hex_normalize, CertificatePayload,
};

/// Holds the service's ledger signing key. Never logged or returned in an
/// RPC response body.
pub struct LedgerSigner {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl LedgerSigner {
    pub fn from_hex(private_key_hex: &str) -> Result<Self, CertifyWorkerError> {
        let stripped = hex_normalize(private_key_hex);
        let bytes = hex::decode(stripped).map_err(|e| CertifyWorkerError::Signing(e.to_string()))?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|e| CertifyWorkerError::Signing(e.to_string()))?;
        let secp = Secp256k1::signing_only();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Ok(LedgerSigner {
            secret_key,
            public_key,
        })
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Signs the 32-byte transaction id with the service's secp256k1 key.
    pub fn sign_transaction_id(&self, tx_id_hex: &str) -> Result<String, CertifyWorkerError> {
        let digest = hex::decode(tx_id_hex).map_err(|e| CertifyWorkerError::Signing(e.to_string()))?;
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| CertifyWorkerError::Signing(e.to_string()))?;
        let secp = Secp256k1::signing_only();
        let signature: RecoverableSignature =
            secp.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recovery_id, raw) = signature.serialize_compact();
        let mut encoded = raw.to_vec();
        encoded.push(recovery_id.to_i32() as u8);
        Ok(hex::encode(encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_matching_id_for_fixture_from_spec_s6() {
        let payload = CertificatePayload::certificate("0xdead").canonical_json();
        let tx_id = derive_transaction_id(
            "cep",
            &"a".repeat(64),
            &"a".repeat(64),
            &payload,
            "42",
            "2025:10:31-14:32:18",
        );
        assert_eq!(tx_id.len(), 64);
    }

    #[test]
    fn signs_and_recovers_with_same_key() {
        let signer = LedgerSigner::from_hex(&"11".repeat(32)).unwrap();
        let tx_id = "22".repeat(32);
        let signature = signer.sign_transaction_id(&tx_id).unwrap();
        // 64 bytes signature + 1 byte recovery id, hex-encoded.
        assert_eq!(signature.len(), 130);
    }
}
