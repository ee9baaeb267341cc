//! W4: stateless encoders for the QR/mobile and browser/deep-link payment
//! modalities (§4.5's `payment_options`, §6's `GET /v1/qr/{request_id}`).
//!
//! Neither operation touches a chain or a cache; both are pure functions of
//! the `PaymentRequirement` already produced by the payment worker. Actually
//! rasterizing a QR code (png/svg/ascii) is out of scope — only the payload
//! string fed to that renderer is built here.

use notary402_types::ErrorKind;
use notary402_types::payment::PaymentRequirement;
use notary402_types::wallet_uri::{eip681_uri, metamask_deep_link};
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct RequirementParams {
    pub requirement: PaymentRequirement,
}

#[derive(Debug, Serialize)]
pub struct DeepLinkResult {
    pub deep_link: String,
}

#[instrument(skip_all)]
pub async fn encode_deep_link(
    params: RequirementParams,
) -> Result<DeepLinkResult, (ErrorKind, String)> {
    let r = &params.requirement;
    Ok(DeepLinkResult {
        deep_link: metamask_deep_link(
            r.asset.as_str(),
            r.network.chain_id(),
            r.pay_to.as_str(),
            &r.max_amount_required,
        ),
    })
}

#[derive(Debug, Serialize)]
pub struct QrPayloadResult {
    pub payload: String,
    /// Hint for the external renderer: EIP-681 URIs fit QR error-correction
    /// level M comfortably at typical screen sizes; nothing here enforces
    /// that, it's informational only.
    pub encoding: &'static str,
}

#[instrument(skip_all)]
pub async fn encode_qr_payload(
    params: RequirementParams,
) -> Result<QrPayloadResult, (ErrorKind, String)> {
    let r = &params.requirement;
    Ok(QrPayloadResult {
        payload: eip681_uri(
            r.asset.as_str(),
            r.network.chain_id(),
            r.pay_to.as_str(),
            &r.max_amount_required,
        ),
        encoding: "eip681",
    })
}

#[derive(Debug, Serialize)]
pub struct AgentOption {
    pub requirement: PaymentRequirement,
}

#[derive(Debug, Serialize)]
pub struct BrowserOption {
    pub deep_link: String,
}

#[derive(Debug, Serialize)]
pub struct MobileOption {
    pub qr_payload: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentOptionsResult {
    pub agent: AgentOption,
    pub browser: BrowserOption,
    pub mobile: MobileOption,
}

/// Builds the three modality-specific representations of a single
/// requirement for the `payment_options` field of the 402 response body.
#[instrument(skip_all)]
pub async fn encode_payment_options(
    params: RequirementParams,
) -> Result<PaymentOptionsResult, (ErrorKind, String)> {
    let r = &params.requirement;
    let chain_id = r.network.chain_id();
    let deep_link = metamask_deep_link(r.asset.as_str(), chain_id, r.pay_to.as_str(), &r.max_amount_required);
    let qr_payload = eip681_uri(r.asset.as_str(), chain_id, r.pay_to.as_str(), &r.max_amount_required);
    Ok(PaymentOptionsResult {
        agent: AgentOption {
            requirement: r.clone(),
        },
        browser: BrowserOption { deep_link },
        mobile: MobileOption { qr_payload },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary402_types::network::Network;
    use notary402_types::payment::{EvmAddress, HexNonce};

    fn sample_requirement() -> PaymentRequirement {
        PaymentRequirement {
            x402_version: 1,
            scheme: PaymentRequirement::SCHEME.to_string(),
            network: Network::Base,
            max_amount_required: "30000".to_string(),
            asset: EvmAddress::try_from("0x0000000000000000000000000000000000dead".to_string())
                .unwrap(),
            pay_to: EvmAddress::try_from("0x0000000000000000000000000000000000beef".to_string())
                .unwrap(),
            nonce: HexNonce::try_from("0x".to_string() + &"11".repeat(32)).unwrap(),
            valid_until: 0,
            resource: "https://example.com/resource".to_string(),
            description: "a test resource".to_string(),
        }
    }

    #[tokio::test]
    async fn deep_link_and_qr_payload_share_the_same_transfer_path() {
        let requirement = sample_requirement();
        let deep_link = encode_deep_link(RequirementParams {
            requirement: requirement.clone(),
        })
        .await
        .unwrap();
        let qr = encode_qr_payload(RequirementParams { requirement })
            .await
            .unwrap();
        assert!(deep_link.deep_link.contains("0x0000000000000000000000000000000000dead@8453"));
        assert!(qr.payload.starts_with("ethereum:0x0000000000000000000000000000000000dead@8453"));
    }

    #[tokio::test]
    async fn payment_options_bundles_all_three_modalities() {
        let requirement = sample_requirement();
        let options = encode_payment_options(RequirementParams { requirement })
            .await
            .unwrap();
        assert_eq!(options.agent.requirement.max_amount_required, "30000");
        assert!(options.browser.deep_link.starts_with("https://link.metamask.io/send/"));
        assert!(options.mobile.qr_payload.starts_with("ethereum:"));
    }
}
