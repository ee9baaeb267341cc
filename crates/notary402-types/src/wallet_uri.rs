//! EIP-681 payment URI and MetaMask deep-link construction, shared by the
//! payment worker (browser modality, §4.5) and the encoder worker (mobile/QR
//! modality). Both wrap the same `<asset>@<chain_id>/transfer?...` path.

fn transfer_path(asset: &str, chain_id: u64, pay_to: &str, amount_atomic: &str) -> String {
    format!("{asset}@{chain_id}/transfer?address={pay_to}&uint256={amount_atomic}")
}

pub fn eip681_uri(asset: &str, chain_id: u64, pay_to: &str, amount_atomic: &str) -> String {
    format!("ethereum:{}", transfer_path(asset, chain_id, pay_to, amount_atomic))
}

pub fn metamask_deep_link(asset: &str, chain_id: u64, pay_to: &str, amount_atomic: &str) -> String {
    format!(
        "https://link.metamask.io/send/{}",
        transfer_path(asset, chain_id, pay_to, amount_atomic)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eip681_uri_matches_wire_format() {
        let uri = eip681_uri("0xUSDC", 8453, "0xPayee", "30000");
        assert_eq!(uri, "ethereum:0xUSDC@8453/transfer?address=0xPayee&uint256=30000");
    }

    #[test]
    fn deep_link_uses_metamask_host() {
        let link = metamask_deep_link("0xUSDC", 8453, "0xPayee", "30000");
        assert_eq!(
            link,
            "https://link.metamask.io/send/0xUSDC@8453/transfer?address=0xPayee&uint256=30000"
        );
    }
}
