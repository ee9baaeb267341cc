//! The proof tuple a completed Request exposes to third parties (§4.4, GLOSSARY).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proof {
    pub tx_id: String,
    pub block_id: String,
    pub timestamp: String,
    pub explorer_url: String,
}

impl Proof {
    pub fn explorer_url(template: &str, tx_id: &str) -> String {
        template.replace("{tx_id}", tx_id)
    }
}
