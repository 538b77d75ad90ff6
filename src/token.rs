use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Token inscription operations accepted by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenOp {
    Mint,
    Link,
    Transfer,
}

impl std::fmt::Display for TokenOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenOp::Mint => write!(f, "mint"),
            TokenOp::Link => write!(f, "link"),
            TokenOp::Transfer => write!(f, "transfer"),
        }
    }
}

/// Inscription payload carried as the post content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MintPayload {
    pub protocol: String,
    pub operation: TokenOp,
    pub ticker: String,
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
}

impl MintPayload {
    /// Mint inscription with the run's fixed ticker and amount
    pub fn mint(protocol: &str, ticker: &str, amount: u64) -> Self {
        Self {
            protocol: protocol.to_string(),
            operation: TokenOp::Mint,
            ticker: ticker.to_string(),
            amount: amount.to_string(),
            to: None,
            wallet: None,
        }
    }

    /// Wallet-link inscription
    pub fn link(protocol: &str, ticker: &str, wallet: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            operation: TokenOp::Link,
            ticker: ticker.to_string(),
            amount: "0".to_string(),
            to: None,
            wallet: Some(wallet.to_string()),
        }
    }

    /// Transfer inscription to a named recipient
    pub fn transfer(protocol: &str, ticker: &str, amount: u64, to: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            operation: TokenOp::Transfer,
            ticker: ticker.to_string(),
            amount: amount.to_string(),
            to: Some(to.to_string()),
            wallet: None,
        }
    }

    /// Serialize as post content
    pub fn to_content(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Build a post title carrying a short random tag so individual posts can
/// be traced and deduplicated later.
pub fn post_title(op: TokenOp, ticker: &str) -> String {
    let tag: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{} {} [{}]", op, ticker, tag.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_payload_serializes_without_optional_fields() {
        let payload = MintPayload::mint("molt-20", "MOLT", 1000);
        let content = payload.to_content().unwrap();

        assert!(content.contains(r#""operation":"mint""#));
        assert!(content.contains(r#""ticker":"MOLT""#));
        assert!(content.contains(r#""amount":"1000""#));
        assert!(!content.contains("\"to\""));
        assert!(!content.contains("wallet"));
    }

    #[test]
    fn test_link_payload_carries_wallet() {
        let payload = MintPayload::link("molt-20", "MOLT", "molt1qxyz");
        let content = payload.to_content().unwrap();

        assert!(content.contains(r#""operation":"link""#));
        assert!(content.contains(r#""wallet":"molt1qxyz""#));
    }

    #[test]
    fn test_transfer_payload_carries_recipient() {
        let payload = MintPayload::transfer("molt-20", "MOLT", 250, "Alpha");
        let content = payload.to_content().unwrap();

        assert!(content.contains(r#""operation":"transfer""#));
        assert!(content.contains(r#""amount":"250""#));
        assert!(content.contains(r#""to":"Alpha""#));
    }

    #[test]
    fn test_payload_round_trip() {
        let payload = MintPayload::transfer("molt-20", "MOLT", 42, "Beta");
        let content = payload.to_content().unwrap();
        let parsed: MintPayload = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_post_title_embeds_tag() {
        let title = post_title(TokenOp::Mint, "MOLT");
        assert!(title.starts_with("mint MOLT ["));
        assert!(title.ends_with(']'));

        // tag between the brackets is six alphanumeric chars
        let tag = title.split('[').nth(1).unwrap().trim_end_matches(']');
        assert_eq!(tag.len(), 6);
        assert!(tag.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_post_titles_vary() {
        let a = post_title(TokenOp::Mint, "MOLT");
        let b = post_title(TokenOp::Mint, "MOLT");
        // six random alphanumeric chars make collisions vanishingly rare
        assert_ne!(a, b);
    }
}
