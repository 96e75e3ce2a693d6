//! JSON bodies exchanged with the hosted backend functions.

use raspadinha_core::{Money, RoundId, ScratchCard, ScratchError, Symbol};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEAL_PATH: &str = "deal";
pub const SETTLE_PATH: &str = "settle";
pub const WALLET_PATH: &str = "wallet";
pub const SESSION_PATH: &str = "session";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Dealt card is invalid: {0}")]
    InvalidCard(#[from] ScratchError),
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

pub type Result<T> = core::result::Result<T, ProtocolError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealRequest {
    pub card_type: String,
    /// Test mode only: force the dealt outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_win: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealResponse {
    pub symbols: Vec<Symbol>,
    pub has_win: bool,
}

impl DealResponse {
    pub fn into_card(self) -> Result<ScratchCard> {
        Ok(ScratchCard::new(self.symbols, self.has_win)?)
    }
}

impl From<&ScratchCard> for DealResponse {
    fn from(card: &ScratchCard) -> Self {
        Self {
            symbols: card.symbols().to_vec(),
            has_win: card.has_win(),
        }
    }
}

/// Charges one round. Replaying the same `idempotency_key` must not charge
/// twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    pub card_type: String,
    pub symbols: Vec<Symbol>,
    pub idempotency_key: String,
}

impl SettleRequest {
    pub fn new(card_type: impl Into<String>, card: &ScratchCard, round: RoundId) -> Self {
        Self {
            card_type: card_type.into(),
            symbols: card.symbols().to_vec(),
            idempotency_key: round.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub balance: Money,
    /// True when the key had already been settled before.
    #[serde(default)]
    pub replayed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub balance: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(default)]
    pub user_id: Option<String>,
}

impl SessionResponse {
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Error body returned by the functions on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(alias = "message")]
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use raspadinha_core::Rarity;

    #[test]
    fn deal_request_omits_forced_win_outside_test_mode() {
        let request = DealRequest {
            card_type: "premium".into(),
            forced_win: None,
        };

        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"cardType":"premium"}"#
        );
    }

    #[test]
    fn deal_response_with_wrong_symbol_count_is_rejected() {
        let body = r#"{
            "symbols": [{"name": "Moeda", "imageRef": "/m.png", "rarity": "common", "baseValue": 1.5}],
            "hasWin": false
        }"#;

        let response: DealResponse = serde_json::from_str(body).unwrap();

        assert_eq!(
            response.into_card(),
            Err(ProtocolError::InvalidCard(ScratchError::InvalidSymbolCount(1)))
        );
    }

    #[test]
    fn settle_request_carries_round_as_idempotency_key() {
        let symbols = (0..9)
            .map(|i| Symbol::new(format!("s{i}"), "", Rarity::Common, Money::ZERO))
            .collect();
        let card = ScratchCard::new(symbols, false).unwrap();
        let round = RoundId { session: 0xabc, seq: 3 };

        let request = SettleRequest::new("basic", &card, round);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["idempotencyKey"], "0000000000000abc-3");
        assert_eq!(json["symbols"].as_array().map(Vec::len), Some(9));
    }

    #[test]
    fn error_body_accepts_message_alias() {
        let body: ErrorBody = serde_json::from_str(r#"{"message":"saldo insuficiente"}"#).unwrap();

        assert_eq!(body.error, "saldo insuficiente");
    }
}
