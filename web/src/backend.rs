use std::cell::RefCell;
use std::rc::Rc;

use gloo::net::http::{Request, RequestBuilder, Response};
use hashbrown::{HashMap, HashSet};
use raspadinha_core::{CardGenerator, Money, PrizeKind, RandomCardGenerator, ScratchCard};
use raspadinha_protocol::*;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::config::CardCatalog;
use crate::utils::{LocalOrDefault, StorageKey, js_random_seed};

/// Starting balance of a fresh demo wallet.
const DEMO_STARTING_BALANCE: Money = Money::from_cents(5000);
/// What "add balance" credits in demo mode.
pub(crate) const DEMO_DEPOSIT: Money = Money::from_cents(2000);

#[derive(Error, Debug, Clone, PartialEq)]
pub(crate) enum BackendError {
    #[error("Falha de rede: {0}")]
    Network(String),
    #[error("Resposta inesperada do servidor ({0})")]
    Status(u16),
    #[error("Resposta inválida do servidor: {0}")]
    Decode(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("Saldo insuficiente")]
    InsufficientBalance,
    #[error("Faça login para jogar")]
    Unauthenticated,
    #[error("Tipo de raspadinha desconhecido: {0}")]
    UnknownCard(String),
}

impl From<gloo::net::Error> for BackendError {
    fn from(err: gloo::net::Error) -> Self {
        match err {
            gloo::net::Error::SerdeError(err) => Self::Decode(err.to_string()),
            err => Self::Network(err.to_string()),
        }
    }
}

pub(crate) type Result<T> = core::result::Result<T, BackendError>;

/// Maps a non-2xx status and its optional error body.
fn rejection(status: u16, body: Option<ErrorBody>) -> BackendError {
    match (status, body) {
        (401, _) => BackendError::Unauthenticated,
        (402, _) => BackendError::InsufficientBalance,
        (status, Some(body)) => ProtocolError::Rejected {
            status,
            message: body.error,
        }
        .into(),
        (status, None) => BackendError::Status(status),
    }
}

#[derive(Serialize, Deserialize, Default)]
struct AccessToken(Option<String>);

impl StorageKey for AccessToken {
    const KEY: &'static str = "raspadinha:access_token";
}

/// Hosted deal/settle/wallet/session functions.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HttpBackend {
    base_url: String,
}

impl HttpBackend {
    pub(crate) fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match AccessToken::local_or_default().0 {
            Some(token) => builder.header("Authorization", &format!("Bearer {token}")),
            None => builder,
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.ok() {
            let status = response.status();
            let body = response.json::<ErrorBody>().await.ok();
            let err = rejection(status, body);
            log::warn!("backend rejected request: {err}");
            return Err(err);
        }
        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        log::debug!("GET {path}");
        let response = self.authorize(Request::get(&self.url(path))).send().await?;
        Self::decode(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        log::debug!("POST {path}");
        let response = self
            .authorize(Request::post(&self.url(path)))
            .json(body)?
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct DemoWallet {
    balance: Money,
    /// Idempotency keys already charged.
    #[serde(default)]
    settled: HashSet<String>,
    /// Cash prizes of charged rounds, paid out once the round resolves.
    #[serde(default)]
    unpaid: HashMap<String, Money>,
}

impl Default for DemoWallet {
    fn default() -> Self {
        Self {
            balance: DEMO_STARTING_BALANCE,
            settled: HashSet::new(),
            unpaid: HashMap::new(),
        }
    }
}

impl StorageKey for DemoWallet {
    const KEY: &'static str = "raspadinha:demo_wallet";
}

impl DemoWallet {
    /// Charges `price` once per key. A cash prize is held until `resolve`.
    fn settle(&mut self, key: &str, price: Money, prize: Option<Money>) -> Result<SettleResponse> {
        if self.settled.contains(key) {
            log::debug!("settlement {key} replayed");
            return Ok(SettleResponse {
                balance: self.balance,
                replayed: true,
            });
        }
        if self.balance < price {
            return Err(BackendError::InsufficientBalance);
        }
        self.balance = self.balance - price;
        self.settled.insert(key.to_string());
        if let Some(prize) = prize {
            self.unpaid.insert(key.to_string(), prize);
        }
        Ok(SettleResponse {
            balance: self.balance,
            replayed: false,
        })
    }

    /// Pays out the prize held for `key`, at most once.
    fn resolve(&mut self, key: &str) -> Money {
        if let Some(prize) = self.unpaid.remove(key) {
            log::debug!("paying {prize} for {key}");
            self.balance = self.balance + prize;
        }
        self.balance
    }
}

/// In-browser dealer and wallet, for playing without a backend.
#[derive(Debug)]
pub(crate) struct DemoBackend {
    catalog: CardCatalog,
    wallet: RefCell<DemoWallet>,
}

impl DemoBackend {
    pub(crate) fn new(catalog: CardCatalog) -> Self {
        Self {
            catalog,
            wallet: RefCell::new(DemoWallet::local_or_default()),
        }
    }

    fn deal(&self, request: &DealRequest) -> Result<ScratchCard> {
        let card_type = self
            .catalog
            .find(&request.card_type)
            .ok_or_else(|| BackendError::UnknownCard(request.card_type.clone()))?;
        let card = RandomCardGenerator::new(js_random_seed(), request.forced_win)
            .generate(&card_type.symbols)
            .map_err(ProtocolError::from)?;
        log::debug!("demo dealt {} (win: {})", card_type.id, card.has_win());
        Ok(card)
    }

    fn settle(&self, request: &SettleRequest) -> Result<SettleResponse> {
        let card_type = self
            .catalog
            .find(&request.card_type)
            .ok_or_else(|| BackendError::UnknownCard(request.card_type.clone()))?;
        let card =
            ScratchCard::settled_locally(request.symbols.clone()).map_err(ProtocolError::from)?;
        let prize = card
            .winning_symbol()
            .and_then(|symbol| match PrizeKind::classify(symbol) {
                PrizeKind::Money(amount) => Some(amount),
                PrizeKind::Item(_) => None,
            });

        let mut wallet = self.wallet.borrow_mut();
        let response = wallet.settle(&request.idempotency_key, card_type.price, prize)?;
        wallet.local_save();
        Ok(response)
    }

    fn resolve(&self, key: &str) -> Money {
        let mut wallet = self.wallet.borrow_mut();
        let balance = wallet.resolve(key);
        wallet.local_save();
        balance
    }

    fn deposit(&self, amount: Money) -> Money {
        let mut wallet = self.wallet.borrow_mut();
        wallet.balance = wallet.balance + amount;
        wallet.local_save();
        wallet.balance
    }
}

#[derive(Debug)]
pub(crate) enum Backend {
    Http(HttpBackend),
    Demo(DemoBackend),
}

impl Backend {
    pub(crate) async fn deal(&self, request: &DealRequest) -> Result<ScratchCard> {
        match self {
            Backend::Http(http) => {
                let response: DealResponse = http.post(DEAL_PATH, request).await?;
                Ok(response.into_card()?)
            }
            Backend::Demo(demo) => demo.deal(request),
        }
    }

    pub(crate) async fn settle(&self, request: &SettleRequest) -> Result<SettleResponse> {
        match self {
            Backend::Http(http) => http.post(SETTLE_PATH, request).await,
            Backend::Demo(demo) => demo.settle(request),
        }
    }

    pub(crate) async fn wallet(&self) -> Result<Money> {
        match self {
            Backend::Http(http) => {
                let response: WalletResponse = http.get(WALLET_PATH).await?;
                Ok(response.balance)
            }
            Backend::Demo(demo) => Ok(demo.wallet.borrow().balance),
        }
    }

    /// The round keyed `idempotency_key` has been presented; returns the
    /// balance including its payout. The hosted backend pays on its own, so
    /// this only reads the wallet there.
    pub(crate) async fn resolve(&self, idempotency_key: &str) -> Result<Money> {
        match self {
            Backend::Http(_) => self.wallet().await,
            Backend::Demo(demo) => Ok(demo.resolve(idempotency_key)),
        }
    }

    pub(crate) async fn session(&self) -> Result<bool> {
        match self {
            Backend::Http(http) => {
                let response: SessionResponse = http.get(SESSION_PATH).await?;
                Ok(response.is_authenticated())
            }
            Backend::Demo(_) => Ok(true),
        }
    }

    /// Credits the demo wallet; the hosted backend has no in-app deposit.
    pub(crate) fn demo_deposit(&self) -> Option<Money> {
        match self {
            Backend::Http(_) => None,
            Backend::Demo(demo) => Some(demo.deposit(DEMO_DEPOSIT)),
        }
    }
}

/// Shared handle to the backend, comparable by identity so it can live in
/// component properties.
#[derive(Debug, Clone)]
pub(crate) struct BackendHandle(Rc<Backend>);

impl BackendHandle {
    pub(crate) fn new(backend: Backend) -> Self {
        Self(Rc::new(backend))
    }
}

impl PartialEq for BackendHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl core::ops::Deref for BackendHandle {
    type Target = Backend;

    fn deref(&self) -> &Backend {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_errors() {
        assert_eq!(rejection(401, None), BackendError::Unauthenticated);
        assert_eq!(rejection(402, None), BackendError::InsufficientBalance);
        assert_eq!(rejection(500, None), BackendError::Status(500));
        assert_eq!(
            rejection(409, Some(ErrorBody { error: "card sold out".into() })),
            BackendError::Protocol(ProtocolError::Rejected {
                status: 409,
                message: "card sold out".into(),
            })
        );
    }

    #[test]
    fn demo_settlement_charges_once_per_key() {
        let mut wallet = DemoWallet::default();
        let price = Money::from_cents(1000);

        let first = wallet.settle("abc-0", price, None).unwrap();
        let replay = wallet.settle("abc-0", price, None).unwrap();

        assert_eq!(first.balance, Money::from_cents(4000));
        assert!(!first.replayed);
        assert_eq!(replay.balance, Money::from_cents(4000));
        assert!(replay.replayed);
    }

    #[test]
    fn demo_prize_is_paid_on_resolve_not_on_settle() {
        let mut wallet = DemoWallet::default();

        let response = wallet
            .settle("abc-1", Money::from_cents(1000), Some(Money::from_cents(5000)))
            .unwrap();
        assert_eq!(response.balance, Money::from_cents(4000));

        assert_eq!(wallet.resolve("abc-1"), Money::from_cents(9000));
        assert_eq!(wallet.resolve("abc-1"), Money::from_cents(9000));
        assert_eq!(wallet.resolve("unknown"), Money::from_cents(9000));
    }

    #[test]
    fn demo_settlement_needs_funds() {
        let mut wallet = DemoWallet {
            balance: Money::from_cents(500),
            ..DemoWallet::default()
        };

        assert_eq!(
            wallet.settle("abc-2", Money::from_cents(1000), None),
            Err(BackendError::InsufficientBalance)
        );
        assert_eq!(wallet.balance, Money::from_cents(500));
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let backend = HttpBackend::new("https://example.test/functions/v1/");
        assert_eq!(backend.url(DEAL_PATH), "https://example.test/functions/v1/deal");
    }
}
