use chrono::prelude::*;
use clap::Args;
use raspadinha_core::Money;
use serde::{Deserialize, Serialize};
use yew::prelude::*;

use crate::backend::{self, Backend, BackendHandle, DemoBackend, HttpBackend};
use crate::config::{CardCatalog, CardType};
use crate::scratch_modal::ScratchModal;
use crate::utils::*;

const HISTORY_LEN: usize = 10;

#[derive(Args, Properties, Debug, Clone, PartialEq)]
pub(crate) struct AppProps {
    /// Base URL of the hosted backend functions
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Play against the in-browser demo dealer
    #[arg(long)]
    pub demo: bool,

    /// Test mode: every dealt card wins (true) or loses (false)
    #[arg(long)]
    pub forced_win: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct Preferences {
    card_type: Option<String>,
}

impl StorageKey for Preferences {
    const KEY: &'static str = "raspadinha:preferences";
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct RoundRecord {
    played_at: DateTime<Utc>,
    card: String,
    won: bool,
}

/// Most recent rounds first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
struct History(Vec<RoundRecord>);

impl StorageKey for History {
    const KEY: &'static str = "raspadinha:history";
}

impl History {
    fn record(&mut self, record: RoundRecord) {
        self.0.insert(0, record);
        self.0.truncate(HISTORY_LEN);
    }
}

pub(crate) enum Msg {
    Session(backend::Result<bool>),
    Wallet(backend::Result<Money>),
    Open(String),
    Close,
    AddBalance,
    Balance(Money),
    SessionLost,
    Finished(bool),
}

pub(crate) struct App {
    catalog: CardCatalog,
    backend: BackendHandle,
    preferences: Preferences,
    history: History,
    authenticated: bool,
    balance: Money,
    modal_open: bool,
    notice: Option<String>,
}

impl App {
    fn refresh(ctx: &Context<Self>, backend: &BackendHandle) {
        let session = backend.clone();
        ctx.link()
            .send_future(async move { Msg::Session(session.session().await) });
        let wallet = backend.clone();
        ctx.link()
            .send_future(async move { Msg::Wallet(wallet.wallet().await) });
    }

    fn selected(&self) -> Option<&CardType> {
        self.catalog
            .find_or_first(self.preferences.card_type.as_deref())
    }

    fn card_view(&self, ctx: &Context<Self>, card: &CardType) -> Html {
        let id = card.id.clone();
        let onclick = ctx.link().callback(move |_: MouseEvent| Msg::Open(id.clone()));
        let selected = self.preferences.card_type.as_deref() == Some(card.id.as_str());
        html! {
            <li key={card.id.clone()} class={classes!("card-type", selected.then_some("selected"))}>
                <button {onclick} style={format!("background-color: {}", card.cover_color)}>
                    <img src={card.cover_image.clone()} alt=""/>
                    <strong>{card.name.clone()}</strong>
                    <span class="price">{card.price.to_string()}</span>
                </button>
            </li>
        }
    }

    fn history_view(&self) -> Html {
        if self.history.0.is_empty() {
            return html! {};
        }
        html! {
            <section class="history">
                <h4>{"Últimas rodadas"}</h4>
                <ul>
                    { for self.history.0.iter().map(|record| html! {
                        <li class={if record.won { "won" } else { "lost" }}>
                            <time datetime={record.played_at.to_rfc3339()}>
                                {record.played_at.format("%d/%m %H:%M").to_string()}
                            </time>
                            {format!(" {} ", record.card)}
                            <span>{if record.won { "Ganhou" } else { "Não ganhou" }}</span>
                        </li>
                    }) }
                </ul>
            </section>
        }
    }
}

impl Component for App {
    type Message = Msg;
    type Properties = AppProps;

    fn create(ctx: &Context<Self>) -> Self {
        let props = ctx.props();
        let catalog = CardCatalog::embedded();
        let backend = match (&props.backend, props.demo) {
            (Some(url), false) => {
                log::info!("using backend at {url}");
                Backend::Http(HttpBackend::new(url.as_str()))
            }
            _ => {
                log::info!("using the demo dealer");
                Backend::Demo(DemoBackend::new(catalog.clone()))
            }
        };
        if let Some(forced_win) = props.forced_win {
            log::warn!("test mode: every card is dealt with forced_win={forced_win}");
        }
        let backend = BackendHandle::new(backend);
        Self::refresh(ctx, &backend);

        Self {
            catalog,
            backend,
            preferences: LocalOrDefault::local_or_default(),
            history: LocalOrDefault::local_or_default(),
            authenticated: false,
            balance: Money::ZERO,
            modal_open: false,
            notice: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Session(Ok(authenticated)) => {
                log::debug!("authenticated: {authenticated}");
                self.authenticated = authenticated;
            }
            Msg::Session(Err(err)) => {
                log::error!("session lookup failed: {err}");
                self.authenticated = false;
            }
            Msg::Wallet(Ok(balance)) => {
                log::debug!("balance: {balance}");
                self.balance = balance;
            }
            Msg::Wallet(Err(err)) => {
                log::error!("balance lookup failed: {err}");
                self.notice = Some(err.to_string());
            }
            Msg::Open(card_type) => {
                self.preferences.card_type = Some(card_type);
                self.preferences.local_save();
                self.notice = None;
                self.modal_open = true;
            }
            Msg::Close => {
                self.modal_open = false;
                Self::refresh(ctx, &self.backend);
            }
            Msg::AddBalance => match self.backend.demo_deposit() {
                Some(balance) => {
                    log::info!("demo deposit, balance now {balance}");
                    self.balance = balance;
                }
                None => {
                    self.notice = Some("Faça um depósito via PIX na sua carteira para continuar.".into());
                }
            },
            Msg::Balance(balance) => self.balance = balance,
            Msg::SessionLost => {
                log::warn!("session expired");
                self.authenticated = false;
            }
            Msg::Finished(won) => {
                let card = self.selected().map(|card| card.name.clone()).unwrap_or_default();
                self.history.record(RoundRecord {
                    played_at: utc_now(),
                    card,
                    won,
                });
                self.history.local_save();
            }
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let link = ctx.link();
        let wallet = if self.authenticated {
            format!("Saldo: {}", self.balance)
        } else {
            "Entre para ver seu saldo".to_string()
        };
        let demo = matches!(*self.backend, Backend::Demo(_));

        let modal = self.selected().map(|card_type| {
            html! {
                <ScratchModal
                    open={self.modal_open}
                    card_type={card_type.clone()}
                    backend={self.backend.clone()}
                    authenticated={self.authenticated}
                    balance={self.balance}
                    forced_win={ctx.props().forced_win}
                    detector={self.catalog.detector.clone()}
                    presentation={self.catalog.presentation.clone()}
                    on_close={link.callback(|()| Msg::Close)}
                    on_add_balance={link.callback(|()| Msg::AddBalance)}
                    on_balance={link.callback(Msg::Balance)}
                    on_session_lost={link.callback(|()| Msg::SessionLost)}
                    on_finished={link.callback(Msg::Finished)}
                />
            }
        });

        html! {
            <main class="raspadinha">
                <header>
                    <h1>{"Raspadinhas"}</h1>
                    <span class="wallet">{wallet}</span>
                    if demo {
                        <small class="demo">{"modo demonstração"}</small>
                    }
                </header>
                if let Some(notice) = &self.notice {
                    <p class="notice" role="alert">{notice.clone()}</p>
                }
                <ul class="card-types">
                    { for self.catalog.cards.iter().map(|card| self.card_view(ctx, card)) }
                </ul>
                {self.history_view()}
                {modal}
            </main>
        }
    }
}
