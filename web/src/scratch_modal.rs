use gloo::timers::callback::Interval;
use raspadinha_core::*;
use raspadinha_protocol::{DealRequest, SettleRequest, SettleResponse};
use web_time::Instant;
use yew::prelude::*;

use crate::action_button::ActionButton;
use crate::backend::{self, BackendError, BackendHandle};
use crate::config::CardType;
use crate::scratch_canvas::{CoverArt, ScratchCanvas};
use crate::utils::{Modal, js_random_seed};

const PRESENTATION_TICK_MILLIS: u32 = 50;
const CONFETTI_PIECES: usize = 24;

#[derive(Properties, Clone, PartialEq)]
pub(crate) struct ScratchModalProps {
    pub open: bool,
    pub card_type: CardType,
    pub backend: BackendHandle,
    pub authenticated: bool,
    pub balance: Money,
    #[prop_or_default]
    pub forced_win: Option<bool>,
    #[prop_or_default]
    pub detector: DetectorConfig,
    #[prop_or_default]
    pub presentation: PresentationConfig,
    pub on_close: Callback<()>,
    pub on_add_balance: Callback<()>,
    pub on_balance: Callback<Money>,
    pub on_session_lost: Callback<()>,
    /// A round reached success (`true`) or fail (`false`).
    #[prop_or_default]
    pub on_finished: Callback<bool>,
}

impl ScratchModalProps {
    fn action_context(&self) -> ActionContext {
        ActionContext {
            authenticated: self.authenticated,
            balance: self.balance,
            price: self.card_type.price,
        }
    }
}

pub(crate) enum Msg {
    Primary,
    Dealt(backend::Result<ScratchCard>),
    Detector(DetectorEvent),
    Settled(RoundId, backend::Result<SettleResponse>),
    Resolved(backend::Result<Money>),
    Tick,
    DismissResult,
    Close,
}

/// Dialog hosting one card type: deals, lets the player scratch, charges
/// the round and presents the result.
pub(crate) struct ScratchModal {
    machine: ScratchMachine,
    orchestrator: RoundOrchestrator,
    card: Option<ScratchCard>,
    round: u64,
    reveal_token: u32,
    reported: Option<RoundId>,
    ticker: Option<Interval>,
}

impl ScratchModal {
    fn run(&mut self, ctx: &Context<Self>, command: Command) {
        log::trace!("command: {command:?}");
        match command {
            Command::None => {}
            Command::RequestDeal => self.request_deal(ctx),
            Command::Replay => {
                self.clear_round();
                self.request_deal(ctx);
            }
            Command::ForceReveal => self.reveal_token = self.reveal_token.wrapping_add(1),
            Command::AddBalance => ctx.props().on_add_balance.emit(()),
            Command::Settle(round) => self.request_settle(ctx, round),
        }
    }

    fn request_deal(&mut self, ctx: &Context<Self>) {
        let props = ctx.props();
        let backend = props.backend.clone();
        let request = DealRequest {
            card_type: props.card_type.id.clone(),
            forced_win: props.forced_win,
        };
        log::debug!("requesting a {} card", request.card_type);
        ctx.link()
            .send_future(async move { Msg::Dealt(backend.deal(&request).await) });
    }

    fn request_settle(&mut self, ctx: &Context<Self>, round: RoundId) {
        let Some(card) = self.card.as_ref() else {
            log::error!("settlement requested for {round} without a card");
            return;
        };
        let props = ctx.props();
        let backend = props.backend.clone();
        let request = SettleRequest::new(props.card_type.id.clone(), card, round);
        log::debug!("settling {round}");
        ctx.link()
            .send_future(async move { Msg::Settled(round, backend.settle(&request).await) });
    }

    fn report(&mut self, ctx: &Context<Self>, err: &BackendError) {
        if *err == BackendError::Unauthenticated {
            ctx.props().on_session_lost.emit(());
        }
        self.orchestrator.on_error(err.to_string(), Instant::now());
    }

    fn verdict(result: Result<bool>) -> bool {
        result.unwrap_or_else(|err| {
            log::error!("result arrived without a round: {err}");
            false
        })
    }

    /// Once per round, on reaching success or fail: reports the verdict and
    /// refreshes the balance, which now includes any payout.
    fn report_finished(&mut self, ctx: &Context<Self>) {
        let state = self.machine.state();
        let Some(round) = self.machine.round() else {
            return;
        };
        if !state.is_finished() || self.reported == Some(round) {
            return;
        }
        self.reported = Some(round);
        ctx.props().on_finished.emit(state == GameState::Success);

        let backend = ctx.props().backend.clone();
        let key = round.to_string();
        ctx.link()
            .send_future(async move { Msg::Resolved(backend.resolve(&key).await) });
    }

    fn ensure_ticker(&mut self, ctx: &Context<Self>) {
        if !self.orchestrator.is_pending() {
            self.ticker = None;
        } else if self.ticker.is_none() {
            let link = ctx.link().clone();
            self.ticker = Some(Interval::new(PRESENTATION_TICK_MILLIS, move || {
                link.send_message(Msg::Tick)
            }));
        }
    }

    /// Drops the presentation of the previous round.
    fn clear_round(&mut self) {
        self.orchestrator.close();
        self.card = None;
        self.round += 1;
        self.ticker = None;
    }

    fn reset(&mut self) {
        self.machine.reset();
        self.clear_round();
    }

    fn presentation_view(&self, ctx: &Context<Self>) -> Html {
        let Some(presentation) = self.orchestrator.visible() else {
            return html! {};
        };
        match presentation {
            Presentation::WinModal { prize, symbol } => {
                let dismiss = ctx.link().callback(|_: MouseEvent| Msg::DismissResult);
                let body = match prize {
                    PrizeKind::Money(amount) => html! {
                        <>
                            <h2>{format!("Você ganhou {amount}!")}</h2>
                            <p>{"O valor foi creditado no seu saldo."}</p>
                        </>
                    },
                    PrizeKind::Item(item) => html! {
                        <>
                            <img class="prize" src={item.image_ref.clone()} alt={item.name.clone()}/>
                            <h2>{format!("Você ganhou {}!", item.name)}</h2>
                            <p>{format!("Valor estimado: {}", item.base_value)}</p>
                        </>
                    },
                };
                html! {
                    <div class="result win" data-symbol={symbol.clone()}>
                        {confetti()}
                        <article>
                            {body}
                            <footer><button onclick={dismiss}>{"Continuar"}</button></footer>
                        </article>
                    </div>
                }
            }
            Presentation::TryAgainToast => html! {
                <div class="toast" role="status">{"Não foi dessa vez. Tente de novo!"}</div>
            },
            Presentation::ErrorToast(message) => html! {
                <div class="toast error" role="alert">{message.clone()}</div>
            },
        }
    }
}

fn confetti() -> Html {
    html! {
        <div class="confetti" aria-hidden="true">
            { for (0..CONFETTI_PIECES).map(|i| html! { <i style={format!("--i: {i}")}/> }) }
        </div>
    }
}

impl Component for ScratchModal {
    type Message = Msg;
    type Properties = ScratchModalProps;

    fn create(ctx: &Context<Self>) -> Self {
        let props = ctx.props();
        let mut machine = ScratchMachine::new(js_random_seed());
        machine.refresh_lock(&props.action_context());
        Self {
            machine,
            orchestrator: RoundOrchestrator::new(props.presentation.clone()),
            card: None,
            round: 0,
            reveal_token: 0,
            reported: None,
            ticker: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Primary => {
                let command = self.machine.primary_action(&ctx.props().action_context());
                self.run(ctx, command);
            }
            Msg::Dealt(Ok(card)) => {
                if self.machine.deal_received() {
                    self.orchestrator.start_round(card.clone());
                    self.card = Some(card);
                    self.round += 1;
                } else {
                    log::debug!("dropping card dealt after the dialog moved on");
                }
            }
            Msg::Dealt(Err(err)) => {
                self.machine.deal_failed();
                self.report(ctx, &err);
            }
            Msg::Detector(event) => {
                let now = Instant::now();
                let command = match event {
                    DetectorEvent::ScratchStarted => self.machine.scratch_started(),
                    DetectorEvent::RevealStarted(reason) => {
                        log::debug!("reveal started ({reason:?})");
                        self.machine.reveal_started()
                    }
                    DetectorEvent::WinDetected { symbol, cells } => {
                        log::debug!("triple of {symbol} at {cells:?}");
                        Command::None
                    }
                    DetectorEvent::Won { symbol } => {
                        let won = Self::verdict(self.orchestrator.on_win(&symbol, now));
                        self.machine.reveal_finished(won)
                    }
                    DetectorEvent::Completed => {
                        let won = Self::verdict(self.orchestrator.on_complete(now));
                        self.machine.reveal_finished(won)
                    }
                    _ => return false,
                };
                self.run(ctx, command);
            }
            Msg::Settled(round, Ok(response)) => {
                if response.replayed {
                    log::info!("settlement {round} was already applied");
                }
                // the new balance is shown once the round is presented
                log::debug!("{round} settled, balance {}", response.balance);
                self.machine.settle_confirmed(round);
            }
            Msg::Settled(round, Err(err)) => {
                self.machine.settle_failed(round);
                if err == BackendError::Unauthenticated {
                    ctx.props().on_session_lost.emit(());
                }
                self.orchestrator.void(err.to_string(), Instant::now());
            }
            Msg::Resolved(Ok(balance)) => {
                ctx.props().on_balance.emit(balance);
                return false;
            }
            Msg::Resolved(Err(err)) => {
                log::error!("balance refresh failed: {err}");
                return false;
            }
            Msg::Tick => {
                let changed = self.orchestrator.tick(Instant::now());
                self.ensure_ticker(ctx);
                return changed;
            }
            Msg::DismissResult => self.orchestrator.dismiss(),
            Msg::Close => {
                self.reset();
                ctx.props().on_close.emit(());
            }
        }
        self.report_finished(ctx);
        self.ensure_ticker(ctx);
        true
    }

    fn changed(&mut self, ctx: &Context<Self>, old_props: &Self::Properties) -> bool {
        let props = ctx.props();
        if (old_props.open && !props.open) || props.card_type != old_props.card_type {
            self.reset();
        }
        if props.presentation != old_props.presentation {
            self.orchestrator = RoundOrchestrator::new(props.presentation.clone());
        }
        self.machine.refresh_lock(&props.action_context());
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let props = ctx.props();
        if !props.open {
            return html! {};
        }

        let context = props.action_context();
        let cover = CoverArt {
            image: props.card_type.cover_image.clone().into(),
            color: props.card_type.cover_color.clone().into(),
        };
        let close = ctx.link().callback(|_: MouseEvent| Msg::Close);

        html! {
            <Modal>
                <dialog class="scratch-modal" open={true}>
                    <article>
                        <header>
                            <button class="close" aria-label="Fechar" onclick={close}/>
                            <h3>{props.card_type.name.clone()}</h3>
                            <p class="balance">{format!("Saldo: {}", props.balance)}</p>
                        </header>
                        <ScratchCanvas
                            card={self.card.clone()}
                            round={self.round}
                            {cover}
                            reveal_token={self.reveal_token}
                            config={props.detector.clone()}
                            on_event={ctx.link().callback(Msg::Detector)}
                        />
                        <ActionButton
                            affordance={self.machine.affordance()}
                            enabled={self.machine.is_enabled()}
                            price={props.card_type.price}
                            shortfall={context.shortfall()}
                            onclick={ctx.link().callback(|()| Msg::Primary)}
                        />
                        {self.presentation_view(ctx)}
                    </article>
                </dialog>
            </Modal>
        }
    }
}
