use serde::{Deserialize, Serialize};
use web_time::{Duration, Instant};

use crate::*;

/// Item categories that pay out as wallet credit.
const CASH_CATEGORIES: &[&str] = &["dinheiro", "money", "cash", "pix"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub win_modal_delay: Duration,
    pub loss_toast_delay: Duration,
    pub toast_lifetime: Duration,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            win_modal_delay: Duration::from_millis(1200),
            loss_toast_delay: Duration::from_millis(600),
            toast_lifetime: Duration::from_millis(2500),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PrizeKind {
    Money(Money),
    Item(Symbol),
}

impl PrizeKind {
    pub fn classify(symbol: &Symbol) -> Self {
        let cash_category = symbol.category.as_deref().is_some_and(|category| {
            CASH_CATEGORIES
                .iter()
                .any(|cash| category.trim().eq_ignore_ascii_case(cash))
        });
        let cash_name = symbol.name.trim_start().starts_with("R$");

        if cash_category || cash_name {
            PrizeKind::Money(symbol.base_value)
        } else {
            PrizeKind::Item(symbol.clone())
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Presentation {
    WinModal { prize: PrizeKind, symbol: String },
    TryAgainToast,
    ErrorToast(String),
}

impl Presentation {
    pub fn is_toast(&self) -> bool {
        matches!(self, Self::TryAgainToast | Self::ErrorToast(_))
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Step {
    Show(Presentation),
    Expire,
}

/// Sequences the result presentation after the reveal animations and
/// reconciles the local verdict with the server's.
#[derive(Clone, Debug, Default)]
pub struct RoundOrchestrator {
    config: PresentationConfig,
    card: Option<ScratchCard>,
    resolved: Option<bool>,
    timeline: Timeline<Step>,
    visible: Option<Presentation>,
}

impl RoundOrchestrator {
    pub fn new(config: PresentationConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn start_round(&mut self, card: ScratchCard) {
        self.close();
        self.card = Some(card);
    }

    /// The detector's win callback fired. Returns the verdict that drives
    /// the round, which is always the server's.
    pub fn on_win(&mut self, symbol: &str, now: Instant) -> Result<bool> {
        if let Some(won) = self.resolved {
            return Ok(won);
        }
        let card = self.card.as_ref().ok_or(ScratchError::NoActiveCard)?;

        let presentation = if card.has_win() {
            let winner = card.find_symbol(symbol).or_else(|| card.winning_symbol());
            winner.map(|winner| Presentation::WinModal {
                prize: PrizeKind::classify(winner),
                symbol: winner.name.clone(),
            })
        } else {
            log::warn!("local triple on {symbol:?} but the server dealt a losing card");
            None
        };

        Ok(self.resolve(presentation, now))
    }

    /// The detector's completion (no triple) callback fired.
    pub fn on_complete(&mut self, now: Instant) -> Result<bool> {
        if let Some(won) = self.resolved {
            return Ok(won);
        }
        let card = self.card.as_ref().ok_or(ScratchError::NoActiveCard)?;

        let presentation = if card.has_win() {
            log::warn!("server dealt a winning card but no triple was revealed");
            card.winning_symbol()
                .or_else(|| card.symbols().iter().max_by_key(|s| s.base_value))
                .map(|winner| Presentation::WinModal {
                    prize: PrizeKind::classify(winner),
                    symbol: winner.name.clone(),
                })
        } else {
            None
        };

        Ok(self.resolve(presentation, now))
    }

    /// Shows an error notification right away.
    pub fn on_error(&mut self, message: impl Into<String>, now: Instant) {
        let message = message.into();
        log::error!("{message}");
        self.show(Presentation::ErrorToast(message), now);
    }

    /// The round was voided (settlement failed): cancels any pending result
    /// and reports the error instead. Later verdicts resolve as a loss.
    pub fn void(&mut self, message: impl Into<String>, now: Instant) {
        self.timeline.clear();
        self.resolved = Some(false);
        self.on_error(message, now);
    }

    /// Releases due presentations; returns whether anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        for step in self.timeline.due(now) {
            match step {
                Step::Show(presentation) => {
                    self.show(presentation, now);
                    changed = true;
                }
                Step::Expire => {
                    if self.visible.as_ref().is_some_and(Presentation::is_toast) {
                        self.visible = None;
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    pub fn visible(&self) -> Option<&Presentation> {
        self.visible.as_ref()
    }

    pub fn shows_confetti(&self) -> bool {
        matches!(self.visible, Some(Presentation::WinModal { .. }))
    }

    pub fn is_pending(&self) -> bool {
        !self.timeline.is_empty()
    }

    pub fn resolved(&self) -> Option<bool> {
        self.resolved
    }

    /// Hides the current result modal.
    pub fn dismiss(&mut self) {
        self.visible = None;
    }

    /// The parent dialog closed: drop everything, including pending steps.
    pub fn close(&mut self) {
        self.card = None;
        self.resolved = None;
        self.timeline.clear();
        self.visible = None;
    }

    fn resolve(&mut self, presentation: Option<Presentation>, now: Instant) -> bool {
        let won = presentation.is_some();
        self.resolved = Some(won);
        match presentation {
            Some(presentation) => {
                self.timeline.schedule_after(
                    now,
                    self.config.win_modal_delay,
                    Step::Show(presentation),
                );
            }
            None => {
                self.timeline.schedule_after(
                    now,
                    self.config.loss_toast_delay,
                    Step::Show(Presentation::TryAgainToast),
                );
            }
        }
        won
    }

    fn show(&mut self, presentation: Presentation, now: Instant) {
        if presentation.is_toast() {
            self.timeline
                .schedule_after(now, self.config.toast_lifetime, Step::Expire);
        }
        self.visible = Some(presentation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str) -> Symbol {
        Symbol::new(name, "", Rarity::Epic, Money::from_cents(5000))
    }

    fn card(winner: Option<Symbol>, has_win: bool) -> ScratchCard {
        let mut symbols: Vec<_> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|name| symbol(name))
            .collect();
        let third = winner.unwrap_or_else(|| symbol("g"));
        symbols.extend([third.clone(), third.clone(), third]);
        if !has_win {
            // break the triple so the card is a plain loser
            symbols[8] = symbol("h");
        }
        ScratchCard::new(symbols, has_win).unwrap()
    }

    #[test]
    fn classify_cash_by_category_or_name() {
        let pix = symbol("Bônus").with_category("PIX");
        let named = symbol("R$ 50");
        let phone = symbol("iPhone 15").with_category("eletrônicos");

        assert_eq!(PrizeKind::classify(&pix), PrizeKind::Money(Money::from_cents(5000)));
        assert_eq!(PrizeKind::classify(&named), PrizeKind::Money(Money::from_cents(5000)));
        assert_eq!(PrizeKind::classify(&phone), PrizeKind::Item(phone.clone()));
    }

    #[test]
    fn win_modal_appears_after_delay() {
        let mut orchestrator = RoundOrchestrator::default();
        orchestrator.start_round(card(Some(symbol("R$ 100")), true));
        let t0 = Instant::now();

        assert!(orchestrator.on_win("R$ 100", t0).unwrap());
        assert!(!orchestrator.tick(t0));
        assert_eq!(orchestrator.visible(), None);

        assert!(orchestrator.tick(t0 + PresentationConfig::default().win_modal_delay));
        assert!(matches!(
            orchestrator.visible(),
            Some(Presentation::WinModal { prize: PrizeKind::Money(_), symbol }) if symbol == "R$ 100"
        ));
        assert!(orchestrator.shows_confetti());
    }

    #[test]
    fn loss_toast_expires() {
        let config = PresentationConfig::default();
        let mut orchestrator = RoundOrchestrator::new(config.clone());
        orchestrator.start_round(card(None, false));
        let t0 = Instant::now();

        assert!(!orchestrator.on_complete(t0).unwrap());
        let shown_at = t0 + config.loss_toast_delay;
        orchestrator.tick(shown_at);
        assert_eq!(orchestrator.visible(), Some(&Presentation::TryAgainToast));

        orchestrator.tick(shown_at + config.toast_lifetime);
        assert_eq!(orchestrator.visible(), None);
    }

    #[test]
    fn server_verdict_overrides_local_triple() {
        let mut orchestrator = RoundOrchestrator::default();
        // three "g" on the card but the server says it lost
        let symbols = card(None, true).symbols().to_vec();
        orchestrator.start_round(ScratchCard::new(symbols, false).unwrap());
        let t0 = Instant::now();

        assert!(!orchestrator.on_win("g", t0).unwrap());
        orchestrator.tick(t0 + Duration::from_secs(2));
        assert_eq!(orchestrator.visible(), Some(&Presentation::TryAgainToast));
    }

    #[test]
    fn server_win_without_local_triple_still_pays() {
        let mut orchestrator = RoundOrchestrator::default();
        orchestrator.start_round(card(None, false));
        let mut symbols = orchestrator.card.as_ref().unwrap().symbols().to_vec();
        symbols[0].base_value = Money::from_cents(99_900);
        orchestrator.start_round(ScratchCard::new(symbols, true).unwrap());
        let t0 = Instant::now();

        assert!(orchestrator.on_complete(t0).unwrap());
        orchestrator.tick(t0 + Duration::from_secs(2));
        assert!(matches!(
            orchestrator.visible(),
            Some(Presentation::WinModal { symbol, .. }) if symbol == "a"
        ));
    }

    #[test]
    fn voided_round_never_shows_win() {
        let mut orchestrator = RoundOrchestrator::default();
        orchestrator.start_round(card(Some(symbol("x")), true));
        let t0 = Instant::now();

        assert!(orchestrator.on_win("x", t0).unwrap());
        orchestrator.void("Falha ao cobrar", t0);
        assert_eq!(
            orchestrator.visible(),
            Some(&Presentation::ErrorToast("Falha ao cobrar".into()))
        );

        assert!(!orchestrator.on_complete(t0).unwrap());
        orchestrator.tick(t0 + Duration::from_secs(10));
        assert!(!orchestrator.shows_confetti());
        assert_eq!(orchestrator.visible(), None);
    }

    #[test]
    fn verdict_is_reported_once_and_close_cancels_pending() {
        let mut orchestrator = RoundOrchestrator::default();
        orchestrator.start_round(card(Some(symbol("x")), true));
        let t0 = Instant::now();

        assert!(orchestrator.on_win("x", t0).unwrap());
        assert!(orchestrator.on_complete(t0).unwrap());
        assert!(orchestrator.is_pending());

        orchestrator.close();
        assert!(!orchestrator.tick(t0 + Duration::from_secs(10)));
        assert_eq!(orchestrator.visible(), None);
        assert_eq!(orchestrator.on_win("x", t0), Err(ScratchError::NoActiveCard));
    }
}
