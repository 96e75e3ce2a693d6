use serde::{Deserialize, Serialize};
use web_time::{Duration, Instant};

use crate::*;

/// Colour of a cell that is part of the winning triple.
pub const HIGHLIGHT_COLOR: &str = "#facc15";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Clear fraction a cell has to exceed to count as revealed.
    pub reveal_threshold: f64,
    /// Overall progress (percent) that triggers the auto-reveal.
    pub auto_reveal_progress: u8,
    /// Minimum wall-clock gap between two coverage rechecks.
    pub recheck_interval: Duration,
    pub brush_radius: f64,
    pub samples_per_axis: u32,
    pub auto_fade: Duration,
    pub forced_fade: Duration,
    /// Delay between detecting a triple and highlighting it.
    pub highlight_delay: Duration,
    /// Delay between the highlight and the win callback.
    pub win_callback_delay: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            reveal_threshold: 0.6,
            auto_reveal_progress: 85,
            recheck_interval: Duration::from_millis(50),
            brush_radius: 25.0,
            samples_per_axis: DEFAULT_SAMPLES_PER_AXIS,
            auto_fade: Duration::from_millis(600),
            forced_fade: Duration::from_millis(250),
            highlight_delay: Duration::from_millis(400),
            win_callback_delay: Duration::from_millis(900),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PointerInput {
    Idle,
    Active { last: Point },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealReason {
    Auto,
    Forced,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CoverPhase {
    /// Cover art not painted yet, input is ignored.
    Loading,
    Covered,
    FadingOut {
        started: Instant,
        duration: Duration,
        reason: RevealReason,
    },
    Removed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalOutcome {
    Win { symbol: String },
    Loss,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DetectorEvent {
    /// First erasure of the round.
    ScratchStarted,
    CellRevealed(CellIndex),
    ProgressChanged(u8),
    RevealStarted(RevealReason),
    CoverRemoved,
    WinDetected { symbol: String, cells: CellSet },
    HighlightWinningCells { symbol: String, cells: CellSet },
    Won { symbol: String },
    /// Every cell is revealed and no symbol reached three.
    Completed,
}

/// Render model of one grid cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CellView<'a> {
    pub index: CellIndex,
    pub symbol: &'a Symbol,
    pub revealed: bool,
    pub highlighted: bool,
}

impl CellView<'_> {
    pub fn border_color(&self) -> &'static str {
        if self.highlighted {
            HIGHLIGHT_COLOR
        } else {
            self.symbol.rarity.border_color()
        }
    }
}

/// Owns all scratch state of the active card: which cells count as shown,
/// overall progress, the cover's phase and the once-only outcome guard.
#[derive(Clone, Debug)]
pub struct RevealDetector {
    config: DetectorConfig,
    sampler: CoverageSampler,
    card: Option<ScratchCard>,
    revealed: [bool; CELL_COUNT],
    highlighted: [bool; CELL_COUNT],
    progress: u8,
    cover: CoverPhase,
    cover_fallback: bool,
    input: PointerInput,
    scratched: bool,
    outcome: Option<LocalOutcome>,
    last_recheck: Option<Instant>,
    /// A stroke ended inside the throttle window; its tail is sampled by the
    /// first `recheck` at or after this instant.
    deferred_recheck: Option<Instant>,
    pending: Timeline<DetectorEvent>,
}

impl Default for RevealDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl RevealDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let sampler = CoverageSampler::new(config.samples_per_axis);
        Self {
            config,
            sampler,
            card: None,
            revealed: [false; CELL_COUNT],
            highlighted: [false; CELL_COUNT],
            progress: 0,
            cover: CoverPhase::Loading,
            cover_fallback: false,
            input: PointerInput::Idle,
            scratched: false,
            outcome: None,
            last_recheck: None,
            deferred_recheck: None,
            pending: Timeline::new(),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Drops every trace of the previous card, including scheduled effects.
    pub fn reset(&mut self) {
        self.card = None;
        self.revealed = [false; CELL_COUNT];
        self.highlighted = [false; CELL_COUNT];
        self.progress = 0;
        self.cover = CoverPhase::Loading;
        self.cover_fallback = false;
        self.input = PointerInput::Idle;
        self.scratched = false;
        self.outcome = None;
        self.last_recheck = None;
        self.deferred_recheck = None;
        self.pending.clear();
    }

    pub fn load_card(&mut self, card: ScratchCard) {
        self.reset();
        log::debug!(
            "card loaded: {:?} (server win: {})",
            card.symbols().iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            card.has_win()
        );
        self.card = Some(card);
    }

    pub fn card(&self) -> Option<&ScratchCard> {
        self.card.as_ref()
    }

    pub fn cover_loaded(&mut self) {
        if self.card.is_some() && matches!(self.cover, CoverPhase::Loading) {
            self.cover = CoverPhase::Covered;
        }
    }

    /// The renderer painted the solid fallback instead of the cover art.
    pub fn cover_failed(&mut self) {
        log::warn!("cover art failed to load, using solid fill");
        self.cover_fallback = true;
        self.cover_loaded();
    }

    pub fn uses_fallback_cover(&self) -> bool {
        self.cover_fallback
    }

    pub fn accepts_input(&self) -> bool {
        self.card.is_some() && matches!(self.cover, CoverPhase::Covered) && !self.is_fully_revealed()
    }

    pub fn begin_stroke<S: CoverSurface>(
        &mut self,
        surface: &mut S,
        point: Point,
        now: Instant,
    ) -> Vec<DetectorEvent> {
        let mut events = Vec::new();
        if !self.accepts_input() {
            return events;
        }
        self.input = PointerInput::Active { last: point };
        self.erase(surface, point, point, now, &mut events);
        events
    }

    pub fn continue_stroke<S: CoverSurface>(
        &mut self,
        surface: &mut S,
        point: Point,
        now: Instant,
    ) -> Vec<DetectorEvent> {
        let mut events = Vec::new();
        let PointerInput::Active { last } = self.input else {
            return events;
        };
        if !self.accepts_input() {
            self.input = PointerInput::Idle;
            return events;
        }
        self.input = PointerInput::Active { last: point };
        self.erase(surface, last, point, now, &mut events);
        events
    }

    /// Ends the stroke. Its tail is sampled right away when the throttle
    /// allows, otherwise once the interval has passed (see `recheck_due`).
    pub fn end_stroke(&mut self, source: &impl AlphaSource, now: Instant) -> Vec<DetectorEvent> {
        let mut events = Vec::new();
        if matches!(self.input, PointerInput::Idle) {
            return events;
        }
        self.input = PointerInput::Idle;
        if !self.accepts_input() {
            return events;
        }
        match self.throttled_until(now) {
            Some(at) => {
                log::trace!("stroke tail recheck deferred");
                self.deferred_recheck = Some(at);
            }
            None => self.recheck_inner(source, now, &mut events),
        }
        events
    }

    /// Throttled coverage recheck.
    pub fn recheck(&mut self, source: &impl AlphaSource, now: Instant) -> Vec<DetectorEvent> {
        let mut events = Vec::new();
        self.recheck_inner(source, now, &mut events);
        events
    }

    /// Whether a deferred stroke tail is waiting to be sampled at `now`.
    pub fn recheck_due(&self, now: Instant) -> bool {
        self.deferred_recheck.is_some_and(|at| now >= at)
    }

    /// Reveals everything right away and evaluates the card once. No-op when
    /// the card is already fully revealed.
    pub fn force_reveal(&mut self, now: Instant) -> Vec<DetectorEvent> {
        let mut events = Vec::new();
        if self.card.is_none() || self.is_fully_revealed() {
            return events;
        }

        log::debug!("forced reveal at {}%", self.progress);
        self.input = PointerInput::Idle;
        self.deferred_recheck = None;
        self.reveal_all(&mut events);
        if !matches!(self.cover, CoverPhase::Removed) {
            self.cover = CoverPhase::FadingOut {
                started: now,
                duration: self.config.forced_fade,
                reason: RevealReason::Forced,
            };
        }
        events.push(DetectorEvent::RevealStarted(RevealReason::Forced));
        self.evaluate(now, &mut events);
        events
    }

    /// Advances the fade-out and releases scheduled effects.
    pub fn tick(&mut self, now: Instant) -> Vec<DetectorEvent> {
        let mut events = Vec::new();

        if let CoverPhase::FadingOut {
            started,
            duration,
            reason,
        } = self.cover
        {
            if now.duration_since(started) >= duration {
                self.cover = CoverPhase::Removed;
                events.push(DetectorEvent::CoverRemoved);
                if reason == RevealReason::Auto {
                    self.reveal_all(&mut events);
                    self.evaluate(now, &mut events);
                }
            }
        }

        for event in self.pending.due(now) {
            if let DetectorEvent::HighlightWinningCells { cells, .. } = &event {
                for &index in cells {
                    self.highlighted[usize::from(index)] = true;
                }
            }
            events.push(event);
        }

        events
    }

    /// Whether `tick` (or a deferred `recheck`) still has work to do.
    pub fn is_animating(&self) -> bool {
        matches!(self.cover, CoverPhase::FadingOut { .. })
            || !self.pending.is_empty()
            || self.deferred_recheck.is_some()
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_revealed(&self, index: CellIndex) -> bool {
        self.revealed[usize::from(index)]
    }

    pub fn revealed(&self) -> &[bool; CELL_COUNT] {
        &self.revealed
    }

    pub fn is_fully_revealed(&self) -> bool {
        self.revealed.iter().all(|&revealed| revealed)
    }

    pub fn outcome(&self) -> Option<&LocalOutcome> {
        self.outcome.as_ref()
    }

    pub fn win_detected(&self) -> bool {
        matches!(self.outcome, Some(LocalOutcome::Win { .. }))
    }

    pub fn has_scratched(&self) -> bool {
        self.scratched
    }

    pub fn input(&self) -> PointerInput {
        self.input
    }

    pub fn cover_phase(&self) -> CoverPhase {
        self.cover
    }

    pub fn is_cover_visible(&self) -> bool {
        !matches!(self.cover, CoverPhase::Removed)
    }

    /// Linear opacity of the cover at `now`.
    pub fn cover_opacity(&self, now: Instant) -> f64 {
        match self.cover {
            CoverPhase::Loading | CoverPhase::Covered => 1.0,
            CoverPhase::FadingOut {
                started, duration, ..
            } => {
                if duration.is_zero() {
                    return 0.0;
                }
                let elapsed = now.duration_since(started).as_secs_f64();
                (1.0 - elapsed / duration.as_secs_f64()).clamp(0.0, 1.0)
            }
            CoverPhase::Removed => 0.0,
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = CellView<'_>> {
        self.card.iter().flat_map(move |card| {
            card.symbols()
                .iter()
                .zip(all_cells())
                .map(move |(symbol, index)| CellView {
                    index,
                    symbol,
                    revealed: self.revealed[usize::from(index)],
                    highlighted: self.highlighted[usize::from(index)],
                })
        })
    }

    fn erase<S: CoverSurface>(
        &mut self,
        surface: &mut S,
        from: Point,
        to: Point,
        now: Instant,
        events: &mut Vec<DetectorEvent>,
    ) {
        let radius = self.config.brush_radius;
        // stamp along the segment so fast strokes leave no gaps
        let step = (radius / 2.0).max(1.0);
        let distance = from.distance_squared(to).sqrt();
        let stamps = (distance / step).ceil().max(1.0) as u32;
        for i in 1..=stamps {
            let t = f64::from(i) / f64::from(stamps);
            let center = Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
            surface.erase_circle(center, radius);
        }

        if !self.scratched {
            self.scratched = true;
            events.push(DetectorEvent::ScratchStarted);
        }

        self.recheck_inner(&*surface, now, events);
    }

    /// When the throttle still blocks sampling at `now`, the instant it opens.
    fn throttled_until(&self, now: Instant) -> Option<Instant> {
        let open_at = self.last_recheck? + self.config.recheck_interval;
        (now < open_at).then_some(open_at)
    }

    fn recheck_inner(
        &mut self,
        source: &impl AlphaSource,
        now: Instant,
        events: &mut Vec<DetectorEvent>,
    ) {
        if !self.accepts_input() {
            self.deferred_recheck = None;
            return;
        }
        if self.throttled_until(now).is_some() {
            log::trace!("coverage recheck throttled");
            return;
        }
        self.last_recheck = Some(now);
        self.deferred_recheck = None;

        let report = match self.sampler.sample(source) {
            Ok(report) => report,
            Err(err) => {
                log::error!("coverage sampling failed: {err}");
                return;
            }
        };

        for index in all_cells() {
            let slot = &mut self.revealed[usize::from(index)];
            if !*slot && report.cell(index).exceeds(self.config.reveal_threshold) {
                *slot = true;
                log::debug!("cell {index} revealed");
                events.push(DetectorEvent::CellRevealed(index));
            }
        }

        let progress = report.progress_percent();
        if progress > self.progress {
            self.progress = progress;
            events.push(DetectorEvent::ProgressChanged(progress));
        }

        self.evaluate(now, events);

        // every cell can pass its threshold while overall progress stays lower
        let done = self.progress >= self.config.auto_reveal_progress || self.is_fully_revealed();
        if done && matches!(self.cover, CoverPhase::Covered) {
            log::debug!("auto reveal at {}%", self.progress);
            self.input = PointerInput::Idle;
            self.cover = CoverPhase::FadingOut {
                started: now,
                duration: self.config.auto_fade,
                reason: RevealReason::Auto,
            };
            events.push(DetectorEvent::RevealStarted(RevealReason::Auto));
        }
    }

    fn reveal_all(&mut self, events: &mut Vec<DetectorEvent>) {
        for index in all_cells() {
            let slot = &mut self.revealed[usize::from(index)];
            if !*slot {
                *slot = true;
                events.push(DetectorEvent::CellRevealed(index));
            }
        }
    }

    fn evaluate(&mut self, now: Instant, events: &mut Vec<DetectorEvent>) {
        if self.outcome.is_some() {
            return;
        }
        let Some(card) = &self.card else {
            return;
        };

        if let Some(symbol) = card.find_triple(&self.revealed) {
            let symbol = symbol.name.clone();
            let cells = card.positions_of(&symbol);
            log::info!("local win on {symbol:?} at {cells:?}");

            let highlight_at = now + self.config.highlight_delay;
            if card.has_win() {
                self.pending.schedule(
                    highlight_at,
                    DetectorEvent::HighlightWinningCells {
                        symbol: symbol.clone(),
                        cells: cells.clone(),
                    },
                );
            } else {
                log::warn!("not highlighting {symbol:?}, the server dealt a losing card");
            }
            self.pending.schedule(
                highlight_at + self.config.win_callback_delay,
                DetectorEvent::Won {
                    symbol: symbol.clone(),
                },
            );
            events.push(DetectorEvent::WinDetected {
                symbol: symbol.clone(),
                cells,
            });
            self.outcome = Some(LocalOutcome::Win { symbol });
        } else if self.is_fully_revealed() {
            log::info!("card completed without a triple");
            self.outcome = Some(LocalOutcome::Loss);
            events.push(DetectorEvent::Completed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: u32 = 300;
    const CELL: u32 = SIZE / 3;

    fn card(names: [&str; CELL_COUNT], has_win: bool) -> ScratchCard {
        let symbols = names
            .iter()
            .map(|name| Symbol::new(*name, "", Rarity::Rare, Money::from_cents(500)))
            .collect();
        ScratchCard::new(symbols, has_win).unwrap()
    }

    fn ready_detector(card: ScratchCard) -> RevealDetector {
        let mut detector = RevealDetector::default();
        detector.load_card(card);
        detector.cover_loaded();
        detector
    }

    fn clear_cell(mask: &mut AlphaMask, index: CellIndex) {
        let (col, row) = cell_coords(index);
        mask.clear_rect(u32::from(col) * CELL, u32::from(row) * CELL, CELL, CELL);
    }

    /// Clears 86% of the cover while keeping the bottom row under the
    /// reveal threshold (38 of 64 samples per cell).
    fn nearly_done(mask: &mut AlphaMask) {
        mask.clear_rect(0, 0, SIZE, 250);
        for col in 0..3 {
            mask.clear_rect(col * CELL, 250, 75, 12);
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn erasure_is_ignored_until_cover_loads() {
        let mut detector = RevealDetector::default();
        detector.load_card(card(["a", "b", "c", "d", "e", "f", "g", "h", "i"], false));
        let mut mask = AlphaMask::opaque(SIZE, SIZE);
        let t0 = Instant::now();

        let events = detector.begin_stroke(&mut mask, Point::new(50.0, 50.0), t0);

        assert!(events.is_empty());
        assert_eq!(mask.cleared_pixels(), 0);
        assert_eq!(detector.input(), PointerInput::Idle);
    }

    #[test]
    fn failed_cover_still_allows_play() {
        let mut detector = RevealDetector::default();
        detector.load_card(card(["a", "b", "c", "d", "e", "f", "g", "h", "i"], false));
        detector.cover_failed();

        assert!(detector.uses_fallback_cover());
        assert!(detector.accepts_input());
    }

    #[test]
    fn stroke_erases_and_reports_first_scratch_once() {
        let mut detector = ready_detector(card(["a", "b", "c", "d", "e", "f", "g", "h", "i"], false));
        let mut mask = AlphaMask::opaque(SIZE, SIZE);
        let t0 = Instant::now();

        let first = detector.begin_stroke(&mut mask, Point::new(50.0, 50.0), t0);
        let second = detector.continue_stroke(&mut mask, Point::new(250.0, 50.0), t0 + ms(100));

        assert_eq!(first.first(), Some(&DetectorEvent::ScratchStarted));
        assert!(!second.contains(&DetectorEvent::ScratchStarted));
        // the segment between the two points is erased too
        assert_eq!(mask.alpha_at(150, 50), 0);
        assert!(detector.has_scratched());
    }

    #[test]
    fn moves_without_active_pointer_do_nothing() {
        let mut detector = ready_detector(card(["a", "b", "c", "d", "e", "f", "g", "h", "i"], false));
        let mut mask = AlphaMask::opaque(SIZE, SIZE);

        let events = detector.continue_stroke(&mut mask, Point::new(50.0, 50.0), Instant::now());

        assert!(events.is_empty());
        assert_eq!(mask.cleared_pixels(), 0);
    }

    #[test]
    fn revealed_cells_never_revert() {
        let mut detector = ready_detector(card(["a", "b", "c", "d", "e", "f", "g", "h", "i"], false));
        let mut mask = AlphaMask::opaque(SIZE, SIZE);
        let t0 = Instant::now();
        clear_cell(&mut mask, 2);

        let events = detector.recheck(&mask, t0);
        assert!(events.contains(&DetectorEvent::CellRevealed(2)));

        // a fresh, fully opaque surface must not un-reveal anything
        let opaque = AlphaMask::opaque(SIZE, SIZE);
        let events = detector.recheck(&opaque, t0 + ms(60));

        assert!(detector.is_revealed(2));
        assert!(events.is_empty());
        assert_eq!(detector.progress(), 11);
    }

    #[test]
    fn rechecks_within_interval_are_skipped() {
        let mut detector = ready_detector(card(["a", "b", "c", "d", "e", "f", "g", "h", "i"], false));
        let mut mask = AlphaMask::opaque(SIZE, SIZE);
        let t0 = Instant::now();
        clear_cell(&mut mask, 0);
        detector.recheck(&mask, t0);

        clear_cell(&mut mask, 1);
        let skipped = detector.recheck(&mask, t0 + ms(20));
        assert!(skipped.is_empty());
        assert!(!detector.is_revealed(1));
        assert!(detector.revealed()[0]);

        let later = detector.recheck(&mask, t0 + ms(50));
        assert!(later.contains(&DetectorEvent::CellRevealed(1)));
    }

    #[test]
    fn end_stroke_defers_tail_until_throttle_opens() {
        let mut detector = ready_detector(card(["a", "b", "c", "d", "e", "f", "g", "h", "i"], false));
        let mut mask = AlphaMask::opaque(SIZE, SIZE);
        let t0 = Instant::now();
        detector.begin_stroke(&mut mask, Point::new(10.0, 10.0), t0);

        clear_cell(&mut mask, 4);
        let events = detector.end_stroke(&mask, t0 + ms(5));

        assert!(events.is_empty());
        assert_eq!(detector.input(), PointerInput::Idle);
        assert!(detector.is_animating());
        assert!(!detector.recheck_due(t0 + ms(20)));
        assert!(detector.recheck_due(t0 + ms(50)));

        let events = detector.recheck(&mask, t0 + ms(50));
        assert!(events.contains(&DetectorEvent::CellRevealed(4)));
        assert!(!detector.is_animating());
    }

    #[test]
    fn end_stroke_samples_at_once_when_throttle_is_open() {
        let mut detector = ready_detector(card(["a", "b", "c", "d", "e", "f", "g", "h", "i"], false));
        let mut mask = AlphaMask::opaque(SIZE, SIZE);
        let t0 = Instant::now();
        detector.begin_stroke(&mut mask, Point::new(10.0, 10.0), t0);

        clear_cell(&mut mask, 4);
        let events = detector.end_stroke(&mask, t0 + ms(80));

        assert!(events.contains(&DetectorEvent::CellRevealed(4)));
        assert!(!detector.recheck_due(t0 + Duration::from_secs(1)));
    }

    /// Counts pixel reads so sampling passes can be told apart.
    struct CountingMask {
        mask: AlphaMask,
        reads: core::cell::Cell<usize>,
    }

    impl AlphaSource for CountingMask {
        fn size(&self) -> (u32, u32) {
            self.mask.size()
        }

        fn alpha_at(&self, x: u32, y: u32) -> u8 {
            self.reads.set(self.reads.get() + 1);
            self.mask.alpha_at(x, y)
        }
    }

    impl CoverSurface for CountingMask {
        fn erase_circle(&mut self, center: Point, radius: f64) {
            self.mask.erase_circle(center, radius);
        }
    }

    #[test]
    fn rapid_taps_sample_once_per_interval() {
        let mut detector = ready_detector(card(["a", "b", "c", "d", "e", "f", "g", "h", "i"], false));
        let mut surface = CountingMask {
            mask: AlphaMask::opaque(SIZE, SIZE),
            reads: core::cell::Cell::new(0),
        };
        let t0 = Instant::now();

        for tap in 0..5u64 {
            let at = t0 + ms(tap * 2);
            detector.begin_stroke(&mut surface, Point::new(50.0 + tap as f64 * 40.0, 50.0), at);
            detector.end_stroke(&surface, at + ms(1));
        }

        let per_pass = CELL_COUNT * 64;
        assert_eq!(surface.reads.get(), per_pass);

        assert!(detector.recheck_due(t0 + ms(50)));
        detector.recheck(&surface, t0 + ms(50));
        assert_eq!(surface.reads.get(), 2 * per_pass);
    }

    #[test]
    fn all_cells_past_threshold_fade_out_below_auto_progress() {
        let mut detector = ready_detector(card(["a", "b", "c", "d", "e", "f", "g", "h", "i"], false));
        let mut mask = AlphaMask::opaque(SIZE, SIZE);
        let t0 = Instant::now();
        // left 70% of every cell: 48 of 64 samples, 75% overall
        for col in 0..3 {
            mask.clear_rect(col * CELL, 0, 70, SIZE);
        }

        let events = detector.recheck(&mask, t0);
        assert_eq!(detector.progress(), 75);
        assert!(detector.is_fully_revealed());
        assert!(events.contains(&DetectorEvent::Completed));
        assert!(events.contains(&DetectorEvent::RevealStarted(RevealReason::Auto)));

        let fade = detector.config().auto_fade;
        let events = detector.tick(t0 + fade);
        assert_eq!(events, vec![DetectorEvent::CoverRemoved]);
        assert!(!detector.is_cover_visible());
        assert_eq!(detector.cover_opacity(t0 + fade), 0.0);
    }

    #[test]
    fn local_triple_on_losing_card_is_not_highlighted() {
        let mut detector = ready_detector(card(
            ["gem", "gem", "gem", "a", "b", "c", "d", "e", "f"],
            false,
        ));
        let t0 = Instant::now();

        let events = detector.force_reveal(t0);
        assert!(events.iter().any(|e| matches!(e, DetectorEvent::WinDetected { .. })));

        let events = detector.tick(t0 + Duration::from_secs(5));
        assert!(!events.iter().any(|e| matches!(e, DetectorEvent::HighlightWinningCells { .. })));
        assert!(events.contains(&DetectorEvent::Won {
            symbol: "gem".into()
        }));
        assert_eq!(detector.cells().filter(|c| c.highlighted).count(), 0);
    }

    #[test]
    fn win_fires_once_after_highlight() {
        let mut detector = ready_detector(card(
            ["gem", "a", "b", "gem", "c", "d", "gem", "gem", "e"],
            true,
        ));
        let mut mask = AlphaMask::opaque(SIZE, SIZE);
        let t0 = Instant::now();
        for index in [0, 3, 6] {
            clear_cell(&mut mask, index);
        }

        let events = detector.recheck(&mask, t0);
        let detected: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, DetectorEvent::WinDetected { .. }))
            .collect();
        assert_eq!(detected.len(), 1);
        assert!(detector.win_detected());

        // revealing the fourth gem later must not trigger again
        clear_cell(&mut mask, 7);
        let events = detector.recheck(&mask, t0 + ms(60));
        assert!(events.contains(&DetectorEvent::CellRevealed(7)));
        assert!(!events.iter().any(|e| matches!(e, DetectorEvent::WinDetected { .. })));

        let config = detector.config().clone();
        let events = detector.tick(t0 + config.highlight_delay);
        assert!(matches!(
            events.as_slice(),
            [DetectorEvent::HighlightWinningCells { symbol, cells }]
                if symbol == "gem" && cells.as_slice() == [0, 3, 6, 7]
        ));
        assert!(detector.cells().filter(|c| c.highlighted).count() == 4);
        assert_eq!(
            detector.cells().next().map(|c| c.border_color()),
            Some(HIGHLIGHT_COLOR)
        );

        let events = detector.tick(t0 + config.highlight_delay + config.win_callback_delay);
        assert_eq!(
            events,
            vec![DetectorEvent::Won {
                symbol: "gem".into()
            }]
        );
        assert!(detector.tick(t0 + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn auto_reveal_starts_once_and_completes_after_fade() {
        let mut detector = ready_detector(card(["a", "b", "c", "d", "e", "f", "g", "h", "i"], false));
        let mut mask = AlphaMask::opaque(SIZE, SIZE);
        let t0 = Instant::now();
        nearly_done(&mut mask);

        let events = detector.recheck(&mask, t0);
        assert!(events.contains(&DetectorEvent::RevealStarted(RevealReason::Auto)));
        assert!(!detector.accepts_input());
        assert!(!detector.is_fully_revealed());

        let events = detector.begin_stroke(&mut mask, Point::new(150.0, 290.0), t0 + ms(10));
        assert!(events.is_empty());

        let fade = detector.config().auto_fade;
        assert!((detector.cover_opacity(t0 + fade / 2) - 0.5).abs() < 1e-9);

        let events = detector.tick(t0 + fade);
        assert_eq!(events.first(), Some(&DetectorEvent::CoverRemoved));
        assert!(detector.is_fully_revealed());
        assert_eq!(events.last(), Some(&DetectorEvent::Completed));
        assert!(!detector.is_cover_visible());
        assert!(detector.tick(t0 + fade * 2).is_empty());
    }

    #[test]
    fn forced_reveal_is_idempotent() {
        let mut detector = ready_detector(card(["a", "b", "c", "d", "e", "f", "g", "h", "i"], false));
        let t0 = Instant::now();

        let events = detector.force_reveal(t0);
        let completions = events
            .iter()
            .filter(|e| **e == DetectorEvent::Completed)
            .count();
        assert_eq!(completions, 1);
        assert!(detector.is_fully_revealed());

        assert!(detector.force_reveal(t0 + ms(1)).is_empty());
        let events = detector.tick(t0 + detector.config().forced_fade);
        assert_eq!(events, vec![DetectorEvent::CoverRemoved]);
    }

    #[test]
    fn forced_reveal_during_auto_fade_evaluates_once() {
        let mut detector = ready_detector(card(
            ["a", "b", "c", "d", "e", "f", "g", "h", "i"],
            false,
        ));
        let mut mask = AlphaMask::opaque(SIZE, SIZE);
        let t0 = Instant::now();
        nearly_done(&mut mask);
        detector.recheck(&mask, t0);

        let forced = detector.force_reveal(t0 + ms(100));
        let after = detector.tick(t0 + Duration::from_secs(2));

        let completions = forced
            .iter()
            .chain(after.iter())
            .filter(|e| **e == DetectorEvent::Completed)
            .count();
        assert_eq!(completions, 1);
    }

    #[test]
    fn new_card_resets_everything() {
        let mut detector = ready_detector(card(
            ["gem", "gem", "gem", "a", "b", "c", "d", "e", "f"],
            true,
        ));
        let t0 = Instant::now();
        detector.force_reveal(t0);
        assert!(detector.win_detected());

        detector.load_card(card(["a", "b", "c", "d", "e", "f", "g", "h", "i"], false));

        assert_eq!(detector.progress(), 0);
        assert!(!detector.win_detected());
        assert!(!detector.is_revealed(0));
        assert_eq!(detector.cover_phase(), CoverPhase::Loading);
        assert!(!detector.is_animating());
        assert!(detector.tick(t0 + Duration::from_secs(10)).is_empty());
    }
}
