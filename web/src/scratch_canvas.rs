use bitflags::bitflags;
use gloo::events::EventListener;
use gloo::timers::callback::Interval;
use raspadinha_core::*;
use web_sys::{HtmlCanvasElement, HtmlImageElement, PointerEvent, TouchEvent};
use web_time::Instant;
use yew::prelude::*;

use crate::canvas::CanvasCover;

/// Backing size of the cover canvas in CSS pixels.
const CANVAS_CSS_SIZE: f64 = 300.0;
const FRAME_MILLIS: u32 = 16;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq)]
    struct MouseButtons: u16 {
        const LEFT = 1;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CoverArt {
    pub image: AttrValue,
    pub color: AttrValue,
}

#[derive(Properties, Clone, PartialEq)]
pub(crate) struct ScratchCanvasProps {
    pub card: Option<ScratchCard>,
    /// Bumped for every dealt card, even when two deals look alike.
    pub round: u64,
    pub cover: CoverArt,
    /// Bumped to request an immediate reveal of the whole card.
    pub reveal_token: u32,
    #[prop_or_default]
    pub config: DetectorConfig,
    pub on_event: Callback<DetectorEvent>,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Stroke {
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up,
}

pub(crate) enum Msg {
    Stroke(Stroke),
    CoverLoaded(u32),
    CoverFailed(u32),
    Tick,
}

pub(crate) struct ScratchCanvas {
    detector: RevealDetector,
    canvas_ref: NodeRef,
    canvas_size: u32,
    surface: Option<CanvasCover>,
    cover_image: Option<HtmlImageElement>,
    /// Guards against a previous card's art finishing late.
    cover_generation: u32,
    _cover_listeners: Vec<EventListener>,
    ticker: Option<Interval>,
}

impl ScratchCanvas {
    fn ensure_surface(&mut self) -> Option<&mut CanvasCover> {
        if self.surface.is_none() {
            let canvas = self.canvas_ref.cast::<HtmlCanvasElement>()?;
            match CanvasCover::new(canvas) {
                Ok(surface) => self.surface = Some(surface),
                Err(err) => log::error!("cover canvas unusable: {err:?}"),
            }
        }
        self.surface.as_mut()
    }

    fn start_round(&mut self, ctx: &Context<Self>) {
        let props = ctx.props();
        self.ticker = None;
        self._cover_listeners.clear();
        self.cover_image = None;
        self.cover_generation = self.cover_generation.wrapping_add(1);

        match &props.card {
            Some(card) => self.detector.load_card(card.clone()),
            None => self.detector.reset(),
        }
        let Some(surface) = self.ensure_surface() else {
            return;
        };
        surface.paint_fill(&props.cover.color);
        if props.card.is_some() {
            self.load_cover_art(ctx);
        }
    }

    fn load_cover_art(&mut self, ctx: &Context<Self>) {
        let generation = self.cover_generation;
        let image = match HtmlImageElement::new() {
            Ok(image) => image,
            Err(err) => {
                log::error!("failed to create cover image: {err:?}");
                ctx.link().send_message(Msg::CoverFailed(generation));
                return;
            }
        };
        // needed to read the pixels back after drawing
        image.set_cross_origin(Some("anonymous"));

        let link = ctx.link().clone();
        let loaded = EventListener::once(&image, "load", move |_| {
            link.send_message(Msg::CoverLoaded(generation))
        });
        let link = ctx.link().clone();
        let failed = EventListener::once(&image, "error", move |_| {
            link.send_message(Msg::CoverFailed(generation))
        });
        self._cover_listeners = vec![loaded, failed];

        image.set_src(&ctx.props().cover.image);
        self.cover_image = Some(image);
    }

    fn stroke(&mut self, stroke: Stroke) -> Vec<DetectorEvent> {
        let now = Instant::now();
        let Some(surface) = self.surface.as_mut() else {
            return Vec::new();
        };
        match stroke {
            Stroke::Down { x, y } => {
                let point = surface.client_to_canvas(x, y);
                self.detector.begin_stroke(surface, point, now)
            }
            Stroke::Move { x, y } => {
                let point = surface.client_to_canvas(x, y);
                self.detector.continue_stroke(surface, point, now)
            }
            Stroke::Up => self.detector.end_stroke(&*surface, now),
        }
    }

    /// Forwards detector events and keeps the frame ticker alive while
    /// something animates. Returns whether a redraw is due.
    fn dispatch(&mut self, ctx: &Context<Self>, events: Vec<DetectorEvent>) -> bool {
        let redraw = !events.is_empty();
        for event in events {
            log::trace!("detector event: {event:?}");
            ctx.props().on_event.emit(event);
        }
        if self.detector.is_animating() {
            if self.ticker.is_none() {
                let link = ctx.link().clone();
                self.ticker = Some(Interval::new(FRAME_MILLIS, move || {
                    link.send_message(Msg::Tick)
                }));
            }
        } else {
            self.ticker = None;
        }
        redraw
    }

    fn cell_view(cell: CellView<'_>) -> Html {
        let class = classes!(
            "cell",
            cell.symbol.rarity.class_name(),
            cell.revealed.then_some("revealed"),
            cell.highlighted.then_some("winner"),
        );
        let style = format!("border-color: {}", cell.border_color());
        html! {
            <div key={cell.index} {class} {style}>
                <img src={cell.symbol.image_ref.clone()} alt={cell.symbol.name.clone()} draggable="false"/>
                <span class="cell-name">{cell.symbol.name.clone()}</span>
            </div>
        }
    }
}

fn first_touch(e: &TouchEvent) -> Option<(f64, f64)> {
    let touch = e.touches().item(0)?;
    Some((f64::from(touch.client_x()), f64::from(touch.client_y())))
}

impl Component for ScratchCanvas {
    type Message = Msg;
    type Properties = ScratchCanvasProps;

    fn create(ctx: &Context<Self>) -> Self {
        let ratio = gloo::utils::window().device_pixel_ratio().clamp(1.0, 3.0);
        Self {
            detector: RevealDetector::new(ctx.props().config.clone()),
            canvas_ref: NodeRef::default(),
            canvas_size: (CANVAS_CSS_SIZE * ratio).round() as u32,
            surface: None,
            cover_image: None,
            cover_generation: 0,
            _cover_listeners: Vec::new(),
            ticker: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Stroke(stroke) => {
                let events = self.stroke(stroke);
                self.dispatch(ctx, events)
            }
            Msg::CoverLoaded(generation) if generation == self.cover_generation => {
                let painted = match (self.surface.as_mut(), self.cover_image.as_ref()) {
                    (Some(surface), Some(image)) => surface.paint_image(image),
                    _ => Ok(()),
                };
                match painted {
                    Ok(()) => {
                        log::debug!("cover art ready");
                        self.detector.cover_loaded();
                    }
                    Err(err) => {
                        log::warn!("cover art could not be drawn: {err:?}");
                        self.detector.cover_failed();
                    }
                }
                true
            }
            Msg::CoverFailed(generation) if generation == self.cover_generation => {
                log::warn!("cover art failed to load, using solid cover");
                if let Some(surface) = self.surface.as_mut() {
                    surface.paint_fill(&ctx.props().cover.color);
                }
                self.detector.cover_failed();
                true
            }
            Msg::CoverLoaded(_) | Msg::CoverFailed(_) => false,
            Msg::Tick => {
                let now = Instant::now();
                let mut events = self.detector.tick(now);
                if self.detector.recheck_due(now) {
                    if let Some(surface) = self.surface.as_ref() {
                        events.extend(self.detector.recheck(surface, now));
                    }
                }
                self.dispatch(ctx, events);
                true
            }
        }
    }

    fn changed(&mut self, ctx: &Context<Self>, old_props: &Self::Properties) -> bool {
        let props = ctx.props();
        if props.config != old_props.config {
            self.detector = RevealDetector::new(props.config.clone());
        }
        if props.round != old_props.round || props.config != old_props.config {
            self.start_round(ctx);
        }
        if props.reveal_token != old_props.reveal_token {
            let events = self.detector.force_reveal(Instant::now());
            self.dispatch(ctx, events);
        }
        true
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let link = ctx.link();

        let mouse_down = link.batch_callback(|e: PointerEvent| {
            // touch input arrives through the touch handlers
            (e.pointer_type() != "touch" && e.button() == 0).then(|| {
                Msg::Stroke(Stroke::Down {
                    x: f64::from(e.client_x()),
                    y: f64::from(e.client_y()),
                })
            })
        });
        let mouse_move = link.batch_callback(|e: PointerEvent| {
            let pressed = MouseButtons::from_bits_truncate(e.buttons());
            (e.pointer_type() != "touch" && pressed.contains(MouseButtons::LEFT)).then(|| {
                Msg::Stroke(Stroke::Move {
                    x: f64::from(e.client_x()),
                    y: f64::from(e.client_y()),
                })
            })
        });
        let mouse_up = link.batch_callback(|e: PointerEvent| {
            (e.pointer_type() != "touch").then_some(Msg::Stroke(Stroke::Up))
        });
        let touch_start = link.batch_callback(|e: TouchEvent| {
            first_touch(&e).map(|(x, y)| Msg::Stroke(Stroke::Down { x, y }))
        });
        let touch_move = link.batch_callback(|e: TouchEvent| {
            first_touch(&e).map(|(x, y)| Msg::Stroke(Stroke::Move { x, y }))
        });
        let touch_end = link.callback(|_: TouchEvent| Msg::Stroke(Stroke::Up));

        let opacity = self.detector.cover_opacity(Instant::now());
        let display = if self.detector.is_cover_visible() {
            "block"
        } else {
            "none"
        };
        let canvas_style = format!(
            "opacity: {opacity:.3}; display: {display}; touch-action: none; width: {CANVAS_CSS_SIZE}px; height: {CANVAS_CSS_SIZE}px"
        );
        let size = self.canvas_size.to_string();
        let won = self.detector.cells().any(|cell| cell.highlighted);

        html! {
            <div class={classes!("scratch-card", won.then_some("won"))}>
                <div class="grid">
                    { for self.detector.cells().map(Self::cell_view) }
                </div>
                <canvas
                    ref={self.canvas_ref.clone()}
                    class="cover"
                    width={size.clone()}
                    height={size}
                    style={canvas_style}
                    onpointerdown={mouse_down}
                    onpointermove={mouse_move}
                    onpointerup={mouse_up.clone()}
                    onpointerleave={mouse_up}
                    ontouchstart={touch_start}
                    ontouchmove={touch_move}
                    ontouchend={touch_end.clone()}
                    ontouchcancel={touch_end}
                />
                <div class="progress" title="Raspado">{format!("{}%", self.detector.progress())}</div>
            </div>
        }
    }

    fn rendered(&mut self, ctx: &Context<Self>, first_render: bool) {
        if first_render {
            self.start_round(ctx);
        }
    }
}
