// src/ui.rs
//
// druid side of interactive capture: one transparent always-on-top window per
// display hosting an `OverlayWidget`, and a delegate owning the `OverlaySet`.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Result, anyhow};
use druid::{
    AppDelegate, AppLauncher, BoxConstraints, Color, Command, Cursor, Data, DelegateCtx, Env, Event,
    EventCtx, Handled, KbKey, KeyEvent, LayoutCtx, LifeCycle, LifeCycleCtx, PaintCtx, RenderContext,
    Selector, Size, Target, UpdateCtx, Widget, WindowDesc, WindowId, commands,
};
use log::{debug, error, info, trace};

use crate::capture::{CaptureBackend, CaptureInvoker, CaptureTarget, Captured};
use crate::display::DisplayDescriptor;
use crate::geometry::{Point, Rect, point_to_bottom_left, to_bottom_left_origin};
use crate::overlay::{FocusTracker, KeyRoute, ModePolicy, OverlaySet, route_key};
use crate::selection::{InteractionMode, Key, Reaction, Selected, SelectionContext, SelectionMode};
use crate::window_pick::{WindowSource, XcapWindowSource};

const OPEN_OVERLAYS: Selector = Selector::new("dualshot.open-overlays");
const TOGGLE_MODE: Selector = Selector::new("dualshot.toggle-mode");
const CANCEL: Selector = Selector::new("dualshot.cancel");
const FINALIZE: Selector<Selected> = Selector::new("dualshot.finalize");
const TEARDOWN: Selector = Selector::new("dualshot.teardown");
const RUN_CAPTURE: Selector<CaptureTarget> = Selector::new("dualshot.run-capture");

/// App data: only the mode is shared, so changing it reaches every overlay.
#[derive(Clone, Data)]
pub struct OverlayState {
    #[data(same_fn = "PartialEq::eq")]
    pub mode: InteractionMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub move_key: char,
    pub toggle_key: char,
}

/// How the interactive session ended.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionOutcome {
    /// Event loop ended without a decision (window closed by the system).
    #[default]
    Pending,
    Saved,
    Cancelled,
    Failed(String),
}

pub type Deliver = Box<dyn FnMut(&Captured) -> Result<()>>;

fn cursor_for(mode: InteractionMode) -> Cursor {
    match mode {
        InteractionMode::MouseSelection => Cursor::Crosshair,
        InteractionMode::WindowSelection => Cursor::Pointer,
    }
}

fn key_of(event: &KeyEvent) -> Key {
    match &event.key {
        KbKey::Character(s) => s.chars().next().map(Key::Character).unwrap_or(Key::Other),
        KbKey::Escape => Key::Escape,
        _ => Key::Other,
    }
}

// Widget implementation
pub struct OverlayWidget {
    display: DisplayDescriptor,
    primary_height: f64,
    windows: Rc<dyn WindowSource>,
    keys: KeyBindings,
    session: SelectionMode,
    focus: FocusTracker,
    /// Last pointer position over this overlay, bottom-left global space.
    pointer: Option<Point>,
}

impl OverlayWidget {
    pub fn new(
        display: DisplayDescriptor,
        primary_height: f64,
        windows: Rc<dyn WindowSource>,
        keys: KeyBindings,
        mode: InteractionMode,
    ) -> Self {
        OverlayWidget {
            display,
            primary_height,
            windows,
            keys,
            session: SelectionMode::for_mode(mode),
            focus: FocusTracker::new(),
            pointer: None,
        }
    }

    /// Window-local top-left position to bottom-left global space.
    fn to_global(&self, pos: Point) -> Point {
        point_to_bottom_left(pos + self.display.frame.origin().to_vec2(), self.primary_height)
    }

    /// Bottom-left global rect to window-local top-left space.
    fn to_local(&self, rect: Rect) -> Rect {
        to_bottom_left_origin(rect, self.primary_height) - self.display.frame.origin().to_vec2()
    }

    fn dispatch<T>(&mut self, f: impl FnOnce(&mut SelectionMode, &SelectionContext<'_>) -> T) -> T {
        let cx = SelectionContext {
            primary_height: self.primary_height,
            windows: self.windows.as_ref(),
            move_key: self.keys.move_key,
        };
        f(&mut self.session, &cx)
    }

    fn react(&mut self, ctx: &mut EventCtx, reaction: Reaction) {
        match reaction {
            Reaction::Unhandled | Reaction::Handled => {}
            Reaction::Redraw => ctx.request_paint(),
            Reaction::Finalize(selected) => {
                ctx.request_paint();
                ctx.submit_command(FINALIZE.with(selected).to(Target::Global));
            }
        }
        ctx.set_handled();
    }


    fn apply_cursor(&self, ctx: &mut EventCtx) {
        let cursor = cursor_for(self.session.mode());
        ctx.set_cursor(&cursor);
        // druid skips the platform call when it thinks nothing changed
        ctx.window().clone().set_cursor(&cursor);
    }
}

impl Widget<OverlayState> for OverlayWidget {
    fn event(&mut self, ctx: &mut EventCtx, event: &Event, _data: &mut OverlayState, _env: &Env) {
        match event {
            Event::WindowConnected => {
                ctx.request_focus();
                self.apply_cursor(ctx);
            }
            Event::WindowLostFocus => self.focus.focus_lost(),
            Event::MouseDown(e) if e.button.is_left() => {
                ctx.set_active(true);
                let pos = self.to_global(e.pos);
                self.pointer = Some(pos);
                let reaction = self.dispatch(|s, cx| s.on_pointer_down(pos, cx));
                self.react(ctx, reaction);
            }
            Event::MouseMove(e) => {
                let action = self.focus.pointer_moved();
                if action.refocus {
                    debug!("overlay on display {} takes focus", self.display.index + 1);
                    ctx.window().bring_to_front_and_focus();
                    ctx.request_focus();
                }
                if action.reapply_cursor {
                    trace!("reapplying cursor on display {}", self.display.index + 1);
                    self.apply_cursor(ctx);
                }
                let pos = self.to_global(e.pos);
                self.pointer = Some(pos);
                let reaction = self.dispatch(|s, cx| s.on_pointer_move(pos, cx));
                self.react(ctx, reaction);
            }
            Event::MouseUp(e) if e.button.is_left() => {
                ctx.set_active(false);
                let pos = self.to_global(e.pos);
                self.pointer = Some(pos);
                let reaction = self.dispatch(|s, cx| s.on_pointer_up(pos, cx));
                self.react(ctx, reaction);
            }
            Event::KeyDown(k) => {
                let key = key_of(k);
                let pointer = self.pointer.unwrap_or_default();
                let reaction = self.dispatch(|s, cx| s.on_key_down(&key, pointer, cx));
                match route_key(&reaction, &key, k.repeat, self.keys.toggle_key) {
                    KeyRoute::Session => self.react(ctx, reaction),
                    KeyRoute::Toggle => {
                        ctx.submit_command(TOGGLE_MODE.with(()).to(Target::Global));
                        ctx.set_handled();
                    }
                    KeyRoute::Cancel => {
                        ctx.submit_command(CANCEL.with(()).to(Target::Global));
                        ctx.set_handled();
                    }
                    KeyRoute::Ignore => {}
                }
            }
            Event::KeyUp(k) => {
                let key = key_of(k);
                let reaction = self.dispatch(|s, cx| s.on_key_up(&key, cx));
                if reaction != Reaction::Unhandled {
                    self.react(ctx, reaction);
                }
            }
            Event::Command(cmd) if cmd.is(TEARDOWN) => {
                // 先隐藏遮罩，截图时才不会把它拍进去
                ctx.window().hide();
                ctx.set_handled();
            }
            _ => {}
        }
    }

    fn lifecycle(&mut self, ctx: &mut LifeCycleCtx, event: &LifeCycle, _data: &OverlayState, _env: &Env) {
        match event {
            LifeCycle::WidgetAdded => ctx.register_for_focus(),
            // pointer left for another display; a drag keeps its position
            LifeCycle::HotChanged(false) if !ctx.is_active() => self.pointer = None,
            _ => {}
        }
    }

    fn update(&mut self, ctx: &mut UpdateCtx, old: &OverlayState, data: &OverlayState, _env: &Env) {
        if old.mode != data.mode {
            debug!("display {} switches to {:?}", self.display.index + 1, data.mode);
            let pointer = self.pointer;
            self.session = self.dispatch(|_, cx| SelectionMode::enter(data.mode, pointer, cx));
            // picked up by the next pointer move
            self.focus.focus_lost();
            ctx.request_paint();
        }
    }

    fn layout(&mut self, _ctx: &mut LayoutCtx, bc: &BoxConstraints, _data: &OverlayState, _env: &Env) -> Size {
        bc.max()
    }

    fn paint(&mut self, ctx: &mut PaintCtx, _data: &OverlayState, _env: &Env) {
        let full_rect = ctx.size().to_rect();
        // almost clear, fully clear surfaces let clicks through
        ctx.fill(full_rect, &Color::rgba8(0, 0, 0, 1));

        let Some(rect) = self.session.highlight() else {
            return;
        };
        let r = self.to_local(rect);
        match self.session {
            SelectionMode::Mouse(_) => {
                ctx.fill(r, &Color::rgba8(128, 128, 128, 64));
                ctx.stroke(r, &Color::WHITE, 1.0);
            }
            SelectionMode::Window(_) => {
                ctx.fill(r, &Color::rgba8(0x3b, 0x82, 0xf6, 128));
            }
        }
    }
}

/// Owns the overlay set for the lifetime of the event loop.
pub struct Delegate<B> {
    overlays: OverlaySet<WindowId>,
    pending: Vec<WindowDesc<OverlayState>>,
    invoker: CaptureInvoker<B>,
    deliver: Deliver,
    outcome: Rc<RefCell<SessionOutcome>>,
}

impl<B: CaptureBackend> Delegate<B> {
    /// Hides every overlay the set knows about.
    fn teardown(&self, ctx: &mut DelegateCtx) {
        for id in self.overlays.windows() {
            ctx.submit_command(TEARDOWN.with(()).to(Target::Window(*id)));
        }
    }

    fn run_capture(&mut self, target: &CaptureTarget) {
        let result = self
            .invoker
            .capture(target)
            .map_err(anyhow::Error::from)
            .and_then(|captured| (self.deliver)(&captured));
        let outcome = match result {
            Ok(()) => SessionOutcome::Saved,
            Err(e) => {
                error!("{e:#}");
                SessionOutcome::Failed(format!("{e:#}"))
            }
        };
        *self.outcome.borrow_mut() = outcome;
    }
}

impl<B: CaptureBackend + 'static> AppDelegate<OverlayState> for Delegate<B> {
    fn command(
        &mut self,
        ctx: &mut DelegateCtx,
        _target: Target,
        cmd: &Command,
        data: &mut OverlayState,
        _env: &Env,
    ) -> Handled {
        if cmd.is(OPEN_OVERLAYS) {
            for desc in self.pending.drain(..) {
                ctx.new_window(desc);
            }
            return Handled::Yes;
        }
        if cmd.is(TOGGLE_MODE) {
            let next = self.overlays.toggle(data.mode);
            if next != data.mode {
                info!("switching every overlay to {next:?}");
                data.mode = next;
            }
            return Handled::Yes;
        }
        if cmd.is(CANCEL) {
            if self.overlays.cancel() {
                *self.outcome.borrow_mut() = SessionOutcome::Cancelled;
                self.teardown(ctx);
                ctx.submit_command(commands::QUIT_APP);
            }
            return Handled::Yes;
        }
        if let Some(selected) = cmd.get(FINALIZE) {
            if let Some(target) = self.overlays.finalize(selected.clone()) {
                self.teardown(ctx);
                // through the platform queue: runs once the hidden overlays
                // are off screen
                let posted = ctx.get_external_handle().submit_command(RUN_CAPTURE, target, Target::Global);
                if posted.is_err() {
                    error!("could not schedule the capture");
                    *self.outcome.borrow_mut() = SessionOutcome::Failed("event loop closed".into());
                    ctx.submit_command(commands::QUIT_APP);
                }
            }
            return Handled::Yes;
        }
        if let Some(target) = cmd.get(RUN_CAPTURE) {
            self.run_capture(target);
            ctx.submit_command(commands::QUIT_APP);
            return Handled::Yes;
        }
        Handled::No
    }
}

/// Opens one overlay per display and runs the event loop until the user
/// picks something or cancels.
pub fn run_interactive<B: CaptureBackend + 'static>(
    displays: Vec<DisplayDescriptor>,
    policy: ModePolicy,
    keys: KeyBindings,
    invoker: CaptureInvoker<B>,
    deliver: Deliver,
) -> Result<SessionOutcome> {
    let windows: Rc<dyn WindowSource> = Rc::new(XcapWindowSource::new());
    let mut overlays = OverlaySet::new(displays.clone(), policy);
    let primary_height = overlays.primary_height();

    let mut descs = Vec::with_capacity(displays.len());
    for display in displays {
        let frame = display.frame;
        let index = display.index;
        let widget = OverlayWidget::new(display, primary_height, windows.clone(), keys, policy.start);
        let desc = WindowDesc::new(widget)
            .show_titlebar(false)
            .transparent(true)
            .resizable(false)
            .set_always_on_top(true)
            .set_position(frame.origin())
            .window_size(frame.size());
        overlays.attach(index, desc.id);
        descs.push(desc);
    }

    let mut descs = descs.into_iter();
    let first = descs.next().ok_or_else(|| anyhow!("no display to select on"))?;
    info!("interactive capture on {} display(s), starting in {:?}", overlays.overlays().len(), policy.start);

    let outcome = Rc::new(RefCell::new(SessionOutcome::Pending));
    let delegate = Delegate {
        overlays,
        pending: descs.collect(),
        invoker,
        deliver,
        outcome: outcome.clone(),
    };
    let launcher = AppLauncher::with_window(first).delegate(delegate);
    launcher
        .get_external_handle()
        .submit_command(OPEN_OVERLAYS, (), Target::Global)
        .map_err(|_| anyhow!("failed to queue overlay windows"))?;
    launcher.launch(OverlayState { mode: policy.start })?;

    Ok(outcome.take())
}
