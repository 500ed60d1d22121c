// src/overlay.rs
// Controller state shared by all overlays. Kept free of druid so it can be
// driven from tests; the widget and delegate in `ui` host it.

use log::{debug, info};

use crate::capture::CaptureTarget;
use crate::display::{DisplayDescriptor, primary_display_height};
use crate::geometry::to_bottom_left_origin;
use crate::selection::{InteractionMode, Key, Reaction, Selected};

/// Cursor reapplications after an overlay grabs focus. Cursor styling is
/// silently dropped for a few events after focus moves between displays.
pub const CURSOR_REAPPLY_MOVES: u8 = 10;

/// Which modes the user may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePolicy {
    pub start: InteractionMode,
    pub locked: bool,
}

impl ModePolicy {
    /// `only` wins over `start` and disables toggling.
    pub fn new(start: InteractionMode, only: Option<InteractionMode>) -> Self {
        match only {
            Some(mode) => ModePolicy { start: mode, locked: true },
            None => ModePolicy { start, locked: false },
        }
    }

    pub fn toggle(&self, current: InteractionMode) -> InteractionMode {
        if self.locked {
            debug!("mode toggle ignored, locked to {current:?}");
            current
        } else {
            current.toggled()
        }
    }
}

impl Default for ModePolicy {
    fn default() -> Self {
        ModePolicy::new(InteractionMode::MouseSelection, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    Finalized,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct OverlayEntry<W> {
    pub display: DisplayDescriptor,
    pub window: Option<W>,
}

/// One overlay per display plus the session lifecycle.
#[derive(Debug, Clone)]
pub struct OverlaySet<W> {
    overlays: Vec<OverlayEntry<W>>,
    policy: ModePolicy,
    primary_height: f64,
    phase: Phase,
}

impl<W> OverlaySet<W> {
    pub fn new(displays: Vec<DisplayDescriptor>, policy: ModePolicy) -> Self {
        let primary_height = primary_display_height(&displays);
        OverlaySet {
            overlays: displays.into_iter().map(|display| OverlayEntry { display, window: None }).collect(),
            policy,
            primary_height,
            phase: Phase::Active,
        }
    }

    pub fn primary_height(&self) -> f64 {
        self.primary_height
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn overlays(&self) -> &[OverlayEntry<W>] {
        &self.overlays
    }

    /// Records the surface opened for display `index`.
    pub fn attach(&mut self, index: usize, window: W) {
        if let Some(entry) = self.overlays.iter_mut().find(|e| e.display.index == index) {
            entry.window = Some(window);
        }
    }

    /// Surfaces to withdraw on teardown.
    pub fn windows(&self) -> impl Iterator<Item = &W> {
        self.overlays.iter().filter_map(|e| e.window.as_ref())
    }

    /// Next mode for every overlay after the toggle key.
    pub fn toggle(&self, current: InteractionMode) -> InteractionMode {
        if !self.is_active() {
            return current;
        }
        self.policy.toggle(current)
    }

    /// First finalized selection wins. Regions come in bottom-left space and
    /// leave as top-left-origin capture targets.
    pub fn finalize(&mut self, selected: Selected) -> Option<CaptureTarget> {
        if !self.is_active() {
            debug!("selection {selected:?} arrived after teardown, dropped");
            return None;
        }
        self.phase = Phase::Finalized;
        let target = match selected {
            Selected::Region(rect) => CaptureTarget::Region(to_bottom_left_origin(rect, self.primary_height)),
            Selected::Window(id) => CaptureTarget::Window(id),
        };
        info!("selection finalized: {target:?}");
        Some(target)
    }

    pub fn cancel(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.phase = Phase::Cancelled;
        info!("interactive capture cancelled");
        true
    }
}

/// Where a key press ends up once the selection session has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRoute {
    /// The session used it (move key).
    Session,
    /// Switch every overlay's mode.
    Toggle,
    Cancel,
    Ignore,
}

/// Keys the session leaves alone fall through to the overlay: the toggle key
/// switches modes, escape cancels. Auto-repeat never toggles.
pub fn route_key(reaction: &Reaction, key: &Key, repeat: bool, toggle_key: char) -> KeyRoute {
    if *reaction != Reaction::Unhandled {
        return KeyRoute::Session;
    }
    match key {
        _ if repeat => KeyRoute::Ignore,
        Key::Character(c) if *c == toggle_key => KeyRoute::Toggle,
        Key::Escape => KeyRoute::Cancel,
        _ => KeyRoute::Ignore,
    }
}

/// What an overlay must do on a pointer move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusAction {
    pub refocus: bool,
    pub reapply_cursor: bool,
}

/// Input focus does not follow the pointer across displays for our
/// non-activating overlays, so each one takes it back on pointer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusTracker {
    focused: bool,
    reapply_left: u8,
}

impl FocusTracker {
    pub fn new() -> Self {
        FocusTracker { focused: false, reapply_left: 0 }
    }

    pub fn focus_lost(&mut self) {
        self.focused = false;
    }

    pub fn pointer_moved(&mut self) -> FocusAction {
        let mut action = FocusAction::default();
        if !self.focused {
            self.focused = true;
            self.reapply_left = CURSOR_REAPPLY_MOVES;
            action.refocus = true;
        }
        if self.reapply_left > 0 {
            self.reapply_left -= 1;
            action.reapply_cursor = true;
        }
        action
    }
}

impl Default for FocusTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};
    use crate::selection::{SelectionContext, SelectionMode};
    use crate::window_pick::{WindowDescriptor, WindowSource};

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::from_origin_size((x, y), (w, h))
    }

    fn displays() -> Vec<DisplayDescriptor> {
        vec![
            DisplayDescriptor { index: 0, frame: rect(0.0, 0.0, 1920.0, 1080.0), is_primary: true },
            DisplayDescriptor { index: 1, frame: rect(1920.0, 0.0, 1440.0, 900.0), is_primary: false },
        ]
    }

    fn set(policy: ModePolicy) -> OverlaySet<u32> {
        let mut set = OverlaySet::new(displays(), policy);
        set.attach(0, 100);
        set.attach(1, 101);
        set
    }

    #[test]
    fn toggle_flips_when_unlocked() {
        let set = set(ModePolicy::default());
        assert_eq!(set.toggle(InteractionMode::MouseSelection), InteractionMode::WindowSelection);
        assert_eq!(set.toggle(InteractionMode::WindowSelection), InteractionMode::MouseSelection);
    }

    #[test]
    fn toggle_never_changes_locked_mode() {
        for only in [InteractionMode::MouseSelection, InteractionMode::WindowSelection] {
            let policy = ModePolicy::new(InteractionMode::MouseSelection, Some(only));
            assert_eq!(policy.start, only);
            let set = set(policy);
            assert_eq!(set.toggle(only), only);
        }
    }

    #[test]
    fn start_in_window_mode() {
        let policy = ModePolicy::new(InteractionMode::WindowSelection, None);
        assert_eq!(policy.start, InteractionMode::WindowSelection);
        assert!(!policy.locked);
    }

    #[test]
    fn region_is_converted_back_to_top_left() {
        let mut set = set(ModePolicy::default());
        let target = set.finalize(Selected::Region(rect(100.0, 100.0, 200.0, 150.0)));
        assert_eq!(target, Some(CaptureTarget::Region(rect(100.0, 830.0, 200.0, 150.0))));
        assert!(!set.is_active());
    }

    #[test]
    fn only_first_finalize_wins() {
        let mut set = set(ModePolicy::default());
        assert_eq!(set.finalize(Selected::Window(5)), Some(CaptureTarget::Window(5)));
        assert_eq!(set.finalize(Selected::Window(6)), None);
        assert!(!set.cancel());
    }

    #[test]
    fn cancel_blocks_capture() {
        let mut set = set(ModePolicy::default());
        assert!(set.cancel());
        assert_eq!(set.finalize(Selected::Window(5)), None);
        assert_eq!(set.toggle(InteractionMode::MouseSelection), InteractionMode::MouseSelection);
    }

    #[test]
    fn teardown_reaches_every_attached_overlay() {
        let set = set(ModePolicy::default());
        assert_eq!(set.windows().copied().collect::<Vec<_>>(), vec![100, 101]);
        assert_eq!(set.primary_height(), 1080.0);

        // a display whose surface never opened is skipped
        let mut partial: OverlaySet<u32> = OverlaySet::new(displays(), ModePolicy::default());
        partial.attach(1, 101);
        partial.attach(9, 109);
        assert_eq!(partial.windows().copied().collect::<Vec<_>>(), vec![101]);
    }

    struct NoWindows;

    impl WindowSource for NoWindows {
        fn windows_front_to_back(&self) -> anyhow::Result<Vec<WindowDescriptor>> {
            Ok(Vec::new())
        }
    }

    const SPACE: Key = Key::Character(' ');

    /// Runs a key press through a mouse-mode session, move and toggle key
    /// both bound to space.
    fn press(session: &mut SelectionMode, key: &Key, repeat: bool) -> KeyRoute {
        let cx = SelectionContext { primary_height: 1080.0, windows: &NoWindows, move_key: ' ' };
        let reaction = session.on_key_down(key, Point::new(300.0, 250.0), &cx);
        route_key(&reaction, key, repeat, ' ')
    }

    fn anchored_with_rect() -> SelectionMode {
        let cx = SelectionContext { primary_height: 1080.0, windows: &NoWindows, move_key: ' ' };
        let mut session = SelectionMode::for_mode(InteractionMode::MouseSelection);
        session.on_pointer_down(Point::new(100.0, 100.0), &cx);
        session.on_pointer_move(Point::new(300.0, 250.0), &cx);
        session
    }

    #[test]
    fn space_while_dragging_moves_the_box() {
        let mut session = anchored_with_rect();
        assert_eq!(press(&mut session, &SPACE, false), KeyRoute::Session);
        // held down: repeats stay with the session
        assert_eq!(press(&mut session, &SPACE, true), KeyRoute::Session);
        assert!(matches!(session, SelectionMode::Mouse(crate::selection_logic::DragSelection::AnchoredWithOffset { .. })));
    }

    #[test]
    fn space_while_idle_toggles() {
        let mut session = SelectionMode::for_mode(InteractionMode::MouseSelection);
        assert_eq!(press(&mut session, &SPACE, false), KeyRoute::Toggle);

        let mut session = SelectionMode::for_mode(InteractionMode::WindowSelection);
        assert_eq!(press(&mut session, &SPACE, false), KeyRoute::Toggle);
    }

    #[test]
    fn repeated_space_never_toggles() {
        let mut session = SelectionMode::for_mode(InteractionMode::MouseSelection);
        assert_eq!(press(&mut session, &SPACE, true), KeyRoute::Ignore);
        let mut session = SelectionMode::for_mode(InteractionMode::WindowSelection);
        assert_eq!(press(&mut session, &SPACE, true), KeyRoute::Ignore);
    }

    #[test]
    fn escape_cancels_even_while_dragging() {
        let mut session = anchored_with_rect();
        assert_eq!(press(&mut session, &Key::Escape, false), KeyRoute::Cancel);
        assert_eq!(press(&mut session, &Key::Character('x'), false), KeyRoute::Ignore);
    }

    #[test]
    fn separate_toggle_key() {
        let reaction = Reaction::Unhandled;
        assert_eq!(route_key(&reaction, &Key::Character('t'), false, 't'), KeyRoute::Toggle);
        assert_eq!(route_key(&reaction, &SPACE, false, 't'), KeyRoute::Ignore);
    }

    #[test]
    fn focus_regained_reapplies_cursor_a_fixed_number_of_times() {
        let mut focus = FocusTracker::new();
        let first = focus.pointer_moved();
        assert!(first.refocus && first.reapply_cursor);

        let mut reapplied = 1;
        for _ in 0..50 {
            let action = focus.pointer_moved();
            assert!(!action.refocus);
            if action.reapply_cursor {
                reapplied += 1;
            }
        }
        assert_eq!(reapplied, CURSOR_REAPPLY_MOVES as usize);

        focus.focus_lost();
        assert!(focus.pointer_moved().refocus);
    }
}
