// src/selection.rs
// Per-overlay selection session: dispatches input to the active mode.

use crate::geometry::{Point, Rect};
use crate::selection_logic::DragSelection;
use crate::window_pick::{HoverSelection, WindowSource};

/// Shared interaction mode of every overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    MouseSelection,
    WindowSelection,
}

impl InteractionMode {
    pub fn toggled(self) -> Self {
        match self {
            InteractionMode::MouseSelection => InteractionMode::WindowSelection,
            InteractionMode::WindowSelection => InteractionMode::MouseSelection,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Character(char),
    Escape,
    Other,
}

/// A committed selection. Regions are in bottom-left-origin global space.
#[derive(Debug, Clone, PartialEq)]
pub enum Selected {
    Region(Rect),
    Window(u32),
}

/// What the overlay should do after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    /// Not for us; let the overlay handle it (mode toggle, cancel).
    Unhandled,
    Handled,
    Redraw,
    Finalize(Selected),
}

/// Everything a handler needs besides the event.
pub struct SelectionContext<'a> {
    pub primary_height: f64,
    pub windows: &'a dyn WindowSource,
    pub move_key: char,
}

pub trait SelectionHandler {
    fn on_pointer_down(&mut self, pos: Point, cx: &SelectionContext<'_>) -> Reaction;
    fn on_pointer_move(&mut self, pos: Point, cx: &SelectionContext<'_>) -> Reaction;
    fn on_pointer_up(&mut self, pos: Point, cx: &SelectionContext<'_>) -> Reaction;
    fn on_key_down(&mut self, key: &Key, pointer: Point, cx: &SelectionContext<'_>) -> Reaction;
    fn on_key_up(&mut self, key: &Key, cx: &SelectionContext<'_>) -> Reaction;
}

impl SelectionHandler for DragSelection {
    fn on_pointer_down(&mut self, pos: Point, _cx: &SelectionContext<'_>) -> Reaction {
        self.pointer_down(pos);
        Reaction::Redraw
    }

    fn on_pointer_move(&mut self, pos: Point, _cx: &SelectionContext<'_>) -> Reaction {
        if !self.is_anchored() {
            return Reaction::Handled;
        }
        self.pointer_move(pos);
        Reaction::Redraw
    }

    fn on_pointer_up(&mut self, pos: Point, _cx: &SelectionContext<'_>) -> Reaction {
        if !self.is_anchored() {
            return Reaction::Handled;
        }
        match self.pointer_up(pos) {
            Some(rect) => Reaction::Finalize(Selected::Region(rect)),
            None => Reaction::Redraw,
        }
    }

    fn on_key_down(&mut self, key: &Key, pointer: Point, cx: &SelectionContext<'_>) -> Reaction {
        match key {
            Key::Character(c) if *c == cx.move_key && self.move_key_down(pointer) => Reaction::Handled,
            _ => Reaction::Unhandled,
        }
    }

    fn on_key_up(&mut self, key: &Key, cx: &SelectionContext<'_>) -> Reaction {
        match key {
            Key::Character(c) if *c == cx.move_key => {
                self.move_key_up();
                Reaction::Handled
            }
            _ => Reaction::Unhandled,
        }
    }
}

impl SelectionHandler for HoverSelection {
    // a click without a prior move still has to find its window
    fn on_pointer_down(&mut self, pos: Point, cx: &SelectionContext<'_>) -> Reaction {
        self.on_pointer_move(pos, cx)
    }

    fn on_pointer_move(&mut self, pos: Point, cx: &SelectionContext<'_>) -> Reaction {
        if self.pointer_move(pos, cx.primary_height, cx.windows) {
            Reaction::Redraw
        } else {
            Reaction::Handled
        }
    }

    fn on_pointer_up(&mut self, pos: Point, cx: &SelectionContext<'_>) -> Reaction {
        match self.pointer_up(pos, cx.primary_height, cx.windows) {
            Some(id) => Reaction::Finalize(Selected::Window(id)),
            None => Reaction::Handled,
        }
    }

    fn on_key_down(&mut self, _key: &Key, _pointer: Point, _cx: &SelectionContext<'_>) -> Reaction {
        Reaction::Unhandled
    }

    fn on_key_up(&mut self, _key: &Key, _cx: &SelectionContext<'_>) -> Reaction {
        Reaction::Unhandled
    }
}

/// The session an overlay holds, one variant per interaction mode.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionMode {
    Mouse(DragSelection),
    Window(HoverSelection),
}

impl SelectionMode {
    pub fn for_mode(mode: InteractionMode) -> Self {
        match mode {
            InteractionMode::MouseSelection => SelectionMode::Mouse(DragSelection::new()),
            InteractionMode::WindowSelection => SelectionMode::Window(HoverSelection::default()),
        }
    }

    /// Fresh session after a mode switch. Window mode highlights whatever
    /// is already under the pointer, if the pointer is over this overlay.
    pub fn enter(mode: InteractionMode, pointer: Option<Point>, cx: &SelectionContext<'_>) -> Self {
        let mut session = Self::for_mode(mode);
        if let (SelectionMode::Window(hover), Some(pos)) = (&mut session, pointer) {
            hover.pointer_move(pos, cx.primary_height, cx.windows);
        }
        session
    }

    pub fn mode(&self) -> InteractionMode {
        match self {
            SelectionMode::Mouse(_) => InteractionMode::MouseSelection,
            SelectionMode::Window(_) => InteractionMode::WindowSelection,
        }
    }

    fn handler(&mut self) -> &mut dyn SelectionHandler {
        match self {
            SelectionMode::Mouse(drag) => drag as &mut dyn SelectionHandler,
            SelectionMode::Window(hover) => hover,
        }
    }

    /// Rect to draw, in bottom-left-origin global space.
    pub fn highlight(&self) -> Option<Rect> {
        match self {
            SelectionMode::Mouse(drag) => drag.current_rect(),
            SelectionMode::Window(hover) => hover.highlighted().map(|w| w.frame),
        }
    }

    pub fn on_pointer_down(&mut self, pos: Point, cx: &SelectionContext<'_>) -> Reaction {
        self.handler().on_pointer_down(pos, cx)
    }

    pub fn on_pointer_move(&mut self, pos: Point, cx: &SelectionContext<'_>) -> Reaction {
        self.handler().on_pointer_move(pos, cx)
    }

    pub fn on_pointer_up(&mut self, pos: Point, cx: &SelectionContext<'_>) -> Reaction {
        self.handler().on_pointer_up(pos, cx)
    }

    pub fn on_key_down(&mut self, key: &Key, pointer: Point, cx: &SelectionContext<'_>) -> Reaction {
        self.handler().on_key_down(key, pointer, cx)
    }

    pub fn on_key_up(&mut self, key: &Key, cx: &SelectionContext<'_>) -> Reaction {
        self.handler().on_key_up(key, cx)
    }
}
