//! Canvas state and the drawing state machine.

use crate::elements::{Element, ElementId, SerializableColor};
use crate::history::History;
use crate::tools::{ActionState, ToolKind, ToolManager, Toolbox};
use kurbo::Point;

/// Default pointer reach of the eraser, in canvas units.
pub const DEFAULT_ERASER_TOLERANCE: f64 = 5.0;

/// What an operation did to the canvas state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Nothing changed.
    Unchanged,
    /// The elements changed without a new history entry.
    Live,
    /// The elements changed and a history entry was recorded.
    Committed,
}

impl Mutation {
    pub fn changed(self) -> bool {
        !matches!(self, Mutation::Unchanged)
    }
}

/// Where the text input overlay should appear while writing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextOverlay {
    pub element: ElementId,
    pub anchor: Point,
    pub size: f64,
    pub color: SerializableColor,
}

/// The elements of one canvas, their history and the active tool.
///
/// Elements are kept in insertion order, which is also the paint order.
#[derive(Debug, Clone)]
pub struct Board {
    elements: Vec<Element>,
    history: History,
    /// Current tool, its interaction state and the toolbox.
    pub tools: ToolManager,
    eraser_tolerance: f64,
    revision: u64,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self::with_toolbox(Toolbox::default(), DEFAULT_ERASER_TOLERANCE)
    }

    pub fn with_toolbox(toolbox: Toolbox, eraser_tolerance: f64) -> Self {
        Self {
            elements: Vec::new(),
            history: History::new(),
            tools: ToolManager::with_toolbox(toolbox),
            eraser_tolerance,
            revision: 0,
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn action_state(&self) -> ActionState {
        self.tools.state
    }

    pub fn current_tool(&self) -> ToolKind {
        self.tools.current_tool
    }

    /// Counter bumped on every change to the elements; drives redraws.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    fn position(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == id)
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn commit(&mut self) -> Mutation {
        self.history.commit(self.elements.clone());
        self.touch();
        Mutation::Committed
    }

    /// Seed the canvas from an initial snapshot: the history restarts with a
    /// single entry.
    pub fn load(&mut self, elements: Vec<Element>) {
        self.history.reset(elements.clone());
        self.elements = elements;
        self.touch();
    }

    /// Replace the elements wholesale, leaving the history alone.
    pub fn replace(&mut self, elements: Vec<Element>) {
        self.elements = elements;
        self.touch();
    }

    pub fn pointer_down(&mut self, point: Point) -> Mutation {
        match self.tools.state {
            ActionState::Idle => {}
            ActionState::Erasing { .. } => return self.erase_at(point),
            ActionState::Drawing(_) | ActionState::Writing(_) => return Mutation::Unchanged,
        }

        let tool = self.tools.current_tool;
        let Some(kind) = tool.element_kind() else {
            self.tools.state = ActionState::Erasing { removed: 0 };
            return self.erase_at(point);
        };

        let element = Element::create(kind, point, self.tools.toolbox.element_style(tool));
        let id = element.id();
        self.elements.push(element);
        self.tools.state = if tool == ToolKind::Text {
            ActionState::Writing(id)
        } else {
            ActionState::Drawing(id)
        };
        self.touch();
        Mutation::Live
    }

    pub fn pointer_move(&mut self, point: Point) -> Mutation {
        match self.tools.state {
            ActionState::Drawing(id) => {
                let Some(index) = self.position(id) else {
                    return Mutation::Unchanged;
                };
                self.elements[index].update(point);
                self.touch();
                Mutation::Live
            }
            ActionState::Erasing { .. } => self.erase_at(point),
            ActionState::Idle | ActionState::Writing(_) => Mutation::Unchanged,
        }
    }

    pub fn pointer_up(&mut self) -> Mutation {
        match self.tools.state {
            ActionState::Drawing(id) => {
                self.tools.state = ActionState::Idle;
                let Some(index) = self.position(id) else {
                    log::debug!("Element {} vanished while drawing", id);
                    return Mutation::Unchanged;
                };
                self.elements[index].finalize();
                self.commit()
            }
            ActionState::Erasing { removed } => {
                self.tools.state = ActionState::Idle;
                if removed > 0 {
                    self.commit()
                } else {
                    Mutation::Unchanged
                }
            }
            ActionState::Idle | ActionState::Writing(_) => Mutation::Unchanged,
        }
    }

    /// The text overlay lost focus with `text` in it.
    pub fn text_blur(&mut self, text: &str) -> Mutation {
        let ActionState::Writing(id) = self.tools.state else {
            return Mutation::Unchanged;
        };
        self.tools.state = ActionState::Idle;
        let Some(index) = self.position(id) else {
            log::debug!("Element {} vanished while writing", id);
            return Mutation::Unchanged;
        };
        if text.trim().is_empty() {
            self.elements.remove(index);
            self.touch();
            return Mutation::Live;
        }
        if let Element::Text(t) = &mut self.elements[index] {
            t.text = text.to_string();
        }
        self.commit()
    }

    /// Switch tools. An element still being drawn or written is discarded;
    /// deletions made by a held eraser are committed.
    pub fn select_tool(&mut self, tool: ToolKind) -> Mutation {
        match self.tools.set_tool(tool) {
            ActionState::Drawing(id) | ActionState::Writing(id) => match self.position(id) {
                Some(index) => {
                    self.elements.remove(index);
                    self.touch();
                    Mutation::Live
                }
                None => Mutation::Unchanged,
            },
            ActionState::Erasing { removed } if removed > 0 => self.commit(),
            ActionState::Erasing { .. } | ActionState::Idle => Mutation::Unchanged,
        }
    }

    pub fn undo(&mut self) -> Mutation {
        match self.history.undo() {
            Some(snapshot) => {
                self.elements = snapshot.to_vec();
                self.touch();
                Mutation::Live
            }
            None => Mutation::Unchanged,
        }
    }

    pub fn redo(&mut self) -> Mutation {
        match self.history.redo() {
            Some(snapshot) => {
                self.elements = snapshot.to_vec();
                self.touch();
                Mutation::Live
            }
            None => Mutation::Unchanged,
        }
    }

    /// Geometry of the text overlay while writing.
    pub fn text_overlay(&self) -> Option<TextOverlay> {
        let ActionState::Writing(id) = self.tools.state else {
            return None;
        };
        match self.get(id)? {
            Element::Text(text) => Some(TextOverlay {
                element: id,
                anchor: text.anchor(),
                size: text.font_size(),
                color: text.style.stroke,
            }),
            _ => None,
        }
    }

    fn erase_at(&mut self, point: Point) -> Mutation {
        let tolerance = self.eraser_tolerance;
        let before = self.elements.len();
        self.elements.retain(|e| !e.hit_test(point, tolerance));
        let removed = before - self.elements.len();
        if removed == 0 {
            return Mutation::Unchanged;
        }
        if let ActionState::Erasing { removed: total } = &mut self.tools.state {
            *total += removed;
        }
        self.touch();
        Mutation::Live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::ElementKind;

    fn draw(board: &mut Board, tool: ToolKind, from: Point, to: Point) -> ElementId {
        board.select_tool(tool);
        assert_eq!(board.pointer_down(from), Mutation::Live);
        board.pointer_move(to);
        let id = board.action_state().in_progress().unwrap();
        assert_eq!(board.pointer_up(), Mutation::Committed);
        id
    }

    #[test]
    fn test_rectangle_drag_commits() {
        // Pointer down at (10,10), move to (50,50), release.
        let mut board = Board::new();
        board.select_tool(ToolKind::Rectangle);
        board.pointer_down(Point::new(10.0, 10.0));
        assert!(matches!(board.action_state(), ActionState::Drawing(_)));
        board.pointer_move(Point::new(50.0, 50.0));
        assert_eq!(board.pointer_up(), Mutation::Committed);

        assert_eq!(board.elements().len(), 1);
        let Element::Rectangle(rect) = &board.elements()[0] else {
            panic!("expected a rectangle");
        };
        assert_eq!((rect.x1, rect.y1, rect.x2, rect.y2), (10.0, 10.0, 50.0, 50.0));
        assert_eq!(board.history().len(), 2);
        assert!(board.history().current()[0] == board.elements()[0]);
        assert!(board.action_state().is_idle());
    }

    #[test]
    fn test_brush_samples_and_dedup() {
        let mut board = Board::new();
        board.pointer_down(Point::new(0.0, 0.0));
        board.pointer_move(Point::new(5.0, 0.0));
        board.pointer_move(Point::new(5.0, 0.0));
        board.pointer_move(Point::new(9.0, 2.0));
        board.pointer_up();
        let Element::Brush(brush) = &board.elements()[0] else {
            panic!("expected a brush stroke");
        };
        assert_eq!(brush.points.len(), 3);
        assert!(!brush.outline().elements().is_empty());
    }

    #[test]
    fn test_text_blur_commits() {
        let mut board = Board::new();
        board.select_tool(ToolKind::Text);
        board.pointer_down(Point::new(20.0, 30.0));
        let overlay = board.text_overlay().unwrap();
        assert_eq!(overlay.anchor, Point::new(20.0, 30.0));
        assert_eq!(overlay.size, 32.0);
        assert_eq!(board.pointer_up(), Mutation::Unchanged);
        assert_eq!(board.text_blur("hello"), Mutation::Committed);
        let Element::Text(text) = &board.elements()[0] else {
            panic!("expected text");
        };
        assert_eq!(text.text, "hello");
        assert_eq!(board.history().len(), 2);
        assert!(board.text_overlay().is_none());
    }

    #[test]
    fn test_empty_text_blur_discards() {
        let mut board = Board::new();
        board.select_tool(ToolKind::Text);
        board.pointer_down(Point::new(20.0, 30.0));
        assert_eq!(board.text_blur(""), Mutation::Live);
        assert!(board.elements().is_empty());
        assert_eq!(board.history().len(), 1);
        assert!(board.action_state().is_idle());
    }

    #[test]
    fn test_eraser_commits_once() {
        // Two elements, erase one; then undo restores it.
        let mut board = Board::new();
        draw(&mut board, ToolKind::Line, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        let keep = draw(&mut board, ToolKind::Line, Point::new(0.0, 50.0), Point::new(100.0, 50.0));
        assert_eq!(board.history().len(), 3);

        board.select_tool(ToolKind::Eraser);
        assert_eq!(board.pointer_down(Point::new(50.0, 1.0)), Mutation::Live);
        assert_eq!(board.pointer_move(Point::new(60.0, 1.0)), Mutation::Unchanged);
        assert_eq!(board.pointer_up(), Mutation::Committed);

        assert_eq!(board.elements().len(), 1);
        assert_eq!(board.elements()[0].id(), keep);
        assert_eq!(board.history().len(), 4);

        board.undo();
        assert_eq!(board.elements().len(), 2);
    }

    #[test]
    fn test_eraser_miss_commits_nothing() {
        let mut board = Board::new();
        draw(&mut board, ToolKind::Line, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        board.select_tool(ToolKind::Eraser);
        board.pointer_down(Point::new(50.0, 80.0));
        assert_eq!(board.pointer_up(), Mutation::Unchanged);
        assert_eq!(board.history().len(), 2);
    }

    #[test]
    fn test_tool_switch_discards_in_progress() {
        let mut board = Board::new();
        board.select_tool(ToolKind::Circle);
        board.pointer_down(Point::new(0.0, 0.0));
        board.pointer_move(Point::new(30.0, 30.0));
        assert_eq!(board.select_tool(ToolKind::Line), Mutation::Live);
        assert!(board.elements().is_empty());
        assert_eq!(board.history().len(), 1);
        assert_eq!(board.pointer_up(), Mutation::Unchanged);
    }

    #[test]
    fn test_tool_switch_while_writing_discards() {
        let mut board = Board::new();
        board.select_tool(ToolKind::Text);
        board.pointer_down(Point::new(0.0, 0.0));
        board.select_tool(ToolKind::Brush);
        assert!(board.elements().is_empty());
        assert_eq!(board.text_blur("late"), Mutation::Unchanged);
    }

    #[test]
    fn test_tool_switch_while_erasing_commits() {
        let mut board = Board::new();
        draw(&mut board, ToolKind::Line, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        board.select_tool(ToolKind::Eraser);
        board.pointer_down(Point::new(10.0, 0.0));
        assert_eq!(board.select_tool(ToolKind::Brush), Mutation::Committed);
        assert!(board.elements().is_empty());
        assert_eq!(board.history().len(), 3);
    }

    #[test]
    fn test_undo_while_drawing_orphans_element() {
        let mut board = Board::new();
        board.select_tool(ToolKind::Rectangle);
        draw(&mut board, ToolKind::Rectangle, Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        board.pointer_down(Point::new(20.0, 20.0));
        board.undo();
        assert!(board.elements().is_empty());
        assert_eq!(board.pointer_move(Point::new(40.0, 40.0)), Mutation::Unchanged);
        assert_eq!(board.pointer_up(), Mutation::Unchanged);
        assert!(board.action_state().is_idle());
        assert!(board.history().can_redo());
    }

    #[test]
    fn test_load_resets_history() {
        let mut board = Board::new();
        draw(&mut board, ToolKind::Line, Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let seed = vec![Element::create(
            ElementKind::Arrow,
            Point::new(5.0, 5.0),
            Default::default(),
        )];
        board.load(seed.clone());
        assert_eq!(board.elements(), seed.as_slice());
        assert_eq!(board.history().len(), 1);
        assert_eq!(board.undo(), Mutation::Unchanged);
    }

    #[test]
    fn test_replace_leaves_history() {
        let mut board = Board::new();
        draw(&mut board, ToolKind::Line, Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        let revision = board.revision();
        board.replace(Vec::new());
        assert!(board.elements().is_empty());
        assert_eq!(board.history().len(), 2);
        assert!(board.revision() > revision);
        // Undo goes back relative to the local history.
        board.undo();
        assert!(board.elements().is_empty());
        board.redo();
        assert_eq!(board.elements().len(), 1);
    }
}
