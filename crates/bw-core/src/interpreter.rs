use crate::{ChoiceItem, StateBlob, StoryError};

/// A narrative interpreter driven one rendered unit at a time.
///
/// Faults are returned as values from `advance` and `choose`; callers decide
/// whether a fault ends the current path or the whole run.
pub trait StoryInterpreter {
    /// True while more content can be rendered before the next choice point
    /// or ending.
    fn can_continue(&self) -> bool;

    /// Render the next unit of content.
    fn advance(&mut self) -> Result<String, StoryError>;

    /// Choices offered at the current choice point, in index order. Empty at
    /// an ending.
    fn current_choices(&self) -> Vec<ChoiceItem>;

    fn choose(&mut self, index: usize) -> Result<(), StoryError>;

    fn capture_state(&self) -> Result<StateBlob, StoryError>;

    fn restore_state(&mut self, blob: &StateBlob) -> Result<(), StoryError>;

    /// Name of the knot the interpreter is positioned in.
    fn current_knot(&self) -> String;

    /// Most recently rendered line.
    fn current_text(&self) -> String;
}
