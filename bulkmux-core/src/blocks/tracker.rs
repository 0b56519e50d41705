use bulkmux_io::{CLOSE_BLOCK, Command, END_OF_INPUT, OPEN_BLOCK};

/// What the tracker hands to the batcher for one incoming command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    /// Outermost `{` opened.
    StartBlock,
    /// Outermost `}` closed.
    FinishBlock,
    /// Literal payload (includes `EOF` and empty text).
    Command(Command),
}

/// Brace depth state machine. Unbalanced input never errors: depth clamps at 0.
#[derive(Debug, Clone, Default)]
pub struct DepthTracker {
    depth: usize,
}

impl DepthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns `None` for braces that don't cross the outermost boundary.
    pub fn handle(&mut self, command: Command) -> Option<TrackerEvent> {
        match command.bytes() {
            OPEN_BLOCK => {
                self.depth += 1;
                (self.depth == 1).then_some(TrackerEvent::StartBlock)
            }
            CLOSE_BLOCK => {
                if self.depth == 0 {
                    return None;
                }
                self.depth -= 1;
                (self.depth == 0).then_some(TrackerEvent::FinishBlock)
            }
            END_OF_INPUT => {
                self.depth = 0;
                Some(TrackerEvent::Command(command))
            }
            _ => Some(TrackerEvent::Command(command)),
        }
    }
}
