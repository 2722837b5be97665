mod output;
mod state;

pub use output::{OutputBuffer, OutputLine, Segment};
pub use state::{Action, App, Focus};
