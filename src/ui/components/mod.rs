mod input;
mod prompt;

pub use input::TextInput;
pub use prompt::{Prompt, PromptEvent};
