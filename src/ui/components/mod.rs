mod apply_dialog;
mod command_input;
mod input;
mod key_result;
mod path_prompt;

pub use apply_dialog::{ApplyDialog, ApplyDialogEvent};
pub use command_input::{CommandEvent, CommandInput};
pub use key_result::KeyResult;
pub use path_prompt::{PathPrompt, PathPromptEvent};
