//! Terminal output for the CLI
//!
//! Status lines and spinners go to stderr so that command results (package
//! lists, artifact bytes) can be piped from stdout. Interactive terminals get
//! a spinner and symbols; CI and pipes get plain `[OK]`-style lines.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{key_value, section, step_ok_detail, step_warn_hint};
pub use progress::TaskSpinner;
