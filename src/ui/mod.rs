//! Terminal output for build runs
//!
//! Interactive terminals get `cliclack` log lines and spinners; CI logs get
//! plain `[OK]`/`[FAIL]` prefixed lines so they stay greppable.

mod context;
mod output;
mod progress;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_error, outro_success, remark, section, step_error, step_info,
    step_ok, step_ok_detail, step_warn,
};
pub use progress::TaskSpinner;
pub use theme::{init_theme, TurnipTheme};
