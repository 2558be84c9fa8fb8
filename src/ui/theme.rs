//! Custom theme for cliclack output

use cliclack::ThemeState;
use console::Style;

/// Green branding for the interactive log
#[derive(Debug, Clone, Default)]
pub struct TurnipTheme;

impl cliclack::Theme for TurnipTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            _ => Style::new().green(),
        }
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Active => Style::new().green(),
            ThemeState::Submit => Style::new().green().bold(),
        }
    }
}

/// Initialize the global theme
pub fn init_theme() {
    cliclack::set_theme(TurnipTheme);
}
