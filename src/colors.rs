use crossterm::event::KeyCode;
use crossterm::style::Color;

/// Shared color scheme state
#[derive(Clone, Copy)]
pub struct ColorState {
    pub scheme: u8,
}

impl ColorState {
    pub fn new(default_scheme: u8) -> Self {
        Self { scheme: default_scheme.min(9) }
    }

    /// Handle color scheme key input. Returns true if key was handled.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('!') => self.scheme = 1,  // Shift+1: fire
            KeyCode::Char('@') => self.scheme = 2,  // Shift+2: ice
            KeyCode::Char('#') => self.scheme = 3,  // Shift+3: pink
            KeyCode::Char('$') => self.scheme = 4,  // Shift+4: gold
            KeyCode::Char('%') => self.scheme = 5,  // Shift+5: electric
            KeyCode::Char('^') => self.scheme = 6,  // Shift+6: lava
            KeyCode::Char('&') => self.scheme = 7,  // Shift+7: mono
            KeyCode::Char('*') => self.scheme = 8,  // Shift+8: rainbow
            KeyCode::Char('(') => self.scheme = 9,  // Shift+9: neon
            KeyCode::Char(')') => self.scheme = 0,  // Shift+0: cyber
            _ => return false,
        }
        true
    }

    pub fn theme(&self) -> Theme {
        Theme::from_accent(accent_rgb(self.scheme))
    }
}

/// Get text color from scheme based on intensity (0-3)
pub fn scheme_color(scheme: u8, intensity: u8, bold: bool) -> (Color, bool) {
    match scheme {
        1 => match intensity {  // fire
            0 => (Color::DarkRed, false),
            1 => (Color::Red, false),
            2 => (Color::DarkYellow, bold),
            _ => (Color::Yellow, true),
        },
        2 => match intensity {  // ice
            0 => (Color::DarkBlue, false),
            1 => (Color::Blue, false),
            2 => (Color::Cyan, bold),
            _ => (Color::AnsiValue(14), true),
        },
        3 => match intensity {  // pink
            0 => (Color::DarkMagenta, false),
            1 => (Color::Magenta, false),
            2 => (Color::Magenta, bold),
            _ => (Color::AnsiValue(13), true),
        },
        4 => match intensity {  // gold
            0 => (Color::DarkYellow, false),
            1 => (Color::Yellow, false),
            2 => (Color::Yellow, bold),
            _ => (Color::AnsiValue(11), true),
        },
        5 => match intensity {  // electric
            0 => (Color::DarkCyan, false),
            1 => (Color::Cyan, false),
            2 => (Color::White, bold),
            _ => (Color::White, true),
        },
        6 => match intensity {  // lava
            0 => (Color::DarkRed, false),
            1 => (Color::Red, false),
            2 => (Color::Magenta, bold),
            _ => (Color::AnsiValue(9), true),
        },
        7 => match intensity {  // mono
            0 => (Color::DarkGrey, false),
            1 => (Color::Grey, false),
            2 => (Color::White, bold),
            _ => (Color::White, true),
        },
        8 => match intensity {  // rainbow
            0 => (Color::Red, false),
            1 => (Color::Yellow, false),
            2 => (Color::Green, bold),
            _ => (Color::Cyan, true),
        },
        9 => match intensity {  // neon
            0 => (Color::DarkBlue, false),
            1 => (Color::Blue, false),
            2 => (Color::Magenta, bold),
            _ => (Color::AnsiValue(13), true),
        },
        _ => match intensity {  // cyber (default)
            0 => (Color::DarkCyan, false),
            1 => (Color::Cyan, false),
            2 => (Color::Cyan, true),
            _ => (Color::AnsiValue(14), true),
        },
    }
}

/// Accent used for the atmosphere, map tint and arc trails.
pub fn accent_rgb(scheme: u8) -> Rgb {
    match scheme {
        1 => Rgb::new(255, 120, 40),
        2 => Rgb::new(120, 190, 255),
        3 => Rgb::new(255, 90, 200),
        4 => Rgb::new(255, 205, 60),
        5 => Rgb::new(90, 255, 255),
        6 => Rgb::new(255, 60, 60),
        7 => Rgb::new(220, 220, 220),
        8 => Rgb::new(120, 255, 120),
        9 => Rgb::new(170, 90, 255),
        _ => Rgb::new(0, 200, 255),
    }
}

/// Map semantic status color to scheme color
pub fn status_to_scheme(scheme: u8, status: StatusColor) -> Color {
    if scheme == 7 {
        // Mono mode - use semantic colors
        match status {
            StatusColor::Good => Color::Green,
            StatusColor::Warning => Color::Yellow,
            StatusColor::Critical => Color::Red,
            StatusColor::Info => Color::Cyan,
            StatusColor::Muted => Color::DarkGrey,
        }
    } else {
        let intensity = match status {
            StatusColor::Muted => 0,
            StatusColor::Info => 1,
            StatusColor::Good | StatusColor::Warning => 2,
            StatusColor::Critical => 3,
        };
        scheme_color(scheme, intensity, false).0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StatusColor {
    Good,
    Warning,
    Critical,
    Info,
    Muted,
}

// ============================================================================
// RGB
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear mix toward `other`; `t` is clamped to [0, 1].
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    pub fn scale(self, k: f32) -> Rgb {
        let k = k.max(0.0);
        let ch = |c: u8| (c as f32 * k).round().min(255.0) as u8;
        Rgb::new(ch(self.r), ch(self.g), ch(self.b))
    }

    pub fn luminance(self) -> f32 {
        (0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32) / 255.0
    }

    pub fn to_color(self) -> Color {
        Color::Rgb { r: self.r, g: self.g, b: self.b }
    }
}

/// Colors for one frame, all derived from the scheme accent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Theme {
    pub accent: Rgb,
    pub trail: Rgb,
    pub pulse_core: Rgb,
    pub body_inner: Rgb,
    pub body_outer: Rgb,
    pub background: Rgb,
}

impl Theme {
    pub fn from_accent(accent: Rgb) -> Self {
        Self {
            accent,
            trail: accent.lerp(Rgb::WHITE, 0.25),
            pulse_core: accent.lerp(Rgb::WHITE, 0.8),
            body_inner: accent.scale(0.18).lerp(Rgb::new(12, 18, 30), 0.6),
            body_outer: Rgb::new(4, 6, 12),
            background: Rgb::BLACK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_keys_switch_theme() {
        let mut state = ColorState::new(0);
        assert!(state.handle_key(KeyCode::Char('!')));
        assert_eq!(state.scheme, 1);
        assert_eq!(state.theme().accent, accent_rgb(1));
        assert!(!state.handle_key(KeyCode::Char('x')));
        assert_eq!(state.scheme, 1);
    }

    #[test]
    fn rgb_lerp_endpoints() {
        let a = Rgb::new(10, 20, 30);
        assert_eq!(a.lerp(Rgb::WHITE, 0.0), a);
        assert_eq!(a.lerp(Rgb::WHITE, 1.0), Rgb::WHITE);
        assert_eq!(a.lerp(Rgb::WHITE, 7.0), Rgb::WHITE);
    }

    #[test]
    fn rgb_scale_saturates() {
        assert_eq!(Rgb::new(200, 100, 0).scale(2.0), Rgb::new(255, 200, 0));
        assert_eq!(Rgb::new(200, 100, 0).scale(-1.0), Rgb::BLACK);
    }

    #[test]
    fn mono_status_uses_semantic_colors() {
        assert_eq!(status_to_scheme(7, StatusColor::Critical), Color::Red);
        assert_eq!(status_to_scheme(1, StatusColor::Critical), Color::Yellow);
    }
}
