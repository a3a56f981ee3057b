use crate::colors::scheme_color;
use crate::terminal::Terminal;

pub const GLOBE_HELP: &str = "\
THREAT GLOBE
─────────────────
Drag   Spin the globe
Space  Pause/resume
f      Re-fetch feed
?      Close help
───────────────────────
 GLOBAL CONTROLS
 !-()   Color scheme
 q/Esc  Quit
───────────────────────";

/// Render a centered help box in the current scheme. Lines that do not fit
/// the terminal are cut.
pub fn render_help_overlay(term: &mut Terminal, width: u16, height: u16, help_text: &str, scheme: u8) {
    if help_text.is_empty() || width < 4 || height < 3 {
        return;
    }

    let inner_max = width as usize - 4;
    let lines: Vec<String> = help_text
        .lines()
        .take(height as usize - 2)
        .map(|l| l.chars().take(inner_max).collect())
        .collect();
    let inner = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let box_w = inner + 4;
    let box_h = lines.len() + 2;

    let x0 = ((width as usize).saturating_sub(box_w) / 2) as i32;
    let y0 = ((height as usize).saturating_sub(box_h) / 2) as i32;
    let (border, _) = scheme_color(scheme, 2, false);
    let (text, _) = scheme_color(scheme, 1, false);

    let rule = "─".repeat(box_w - 2);
    term.set_str(x0, y0, &format!("┌{}┐", rule), Some(border), false);
    for (i, line) in lines.iter().enumerate() {
        let y = y0 + 1 + i as i32;
        let pad = inner - line.chars().count();
        term.set(x0, y, '│', Some(border), false);
        term.set_str(x0 + 1, y, &format!(" {}{} ", line, " ".repeat(pad)), Some(text), false);
        term.set(x0 + box_w as i32 - 1, y, '│', Some(border), false);
    }
    term.set_str(x0, y0 + box_h as i32 - 1, &format!("└{}┘", rule), Some(border), false);
}
