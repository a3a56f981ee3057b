//! Rotating threat globe
//!
//! The view owns every piece of per-session state and is driven by a single
//! thread: drain input, poll background work, snapshot, render, present.

pub mod arcs;
pub mod canvas;
pub mod clock;
pub mod gesture;
pub mod places;
pub mod projection;
pub mod refresh;
pub mod render;
pub mod texture;

use crate::colors::{status_to_scheme, ColorState, StatusColor};
use crate::config::GlobeConfig;
use crate::feed::ThreatFeed;
use crate::help::{render_help_overlay, GLOBE_HELP};
use crate::terminal::{MouseCaptureGuard, Terminal};
use arcs::ThreatArc;
use canvas::Canvas;
use clock::{AnimationClock, FrameScheduler};
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind};
use gesture::{DragController, CELL_PIXEL_WIDTH};
use places::ReferenceTable;
use rand::rngs::StdRng;
use rand::SeedableRng;
use refresh::{RefreshController, RefreshState};
use render::{render_frame, FrameState, RenderStats};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use texture::{TextureLoader, WorldTexture};

/// Size of the generated map used when no texture file is configured.
const BUILTIN_TEXTURE_SIZE: (u32, u32) = (1024, 512);
/// How long print mode waits for the feed and texture.
const PRINT_SETTLE_TIMEOUT: Duration = Duration::from_secs(15);
const TOP_THREATS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Build the per-frame snapshot from the clock, drag state and current arcs.
fn snapshot<'a>(
    clock: &AnimationClock,
    drag: &DragController,
    arcs: &'a [ThreatArc],
    now: Instant,
) -> FrameState<'a> {
    let phases = clock.phases_at(now);
    FrameState {
        rotation: drag.composite(phases.rotation),
        pulse: phases.pulse,
        shimmer: phases.shimmer,
        arcs,
    }
}

pub struct GlobeView {
    config: GlobeConfig,
    table: Arc<ReferenceTable>,
    clock: AnimationClock,
    drag: DragController,
    refresh: RefreshController,
    texture: TextureLoader,
    canvas: Canvas,
    colors: ColorState,
    generation: u64,
    show_help: bool,
}

impl GlobeView {
    pub fn new(config: GlobeConfig, cols: u16, rows: u16, now: Instant) -> Self {
        let feed = config.make_feed(0);
        Self::with_feed(config, feed, cols, rows, now)
    }

    pub(crate) fn with_feed(
        config: GlobeConfig,
        feed: Box<dyn ThreatFeed>,
        cols: u16,
        rows: u16,
        now: Instant,
    ) -> Self {
        let table = Arc::new(ReferenceTable::builtin());
        let refresh = RefreshController::new(feed, table.clone(), StdRng::seed_from_u64(config.seed));

        let texture = match &config.texture {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading world texture");
                TextureLoader::spawn(path.clone())
            }
            None => TextureLoader::ready(WorldTexture::builtin(BUILTIN_TEXTURE_SIZE.0, BUILTIN_TEXTURE_SIZE.1)),
        };

        let clock = AnimationClock::new(now, config.rotation_period, config.pulse_period)
            .with_shimmer_period(config.shimmer_period);

        Self {
            table,
            clock,
            drag: DragController::new(config.sensitivity),
            refresh,
            texture,
            canvas: Canvas::for_terminal(cols, rows),
            colors: ColorState::new(config.scheme),
            generation: 0,
            show_help: false,
            config,
        }
    }

    /// Start the first fetch.
    pub fn mount(&mut self) -> bool {
        self.refresh.mount()
    }

    /// Tear down the current feed and start a new one.
    pub fn refetch(&mut self) {
        self.generation += 1;
        let feed = self.config.make_feed(self.generation);
        let rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(self.generation));
        let mut next = RefreshController::new(feed, self.table.clone(), rng);
        next.mount();
        // Dropping the old controller tears it down
        self.refresh = next;
        tracing::info!(generation = self.generation, "threat feed re-fetch");
    }

    /// Pick up finished background work.
    pub fn poll(&mut self) {
        self.refresh.poll();
        self.texture.poll();
    }

    /// Block until the feed and texture are done or `timeout` passes.
    pub fn settle(&mut self, timeout: Duration) {
        if !self.refresh.settle(timeout) {
            tracing::warn!(state = self.refresh.state().label(), "threat feed did not settle");
        }
        self.texture.wait(timeout);
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.canvas.resize(cols as usize, rows as usize * 2);
    }

    #[cfg(test)]
    pub fn frame_state(&self, now: Instant) -> FrameState<'_> {
        snapshot(&self.clock, &self.drag, self.refresh.arcs(), now)
    }

    #[cfg(test)]
    pub fn refresh(&self) -> &RefreshController {
        &self.refresh
    }

    #[cfg(test)]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Draw the globe into the pixel canvas.
    pub fn render(&mut self, now: Instant) -> RenderStats {
        let frame = snapshot(&self.clock, &self.drag, self.refresh.arcs(), now);
        render_frame(&mut self.canvas, &frame, self.texture.texture(), &self.colors.theme())
    }

    /// Handle one input event.
    pub fn handle_event(&mut self, event: &Event, now: Instant) -> Control {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                let code = normalize_key(key.code, key.modifiers);
                if self.colors.handle_key(code) {
                    return Control::Continue;
                }
                match code {
                    KeyCode::Char('q') | KeyCode::Esc => return Control::Quit,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Control::Quit,
                    KeyCode::Char(' ') => self.clock.toggle_pause(now),
                    KeyCode::Char('?') => self.show_help = !self.show_help,
                    KeyCode::Char('f') | KeyCode::Char('F') => self.refetch(),
                    _ => {}
                }
            }
            Event::Mouse(mouse) => {
                let x = mouse.column as f32 * CELL_PIXEL_WIDTH;
                match mouse.kind {
                    MouseEventKind::Down(MouseButton::Left) => self.drag.drag_start(x),
                    MouseEventKind::Drag(MouseButton::Left) => self.drag.drag_move(x),
                    MouseEventKind::Up(MouseButton::Left) => self.drag.drag_end(),
                    _ => {}
                }
            }
            Event::Resize(cols, rows) => self.resize(*cols, *rows),
            _ => {}
        }
        Control::Continue
    }

    /// Canvas plus text overlays into the terminal buffer.
    pub fn draw(&self, term: &mut Terminal) {
        self.canvas.flush_to(term);

        let (width, height) = term.size();
        let scheme = self.colors.scheme;

        let status = match self.refresh.state() {
            RefreshState::Idle => StatusColor::Muted,
            RefreshState::Loading => StatusColor::Info,
            RefreshState::Ready(_) => StatusColor::Good,
            RefreshState::Failed(_) => StatusColor::Critical,
        };
        let mut line = self.refresh.status_line();
        if self.clock.is_paused() {
            line.push_str("  [paused]");
        }
        term.set_str(1, 0, &line, Some(status_to_scheme(scheme, status)), true);
        if let Some(err) = self.refresh.error() {
            let detail = format!("({})", err);
            term.set_str(1, 1, &detail, Some(status_to_scheme(scheme, StatusColor::Muted)), false);
        }

        let records = self.refresh.records();
        let rows = TOP_THREATS.min((height as usize).saturating_sub(3));
        for (i, record) in records.iter().take(rows).enumerate() {
            let text = format!("{:>3}% {} {}", record.confidence, record.country_code, record.ip);
            let color = if record.confidence >= 90 { StatusColor::Warning } else { StatusColor::Info };
            let x = (width as i32 - text.chars().count() as i32 - 1).max(0);
            term.set_str(x, i as i32 + 1, &text, Some(status_to_scheme(scheme, color)), false);
        }

        if height > 1 {
            let hint = if self.texture.is_pending() {
                "loading map…  ? help  q quit"
            } else if self.texture.is_failed() {
                "map unavailable  ? help  q quit"
            } else {
                "? help  q quit"
            };
            term.set_str(1, height as i32 - 1, hint, Some(status_to_scheme(scheme, StatusColor::Muted)), false);
        }

        if self.show_help {
            render_help_overlay(term, width, height, GLOBE_HELP, scheme);
        }
    }
}

fn normalize_key(code: KeyCode, mods: KeyModifiers) -> KeyCode {
    if code == KeyCode::Char('/') && mods.contains(KeyModifiers::SHIFT) {
        KeyCode::Char('?')
    } else {
        code
    }
}

/// Interactive loop until the user quits.
pub fn run(term: &mut Terminal, config: &GlobeConfig) -> io::Result<()> {
    let (width, height) = term.size();
    let mut view = GlobeView::new(config.clone(), width, height, Instant::now());
    view.mount();

    let _mouse_guard = MouseCaptureGuard::enable()?;
    let mut scheduler = FrameScheduler::start(config.fps, Instant::now());

    'frames: loop {
        while let Some(event) = term.poll_event(Duration::ZERO)? {
            if let Event::Resize(cols, rows) = event {
                term.resize(cols, rows);
                term.clear_screen()?;
            }
            if view.handle_event(&event, Instant::now()) == Control::Quit {
                break 'frames;
            }
        }

        view.poll();

        term.clear();
        let stats = view.render(Instant::now());
        tracing::trace!(drawn = stats.arcs_drawn, culled = stats.arcs_culled, "frame");
        view.draw(term);
        term.present()?;

        if !scheduler.wait_next() {
            break;
        }
    }

    scheduler.stop();
    Ok(())
}

/// Render one settled frame to stdout.
pub fn print_frame(config: &GlobeConfig) -> io::Result<()> {
    let (width, height) = config.print_size;
    let mut view = GlobeView::new(config.clone(), width, height, Instant::now());
    view.mount();
    view.settle(PRINT_SETTLE_TIMEOUT);

    let mut term = Terminal::headless(width, height);
    view.render(Instant::now());
    view.draw(&mut term);
    term.print_to_stdout();
    Ok(())
}
