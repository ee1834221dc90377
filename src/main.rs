mod app;
mod config;
mod doc;
mod ui;
mod watch;

use anyhow::Result;
use app::{App, InputMode};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use ui::highlight::Highlighter;
use ui::styles::{Theme, ThemeMode};
use watch::{FileWatcher, WatchEvent};

/// Terminal markdown reader with citation navigation
#[derive(Parser)]
#[command(name = "cv", version, about)]
struct Cli {
    /// Markdown file to open
    file: PathBuf,

    /// Color theme: dark, light or auto
    #[arg(long)]
    theme: Option<String>,

    /// Disable file watching
    #[arg(long)]
    no_watch: bool,

    /// Disable mouse support
    #[arg(long)]
    no_mouse: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config(".");
    if let Some(theme) = &cli.theme {
        config.display.theme = theme.clone();
    }
    if cli.no_watch {
        config.features.watch = false;
    }
    if cli.no_mouse {
        config.features.mouse = false;
    }

    let Some(mode) = ThemeMode::parse(&config.display.theme) else {
        anyhow::bail!(
            "unknown theme {:?} (expected dark, light or auto)",
            config.display.theme
        );
    };
    let theme = Theme::select(mode);

    // Load syntax highlighting (once, reused across reloads)
    let highlighter = Highlighter::new();

    // Open the document before entering the alternate screen so a bad path
    // fails with a plain error instead of a garbled terminal
    let (width, height) = crossterm::terminal::size().unwrap_or((100, 40));
    let mut app = App::open(
        &cli.file,
        config,
        theme,
        &highlighter,
        Rect::new(0, 0, width, height),
    )?;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if app.config.features.mouse {
        execute!(stdout, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let result = run_app(&mut terminal, &mut app, &highlighter);

    // Cleanup
    disable_raw_mode()?;
    if app.config.features.mouse {
        execute!(terminal.backend_mut(), DisableMouseCapture)?;
    }
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    hl: &Highlighter,
) -> Result<()> {
    // Channel for file watch events
    let (watch_tx, watch_rx) = mpsc::channel::<WatchEvent>();

    // Debounce state for watcher reloads
    let mut pending_reload = false;
    let mut reload_deadline = Instant::now();

    // Start watching unless disabled; failure downgrades to manual reload
    let mut watcher: Option<FileWatcher> = None;
    if app.config.features.watch {
        match FileWatcher::new(&app.path, 500, watch_tx.clone()) {
            Ok(w) => {
                watcher = Some(w);
                app.watching = true;
            }
            Err(e) => {
                app.notify_error(&format!("Watch unavailable: {} (use r to reload)", e));
            }
        }
    }

    loop {
        // Draw
        terminal.draw(|f| ui::draw(f, app))?;

        // Poll tighter while the return animation is running
        let timeout = if app.viewport.animating() {
            Duration::from_millis(30)
        } else {
            Duration::from_millis(100)
        };
        if event::poll(timeout)? {
            let now = Instant::now();
            match event::read()? {
                Event::Key(key) => {
                    if app.show_help {
                        handle_help_input(app, key);
                    } else {
                        match app.input_mode {
                            InputMode::Search => handle_search_input(app, key, now),
                            InputMode::Normal => {
                                handle_normal_input(app, key, hl, &watch_tx, &mut watcher, now)
                            }
                        }
                    }
                }
                Event::Mouse(mouse) => {
                    let size = terminal.size()?;
                    let frame = Rect::new(0, 0, size.width, size.height);
                    handle_mouse(app, mouse, frame, now);
                }
                Event::Resize(w, h) => {
                    app.resized(Rect::new(0, 0, w, h), hl);
                }
                _ => {}
            }
        }

        // Coalesce watch events, then reload once things settle
        if let Ok(WatchEvent::FileChanged) = watch_rx.try_recv() {
            pending_reload = true;
            reload_deadline = Instant::now() + Duration::from_millis(200);
        }
        if pending_reload && Instant::now() >= reload_deadline {
            pending_reload = false;
            match app.reload(hl) {
                Ok(true) => app.notify("File changed · reloaded"),
                Ok(false) => {}
                Err(e) => app.notify_error(&format!("Reload failed: {}", e)),
            }
        }

        // Advance the return animation and fire due navigator timers
        let now = Instant::now();
        app.tick_scroll(now);
        app.nav.poll(now);

        // Notification decay
        app.tick();

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_normal_input(
    app: &mut App,
    key: KeyEvent,
    hl: &Highlighter,
    watch_tx: &mpsc::Sender<WatchEvent>,
    watcher: &mut Option<FileWatcher>,
    now: Instant,
) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        // Scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => app.page(1, now),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => app.page(-1, now),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_lines(1, now),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_lines(-1, now),
        KeyCode::PageDown | KeyCode::Char(' ') => app.page(1, now),
        KeyCode::PageUp => app.page(-1, now),
        KeyCode::Char('g') | KeyCode::Home => app.jump_top(now),
        KeyCode::Char('G') | KeyCode::End => app.jump_bottom(now),

        // Search
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Char('n') => app.next_match(now),
        KeyCode::Char('N') => app.prev_match(now),

        // Manual reload
        KeyCode::Char('r') => match app.reload(hl) {
            Ok(true) => app.notify("Reloaded"),
            Ok(false) => app.notify("No changes"),
            Err(e) => app.notify_error(&format!("Reload failed: {}", e)),
        },

        // Toggle watch mode
        KeyCode::Char('w') => toggle_watch(app, watch_tx, watcher),

        KeyCode::Char('?') => app.show_help = true,

        // Clear the confirmed search
        KeyCode::Esc => {
            if !app.search_query.is_empty() || !app.matches.is_empty() {
                app.cancel_search();
            }
        }

        _ => {}
    }
}

fn toggle_watch(
    app: &mut App,
    watch_tx: &mpsc::Sender<WatchEvent>,
    watcher: &mut Option<FileWatcher>,
) {
    if app.watching {
        *watcher = None;
        app.watching = false;
        app.notify("Watch stopped");
    } else {
        match FileWatcher::new(&app.path, 500, watch_tx.clone()) {
            Ok(w) => {
                *watcher = Some(w);
                app.watching = true;
                app.notify("Watching for changes...");
            }
            Err(e) => app.notify_error(&format!("Watch error: {}", e)),
        }
    }
}

fn handle_search_input(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Enter => app.confirm_search(now),
        KeyCode::Esc => app.cancel_search(),
        KeyCode::Char(c) => app.push_search_char(c),
        KeyCode::Backspace => app.pop_search_char(),
        _ => {}
    }
}

fn handle_help_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => app.show_help = false,
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, frame: Rect, now: Instant) {
    if app.show_help {
        if let MouseEventKind::Down(_) = mouse.kind {
            app.show_help = false;
        }
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_lines(3, now),
        MouseEventKind::ScrollUp => app.scroll_lines(-3, now),
        MouseEventKind::Down(MouseButton::Left) => {
            app.mouse_click(mouse.column, mouse.row, frame, now);
        }
        _ => {}
    }
}
