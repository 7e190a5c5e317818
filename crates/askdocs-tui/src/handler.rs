use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::{debug, warn};

use crate::app::{App, FocusPane, InputMode, Screen};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply(reply) => app.apply_reply(reply),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match (app.screen, app.input_mode) {
        (Screen::Home, _) => handle_home(app, key),
        (Screen::Ask, InputMode::Editing) => handle_ask_editing(app, key),
        (Screen::Ask, InputMode::Normal) => handle_ask_normal(app, key),
    }
}

fn handle_home(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter | KeyCode::Char('a') => app.open_chat(),
        KeyCode::Char('g') => {
            let url = app.config.repository_url.clone();
            open_link(app, &url);
        }
        KeyCode::Char('T') => app.toggle_theme(),
        _ => {}
    }
}

fn handle_ask_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
            app.focus = if app.conversation.is_empty() {
                FocusPane::Prompts
            } else {
                FocusPane::Transcript
            };
        }
        KeyCode::Tab => app.cycle_focus(),
        KeyCode::Enter => app.submit_input(),
        // The input box is disabled while an answer streams in
        _ if app.conversation.is_loading() => {}
        KeyCode::Backspace => app.delete_char_before_cursor(),
        KeyCode::Delete => app.delete_char_at_cursor(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Home => app.move_cursor_home(),
        KeyCode::End => app.move_cursor_end(),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

fn handle_ask_normal(app: &mut App, key: KeyEvent) {
    let half_page = (app.chat_height / 2).max(1);

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Dismiss the error banner first, then leave for the home screen
        KeyCode::Esc => {
            if app.conversation.error().is_some() {
                app.conversation.dismiss_error();
            } else {
                app.screen = Screen::Home;
            }
        }

        KeyCode::Tab => app.cycle_focus(),
        KeyCode::Char('i') | KeyCode::Char('/') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
            app.move_cursor_end();
        }

        KeyCode::Char('C') => app.clear_conversation(),
        KeyCode::Char('T') => app.toggle_theme(),
        KeyCode::Char('y') => {
            if let Some(answer) = app.last_answer().map(str::to_owned) {
                copy_to_clipboard(app, &answer);
            }
        }

        // Half-page scroll (must be before plain 'd'/'u' if those get bound)
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_down(half_page);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_up(half_page);
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Transcript => app.scroll_chat_down(1),
            FocusPane::Prompts => app.prompt_nav_down(),
            FocusPane::Sources => app.source_nav_down(),
            FocusPane::Input => {}
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Transcript => app.scroll_chat_up(1),
            FocusPane::Prompts => app.prompt_nav_up(),
            FocusPane::Sources => app.source_nav_up(),
            FocusPane::Input => {}
        },
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        KeyCode::Enter => match app.focus {
            FocusPane::Prompts => app.submit_selected_prompt(),
            FocusPane::Sources => {
                if let Some(url) = app.selected_source_url() {
                    open_link(app, &url);
                }
            }
            FocusPane::Input => {
                app.input_mode = InputMode::Editing;
            }
            FocusPane::Transcript => {}
        },

        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen != Screen::Ask {
        return;
    }

    let x = mouse.column;
    let y = mouse.row;
    let in_sources = app.sources_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_sources {
                app.source_nav_down();
            } else {
                app.scroll_chat_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_sources {
                app.source_nav_up();
            } else {
                app.scroll_chat_up(3);
            }
        }
        _ => {}
    }
}

fn open_link(app: &mut App, url: &str) {
    match open_url(url) {
        Ok(()) => app.notice = Some(format!("Opened {}", url)),
        Err(err) => {
            warn!(%url, error = %err, "could not open link");
            app.notice = Some(format!("Could not open {}", url));
        }
    }
}

/// Open a URL with the platform's default handler
pub fn open_url(url: &str) -> Result<()> {
    use std::process::{Command, Stdio};

    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        Command::new("xdg-open")
    };

    debug!(%url, "opening link");
    command
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to launch opener for {}", url))?;
    Ok(())
}

fn copy_to_clipboard(app: &mut App, text: &str) {
    let (program, args): (&str, &[&str]) = if cfg!(target_os = "macos") {
        ("pbcopy", &[])
    } else if cfg!(target_os = "windows") {
        ("clip", &[])
    } else {
        ("xclip", &["-selection", "clipboard"])
    };

    match pipe_to_command(program, args, text) {
        Ok(()) => app.notice = Some("Copied answer to clipboard".to_string()),
        Err(err) => {
            warn!(program, error = %err, "clipboard copy failed");
            app.notice = Some(format!("Clipboard unavailable ({})", program));
        }
    }
}

/// Feed `text` to the command's stdin and wait for it to exit successfully.
fn pipe_to_command(program: &str, args: &[&str], text: &str) -> Result<()> {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    let written = match child.stdin.take() {
        // stdin is dropped at the end of this arm so the command sees EOF
        Some(mut stdin) => stdin.write_all(text.as_bytes()),
        None => Ok(()),
    };
    let status = child.wait()?;
    written?;

    if !status.success() {
        anyhow::bail!("{} exited with {}", program, status);
    }
    Ok(())
}
