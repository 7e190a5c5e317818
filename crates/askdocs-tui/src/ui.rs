use askdocs_core::{ChatRole, Theme, DEFAULT_PROMPTS, KNOWN_SOURCES};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, FocusPane, InputMode, Screen, APP_TITLE, INPUT_PLACEHOLDER};

/// Colors for one theme
struct Palette {
    accent: Color,
    user: Color,
    assistant: Color,
    muted: Color,
    border: Color,
    error: Color,
    bar_bg: Color,
    bar_fg: Color,
    highlight_bg: Color,
    highlight_fg: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                accent: Color::Blue,
                user: Color::Blue,
                assistant: Color::Magenta,
                muted: Color::DarkGray,
                border: Color::Gray,
                error: Color::Red,
                bar_bg: Color::Gray,
                bar_fg: Color::Black,
                highlight_bg: Color::Blue,
                highlight_fg: Color::White,
            },
            Theme::Dark => Self {
                accent: Color::Cyan,
                user: Color::Cyan,
                assistant: Color::Yellow,
                muted: Color::DarkGray,
                border: Color::DarkGray,
                error: Color::LightRed,
                bar_bg: Color::DarkGray,
                bar_fg: Color::White,
                highlight_bg: Color::Cyan,
                highlight_fg: Color::Black,
            },
        }
    }

    fn border(&self, focused: bool) -> Style {
        Style::default().fg(if focused { self.accent } else { self.border })
    }

    fn highlight(&self) -> Style {
        Style::default()
            .bg(self.highlight_bg)
            .fg(self.highlight_fg)
            .add_modifier(Modifier::BOLD)
    }
}

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("**") else {
            break;
        };
        if end == 0 {
            // "****" is not bold text
            spans.push(Span::raw(rest[..start + 4].to_string()));
            rest = &after_open[2..];
            continue;
        }
        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(
            after_open[..end].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after_open[end + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let palette = Palette::for_theme(app.theme());

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, &palette, frame, header_area);

    match app.screen {
        Screen::Home => render_home_screen(app, &palette, frame, body_area),
        Screen::Ask => render_ask_screen(app, &palette, frame, body_area),
    }

    render_footer(app, &palette, frame, footer_area);
}

fn render_header(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(format!(" {} ", APP_TITLE), Style::default().fg(palette.bar_fg).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(palette.muted),
        ),
    ];

    if app.screen == Screen::Ask {
        spans.push(Span::styled(
            format!("  {}", app.client.ask_url()),
            Style::default().fg(palette.muted),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.bar_bg));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match (app.screen, app.input_mode) {
        (Screen::Home, _) => " HOME ",
        (Screen::Ask, InputMode::Editing) => " INPUT ",
        (Screen::Ask, InputMode::Normal) => " CHAT ",
    };

    let key_style = Style::default().bg(palette.bar_bg).fg(palette.bar_fg);
    let label_style = Style::default();
    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let mut hints: Vec<Span> = Vec::new();
    match (app.screen, app.input_mode) {
        (Screen::Home, _) => {
            hints.extend(hint("Enter", "start chatting"));
            hints.extend(hint("g", "docs & code"));
            hints.extend(hint("T", "theme"));
            hints.extend(hint("q", "quit"));
        }
        (Screen::Ask, InputMode::Editing) => {
            hints.extend(hint("Enter", "send"));
            hints.extend(hint("Tab", "focus"));
            hints.extend(hint("Esc", "stop typing"));
        }
        (Screen::Ask, InputMode::Normal) => {
            hints.extend(hint("Tab", "focus"));
            match app.focus {
                FocusPane::Transcript => hints.extend(hint("j/k", "scroll")),
                FocusPane::Prompts => {
                    hints.extend(hint("j/k", "nav"));
                    hints.extend(hint("Enter", "ask"));
                }
                FocusPane::Sources => {
                    hints.extend(hint("j/k", "nav"));
                    hints.extend(hint("Enter", "open"));
                }
                FocusPane::Input => hints.extend(hint("Enter", "edit")),
            }
            hints.extend(hint("i", "type"));
            if !app.conversation.is_empty() && !app.conversation.is_loading() {
                hints.extend(hint("C", "clear"));
                hints.extend(hint("y", "copy answer"));
            }
            hints.extend(hint("T", "theme"));
            hints.extend(hint("Esc", "back"));
        }
    }

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    spans.extend(hints);
    if let Some(notice) = &app.notice {
        spans.push(Span::styled(format!(" {}", notice), Style::default().fg(palette.muted)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_home_screen(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            APP_TITLE,
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from("Your AI assistant powered by BERT, LLaMA and RAG technology."),
        Line::from(Span::styled(
            "Ask questions about your documents and read the answer as it is written.",
            Style::default().fg(palette.muted),
        )),
        Line::default(),
        Line::from(vec![
            Span::styled(" Enter ", palette.highlight()),
            Span::raw(" Start chatting    "),
            Span::styled(" g ", palette.highlight()),
            Span::raw(" View docs and code"),
        ]),
        Line::default(),
        Line::from(Span::styled(
            app.config.repository_url.clone(),
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        )),
        Line::default(),
        Line::from(Span::styled(
            "This is a demonstration project showcasing Retrieval-Augmented Generation.",
            Style::default().fg(palette.muted),
        )),
    ];

    let height = lines.len() as u16;
    let [_, centered, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(area);

    let home = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(home, centered);
}

fn render_ask_screen(app: &mut App, palette: &Palette, frame: &mut Frame, area: Rect) {
    // Sources sidebar on the left, chat on the right
    let [sidebar_area, chat_column] = Layout::horizontal([
        Constraint::Length(34),
        Constraint::Min(0),
    ])
    .areas(area);

    render_sources(app, palette, frame, sidebar_area);

    let error_height = if app.conversation.error().is_some() { 3 } else { 0 };
    let [error_area, transcript_area, input_area] = Layout::vertical([
        Constraint::Length(error_height),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(chat_column);

    if let Some(error) = app.conversation.error() {
        let banner = Paragraph::new(Line::from(vec![
            Span::styled("Error: ", Style::default().fg(palette.error).bold()),
            Span::styled(error.to_string(), Style::default().fg(palette.error)),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.error)),
        );
        frame.render_widget(banner, error_area);
    }

    if app.conversation.is_empty() {
        render_default_prompts(app, palette, frame, transcript_area);
    } else {
        render_transcript(app, palette, frame, transcript_area);
    }

    render_input(app, palette, frame, input_area);
}

fn render_sources(app: &mut App, palette: &Palette, frame: &mut Frame, area: Rect) {
    app.sources_area = Some(area);
    let focused = app.focus == FocusPane::Sources;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border(focused))
        .title(" Available Sources ");

    let items: Vec<ListItem> = KNOWN_SOURCES
        .iter()
        .map(|source| {
            ListItem::new(vec![
                Line::from(source.name),
                Line::from(Span::styled(source.filename, Style::default().fg(palette.muted))),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(palette.highlight())
        .highlight_symbol("> ");

    if focused {
        frame.render_stateful_widget(list, area, &mut app.source_state);
    } else {
        frame.render_widget(list, area);
    }
}

fn render_default_prompts(app: &mut App, palette: &Palette, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);
    let focused = app.focus == FocusPane::Prompts;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border(focused))
        .title(" Ask me anything ")
        .title_bottom(Line::from(" Select a prompt below or type your own question ").centered());

    let items: Vec<ListItem> = DEFAULT_PROMPTS
        .iter()
        .map(|prompt| {
            let mut lines = Vec::new();
            if let Some(category) = prompt.category {
                lines.push(Line::from(Span::styled(
                    category,
                    Style::default().fg(palette.accent).add_modifier(Modifier::ITALIC),
                )));
            }
            lines.push(Line::from(Span::styled(prompt.title, Style::default().bold())));
            lines.push(Line::from(Span::styled(prompt.prompt, Style::default().fg(palette.muted))));
            lines.push(Line::default());
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(palette.highlight())
        .highlight_symbol("> ");

    if focused {
        frame.render_stateful_widget(list, area, &mut app.prompt_state);
    } else {
        frame.render_widget(list, area);
    }
}

fn render_transcript(app: &mut App, palette: &Palette, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    // Store inner dimensions for scroll calculations (minus borders)
    let resized = app.chat_height != area.height.saturating_sub(2)
        || app.chat_width != area.width.saturating_sub(2);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if resized && app.conversation.is_loading() {
        app.scroll_chat_to_bottom();
    }

    let focused = app.focus == FocusPane::Transcript;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border(focused))
        .title(" Conversation ");

    let transcript = Paragraph::new(Text::from(transcript_lines(app, palette)))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(transcript, area);
}

fn transcript_lines(app: &App, palette: &Palette) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    for msg in app.conversation.messages() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(palette.user).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(palette.assistant).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.is_thinking() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(palette.assistant).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        )));
    }
    lines
}

/// Rows the transcript takes once wrapped to `width`, counted by the same
/// word wrapping the conversation pane renders with.
pub fn transcript_height(app: &App, width: u16) -> usize {
    let palette = Palette::for_theme(app.theme());
    Paragraph::new(Text::from(transcript_lines(app, &palette)))
        .wrap(Wrap { trim: false })
        .line_count(width)
}

fn render_input(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let loading = app.conversation.is_loading();
    let editing = app.input_mode == InputMode::Editing && app.focus == FocusPane::Input;
    let border_color = if loading {
        palette.muted
    } else if editing {
        Color::Yellow
    } else {
        palette.border
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(if loading { " Ask (waiting for answer) " } else { " Ask " });

    // Horizontal scroll keeps the cursor visible; inner width excludes borders
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 || cursor_pos < inner_width {
        0
    } else {
        cursor_pos - inner_width + 1
    };

    let input = if app.input.is_empty() {
        Paragraph::new(Span::styled(INPUT_PLACEHOLDER, Style::default().fg(palette.muted)))
    } else {
        let visible_text: String = app.input.chars().skip(scroll_offset).take(inner_width).collect();
        Paragraph::new(visible_text).style(Style::default().fg(palette.user))
    };

    frame.render_widget(input.block(block), area);

    if editing && !loading {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use crate::tui::ReplyEvent;
    use ratatui::{backend::TestBackend, Terminal};

    fn span_texts(line: &Line) -> Vec<(String, bool)> {
        line.spans
            .iter()
            .map(|s| (s.content.to_string(), s.style.add_modifier.contains(Modifier::BOLD)))
            .collect()
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_markdown_bold() {
        let line = parse_markdown_line("Use **torque wrench** on **bolts**.");
        assert_eq!(
            span_texts(&line),
            vec![
                ("Use ".to_string(), false),
                ("torque wrench".to_string(), true),
                (" on ".to_string(), false),
                ("bolts".to_string(), true),
                (".".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_markdown_unclosed_bold_is_literal() {
        let line = parse_markdown_line("2 ** 3 is eight");
        assert_eq!(span_texts(&line), vec![("2 ** 3 is eight".to_string(), false)]);
    }

    #[test]
    fn test_home_screen_renders_title() {
        let (mut app, _rx) = test_app("http://127.0.0.1:9");
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains(APP_TITLE));
        assert!(text.contains("Start chatting"));
    }

    #[test]
    fn test_empty_chat_shows_prompts_and_sources() {
        let (mut app, _rx) = test_app("http://127.0.0.1:9");
        app.open_chat();
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Available Sources"));
        assert!(text.contains("Air France Presentation"));
        assert!(text.contains("Safety protocols"));
        assert!(text.contains(INPUT_PLACEHOLDER));
    }

    #[test]
    fn test_thinking_and_error_banner() {
        let (mut app, _rx) = test_app("http://127.0.0.1:9");
        app.open_chat();
        app.conversation.begin_turn("Where is the manual?").unwrap();

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Where is the manual?"));
        assert!(text.contains("Thinking."));

        app.conversation.fail_reply("HTTP error! status: 404");
        terminal.draw(|f| render(&mut app, f)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Error: HTTP error! status: 404"));
        assert!(!text.contains("Thinking"));
    }

    #[test]
    fn test_word_wrapped_answer_keeps_newest_line_visible() {
        let (mut app, _rx) = test_app("http://127.0.0.1:9");
        app.open_chat();
        app.conversation.begin_turn("q").unwrap();
        app.apply_reply(ReplyEvent::Started);

        // 60 columns leave a 24-column conversation pane beside the sidebar
        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();
        assert_eq!(app.chat_width, 24);

        // Each line is 44 chars: two rows by character count, three on word breaks
        for i in 0..12 {
            app.apply_reply(ReplyEvent::Delta(format!(
                "aaaaaaaaaaaaa{:02} bbbbbbbbbbbbbbb cccccccccccc\n",
                i
            )));
        }
        app.apply_reply(ReplyEvent::Delta("FINALLINE".into()));
        terminal.draw(|f| render(&mut app, f)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("FINALLINE"));
        // You: / q / blank / AI: / 36 wrapped rows / FINALLINE / blank
        assert_eq!(app.transcript_line_count(), 42);
    }
}
