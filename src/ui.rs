use crate::app::App;
use crate::browser;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

pub fn ui(f: &mut Frame, app: &mut App) {
    if let Some((title, body)) = app.preview.clone() {
        render_preview(f, app, &title, &body);
        return;
    }
    if app.browser.is_some() {
        render_browser(f, app);
        return;
    }
    if app.show_terminal {
        render_terminal(f, app);
        return;
    }

    let status_bar_height = if app.prompt.is_some() || app.confirmation.is_some() {
        4
    } else if let Some(msg) = &app.status_message {
        msg.lines().count() as u16 + 1
    } else {
        2
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(status_bar_height),
            ]
            .as_ref(),
        )
        .split(f.size());

    let header = create_header(app);
    f.render_widget(header, chunks[0]);

    render_main_list(f, app, chunks[1]);

    let status = create_status_bar(app);
    f.render_widget(status, chunks[2]);
}

fn create_header(app: &App) -> Paragraph {
    let color_scheme = app.config.get_color_scheme();
    let mut spans = vec![Span::styled(
        format!("iDevice tweaks v{}", crate::app::get_app_version()),
        Style::default()
            .fg(color_scheme.get_color("primary"))
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(update) = &app.update_notice {
        spans.push(Span::styled(
            format!("  - update {} available! (u to dismiss)", update.latest_version),
            Style::default().fg(color_scheme.get_color("warning")),
        ));
    }

    Paragraph::new(Line::from(spans)).alignment(Alignment::Center)
}

fn render_main_list(f: &mut Frame, app: &mut App, area: Rect) {
    let color_scheme = app.config.get_color_scheme();

    let list_items: Vec<ListItem> = if app.view_level == 0 {
        app.categories()
            .iter()
            .map(|category| {
                let count = app.tweaks_in(*category).len();
                let line = Line::from(vec![
                    Span::styled(
                        category.to_string(),
                        Style::default()
                            .fg(color_scheme.get_color("secondary"))
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  ({})", count),
                        Style::default().fg(color_scheme.get_color("text_dim")),
                    ),
                ]);
                ListItem::new(line)
            })
            .collect()
    } else {
        app.current_tweaks()
            .into_iter()
            .map(|tweak| {
                let marker = if app.config.is_enabled(&tweak.name) {
                    Span::styled(
                        "[x] ",
                        Style::default()
                            .fg(color_scheme.get_color("success"))
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::styled("[ ] ", Style::default().fg(color_scheme.get_color("text_dim")))
                };
                let name = Span::styled(
                    tweak.name.clone(),
                    Style::default().fg(color_scheme.get_color("text")),
                );
                let description = Span::styled(
                    format!("  {}", tweak.description),
                    Style::default().fg(color_scheme.get_color("text_dim")),
                );
                ListItem::new(Line::from(vec![marker, name, description]))
            })
            .collect()
    };

    let title = if app.view_level == 0 {
        "Categories".to_string()
    } else {
        app.current_category().to_string()
    };

    let list = List::new(list_items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .fg(color_scheme.get_color("primary"))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let state = if app.view_level == 0 {
        &mut app.category_list_state
    } else {
        &mut app.tweak_list_state
    };

    f.render_stateful_widget(list, area, state);
}

fn create_status_bar(app: &App) -> Paragraph {
    let color_scheme = app.config.get_color_scheme();
    let (status_text, style) = if app.prompt.is_some() {
        (
            format!(
                "{} (Enter to confirm, Esc to cancel)\nInput: {}",
                app.prompt_label(),
                app.input_buffer
            ),
            Style::default()
                .fg(color_scheme.get_color("primary"))
                .add_modifier(Modifier::BOLD),
        )
    } else if let Some((message, _)) = &app.confirmation {
        (
            format!("{}\nInput: {}", message, app.input_buffer),
            Style::default()
                .fg(color_scheme.get_color("error"))
                .add_modifier(Modifier::BOLD),
        )
    } else if app.run_in_progress() {
        (
            format!("{}  (c to cancel, t for terminal)", app.progress_text),
            Style::default().fg(color_scheme.get_color("warning")),
        )
    } else if let Some(message) = &app.status_message {
        let color = if app.has_error { "error" } else { "primary" };
        (message.clone(), Style::default().fg(color_scheme.get_color(color)))
    } else {
        (
            match app.view_level {
                0 => "↑↓ select, → or Enter to open, a apply enabled, t terminal, f files, q quit"
                    .to_string(),
                _ => {
                    let mut help = "↑↓ select, Enter toggle, a apply, ← back, q quit".to_string();
                    if app.current_category() == crate::tweaks::TweakCategory::Custom {
                        help.push_str(", n new, d delete, e export, i import");
                    }
                    help
                }
            },
            Style::default().fg(color_scheme.get_color("primary")),
        )
    };

    Paragraph::new(status_text)
        .style(style)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
}

fn render_terminal(f: &mut Frame, app: &mut App) {
    let color_scheme = app.config.get_color_scheme();
    let lines = app.log.snapshot();
    let text: Vec<Line> = lines
        .iter()
        .map(|line| {
            let style = if line.starts_with("[!]") {
                Style::default().fg(color_scheme.get_color("error"))
            } else if line.starts_with("[+]") {
                Style::default().fg(color_scheme.get_color("success"))
            } else {
                Style::default().fg(color_scheme.get_color("text"))
            };
            Line::from(Span::styled(line.clone(), style))
        })
        .collect();

    let title = if app.run_in_progress() {
        format!("Terminal - {} (c to cancel)", app.progress_text)
    } else {
        "Terminal - t to close, ↑/↓ to scroll, x to clear".to_string()
    };

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(Style::default().fg(color_scheme.get_color("primary"))),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.terminal_scroll, 0));
    f.render_widget(paragraph, f.size());
}

fn render_browser(f: &mut Frame, app: &mut App) {
    let color_scheme = app.config.get_color_scheme();
    let browser = app.browser.as_ref().unwrap();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.size());

    let items: Vec<ListItem> = browser
        .entries
        .iter()
        .map(|entry| {
            let (prefix, style) = if entry.is_directory {
                ("▸ ", Style::default().fg(color_scheme.get_color("secondary")))
            } else {
                ("  ", Style::default().fg(color_scheme.get_color("text")))
            };
            let meta = if entry.is_directory {
                String::new()
            } else {
                format!(
                    "  {} · {}",
                    browser::formatted_size(entry.size),
                    browser::detect_file_type(&entry.path)
                )
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{}{}", prefix, entry.name), style),
                Span::styled(meta, Style::default().fg(color_scheme.get_color("text_dim"))),
            ]))
        })
        .collect();

    let title = match &browser.error {
        Some(err) => format!("{} - {}", browser.current_path.display(), err),
        None => browser.current_path.display().to_string(),
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .fg(color_scheme.get_color("primary"))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    f.render_stateful_widget(list, chunks[0], &mut app.browser_list_state);

    let help = Paragraph::new("↑↓ select, Enter open/preview, ← parent, Esc close")
        .style(Style::default().fg(color_scheme.get_color("primary")))
        .alignment(Alignment::Center);
    f.render_widget(help, chunks[1]);
}

fn render_preview(f: &mut Frame, app: &App, title: &str, body: &str) {
    let color_scheme = app.config.get_color_scheme();
    let text = format!("{}\n\n[ Esc to return, ↑/↓ to scroll ]", body);
    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .style(Style::default().fg(color_scheme.get_color("primary"))),
        )
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false })
        .scroll((app.preview_scroll, 0));
    f.render_widget(paragraph, f.size());
}
