pub mod canvas;

use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::App;

const GREEN: Color = Color::Rgb(80, 220, 80);
const DIM: Color = Color::Rgb(100, 100, 130);

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Banner
            Constraint::Min(0),    // Content
        ])
        .split(frame.area());

    render_banner(frame, chunks[0]);

    match &app.session {
        Some(session) => {
            let body = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(chunks[1]);
            session.render(frame, body[0]);
            let hint = Paragraph::new(Span::styled(
                " Press Esc to exit the game",
                Style::default().fg(DIM),
            ));
            frame.render_widget(hint, body[1]);
        }
        None => render_shell(frame, chunks[1], app),
    }
}

fn render_banner(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            "Welcome to Terminal Games Hub",
            Style::default().fg(GREEN).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled("Type \"help\" for commands", Style::default().fg(GREEN))),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_shell(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(40, 120, 40)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let prompt = Style::default().fg(GREEN).add_modifier(Modifier::BOLD);
    let text = Style::default().fg(GREEN);

    let mut lines: Vec<Line> = Vec::new();
    for record in &app.history {
        lines.push(Line::from(vec![
            Span::styled("> ", prompt),
            Span::styled(record.command.as_str(), text),
        ]));
        for out in record.output.lines() {
            lines.push(Line::from(Span::styled(out, text)));
        }
        lines.push(Line::from(""));
    }
    lines.push(Line::from(vec![
        Span::styled("> ", prompt),
        Span::styled(app.input.as_str(), text),
        Span::styled("_", Style::default().fg(GREEN).add_modifier(Modifier::SLOW_BLINK)),
    ]));

    // Keep the prompt in view once the transcript outgrows the window.
    let overflow = lines.len().saturating_sub(inner.height as usize);
    let scroll = u16::try_from(overflow).unwrap_or(u16::MAX);
    frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), inner);
}
