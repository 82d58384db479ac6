use ratatui::prelude::*;
use ratatui::widgets::*;

/// Character grid the games paint into before it is handed to a `Paragraph`.
pub struct Canvas {
    width: usize,
    height: usize,
    bg: Color,
    cells: Vec<Vec<(char, Style)>>,
}

impl Canvas {
    pub fn new(width: usize, height: usize, bg: Color) -> Self {
        Self {
            width,
            height,
            bg,
            cells: vec![vec![(' ', Style::default().bg(bg)); width]; height],
        }
    }

    pub fn put(&mut self, x: i32, y: i32, ch: char, fg: Color) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        self.cells[y as usize][x as usize] = (ch, Style::default().fg(fg).bg(self.bg));
    }

    /// Paint a rectangle given in field units, scaled onto the canvas.
    pub fn fill_scaled(&mut self, field: (f32, f32), x: f32, y: f32, w: f32, h: f32, ch: char, fg: Color) {
        let sx = self.width as f32 / field.0;
        let sy = self.height as f32 / field.1;
        let x0 = (x * sx).floor() as i32;
        let y0 = (y * sy).floor() as i32;
        let x1 = ((x + w) * sx).ceil().max(x0 as f32 + 1.0) as i32;
        let y1 = ((y + h) * sy).ceil().max(y0 as f32 + 1.0) as i32;
        for cy in y0..y1 {
            for cx in x0..x1 {
                self.put(cx, cy, ch, fg);
            }
        }
    }

    pub fn into_lines(self) -> Vec<Line<'static>> {
        self.cells
            .into_iter()
            .map(|row| {
                let spans: Vec<Span<'static>> = row
                    .into_iter()
                    .map(|(ch, style)| Span::styled(String::from(ch), style))
                    .collect();
                Line::from(spans)
            })
            .collect()
    }
}

/// Bordered frame shared by every game view; returns the drawable interior.
pub fn game_block(frame: &mut Frame, area: Rect, title: &'static str, color: Color) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
        .title(title)
        .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    inner
}
