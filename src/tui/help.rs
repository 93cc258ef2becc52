use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(keys: &[&'static str], width: usize, desc: &'static str) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    let mut used = 0;
    for (i, k) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" / "));
            used += 3;
        }
        spans.push(Span::styled(*k, Style::default().fg(Color::Magenta)));
        used += k.chars().count();
    }
    spans.push(Span::raw(" ".repeat(width.saturating_sub(used) + 2)));
    spans.push(Span::raw(desc));
    Line::from(spans)
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    const W: usize = 12;
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        key_line(&["q", "Ctrl-C"], W, "Quit"),
        key_line(&["tab"], W, "Switch tabs"),
        key_line(&["?"], W, "Show this help"),
        key_line(&["R"], W, "Reload policies and restart status updates"),
        Line::from(""),
        Line::from("Policies tab:"),
        key_line(&["↑/↓", "j/k"], W, "Select policy"),
        key_line(&["Enter", "i"], W, "Show policy details"),
        key_line(&["Esc"], W, "Close details"),
        key_line(&["r"], W, "Run selected policy (unless already started)"),
        key_line(&["s"], W, "Stop selected policy (only when started)"),
        key_line(&["c"], W, "Delete checkpoint of selected policy"),
        key_line(&["y"], W, "Copy submission id to clipboard"),
        key_line(&["1-4"], W, "Sort by name/description/status/mode (again to reverse)"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
