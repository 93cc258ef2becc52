use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Two-label slider. Stateless; `value` is clamped and snapped at render time.
#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    pub min_text: String,
    pub max_text: String,
    pub min_value: f64,
    pub max_value: f64,
    /// Number of discrete steps between the bounds; 0 means continuous.
    pub steps: u32,
    pub value: f64,
}

impl Slider {
    /// `value` clamped to the bounds and rounded to the nearest step.
    pub fn effective_value(&self) -> f64 {
        let (lo, hi) = if self.min_value <= self.max_value {
            (self.min_value, self.max_value)
        } else {
            (self.max_value, self.min_value)
        };
        let v = if self.value.is_nan() { lo } else { self.value.clamp(lo, hi) };
        if self.steps == 0 || hi == lo {
            return v;
        }
        let step = (hi - lo) / f64::from(self.steps);
        lo + ((v - lo) / step).round() * step
    }

    /// Position of the knob in `[0, 1]`.
    pub fn ratio(&self) -> f64 {
        let span = self.max_value - self.min_value;
        if span == 0.0 {
            return 0.0;
        }
        ((self.effective_value() - self.min_value) / span).clamp(0.0, 1.0)
    }
}

impl Widget for &Slider {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let labels = self.min_text.chars().count() + self.max_text.chars().count() + 2;
        let track = (area.width as usize).saturating_sub(labels);
        if track < 2 {
            return;
        }
        let knob = (self.ratio() * (track - 1) as f64).round() as usize;
        let filled = "━".repeat(knob);
        let empty = "─".repeat(track - 1 - knob);

        let line = Line::from(vec![
            Span::styled(self.min_text.as_str(), Style::default().fg(Color::Gray)),
            Span::raw(" "),
            Span::styled(filled, Style::default().fg(Color::Cyan)),
            Span::styled("●", Style::default().fg(Color::Yellow)),
            Span::styled(empty, Style::default().fg(Color::DarkGray)),
            Span::raw(" "),
            Span::styled(self.max_text.as_str(), Style::default().fg(Color::Gray)),
        ]);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
