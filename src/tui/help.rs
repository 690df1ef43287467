use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn draw_help(area: Rect, f: &mut Frame) {
    let key = |k: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::raw("  "),
            Span::styled(k, Style::default().fg(Color::Magenta)),
            Span::raw(format!("{:width$}{desc}", "", width = 12 - k.len().min(11))),
        ])
    };

    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        key("q", "Quit (also Ctrl-C)"),
        key("s", "Start a test"),
        key("x", "Stop the running test"),
        key("m", "Switch quick / monitoring mode"),
        key("p", "Cycle through the mode's profiles"),
        key("e", "Export the diagnostic report"),
        key("tab", "Switch tabs"),
        key("?", "Show this help"),
        Line::from(""),
        Line::from("Quick mode runs one latency/download/upload cycle and"),
        Line::from("prints a verdict for the selected use case. Monitoring"),
        Line::from("mode repeats cycles until the duration budget runs out,"),
        Line::from("logging one record per cycle."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
