pub mod components;
pub mod layout;
pub mod theme;

use std::io;

use anyhow::Result;
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use crate::session::trainer::{SessionView, StatusDisplay};
use components::koch_strip::KochStrip;
use components::response_panel::ResponsePanel;
use components::stats_table::StatsTable;
use layout::AppLayout;
use theme::Theme;

pub fn render(frame: &mut Frame, view: &SessionView, theme: &Theme) {
    let colors = &theme.colors;
    let area = frame.area();
    frame.render_widget(Block::default().style(Style::default().bg(colors.bg())), area);

    let layout = AppLayout::new(area);

    frame.render_widget(KochStrip::new(view, theme), layout.header);

    frame.render_widget(ResponsePanel::new(view, theme), layout.main);

    let tables = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout.stats);
    frame.render_widget(
        StatsTable::new("Slowest", &view.by_latency, view.target_ms, theme),
        tables[0],
    );
    frame.render_widget(
        StatsTable::new("Least accurate", &view.by_error_ratio, view.target_ms, theme),
        tables[1],
    );

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            "  Type the character you hear  ",
            Style::default().fg(colors.text_pending()),
        ),
        Span::styled("[Esc] Save and quit", Style::default().fg(colors.accent())),
    ]));
    frame.render_widget(footer, layout.footer);
}

/// Display capability backed by the terminal the session runs in.
pub struct TerminalDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    theme: Theme,
}

impl TerminalDisplay {
    pub fn new(terminal: Terminal<CrosstermBackend<io::Stdout>>, theme: Theme) -> Self {
        Self { terminal, theme }
    }

    pub fn into_terminal(self) -> Terminal<CrosstermBackend<io::Stdout>> {
        self.terminal
    }
}

impl StatusDisplay for TerminalDisplay {
    fn show(&mut self, view: &SessionView) -> Result<()> {
        let theme = &self.theme;
        self.terminal.draw(|frame| render(frame, view, theme))?;
        Ok(())
    }
}
