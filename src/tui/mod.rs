mod clipboard;
mod help;
mod slider;
mod state;

use crate::api::PolicyClient;
use crate::config::Settings;
use crate::model::{PolicyListItem, PolicyStatus};
use crate::orchestrator::{self, UiCommand, UiEvent};
use crate::policy_list::show_info_modal;
use crate::poller::PollerState;
use crate::sort::SortField;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Terminal,
};
use slider::Slider;
use state::UiState;
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(settings: Settings) -> Result<()> {
    let client = Arc::new(PolicyClient::new(&settings)?);

    let (event_tx, event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_settings = settings.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_settings, event_rx, cmd_tx));

    orchestrator::run_controller(client, settings.poll_interval, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    Ok(())
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    settings: Settings,
    mut event_rx: UnboundedReceiver<UiEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        base_url: settings.base_url.clone(),
        poll_interval: settings.poll_interval,
        info: "Loading policies…".into(),
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(&mut state, k, &cmd_tx) {
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Apply one key press. Returns true when the user asked to quit.
fn handle_key(state: &mut UiState, k: KeyEvent, cmd_tx: &UnboundedSender<UiCommand>) -> bool {
    match (k.modifiers, k.code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
            state.modal.close();
            let _ = cmd_tx.send(UiCommand::Quit);
            return true;
        }
        _ if state.modal.is_open() => {
            if matches!(k.code, KeyCode::Esc | KeyCode::Enter) {
                state.modal.close();
            }
        }
        (_, KeyCode::Tab) => state.tab = (state.tab + 1) % 2,
        (_, KeyCode::Char('?')) => state.tab = 1,
        (_, KeyCode::Char('R')) => {
            state.info = "Reloading…".into();
            let _ = cmd_tx.send(UiCommand::Reload);
        }
        _ if state.tab != 0 => {}
        (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.select_prev(),
        (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.select_next(),
        (_, KeyCode::Enter) | (_, KeyCode::Char('i')) => {
            if let Some(item) = state.selected_policy().cloned() {
                // The handle settles on Esc; nothing here waits for it.
                let _ = show_info_modal(&mut state.modal, &item);
            }
        }
        (_, KeyCode::Char('r')) => send_for_selected(state, cmd_tx, |p| UiCommand::Run {
            id: p.id.clone(),
            name: p.name.clone(),
            status: p.status.clone(),
        }),
        (_, KeyCode::Char('s')) => send_for_selected(state, cmd_tx, |p| UiCommand::Stop {
            id: p.id.clone(),
            name: p.name.clone(),
            status: p.status.clone(),
        }),
        (_, KeyCode::Char('c')) => send_for_selected(state, cmd_tx, |p| {
            UiCommand::DeleteCheckpoint {
                name: p.name.clone(),
            }
        }),
        (_, KeyCode::Char(d @ '1'..='4')) => {
            let idx = d as usize - '1' as usize;
            let keep = state.selected_policy().map(|p| p.id.clone());
            state.list.sort_policies(SortField::ALL[idx]);
            state.reselect(keep);
        }
        (_, KeyCode::Char('y')) => {
            let submission = state
                .selected_policy()
                .and_then(|p| p.submission_id.clone());
            state.info = match submission {
                Some(id) => match clipboard::copy_to_clipboard(&id) {
                    Ok(()) => clipboard::copied_message(&id),
                    Err(e) => format!("Clipboard copy failed: {e:#}"),
                },
                None => "Selected policy has no submission id".into(),
            };
        }
        _ => {}
    }
    false
}

fn send_for_selected(
    state: &mut UiState,
    cmd_tx: &UnboundedSender<UiCommand>,
    make: impl FnOnce(&PolicyListItem) -> UiCommand,
) {
    match state.selected_policy() {
        Some(p) => {
            let _ = cmd_tx.send(make(p));
        }
        None => state.info = "No policy selected".into(),
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Tabs
                Constraint::Length(3), // Poller status + refresh slider
                Constraint::Min(0),    // Body
                Constraint::Length(3), // Info line
            ]
            .as_ref(),
        )
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Policies"), Line::from("Help")])
        .select(state.tab)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("policy-monitor · {}", state.base_url)),
        )
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    draw_status_bar(chunks[1], f, state);

    match state.tab {
        0 => draw_policies(chunks[2], f, state),
        _ => help::draw_help(chunks[2], f),
    }

    let info = Paragraph::new(state.info.as_str())
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Info"));
    f.render_widget(info, chunks[3]);

    if state.modal.is_open() {
        draw_modal(area, f, state);
    }
}

fn draw_status_bar(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)].as_ref())
        .split(area);

    let (label, color) = match state.poller {
        PollerState::Polling => ("polling", Color::Green),
        PollerState::Suspended => ("suspended", Color::Red),
        PollerState::Idle => ("idle", Color::Gray),
    };
    let updated = state
        .list
        .last_updated()
        .map(crate::listing::format_time)
        .unwrap_or_else(|| "-".into());
    let summary = Paragraph::new(Line::from(vec![
        Span::styled(label, Style::default().fg(color)),
        Span::raw(format!(
            " · {} policies · updated {}",
            state.list.len(),
            updated
        )),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Status updates"));
    f.render_widget(summary, row[0]);

    let block = Block::default().borders(Borders::ALL).title("Next refresh");
    let inner = block.inner(row[1]);
    f.render_widget(block, row[1]);
    if state.poller == PollerState::Polling {
        f.render_widget(&refresh_slider(state), inner);
    } else {
        f.render_widget(
            Paragraph::new(Span::styled(
                "stopped (press R to reload)",
                Style::default().fg(Color::DarkGray),
            )),
            inner,
        );
    }
}

fn refresh_slider(state: &UiState) -> Slider {
    let period = state.poll_interval.as_secs_f64();
    Slider {
        min_text: "now".into(),
        max_text: humantime::format_duration(state.poll_interval).to_string(),
        min_value: 0.0,
        max_value: period,
        steps: state.poll_interval.as_secs().max(1) as u32,
        value: period - state.period_elapsed().as_secs_f64(),
    }
}

fn status_style(status: &PolicyStatus) -> Style {
    let color = match status {
        PolicyStatus::Started => Color::Green,
        PolicyStatus::Launched | PolicyStatus::Starting => Color::Cyan,
        PolicyStatus::Stopping => Color::Yellow,
        PolicyStatus::Failed | PolicyStatus::Killed => Color::Red,
        _ => Color::Gray,
    };
    Style::default().fg(color)
}

fn draw_policies(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let sort = state.list.sort_state();
    let header = Row::new(SortField::ALL.iter().enumerate().map(|(i, field)| {
        let marker = match (sort.field == *field, sort.reverse) {
            (true, false) => " ▲",
            (true, true) => " ▼",
            (false, _) => "",
        };
        Cell::from(format!("{} {}{}", i + 1, field.label(), marker))
    }))
    .style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD));

    let sorted = state.list.sorted();
    let rows = sorted.iter().map(|p| {
        Row::new(vec![
            Cell::from(p.name.clone()),
            Cell::from(p.description.clone()),
            Cell::from(Span::styled(p.status.to_string(), status_style(&p.status))),
            Cell::from(p.last_execution_mode.clone().unwrap_or_else(|| "-".into())),
        ])
    });

    let title = if state.loaded {
        format!("Policies ({}/{})", (state.selected + 1).min(sorted.len()), sorted.len())
    } else {
        "Policies (loading)".to_string()
    };
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Length(14),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title))
    .row_highlight_style(Style::default().bg(Color::DarkGray))
    .highlight_symbol("› ");

    let mut table_state = TableState::default().with_selected((!sorted.is_empty()).then_some(state.selected));
    f.render_stateful_widget(table, area, &mut table_state);
}

fn centered(area: Rect, width_pct: u16, height: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(width_pct) / 100) as u16;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_modal(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let Some(modal) = state.modal.open.as_ref() else {
        return;
    };
    let mut lines: Vec<Line> = crate::listing::build_detail(&modal.values)
        .into_iter()
        .map(Line::from)
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Esc", Style::default().fg(Color::Magenta)),
        Span::raw(" close"),
    ]));

    let rect = centered(area, 70, lines.len() as u16 + 2);
    f.render_widget(Clear, rect);
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(modal.controller.as_str())
                .border_style(Style::default().fg(Color::Yellow)),
        );
    f.render_widget(p, rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn item(id: &str, name: &str, status: PolicyStatus) -> PolicyListItem {
        PolicyListItem {
            id: id.into(),
            name: name.into(),
            description: format!("{name} description"),
            status,
            status_info: None,
            submission_id: Some(format!("driver-{id}")),
            last_execution_mode: Some("local".into()),
            last_error: None,
        }
    }

    fn loaded_state() -> UiState {
        let mut state = UiState::default();
        state.apply_event(UiEvent::Loaded(vec![
            item("p-2", "bravo", PolicyStatus::Stopped),
            item("p-1", "alpha", PolicyStatus::Started),
        ]));
        state
    }

    fn press(state: &mut UiState, code: KeyCode, tx: &UnboundedSender<UiCommand>) -> bool {
        handle_key(state, KeyEvent::new(code, KeyModifiers::NONE), tx)
    }

    #[test]
    fn action_keys_target_the_selected_row() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = loaded_state();

        press(&mut state, KeyCode::Char('s'), &tx);
        assert!(matches!(
            rx.try_recv().unwrap(),
            UiCommand::Stop { ref id, status: PolicyStatus::Started, .. } if id == "p-1"
        ));

        press(&mut state, KeyCode::Down, &tx);
        press(&mut state, KeyCode::Char('r'), &tx);
        assert!(matches!(
            rx.try_recv().unwrap(),
            UiCommand::Run { ref name, .. } if name == "bravo"
        ));

        press(&mut state, KeyCode::Char('c'), &tx);
        assert!(matches!(
            rx.try_recv().unwrap(),
            UiCommand::DeleteCheckpoint { ref name } if name == "bravo"
        ));
    }

    #[test]
    fn sort_keys_toggle_direction_and_keep_selection() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = loaded_state();
        assert_eq!(state.selected_policy().unwrap().name, "alpha");

        press(&mut state, KeyCode::Char('1'), &tx);
        assert!(state.list.sort_state().reverse);
        assert_eq!(state.list.sorted()[0].name, "bravo");
        assert_eq!(state.selected_policy().unwrap().name, "alpha");

        press(&mut state, KeyCode::Char('3'), &tx);
        assert_eq!(state.list.sort_state().field, SortField::Status);
        assert!(!state.list.sort_state().reverse);
    }

    #[test]
    fn modal_captures_keys_until_closed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = loaded_state();

        press(&mut state, KeyCode::Enter, &tx);
        assert!(state.modal.is_open());
        press(&mut state, KeyCode::Char('r'), &tx);
        assert!(rx.try_recv().is_err());

        press(&mut state, KeyCode::Esc, &tx);
        assert!(!state.modal.is_open());
    }

    #[test]
    fn reload_and_quit_reach_the_controller() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = loaded_state();

        press(&mut state, KeyCode::Tab, &tx);
        assert_eq!(state.tab, 1);
        assert!(!press(&mut state, KeyCode::Char('R'), &tx));
        assert!(matches!(rx.try_recv().unwrap(), UiCommand::Reload));

        let quit = handle_key(
            &mut state,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            &tx,
        );
        assert!(quit);
        assert!(matches!(rx.try_recv().unwrap(), UiCommand::Quit));
    }

    #[test]
    fn renders_table_and_modal() {
        let mut state = loaded_state();
        let (tx, _rx) = mpsc::unbounded_channel();
        press(&mut state, KeyCode::Char('i'), &tx);

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(f.area(), f, &state)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();

        assert!(text.contains("1 Name ▲"));
        assert!(text.contains("bravo"));
        assert!(text.contains("PolicyInfoModal"));
        assert!(text.contains("Submission: driver-p-1"));
    }
}
