use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

pub mod layout;
pub mod tabs;

use crate::app::{App, InputMode, StatusLevel, Tab};
use crate::config::short_addr;
use crate::domain::party::Connection;
use crate::sync::TxPhase;

pub fn draw(f: &mut Frame, app: &App) {
    let areas = layout::areas(f.size());

    draw_header(f, areas.header, app);
    tabs::draw_tab_bar(f, areas.tabs, app);
    tabs::draw_party_list(f, areas.list, app);
    tabs::draw_detail_panel(f, areas.details, app);
    draw_status_line(f, areas.status_line, app);
    draw_command_line(f, areas.command_line, app);

    if app.help_open {
        draw_help_popup(f, areas.size);
    }
    if app.notification.is_some() {
        draw_notification(f, areas.size, app);
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let network_color = if app.online {
        Color::LightGreen
    } else {
        Color::LightRed
    };
    let title = Line::from(vec![
        Span::styled(
            "PartyTea",
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("●", Style::default().fg(network_color)),
        Span::raw(format!(" {} ", app.network.name)),
        Span::styled("RPC", Style::default().fg(Color::DarkGray)),
        Span::raw(format!(" {}", app.endpoint)),
    ]);

    let left = Paragraph::new(title)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);

    let wallet = match app.connection {
        Connection::Wallet(address) => short_addr(&address.to_string()),
        Connection::ReadOnly => "read-only".to_string(),
        Connection::Disconnected => "disconnected".to_string(),
    };
    let mut spans = vec![
        Span::styled("Wallet ", Style::default().fg(Color::DarkGray)),
        Span::raw(wallet),
    ];
    if app.is_owner() {
        spans.push(Span::styled("  owner", Style::default().fg(Color::LightYellow)));
    }
    let parties = app
        .party_count
        .map(|count| count.to_string())
        .unwrap_or_else(|| "--".to_string());
    spans.push(Span::styled("  Parties ", Style::default().fg(Color::DarkGray)));
    spans.push(Span::raw(parties));

    let right = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);

    f.render_widget(left, chunks[0]);
    f.render_widget(right, chunks[1]);
}

fn draw_status_line(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled("Tab ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{}  ", app.current_tab.title())),
    ];
    match app.tx_phase() {
        TxPhase::Idle => {}
        TxPhase::Submitting { label, .. } => {
            spans.push(Span::styled("Tx ", Style::default().fg(Color::DarkGray)));
            spans.push(Span::styled(
                format!("submitting {label}…  "),
                Style::default().fg(Color::LightYellow),
            ));
        }
        TxPhase::AwaitingConfirmation { label, hash, .. } => {
            spans.push(Span::styled("Tx ", Style::default().fg(Color::DarkGray)));
            spans.push(Span::styled(
                format!("{label} awaiting confirmation {}  ", short_hash(&format!("{hash:#x}"))),
                Style::default().fg(Color::LightYellow),
            ));
        }
    }
    if app.loading {
        spans.push(Span::styled("loading…  ", Style::default().fg(Color::LightCyan)));
    }
    if !app.read_failures.is_empty() {
        spans.push(Span::styled(
            format!("{} unreadable  ", app.read_failures.len()),
            Style::default().fg(Color::LightRed),
        ));
    }
    if let Some(url) = app.last_tx_url.as_ref() {
        spans.push(Span::styled("Last tx ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::raw(url.clone()));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left);
    f.render_widget(paragraph, area);
}

fn command_hint(input: &str) -> Option<&'static str> {
    let cmd = input.split_whitespace().next().unwrap_or("").to_lowercase();
    let hint = match cmd.as_str() {
        "join" | "j" => "join [id]",
        "withdraw" | "wd" => "withdraw [id]  (owner)",
        "create" | "new" => "create <name> <fee>  (owner)",
        "tab" | "t" => "tab join|my|admin",
        "refresh" | "r" => "re-read all parties",
        "connect" | "conn" => "connect the local signer",
        "disconnect" | "dc" => "disconnect the wallet",
        _ => return None,
    };
    Some(hint)
}

fn action_hints(app: &App) -> Line<'static> {
    let hints = match app.current_tab {
        Tab::Join => "Enter join  r refresh  : command  ? help  q quit",
        Tab::Memberships => "j/k select  r refresh  : command  ? help  q quit",
        Tab::Admin => "n new party  w withdraw  r refresh  : command  ? help  q quit",
    };
    Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray)))
}

fn draw_command_line(f: &mut Frame, area: Rect, app: &App) {
    let content = match app.input_mode {
        InputMode::Command => {
            let hint_text = command_hint(&app.command.input)
                .unwrap_or("join | withdraw | create | tab | refresh | connect | disconnect | quit");
            Line::from(vec![
                Span::styled(": ", Style::default().fg(Color::Yellow)),
                Span::raw(app.command.input.clone()),
                Span::styled(
                    format!("  {}", hint_text),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        }
        InputMode::Form => Line::from(Span::styled(
            "editing Create Party: Tab switch field, Enter create, Esc cancel",
            Style::default().fg(Color::LightCyan),
        )),
        InputMode::Normal => {
            if let Some((text, level)) = app.status_text() {
                let color = match level {
                    StatusLevel::Info => Color::LightGreen,
                    StatusLevel::Warn => Color::LightYellow,
                    StatusLevel::Error => Color::LightRed,
                };
                Line::from(vec![
                    Span::styled("msg: ", Style::default().fg(Color::DarkGray)),
                    Span::styled(text.to_string(), Style::default().fg(color)),
                ])
            } else {
                action_hints(app)
            }
        }
    };

    let paragraph = Paragraph::new(content).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}

fn draw_notification(f: &mut Frame, area: Rect, app: &App) {
    let Some(notification) = app.notification.as_ref() else {
        return;
    };
    let popup_area = centered_rect(60, 30, area);
    f.render_widget(Clear, popup_area);

    let lines = vec![
        Line::from(notification.body.clone()),
        Line::from(""),
        Line::from(Span::styled(
            "Enter / Esc to dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let paragraph = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .title(notification.title.clone())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, popup_area);
}

fn draw_help_popup(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect(64, 60, area);
    f.render_widget(Clear, popup_area);

    let lines = vec![
        Line::from("Navigation"),
        Line::from("  1 / 2 / 3  Join / My Memberships / Admin"),
        Line::from("  Tab        Next tab"),
        Line::from("  j / k      Move selection"),
        Line::from("  Esc        Close"),
        Line::from(""),
        Line::from("Actions"),
        Line::from("  Enter      Join selected party (Join)"),
        Line::from("  n          Edit create form (Admin)"),
        Line::from("  w          Withdraw contributions (Admin)"),
        Line::from("  r          Refresh"),
        Line::from("  c / d      Connect / disconnect wallet"),
        Line::from("  :          Command"),
        Line::from("  ?          Toggle help"),
        Line::from("  q          Quit"),
        Line::from(""),
        Line::from("Commands"),
        Line::from("  :join 2   :withdraw 0   :create Matcha Club 0.01"),
    ];

    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().title("Help").borders(Borders::ALL))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, popup_area);
}

fn short_hash(value: &str) -> String {
    if value.len() <= 14 {
        return value.to_string();
    }
    format!("{}…{}", &value[..8], &value[value.len() - 4..])
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
