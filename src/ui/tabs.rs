//! Tab-based UI rendering

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs as RataTabs, Wrap};
use ratatui::Frame;

use crate::app::{App, FormField, InputMode, NftState, Tab};
use crate::domain::party::PartyView;

/// Draw the tab bar; Admin is listed only for the owner
pub fn draw_tab_bar(f: &mut Frame, area: Rect, app: &App) {
    let tabs: Vec<Tab> = Tab::ALL
        .into_iter()
        .filter(|tab| *tab != Tab::Admin || app.is_owner())
        .collect();
    let titles: Vec<Line> = tabs
        .iter()
        .map(|tab| {
            Line::from(vec![
                Span::styled(
                    format!("{}:", tab.shortcut()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(tab.title()),
            ])
        })
        .collect();

    let selected = tabs.iter().position(|t| *t == app.current_tab).unwrap_or(0);

    let tabs = RataTabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" │ ");

    f.render_widget(tabs, area);
}

/// Party list shared by all tabs
pub fn draw_party_list(f: &mut Frame, area: Rect, app: &App) {
    let parties = app.visible_parties();
    let title = match app.current_tab {
        Tab::Join => format!("Parties ({})", parties.len()),
        Tab::Memberships => format!("My Memberships ({})", parties.len()),
        Tab::Admin => format!("Manage Parties ({})", parties.len()),
    };
    let title = if app.loading {
        format!("{title} loading…")
    } else {
        title
    };

    if parties.is_empty() {
        let message = if !app.connection.is_connected() {
            "Connect a wallet to see parties (:connect)"
        } else if app.loading {
            "Loading parties…"
        } else if app.current_tab == Tab::Memberships {
            "You haven't joined any parties yet"
        } else {
            "No parties yet"
        };
        let paragraph = Paragraph::new(Span::styled(message, Style::default().fg(Color::DarkGray)))
            .block(Block::default().title(title).borders(Borders::ALL));
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = parties
        .iter()
        .map(|party| ListItem::new(party_row(app, party)))
        .collect();

    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn party_row(app: &App, party: &PartyView) -> Line<'static> {
    let mut spans = vec![
        Span::styled(format!("#{:<3} ", party.id), Style::default().fg(Color::DarkGray)),
        Span::styled(party.name.clone(), Style::default().fg(Color::White)),
    ];
    match app.current_tab {
        Tab::Join => {
            spans.push(Span::raw(format!("  {}", app.fee_label(party.join_fee))));
            spans.push(Span::styled(
                format!("  {} members", party.member_count),
                Style::default().fg(Color::DarkGray),
            ));
            if party.is_member {
                spans.push(Span::styled("  member", Style::default().fg(Color::LightGreen)));
            }
        }
        Tab::Memberships => {
            let token = party
                .token_id
                .map(|id| format!("  token #{id}"))
                .unwrap_or_else(|| "  token not available".to_string());
            spans.push(Span::styled(token, Style::default().fg(Color::LightCyan)));
        }
        Tab::Admin => {
            let color = if party.can_withdraw() {
                Color::LightYellow
            } else {
                Color::DarkGray
            };
            spans.push(Span::styled(
                format!("  {}", app.fee_label(party.total_contributions)),
                Style::default().fg(color),
            ));
        }
    }
    Line::from(spans)
}

/// Right-hand panel: details for Join, NFT for Memberships, form + detail for Admin
pub fn draw_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    match app.current_tab {
        Tab::Join => draw_join_detail(f, area, app),
        Tab::Memberships => draw_membership_detail(f, area, app),
        Tab::Admin => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(7), Constraint::Min(0)])
                .split(area);
            draw_create_form(f, chunks[0], app);
            draw_withdraw_detail(f, chunks[1], app);
        }
    }
}

fn label(text: &'static str) -> Span<'static> {
    Span::styled(text, Style::default().fg(Color::DarkGray))
}

fn draw_join_detail(f: &mut Frame, area: Rect, app: &App) {
    let lines = match app.selected_party() {
        Some(party) => {
            let mut lines = vec![
                Line::from(vec![label("Name     "), Span::raw(party.name.clone())]),
                Line::from(vec![label("Join fee "), Span::raw(app.fee_label(party.join_fee))]),
                Line::from(vec![label("Members  "), Span::raw(party.member_count.to_string())]),
                Line::from(""),
            ];
            if party.can_join() {
                lines.push(Line::from(Span::styled(
                    "Enter / :join to join",
                    Style::default().fg(Color::LightCyan),
                )));
            } else {
                lines.push(Line::from(Span::styled(
                    "You are a member",
                    Style::default().fg(Color::LightGreen),
                )));
            }
            lines
        }
        None => vec![Line::from("No party selected")],
    };
    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().title("Party").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn draw_membership_detail(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = Vec::new();
    match app.selected_party() {
        Some(party) => {
            lines.push(Line::from(vec![label("Party    "), Span::raw(party.name.clone())]));
            match party.token_id {
                Some(token_id) => {
                    lines.push(Line::from(vec![label("Token    "), Span::raw(format!("#{token_id}"))]));
                    lines.push(Line::from(""));
                    lines.extend(nft_lines(app.nft.get(&token_id)));
                }
                None => lines.push(Line::from(vec![label("Token    "), Span::raw("Not available")])),
            }
        }
        None => lines.push(Line::from("No membership selected")),
    }
    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().title("Membership NFT").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn nft_lines(state: Option<&NftState>) -> Vec<Line<'static>> {
    let muted = Style::default().fg(Color::DarkGray);
    match state {
        None | Some(NftState::Loading) => vec![Line::from(Span::styled("Loading NFT…", muted))],
        Some(NftState::Failed(message)) => vec![Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::LightRed),
        ))],
        Some(NftState::Ready(metadata)) => {
            let mut lines = Vec::new();
            if let Some(name) = metadata.name.as_ref() {
                lines.push(Line::from(vec![label("Name     "), Span::raw(name.clone())]));
            }
            if let Some(description) = metadata.description.as_ref() {
                lines.push(Line::from(Span::styled(description.clone(), muted)));
            }
            match metadata.image.as_ref() {
                Some(image) => {
                    lines.push(Line::from(vec![label("Image    "), Span::raw(truncate(image, 160))]))
                }
                None => lines.push(Line::from(Span::styled("NFT image not available", muted))),
            }
            lines
        }
    }
}

fn draw_create_form(f: &mut Frame, area: Rect, app: &App) {
    let editing = app.input_mode == InputMode::Form;
    let field_style = |field: FormField| {
        if editing && app.form.field == field {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        }
    };
    let hint = if editing {
        "Tab=switch field  Enter=create  Esc=cancel"
    } else {
        "n to edit"
    };
    let lines = vec![
        Line::from(vec![label("Name  "), Span::styled(app.form.name.clone(), field_style(FormField::Name))]),
        Line::from(vec![
            label("Fee   "),
            Span::styled(app.form.fee.clone(), field_style(FormField::Fee)),
            Span::styled(format!(" {}", app.network.currency_symbol), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))),
    ];
    let border = if editing {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let paragraph = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .title("Create Party")
            .borders(Borders::ALL)
            .border_style(border),
    );
    f.render_widget(paragraph, area);
}

fn draw_withdraw_detail(f: &mut Frame, area: Rect, app: &App) {
    let lines = match app.selected_party() {
        Some(party) => {
            let action = if party.can_withdraw() {
                Span::styled("w / :withdraw to withdraw", Style::default().fg(Color::LightCyan))
            } else {
                Span::styled("Nothing to withdraw", Style::default().fg(Color::DarkGray))
            };
            vec![
                Line::from(vec![label("Name          "), Span::raw(party.name.clone())]),
                Line::from(vec![label("Members       "), Span::raw(party.member_count.to_string())]),
                Line::from(vec![
                    label("Contributions "),
                    Span::raw(app.fee_label(party.total_contributions)),
                ]),
                Line::from(""),
                Line::from(action),
            ]
        }
        None => vec![Line::from("No party selected")],
    };
    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().title("Contributions").borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let head: String = value.chars().take(max).collect();
    format!("{head}…")
}
