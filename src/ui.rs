//! TUI rendering for the facility finder.
//!
//! Draws whatever the latest published [`MapState`] snapshot says: the home
//! screen, the map canvas with markers, the facility list, the detail panel,
//! the report modal and the notice bar.

use crate::app::{App, MapScreen, Screen};
use crate::models::{Facility, TriState};
use crate::report::ReportOption;
use crate::state::MapState;
use ratatui::{
    prelude::*,
    widgets::{canvas::*, *},
};

use ratatui::text::Line;

/// Renders one frame from the current application state.
pub fn render<L, D>(f: &mut Frame, app: &App<L, D>) {
    match (app.screen, app.map.as_ref()) {
        (Screen::Map, Some(map)) => render_map_screen(f, app, map),
        _ => render_home_screen(f),
    }
}

fn render_home_screen(f: &mut Frame) {
    let area = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height / 2).saturating_sub(4)),
            Constraint::Length(8),
            Constraint::Min(0),
        ])
        .split(area);

    let text = vec![
        Line::from(Span::styled(
            "Sanisettes de Paris",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Find the public toilets around you,"),
        Line::from("check their details and report a problem."),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to continue  ·  q to quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let p = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Green)),
    );
    f.render_widget(p, centered_rect(60, chunks[1]));
}

/// Map screen: facility list (25%) + map and detail (75%), notice bar below.
fn render_map_screen<L, D>(f: &mut Frame, app: &App<L, D>, map: &MapScreen<L, D>) {
    let state = map.view.borrow();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(3)])
        .split(f.size());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
        .split(rows[0]);

    draw_facility_list(f, &state, map.cursor, columns[0]);

    let main = if state.selection.is_some() {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(9)])
            .split(columns[1])
    } else {
        Layout::default()
            .constraints([Constraint::Min(0)])
            .split(columns[1])
    };

    draw_map(f, &state, map.cursor, main[0]);
    if let Some(selected) = state.selection.as_ref() {
        draw_details(f, &state, selected, main[1]);
    }
    draw_status(f, app, &state, rows[1]);

    if let Some(flow) = state.report.as_ref() {
        draw_report_modal(f, flow.chosen());
    }
}

fn draw_facility_list(f: &mut Frame, state: &MapState, cursor: usize, area: Rect) {
    let items: Vec<ListItem> = state
        .facilities
        .iter()
        .enumerate()
        .map(|(i, fac)| {
            let style = if i == cursor {
                Style::default()
                    .fg(Color::Cyan)
                    .bg(Color::Rgb(30, 30, 60))
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let marker = if state.is_selected(fac) { "●" } else { " " };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", marker), Style::default().fg(Color::Yellow)),
                Span::styled(fac.label(), style),
            ]))
        })
        .collect();

    let title = if state.pending.facilities {
        " Facilities (loading…) ".to_string()
    } else {
        format!(" Facilities ({}) ", state.facilities.len())
    };
    let list = List::new(items).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(list, area);
}

fn draw_map(f: &mut Frame, state: &MapState, cursor: usize, area: Rect) {
    let region = state.region;
    let highlighted = state.facilities.get(cursor).map(|fac| fac.id.clone());
    let markers: Vec<(f64, f64, bool, bool)> = state
        .facilities
        .iter()
        .filter(|fac| region.contains(&fac.location))
        .map(|fac| {
            (
                fac.location.longitude,
                fac.location.latitude,
                state.is_selected(fac),
                highlighted.as_ref() == Some(&fac.id),
            )
        })
        .collect();
    let position = state.position;

    let title = if state.pending.location {
        " Paris (locating…) ".to_string()
    } else {
        format!(
            " {:.4}, {:.4} ",
            region.center.latitude, region.center.longitude
        )
    };

    let canvas = Canvas::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .marker(symbols::Marker::Braille)
        .x_bounds(region.x_bounds())
        .y_bounds(region.y_bounds())
        .paint(move |ctx| {
            ctx.draw(&Map {
                color: Color::Rgb(50, 50, 50),
                resolution: MapResolution::High,
            });

            for (x, y, is_selected, is_highlighted) in &markers {
                if *is_selected {
                    ctx.print(
                        *x,
                        *y,
                        Line::from(Span::styled(
                            " ▼ ",
                            Style::default()
                                .fg(Color::Black)
                                .bg(Color::Yellow)
                                .add_modifier(Modifier::BOLD),
                        )),
                    );
                } else if *is_highlighted {
                    ctx.print(
                        *x,
                        *y,
                        Line::from(Span::styled("◆", Style::default().fg(Color::Cyan))),
                    );
                } else {
                    ctx.print(
                        *x,
                        *y,
                        Line::from(Span::styled("•", Style::default().fg(Color::Green))),
                    );
                }
            }

            if let Some(here) = position {
                ctx.print(
                    here.longitude,
                    here.latitude,
                    Line::from(Span::styled(" ⌖ ", Style::default().fg(Color::Cyan))),
                );
            }
        });

    f.render_widget(canvas, area);
}

fn draw_details(f: &mut Frame, state: &MapState, fac: &Facility, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let or_dash = |v: Option<&str>| v.unwrap_or("—").to_string();
    let distance = state
        .selection_distance_km()
        .map(|km| format!("{:.2} km", km))
        .unwrap_or_else(|| "—".to_string());

    let details = vec![
        Line::from(vec![
            Span::styled("Address:   ", bold),
            Span::styled(or_dash(fac.address.as_deref()), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::styled("Type:      ", bold),
            Span::raw(or_dash(fac.name.as_deref())),
            Span::raw("  │  "),
            Span::styled("District: ", bold),
            Span::raw(or_dash(fac.district.as_deref())),
        ]),
        Line::from(vec![
            Span::styled("Hours:     ", bold),
            Span::raw(or_dash(fac.schedule.as_deref())),
        ]),
        Line::from(vec![
            Span::styled("Access:    ", bold),
            tri_state_span(fac.has_accessibility),
            Span::raw("  │  "),
            Span::styled("Baby changing: ", bold),
            tri_state_span(fac.has_baby_changing),
        ]),
        Line::from(vec![
            Span::styled("Distance:  ", bold),
            Span::raw(distance),
        ]),
        Line::from(Span::styled(
            "s report a problem  ·  Esc close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let p = Paragraph::new(details).block(
        Block::default()
            .title(format!(" Facility {} ", fac.id))
            .borders(Borders::ALL)
            .padding(Padding::horizontal(1)),
    );
    f.render_widget(p, area);
}

fn tri_state_span(value: TriState) -> Span<'static> {
    let color = match value {
        TriState::Yes => Color::Green,
        TriState::No => Color::Red,
        TriState::Unknown => Color::DarkGray,
    };
    Span::styled(value.label(), Style::default().fg(color))
}

fn draw_status<L, D>(f: &mut Frame, app: &App<L, D>, state: &MapState, area: Rect) {
    let line = match state.notices.first() {
        Some(notice) => {
            let color = if notice.is_error() { Color::Red } else { Color::Green };
            let more = state.notices.len() - 1;
            let suffix = if more > 0 {
                format!("  (+{} more, x to dismiss)", more)
            } else {
                "  (x to dismiss)".to_string()
            };
            Line::from(vec![
                Span::styled(notice.message(), Style::default().fg(color)),
                Span::styled(suffix, Style::default().fg(Color::DarkGray)),
            ])
        }
        None => Line::from(Span::styled(
            format!(
                " j/k move   Enter inspect   r refresh   h home   q quit   │ reports sent: {}",
                app.reports_sent
            ),
            Style::default().fg(Color::DarkGray),
        )),
    };
    let p = Paragraph::new(line).block(Block::default().borders(Borders::TOP));
    f.render_widget(p, area);
}

fn draw_report_modal(f: &mut Frame, chosen: Option<ReportOption>) {
    let area = centered_rect(50, centered_band(12, f.size()));
    let mut lines = vec![Line::from("")];
    for (i, option) in ReportOption::ALL.iter().enumerate() {
        let (circle, style) = if chosen == Some(*option) {
            ("●", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        } else {
            ("○", Style::default())
        };
        lines.push(Line::from(vec![
            Span::styled(format!("  {} ", circle), style),
            Span::styled(format!("{}. {}", i + 1, option.label()), style),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  1-4 choose   Enter send   Esc cancel",
        Style::default().fg(Color::DarkGray),
    )));

    f.render_widget(Clear, area);
    let p = Paragraph::new(lines).block(
        Block::default()
            .title(" Signaler un problème ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Green)),
    );
    f.render_widget(p, area);
}

/// Horizontally centered slice of `area`, `percent_x` wide.
fn centered_rect(percent_x: u16, area: Rect) -> Rect {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area)[1]
}

/// Vertically centered band of `height` rows.
fn centered_band(height: u16, area: Rect) -> Rect {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area)[1]
}
