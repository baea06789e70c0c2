use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span, Text},
    widgets::{
        canvas::Canvas, Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Clear, Dataset,
        GraphType, List, ListItem, Paragraph, Wrap,
    },
};

use crate::app::{App, HitAreas, InputMode};
use crate::chat::{ChatRole, ChatSession, WELCOME_TITLE};
use crate::dashboard::{format_thousands, Dashboard, MapView, OverlayLayer};
use crate::data::{self, Period, Series, DEVIATIONS, REPORTS, TRUCKS};
use crate::reply::ReplyService;
use crate::tab::Tab;

const CHAT_WIDTH: u16 = 46;

fn bordered(title: impl Into<Line<'static>>, border: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title.into())
}

fn width_of(text: &str) -> u16 {
    text.chars().count() as u16
}

pub fn render<S: ReplyService>(app: &mut App<S>, frame: &mut Frame) {
    let area = frame.area();
    app.hit_areas = HitAreas::default();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let dashboard_area = if app.chat.is_open() {
        let [main_area, chat_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(CHAT_WIDTH)]).areas(body_area);
        let editing = app.input_mode == InputMode::Editing;
        render_chat(&mut app.chat, &app.endpoint, editing, app.animation_frame, &mut app.hit_areas, frame, chat_area);
        main_area
    } else {
        body_area
    };

    match app.dashboard.active_tab {
        Tab::Admin => render_admin(&mut app.dashboard, &mut app.hit_areas, frame, dashboard_area),
        Tab::Worker => render_worker(&mut app.dashboard, &mut app.hit_areas, frame, dashboard_area),
        Tab::Citizen => render_citizen(&app.dashboard, frame, dashboard_area),
    }

    render_footer(app, frame, footer_area);

    if app.dashboard.show_login {
        render_login(frame, area);
    }
}

fn render_header<S: ReplyService>(app: &mut App<S>, frame: &mut Frame, area: Rect) {
    let bar_style = Style::default().bg(Color::DarkGray);
    frame.render_widget(Paragraph::new("").style(bar_style), area);

    let title = " EcoTrack ";
    let mut spans = vec![
        Span::styled(title, Style::default().fg(Color::Green).bold()),
        Span::raw(" "),
    ];
    let mut x = area.x + width_of(title) + 1;

    for tab in Tab::all() {
        let label = format!(" {} {} ", tab.index() + 1, tab.display_name());
        let width = width_of(&label);
        let style = if tab == app.dashboard.active_tab {
            Style::default().bg(Color::Green).fg(Color::Black).bold()
        } else {
            Style::default().fg(Color::White)
        };
        app.hit_areas.tabs.push((tab, Rect::new(x, area.y, width, 1)));
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
        x += width + 1;
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).style(bar_style), area);

    // Chat toggle with unread badge, right-aligned
    let toggle = if app.chat.has_unread() {
        " ● EcoBot (c) "
    } else {
        " EcoBot (c) "
    };
    let toggle_width = width_of(toggle).min(area.width);
    let toggle_area = Rect::new(area.x + area.width - toggle_width, area.y, toggle_width, 1);
    let toggle_style = if app.chat.is_open() {
        Style::default().bg(Color::Green).fg(Color::Black)
    } else if app.chat.has_unread() {
        Style::default().bg(Color::Yellow).fg(Color::Black).bold()
    } else {
        Style::default().bg(Color::Black).fg(Color::White)
    };
    frame.render_widget(Paragraph::new(toggle).style(toggle_style), toggle_area);
    app.hit_areas.chat_toggle = Some(toggle_area);
}

fn render_footer<S: ReplyService>(app: &App<S>, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => format!(" {} ", app.dashboard.active_tab.as_str().to_uppercase()),
        InputMode::Editing => " CHAT ".to_string(),
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: Vec<(&str, &str)> = match app.input_mode {
        InputMode::Editing => vec![
            ("Enter", "send"),
            ("F1-F3", "suggestions"),
            ("PgUp/PgDn", "scroll"),
            ("Tab", "dashboard"),
            ("Esc", "close chat"),
        ],
        InputMode::Normal => {
            let mut pairs = match app.dashboard.active_tab {
                Tab::Admin => vec![
                    ("p/P", "period"),
                    ("t/d/r", "layers"),
                    ("f", "focus deviations"),
                ],
                Tab::Worker => vec![("j/k", "task"), ("Enter", "task action")],
                Tab::Citizen => vec![],
            };
            pairs.push(("1-3/Tab", "view"));
            if app.chat.is_open() {
                pairs.push(("i", "type"));
                pairs.push(("Esc", "close chat"));
            } else {
                pairs.push(("c", "EcoBot"));
            }
            pairs.push(("q", "quit"));
            pairs
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in pairs {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// =============================================================================
// ADMIN
// =============================================================================

fn render_admin(dashboard: &mut Dashboard, hits: &mut HitAreas, frame: &mut Frame, area: Rect) {
    let [stats_area, period_area, main_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(area);

    render_stat_cards(dashboard, hits, frame, stats_area);
    render_period_filter(dashboard.period, hits, frame, period_area);

    let [map_area, charts_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(main_area);

    render_admin_map(dashboard, frame, map_area);
    render_charts(dashboard, frame, charts_area);
}

fn render_stat_cards(dashboard: &Dashboard, hits: &mut HitAreas, frame: &mut Frame, area: Rect) {
    let stats = dashboard.stats();
    let [co2_area, kwh_area, deviation_area] = Layout::horizontal([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
    ])
    .areas(area);

    let cards = [
        (co2_area, " CO2 Saved (t) ", stats.co2, data::GREEN),
        (kwh_area, " Energy Recovered (kWh) ", stats.kwh, data::BLUE),
        (deviation_area, " Route Deviations (f) ", stats.deviations, data::RED),
    ];

    for (card_area, title, value, color) in cards {
        let card = Paragraph::new(Span::styled(
            format_thousands(value),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .block(bordered(title, Color::DarkGray));
        frame.render_widget(card, card_area);
    }

    hits.deviation_card = Some(deviation_area);
}

fn render_period_filter(current: Period, hits: &mut HitAreas, frame: &mut Frame, area: Rect) {
    let prefix = " Period: ";
    let mut spans = vec![Span::styled(prefix, Style::default().fg(Color::DarkGray))];
    let mut x = area.x + width_of(prefix);

    for period in Period::all() {
        let label = format!(" {} ", period.label());
        let width = width_of(&label);
        let style = if period == current {
            Style::default().bg(Color::White).fg(Color::Green).bold()
        } else {
            Style::default().fg(Color::Gray)
        };
        hits.periods.push((period, Rect::new(x, area.y, width, 1)));
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
        x += width + 1;
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Fit the map to its area if it was flagged, then return its bounds.
fn fit_map(map: &mut MapView, block: &Block, area: Rect) -> ([f64; 2], [f64; 2]) {
    if map.needs_resize {
        let inner = block.inner(area);
        map.resize(inner.width, inner.height);
    }
    map.bounds()
}

fn render_admin_map(dashboard: &mut Dashboard, frame: &mut Frame, area: Rect) {
    let [canvas_area, legend_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(8)]).areas(area);

    let overlays = dashboard.overlays;
    let Some(map) = dashboard.admin_map.get_mut() else {
        frame.render_widget(
            Paragraph::new("Map not loaded").block(bordered(" Live Map ", Color::DarkGray)),
            canvas_area,
        );
        return;
    };

    let block = bordered(format!(" Live Map · zoom {} ", map.zoom), Color::Green);
    let (x_bounds, y_bounds) = fit_map(map, &block, canvas_area);

    let canvas = Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            if overlays.trucks {
                for truck in TRUCKS {
                    ctx.print(truck.lng, truck.lat, Span::styled("T", Style::default().fg(data::BLUE).bold()));
                }
            }
            if overlays.deviations {
                for deviation in DEVIATIONS {
                    ctx.print(deviation.lng, deviation.lat, Span::styled("!", Style::default().fg(data::RED).bold()));
                }
            }
            if overlays.reports {
                for report in REPORTS {
                    ctx.print(report.lng, report.lat, Span::styled("R", Style::default().fg(data::ORANGE).bold()));
                }
            }
        });
    frame.render_widget(canvas, canvas_area);

    // Layer control with marker details underneath each visible layer
    let mut lines: Vec<Line> = Vec::new();
    for layer in OverlayLayer::all() {
        let visible = overlays.is_visible(layer);
        let (key, glyph, color) = match layer {
            OverlayLayer::Trucks => ("t", "T", data::BLUE),
            OverlayLayer::Deviations => ("d", "!", data::RED),
            OverlayLayer::Reports => ("r", "R", data::ORANGE),
        };
        lines.push(Line::from(vec![
            Span::raw(if visible { "[x] " } else { "[ ] " }),
            Span::styled(glyph, Style::default().fg(color).bold()),
            Span::raw(format!(" {} ", layer.display_name())),
            Span::styled(format!("({})", key), Style::default().fg(Color::DarkGray)),
        ]));
        if !visible {
            continue;
        }
        let details: Vec<(String, (f64, f64))> = match layer {
            OverlayLayer::Trucks => TRUCKS
                .iter()
                .map(|t| (format!("Truck: {} · Status: {}", t.id, t.status), (t.lat, t.lng)))
                .collect(),
            OverlayLayer::Deviations => DEVIATIONS
                .iter()
                .map(|d| (format!("Deviation Alert {} · Truck: {}", d.id, d.truck), (d.lat, d.lng)))
                .collect(),
            OverlayLayer::Reports => REPORTS
                .iter()
                .map(|r| (format!("Citizen Report {} · Type: {}", r.id, r.kind), (r.lat, r.lng)))
                .collect(),
        };
        for (detail, position) in details {
            let style = if map.contains(position) {
                Style::default().fg(Color::Gray)
            } else {
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)
            };
            lines.push(Line::from(Span::styled(format!("      {}", detail), style)));
        }
    }

    frame.render_widget(
        Paragraph::new(lines).block(bordered(" Layers ", Color::DarkGray)),
        legend_area,
    );
}

fn legend_title(title: &str, series: &[Series]) -> Line<'static> {
    let mut spans = vec![Span::raw(format!(" {} ", title))];
    for s in series {
        spans.push(Span::styled("■", Style::default().fg(s.color)));
        spans.push(Span::raw(format!("{} ", s.label)));
    }
    Line::from(spans)
}

fn render_charts(dashboard: &Dashboard, frame: &mut Frame, area: Rect) {
    let data = dashboard.period_data();

    let [top, bottom] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
    let [diversion_area, composition_area] =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(top);
    let [reports_area, performance_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(bottom);

    // Waste diversion: one group per month, one bar per stream
    let mut diversion = BarChart::default()
        .block(bordered(legend_title("Diversion (t)", &data.diversion), Color::DarkGray))
        .bar_width(1)
        .bar_gap(0)
        .group_gap(1);
    for (i, label) in data.labels.iter().enumerate() {
        let bars: Vec<Bar> = data
            .diversion
            .iter()
            .map(|s| {
                Bar::default()
                    .value(s.values.get(i).copied().unwrap_or(0))
                    .style(Style::default().fg(s.color))
            })
            .collect();
        diversion = diversion.data(BarGroup::default().label(Line::from(*label)).bars(&bars));
    }
    frame.render_widget(diversion, diversion_area);

    // Composition: one proportional bar per stream
    let block = bordered(" Waste Composition ", Color::DarkGray);
    let bar_room = block.inner(composition_area).width.saturating_sub(17) as usize;
    let lines: Vec<Line> = data
        .composition
        .iter()
        .flat_map(|slice| {
            let filled = bar_room * usize::from(slice.percent) / 100;
            [
                Line::from(vec![
                    Span::raw(format!("{:<11}", slice.label)),
                    Span::styled("█".repeat(filled), Style::default().fg(slice.color)),
                    Span::raw(format!(" {:>3}%", slice.percent)),
                ]),
                Line::default(),
            ]
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), composition_area);

    // Citizen reports vs resolutions
    let points: Vec<Vec<(f64, f64)>> = data
        .reports
        .iter()
        .map(|s| s.values.iter().enumerate().map(|(i, v)| (i as f64, *v as f64)).collect())
        .collect();
    let peak = data
        .reports
        .iter()
        .flat_map(|s| s.values.iter())
        .copied()
        .max()
        .unwrap_or(0);
    let y_top = ((peak as f64) * 1.2).ceil().max(1.0);
    let datasets: Vec<Dataset> = data
        .reports
        .iter()
        .zip(&points)
        .map(|(s, pts)| {
            Dataset::default()
                .name(s.label)
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(s.color))
                .data(pts)
        })
        .collect();
    let last = data.labels.len().saturating_sub(1);
    let x_labels = vec![
        Span::raw(data.labels.first().copied().unwrap_or_default()),
        Span::raw(data.labels.get(last / 2).copied().unwrap_or_default()),
        Span::raw(data.labels.get(last).copied().unwrap_or_default()),
    ];
    let chart = Chart::new(datasets)
        .block(bordered(" Reports vs. Resolutions ", Color::DarkGray))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, last.max(1) as f64])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, y_top])
                .labels(vec![Span::raw("0"), Span::raw(format!("{}", y_top as u64))]),
        );
    frame.render_widget(chart, reports_area);

    // Ward performance: one group per metric, one bar per ward
    let mut performance = BarChart::default()
        .block(bordered(legend_title("Ward Performance", &data.performance), Color::DarkGray))
        .bar_width(2)
        .bar_gap(0)
        .group_gap(1)
        .max(100);
    for (i, axis) in data::PERFORMANCE_AXES.iter().enumerate() {
        let bars: Vec<Bar> = data
            .performance
            .iter()
            .map(|s| {
                Bar::default()
                    .value(s.values.get(i).copied().unwrap_or(0))
                    .style(Style::default().fg(s.color))
            })
            .collect();
        let short: String = axis.chars().take(5).collect();
        performance = performance.data(BarGroup::default().label(Line::from(short)).bars(&bars));
    }
    frame.render_widget(performance, performance_area);
}

// =============================================================================
// WORKER
// =============================================================================

fn render_worker(dashboard: &mut Dashboard, hits: &mut HitAreas, frame: &mut Frame, area: Rect) {
    let [list_area, detail_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(area);

    let items: Vec<ListItem> = dashboard
        .tasks
        .iter()
        .map(|task| {
            ListItem::new(Line::from(vec![
                Span::styled("▌", Style::default().fg(task.status.color())),
                Span::raw(format!(" {} ", task.title)),
                Span::styled(
                    task.status.label(),
                    Style::default().fg(task.status.color()).add_modifier(Modifier::BOLD),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(bordered(" Today's Tasks ", Color::Cyan))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, list_area, &mut dashboard.task_state);
    hits.task_list = Some(list_area);

    let Some(task) = dashboard.selected_task().cloned() else {
        frame.render_widget(
            Paragraph::new("Select a task").block(bordered(" Task Details ", Color::DarkGray)),
            detail_area,
        );
        return;
    };

    let [info_area, action_area, map_area] = Layout::vertical([
        Constraint::Length(8),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(detail_area);

    let info = Text::from(vec![
        Line::from(Span::styled(task.title, Style::default().bold())),
        Line::from(vec![
            Span::styled(format!("Task ID: {:04}", task.id), Style::default().fg(Color::DarkGray)),
            Span::styled(format!("  ·  {}", task.kind.label()), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(Span::styled(
            format!(" {} ", task.status.label()),
            Style::default().bg(task.status.color()).fg(Color::Black),
        )),
        Line::default(),
        Line::from(task.description),
    ]);
    frame.render_widget(
        Paragraph::new(info)
            .wrap(Wrap { trim: true })
            .block(bordered(" Task Details ", Color::DarkGray)),
        info_area,
    );

    match task.status.action_label() {
        Some(label) => {
            let color = if task.status == data::TaskStatus::Pending {
                Color::Blue
            } else {
                Color::Green
            };
            let button = Paragraph::new(Line::from(vec![
                Span::styled(format!(" {} ", label), Style::default().bg(color).fg(Color::White).bold()),
                Span::styled("  (Enter)", Style::default().fg(Color::DarkGray)),
            ]));
            let button_area = Rect::new(action_area.x + 1, action_area.y + 1, action_area.width.saturating_sub(2), 1);
            frame.render_widget(button, button_area);
            hits.task_action = Some(button_area);
        }
        None => {
            frame.render_widget(
                Paragraph::new(Span::styled(" No action needed ", Style::default().fg(Color::DarkGray))),
                Rect::new(action_area.x + 1, action_area.y + 1, action_area.width.saturating_sub(2), 1),
            );
        }
    }

    if !dashboard.show_worker_map {
        return;
    }
    let Some(map) = dashboard.worker_map.get_mut() else {
        return;
    };

    let block = bordered(" Route Map ", Color::Green);
    let (x_bounds, y_bounds) = fit_map(map, &block, map_area);
    let pins = map.pins.clone();
    let center = map.center;

    let canvas = Canvas::default()
        .block(block)
        .marker(symbols::Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            for pin in &pins {
                let (lat, lng) = pin.position;
                let style = if pin.position == center {
                    Style::default().fg(Color::Red).bold()
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                ctx.print(lng, lat, Span::styled("●", style));
                if pin.position == center {
                    ctx.print(lng, lat, Span::styled(format!("  {}", pin.label), Style::default().fg(Color::White)));
                }
            }
        });
    frame.render_widget(canvas, map_area);
}

// =============================================================================
// CITIZEN
// =============================================================================

fn render_citizen(dashboard: &Dashboard, frame: &mut Frame, area: Rect) {
    let now = Instant::now();
    let [counters_area, body_area] =
        Layout::vertical([Constraint::Length(5), Constraint::Min(0)]).areas(area);

    let count = dashboard.counters.len().max(1) as u32;
    let slots = Layout::horizontal(vec![Constraint::Ratio(1, count); count as usize]).split(counters_area);
    for (counter, slot) in dashboard.counters.iter().zip(slots.iter()) {
        let value = Paragraph::new(vec![
            Line::default(),
            Line::from(Span::styled(
                format_thousands(counter.value_at(now)),
                Style::default().fg(data::GREEN).add_modifier(Modifier::BOLD),
            )),
        ])
        .alignment(Alignment::Center)
        .block(bordered(format!(" {} ", counter.label), Color::DarkGray));
        frame.render_widget(value, *slot);
    }

    let [rewards_area, help_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(body_area);

    let points = data::CITIZEN_STATS
        .iter()
        .find(|(label, _)| *label == "Green Points")
        .map(|(_, value)| *value)
        .unwrap_or(0);
    let rewards: Vec<ListItem> = data::REWARDS
        .iter()
        .map(|(name, cost)| {
            let affordable = points >= *cost;
            let marker = if affordable { "✓ " } else { "  " };
            let style = if affordable {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, style),
                Span::raw(format!("{} ", name)),
                Span::styled(format!("{} pts", format_thousands(*cost)), style),
            ]))
        })
        .collect();
    frame.render_widget(
        List::new(rewards).block(bordered(" Rewards ", Color::Cyan)),
        rewards_area,
    );

    let help = Text::from(vec![
        Line::from(Span::styled("Report an issue", Style::default().bold())),
        Line::from("Overflowing bins, illegal dumping and missed pickups go straight to the ward team."),
        Line::default(),
        Line::from(Span::styled("Earn Green Points", Style::default().bold())),
        Line::from("Segregate at source and verified reports earn points you can redeem for rewards."),
        Line::default(),
        Line::from(Span::styled("Press c to ask EcoBot.", Style::default().fg(Color::DarkGray))),
    ]);
    frame.render_widget(
        Paragraph::new(help)
            .wrap(Wrap { trim: true })
            .block(bordered(" Citizen Portal ", Color::DarkGray)),
        help_area,
    );
}

// =============================================================================
// CHAT
// =============================================================================

fn render_chat<S: ReplyService>(
    chat: &mut ChatSession<S>,
    endpoint: &str,
    editing: bool,
    animation_frame: u8,
    hits: &mut HitAreas,
    frame: &mut Frame,
    area: Rect,
) {
    frame.render_widget(Clear, area);

    let suggestion_rows = chat.suggestions().len() as u16;
    let [transcript_area, suggestions_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(suggestion_rows),
        Constraint::Length(3),
    ])
    .areas(area);

    let block = bordered(" EcoBot ", Color::Green).title_bottom(Line::from(Span::styled(
        format!(" {} · {} answered ", endpoint, chat.history().len()),
        Style::default().fg(Color::DarkGray),
    )));
    let inner = block.inner(transcript_area);

    let time_style = Style::default().fg(Color::DarkGray);
    let mut lines: Vec<Line> = Vec::new();
    for entry in chat.transcript() {
        match entry.role {
            ChatRole::Welcome => {
                lines.push(Line::from(Span::styled(
                    WELCOME_TITLE,
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                )));
            }
            ChatRole::User | ChatRole::Bot => {
                let (name, color) = if entry.role == ChatRole::User {
                    ("You", Color::Cyan)
                } else {
                    ("EcoBot", Color::Green)
                };
                lines.push(Line::from(vec![
                    Span::styled(name, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                    Span::styled(
                        format!("  {}", entry.time.as_deref().unwrap_or_default()),
                        time_style,
                    ),
                ]));
            }
            ChatRole::Error => {}
        }

        let content_style = match entry.role {
            ChatRole::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            _ => Style::default(),
        };
        for line in entry.content.lines() {
            lines.push(Line::from(Span::styled(line.to_string(), content_style)));
        }
        lines.push(Line::default());
    }

    if chat.is_typing() {
        lines.push(Line::from(Span::styled(
            "EcoBot",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("typing{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    // Measure with the same wrapping the frame uses so the tail is reachable
    let transcript = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    let wrapped = u16::try_from(transcript.line_count(inner.width)).unwrap_or(u16::MAX);
    chat.set_viewport(inner.width, inner.height, wrapped);

    let transcript = transcript.block(block).scroll((chat.scroll, 0));
    frame.render_widget(transcript, transcript_area);

    // Quick actions, one per row
    for (i, suggestion) in chat.suggestions().iter().enumerate() {
        let row = Rect::new(
            suggestions_area.x,
            suggestions_area.y + i as u16,
            suggestions_area.width,
            1,
        );
        let line = Line::from(vec![
            Span::styled(format!(" F{} ", i + 1), Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::styled(format!(" {} ", suggestion), Style::default().fg(Color::Green)),
        ]);
        frame.render_widget(Paragraph::new(line), row);
        hits.suggestions.push(row);
    }

    let border = if editing { Color::Yellow } else { Color::DarkGray };
    let input_block = bordered(" Message (Enter to send) ", border);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = chat.input.cursor();
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };
    let visible_text: String = chat
        .input
        .as_str()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = if chat.input.is_empty() && !editing {
        Paragraph::new(Span::styled("Ask EcoBot... (i to type)", Style::default().fg(Color::DarkGray)))
    } else {
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan))
    }
    .block(input_block);
    frame.render_widget(input, input_area);
    hits.chat_input = Some(input_area);

    // Show cursor when editing
    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}

fn render_login(frame: &mut Frame, area: Rect) {
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 8.min(area.height.saturating_sub(2));

    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let text = Text::from(vec![
        Line::default(),
        Line::from(Span::styled("Welcome to EcoTrack", Style::default().fg(Color::Green).bold())),
        Line::from("Smart waste management for your city"),
        Line::default(),
        Line::from(Span::styled("Press Enter to log in", Style::default().fg(Color::Yellow))),
    ]);

    let popup = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(bordered(" Login ", Color::Green));
    frame.render_widget(popup, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Overrides, Settings};
    use crate::reply::ReplyError;
    use ratatui::{backend::TestBackend, Terminal};
    use std::future::Future;

    #[derive(Clone)]
    struct FixedReply(String);

    impl ReplyService for FixedReply {
        fn reply(&self, _message: String) -> impl Future<Output = Result<String, ReplyError>> + Send + 'static {
            let text = self.0.clone();
            async move { Ok(text) }
        }
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn tail_of_long_reply_can_be_scrolled_into_view() {
        // Ten 23-character words, one per wrapped row in the chat panel
        let reply = "abcdefghiz"
            .chars()
            .map(|c| c.to_string().repeat(23))
            .collect::<Vec<_>>()
            .join(" ");
        let last_word = "z".repeat(23);

        let settings = Settings::resolve(&Config::new(), Overrides::default());
        let mut app = App::with_service(FixedReply(reply), &settings);
        app.dashboard.dismiss_login();
        app.open_chat();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();

        assert!(app.chat.send_message("hello"));
        app.chat.wait_for_reply().await;
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(screen(&terminal).contains(&last_word));

        for _ in 0..20 {
            app.chat.scroll_up();
        }
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(!screen(&terminal).contains(&last_word));

        for _ in 0..20 {
            app.chat.scroll_down();
            terminal.draw(|frame| render(&mut app, frame)).unwrap();
        }
        assert!(screen(&terminal).contains(&last_word));
    }

    #[test]
    fn header_records_tab_and_chat_toggle_areas() {
        let settings = Settings::resolve(&Config::new(), Overrides::default());
        let mut app = App::with_service(FixedReply(String::new()), &settings);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert_eq!(app.hit_areas.tabs.len(), 3);
        assert!(app.hit_areas.chat_toggle.is_some());
        assert!(screen(&terminal).contains("Welcome to EcoTrack"));
    }
}
