//! Drawing.

use std::time::Instant;

use dapsconfig::{
    codec::{Schedule, ScheduleMode},
    services::ToastKind,
    ui::{
        element::{Form, Row, Widget},
        modal::{Modal, ModalHandle},
        picker::Choice,
    },
};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::{
    theme::Palette,
    tui::{
        app::{
            App, ChoicePrompt, DirBrowser, Overlay, Prompt, instance_items, shown_schedule,
            visible_rows,
        },
        keys::hints,
    },
};

/// `percent_x` by `percent_y` of `area`, centered.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x.min(100)) / 100) as u16;
    let height = (u32::from(area.height) * u32::from(percent_y.min(100)) / 100) as u16;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// First line to show so that `selected` stays inside `height` lines.
pub fn scroll_offset(selected: usize, height: usize) -> usize {
    if height == 0 {
        return 0;
    }
    (selected + 2).saturating_sub(height)
}

pub fn draw(f: &mut Frame, app: &App<'_>) {
    let palette = app.ctx().theme.current().palette();
    let area = f.area();
    f.render_widget(
        Block::default().style(Style::default().fg(palette.fg).bg(palette.bg)),
        area,
    );
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(f, app, &palette, chunks[0]);
    match app.controller.session() {
        None => draw_splash(f, app, &palette, chunks[1]),
        Some(session) => {
            let focused = app.modal_top().is_none();
            let sel = focused.then_some(app.row_sel);
            let pending = app.pending_schedule_mode(None);
            draw_form(f, &session.form, sel, app.item_sel, pending, &palette, chunks[1]);
            if let Some(h) = app.modal_top()
                && let Ok(modal) = session.modals.get(h)
            {
                draw_modal(f, app, h, modal, &palette);
            }
        }
    }
    let footer = hints(app.controller.session().is_some(), app.modal_top().is_some());
    f.render_widget(
        Paragraph::new(footer).style(Style::default().fg(palette.muted)),
        chunks[2],
    );

    match &app.overlay {
        Overlay::None => {}
        Overlay::Prompt(p) => draw_prompt(f, p, &palette),
        Overlay::Dirs(d) => draw_dirs(f, d, &palette),
        Overlay::Choice(c) => draw_choice(f, c, &palette),
    }
    draw_toasts(f, app, &palette, chunks[1]);
}

fn draw_header(f: &mut Frame, app: &App<'_>, palette: &Palette, area: Rect) {
    let title = match app.controller.session() {
        Some(s) if s.state.is_dirty() => format!("DAPS ▸ {} *", s.module.label),
        Some(s) => format!("DAPS ▸ {}", s.module.label),
        None => "DAPS".to_string(),
    };
    let mut spans = vec![
        Span::styled(
            title,
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", app.ctx().api.base_url()),
            Style::default().fg(palette.muted),
        ),
    ];
    if app.loader.is_visible(Instant::now()) {
        spans.push(Span::styled(
            format!("  ⟳ {}…", app.loader.label),
            Style::default().fg(palette.accent),
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::BOTTOM)),
        area,
    );
}

fn draw_splash(f: &mut Frame, app: &App<'_>, palette: &Palette, area: Rect) {
    let lines: Vec<Line> = app
        .modules
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let style = if i == app.splash_sel {
                Style::default()
                    .fg(palette.bg)
                    .bg(palette.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.fg)
            };
            Line::from(vec![
                Span::styled(format!(" {:<20}", m.label), style),
                Span::styled(format!("  {}", m.description), Style::default().fg(palette.muted)),
            ])
        })
        .collect();
    let offset = scroll_offset(app.splash_sel, area.height as usize);
    f.render_widget(Paragraph::new(lines).scroll((offset as u16, 0)), area);
}

fn item_spans(items: Vec<String>, active: Option<usize>, palette: &Palette) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        let style = if active == Some(i) {
            Style::default().fg(palette.bg).bg(palette.accent)
        } else {
            Style::default().fg(palette.fg)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(item, style));
    }
    spans
}

fn schedule_spans(schedule: &Schedule, item: Option<usize>, palette: &Palette) -> Vec<Span<'static>> {
    let muted = Style::default().fg(palette.muted);
    let mut spans = vec![Span::styled(format!(" {}:", schedule.mode().name()), muted)];
    match schedule {
        Schedule::Hourly { minute } => spans.push(Span::styled(
            format!(" at minute {minute:02}"),
            Style::default().fg(palette.fg),
        )),
        Schedule::Cron { expr } if expr.trim().is_empty() => {
            spans.push(Span::styled(" (no expression)", muted))
        }
        Schedule::Cron { expr } => {
            spans.push(Span::styled(format!(" {expr}"), Style::default().fg(palette.fg)))
        }
        _ if schedule.slot_count() == 0 => spans.push(Span::styled(" (none)", muted)),
        _ => spans.extend(item_spans(schedule.slot_labels(), item, palette)),
    }
    spans
}

/// Value part of a row; itemised widgets highlight `item` when `active`.
fn value_spans(
    widget: &Widget,
    item: Option<usize>,
    pending: Option<ScheduleMode>,
    palette: &Palette,
) -> Vec<Span<'static>> {
    match widget {
        Widget::Schedule { schedule, .. } => {
            schedule_spans(&shown_schedule(schedule, pending), item, palette)
        }
        Widget::DirectoryList { entries, .. } => {
            let items = entries
                .iter()
                .map(|e| match &e.option {
                    Some(o) => format!("{} [{o}]", e.path),
                    None => e.path.clone(),
                })
                .collect();
            item_spans(items, item, palette)
        }
        Widget::ColorList { colors, .. } => item_spans(colors.clone(), item, palette),
        Widget::Instances(picker) => {
            let items = instance_items(picker).into_iter().map(|(l, _)| l).collect();
            item_spans(items, item, palette)
        }
        Widget::Cards(list) => {
            let mut items: Vec<String> = list
                .cards
                .iter()
                .map(|c| {
                    if c.subtitle.is_empty() {
                        c.title.clone()
                    } else {
                        format!("{} ({})", c.title, c.subtitle)
                    }
                })
                .collect();
            items.push(format!("+ {}", list.add_label));
            item_spans(items, item, palette)
        }
        other => vec![Span::styled(
            format!(" {}", other.summary()),
            Style::default().fg(palette.fg),
        )],
    }
}

fn row_lines(
    row: &Row,
    selected: bool,
    item: usize,
    pending: Option<ScheduleMode>,
    palette: &Palette,
) -> Vec<Line<'static>> {
    let marker = if row.required { "*" } else { " " };
    let label_style = if selected {
        Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default().fg(palette.accent)
    };
    let mut spans = vec![Span::styled(format!("{marker}{:<28}", row.label), label_style)];
    spans.extend(value_spans(&row.widget, selected.then_some(item), pending, palette));
    let mut lines = vec![Line::from(spans)];
    if let Widget::Instances(picker) = &row.widget {
        for (instance, msg) in &picker.library_errors {
            lines.push(Line::from(Span::styled(
                format!("   {instance}: {msg}"),
                Style::default().fg(palette.error),
            )));
        }
    }
    if let Some(err) = &row.error {
        lines.push(Line::from(Span::styled(
            format!("   {err}"),
            Style::default().fg(palette.error),
        )));
    }
    if selected && let Some(help) = &row.help {
        lines.push(Line::from(Span::styled(
            format!("   {help}"),
            Style::default().fg(palette.muted),
        )));
    }
    lines
}

fn form_lines(
    form: &Form,
    selected: Option<usize>,
    item: usize,
    pending: Option<(&str, ScheduleMode)>,
    palette: &Palette,
) -> (Vec<Line<'static>>, usize) {
    let mut lines = Vec::new();
    let mut cursor_line = 0;
    for (i, row) in visible_rows(form).enumerate() {
        let is_sel = selected == Some(i);
        if is_sel {
            cursor_line = lines.len();
        }
        let mode = pending.filter(|(k, _)| *k == row.key).map(|(_, m)| m);
        lines.extend(row_lines(row, is_sel, item, mode, palette));
    }
    (lines, cursor_line)
}

fn draw_form(
    f: &mut Frame,
    form: &Form,
    selected: Option<usize>,
    item: usize,
    pending: Option<(&str, ScheduleMode)>,
    palette: &Palette,
    area: Rect,
) {
    let (lines, cursor) = form_lines(form, selected, item, pending, palette);
    let offset = scroll_offset(cursor, area.height as usize);
    f.render_widget(Paragraph::new(lines).scroll((offset as u16, 0)), area);
}

fn draw_modal(f: &mut Frame, app: &App<'_>, handle: ModalHandle, modal: &Modal, palette: &Palette) {
    let area = centered_rect(80, 70, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .title(format!(" {} ", modal.title))
        .borders(Borders::ALL)
        .style(Style::default().fg(palette.fg).bg(palette.bg));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);
    let rows = visible_rows(&modal.body).count();
    let on_row = (app.modal_sel < rows).then_some(app.modal_sel);
    let pending = app.pending_schedule_mode(Some(handle));
    draw_form(f, &modal.body, on_row, app.item_sel, pending, palette, parts[0]);

    let buttons = modal
        .buttons
        .iter()
        .map(|b| format!("[ {} ]", b.label))
        .collect();
    let active = app.modal_sel.checked_sub(rows);
    f.render_widget(
        Paragraph::new(Line::from(item_spans(buttons, active, palette))).alignment(Alignment::Right),
        parts[1],
    );
}

fn draw_prompt(f: &mut Frame, p: &Prompt, palette: &Palette) {
    let area = centered_rect(60, 20, f.area());
    f.render_widget(Clear, area);
    let shown = if p.masked {
        "•".repeat(p.buffer.chars().count())
    } else {
        p.buffer.clone()
    };
    let text = Text::from(vec![
        Line::from(Span::styled(
            "enter accept  esc cancel",
            Style::default().fg(palette.muted),
        )),
        Line::from(format!("{shown}_")),
    ]);
    f.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .block(Block::default().title(format!(" {} ", p.label)).borders(Borders::ALL))
            .style(Style::default().fg(palette.fg).bg(palette.bg)),
        area,
    );
}

fn draw_dirs(f: &mut Frame, d: &DirBrowser, palette: &Palette) {
    let area = centered_rect(60, 60, f.area());
    f.render_widget(Clear, area);
    let mut lines = vec![Line::from(Span::styled(
        "enter open  ← up  space select  n new folder  esc cancel",
        Style::default().fg(palette.muted),
    ))];
    if let Some(name) = &d.naming {
        lines.push(Line::from(format!("New folder: {name}_")));
    }
    for (i, entry) in d.picker.entries.iter().enumerate() {
        let style = if i == d.picker.selected {
            Style::default().fg(palette.bg).bg(palette.accent)
        } else {
            Style::default().fg(palette.fg)
        };
        lines.push(Line::from(Span::styled(format!("📁 {entry}"), style)));
    }
    if d.picker.entries.is_empty() {
        lines.push(Line::from(Span::styled(
            "(no subdirectories)",
            Style::default().fg(palette.muted),
        )));
    }
    let height = area.height.saturating_sub(2) as usize;
    let offset = scroll_offset(d.picker.selected + 1, height);
    f.render_widget(
        Paragraph::new(lines)
            .scroll((offset as u16, 0))
            .block(
                Block::default()
                    .title(format!(" {} ", d.picker.path))
                    .borders(Borders::ALL),
            )
            .style(Style::default().fg(palette.fg).bg(palette.bg)),
        area,
    );
}

fn draw_choice(f: &mut Frame, c: &ChoicePrompt, palette: &Palette) {
    let area = centered_rect(50, 25, f.area());
    f.render_widget(Clear, area);
    let buttons = Choice::ALL.iter().map(|c| format!("[ {} ]", c.label())).collect();
    let text = Text::from(vec![
        Line::from(c.dialog.message.clone()),
        Line::from(""),
        Line::from(item_spans(buttons, Some(c.selected), palette)),
    ]);
    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .title(format!(" {} ", c.dialog.title))
                    .borders(Borders::ALL),
            )
            .style(Style::default().fg(palette.fg).bg(palette.bg)),
        area,
    );
}

fn draw_toasts(f: &mut Frame, app: &App<'_>, palette: &Palette, area: Rect) {
    let toasts = app.ctx().toasts.live();
    if toasts.is_empty() {
        return;
    }
    let height = (toasts.len() as u16 + 2).min(area.height);
    let width = (area.width / 2).max(20).min(area.width);
    let rect = Rect {
        x: area.x + area.width - width,
        y: area.y + area.height - height,
        width,
        height,
    };
    let lines: Vec<Line> = toasts
        .iter()
        .map(|t| {
            let color = match t.kind {
                ToastKind::Error => palette.error,
                ToastKind::Success | ToastKind::Info => palette.accent,
                ToastKind::Warning => palette.muted,
            };
            Line::from(Span::styled(t.message.clone(), Style::default().fg(color)))
        })
        .collect();
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(palette.fg).bg(palette.bg)),
        rect,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect() {
        let r = centered_rect(50, 50, Rect::new(0, 0, 100, 40));
        assert_eq!(r, Rect::new(25, 10, 50, 20));
        let full = centered_rect(150, 100, Rect::new(2, 3, 10, 10));
        assert_eq!(full, Rect::new(2, 3, 10, 10));
    }

    #[test]
    fn test_schedule_row_shows_slots() {
        let palette = crate::theme::Theme::Dark.palette();
        let text = |spans: Vec<Span<'static>>| spans.iter().map(|s| s.content.to_string()).collect::<String>();
        let weekly = Schedule::parse("weekly(monday@08:00|friday@22:15)");
        assert_eq!(
            text(schedule_spans(&weekly, Some(1), &palette)),
            " weekly: monday@08:00 friday@22:15"
        );
        let widget = Widget::Schedule {
            schedule: Schedule::parse(""),
            text: String::new(),
        };
        assert_eq!(text(value_spans(&widget, None, None, &palette)), " daily: (none)");
        assert_eq!(
            text(value_spans(&widget, None, Some(ScheduleMode::Cron), &palette)),
            " cron: (no expression)"
        );
    }

    #[test]
    fn test_scroll_keeps_cursor_visible() {
        assert_eq!(scroll_offset(0, 10), 0);
        assert_eq!(scroll_offset(7, 10), 0);
        assert_eq!(scroll_offset(12, 10), 4);
        assert_eq!(scroll_offset(3, 0), 0);
    }
}
