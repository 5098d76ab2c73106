use std::{io, time::Duration};

use anyhow::Context;
use crossterm::{
    cursor::{Hide, Show},
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::time::interval;

use crate::ctx::AppContext;

pub mod app;
pub mod keys;
pub mod view;

use app::App;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

const TICK: Duration = Duration::from_millis(200);

/// Run the interactive editor, optionally opening `module` straight away.
///
/// The terminal is restored even when the loop fails.
pub async fn run(ctx: &AppContext, module: Option<&str>) -> anyhow::Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, Hide) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }
    let result = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(mut terminal) => {
            let result = event_loop(&mut terminal, ctx, module).await;
            let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen, Show);
            result
        }
        Err(e) => {
            let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
            Err(e.into())
        }
    };
    let _ = disable_raw_mode();
    result
}

async fn event_loop(
    terminal: &mut Term,
    ctx: &AppContext,
    module: Option<&str>,
) -> anyhow::Result<()> {
    let mut app = App::new(ctx);
    terminal.clear()?;
    if let Some(key) = module {
        run_action(terminal, &mut app, app::Action::Open(key.to_string())).await?;
    }

    let mut events = EventStream::new();
    let mut tick = interval(TICK);
    loop {
        terminal.draw(|f| view::draw(f, &app))?;
        if app.should_quit() {
            info!("leaving terminal UI");
            return Ok(());
        }
        tokio::select! {
            _ = tick.tick() => {}
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if let Some(action) = app.on_key(key) {
                        run_action(terminal, &mut app, action).await?;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Failed to read terminal events"),
                None => return Ok(()),
            }
        }
    }
}

/// Show the loader, draw once so it is on screen, then run `action`.
async fn run_action(terminal: &mut Term, app: &mut App<'_>, action: app::Action) -> anyhow::Result<()> {
    debug!("action {action:?}");
    app.loader.show(action.label());
    terminal.draw(|f| view::draw(f, &*app))?;
    app.perform(action).await;
    app.loader.hide();
    Ok(())
}
