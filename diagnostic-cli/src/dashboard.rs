use chrono::{DateTime, Utc};
use clap::Parser;
use crossterm::event::{self, Event as TermEvent, KeyCode};
use kiddee_board::{
    protocol::types::{DhtReading, DhtType},
    Board, Callback, Error, Event, DEFAULT_DHT_DIFFERENTIAL, DEFAULT_SONAR_TIMEOUT_US,
};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Row, Table, TableState},
};
use std::{sync::Arc, time::Duration};
use strum::Display;
use tokio::sync::mpsc;

#[derive(Parser)]
pub(crate) struct Args {
    /// Analog inputs to watch, numbered from A0
    #[arg(long, value_delimiter = ',')]
    analog: Vec<u8>,

    /// Digital inputs to watch
    #[arg(long, value_delimiter = ',')]
    digital: Vec<u8>,

    /// Sonar trigger pins (echo on the same pin)
    #[arg(long, value_delimiter = ',')]
    sonar: Vec<u8>,

    /// DHT22 data pins
    #[arg(long, value_delimiter = ',')]
    dht: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
enum Source {
    #[strum(to_string = "A{pin}")]
    Analog { pin: u8 },
    #[strum(to_string = "D{pin}")]
    Digital { pin: u8 },
    #[strum(to_string = "Sonar D{pin}")]
    Sonar { pin: u8 },
    #[strum(to_string = "DHT D{pin}")]
    Dht { pin: u8 },
}

fn event_to_value(event: Event) -> Option<(Source, String, DateTime<Utc>)> {
    match event {
        Event::Analog { pin, value, time } => Some((Source::Analog { pin }, value.to_string(), time)),
        Event::Input { pin, value, time } | Event::Pullup { pin, value, time } => {
            Some((Source::Digital { pin }, value.to_string(), time))
        }
        Event::Sonar {
            trigger_pin,
            distance_cm,
            time,
        } => Some((
            Source::Sonar { pin: trigger_pin },
            format!("{distance_cm} cm"),
            time,
        )),
        Event::Dht {
            pin, reading, time, ..
        } => {
            let value = match reading {
                DhtReading::Valid {
                    humidity,
                    temperature,
                } => format!("{humidity:.1} %RH, {temperature:.1} C"),
                error => format!("{error:?}"),
            };
            Some((Source::Dht { pin }, value, time))
        }
        _ => None,
    }
}

struct TableParameter {
    source: Source,
    value: Option<String>,
    updated: Option<DateTime<Utc>>,
}

struct App {
    items: Vec<TableParameter>,
    table_state: TableState,
}

impl App {
    fn new(sources: impl IntoIterator<Item = Source>) -> Self {
        let items = sources
            .into_iter()
            .map(|source| TableParameter {
                source,
                value: None,
                updated: None,
            })
            .collect();

        let mut table_state = TableState::default();
        table_state.select(Some(0));

        Self { items, table_state }
    }

    fn next(&mut self) {
        self.table_state.scroll_down_by(1);
    }

    fn previous(&mut self) {
        self.table_state.scroll_up_by(1);
    }

    fn update(&mut self, source: Source, value: String, time: DateTime<Utc>) {
        if let Some(item) = self.items.iter_mut().find(|item| item.source == source) {
            item.value = Some(value);
            item.updated = Some(time);
        }
    }
}

async fn configure(board: &Board, args: &Args, callback: &Callback) -> Result<(), Error> {
    for pin in &args.analog {
        board
            .set_pin_mode_analog_input(*pin, Some(callback.clone()), 1)
            .await?;
    }
    for pin in &args.digital {
        board
            .set_pin_mode_digital_input(*pin, Some(callback.clone()))
            .await?;
    }
    for pin in &args.sonar {
        board
            .set_pin_mode_sonar(*pin, None, Some(callback.clone()), DEFAULT_SONAR_TIMEOUT_US)
            .await?;
    }
    for pin in &args.dht {
        board
            .set_pin_mode_dht(
                *pin,
                DhtType::Dht22,
                DEFAULT_DHT_DIFFERENTIAL,
                Some(callback.clone()),
            )
            .await?;
    }
    Ok(())
}

pub(crate) async fn run(board: &Board, args: &Args) -> Result<(), Error> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let callback: Callback = Arc::new(move |event| {
        if let Some(value) = event_to_value(event) {
            let _ = tx.send(value);
        }
    });
    configure(board, args, &callback).await?;

    let sources = args
        .analog
        .iter()
        .map(|&pin| Source::Analog { pin })
        .chain(args.digital.iter().map(|&pin| Source::Digital { pin }))
        .chain(args.sonar.iter().map(|&pin| Source::Sonar { pin }))
        .chain(args.dht.iter().map(|&pin| Source::Dht { pin }));
    let mut app = App::new(sources);

    let mut terminal = ratatui::init();

    let result = loop {
        let drawn = terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(100)].as_ref())
                .split(f.area());

            let header = Row::new(vec!["Input", "Value", "Age", "Last Updated"]).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
                    .add_modifier(Modifier::UNDERLINED),
            );

            let now = Utc::now();

            let rows: Vec<Row> = app
                .items
                .iter()
                .map(|item| {
                    Row::new(vec![
                        item.source.to_string(),
                        item.value
                            .clone()
                            .unwrap_or_else(|| "<unknown>".to_string()),
                        item.updated
                            .map(|t| (now - t).num_seconds().to_string())
                            .unwrap_or_default(),
                        item.updated.map(|t| t.to_string()).unwrap_or_default(),
                    ])
                })
                .collect();

            let table = Table::new(
                rows,
                [
                    Constraint::Percentage(20),
                    Constraint::Percentage(40),
                    Constraint::Percentage(10),
                    Constraint::Percentage(30),
                ],
            )
            .header(header)
            .row_highlight_style(Style::default().bg(Color::Blue).fg(Color::Black));

            f.render_stateful_widget(table, chunks[0], &mut app.table_state);
        });
        if let Err(e) = drawn {
            break Err(e.into());
        }

        // Handle keyboard input
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => match event::read() {
                Ok(TermEvent::Key(key)) => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break Ok(()),
                    KeyCode::Char('j') | KeyCode::Down => app.next(),
                    KeyCode::Char('k') | KeyCode::Up => app.previous(),
                    _ => {}
                },
                Ok(_) => {}
                Err(e) => break Err(e.into()),
            },
            Ok(false) => {}
            Err(e) => break Err(e.into()),
        }

        // Handle new values
        while let Ok((source, value, time)) = rx.try_recv() {
            app.update(source, value, time);
        }
    };

    ratatui::restore();

    result
}
