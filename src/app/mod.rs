use iced::widget::{
    button, column, container, horizontal_rule, pick_list, radio, scrollable, text, text_input,
    Column, Container, Row,
};
use iced::{window, Application, Color, Command, Element, Length, Settings, Theme};
use iced_core::{Pixels, Size};
use tracing::debug;

use crate::config::AppConfig;
use crate::data::{export, parse, SourceKind, Table};
use crate::enrich::limiter::IntervalGate;
use crate::enrich::{self, EnrichmentOutcome};
use crate::errors::AuthError;
use crate::search::SearchClient;
use crate::sheets::auth::Authenticator;
use crate::sheets::{SheetsClient, SpreadsheetInfo};

pub mod pages;
pub mod state;

use pages::Page;
use state::{Status, StatusKind};

pub fn run(config: AppConfig) -> iced::Result {
    debug!("Starting dashboard");

    Dashboard::run(Settings {
        id: Some("tabscout".to_string()),
        window: window::Settings {
            size: Size {
                width: 1100.0,
                height: 800.0,
            },
            position: window::Position::Centered,
            resizable: true,
            ..Default::default()
        },
        default_text_size: Pixels::from(16.0),
        antialiasing: true,
        default_font: Default::default(),
        flags: DashboardFlags { config },
        fonts: vec![],
    })
}

pub struct DashboardFlags {
    pub config: AppConfig,
}

pub struct Dashboard {
    state: state::State,
    config: AppConfig,
    auth: Option<Authenticator>,
    sheets_client: Option<SheetsClient>,
}

/// How an attempt to reach the spreadsheet service ended.
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    Listed {
        access_token: String,
        sheets: Vec<SpreadsheetInfo>,
    },
    NeedsAuthorization,
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum Message {
    Navigate(Page),
    ApiKeyChanged(String),
    SourcePicked(SourceKind),
    CsvPathChanged(String),
    LoadCsv,
    ConnectSheets,
    Connected(ConnectOutcome),
    SheetPicked(SpreadsheetInfo),
    TableLoaded(Result<Table, String>),
    EntityColumnPicked(String),
    TargetColumnPicked(String),
    TemplateChanged(String),
    IntervalChanged(String),
    RunEnrichment,
    EnrichmentFinished(u64, EnrichmentOutcome),
    ExportTable,
    ExportResults,
    Exported(Result<String, String>),
}

impl Application for Dashboard {
    type Executor = iced::executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = DashboardFlags;

    fn new(flags: DashboardFlags) -> (Self, Command<Self::Message>) {
        let mut state = state::State {
            interval_text: format!("{}", flags.config.rate_limit_secs),
            ..Default::default()
        };
        if let Some(key) = &flags.config.api_key {
            state.api_key = key.clone();
        }

        // A CSV path given on the command line is loaded straight away
        let command = match &flags.config.csv_path {
            Some(path) => {
                state.csv_path = path.display().to_string();
                state.loading = true;
                load_csv_command(state.csv_path.clone())
            }
            None => Command::none(),
        };

        let dashboard = Dashboard {
            state,
            config: flags.config,
            auth: None,
            sheets_client: None,
        };

        (dashboard, command)
    }

    fn title(&self) -> String {
        "tabscout".to_string()
    }

    fn update(&mut self, message: Self::Message) -> Command<Self::Message> {
        match message {
            Message::Navigate(page) => {
                self.state.page = page;
                Command::none()
            }
            Message::ApiKeyChanged(value) => {
                self.state.api_key = value;
                Command::none()
            }
            Message::SourcePicked(kind) => {
                self.state.source = kind;
                Command::none()
            }
            Message::CsvPathChanged(value) => {
                self.state.csv_path = value;
                Command::none()
            }
            Message::LoadCsv => {
                let path = self.state.csv_path.trim().to_string();
                if path.is_empty() {
                    self.state.status = Some(Status::error("Enter a CSV file path first"));
                    return Command::none();
                }
                self.state.loading = true;
                self.state.status = Some(Status::info(format!("Loading {path}...")));
                load_csv_command(path)
            }
            Message::ConnectSheets => self.connect_sheets(),
            Message::Connected(outcome) => self.on_connected(outcome),
            Message::SheetPicked(sheet) => {
                let Some(client) = self.sheets_client.clone() else {
                    self.state.status = Some(Status::error("Connect to the spreadsheet service first"));
                    return Command::none();
                };
                self.state.selected_sheet = Some(sheet.clone());
                self.state.loading = true;
                self.state.status = Some(Status::info(format!("Fetching \"{}\"...", sheet.name)));
                Command::perform(
                    async move {
                        client
                            .fetch_table(&sheet.id)
                            .await
                            .map_err(|err| err.to_string())
                    },
                    Message::TableLoaded,
                )
            }
            Message::TableLoaded(result) => {
                self.state.loading = false;
                match result {
                    Ok(table) => {
                        self.state.status = Some(Status::info(format!(
                            "Loaded {} rows, {} columns",
                            table.num_rows(),
                            table.num_columns()
                        )));
                        self.state.set_table(table);
                    }
                    Err(err) => {
                        self.state.status = Some(Status::error(err));
                    }
                }
                Command::none()
            }
            Message::EntityColumnPicked(column) => {
                self.state.entity_column = Some(column);
                Command::none()
            }
            Message::TargetColumnPicked(column) => {
                self.state.target_column = Some(column);
                Command::none()
            }
            Message::TemplateChanged(value) => {
                self.state.template = value;
                Command::none()
            }
            Message::IntervalChanged(value) => {
                self.state.interval_text = value;
                Command::none()
            }
            Message::RunEnrichment => self.run_enrichment(),
            Message::EnrichmentFinished(generation, outcome) => {
                self.state.running = false;
                // A reload while the run was in flight makes its results stale
                if generation != self.state.generation {
                    return Command::none();
                }
                self.state.result_table = Some(enrich::records_to_table(&outcome.records));
                self.state.status = Some(Status::info(format!(
                    "Processed {} entities, {} result rows",
                    outcome.entities_processed,
                    outcome.records.len()
                )));
                self.state.outcome = Some(outcome);
                Command::none()
            }
            Message::ExportTable => match &self.state.table {
                Some(table) => export_command(table.clone(), &self.config, "full_data.csv"),
                None => Command::none(),
            },
            Message::ExportResults => match &self.state.result_table {
                Some(table) => export_command(table.clone(), &self.config, "results.csv"),
                None => Command::none(),
            },
            Message::Exported(result) => {
                self.state.status = Some(match result {
                    Ok(path) => Status::info(format!("Saved {path}")),
                    Err(err) => Status::error(format!("Export failed: {err}")),
                });
                Command::none()
            }
        }
    }

    fn view(&self) -> Element<'_, Self::Message> {
        let nav = self.nav_bar();

        let content: Element<'_, Message> = match self.state.page {
            Page::Dashboard => self.dashboard(),
            other => pages::view(other),
        };

        let layout = Column::with_children(vec![nav, content])
            .spacing(4)
            .width(Length::Fill);

        container(scrollable(layout))
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(8)
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

impl Dashboard {
    fn connect_sheets(&mut self) -> Command<Message> {
        // Covers a pending interactive authorization too: a second Connect
        // would bind another listener and orphan the first
        if self.state.loading {
            return Command::none();
        }

        if self.auth.is_none() {
            match Authenticator::load(
                &self.config.client_secret_path,
                &self.config.token_cache_path,
            ) {
                Ok(auth) => self.auth = Some(auth),
                Err(err) => {
                    self.state.status = Some(Status::error(err.to_string()));
                    return Command::none();
                }
            }
        }

        let Some(auth) = self.auth.clone() else {
            return Command::none();
        };
        self.state.loading = true;
        self.state.status = Some(Status::info("Connecting to the spreadsheet service..."));
        Command::perform(
            async move {
                match auth.cached_token().await {
                    Ok(token) => list_sheets(token).await,
                    Err(AuthError::NeedsAuthorization) => ConnectOutcome::NeedsAuthorization,
                    Err(err) => ConnectOutcome::Failed(err.to_string()),
                }
            },
            Message::Connected,
        )
    }

    fn on_connected(&mut self, outcome: ConnectOutcome) -> Command<Message> {
        self.state.loading = false;
        match outcome {
            ConnectOutcome::Listed {
                access_token,
                sheets,
            } => {
                self.sheets_client = Some(SheetsClient::new(access_token));
                self.state.auth_url = None;
                self.state.status = Some(Status::info(format!(
                    "Connected, {} spreadsheets available",
                    sheets.len()
                )));
                self.state.sheets = sheets;
                Command::none()
            }
            ConnectOutcome::NeedsAuthorization => {
                let Some(auth) = &self.auth else {
                    return Command::none();
                };
                match auth.begin_interactive() {
                    Ok(pending) => {
                        // Keep Connect disabled until the pending flow resolves
                        self.state.loading = true;
                        self.state.auth_url = Some(pending.url().to_string());
                        self.state.status = Some(Status::info(
                            "Open the authorization link in your browser to continue",
                        ));
                        Command::perform(
                            async move {
                                match pending.finish().await {
                                    Ok(token) => list_sheets(token).await,
                                    Err(err) => ConnectOutcome::Failed(err.to_string()),
                                }
                            },
                            Message::Connected,
                        )
                    }
                    Err(err) => {
                        self.state.status = Some(Status::error(err.to_string()));
                        Command::none()
                    }
                }
            }
            ConnectOutcome::Failed(err) => {
                self.state.status = Some(Status::error(err));
                Command::none()
            }
        }
    }

    fn run_enrichment(&mut self) -> Command<Message> {
        if !self.state.can_run() {
            return Command::none();
        }

        let (Some(table), Some(entity_column), Some(spec)) = (
            self.state.table.clone(),
            self.state.entity_column.clone(),
            self.state.query_spec(),
        ) else {
            return Command::none();
        };
        let gate = IntervalGate::from_secs_clamped(self.state.interval_secs());
        let client = SearchClient::new(self.state.api_key.trim());
        let generation = self.state.generation;

        self.state.running = true;
        self.state.status = Some(Status::info(format!(
            "Enriching {} rows, one search every {:.1}s...",
            table.num_rows(),
            gate.interval().as_secs_f64()
        )));

        Command::perform(
            async move {
                enrich::run_with_client(&table, &entity_column, &spec, &gate, &client).await
            },
            move |outcome| Message::EnrichmentFinished(generation, outcome),
        )
    }

    fn nav_bar(&self) -> Element<'_, Message> {
        let buttons: Vec<Element<'_, Message>> = Page::ALL
            .iter()
            .map(|&page| {
                button(text(page.title()).size(14))
                    .on_press_maybe((page != self.state.page).then_some(Message::Navigate(page)))
                    .into()
            })
            .collect();

        Row::with_children(buttons).spacing(8).padding(4).into()
    }

    fn dashboard(&self) -> Element<'_, Message> {
        let mut sections: Vec<Element<'_, Message>> = Vec::new();

        sections.push(text("Information Retrieval Dashboard").size(26).into());
        sections.push(
            text("Load a table, pick a column of entities, and query its data.")
                .size(15)
                .into(),
        );

        sections.push(
            text_input("SerpAPI key", &self.state.api_key)
                .on_input(Message::ApiKeyChanged)
                .secure(true)
                .padding(8)
                .width(Length::Fixed(420.0))
                .into(),
        );
        if self.state.api_key.trim().is_empty() {
            sections.push(warning_text("Enter an API key to run enrichment"));
        }

        sections.push(self.source_controls());

        if let Some(table) = &self.state.table {
            sections.push(text(format!("Data preview ({} rows)", table.num_rows())).size(18).into());
            sections.push(table_grid(table));
            sections.push(
                button("Download full data as CSV")
                    .on_press(Message::ExportTable)
                    .into(),
            );
            sections.push(self.query_controls());
        }

        if self.state.running {
            sections.push(text("Running, this paces itself against the search API...").into());
        }

        if let Some(outcome) = &self.state.outcome {
            for warning in &outcome.warnings {
                sections.push(warning_text(warning));
            }
        }

        if let Some(results) = &self.state.result_table {
            sections.push(text(format!("Results ({} rows)", results.num_rows())).size(18).into());
            if results.is_empty() {
                sections.push(text("No search results were returned for any entity.").into());
            } else {
                sections.push(table_grid(results));
                sections.push(
                    button("Download results as CSV")
                        .on_press(Message::ExportResults)
                        .into(),
                );
            }
        }

        if let Some(status) = &self.state.status {
            sections.push(status_text(status));
        }

        Column::with_children(sections)
            .spacing(12)
            .padding(16)
            .width(Length::Fill)
            .into()
    }

    fn source_controls(&self) -> Element<'_, Message> {
        let selector = Row::with_children(vec![
            text("Data source:").into(),
            radio(
                "CSV file",
                SourceKind::CsvFile,
                Some(self.state.source),
                Message::SourcePicked,
            )
            .into(),
            radio(
                "Spreadsheet service",
                SourceKind::Spreadsheet,
                Some(self.state.source),
                Message::SourcePicked,
            )
            .into(),
        ])
        .spacing(12);

        let mut rows: Vec<Element<'_, Message>> = vec![selector.into()];

        match self.state.source {
            SourceKind::CsvFile => {
                rows.push(
                    Row::with_children(vec![
                        text_input("Path to a CSV file", &self.state.csv_path)
                            .on_input(Message::CsvPathChanged)
                            .padding(8)
                            .width(Length::Fixed(420.0))
                            .into(),
                        button("Load")
                            .on_press_maybe(
                                (!self.state.loading).then_some(Message::LoadCsv),
                            )
                            .into(),
                    ])
                    .spacing(8)
                    .into(),
                );
            }
            SourceKind::Spreadsheet => {
                rows.push(
                    button("Connect")
                        .on_press_maybe((!self.state.loading).then_some(Message::ConnectSheets))
                        .into(),
                );
                if let Some(url) = &self.state.auth_url {
                    rows.push(text("Authorize in your browser:").into());
                    rows.push(text(url).size(13).into());
                }
                if !self.state.sheets.is_empty() {
                    rows.push(
                        pick_list(
                            self.state.sheets.clone(),
                            self.state.selected_sheet.clone(),
                            Message::SheetPicked,
                        )
                        .placeholder("Select a spreadsheet")
                        .into(),
                    );
                }
            }
        }

        Column::with_children(rows).spacing(8).into()
    }

    fn query_controls(&self) -> Element<'_, Message> {
        let columns = self.state.columns();

        let mut rows: Vec<Element<'_, Message>> = vec![
            text("Query").size(18).into(),
            Row::with_children(vec![
                text("Entity column:").into(),
                pick_list(
                    columns.clone(),
                    self.state.entity_column.clone(),
                    Message::EntityColumnPicked,
                )
                .placeholder("Select the main column for querying")
                .into(),
                text("Target column:").into(),
                pick_list(
                    columns,
                    self.state.target_column.clone(),
                    Message::TargetColumnPicked,
                )
                .placeholder("Column to report back")
                .into(),
            ])
            .spacing(8)
            .into(),
            text_input(
                "Question with {} as the entity placeholder, e.g. 'Find Email for {}'",
                &self.state.template,
            )
            .on_input(Message::TemplateChanged)
            .padding(8)
            .width(Length::Fixed(560.0))
            .into(),
        ];

        if !self.state.template.is_empty() && !self.state.template.contains("{}") {
            rows.push(warning_text("The template needs a {} placeholder"));
        }

        rows.push(
            Row::with_children(vec![
                text("Rate limit interval (seconds, min 1.0):").into(),
                text_input("2.0", &self.state.interval_text)
                    .on_input(Message::IntervalChanged)
                    .padding(8)
                    .width(Length::Fixed(80.0))
                    .into(),
                button("Run enrichment")
                    .on_press_maybe(self.state.can_run().then_some(Message::RunEnrichment))
                    .into(),
            ])
            .spacing(8)
            .into(),
        );

        Column::with_children(rows).spacing(8).into()
    }
}

fn load_csv_command(path: String) -> Command<Message> {
    Command::perform(
        async move {
            parse::parse_csv_file(&path)
                .await
                .map_err(|err| err.to_string())
        },
        Message::TableLoaded,
    )
}

async fn list_sheets(access_token: String) -> ConnectOutcome {
    let client = SheetsClient::new(access_token.clone());
    match client.list_spreadsheets().await {
        Ok(sheets) => ConnectOutcome::Listed {
            access_token,
            sheets,
        },
        Err(err) => ConnectOutcome::Failed(err.to_string()),
    }
}

fn export_command(table: Table, config: &AppConfig, file_name: &'static str) -> Command<Message> {
    let dir = config.export_dir.clone();
    Command::perform(
        async move {
            export::write_csv_download(&table, &dir, file_name)
                .await
                .map(|path| path.display().to_string())
                .map_err(|err| err.to_string())
        },
        Message::Exported,
    )
}

/// Scrollable grid: header row, rule, then data rows, every column sharing
/// the width evenly.
fn table_grid(table: &Table) -> Element<'_, Message> {
    let num_cols = table.num_columns().max(1);

    let mut rows_column: Vec<Element<'_, Message>> = Vec::new();

    let header_cells: Vec<Element<'_, Message>> = table
        .headers
        .iter()
        .map(|h| {
            Container::new(text(h.as_str()).size(15))
                .width(Length::FillPortion(1))
                .into()
        })
        .collect();
    rows_column.push(
        Row::with_children(header_cells)
            .width(Length::Fill)
            .spacing(8)
            .into(),
    );
    rows_column.push(horizontal_rule(1).into());

    for row_data in &table.rows {
        let cells: Vec<Element<'_, Message>> = (0..num_cols)
            .map(|col| {
                let cell_text = row_data.get(col).map(|s| s.as_str()).unwrap_or("");
                Container::new(text(cell_text).size(14))
                    .width(Length::FillPortion(1))
                    .into()
            })
            .collect();
        rows_column.push(
            Row::with_children(cells)
                .width(Length::Fill)
                .spacing(8)
                .into(),
        );
    }

    container(scrollable(column(rows_column)).height(Length::Fixed(220.0)))
        .width(Length::Fill)
        .padding(4)
        .into()
}

fn status_text(status: &Status) -> Element<'_, Message> {
    let color = match status.kind {
        StatusKind::Info => Color::from_rgb(0.6, 0.85, 0.6),
        StatusKind::Error => Color::from_rgb(0.95, 0.5, 0.5),
    };
    text(&status.text)
        .style(iced::theme::Text::Color(color))
        .into()
}

fn warning_text(message: &str) -> Element<'_, Message> {
    text(message)
        .style(iced::theme::Text::Color(Color::from_rgb(0.95, 0.8, 0.4)))
        .into()
}
