mod app;
mod batch;
mod browser;
mod catalog;
mod config;
mod logger;
mod runner;
mod store;
mod tweaks;
mod ui;
mod update;

use anyhow::Result;
use app::App;
use batch::{BatchEvent, BatchRunner};
use catalog::TweakCatalog;
use clap::Parser;
use config::Config;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use logger::TerminalLog;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use runner::ExploitApplier;
use std::io;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};
use store::CustomTweakStore;
use update::UpdateService;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Lists all available tweaks, category by category
    List,
    /// Applies the named tweaks in order
    Apply {
        /// Names of the tweaks to apply
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Imports custom tweaks from a JSON file
    Import {
        /// The file to import from
        file: std::path::PathBuf,
    },
    /// Exports a custom tweak to a JSON file
    Export {
        /// The name of the custom tweak
        name: String,
        /// The file to write
        file: std::path::PathBuf,
    },
    /// Checks whether a newer release is available
    CheckUpdate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // No file logger is not a reason to refuse to run.
    if let Err(err) = logger::init_file_logging() {
        eprintln!("file logging unavailable: {}", err);
    }

    if let Some(command) = cli.command {
        return run_cli(command);
    }

    let config = Config::load();
    let catalog = TweakCatalog::new().load();
    let store = CustomTweakStore::open(CustomTweakStore::default_store_path());
    let log = TerminalLog::new();
    let mut app = App::new(config, catalog, store, log, Arc::new(ExploitApplier));

    // Version check runs off-thread so a slow network never delays startup.
    let (update_tx, update_rx) = mpsc::channel();
    std::thread::spawn(move || {
        let result = UpdateService::new().check().unwrap_or(None);
        let _ = update_tx.send(result);
    });
    app.set_update_receiver(update_rx);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err);
    }

    Ok(())
}

fn run_cli(command: Commands) -> Result<()> {
    let mut store = CustomTweakStore::open(CustomTweakStore::default_store_path());
    match command {
        Commands::List => {
            let catalog = TweakCatalog::new().load();
            for category in tweaks::TweakCategory::ALL {
                let in_category: Vec<_> = if category == tweaks::TweakCategory::Custom {
                    store.tweaks().iter().collect()
                } else {
                    catalog.iter().filter(|t| t.category == category).collect()
                };
                if in_category.is_empty() {
                    continue;
                }
                println!("\n{}:", category);
                for tweak in in_category {
                    println!("  - {}", tweak.name);
                }
            }
        }
        Commands::Apply { names } => {
            let catalog = TweakCatalog::new().load();
            let mut selected = Vec::new();
            for name in &names {
                let found = catalog
                    .iter()
                    .chain(store.tweaks().iter())
                    .find(|t| t.name == *name)
                    .cloned();
                match found {
                    Some(tweak) => selected.push(tweak),
                    None => anyhow::bail!("Tweak not found: '{}'", name),
                }
            }

            let (tx, rx) = mpsc::channel();
            let cancel = Arc::new(AtomicBool::new(false));
            let handle = std::thread::spawn(move || {
                BatchRunner::new(&ExploitApplier, cancel).run(&selected, &tx);
            });
            for event in rx {
                match event {
                    BatchEvent::Log(line) => println!("{}", line),
                    BatchEvent::Progress(_, _) => {}
                    BatchEvent::Finished(report) => {
                        let _ = handle.join();
                        if report.outcome == batch::RunOutcome::Failed {
                            std::process::exit(1);
                        }
                        break;
                    }
                }
            }
        }
        Commands::Import { file } => {
            let names = store.import(&file)?;
            for name in &names {
                println!("Imported tweak: '{}'", name);
            }
        }
        Commands::Export { name, file } => {
            store.export(&name, &file)?;
            println!("Exported tweak: '{}' to {}", name, file.display());
        }
        Commands::CheckUpdate => match UpdateService::new().check()? {
            Some(update) => {
                println!(
                    "Update available: {} (released {})",
                    update.latest_version, update.release_date
                );
                if update.critical_update {
                    println!("This is a critical update.");
                }
                println!("Minimum compatible version: {}", update.min_compatible_version);
                println!("Download: {}", update.download_url);
                for note in &update.release_notes {
                    println!("  - {}", note);
                }
            }
            None => println!("You are on the latest version."),
        },
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|f| ui::ui(f, app))?;

        if app.should_quit {
            break;
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) => {
                    if app.preview.is_some() {
                        handle_preview_keys(app, key.code);
                        continue;
                    }
                    if app.browser.is_some() {
                        handle_browser_keys(app, key.code);
                        continue;
                    }
                    if app.prompt.is_some() {
                        match key.code {
                            KeyCode::Char(c) => app.input_buffer.push(c),
                            KeyCode::Backspace => {
                                app.input_buffer.pop();
                            }
                            KeyCode::Enter => app.handle_prompt_input(),
                            KeyCode::Esc => app.cancel_prompt(),
                            _ => {}
                        }
                        continue;
                    }
                    if app.confirmation.is_some() {
                        match key.code {
                            KeyCode::Char(c) => app.input_buffer.push(c),
                            KeyCode::Backspace => {
                                app.input_buffer.pop();
                            }
                            KeyCode::Enter => {
                                let input = app.input_buffer.clone();
                                app.handle_confirmation(&input);
                                app.input_buffer.clear();
                            }
                            KeyCode::Esc => {
                                app.handle_confirmation("no");
                                app.input_buffer.clear();
                            }
                            _ => {}
                        }
                        continue;
                    }
                    if app.show_terminal {
                        handle_terminal_keys(app, key.code);
                        continue;
                    }
                    handle_main_keys(app, key.code);
                }
                Event::Mouse(_) => {} // Ignore mouse events
                _ => {}               // Ignore other events
            }
        }
    }

    Ok(())
}

fn handle_main_keys(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Enter => app.toggle_selected(),
        KeyCode::Right => app.handle_right_key(),
        KeyCode::Left => app.handle_left_key(),
        KeyCode::Up => app.previous_item(),
        KeyCode::Down => app.next_item(),
        KeyCode::Char('a') => app.request_apply(),
        KeyCode::Char('t') => app.toggle_terminal(),
        KeyCode::Char('f') => app.open_browser(),
        KeyCode::Char('n') => app.start_creator(),
        KeyCode::Char('d') => app.request_delete_selected(),
        KeyCode::Char('e') => app.start_export(),
        KeyCode::Char('i') => app.start_import(),
        KeyCode::Char('u') => app.dismiss_update_notice(),
        KeyCode::Char('c') => app.cancel_run(),
        _ => {}
    }
}

fn handle_terminal_keys(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('t') | KeyCode::Esc | KeyCode::Char('q') => app.show_terminal = false,
        KeyCode::Char('c') => app.cancel_run(),
        KeyCode::Char('x') => app.log.clear(),
        KeyCode::Up => app.terminal_scroll = app.terminal_scroll.saturating_sub(1),
        KeyCode::Down => app.terminal_scroll = app.terminal_scroll.saturating_add(1),
        _ => {}
    }
}

fn handle_preview_keys(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Up => app.preview_scroll = app.preview_scroll.saturating_sub(1),
        KeyCode::Down => app.preview_scroll = app.preview_scroll.saturating_add(1),
        _ => {
            app.preview = None;
            app.preview_scroll = 0;
        }
    }
}

fn handle_browser_keys(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Esc | KeyCode::Char('q') => app.close_browser(),
        KeyCode::Up => {
            if let Some(selected) = app.browser_list_state.selected() {
                if selected > 0 {
                    app.browser_list_state.select(Some(selected - 1));
                }
            }
        }
        KeyCode::Down => {
            let count = app.browser.as_ref().map(|b| b.entries.len()).unwrap_or(0);
            if let Some(selected) = app.browser_list_state.selected() {
                if selected + 1 < count {
                    app.browser_list_state.select(Some(selected + 1));
                }
            }
        }
        KeyCode::Left => {
            if let Some(browser) = app.browser.as_mut() {
                browser.navigate_back();
                app.browser_list_state.select(Some(0));
            }
        }
        KeyCode::Enter => {
            let Some(index) = app.browser_list_state.selected() else {
                return;
            };
            let entry = app
                .browser
                .as_ref()
                .and_then(|b| b.entries.get(index).cloned());
            let Some(entry) = entry else {
                return;
            };
            if entry.is_directory {
                if let Some(browser) = app.browser.as_mut() {
                    browser.enter(index);
                    app.browser_list_state.select(Some(0));
                }
            } else {
                let body = if browser::is_text_previewable(&entry.path) {
                    browser::read_text_preview(&entry.path)
                } else {
                    browser::hex_dump(&entry.path)
                };
                match body {
                    Ok(text) => {
                        let title = format!(
                            "{} ({}, {})",
                            entry.name,
                            browser::detect_file_type(&entry.path),
                            browser::formatted_size(entry.size)
                        );
                        app.preview = Some((title, text));
                        app.preview_scroll = 0;
                    }
                    Err(err) => app.set_status(format!("Cannot read file: {}", err), 50),
                }
            }
        }
        _ => {}
    }
}
