use crate::batch::{BatchEvent, BatchRunner, RunOutcome, RunReport};
use crate::browser::FileBrowser;
use crate::config::Config;
use crate::logger::TerminalLog;
use crate::runner::PathApplier;
use crate::store::CustomTweakStore;
use crate::tweaks::{TweakCategory, TweakDefinition};
use crate::update::AppUpdate;
use ratatui::widgets::ListState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

pub fn get_app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// What the status-bar prompt is currently collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    CreatorName,
    CreatorPaths,
    CreatorDescription,
    ImportPath,
    ExportPath,
}

/// Action armed behind a yes/no confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    ApplyRun,
    DeleteTweak(String),
}

#[derive(Debug, Clone, Default)]
pub struct CreatorDraft {
    pub name: String,
    pub paths: String,
    pub description: String,
}

/// A batch run in flight on a worker thread.
pub struct ActiveRun {
    rx: Receiver<BatchEvent>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

pub struct App {
    pub config: Config,
    pub catalog: Vec<TweakDefinition>,
    pub store: CustomTweakStore,
    pub log: TerminalLog,
    applier: Arc<dyn PathApplier>,

    pub view_level: u8, // 0: categories, 1: tweaks within a category
    pub selected_indices: [usize; 2],
    pub category_list_state: ListState,
    pub tweak_list_state: ListState,
    pub should_quit: bool,

    pub status_message: Option<String>,
    pub status_timer: u32,
    pub confirmation: Option<(String, PendingAction)>,
    pub prompt: Option<PromptKind>,
    pub input_buffer: String,
    creator_draft: CreatorDraft,

    pub show_terminal: bool,
    pub terminal_scroll: u16,
    pub browser: Option<FileBrowser>,
    pub browser_list_state: ListState,
    pub preview: Option<(String, String)>, // (title, body)
    pub preview_scroll: u16,

    pub update_notice: Option<AppUpdate>,
    update_rx: Option<Receiver<Option<AppUpdate>>>,

    pub progress_text: String,
    pub has_error: bool,
    pub last_report: Option<RunReport>,
    run: Option<ActiveRun>,
}

impl App {
    pub fn new(
        config: Config,
        catalog: Vec<TweakDefinition>,
        store: CustomTweakStore,
        log: TerminalLog,
        applier: Arc<dyn PathApplier>,
    ) -> App {
        let mut category_list_state = ListState::default();
        category_list_state.select(Some(0));

        App {
            config,
            catalog,
            store,
            log,
            applier,
            view_level: 0,
            selected_indices: [0, 0],
            category_list_state,
            tweak_list_state: ListState::default(),
            should_quit: false,
            status_message: None,
            status_timer: 0,
            confirmation: None,
            prompt: None,
            input_buffer: String::new(),
            creator_draft: CreatorDraft::default(),
            show_terminal: false,
            terminal_scroll: 0,
            browser: None,
            browser_list_state: ListState::default(),
            preview: None,
            preview_scroll: 0,
            update_notice: None,
            update_rx: None,
            progress_text: "Ready when you are".to_string(),
            has_error: false,
            last_report: None,
            run: None,
        }
    }

    pub fn set_update_receiver(&mut self, rx: Receiver<Option<AppUpdate>>) {
        self.update_rx = Some(rx);
    }

    // ---- navigation -----------------------------------------------------

    pub fn categories(&self) -> &'static [TweakCategory] {
        &TweakCategory::ALL
    }

    pub fn tweaks_in(&self, category: TweakCategory) -> Vec<&TweakDefinition> {
        if category == TweakCategory::Custom {
            self.store.tweaks().iter().collect()
        } else {
            self.catalog
                .iter()
                .filter(|t| t.category == category)
                .collect()
        }
    }

    pub fn current_category(&self) -> TweakCategory {
        TweakCategory::ALL[self.selected_indices[0]]
    }

    pub fn current_tweaks(&self) -> Vec<&TweakDefinition> {
        self.tweaks_in(self.current_category())
    }

    pub fn selected_tweak(&self) -> Option<&TweakDefinition> {
        if self.view_level == 1 {
            self.current_tweaks().get(self.selected_indices[1]).copied()
        } else {
            None
        }
    }

    fn current_list_len(&self) -> usize {
        match self.view_level {
            0 => self.categories().len(),
            _ => self.current_tweaks().len(),
        }
    }

    pub fn next_item(&mut self) {
        let count = self.current_list_len();
        if count == 0 {
            return;
        }
        let (index, state) = if self.view_level == 0 {
            (&mut self.selected_indices[0], &mut self.category_list_state)
        } else {
            (&mut self.selected_indices[1], &mut self.tweak_list_state)
        };
        let new_index = (*index + 1) % count;
        *index = new_index;
        state.select(Some(new_index));
    }

    pub fn previous_item(&mut self) {
        let count = self.current_list_len();
        if count == 0 {
            return;
        }
        let (index, state) = if self.view_level == 0 {
            (&mut self.selected_indices[0], &mut self.category_list_state)
        } else {
            (&mut self.selected_indices[1], &mut self.tweak_list_state)
        };
        let new_index = if *index == 0 { count - 1 } else { *index - 1 };
        *index = new_index;
        state.select(Some(new_index));
    }

    pub fn handle_right_key(&mut self) {
        if self.view_level == 0 {
            if self.current_tweaks().is_empty() {
                self.set_status("This category is empty.".to_string(), 50);
                return;
            }
            self.view_level = 1;
            self.selected_indices[1] = 0;
            self.tweak_list_state = ListState::default();
            self.tweak_list_state.select(Some(0));
        }
    }

    pub fn handle_left_key(&mut self) {
        if self.view_level == 1 {
            self.view_level = 0;
        }
    }

    // ---- enabled set ------------------------------------------------------

    pub fn toggle_selected(&mut self) {
        if self.view_level == 0 {
            self.handle_right_key();
            return;
        }
        if let Some(name) = self.selected_tweak().map(|t| t.name.clone()) {
            self.config.toggle_enabled(&name);
        }
    }

    /// Resolves the persisted enabled set against the catalog and the custom
    /// store, catalog order first. Stale names resolve to nothing.
    pub fn enabled_tweaks(&self) -> Vec<TweakDefinition> {
        self.catalog
            .iter()
            .chain(self.store.tweaks().iter())
            .filter(|t| self.config.is_enabled(&t.name))
            .cloned()
            .collect()
    }

    // ---- status / confirmation / prompts ---------------------------------

    pub fn set_status(&mut self, message: String, timer: u32) {
        self.status_message = Some(message);
        self.status_timer = timer;
    }

    pub fn update_status_timer(&mut self) {
        if self.status_timer > 0 {
            self.status_timer -= 1;
            if self.status_timer == 0 {
                self.status_message = None;
            }
        }
    }

    pub fn request_apply(&mut self) {
        if self.run.is_some() {
            self.set_status("A run is already in progress.".to_string(), 50);
            return;
        }
        let enabled = self.enabled_tweaks();
        if enabled.is_empty() {
            self.set_status("No tweaks enabled. Toggle some with Enter first.".to_string(), 50);
            return;
        }
        let names: Vec<&str> = enabled.iter().map(|t| t.name.as_str()).collect();
        self.confirmation = Some((
            format!(
                "Apply {} tweak(s) [{}]? This modifies system files and cannot be undone \
                 (a restart restores them). Type 'yes' to confirm",
                enabled.len(),
                names.join(", ")
            ),
            PendingAction::ApplyRun,
        ));
        self.input_buffer.clear();
    }

    pub fn request_delete_selected(&mut self) {
        let Some((name, category)) = self
            .selected_tweak()
            .map(|t| (t.name.clone(), t.category))
        else {
            return;
        };
        if category != TweakCategory::Custom {
            self.set_status("Only custom tweaks can be deleted.".to_string(), 50);
            return;
        }
        self.confirmation = Some((
            format!("Delete custom tweak '{}'? Type 'yes' to confirm", name),
            PendingAction::DeleteTweak(name),
        ));
        self.input_buffer.clear();
    }

    pub fn handle_confirmation(&mut self, input: &str) {
        let Some((_, action)) = self.confirmation.take() else {
            return;
        };
        if input.trim().to_lowercase() != "yes" {
            self.set_status("Action canceled.".to_string(), 50);
            return;
        }
        match action {
            PendingAction::ApplyRun => self.start_run(),
            PendingAction::DeleteTweak(name) => match self.store.delete(&name) {
                Ok(()) => {
                    self.log.push(format!("[+] Deleted custom tweak: {}", name));
                    self.set_status(format!("Deleted '{}'", name), 50);
                    self.clamp_tweak_selection();
                }
                Err(err) => self.set_status(err.to_string(), 50),
            },
        }
    }

    fn clamp_tweak_selection(&mut self) {
        let count = self.current_tweaks().len();
        if count == 0 {
            self.view_level = 0;
        } else if self.selected_indices[1] >= count {
            self.selected_indices[1] = count - 1;
            self.tweak_list_state.select(Some(count - 1));
        }
    }

    pub fn start_creator(&mut self) {
        self.creator_draft = CreatorDraft::default();
        self.prompt = Some(PromptKind::CreatorName);
        self.input_buffer.clear();
    }

    pub fn start_import(&mut self) {
        self.prompt = Some(PromptKind::ImportPath);
        self.input_buffer.clear();
    }

    pub fn start_export(&mut self) {
        let Some((name, category)) = self
            .selected_tweak()
            .map(|t| (t.name.clone(), t.category))
        else {
            self.set_status("Select a custom tweak to export.".to_string(), 50);
            return;
        };
        if category != TweakCategory::Custom {
            self.set_status("Only custom tweaks can be exported.".to_string(), 50);
            return;
        }
        self.prompt = Some(PromptKind::ExportPath);
        self.input_buffer = default_export_file_name(&name);
    }

    pub fn prompt_label(&self) -> String {
        match self.prompt {
            Some(PromptKind::CreatorName) => "New tweak - name".to_string(),
            Some(PromptKind::CreatorPaths) => {
                "New tweak - paths (comma separated, absolute)".to_string()
            }
            Some(PromptKind::CreatorDescription) => "New tweak - description".to_string(),
            Some(PromptKind::ImportPath) => "Import tweak from file".to_string(),
            Some(PromptKind::ExportPath) => "Export to file".to_string(),
            None => String::new(),
        }
    }

    /// Advances the active prompt with the committed input line.
    pub fn handle_prompt_input(&mut self) {
        let input = std::mem::take(&mut self.input_buffer);
        match self.prompt {
            Some(PromptKind::CreatorName) => {
                self.creator_draft.name = input.trim().to_string();
                self.prompt = Some(PromptKind::CreatorPaths);
            }
            Some(PromptKind::CreatorPaths) => {
                self.creator_draft.paths = input;
                self.prompt = Some(PromptKind::CreatorDescription);
            }
            Some(PromptKind::CreatorDescription) => {
                self.creator_draft.description = input;
                self.prompt = None;
                self.finish_creator();
            }
            Some(PromptKind::ImportPath) => {
                self.prompt = None;
                let path = std::path::PathBuf::from(input.trim());
                match self.store.import(&path) {
                    Ok(names) => {
                        for name in &names {
                            self.log.push(format!("[+] Successfully imported tweak: {}", name));
                        }
                        self.set_status(format!("Imported {} tweak(s)", names.len()), 50);
                    }
                    Err(err) => {
                        self.log.push(format!("[!] Error importing tweak: {}", err));
                        self.set_status(format!("Import failed: {}", err), 80);
                    }
                }
            }
            Some(PromptKind::ExportPath) => {
                self.prompt = None;
                let Some(name) = self.selected_tweak().map(|t| t.name.clone()) else {
                    return;
                };
                let dest = std::path::PathBuf::from(input.trim());
                match self.store.export(&name, &dest) {
                    Ok(()) => {
                        self.log
                            .push(format!("[+] Exported tweak: {} to {}", name, dest.display()));
                        self.set_status(format!("Exported to {}", dest.display()), 50);
                    }
                    Err(err) => {
                        self.log.push(format!("[!] Error exporting tweak: {}", err));
                        self.set_status(format!("Export failed: {}", err), 80);
                    }
                }
            }
            None => {}
        }
    }

    pub fn cancel_prompt(&mut self) {
        self.prompt = None;
        self.input_buffer.clear();
    }

    fn finish_creator(&mut self) {
        let draft = std::mem::take(&mut self.creator_draft);
        let paths: Vec<String> = draft
            .paths
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        let tweak = TweakDefinition::new(
            "wrench.fill",
            &draft.name,
            paths,
            &draft.description,
            TweakCategory::Custom,
        );
        match self.store.add(tweak) {
            Ok(()) => {
                self.log
                    .push(format!("[+] Added new custom tweak: {}", draft.name));
                self.set_status(
                    format!("Custom tweak '{}' created successfully!", draft.name),
                    50,
                );
            }
            Err(err) => self.set_status(err.to_string(), 80),
        }
    }

    // ---- batch run --------------------------------------------------------

    pub fn run_in_progress(&self) -> bool {
        self.run.is_some()
    }

    fn start_run(&mut self) {
        let tweaks = self.enabled_tweaks();
        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let applier = Arc::clone(&self.applier);
        let worker_cancel = Arc::clone(&cancel);

        let handle = std::thread::spawn(move || {
            BatchRunner::new(applier.as_ref(), worker_cancel).run(&tweaks, &tx);
        });

        self.run = Some(ActiveRun {
            rx,
            cancel,
            handle: Some(handle),
        });
        self.has_error = false;
        self.last_report = None;
        self.progress_text = "Running exploit...".to_string();
        self.show_terminal = true;
        self.terminal_scroll = 0;
    }

    pub fn cancel_run(&mut self) {
        if let Some(run) = &self.run {
            run.cancel.store(true, Ordering::SeqCst);
            self.set_status("Cancelling after the current path...".to_string(), 50);
        }
    }

    /// Called once per UI tick: ages the status line and drains worker and
    /// update-check channels.
    pub fn tick(&mut self) {
        self.update_status_timer();

        if let Some(rx) = &self.update_rx {
            if let Ok(result) = rx.try_recv() {
                self.update_notice = result;
                self.update_rx = None;
                if let Some(update) = &self.update_notice {
                    self.log.push(format!(
                        "[+] Update available: {} (released {})",
                        update.latest_version, update.release_date
                    ));
                }
            }
        }

        let mut events = Vec::new();
        if let Some(run) = &mut self.run {
            while let Ok(event) = run.rx.try_recv() {
                events.push(event);
            }
        }
        for event in events {
            match event {
                BatchEvent::Log(line) => self.log.push(line),
                BatchEvent::Progress(_, text) => self.progress_text = text,
                BatchEvent::Finished(report) => self.finish_run(report),
            }
        }
    }

    fn finish_run(&mut self, report: RunReport) {
        if let Some(mut run) = self.run.take() {
            if let Some(handle) = run.handle.take() {
                let _ = handle.join();
            }
        }
        self.has_error = report.outcome == RunOutcome::Failed;
        self.progress_text = report.summary();
        self.set_status(report.summary(), 80);
        self.last_report = Some(report);
    }

    // ---- auxiliary views ----------------------------------------------------

    pub fn toggle_terminal(&mut self) {
        self.show_terminal = !self.show_terminal;
        self.terminal_scroll = 0;
    }

    pub fn open_browser(&mut self) {
        self.browser = Some(FileBrowser::open("/"));
        self.browser_list_state = ListState::default();
        self.browser_list_state.select(Some(0));
    }

    pub fn close_browser(&mut self) {
        self.browser = None;
    }

    pub fn dismiss_update_notice(&mut self) {
        self.update_notice = None;
    }
}

/// File name an exported tweak defaults to, with separators and other
/// unfriendly characters flattened.
pub fn default_export_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' => '_',
            other => other,
        })
        .collect();
    format!("{}.json", sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TweakCatalog;
    use crate::runner::testing::FakeApplier;
    use tempfile::tempdir;

    fn test_app(dir: &std::path::Path) -> App {
        let config = Config::load_from(dir.join("config.json"));
        let store = CustomTweakStore::open(dir.join("custom_tweaks.json"));
        App::new(
            config,
            TweakCatalog::default_tweaks(),
            store,
            TerminalLog::new(),
            Arc::new(FakeApplier::new(&[])),
        )
    }

    #[test]
    fn stale_enabled_names_are_ignored() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.config.enabled_tweaks = vec![
            "Hide the Dock".to_string(),
            "No Longer Exists".to_string(),
        ];
        let enabled = app.enabled_tweaks();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "Hide the Dock");
    }

    #[test]
    fn enabled_set_merges_catalog_and_custom_store() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.store
            .add(TweakDefinition::new(
                "gear",
                "My Tweak",
                vec!["/tmp/x".to_string()],
                "",
                TweakCategory::Custom,
            ))
            .unwrap();
        app.config.enabled_tweaks =
            vec!["My Tweak".to_string(), "Hide the Home Bar".to_string()];
        let names: Vec<String> = app.enabled_tweaks().into_iter().map(|t| t.name).collect();
        // Catalog order first, then store order.
        assert_eq!(names, vec!["Hide the Home Bar", "My Tweak"]);
    }

    #[test]
    fn creator_flow_builds_and_stores_a_tweak() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());

        app.start_creator();
        app.input_buffer = "My Tweak".to_string();
        app.handle_prompt_input();
        assert_eq!(app.prompt, Some(PromptKind::CreatorPaths));

        app.input_buffer = "/tmp/a, /tmp/b , ".to_string();
        app.handle_prompt_input();
        app.input_buffer = "does things".to_string();
        app.handle_prompt_input();

        assert_eq!(app.prompt, None);
        let stored = app.store.get("My Tweak").unwrap();
        assert_eq!(stored.paths, vec!["/tmp/a", "/tmp/b"]);
        assert_eq!(stored.category, TweakCategory::Custom);
    }

    #[test]
    fn creator_rejects_empty_paths() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.start_creator();
        app.input_buffer = "My Tweak".to_string();
        app.handle_prompt_input();
        app.input_buffer = " , ,".to_string();
        app.handle_prompt_input();
        app.handle_prompt_input(); // empty description

        assert!(app.store.get("My Tweak").is_none());
        assert!(app.status_message.is_some());
    }

    #[test]
    fn apply_requires_enabled_tweaks() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.request_apply();
        assert!(app.confirmation.is_none());
        assert!(app.status_message.unwrap().contains("No tweaks enabled"));
    }

    #[test]
    fn confirmed_run_drives_batch_to_completion() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.config.enabled_tweaks = vec!["Hide the Home Bar".to_string()];

        app.request_apply();
        assert!(app.confirmation.is_some());
        app.handle_confirmation("yes");
        assert!(app.run_in_progress());

        // Pacing delays cap a single one-path run well under this bound.
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while app.run_in_progress() && std::time::Instant::now() < deadline {
            app.tick();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        let report = app.last_report.expect("run finished");
        assert_eq!(report.outcome, RunOutcome::Success);
        assert_eq!(report.applied, 1);
    }

    #[test]
    fn declined_confirmation_does_nothing() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.config.enabled_tweaks = vec!["Hide the Dock".to_string()];
        app.request_apply();
        app.handle_confirmation("no");
        assert!(!app.run_in_progress());
        assert_eq!(app.status_message.as_deref(), Some("Action canceled."));
    }

    #[test]
    fn export_file_names_are_sanitized() {
        assert_eq!(
            default_export_file_name("Hide the Dock"),
            "Hide_the_Dock.json"
        );
        assert_eq!(default_export_file_name("a/b:c"), "a_b_c.json");
    }
}
