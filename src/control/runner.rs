//! Drives the control loop state machine against real endpoints and a console

use crate::config::ProfileStore;
use crate::connection::{ConnectionManager, Connector, Verification};
use crate::control::state::{transition, Event, KeyInput, MenuOption, State};
use crate::control::Console;
use crate::migration::{CopyOutcome, CopyReport, MigrationEngine};
use crate::Result;
use std::path::Path;
use tracing::{error, info};

const KEY_PROMPT: &str = "\nEnter the key to copy (or 'exit' to quit): ";
const MENU_PROMPT: &str = "\nChoose option (1-3): ";
const PATH_PROMPT: &str = "Enter path to configuration file: ";

const RECOVERY_MENU: &str = "\n=== Redis Connection Failed ===\n\
Unable to connect to one or more Redis databases with current configuration.\n\
\n\
Options:\n\
1. Provide path to configuration file\n\
2. Show help\n\
3. Exit application";

pub struct ControlLoop<C: Connector, T: Console> {
    profiles: ProfileStore,
    manager: ConnectionManager<C>,
    console: T,
    single_key: Option<String>,
    help: String,
    outcomes: Vec<(String, CopyOutcome)>,
}

impl<C: Connector, T: Console> ControlLoop<C, T> {
    pub fn new(profiles: ProfileStore, connector: C, console: T, help: String) -> Self {
        ControlLoop {
            profiles,
            manager: ConnectionManager::new(connector),
            console,
            single_key: None,
            help,
            outcomes: Vec::new(),
        }
    }

    /// Copy just this key once connected, then exit.
    pub fn with_single_key(mut self, key: Option<String>) -> Self {
        self.single_key = key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Every copy attempted so far, in order.
    pub fn outcomes(&self) -> &[(String, CopyOutcome)] {
        &self.outcomes
    }

    pub fn console(&self) -> &T {
        &self.console
    }

    /// Run until the operator exits (or input ends).
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting Redis copier control loop");
        let mut state = State::Start;

        while state != State::Exit {
            let event = self.act(&state).await?;
            state = transition(&state, event, self.single_key.as_deref());
        }

        self.manager.disconnect();
        info!("Control loop finished after {} copies", self.outcomes.len());
        Ok(())
    }

    async fn act(&mut self, state: &State) -> Result<Event> {
        let event = match state {
            State::Start => Event::Begin,
            State::ConnectionCheck => {
                if self.check_connections(true).await.is_ok() {
                    Event::Verified
                } else {
                    Event::Unreachable
                }
            }
            State::RecoveryMenu => {
                self.console.say(RECOVERY_MENU);
                match self.console.read_line(MENU_PROMPT)? {
                    None => Event::InputClosed,
                    Some(choice) => {
                        match MenuOption::parse(&choice) {
                            Some(MenuOption::Exit) => {
                                self.console.say("Application terminated by user.")
                            }
                            None => self
                                .console
                                .say("Invalid option. Please choose 1, 2, or 3."),
                            Some(_) => {}
                        }
                        Event::MenuChoice(choice)
                    }
                }
            }
            State::Reloading => match self.console.read_line(PATH_PROMPT)? {
                None => Event::InputClosed,
                Some(path) => self.reload(path.trim()),
            },
            State::Help => {
                self.console.say(&self.help);
                Event::HelpShown
            }
            State::InteractiveCopy => match self.console.read_line(KEY_PROMPT)? {
                None => Event::InputClosed,
                Some(input) => {
                    match KeyInput::parse(&input) {
                        KeyInput::Exit => info!("Application terminated by user."),
                        KeyInput::Empty => self.console.say("Please enter a valid key."),
                        KeyInput::Key(_) => {}
                    }
                    Event::KeyEntered(input)
                }
            },
            State::Copying { key, .. } => {
                self.copy_key(key).await;
                Event::CopyFinished
            }
            State::Exit => Event::InputClosed,
        };

        Ok(event)
    }

    /// Rebuild and probe both endpoints, optionally printing a status line per endpoint.
    pub async fn check_connections(&mut self, announce: bool) -> Verification {
        if announce {
            self.console.say("Testing Redis connections...");
        }

        let verification = self.manager.verify(&self.profiles).await;

        if announce {
            for status in verification.statuses() {
                if status.is_connected() {
                    self.console.say(&status.to_string());
                } else {
                    self.console.complain(&status.to_string());
                }
            }
        }
        verification
    }

    fn reload(&mut self, path: &str) -> Event {
        if path.is_empty() {
            self.console.say("No configuration file path provided.");
            return Event::ReloadFailed;
        }

        match self.profiles.reload(Path::new(path)) {
            Ok(()) => {
                self.console
                    .say(&format!("✓ External configuration loaded from: {}", path));
                Event::Reloaded
            }
            Err(e) => {
                error!("Error loading external configuration: {}", e);
                self.console.complain(&e.to_string());
                Event::ReloadFailed
            }
        }
    }

    /// Copy one key over freshly built handles and report the outcome.
    pub async fn copy_key(&mut self, key: &str) -> CopyOutcome {
        let verification = self.check_connections(false).await;

        let outcome = match self.manager.endpoints() {
            Some((source, destination)) if verification.is_ok() => {
                MigrationEngine::copy(source, destination, key).await
            }
            _ => CopyOutcome::Failed(verification.failure_summary()),
        };

        let report = CopyReport {
            key,
            outcome: &outcome,
        }
        .to_string();
        match outcome {
            CopyOutcome::Failed(_) => self.console.complain(&report),
            _ => self.console.say(&report),
        }

        self.outcomes.push((key.to_string(), outcome.clone()));
        outcome
    }
}
