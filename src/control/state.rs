//! States and transitions of the interactive control loop
//!
//! Each state tells the runner what to do next; the result of doing it comes
//! back as an [`Event`]. [`transition`] is pure so the flow can be checked
//! without a terminal.

/// Where the control loop is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Start,
    /// Build and probe both endpoints.
    ConnectionCheck,
    /// Offer reload / help / exit after a failed connection check.
    RecoveryMenu,
    /// Ask for a properties file and reload the profiles from it.
    Reloading,
    Help,
    /// Ask the operator for the next key.
    InteractiveCopy,
    /// Copy `key`; `last` means exit afterwards (single-shot mode).
    Copying { key: String, last: bool },
    Exit,
}

/// What happened while the runner acted on a state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Begin,
    Verified,
    Unreachable,
    MenuChoice(String),
    Reloaded,
    ReloadFailed,
    HelpShown,
    KeyEntered(String),
    CopyFinished,
    /// Standard input reached end of file.
    InputClosed,
}

/// Recovery menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    Reload,
    Help,
    Exit,
}

impl MenuOption {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuOption::Reload),
            "2" => Some(MenuOption::Help),
            "3" => Some(MenuOption::Exit),
            _ => None,
        }
    }
}

/// What an operator's line means at the key prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    Exit,
    Empty,
    Key(String),
}

impl KeyInput {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            KeyInput::Exit
        } else if trimmed.is_empty() {
            KeyInput::Empty
        } else {
            KeyInput::Key(trimmed.to_string())
        }
    }
}

/// Next state after `event` occurred in `state`.
///
/// `single_key` is the key given on the command line, if any. Pairs that make
/// no sense leave the state unchanged.
pub fn transition(state: &State, event: Event, single_key: Option<&str>) -> State {
    match (state, event) {
        (State::Exit, _) => State::Exit,
        (_, Event::InputClosed) => State::Exit,

        (State::Start, Event::Begin) => State::ConnectionCheck,

        (State::ConnectionCheck, Event::Verified) => match single_key {
            Some(key) => State::Copying {
                key: key.to_string(),
                last: true,
            },
            None => State::InteractiveCopy,
        },
        (State::ConnectionCheck, Event::Unreachable) => State::RecoveryMenu,

        (State::RecoveryMenu, Event::MenuChoice(choice)) => match MenuOption::parse(&choice) {
            Some(MenuOption::Reload) => State::Reloading,
            Some(MenuOption::Help) => State::Help,
            Some(MenuOption::Exit) => State::Exit,
            None => State::RecoveryMenu,
        },

        (State::Reloading, Event::Reloaded) => State::ConnectionCheck,
        (State::Reloading, Event::ReloadFailed) => State::RecoveryMenu,

        (State::Help, Event::HelpShown) => State::RecoveryMenu,

        (State::InteractiveCopy, Event::KeyEntered(input)) => match KeyInput::parse(&input) {
            KeyInput::Exit => State::Exit,
            KeyInput::Empty => State::InteractiveCopy,
            KeyInput::Key(key) => State::Copying { key, last: false },
        },

        (State::Copying { last: true, .. }, Event::CopyFinished) => State::Exit,
        (State::Copying { last: false, .. }, Event::CopyFinished) => State::InteractiveCopy,

        (current, _) => current.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(state: State, event: Event) -> State {
        transition(&state, event, None)
    }

    #[test]
    fn start_goes_to_connection_check() {
        assert_eq!(step(State::Start, Event::Begin), State::ConnectionCheck);
    }

    #[test]
    fn verified_enters_interactive_copy() {
        assert_eq!(step(State::ConnectionCheck, Event::Verified), State::InteractiveCopy);
    }

    #[test]
    fn verified_in_single_shot_copies_then_exits() {
        let copying = transition(&State::ConnectionCheck, Event::Verified, Some("user:1001"));
        assert_eq!(
            copying,
            State::Copying {
                key: "user:1001".to_string(),
                last: true
            }
        );
        assert_eq!(
            transition(&copying, Event::CopyFinished, Some("user:1001")),
            State::Exit
        );
    }

    #[test]
    fn unreachable_enters_recovery_menu() {
        assert_eq!(step(State::ConnectionCheck, Event::Unreachable), State::RecoveryMenu);
    }

    #[test]
    fn menu_choices() {
        let choose = |c: &str| step(State::RecoveryMenu, Event::MenuChoice(c.to_string()));

        assert_eq!(choose("1"), State::Reloading);
        assert_eq!(choose(" 2 "), State::Help);
        assert_eq!(choose("3"), State::Exit);
        assert_eq!(choose("4"), State::RecoveryMenu);
        assert_eq!(choose(""), State::RecoveryMenu);
    }

    #[test]
    fn reload_outcomes() {
        assert_eq!(step(State::Reloading, Event::Reloaded), State::ConnectionCheck);
        assert_eq!(step(State::Reloading, Event::ReloadFailed), State::RecoveryMenu);
    }

    #[test]
    fn help_returns_to_menu() {
        assert_eq!(step(State::Help, Event::HelpShown), State::RecoveryMenu);
    }

    #[test]
    fn recovery_has_no_retry_limit() {
        let mut state = State::ConnectionCheck;
        for _ in 0..50 {
            state = step(state, Event::Unreachable);
            state = step(state, Event::MenuChoice("1".to_string()));
            state = step(state, Event::Reloaded);
        }
        assert_eq!(state, State::ConnectionCheck);
    }

    #[test]
    fn key_prompt_inputs() {
        let enter = |s: &str| step(State::InteractiveCopy, Event::KeyEntered(s.to_string()));

        assert_eq!(enter("EXIT"), State::Exit);
        assert_eq!(enter("  exit "), State::Exit);
        assert_eq!(enter("   "), State::InteractiveCopy);
        assert_eq!(
            enter(" user:1001 "),
            State::Copying {
                key: "user:1001".to_string(),
                last: false
            }
        );
    }

    #[test]
    fn interactive_copy_loops_back() {
        let copying = State::Copying {
            key: "k".to_string(),
            last: false,
        };
        assert_eq!(step(copying, Event::CopyFinished), State::InteractiveCopy);
    }

    #[test]
    fn end_of_input_exits_from_anywhere() {
        for state in [State::RecoveryMenu, State::Reloading, State::InteractiveCopy] {
            assert_eq!(step(state, Event::InputClosed), State::Exit);
        }
    }

    #[test]
    fn mismatched_events_do_not_move() {
        assert_eq!(step(State::InteractiveCopy, Event::Verified), State::InteractiveCopy);
        assert_eq!(step(State::RecoveryMenu, Event::CopyFinished), State::RecoveryMenu);
        assert_eq!(step(State::Exit, Event::Begin), State::Exit);
    }

    #[test]
    fn key_input_parsing() {
        assert_eq!(KeyInput::parse("Exit"), KeyInput::Exit);
        assert_eq!(KeyInput::parse(""), KeyInput::Empty);
        assert_eq!(KeyInput::parse(" a b "), KeyInput::Key("a b".to_string()));
        assert_eq!(MenuOption::parse("3"), Some(MenuOption::Exit));
        assert_eq!(MenuOption::parse("three"), None);
    }
}
