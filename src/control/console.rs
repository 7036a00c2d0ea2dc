//! Terminal boundary for the control loop

use std::io::{self, BufRead, Write};

/// Line-oriented operator I/O
pub trait Console {
    /// Show `prompt` and read one line. `Ok(None)` means end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Normal output.
    fn say(&mut self, text: &str);

    /// Error output.
    fn complain(&mut self, text: &str);
}

/// Console backed by stdin / stdout / stderr
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input)? {
            0 => Ok(None), // EOF
            _ => Ok(Some(input.trim().to_string())),
        }
    }

    fn say(&mut self, text: &str) {
        println!("{}", text);
    }

    fn complain(&mut self, text: &str) {
        eprintln!("{}", text);
    }
}
