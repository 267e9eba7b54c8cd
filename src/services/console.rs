use color_eyre::eyre::{Result, WrapErr};
use dialoguer::Input;

use crate::ports::console::Console;

/// Only an explicit `y` counts as assent; anything else, including an empty line, is a no.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Console backed by stdout and the interactive terminal.
pub struct TerminalConsole;

impl Console for TerminalConsole {
    fn line(&self, text: &str) {
        println!("{}", text);
    }

    fn ask(&self, prompt: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .wrap_err("Failed to read answer from the terminal")
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        let answer = self.ask(prompt)?;
        Ok(is_affirmative(&answer))
    }
}
