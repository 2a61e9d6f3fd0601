//! Interactive answers for the preparation phase.

use dialoguer::Input;
use icsport_core::identity::is_valid_email;
use icsport_core::{IcsPortError, IcsPortResult, Prompter};
use owo_colors::OwoColorize;

pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn email_for_address(&mut self, raw_address: &str) -> IcsPortResult<Option<String>> {
        println!("\n  '{}' is not a valid email address.", raw_address.yellow());
        ask_email("  Correct address? (skip)")
    }

    fn email_for_name(&mut self, name: &str) -> IcsPortResult<Option<String>> {
        println!("\n  {} has no email address.", name.yellow());
        ask_email("  Email? (skip)")
    }
}

/// Ask until the answer is empty (skip) or a valid address.
fn ask_email(prompt: &str) -> IcsPortResult<Option<String>> {
    loop {
        let input: String = Input::new()
            .with_prompt(prompt)
            .default(String::new())
            .show_default(false)
            .interact_text()
            .map_err(|e| IcsPortError::Prompt(e.to_string()))?;

        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }
        if is_valid_email(input) {
            return Ok(Some(input.to_string()));
        }
        eprintln!("  {}", format!("'{}' doesn't look like an email address", input).red());
    }
}
