//! Interactive confirmation on the terminal

use gitsource_common::Error;
use gitsource_provision::Confirm;
use inquire::InquireError;

/// Asks on the terminal, defaulting to "no"
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleConfirm;

impl Confirm for ConsoleConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool, Error> {
        let answer = inquire::Confirm::new(prompt)
            .with_default(false)
            .with_help_message("The source cannot be fetched until the key is registered")
            .prompt();
        interpret(answer)
    }
}

fn interpret(answer: Result<bool, InquireError>) -> Result<bool, Error> {
    match answer {
        Ok(answer) => Ok(answer),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
        Err(InquireError::NotTTY) => Err(Error::invalid_selection_for(
            "--yes",
            "confirmation needs an interactive terminal, pass --yes to skip it",
        )),
        Err(e) => Err(Error::internal_with_context(
            "confirm",
            format!("failed to read confirmation: {e}"),
        )),
    }
}
