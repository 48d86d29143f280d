use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};

use crate::cli::commands::CommandError;

/// Prompt the user for confirmation with a yes/no question.
pub fn confirm_action(
    theme: &ColorfulTheme,
    prompt: &str,
    default: bool,
) -> Result<bool, CommandError> {
    Confirm::with_theme(theme)
        .with_prompt(prompt)
        .default(default)
        .interact()
        .map_err(CommandError::from)
}

/// Free-form text, pre-filled with the current value.
pub fn prompt_text(
    theme: &ColorfulTheme,
    prompt: &str,
    current: &str,
) -> Result<String, CommandError> {
    Input::<String>::with_theme(theme)
        .with_prompt(prompt)
        .with_initial_text(current)
        .allow_empty(true)
        .interact_text()
        .map_err(CommandError::from)
}

/// Hidden input for secrets.
pub fn prompt_secret(theme: &ColorfulTheme, prompt: &str) -> Result<String, CommandError> {
    Password::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()
        .map_err(CommandError::from)
}

/// Pick one of `options`; returns the chosen option.
pub fn prompt_choice(
    theme: &ColorfulTheme,
    prompt: &str,
    options: &[String],
    current: &str,
) -> Result<String, CommandError> {
    let default = options
        .iter()
        .position(|option| option == current)
        .unwrap_or(0);
    let index = Select::with_theme(theme)
        .with_prompt(prompt)
        .items(options)
        .default(default)
        .interact()
        .map_err(CommandError::from)?;
    Ok(options[index].clone())
}
