//! Shell commands operating on the active wizard.

use std::io;

use strsim::levenshtein;

use crate::cli::context::{CliMode, ShellContext};
use crate::cli::help;
use crate::cli::io as cli_io;
use crate::cli::output;
use crate::cli::registry::{CommandEntry, CommandRegistry};
use crate::errors::{CliError, WizardError};
use crate::flows::{self, USE_SUGGESTION_FIELD};
use crate::utils::build_info;
use crate::wizard::{
    FieldDescriptor, FieldKind, PasswordStrength, StepOutcome, SubmitOutcome, ValidationResult,
    VerifyOutcome, WizardSession,
};

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        CliError::Command(err.to_string())
    }
}

pub fn register_all(registry: &mut CommandRegistry) {
    for entry in [
        CommandEntry::new("help", "Show available commands", "help [command]", cmd_help),
        CommandEntry::new("flows", "List the available wizards", "flows", cmd_flows),
        CommandEntry::new("start", "Start a wizard from step 1", "start <flow>", cmd_start),
        CommandEntry::new("show", "Show the current step", "show", cmd_show),
        CommandEntry::new("summary", "Show every field entered so far", "summary", cmd_summary),
        CommandEntry::new("set", "Set a field value", "set <field> <value>", cmd_set),
        CommandEntry::new("fill", "Fill the current step interactively", "fill", cmd_fill),
        CommandEntry::new("next", "Validate and go to the next step", "next", cmd_next),
        CommandEntry::new("back", "Go to the previous step", "back", cmd_back),
        CommandEntry::new("verify", "Run the current step's lookup", "verify", cmd_verify),
        CommandEntry::new("suggest", "Generate a strong password", "suggest", cmd_suggest),
        CommandEntry::new(
            "accept-suggestion",
            "Use the generated password",
            "accept-suggestion",
            cmd_accept_suggestion,
        ),
        CommandEntry::new(
            "strength",
            "Show the strength of a password field",
            "strength [field]",
            cmd_strength,
        ),
        CommandEntry::new("submit", "Submit the wizard", "submit", cmd_submit),
        CommandEntry::new("reset", "Clear every field and restart", "reset", cmd_reset),
        CommandEntry::new("version", "Show build information", "version", cmd_version),
        CommandEntry::new("exit", "Leave the shell", "exit", cmd_exit),
    ] {
        registry.register(entry);
    }
    registry.alias("quit", "exit");
    registry.alias("prev", "back");
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first() {
        None => help::print_overview(&context.registry),
        Some(name) => {
            let entry = context.registry.get(name).ok_or_else(|| {
                CommandError::InvalidArguments(format!("Unknown command `{}`", name))
            })?;
            help::print_command(entry);
        }
    }
    Ok(())
}

fn cmd_flows(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    output::section("Wizards");
    for name in flows::FLOW_NAMES {
        let marker = if name == context.flow() { "*" } else { " " };
        output::line(format!("  {} {}", marker, name));
    }
    Ok(())
}

fn cmd_start(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = single_arg(args, "start <flow>")?;
    context.start_flow(name)?;
    output::success(format!("Started `{}`.", name));
    cmd_show(context, &[])
}

fn cmd_show(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let session = context.session().blocking_lock();
    print_step(&session);
    Ok(())
}

fn cmd_summary(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let session = context.session().blocking_lock();
    output::section(format!("Summary: {}", context.flow()));
    for line in session.summary() {
        output::line(format!("  [{}] {:<36} {}", line.step, line.label, line.value));
    }
    Ok(())
}

fn cmd_set(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (field, value) = match args {
        [field, rest @ ..] if !rest.is_empty() => (*field, rest.join(" ")),
        _ => {
            return Err(CommandError::InvalidArguments(
                "usage: set <field> <value>".into(),
            ))
        }
    };
    let mut session = context.session().blocking_lock();
    match session.update(field, value) {
        Ok(()) => {
            let echo = session
                .definition()
                .descriptor(field)
                .map(|descriptor| session.display_value(descriptor))
                .unwrap_or_default();
            output::success(format!("{} = {}", field, echo));
            Ok(())
        }
        Err(WizardError::UnknownField(name)) => {
            output::warning(format!("Unknown field `{}`.", name));
            if let Some(best) = closest_field(&session, &name) {
                output::hint(format!("Did you mean `{}`?", best));
            }
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn cmd_fill(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    if context.mode == CliMode::Script {
        return Err(CommandError::InvalidArguments(
            "`fill` needs an interactive terminal; use `set <field> <value>`".into(),
        ));
    }
    let fields: Vec<(FieldDescriptor, String)> = {
        let session = context.session().blocking_lock();
        session
            .step()
            .fields
            .iter()
            .filter(|field| field.is_editable())
            .map(|field| (field.clone(), session.fields().text(field.key).to_string()))
            .collect()
    };

    for (field, current) in fields {
        let prompt = match field.help {
            Some(help) => format!("{} ({})", field.label, help),
            None => field.label.to_string(),
        };
        let raw = match &field.kind {
            FieldKind::Checkbox => {
                let checked = context.session().blocking_lock().fields().flag(field.key);
                cli_io::confirm_action(&context.theme, &prompt, checked)?.to_string()
            }
            FieldKind::Secret => cli_io::prompt_secret(&context.theme, &prompt)?,
            FieldKind::Choice(options) => {
                cli_io::prompt_choice(&context.theme, &prompt, options, &current)?
            }
            FieldKind::Text | FieldKind::Number => {
                cli_io::prompt_text(&context.theme, &prompt, &current)?
            }
        };
        context.session().blocking_lock().update(field.key, raw)?;
    }
    cmd_show(context, &[])
}

fn cmd_next(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let mut session = context.session().blocking_lock();
    let outcome = session.go_to_next();
    report_navigation(&session, outcome);
    Ok(())
}

fn cmd_back(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let mut session = context.session().blocking_lock();
    let outcome = session.go_to_previous();
    report_navigation(&session, outcome);
    Ok(())
}

fn cmd_verify(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let outcome = context.block_on(context.gate().verify(context.session()))?;
    let session = context.session().blocking_lock();
    match outcome {
        VerifyOutcome::Verified => {
            output::success("Verification succeeded.");
            print_step(&session);
        }
        VerifyOutcome::Invalid(result) => report_validation(&session, &result),
        VerifyOutcome::Rejected(_) => {
            output::hint("Check the details and run `verify` again.");
        }
        VerifyOutcome::Discarded => {
            output::warning("The verification result arrived too late and was ignored.");
        }
    }
    Ok(())
}

fn cmd_suggest(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let quotas = context.config.suggestion.clone();
    let mut session = context.session().blocking_lock();
    let suggestion = session.suggest_password(&mut rand::thread_rng(), &quotas)?;
    output::info(format!("Suggested password: {}", suggestion));
    output::hint("Run `accept-suggestion` to use it.");
    Ok(())
}

fn cmd_accept_suggestion(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let mut session = context.session().blocking_lock();
    let slot = session
        .step()
        .suggestion_slot
        .ok_or(WizardError::NoSuggestionSlot {
            step: session.current_step(),
        })?;
    if session.fields().is_blank(slot) {
        return Err(CommandError::Message(
            "No password has been suggested yet. Run `suggest` first.".into(),
        ));
    }
    session.update(USE_SUGGESTION_FIELD, true)?;
    output::success("Suggested password applied.");
    Ok(())
}

fn cmd_strength(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let session = context.session().blocking_lock();
    let field = match args.first() {
        Some(field) => (*field).to_string(),
        None => session
            .step()
            .fields
            .iter()
            .find(|field| field.kind == FieldKind::Secret && field.is_editable())
            .map(|field| field.key.to_string())
            .ok_or_else(|| {
                CommandError::InvalidArguments(
                    "this step has no password field; usage: strength <field>".into(),
                )
            })?,
    };
    if session.definition().descriptor(&field).is_none() {
        return Err(WizardError::UnknownField(field).into());
    }
    output::info(format!("{}: {}", field, describe_strength(&session.strength(&field))));
    Ok(())
}

fn cmd_submit(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let outcome = context.block_on(context.gate().submit(context.session()));
    match outcome {
        SubmitOutcome::Submitted { .. } => {
            context.block_on(context.gate().timers().settle());
            if let Some(destination) = context.navigator().take_destination() {
                output::hint(format!(
                    "Arrived at {}. Use `start <flow>` to begin another wizard.",
                    destination
                ));
            }
        }
        SubmitOutcome::Invalid(result) => {
            let session = context.session().blocking_lock();
            report_validation(&session, &result);
        }
        SubmitOutcome::AlreadyPending => output::warning("A submission is already in progress."),
        SubmitOutcome::NotOnFinalStep => {
            output::warning("Complete the remaining steps before submitting.")
        }
        SubmitOutcome::Inactive => {
            output::warning("This wizard is finished. Use `start <flow>` to begin again.")
        }
        SubmitOutcome::Failed(_) => output::hint("Fix the details and submit again."),
    }
    Ok(())
}

fn cmd_reset(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    context.session().blocking_lock().reset()?;
    output::success("Wizard reset to step 1.");
    Ok(())
}

fn cmd_version(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    output::info(build_info::current().summary());
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    output::info("Goodbye.");
    Err(CommandError::ExitRequested)
}

fn single_arg<'a>(args: &[&'a str], usage: &str) -> Result<&'a str, CommandError> {
    match args {
        [value] => Ok(value),
        _ => Err(CommandError::InvalidArguments(format!("usage: {}", usage))),
    }
}

fn print_step(session: &WizardSession) {
    output::section(session.progress());
    for field in session.step().fields.iter().filter(|field| field.is_visible()) {
        let marker = if session.field_errors().contains(field.key) {
            "!"
        } else {
            " "
        };
        let access = if field.is_editable() { "" } else { " (read-only)" };
        output::line(format!(
            "  {} {:<18} {:<36} {}{}",
            marker,
            field.key,
            field.label,
            session.display_value(field),
            access
        ));
    }
    if let Some(message) = session.global_error() {
        output::error(message);
    }
    if session.step().verification.is_some() {
        output::hint("Run `verify` to look up these details.");
    }
    if session.step().suggestion_slot.is_some() {
        output::hint("Run `suggest` for a strong password.");
    }
    if session.is_last_step() {
        let control = session.submit_control();
        let state = if control.enabled { "ready" } else { "disabled" };
        output::hint(format!("[{}] {}", control.label, state));
    }
}

fn report_navigation(session: &WizardSession, outcome: StepOutcome) {
    match outcome {
        StepOutcome::Moved { .. } => print_step(session),
        StepOutcome::Blocked(result) => report_validation(session, &result),
        StepOutcome::AtLastStep => {
            output::info("This is the final step. Run `submit` to finish.");
        }
        StepOutcome::AtFirstStep => output::info("Already on the first step."),
        StepOutcome::Busy => output::warning("Please wait for the submission to finish."),
        StepOutcome::Inactive => {
            output::warning("This wizard is finished. Use `start <flow>` to begin again.")
        }
    }
}

fn report_validation(session: &WizardSession, result: &ValidationResult) {
    if let Some(message) = &result.message {
        output::error(message);
    }
    for key in result.field_errors.iter() {
        let label = session
            .definition()
            .descriptor(key)
            .map(|field| field.label)
            .unwrap_or(key);
        output::line(format!("  ! {}", label));
    }
}

fn describe_strength(strength: &PasswordStrength) -> String {
    let filled = usize::from(strength.width_percent()) / 10;
    format!(
        "{} ({}/5) [{}{}] {}",
        strength.label(),
        strength.score,
        "#".repeat(filled),
        ".".repeat(10 - filled),
        strength.color()
    )
}

fn closest_field<'a>(session: &'a WizardSession, input: &str) -> Option<&'a str> {
    session
        .definition()
        .fields()
        .filter(|field| field.is_editable())
        .map(|field| (levenshtein(field.key, input), field.key))
        .filter(|(distance, _)| *distance <= 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, key)| key)
}
