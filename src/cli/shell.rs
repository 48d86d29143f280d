use std::{
    borrow::Cow,
    io::{self, BufRead},
};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};
use shell_words::split;

use crate::cli::commands::CommandError;
use crate::cli::context::{CliMode, LoopControl, ShellContext};
use crate::cli::output;
use crate::errors::CliError;
use crate::flows::FLOW_NAMES;

/// Setting this variable switches the shell to reading commands from stdin.
pub const SCRIPT_ENV_VAR: &str = "WIZARD_CORE_CLI_SCRIPT";

pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV_VAR).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;

    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(CommandHelper::new(context)));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);

    output::info(format!(
        "Wizard shell ready ({}). Type `help` for commands.",
        context.flow()
    ));

    while context.running {
        if let Some(helper) = editor.helper_mut() {
            helper.refresh_fields(context);
        }
        match editor.readline(&context.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                editor.add_history_entry(trimmed).ok();
                run_line(context, trimmed);
            }
            Err(ReadlineError::Interrupted) => {
                if context.confirm_exit()? {
                    break;
                }
            }
            Err(ReadlineError::Eof) => {
                output::info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        run_line(context, trimmed);
        if !context.running {
            break;
        }
    }
    Ok(())
}

fn run_line(context: &mut ShellContext, line: &str) {
    match handle_line(context, line) {
        Ok(LoopControl::Continue) => {}
        Ok(LoopControl::Exit) => context.running = false,
        Err(err) => context.report_error(err),
    }
}

fn handle_line(context: &mut ShellContext, line: &str) -> Result<LoopControl, CommandError> {
    let tokens = match split(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            output::warning(format!("Could not parse input: {}", err));
            return Ok(LoopControl::Continue);
        }
    };
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };

    let command = raw.to_lowercase();
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    context.dispatch(&command, raw, &args)
}

/// Completes command names first, then flow or field names depending on
/// the command.
struct CommandHelper {
    commands: Vec<String>,
    fields: Vec<String>,
}

impl CommandHelper {
    fn new(context: &ShellContext) -> Self {
        let mut commands: Vec<String> = context
            .registry
            .names()
            .map(|name| name.to_ascii_lowercase())
            .collect();
        commands.sort();
        commands.dedup();
        let mut helper = Self {
            commands,
            fields: Vec::new(),
        };
        helper.refresh_fields(context);
        helper
    }

    fn refresh_fields(&mut self, context: &ShellContext) {
        let session = context.session().blocking_lock();
        self.fields = session
            .definition()
            .fields()
            .filter(|field| field.is_editable())
            .map(|field| field.key.to_string())
            .collect();
    }

    fn candidates(&self, command: Option<&str>) -> Vec<&str> {
        match command {
            None => self.commands.iter().map(String::as_str).collect(),
            Some("set") | Some("strength") => self.fields.iter().map(String::as_str).collect(),
            Some("start") => FLOW_NAMES.to_vec(),
            Some("help") => self.commands.iter().map(String::as_str).collect(),
            Some(_) => Vec::new(),
        }
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let start = prefix
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);

        let words: Vec<&str> = prefix[..start].split_whitespace().collect();
        let command = match words.as_slice() {
            [] => None,
            [command] => Some(command.to_ascii_lowercase()),
            _ => return Ok((start, Vec::new())),
        };

        let needle = prefix[start..].to_ascii_lowercase();
        let candidates = self
            .candidates(command.as_deref())
            .into_iter()
            .filter(|name| name.starts_with(&needle))
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }
}

impl Validator for CommandHelper {}
