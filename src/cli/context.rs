//! Shell state: the active wizard, its submission gate and the runtime
//! driving async work.

use std::sync::Arc;

use dialoguer::theme::ColorfulTheme;
use strsim::levenshtein;
use tokio::runtime::{Builder as RuntimeBuilder, Runtime};
use tracing::info;

use crate::cli::backend::LocalBackend;
use crate::cli::commands::{self, CommandError};
use crate::cli::feedback::{ConsoleNavigator, ConsoleNotifier};
use crate::cli::io as cli_io;
use crate::cli::output;
use crate::cli::registry::CommandRegistry;
use crate::config::{ConfigManager, WizardConfig};
use crate::errors::CliError;
use crate::flows;
use crate::wizard::{share, SharedSession, SubmissionGate, WizardSession};

pub const DEFAULT_FLOW: &str = flows::settlement_bank::NAME;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub theme: ColorfulTheme,
    pub config: WizardConfig,
    pub running: bool,
    runtime: Runtime,
    gate: SubmissionGate,
    navigator: Arc<ConsoleNavigator>,
    session: SharedSession,
    flow: &'static str,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let config = ConfigManager::new()?.load()?;
        Self::with_config(mode, config)
    }

    pub fn with_config(mode: CliMode, config: WizardConfig) -> Result<Self, CliError> {
        output::set_color_enabled(config.color_enabled && mode == CliMode::Interactive);

        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let runtime = RuntimeBuilder::new_current_thread()
            .enable_time()
            .build()?;
        let navigator = Arc::new(ConsoleNavigator::default());
        let gate = SubmissionGate::new(
            Arc::new(LocalBackend::new(config.backend_latency())),
            Arc::new(ConsoleNotifier),
            navigator.clone(),
            config.redirect_delay(),
        );
        let session = share(WizardSession::new(Arc::new(flows::build(
            DEFAULT_FLOW,
            &config,
        )?)));

        Ok(Self {
            mode,
            registry,
            theme: ColorfulTheme::default(),
            config,
            running: true,
            runtime,
            gate,
            navigator,
            session,
            flow: DEFAULT_FLOW,
        })
    }

    pub fn flow(&self) -> &'static str {
        self.flow
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn gate(&self) -> &SubmissionGate {
        &self.gate
    }

    pub fn navigator(&self) -> &ConsoleNavigator {
        &self.navigator
    }

    /// Runs a future to completion on the shell's runtime.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Tears down the active wizard and starts `name` from step 1.
    pub fn start_flow(&mut self, name: &str) -> Result<(), CommandError> {
        let definition = flows::build(name, &self.config)?;
        let flow = definition.name;
        self.runtime.block_on(self.gate.teardown(&self.session));
        self.session = share(WizardSession::new(Arc::new(definition)));
        self.flow = flow;
        info!(flow, "wizard started");
        Ok(())
    }

    pub fn prompt(&self) -> String {
        let session = self.session.blocking_lock();
        format!(
            "wizard_core [{} {}/{}]> ",
            self.flow,
            session.current_step(),
            session.total_steps()
        )
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let best = self
            .registry
            .names()
            .map(|name| (levenshtein(name, input), name))
            .min_by_key(|(distance, _)| *distance);
        if let Some((distance, name)) = best {
            if distance <= 3 {
                output::hint(format!("Did you mean `{}`?", name));
            }
        }
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        cli_io::confirm_action(&self.theme, "Exit shell?", true).map_err(CliError::from)
    }

    pub(crate) fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            other => output::error(other),
        }
    }
}
