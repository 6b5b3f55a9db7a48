pub mod command;
pub mod prompt;

use std::io::{self, Write};
use std::process::ExitCode;

use color_print::cstr;
use command::{is_command, parse_command, Command};
use crossterm::style::Stylize;
use eyre::Result;
use lmchat::{ChatError, CompletionProvider, ConfigurationUpdate, ConversationManager, Role};
use prompt::generate_prompt;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

const WELCOME_TEXT: &str = cstr!(
    "
Hi, I'm <bold>lmchat</bold>. Ask me anything.

Things to try
• Explain quantum computing
• Write a Python function
• Plan a trip to Japan

<green>/examples</green>     List example prompts
<green>/help</green>         Show the help dialogue
<green>/quit</green>         Quit the application
"
);

const HELP_TEXT: &str = cstr!(
    "
<bold>lmchat</bold>

<green>/clear</green>              Clear the conversation history
<green>/history</green>            Show the conversation so far
<green>/stats</green>              Show message and word counts
<green>/config</green>             Show the active settings
<green>/model</green> ID            Use another model from next turn
<green>/models</green>             Refresh and list models served by the provider
<green>/temperature</green> T       Set sampling temperature (0.0 to 2.0)
<green>/system</green> TEXT        Replace the system instruction
<green>/stream</green> on|off       Toggle streamed replies
<green>/examples</green>           List example prompts
<green>/example</green> N           Send example prompt n
<green>/help</green>               Show this help dialogue
<green>/quit</green>               Quit the application
"
);

pub const EXAMPLE_PROMPTS: [(&str, &str); 3] = [
    ("Explain quantum computing", "Explain quantum computing in simple terms"),
    ("Write a Python function", "Write a Python function to calculate factorial"),
    ("Plan a trip to Japan", "Help me plan a 7-day trip to Japan"),
];

enum Flow {
    Continue,
    Quit,
}

pub struct ChatContext<P> {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    streaming: bool,
    manager: ConversationManager<P>,
}

impl<P: CompletionProvider> ChatContext<P> {
    pub fn new(
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        streaming: bool,
        manager: ConversationManager<P>,
    ) -> Self {
        Self {
            output,
            input,
            interactive,
            streaming,
            manager,
        }
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        // Handle non-interactive mode (single query)
        if let Some(input) = self.input.take() {
            return match self.process_chat_input(&input).await? {
                Some(_) => Ok(ExitCode::FAILURE),
                None => Ok(ExitCode::SUCCESS),
            };
        }

        if self.interactive {
            self.print_welcome()?;
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output, "{}", WELCOME_TEXT)?;
        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;
        let history_path = prompt::history_path();
        if let Some(path) = &history_path {
            if rl.load_history(path).is_err() {
                debug!("No line history at {}", path.display());
            }
        }

        loop {
            let prompt_text = generate_prompt(&self.manager.configuration().model);

            match rl.readline(&prompt_text) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    rl.add_history_entry(line.as_str());

                    if let Flow::Quit = self.handle_input(&line).await? {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    writeln!(self.output, "Error: {}", e)?;
                    break;
                }
            }
        }

        if let Some(path) = &history_path {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            if let Err(e) = rl.save_history(path) {
                warn!("Failed to save line history: {}", e);
            }
        }

        Ok(())
    }

    async fn handle_input(&mut self, input: &str) -> Result<Flow> {
        if !is_command(input) {
            self.process_chat_input(input).await?;
            return Ok(Flow::Continue);
        }

        let command = match parse_command(input) {
            Ok(command) => command,
            Err(e) => {
                writeln!(self.output, "{}", e.to_string().yellow())?;
                return Ok(Flow::Continue);
            }
        };

        match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Help => writeln!(self.output, "{}", HELP_TEXT)?,
            Command::Clear => {
                self.manager.clear();
                writeln!(self.output, "Conversation cleared.")?;
            }
            Command::History => self.print_history()?,
            Command::Stats => {
                let stats = self.manager.stats();
                writeln!(
                    self.output,
                    "Messages: {} ({} user, {} assistant), words: {}",
                    stats.total_messages, stats.user_messages, stats.assistant_messages, stats.total_words
                )?;
            }
            Command::Config => self.print_config()?,
            Command::Models => self.refresh_models().await?,
            Command::Examples => {
                for (i, (title, prompt)) in EXAMPLE_PROMPTS.iter().enumerate() {
                    writeln!(self.output, "{}. {} - {}", i + 1, title.bold(), prompt)?;
                }
            }
            Command::Example(n) => match EXAMPLE_PROMPTS.get(n - 1) {
                Some((_, prompt)) => {
                    writeln!(self.output, "> {}", prompt)?;
                    self.process_chat_input(prompt).await?;
                }
                None => writeln!(self.output, "There are only {} examples.", EXAMPLE_PROMPTS.len())?,
            },
            Command::Model(model) => self.apply(ConfigurationUpdate::default().model(model))?,
            Command::Temperature(t) => self.apply(ConfigurationUpdate::default().temperature(t))?,
            Command::System(text) => self.apply(ConfigurationUpdate::default().system_message(text))?,
            Command::Stream(enabled) => {
                self.streaming = enabled;
                writeln!(self.output, "Streaming {}.", if enabled { "on" } else { "off" })?;
            }
        }

        Ok(Flow::Continue)
    }

    fn apply(&mut self, update: ConfigurationUpdate) -> Result<()> {
        match self.manager.update_configuration(update) {
            Ok(()) => self.print_config(),
            Err(e) => {
                writeln!(self.output, "{}", e.to_string().yellow())?;
                Ok(())
            }
        }
    }

    async fn refresh_models(&mut self) -> Result<()> {
        if let Err(e) = self.manager.refresh_models().await {
            writeln!(self.output, "{} {}", "Could not list models:".red(), e.user_message())?;
        }
        let current = self.manager.configuration().model.clone();
        for model in self.manager.catalog().models() {
            let marker = if *model == current { "*" } else { " " };
            writeln!(self.output, "{} {}", marker, model)?;
        }
        Ok(())
    }

    fn print_config(&mut self) -> Result<()> {
        let config = self.manager.configuration();
        writeln!(
            self.output,
            "model: {}\ntemperature: {}\nsystem: {}\nstreaming: {}",
            config.model, config.temperature, config.system_message, self.streaming
        )?;
        Ok(())
    }

    fn print_history(&mut self) -> Result<()> {
        if self.manager.history().is_empty() {
            writeln!(self.output, "No messages yet.")?;
            return Ok(());
        }

        for message in self.manager.history() {
            let who = match message.role {
                Role::User => "you".cyan(),
                Role::Assistant => "assistant".green(),
                Role::System => "system".dark_grey(),
            };
            writeln!(
                self.output,
                "[{}] {}: {}",
                message.timestamp.format("%H:%M:%S"),
                who,
                message.content
            )?;
        }
        Ok(())
    }

    /// Runs one turn and renders the reply. Returns the turn error, if any,
    /// after showing it; only output failures are propagated.
    async fn process_chat_input(&mut self, input: &str) -> Result<Option<ChatError>> {
        let result = if self.streaming {
            let output = &mut self.output;
            let mut write_error: Option<io::Error> = None;

            let result = self
                .manager
                .submit_streaming(input, |fragment| {
                    if write_error.is_none() {
                        if let Err(e) = write!(output, "{}", fragment).and_then(|_| output.flush()) {
                            write_error = Some(e);
                        }
                    }
                })
                .await
                .map(|_| ());

            if let Some(e) = write_error {
                return Err(e.into());
            }
            if result.is_ok() {
                writeln!(self.output)?;
            }
            result
        } else {
            match self.manager.submit(input).await {
                Ok(message) => {
                    let content = message.content.clone();
                    writeln!(self.output, "{}", content)?;
                    Ok(())
                }
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(()) => Ok(None),
            Err(e) => {
                self.report(&e)?;
                Ok(Some(e))
            }
        }
    }

    fn report(&mut self, e: &ChatError) -> Result<()> {
        match e {
            ChatError::Validation(e) => writeln!(self.output, "{}", e.to_string().yellow())?,
            ChatError::Provider(e) => {
                // a partial streamed reply may already be on screen
                writeln!(self.output)?;
                writeln!(self.output, "{} {}", "Error:".red().bold(), e.user_message())?;
            }
        }
        Ok(())
    }
}
