#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use yansi::Paint;

use crate::application::cli::format_conversation;
use crate::domain::models::Conversation;
use crate::domain::models::DeviceCapability;
use crate::domain::models::GenerationResponse;
use crate::domain::models::InitState;
use crate::domain::models::SessionError;
use crate::domain::models::SlashCommand;
use crate::domain::services::MessageObserver;
use crate::domain::services::SessionController;

const DEFAULT_TITLE: &str = "New conversation";
const DEVICE_WAIT: Duration = Duration::from_secs(10);

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /new (/n) [TITLE?] - Starts a new conversation and switches to it.
- /list (/l) - Lists saved conversations, most recent first.
- /open (/o) [ID] - Switches to a saved conversation.
- /title (/t) [TITLE] - Renames the current conversation.
- /clear (/c) - Removes every message from the current conversation.
- /delete (/d) - Deletes the current conversation.
- /deleteall - Deletes every saved conversation.
- /user [NAME] - Sets the role name stamped on your messages.
- /assistant [NAME] - Sets the role name stamped on replies.
- /device - Shows the device detected for running the model.
- /recheck - Runs device detection again.
- /quit /exit (/q) - Exit Hearth.
- /help (/h) - Provides this help menu.

HOTKEYS:
- CTRL+C - Interrupt a reply in progress, otherwise exit.
        "#;

    return text.trim().to_string();
}

/// What to print for a streamed update, given what was already printed for
/// the same reply. Replies are cumulative, so normally only the new suffix is
/// printed. If the text no longer extends what was printed, start over on a
/// fresh line.
pub fn next_delta(printed: &str, output_text: &str) -> String {
    if let Some(delta) = output_text.strip_prefix(printed) {
        return delta.to_string();
    }

    return format!("\n{output_text}");
}

/// Warning shown before chatting when the model has no usable device. The
/// session still sends; replies may just be slow.
pub fn device_warning(capability: &DeviceCapability) -> Option<String> {
    if !capability.checked() || capability.is_supported() {
        return None;
    }

    return Some(format!(
        "Warning: {} Replies may be very slow.",
        capability.unsupported_reason().unwrap_or_default()
    ));
}

fn print_error(err: &str) {
    eprintln!("{}", Paint::red(err));
}

fn flush() {
    // Nothing useful to do if the terminal is gone.
    let _ = std::io::stdout().flush();
}

fn stream_observer() -> MessageObserver {
    let printed = Arc::new(Mutex::new(String::new()));

    return Arc::new(move |res: &GenerationResponse| {
        let mut printed = printed.lock().unwrap_or_else(PoisonError::into_inner);
        print!("{}", next_delta(&printed, &res.output_text));
        *printed = res.output_text.to_string();

        if res.is_finished {
            println!();
            if let Some(err) = &res.error {
                print_error(err);
            }
            printed.clear();
        }
        flush();
    });
}

/// Line based chat loop on top of a session controller.
pub struct Repl {
    controller: SessionController,
    max_tokens: u32,
}

impl Repl {
    pub fn new(controller: SessionController, max_tokens: u32) -> Repl {
        return Repl {
            controller,
            max_tokens,
        };
    }

    pub async fn start(&self, conversation_id: &str) -> Result<()> {
        let conversation = self.open_initial_conversation(conversation_id).await?;
        println!(
            "Conversation: {} (ID: {})",
            conversation.title, conversation.id
        );
        print_messages(&conversation);

        self.controller.on_message(stream_observer());
        self.wait_for_model().await?;
        self.print_device().await?;
        println!("Type a message, or /help for commands.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("{}> ", Paint::cyan(self.controller.user_role_name()));
            flush();

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };

            let line = match line {
                Some(line) => line,
                None => break,
            };

            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            if text.starts_with('/') {
                match SlashCommand::parse(text) {
                    Some(cmd) => match self.run_command(cmd).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(err) => print_error(&err.to_string()),
                    },
                    None => print_error(&format!(
                        "Unknown command '{text}'. Type /help for the list of commands."
                    )),
                }
                continue;
            }

            print!("{}: ", Paint::green(self.controller.assistant_role_name()));
            flush();
            match self.controller.send(text, self.max_tokens, None).await {
                Ok(request_id) => {
                    tracing::debug!(request_id = %request_id, "Waiting for reply");
                    self.wait_for_reply().await?;
                }
                Err(err) => {
                    println!();
                    print_error(&err.to_string());
                }
            }
        }

        println!();
        return Ok(());
    }

    async fn open_initial_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        if !conversation_id.is_empty() {
            return Ok(self.controller.select_conversation(conversation_id).await?);
        }

        if let Some(conversation) = self.controller.current_conversation().await? {
            return Ok(conversation);
        }

        return Ok(self.controller.new_conversation(DEFAULT_TITLE, "").await?);
    }

    async fn wait_for_model(&self) -> Result<()> {
        self.controller.init()?;

        let mut progress = self.controller.subscribe_loading_status();
        let mut state = self.controller.subscribe_init_state();
        loop {
            let current = state.borrow_and_update().clone();
            match current {
                InitState::Ready => {
                    println!("\r{}", self.controller.loading_status().describe());
                    return Ok(());
                }
                InitState::Failed(err) => {
                    println!();
                    bail!("Failed to load the model: {err}");
                }
                InitState::Uninitialized | InitState::Loading => {}
            }

            tokio::select! {
                res = progress.changed() => {
                    res?;
                    let snapshot = *progress.borrow_and_update();
                    print!("\r{}", snapshot.describe());
                    flush();
                }
                res = state.changed() => {
                    res?;
                }
            }
        }
    }

    async fn wait_for_reply(&self) -> Result<()> {
        let mut generating = self.controller.subscribe_generating();
        loop {
            tokio::select! {
                res = generating.wait_for(|e| return !*e) => {
                    res?;
                    return Ok(());
                }
                res = tokio::signal::ctrl_c() => {
                    res?;
                    self.controller.cancel();
                }
            }
        }
    }

    async fn print_device(&self) -> Result<()> {
        let mut device = self.controller.subscribe_device();
        let checked = tokio::time::timeout(DEVICE_WAIT, device.wait_for(|e| return e.checked())).await;
        if let Ok(res) = checked {
            res?;
        }

        let capability = self.controller.device();
        println!("Device: {}", capability.describe());
        if let Some(warning) = device_warning(&capability) {
            println!("{}", Paint::yellow(warning));
        }
        return Ok(());
    }

    async fn current(&self) -> Result<Conversation> {
        return match self.controller.current_conversation().await? {
            Some(conversation) => Ok(conversation),
            None => Err(SessionError::NoActiveConversation.into()),
        };
    }

    /// Runs a slash command. Returns false when the loop should stop.
    pub async fn run_command(&self, cmd: SlashCommand) -> Result<bool> {
        if cmd.is_quit() {
            return Ok(false);
        }

        if cmd.is_help() {
            println!("{}", help_text());
        } else if cmd.is_new() {
            let mut title = cmd.text();
            if title.is_empty() {
                title = DEFAULT_TITLE.to_string();
            }
            let conversation = self.controller.new_conversation(&title, "").await?;
            println!(
                "Started conversation {} (ID: {})",
                conversation.title, conversation.id
            );
        } else if cmd.is_list() {
            let current_id = self
                .controller
                .current_conversation()
                .await?
                .map(|e| return e.id)
                .unwrap_or_default();
            let conversations = self.controller.all_conversations().await?;
            if conversations.is_empty() {
                println!("There are no conversations available. Start one with /new.");
            }
            for conversation in conversations {
                let mut line = format_conversation(&conversation);
                if conversation.id == current_id {
                    line = format!("{line} {}", Paint::yellow("(current)"));
                }
                println!("{line}");
            }
        } else if cmd.is_open() {
            let conversation = self.controller.select_conversation(&cmd.args[0]).await?;
            println!(
                "Opened conversation {} (ID: {})",
                conversation.title, conversation.id
            );
            print_messages(&conversation);
        } else if cmd.is_title() {
            let conversation = self.current().await?;
            self.controller
                .set_conversation_title(&conversation.id, &cmd.text())
                .await?;
            println!("Renamed conversation to {}", cmd.text());
        } else if cmd.is_clear() {
            let conversation = self.current().await?;
            self.controller.clear_messages(&conversation.id).await?;
            println!("Cleared all messages from {}", conversation.title);
        } else if cmd.is_delete() {
            let conversation = self.current().await?;
            self.controller
                .delete_conversation(&conversation.id)
                .await?;
            println!(
                "Deleted conversation {}. Use /new or /open to continue.",
                conversation.title
            );
        } else if cmd.is_delete_all() {
            self.controller.delete_all_conversations().await?;
            println!("Deleted all conversations. Use /new to start another.");
        } else if cmd.is_user_role() {
            self.controller.set_user_role_name(&cmd.args[0]);
            println!("Your messages are now sent as {}", cmd.args[0]);
        } else if cmd.is_assistant_role() {
            self.controller.set_assistant_role_name(&cmd.args[0]);
            println!("Replies are now stored as {}", cmd.args[0]);
        } else if cmd.is_device() {
            println!("Device: {}", self.controller.device().describe());
        } else if cmd.is_recheck() {
            let mut device = self.controller.subscribe_device();
            device.borrow_and_update();
            if !self.controller.recheck_device() {
                println!("Device detection is already running.");
                return Ok(true);
            }

            if let Ok(res) = tokio::time::timeout(DEVICE_WAIT, device.changed()).await {
                res?;
            }
            println!("Device: {}", self.controller.device().describe());
        }

        return Ok(true);
    }
}

fn print_messages(conversation: &Conversation) {
    for message in &conversation.messages {
        println!("{}: {}", Paint::new(&message.role).bold(), message.text);
    }
}
