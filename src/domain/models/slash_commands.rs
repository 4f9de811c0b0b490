#[cfg(test)]
#[path = "slash_commands_test.rs"]
mod tests;

pub struct SlashCommand {
    command: String,
    pub args: Vec<String>,
}

impl SlashCommand {
    pub fn parse(text: &str) -> Option<SlashCommand> {
        let mut args = text
            .split_whitespace()
            .map(|e| return e.to_string())
            .collect::<Vec<String>>();
        if args.is_empty() {
            return None;
        }

        let prefix = args.remove(0);
        let cmd = SlashCommand {
            command: prefix,
            args,
        };
        if cmd.is_quit()
            || cmd.is_help()
            || cmd.is_new()
            || cmd.is_list()
            || cmd.is_open()
            || cmd.is_title()
            || cmd.is_clear()
            || cmd.is_delete()
            || cmd.is_delete_all()
            || cmd.is_user_role()
            || cmd.is_assistant_role()
            || cmd.is_device()
            || cmd.is_recheck()
        {
            return Some(cmd);
        }

        return None;
    }

    /// Arguments joined back into a single string.
    pub fn text(&self) -> String {
        return self.args.join(" ");
    }

    pub fn is_quit(&self) -> bool {
        return ["/q", "/quit", "/exit"].contains(&self.command.as_str());
    }

    pub fn is_help(&self) -> bool {
        return ["/h", "/help"].contains(&self.command.as_str());
    }

    pub fn is_new(&self) -> bool {
        return ["/n", "/new"].contains(&self.command.as_str());
    }

    pub fn is_list(&self) -> bool {
        return ["/l", "/list"].contains(&self.command.as_str());
    }

    pub fn is_open(&self) -> bool {
        return ["/o", "/open"].contains(&self.command.as_str()) && !self.args.is_empty();
    }

    pub fn is_title(&self) -> bool {
        return ["/t", "/title"].contains(&self.command.as_str()) && !self.args.is_empty();
    }

    pub fn is_clear(&self) -> bool {
        return ["/c", "/clear"].contains(&self.command.as_str());
    }

    pub fn is_delete(&self) -> bool {
        return ["/d", "/delete"].contains(&self.command.as_str());
    }

    pub fn is_delete_all(&self) -> bool {
        return ["/deleteall"].contains(&self.command.as_str());
    }

    pub fn is_user_role(&self) -> bool {
        return ["/user"].contains(&self.command.as_str()) && self.args.len() == 1;
    }

    pub fn is_assistant_role(&self) -> bool {
        return ["/assistant"].contains(&self.command.as_str()) && self.args.len() == 1;
    }

    pub fn is_device(&self) -> bool {
        return ["/device"].contains(&self.command.as_str());
    }

    pub fn is_recheck(&self) -> bool {
        return ["/recheck"].contains(&self.command.as_str());
    }
}
