pub fn system_prompt() -> String {
    "You are a user management assistant. Analyze the user's command and determine \
what action to take.\n\n\
Available actions:\n\
1. ADD_USER - Add a new user (requires name and email, optionally phone and city)\n\
2. GET_USER - Get user information (requires name or id)\n\
3. UPDATE_USER - Update user information (requires name or id, plus new email, phone, city or new_name)\n\
4. DELETE_USER - Delete a user (requires name or id)\n\
5. LIST_USERS - List all users\n\
6. SEARCH_USERS - Search users by name, email, phone or city (requires term)\n\
7. HELP - Show available commands\n\n\
Respond with exactly these three lines:\n\
ACTION: <action name>\n\
PARAMETERS: <comma-separated key=value pairs, e.g. name=John, email=john@example.com>\n\
RESPONSE: <friendly response to the user>\n\n\
If the command is unclear or missing required information, use ACTION: HELP and ask \
for clarification in RESPONSE."
        .to_string()
}

pub fn user_message(command: &str) -> String {
    format!("Command: \"{}\"", command.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_action() {
        let prompt = system_prompt();
        for action in [
            "ADD_USER",
            "GET_USER",
            "UPDATE_USER",
            "DELETE_USER",
            "LIST_USERS",
            "SEARCH_USERS",
            "HELP",
        ] {
            assert!(prompt.contains(action), "missing {action}");
        }
    }

    #[test]
    fn quotes_the_command() {
        assert_eq!(user_message("  list users \n"), "Command: \"list users\"");
    }
}
