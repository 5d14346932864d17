//! Keyword intent parser and executor.
//!
//! Classification is plain substring matching on the lowercased input and
//! arguments are taken positionally (the token after a trigger word). Names
//! with spaces or phrasing outside the templates in [`HELP`] are not
//! understood; anything unrecognized becomes [`Intent::Help`].

use std::fmt;

use roster_core::{or_na, NewUser, StoreError, User, UserPatch, UserStore};

pub const HELP: &str = "\
🤖 I can help you manage users! Here are some commands you can try:

• Add user: \"Add user named John with email john@example.com phone 123-456-7890 city Lisbon\"
• List users: \"List all users\" or \"Show users\"
• Get user: \"Get user John\" or \"Find user John\"
• Update user: \"Update user John email new@example.com phone 123-456-7890 city Lisbon\"
• Delete user: \"Delete user John\" or \"Remove user John\"
• Search users: \"Search users Lisbon\"

Just type your command naturally!";

const ADD_USAGE: &str = "Please provide both name and email. Example: 'Add user named John with email john@example.com phone 123-456-7890 city Lisbon'";
const GET_USAGE: &str = "Please specify the user name to find. Example: 'Get user John'";
const DELETE_USAGE: &str = "Please specify the user name to delete. Example: 'Delete user John'";
const UPDATE_USAGE: &str = "Please specify the user name to update. Example: 'Update user John email new@example.com'";
const UPDATE_FIELDS: &str = "Please provide data to update (e.g., email, phone, city).";
const SEARCH_USAGE: &str = "Please specify what to search for. Example: 'Search users Lisbon'";

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Add {
        name: Option<String>,
        email: Option<String>,
        phone: Option<String>,
        city: Option<String>,
    },
    List,
    /// `target` is matched as an id first, then as a name.
    Get { target: Option<String> },
    Update {
        target: Option<String>,
        patch: UserPatch,
    },
    Delete { target: Option<String> },
    Search { term: Option<String> },
    Help,
}

#[derive(Debug)]
pub enum CommandError {
    MissingArgument(&'static str),
    NotFound(String),
    Store(StoreError),
    External(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::MissingArgument(usage) => write!(f, "❌ {}", usage),
            CommandError::NotFound(name) => write!(f, "❌ User '{}' not found.", name),
            CommandError::Store(e) => write!(f, "❌ Error executing command: {}", e),
            CommandError::External(e) => {
                write!(f, "Sorry, I couldn't process your command. Error: {}", e)
            }
        }
    }
}

impl std::error::Error for CommandError {}

impl From<StoreError> for CommandError {
    fn from(e: StoreError) -> Self {
        CommandError::Store(e)
    }
}

// --- Parsing ---

const NAME_TRIGGERS: [&str; 3] = ["name", "called", "named"];
const TARGET_TRIGGERS: [&str; 2] = ["user", "named"];
const SEARCH_FILLERS: [&str; 4] = ["for", "matching", "named", "with"];

/// Classify one line of free text.
pub fn parse(text: &str) -> Intent {
    let words: Vec<&str> = text.split_whitespace().collect();
    let lower = words.join(" ").to_lowercase();
    let has = |keys: &[&str]| contains_any(&lower, keys);

    if has(&["add user", "create user"][..]) {
        parse_add(&words)
    } else if has(&["list users", "show users", "list all users", "show all users"][..]) {
        Intent::List
    } else if has(&["search users", "search user"][..]) {
        Intent::Search {
            term: parse_search(&words),
        }
    } else if has(&["delete user", "remove user"][..]) {
        Intent::Delete {
            target: parse_target(&words),
        }
    } else if has(&["get user", "find user", "show user"][..]) {
        Intent::Get {
            target: parse_target(&words),
        }
    } else if has(&["update user"][..]) {
        parse_update(&words)
    } else {
        Intent::Help
    }
}

fn contains_any(haystack: &str, keys: &[&str]) -> bool {
    keys.iter().any(|k| haystack.contains(k))
}

/// Strip trailing sentence punctuation from a captured token.
fn clean(token: &str) -> Option<String> {
    let t = token.trim_end_matches([',', ';', '!', '?', '.']);
    (!t.is_empty()).then(|| t.to_string())
}

fn next_token(words: &[&str], i: usize) -> Option<String> {
    words.get(i + 1).and_then(|w| clean(w))
}

/// Token after `words[i]`, skipping a filler "named"/"called".
fn next_name(words: &[&str], i: usize) -> Option<String> {
    let candidate = words.get(i + 1)?;
    if matches!(candidate.to_lowercase().as_str(), "named" | "called") {
        next_token(words, i + 1)
    } else {
        clean(candidate)
    }
}

fn parse_add(words: &[&str]) -> Intent {
    let (mut name, mut email, mut phone, mut city) = (None, None, None, None);
    for (i, word) in words.iter().enumerate() {
        let lw = word.to_lowercase();
        if NAME_TRIGGERS.contains(&lw.as_str()) {
            set(&mut name, next_token(words, i));
        } else if word.contains('@') {
            set(&mut email, clean(word));
        } else if lw == "phone" {
            set(&mut phone, next_token(words, i));
        } else if lw == "city" {
            set(&mut city, next_token(words, i));
        }
    }
    Intent::Add {
        name,
        email,
        phone,
        city,
    }
}

/// Later matches overwrite earlier ones; a trigger with nothing after it is ignored.
fn set(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}

fn parse_target(words: &[&str]) -> Option<String> {
    words.iter().enumerate().find_map(|(i, word)| {
        let lw = word.to_lowercase();
        if TARGET_TRIGGERS.contains(&lw.as_str()) {
            next_name(words, i)
        } else {
            None
        }
    })
}

fn parse_update(words: &[&str]) -> Intent {
    let mut target = None;
    let mut patch = UserPatch::default();
    for (i, word) in words.iter().enumerate() {
        match word.to_lowercase().as_str() {
            "user" => set(&mut target, next_name(words, i)),
            "email" => set(&mut patch.email, next_token(words, i)),
            "phone" => set(&mut patch.phone, next_token(words, i)),
            "city" => set(&mut patch.city, next_token(words, i)),
            "name" => set(&mut patch.name, next_token(words, i)),
            _ => {}
        }
    }
    Intent::Update { target, patch }
}

fn parse_search(words: &[&str]) -> Option<String> {
    let start = words.iter().position(|w| {
        let lw = w.to_lowercase();
        lw == "users" || lw == "user"
    })?;
    let mut rest = &words[start + 1..];
    if let Some(first) = rest.first() {
        if SEARCH_FILLERS.contains(&first.to_lowercase().as_str()) {
            rest = &rest[1..];
        }
    }
    clean(&rest.join(" "))
}

// --- Execution ---

/// Run one intent against the store and format the reply.
pub fn execute(store: &UserStore, intent: &Intent) -> Result<String, CommandError> {
    match intent {
        Intent::Add {
            name,
            email,
            phone,
            city,
        } => {
            let (Some(name), Some(email)) = (name, email) else {
                return Err(CommandError::MissingArgument(ADD_USAGE));
            };
            let user = store.add(NewUser {
                name: name.clone(),
                email: email.clone(),
                phone: phone.clone().unwrap_or_default(),
                city: city.clone().unwrap_or_default(),
            })?;
            Ok(format!(
                "✅ User '{}' added successfully with email {}, phone {}, and city {}!",
                user.name,
                user.email,
                or_na(&user.phone),
                or_na(&user.city)
            ))
        }
        Intent::List => {
            let users = store.list()?;
            if users.is_empty() {
                Ok("📋 No users found.".to_string())
            } else {
                Ok(format!("📋 Current users:\n{}", bullets(&users)))
            }
        }
        Intent::Get { target } => {
            let target = target
                .as_deref()
                .ok_or(CommandError::MissingArgument(GET_USAGE))?;
            let user = resolve(store, target)?;
            Ok(user_info(&user))
        }
        Intent::Update { target, patch } => {
            let target = target
                .as_deref()
                .ok_or(CommandError::MissingArgument(UPDATE_USAGE))?;
            let user = resolve(store, target)?;
            if patch.is_empty() {
                return Err(CommandError::MissingArgument(UPDATE_FIELDS));
            }
            store.update(&user.id, patch)?;
            Ok(format!("✅ User '{}' updated successfully!", target))
        }
        Intent::Delete { target } => {
            let target = target
                .as_deref()
                .ok_or(CommandError::MissingArgument(DELETE_USAGE))?;
            let user = resolve(store, target)?;
            store.delete(&user.id)?;
            Ok(format!("✅ User '{}' deleted successfully!", target))
        }
        Intent::Search { term } => {
            let term = term
                .as_deref()
                .ok_or(CommandError::MissingArgument(SEARCH_USAGE))?;
            let users = store.search(term)?;
            if users.is_empty() {
                Ok(format!("🔍 No users found matching '{}'.", term))
            } else {
                Ok(format!(
                    "🔍 {} user(s) matching '{}':\n{}",
                    users.len(),
                    term,
                    bullets(&users)
                ))
            }
        }
        Intent::Help => Ok(HELP.to_string()),
    }
}

/// Parse and execute, rendering any error as the reply.
pub fn respond(store: &UserStore, text: &str) -> String {
    reply(store, &parse(text))
}

pub fn reply(store: &UserStore, intent: &Intent) -> String {
    execute(store, intent).unwrap_or_else(|e| e.to_string())
}

/// Duplicate names resolve to the first record in file order.
fn resolve(store: &UserStore, target: &str) -> Result<User, CommandError> {
    store
        .get(Some(target), Some(target))?
        .ok_or_else(|| CommandError::NotFound(target.to_string()))
}

fn bullets(users: &[User]) -> String {
    users
        .iter()
        .map(|u| format!("• {} ({})", u.name, u.email))
        .collect::<Vec<_>>()
        .join("\n")
}

fn user_info(user: &User) -> String {
    format!(
        "👤 User Info:\n• Name: {}\n• Email: {}\n• Phone: {}\n• City: {}\n• Created: {}",
        user.name,
        or_na(&user.email),
        or_na(&user.phone),
        or_na(&user.city),
        user.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}
