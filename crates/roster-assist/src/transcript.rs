use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only chat history. `clear` is the only way to drop entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content.into());
    }

    pub fn push_bot(&mut self, content: impl Into<String>) {
        self.push(Role::Bot, content.into());
    }

    fn push(&mut self, role: Role, content: String) {
        self.entries.push(Entry {
            role,
            content,
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// "You: ..." / "Bot: ..." lines in order.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| {
                let who = match e.role {
                    Role::User => "You",
                    Role::Bot => "Bot",
                };
                format!("{}: {}", who, e.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_roles() {
        let mut t = Transcript::new();
        t.push_user("list users");
        t.push_bot("📋 No users found.");
        assert_eq!(t.len(), 2);
        assert_eq!(t.entries()[0].role, Role::User);
        assert_eq!(t.entries()[1].role, Role::Bot);
        assert_eq!(t.render(), "You: list users\nBot: 📋 No users found.");
        assert!(t.entries()[0].timestamp <= t.entries()[1].timestamp);
    }

    #[test]
    fn clear_empties() {
        let mut t = Transcript::new();
        t.push_user("hi");
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.render(), "");
    }

    #[test]
    fn serializes_lowercase_roles() {
        let mut t = Transcript::new();
        t.push_bot("ok");
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["entries"][0]["role"], "bot");
    }
}
