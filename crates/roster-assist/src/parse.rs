use std::collections::BTreeMap;

use roster_core::UserPatch;

use crate::command::Intent;

/// The model's ACTION / PARAMETERS / RESPONSE answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    pub action: String,
    pub parameters: BTreeMap<String, String>,
    pub response: Option<String>,
}

enum Section {
    None,
    Response,
}

/// Read the labelled lines out of raw model output. Labels are matched
/// case-insensitively and may carry markdown bullets or bold markers.
/// Returns `None` when there is no ACTION line.
pub fn parse_analysis(raw: &str) -> Option<Analysis> {
    let mut action = None;
    let mut parameters = BTreeMap::new();
    let mut response: Vec<String> = Vec::new();
    let mut section = Section::None;

    for line in raw.lines() {
        let stripped = line.replace("**", "");
        let stripped = stripped.trim().trim_start_matches(['-', '*', '•']).trim();

        if let Some((label, value)) = stripped.split_once(':') {
            match label.trim().to_lowercase().as_str() {
                "action" => {
                    action = Some(unwrap_brackets(value).to_uppercase());
                    section = Section::None;
                    continue;
                }
                "parameters" => {
                    parameters = parse_parameters(value);
                    section = Section::None;
                    continue;
                }
                "response" => {
                    response.push(value.trim().to_string());
                    section = Section::Response;
                    continue;
                }
                _ => {}
            }
        }

        if let Section::Response = section {
            response.push(line.trim().to_string());
        }
    }

    let response = response.join("\n").trim().to_string();
    Some(Analysis {
        action: action.filter(|a| !a.is_empty())?,
        parameters,
        response: (!response.is_empty()).then_some(response),
    })
}

fn unwrap_brackets(value: &str) -> &str {
    value
        .trim()
        .trim_start_matches(['[', '{', '('])
        .trim_end_matches([']', '}', ')'])
        .trim()
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches(['"', '\'', '`']).trim()
}

/// `name=John, email=john@x.com` or `name: John, email: john@x.com`.
fn parse_parameters(value: &str) -> BTreeMap<String, String> {
    unwrap_brackets(value)
        .split(',')
        .filter_map(|pair| {
            let (key, val) = pair.split_once('=').or_else(|| pair.split_once(':'))?;
            let key = unquote(key).to_lowercase();
            let val = unquote(val);
            let blank = val.is_empty()
                || matches!(val.to_lowercase().as_str(), "none" | "null" | "n/a");
            (!key.is_empty() && !blank).then(|| (key, val.to_string()))
        })
        .collect()
}

impl Analysis {
    fn param(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.parameters.get(*k).cloned())
    }

    /// Map the model's action to an intent. Unknown actions give `None`.
    pub fn to_intent(&self) -> Option<Intent> {
        let action: String = self
            .action
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        let target = || self.param(&["id", "user_id", "name", "user"]);
        let intent = match action.as_str() {
            "ADD_USER" => Intent::Add {
                name: self.param(&["name"]),
                email: self.param(&["email"]),
                phone: self.param(&["phone"]),
                city: self.param(&["city"]),
            },
            "GET_USER" => Intent::Get { target: target() },
            "UPDATE_USER" => Intent::Update {
                target: target(),
                patch: UserPatch {
                    name: self.param(&["new_name"]),
                    email: self.param(&["email", "new_email"]),
                    phone: self.param(&["phone", "new_phone"]),
                    city: self.param(&["city", "new_city"]),
                },
            },
            "DELETE_USER" => Intent::Delete { target: target() },
            "LIST_USERS" => Intent::List,
            "SEARCH_USERS" => Intent::Search {
                term: self.param(&["term", "query", "search"]),
            },
            "HELP" => Intent::Help,
            _ => return None,
        };
        Some(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_three_line_answer() {
        let raw = "ACTION: ADD_USER\nPARAMETERS: name=Maria, email=maria@x.com, city=Porto\nRESPONSE: Adding Maria now.";
        let a = parse_analysis(raw).unwrap();
        assert_eq!(a.action, "ADD_USER");
        assert_eq!(a.parameters["city"], "Porto");
        assert_eq!(a.response.as_deref(), Some("Adding Maria now."));
        assert_eq!(
            a.to_intent(),
            Some(Intent::Add {
                name: Some("Maria".into()),
                email: Some("maria@x.com".into()),
                phone: None,
                city: Some("Porto".into()),
            })
        );
    }

    #[test]
    fn tolerates_markdown_and_colon_pairs() {
        let raw = "- **ACTION:** [DELETE_USER]\n- **PARAMETERS:** {\"name\": \"John\"}\n- **RESPONSE:** Removing John.";
        let a = parse_analysis(raw).unwrap();
        assert_eq!(
            a.to_intent(),
            Some(Intent::Delete {
                target: Some("John".into())
            })
        );
    }

    #[test]
    fn multi_line_response_is_joined() {
        let raw = "ACTION: HELP\nPARAMETERS: none\nRESPONSE: Which user?\nPlease give a name.";
        let a = parse_analysis(raw).unwrap();
        assert!(a.parameters.is_empty());
        assert_eq!(a.response.as_deref(), Some("Which user?\nPlease give a name."));
        assert_eq!(a.to_intent(), Some(Intent::Help));
    }

    #[test]
    fn update_maps_patch_fields() {
        let raw = "ACTION: UPDATE_USER\nPARAMETERS: name=John, email=new@x.com, phone=N/A";
        let intent = parse_analysis(raw).unwrap().to_intent().unwrap();
        assert_eq!(
            intent,
            Intent::Update {
                target: Some("John".into()),
                patch: UserPatch {
                    email: Some("new@x.com".into()),
                    ..Default::default()
                },
            }
        );
    }

    #[test]
    fn missing_or_unknown_action() {
        assert!(parse_analysis("I am not sure what you mean.").is_none());
        let a = parse_analysis("ACTION: DANCE").unwrap();
        assert!(a.to_intent().is_none());
    }
}
