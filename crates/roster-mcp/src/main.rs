use std::path::PathBuf;
use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use roster_assist::Assistant;
use roster_core::{NewUser, User, UserPatch, UserStore};
use serde::Deserialize;

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct LookupRequest {
    /// ID of the user (checked first)
    id: Option<String>,
    /// Name of the user, matched case-insensitively. With duplicate names the first record wins.
    name: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AddUserRequest {
    /// Display name
    name: String,
    /// Email address
    email: String,
    /// Phone number
    phone: Option<String>,
    /// City
    city: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct UpdateUserRequest {
    /// ID of the user to update (checked first)
    id: Option<String>,
    /// Current name of the user to update
    name: Option<String>,
    /// New display name
    new_name: Option<String>,
    /// New email
    email: Option<String>,
    /// New phone
    phone: Option<String>,
    /// New city
    city: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct SearchRequest {
    /// Case-insensitive text matched against name, email, phone and city. Empty returns all users.
    term: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ChatRequest {
    /// A natural-language command, e.g. "Add user named John with email john@example.com"
    command: String,
}

// --- Tool bodies ---

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Serialization error: {}", e))
}

fn lookup(store: &UserStore, id: Option<&str>, name: Option<&str>) -> Result<User, String> {
    if id.is_none() && name.is_none() {
        return Err("Provide either id or name".to_string());
    }
    store
        .get(id, name)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("User '{}' not found", id.or(name).unwrap_or_default()))
}

fn list_users_text(store: &UserStore) -> Result<String, String> {
    let users = store.list().map_err(|e| e.to_string())?;
    if users.is_empty() {
        Ok("No users found. Use add_user to create one.".to_string())
    } else {
        Ok(to_json(&users))
    }
}

fn get_user_text(store: &UserStore, req: &LookupRequest) -> Result<String, String> {
    lookup(store, req.id.as_deref(), req.name.as_deref()).map(|u| to_json(&u))
}

fn add_user_text(store: &UserStore, req: AddUserRequest) -> Result<String, String> {
    let user = store
        .add(NewUser {
            name: req.name,
            email: req.email,
            phone: req.phone.unwrap_or_default(),
            city: req.city.unwrap_or_default(),
        })
        .map_err(|e| e.to_string())?;
    Ok(to_json(&user))
}

fn update_user_text(store: &UserStore, req: UpdateUserRequest) -> Result<String, String> {
    let patch = UserPatch {
        name: req.new_name,
        email: req.email,
        phone: req.phone,
        city: req.city,
    };
    if patch.is_empty() {
        return Err("Nothing to update: pass new_name, email, phone or city".to_string());
    }
    let user = lookup(store, req.id.as_deref(), req.name.as_deref())?;
    let updated = store.update(&user.id, &patch).map_err(|e| e.to_string())?;
    Ok(to_json(&updated))
}

fn delete_user_text(store: &UserStore, req: &LookupRequest) -> Result<String, String> {
    let user = lookup(store, req.id.as_deref(), req.name.as_deref())?;
    store.delete(&user.id).map_err(|e| e.to_string())?;
    Ok(format!("Deleted user '{}' ({})", user.name, user.id))
}

fn search_users_text(store: &UserStore, req: &SearchRequest) -> Result<String, String> {
    let users = store.search(&req.term).map_err(|e| e.to_string())?;
    if users.is_empty() {
        Ok(format!("No users found matching '{}'", req.term))
    } else {
        Ok(to_json(&users))
    }
}

fn into_result(out: Result<String, String>) -> Result<CallToolResult, McpError> {
    match out {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(e) => Ok(CallToolResult::error(vec![Content::text(e)])),
    }
}

// --- Server ---

#[derive(Clone)]
pub struct RosterServer {
    tool_router: ToolRouter<Self>,
    store: Arc<UserStore>,
    assistant: Arc<Assistant>,
}

#[tool_router]
impl RosterServer {
    pub fn new(store: UserStore, assistant: Assistant) -> Self {
        Self {
            tool_router: Self::tool_router(),
            store: Arc::new(store),
            assistant: Arc::new(assistant),
        }
    }

    #[tool(description = "List all users as a JSON array of {id, name, email, phone, city, created_at}")]
    fn list_users(&self) -> Result<CallToolResult, McpError> {
        into_result(list_users_text(&self.store))
    }

    #[tool(description = "Get one user by id or by case-insensitive name")]
    fn get_user(
        &self,
        Parameters(req): Parameters<LookupRequest>,
    ) -> Result<CallToolResult, McpError> {
        into_result(get_user_text(&self.store, &req))
    }

    #[tool(description = "Add a user. The id and created_at are generated. Returns the stored record.")]
    fn add_user(
        &self,
        Parameters(req): Parameters<AddUserRequest>,
    ) -> Result<CallToolResult, McpError> {
        into_result(add_user_text(&self.store, req))
    }

    #[tool(
        description = "Update a user found by id or name. Only the fields passed are changed; pass new_name to rename."
    )]
    fn update_user(
        &self,
        Parameters(req): Parameters<UpdateUserRequest>,
    ) -> Result<CallToolResult, McpError> {
        into_result(update_user_text(&self.store, req))
    }

    #[tool(description = "Delete a user found by id or name")]
    fn delete_user(
        &self,
        Parameters(req): Parameters<LookupRequest>,
    ) -> Result<CallToolResult, McpError> {
        into_result(delete_user_text(&self.store, &req))
    }

    #[tool(description = "Search users by a case-insensitive substring of name, email, phone or city")]
    fn search_users(
        &self,
        Parameters(req): Parameters<SearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        into_result(search_users_text(&self.store, &req))
    }

    #[tool(
        description = "Run a natural-language command (add/list/get/update/delete/search user) and return the assistant's reply"
    )]
    async fn chat(
        &self,
        Parameters(req): Parameters<ChatRequest>,
    ) -> Result<CallToolResult, McpError> {
        let reply = self.assistant.respond(&self.store, &req.command).await;
        Ok(CallToolResult::success(vec![Content::text(reply)]))
    }
}

#[tool_handler]
impl ServerHandler for RosterServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

const INSTRUCTIONS: &str = r#"roster manages a flat list of user records stored in one JSON file.

## Records
Each user has `id` (generated, immutable), `name`, `email`, `phone`, `city` and `created_at`. Only `id` is unique. Fields are free text and are not validated.

## Lookups
`get_user`, `update_user` and `delete_user` accept `id` or `name`. Names match case-insensitively; when several users share a name the first one in the file wins, so prefer `id` once you know it.

## Chat
`chat` accepts the same sentences a person would type, e.g. "Update user John email new@example.com". Use the structured tools when you already have the fields."#;

fn data_path() -> PathBuf {
    std::env::var_os("ROSTER_DATA")
        .map(PathBuf::from)
        .unwrap_or_else(roster_core::default_data_file)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let path = data_path();
    let store = UserStore::open(&path)?;
    let assistant = Assistant::new(roster_core::load_settings());
    log::info!(
        "serving {} (AI {})",
        path.display(),
        if assistant.ai_enabled() { "on" } else { "off" }
    );

    let service = RosterServer::new(store, assistant)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| log::error!("MCP server error: {}", e))?;
    service.waiting().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(td: &TempDir) -> UserStore {
        UserStore::open(td.path().join("users.json")).unwrap()
    }

    fn add(store: &UserStore, name: &str) -> User {
        let json = add_user_text(
            store,
            AddUserRequest {
                name: name.to_string(),
                email: format!("{}@x.com", name.to_lowercase()),
                phone: None,
                city: Some("Lisbon".into()),
            },
        )
        .unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn empty_store_lists_hint() {
        let td = TempDir::new().unwrap();
        assert!(list_users_text(&store(&td)).unwrap().starts_with("No users found"));
    }

    #[test]
    fn add_then_get_by_name_or_id() {
        let td = TempDir::new().unwrap();
        let store = store(&td);
        let ana = add(&store, "Ana");

        let by_name = get_user_text(
            &store,
            &LookupRequest {
                id: None,
                name: Some("ANA".into()),
            },
        )
        .unwrap();
        let by_id = get_user_text(
            &store,
            &LookupRequest {
                id: Some(ana.id.clone()),
                name: None,
            },
        )
        .unwrap();
        assert_eq!(by_name, by_id);
        assert_eq!(serde_json::from_str::<User>(&by_id).unwrap(), ana);
    }

    #[test]
    fn lookup_requires_a_key() {
        let td = TempDir::new().unwrap();
        let err = get_user_text(&store(&td), &LookupRequest { id: None, name: None }).unwrap_err();
        assert_eq!(err, "Provide either id or name");
    }

    #[test]
    fn update_needs_fields_and_merges() {
        let td = TempDir::new().unwrap();
        let store = store(&td);
        add(&store, "Ana");

        let empty = UpdateUserRequest {
            id: None,
            name: Some("ana".into()),
            new_name: None,
            email: None,
            phone: None,
            city: None,
        };
        assert!(update_user_text(&store, empty).is_err());

        let json = update_user_text(
            &store,
            UpdateUserRequest {
                id: None,
                name: Some("ana".into()),
                new_name: None,
                email: None,
                phone: Some("999".into()),
                city: None,
            },
        )
        .unwrap();
        let updated: User = serde_json::from_str(&json).unwrap();
        assert_eq!(updated.phone, "999");
        assert_eq!(updated.city, "Lisbon");
    }

    #[test]
    fn delete_and_search() {
        let td = TempDir::new().unwrap();
        let store = store(&td);
        add(&store, "Ana");
        let bea = add(&store, "Bea");

        let found = search_users_text(&store, &SearchRequest { term: "bea@".into() }).unwrap();
        assert!(found.contains(&bea.id));

        delete_user_text(
            &store,
            &LookupRequest {
                id: Some(bea.id.clone()),
                name: None,
            },
        )
        .unwrap();
        assert_eq!(
            search_users_text(&store, &SearchRequest { term: "bea".into() }).unwrap(),
            "No users found matching 'bea'"
        );
        let missing = delete_user_text(
            &store,
            &LookupRequest {
                id: None,
                name: Some("Bea".into()),
            },
        )
        .unwrap_err();
        assert_eq!(missing, "User 'Bea' not found");
    }
}
