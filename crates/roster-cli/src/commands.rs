use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use roster_assist::{Assistant, Transcript};
use roster_core::{export, or_na, AiSettings, User, UserStore};

const BANNER: &str = "🤖 User Management Chatbot. Type a command, /help for examples, /quit to leave.";

/// Read lines from `input` until EOF or /quit, replying to each on `out`.
pub async fn chat<R: BufRead, W: Write>(
    store: &UserStore,
    assistant: &Assistant,
    input: R,
    mut out: W,
) -> Result<Transcript> {
    let mut transcript = Transcript::new();
    writeln!(out, "{}", BANNER)?;
    prompt(&mut out)?;

    for line in input.lines() {
        let line = line.context("read input")?;
        let text = line.trim();
        match text {
            "" => {}
            "/quit" | "/exit" => break,
            "/clear" => {
                transcript.clear();
                writeln!(out, "(chat cleared)")?;
            }
            "/history" => writeln!(out, "{}", transcript.render())?,
            "/help" => writeln!(out, "Bot: {}", roster_assist::HELP)?,
            _ => {
                transcript.push_user(text);
                let reply = assistant.respond(store, text).await;
                writeln!(out, "Bot: {}", reply)?;
                transcript.push_bot(reply);
            }
        }
        prompt(&mut out)?;
    }
    writeln!(out)?;
    Ok(transcript)
}

fn prompt<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "You: ")?;
    out.flush()
}

pub async fn run(store: &UserStore, assistant: &Assistant, text: &str) -> String {
    assistant.respond(store, text).await
}

pub async fn ask(assistant: &Assistant, text: &str) -> String {
    match assistant.analyze(text).await {
        Ok(raw) => raw,
        Err(e) => e.to_string(),
    }
}

pub fn list<W: Write>(
    store: &UserStore,
    search: Option<&str>,
    csv: Option<&Path>,
    mut out: W,
) -> Result<()> {
    let total = store.len()?;
    let users = match search {
        Some(term) => store.search(term)?,
        None => store.list()?,
    };

    if let Some(path) = csv {
        if path == Path::new("-") {
            export::write_csv(&users, &mut out)?;
        } else {
            let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
            export::write_csv(&users, BufWriter::new(file))?;
            writeln!(out, "Wrote {} users to {}", users.len(), path.display())?;
        }
        return Ok(());
    }

    writeln!(out, "Total users: {}", total)?;
    if total == 0 {
        writeln!(out, "No users found. Use the chat to add some users!")?;
    } else if users.is_empty() {
        writeln!(out, "No users found matching '{}'", search.unwrap_or_default())?;
    } else {
        writeln!(out, "Users ({} found)", users.len())?;
        write!(out, "{}", render_table(&users))?;
    }
    Ok(())
}

pub fn render_table(users: &[User]) -> String {
    let header = ["ID", "Name", "Email", "Phone", "City", "Created At"];
    let rows: Vec<[String; 6]> = users
        .iter()
        .map(|u| {
            [
                u.id.clone(),
                u.name.clone(),
                u.email.clone(),
                or_na(&u.phone).to_string(),
                or_na(&u.city).to_string(),
                u.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();

    let mut widths = header.map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[&str]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(c, w)| format!("{:<width$}", c, width = w))
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut out = line(&header[..]);
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&line(&cells[..]));
    }
    out
}

pub fn settings<W: Write>(
    provider: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    mut out: W,
) -> Result<()> {
    if provider.is_none() && model.is_none() && api_key.is_none() {
        let current = roster_core::load_settings();
        return describe(&current, &mut out);
    }

    let mut stored = roster_core::read_settings();
    if let Some(provider) = provider {
        stored.provider = provider;
    }
    if let Some(model) = model {
        stored.model = model;
    }
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        stored.api_key = key;
    }
    roster_core::write_settings(&stored).map_err(anyhow::Error::msg)?;
    writeln!(out, "Saved settings.")?;
    describe(&stored, &mut out)
}

/// Never prints the key itself.
fn describe<W: Write>(settings: &AiSettings, out: &mut W) -> Result<()> {
    writeln!(out, "provider: {}", or_na(&settings.provider))?;
    writeln!(out, "model:    {}", or_na(&settings.model))?;
    writeln!(
        out,
        "api key:  {}",
        if settings.api_key.is_empty() { "not set" } else { "set" }
    )?;
    writeln!(
        out,
        "AI:       {}",
        if roster_core::ai_configured(settings) { "configured" } else { "off" }
    )?;
    Ok(())
}
