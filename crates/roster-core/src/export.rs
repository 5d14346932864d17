use std::io::{self, Write};

use crate::User;

const HEADER: [&str; 6] = ["id", "name", "email", "phone", "city", "created_at"];

/// Write users as CSV with a header row. Fields are quoted only when needed.
pub fn write_csv<W: Write>(users: &[User], mut out: W) -> io::Result<()> {
    write_row(&mut out, &HEADER)?;
    for user in users {
        let created = user.created_at.to_rfc3339();
        write_row(
            &mut out,
            &[
                user.id.as_str(),
                user.name.as_str(),
                user.email.as_str(),
                user.phone.as_str(),
                user.city.as_str(),
                created.as_str(),
            ],
        )?;
    }
    out.flush()
}

pub fn to_csv_string(users: &[User]) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_csv(users, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

fn write_row<W: Write>(out: &mut W, fields: &[&str]) -> io::Result<()> {
    let line: Vec<String> = fields.iter().map(|f| escape(f)).collect();
    writeln!(out, "{}", line.join(","))
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
