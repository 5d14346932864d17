use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;

use crate::{NewUser, User, UserPatch, UNSTAMPED};

#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    DuplicateId(String),
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "user '{}' not found", id),
            StoreError::DuplicateId(id) => write!(f, "a user with id '{}' already exists", id),
            StoreError::Io(e) => write!(f, "I/O error: {}", e),
            StoreError::Json(e) => write!(f, "malformed user file: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}

/// User records persisted as one JSON array.
///
/// Every call re-reads the file under the table lock, so hand edits and
/// writes from other processes are picked up. Writes replace the whole file
/// atomically (temp file + rename). Across processes the last writer wins.
pub struct UserStore {
    path: PathBuf,
    users: Mutex<Vec<User>>,
}

impl UserStore {
    /// Bind to `path`. A missing file is an empty collection.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let users = load(&path)?;
        log::debug!("opened {} ({} users)", path.display(), users.len());
        Ok(Self {
            path,
            users: Mutex::new(users),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read<T>(&self, f: impl FnOnce(&[User]) -> T) -> Result<T, StoreError> {
        let mut table = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        *table = load(&self.path)?;
        Ok(f(&table))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut Vec<User>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut table = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        *table = load(&self.path)?;
        let out = f(&mut table)?;
        save(&self.path, &table)?;
        Ok(out)
    }

    /// Create a record with a generated id and timestamp.
    pub fn add(&self, new: NewUser) -> Result<User, StoreError> {
        let user = User::new(new);
        self.insert(user.clone())?;
        Ok(user)
    }

    /// Append a fully formed record. Fails if the id is taken.
    pub fn insert(&self, user: User) -> Result<(), StoreError> {
        self.write(|users| {
            if users.iter().any(|u| u.id == user.id) {
                return Err(StoreError::DuplicateId(user.id));
            }
            log::debug!("adding user {} ({})", user.id, user.name);
            users.push(user);
            Ok(())
        })
    }

    /// Look up by id first, then by case-insensitive name. First match wins.
    pub fn get(&self, id: Option<&str>, name: Option<&str>) -> Result<Option<User>, StoreError> {
        self.read(|users| {
            if let Some(id) = id {
                if let Some(u) = users.iter().find(|u| u.id == id) {
                    return Some(u.clone());
                }
            }
            name.and_then(|name| users.iter().find(|u| u.name_matches(name)).cloned())
        })
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<User>, StoreError> {
        self.get(None, Some(name))
    }

    /// Merge `patch` into the record with `id` and return the updated record.
    pub fn update(&self, id: &str, patch: &UserPatch) -> Result<User, StoreError> {
        self.write(|users| {
            let user = users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            patch.apply(user);
            Ok(user.clone())
        })
    }

    /// Remove the record with `id`, keeping the order of the rest.
    pub fn delete(&self, id: &str) -> Result<User, StoreError> {
        self.write(|users| {
            let pos = users
                .iter()
                .position(|u| u.id == id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            Ok(users.remove(pos))
        })
    }

    pub fn list(&self) -> Result<Vec<User>, StoreError> {
        self.read(|users| users.to_vec())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        self.read(|users| users.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Case-insensitive substring search over name, email, phone and city.
    /// A blank term matches everything.
    pub fn search(&self, term: &str) -> Result<Vec<User>, StoreError> {
        let term = term.trim().to_lowercase();
        self.read(|users| {
            users
                .iter()
                .filter(|u| term.is_empty() || matches_term(u, &term))
                .cloned()
                .collect()
        })
    }
}

fn matches_term(user: &User, term: &str) -> bool {
    [&user.name, &user.email, &user.phone, &user.city]
        .iter()
        .any(|field| field.to_lowercase().contains(term))
}

fn load(path: &Path) -> Result<Vec<User>, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut users: Vec<User> = serde_json::from_str(&raw)?;
    if stamp_missing(&mut users) > 0 {
        // A read-only file still loads; the times are just not kept.
        if let Err(e) = save(path, &users) {
            log::warn!("could not record creation times in {}: {}", path.display(), e);
        }
    }
    Ok(users)
}

/// Give records that were read without `created_at` the current time.
fn stamp_missing(users: &mut [User]) -> usize {
    let now = Utc::now();
    let mut stamped = 0;
    for user in users.iter_mut().filter(|u| u.created_at == UNSTAMPED) {
        user.created_at = now;
        stamped += 1;
    }
    if stamped > 0 {
        log::debug!("stamped {} users without created_at", stamped);
    }
    stamped
}

fn save(path: &Path, users: &[User]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir)?;
            dir.to_path_buf()
        }
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "users.json".to_string());
    let tmp = dir.join(format!(".{}.tmp", file_name));
    let json = serde_json::to_string_pretty(users)?;
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    log::debug!("wrote {} users to {}", users.len(), path.display());
    Ok(())
}
