//! Staff users: sign-in bookkeeping, profile edits and pictures

use base64::{engine::general_purpose::STANDARD, Engine};
use sqlx::SqlitePool;
use stacks_common::clock::SharedClock;
use stacks_common::db::{User, UserNameUsername};
use stacks_common::pagination::{BaseFilter, CollectionWithCount};
use stacks_common::{Error, Result};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::users;

/// Folder under the root folder holding profile pictures
pub const PROFILE_PICTURE_FOLDER: &str = "profile-pictures";

pub const NICKNAME_MAX_LENGTH: usize = 50;

/// Accepted picture types and the extension each is stored with
const PICTURE_TYPES: &[(&str, &str)] = &[("image/jpeg", "jpg"), ("image/png", "png")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePicture {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Split a `data:image/png;base64,...` URL into its type and decoded bytes
pub fn parse_data_url(data_url: &str) -> Result<(&'static str, &'static str, Vec<u8>)> {
    let invalid = || Error::InvalidInput("The uploaded picture could not be read.".to_string());

    let rest = data_url.trim().strip_prefix("data:").ok_or_else(invalid)?;
    let (meta, payload) = rest.split_once(',').ok_or_else(invalid)?;
    let mime = meta.strip_suffix(";base64").ok_or_else(invalid)?;

    let (content_type, extension) = PICTURE_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(mime))
        .copied()
        .ok_or_else(|| {
            Error::InvalidInput("Profile pictures must be JPEG or PNG images.".to_string())
        })?;

    let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
    if bytes.is_empty() {
        return Err(invalid());
    }

    Ok((content_type, extension, bytes))
}

fn content_type_for(filename: &str) -> &'static str {
    let extension = filename.rsplit('.').next().unwrap_or_default();
    PICTURE_TYPES
        .iter()
        .find(|(_, ext)| ext.eq_ignore_ascii_case(extension))
        .map(|(content_type, _)| *content_type)
        .unwrap_or("application/octet-stream")
}

#[derive(Clone)]
pub struct UserService {
    db: SqlitePool,
    clock: SharedClock,
    picture_folder: PathBuf,
}

impl UserService {
    pub fn new(db: SqlitePool, clock: SharedClock, root_folder: PathBuf) -> Self {
        Self {
            db,
            clock,
            picture_folder: root_folder.join(PROFILE_PICTURE_FOLDER),
        }
    }

    pub async fn lookup_user(&self, username: &str) -> Result<Option<User>> {
        users::find_by_username(&self.db, username).await
    }

    pub async fn lookup_user_by_email(&self, email: Option<&str>) -> Result<Option<User>> {
        match email.map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => users::find_by_email(&self.db, email).await,
            None => Ok(None),
        }
    }

    async fn resolve_supervisor(&self, user: &mut User) -> Result<()> {
        if let Some(supervisor) = user.supervisor_username.as_deref() {
            match users::find_by_username(&self.db, supervisor).await? {
                Some(found) if found.id != user.id => user.supervisor_id = Some(found.id),
                Some(_) => {}
                None => warn!(supervisor = %supervisor, "Supervisor not found in roster"),
            }
        }
        Ok(())
    }

    pub async fn add_user(&self, mut user: User) -> Result<User> {
        let now = self.clock.now();
        user.created_at = now;
        user.last_seen = user.last_seen.or(Some(now));
        user.last_ldap_update = Some(now);
        self.resolve_supervisor(&mut user).await?;

        user.id = users::add(&self.db, &user).await?;
        info!(user_id = user.id, username = ?user.username, "Added user");
        Ok(user)
    }

    /// A directory user signing in for the first time matched a roster row
    /// by email; the roster row takes on the directory identity
    pub async fn update_roster_user(&self, roster_user_id: i64, user: User) -> Result<User> {
        let mut roster_user = users::find(&self.db, roster_user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User id {} could not be found.", roster_user_id)))?;

        let now = self.clock.now();
        roster_user.username = user.username;
        roster_user.name = user.name.or(roster_user.name);
        roster_user.email = user.email.or(roster_user.email);
        roster_user.title = user.title.or(roster_user.title);
        roster_user.phone = user.phone.or(roster_user.phone);
        roster_user.supervisor_username = user.supervisor_username;
        roster_user.last_seen = Some(now);
        roster_user.last_ldap_update = Some(now);
        roster_user.reauthenticate_user = false;
        roster_user.updated_at = Some(now);
        self.resolve_supervisor(&mut roster_user).await?;

        users::update(&self.db, &roster_user).await?;
        Ok(roster_user)
    }

    /// Record a sign-in for an existing user
    pub async fn logged_in_update(&self, mut user: User) -> Result<User> {
        let now = self.clock.now();
        user.last_seen = Some(now);
        user.last_ldap_update = Some(now);
        user.reauthenticate_user = false;
        self.resolve_supervisor(&mut user).await?;

        users::update(&self.db, &user).await?;
        Ok(user)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        users::find(&self.db, id).await
    }

    pub async fn get_direct_reports(&self, supervisor_id: i64) -> Result<Vec<UserNameUsername>> {
        users::get_direct_reports(&self.db, supervisor_id).await
    }

    pub async fn get_name_username(&self, id: i64) -> Result<Option<UserNameUsername>> {
        users::get_name_username(&self.db, id).await
    }

    pub async fn get_supervisor(&self, user_id: i64) -> Result<Option<User>> {
        users::get_supervisor(&self.db, user_id).await
    }

    pub async fn search(
        &self,
        filter: &BaseFilter,
        text: Option<&str>,
    ) -> Result<CollectionWithCount<User>> {
        users::search(&self.db, filter, text).await
    }

    async fn require(&self, id: i64) -> Result<User> {
        users::find(&self.db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User id {} could not be found.", id)))
    }

    pub async fn edit_nickname(&self, user_id: i64, nickname: &str, editor_id: i64) -> Result<User> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(Error::InvalidInput("Nickname cannot be empty.".to_string()));
        }
        if nickname.chars().count() > NICKNAME_MAX_LENGTH {
            return Err(Error::InvalidInput(format!(
                "Nickname cannot be longer than {} characters.",
                NICKNAME_MAX_LENGTH
            )));
        }

        let mut user = self.require(user_id).await?;
        user.nickname = Some(nickname.to_string());
        user.updated_at = Some(self.clock.now());
        user.updated_by = Some(editor_id);
        users::update(&self.db, &user).await?;
        Ok(user)
    }

    /// Pin the user to a location chosen by hand
    pub async fn update_location(&self, user_id: i64, location_id: i64, editor_id: i64) -> Result<User> {
        let mut user = self.require(user_id).await?;
        user.associated_location = Some(location_id);
        user.is_location_manual = true;
        user.updated_at = Some(self.clock.now());
        user.updated_by = Some(editor_id);
        users::update(&self.db, &user).await?;
        Ok(user)
    }

    /// Let the roster import manage the user's location again
    pub async fn unset_manual_location(&self, user_id: i64, editor_id: i64) -> Result<User> {
        let mut user = self.require(user_id).await?;
        user.is_location_manual = false;
        user.updated_at = Some(self.clock.now());
        user.updated_by = Some(editor_id);
        users::update(&self.db, &user).await?;
        Ok(user)
    }

    pub async fn get_profile_picture(&self, user_id: i64) -> Result<Option<ProfilePicture>> {
        let Some(filename) = users::get_profile_picture_filename(&self.db, user_id).await? else {
            return Ok(None);
        };

        match tokio::fs::read(self.picture_folder.join(&filename)).await {
            Ok(bytes) => Ok(Some(ProfilePicture {
                content_type: content_type_for(&filename),
                bytes,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(user_id, filename = %filename, "Profile picture file is missing");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the user's picture with an uploaded data URL
    pub async fn upload_picture(&self, user_id: i64, data_url: &str, editor_id: i64) -> Result<User> {
        let (_, extension, bytes) = parse_data_url(data_url)?;
        let mut user = self.require(user_id).await?;

        tokio::fs::create_dir_all(&self.picture_folder).await?;
        let filename = format!("{}-{}.{}", user_id, Uuid::new_v4().simple(), extension);
        tokio::fs::write(self.picture_folder.join(&filename), &bytes).await?;

        let previous = user.picture_filename.replace(filename);
        user.updated_at = Some(self.clock.now());
        user.updated_by = Some(editor_id);
        users::update(&self.db, &user).await?;

        if let Some(previous) = previous {
            self.delete_picture_file(&previous).await;
        }

        info!(user_id, size = bytes.len(), "Updated profile picture");
        Ok(user)
    }

    pub async fn remove_picture(&self, user_id: i64, editor_id: i64) -> Result<User> {
        let mut user = self.require(user_id).await?;
        let previous = user.picture_filename.take();
        user.updated_at = Some(self.clock.now());
        user.updated_by = Some(editor_id);
        users::update(&self.db, &user).await?;

        if let Some(previous) = previous {
            self.delete_picture_file(&previous).await;
        }
        Ok(user)
    }

    async fn delete_picture_file(&self, filename: &str) {
        if let Err(e) = tokio::fs::remove_file(self.picture_folder.join(filename)).await {
            warn!(filename = %filename, "Unable to remove old profile picture: {}", e);
        }
    }

    /// Flag the user so their next request signs in again
    pub async fn request_reauthentication(&self, user_id: i64) -> Result<()> {
        let mut user = self.require(user_id).await?;
        user.reauthenticate_user = true;
        users::update(&self.db, &user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn test_parse_data_url_accepts_png_and_jpeg() {
        let (content_type, extension, bytes) = parse_data_url(PNG_DATA_URL).unwrap();
        assert_eq!(content_type, "image/png");
        assert_eq!(extension, "png");
        assert_eq!(&bytes[1..4], b"PNG");

        let (_, extension, _) = parse_data_url("data:image/JPEG;base64,/9j/4AA=").unwrap();
        assert_eq!(extension, "jpg");
    }

    #[test]
    fn test_parse_data_url_rejects_other_types() {
        let err = parse_data_url("data:image/gif;base64,R0lGODlh").unwrap_err();
        assert_eq!(err.to_string(), "Profile pictures must be JPEG or PNG images.");

        assert!(parse_data_url("not a data url").is_err());
        assert!(parse_data_url("data:image/png;base64,***").is_err());
    }

    #[test]
    fn test_content_type_for_stored_file() {
        assert_eq!(content_type_for("7-abc.jpg"), "image/jpeg");
        assert_eq!(content_type_for("7-abc.png"), "image/png");
    }
}
