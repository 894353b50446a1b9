//! Owner-ID names whose tasks and notes a store holds

use serde_derive::{Deserialize, Serialize};
use std::convert::TryFrom;
use thiserror::*;

/// Owner used when nobody is signed in. Data kept under it never leaves the process.
pub const LOCAL_OWNER: &str = "session";

/// Owner of a task list: an authenticated user id or the local session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::local()
    }
}

impl<'a> TryFrom<&'a str> for OwnerId {
    type Error = InvalidOwnerId;

    fn try_from(input: &'a str) -> Result<Self, Self::Error> {
        let uid = input.trim();
        if uid.is_empty() {
            return Err(InvalidOwnerId::Empty);
        }
        if uid == LOCAL_OWNER {
            return Err(InvalidOwnerId::Reserved(uid.to_string()));
        }
        Ok(OwnerId(uid.to_string()))
    }
}

impl<'a> TryFrom<&'a String> for OwnerId {
    type Error = InvalidOwnerId;

    fn try_from(input: &'a String) -> Result<Self, Self::Error> {
        OwnerId::try_from(input.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidOwnerId {
    #[error("owner id is empty")]
    Empty,
    #[error("owner id {0} is reserved for local sessions")]
    Reserved(String),
}

impl OwnerId {
    pub fn local() -> Self {
        OwnerId(LOCAL_OWNER.to_string())
    }

    pub fn is_local(&self) -> bool {
        self.0 == LOCAL_OWNER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Maps the identity reported by authentication to an owner
    ///
    /// # Examples
    ///
    /// ```
    /// # use taskado::model::OwnerId;
    /// let signed_out = OwnerId::from_identity(None).unwrap();
    /// assert!(signed_out.is_local());
    ///
    /// let signed_in = OwnerId::from_identity(Some("u-42")).unwrap();
    /// assert_eq!(signed_in.as_str(), "u-42");
    /// ```
    pub fn from_identity(identity: Option<&str>) -> Result<Self, InvalidOwnerId> {
        match identity {
            None => Ok(Self::local()),
            Some(uid) => Self::try_from(uid),
        }
    }
}
