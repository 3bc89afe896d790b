//! Contact identifiers — the phone number or email address that keys both the
//! submission cooldown and ballot uniqueness.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A normalised phone number or email address.
///
/// Emails are trimmed and lowercased. Anything without an `@` is treated as a
/// phone number and reduced to its digits, keeping a leading `+`. Two inputs
/// that differ only in formatting therefore compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Contact(String);

impl Contact {
  pub fn parse(raw: &str) -> Result<Self> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      return Err(Error::InvalidContact("contact is empty".into()));
    }

    if trimmed.contains('@') {
      let email = trimmed.to_lowercase();
      let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| Error::InvalidContact(raw.to_owned()))?;
      if local.is_empty() || domain.is_empty() || email.contains(char::is_whitespace) {
        return Err(Error::InvalidContact(format!("malformed email {raw:?}")));
      }
      return Ok(Self(email));
    }

    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
      return Err(Error::InvalidContact(format!("no digits in {raw:?}")));
    }
    if trimmed.starts_with('+') {
      Ok(Self(format!("+{digits}")))
    } else {
      Ok(Self(digits))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for Contact {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for Contact {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

impl From<Contact> for String {
  fn from(c: Contact) -> Self { c.0 }
}
