//! Submission service: accepting new artwork and the public gallery.

use bytes::Bytes;
use chrono::TimeDelta;
use davinci_core::{
  contact::Contact,
  object_store::ObjectStore,
  store::{CommunityStore, SubmissionInsert},
  submission::{
    Category, PublicSubmission, ReviewStatus, SkillTier, Submission, SubmissionFilter,
  },
};

use crate::{Community, Error, Result, retry};

pub const MAX_ARTIST_NAME_CHARS: usize = 80;

/// An artwork entry as received from a member.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
  pub artist_name: String,
  pub contact:     String,
  pub skill_tier:  SkillTier,
  pub category:    Category,
  pub file:        Bytes,
}

fn cooldown_out_of_range() -> Error { Error::Validation("cooldown is out of range".into()) }

/// Identify an image by its magic bytes and return its content type.
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
  const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
  const JPEG: &[u8] = b"\xff\xd8\xff";

  if bytes.starts_with(PNG) {
    Some("image/png")
  } else if bytes.starts_with(JPEG) {
    Some("image/jpeg")
  } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
    Some("image/gif")
  } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
    Some("image/webp")
  } else {
    None
  }
}

impl<S, O> Community<S, O>
where
  S: CommunityStore,
  O: ObjectStore,
{
  /// Upload the file and record a pending submission.
  ///
  /// The cooldown is checked before anything is uploaded; the insert itself
  /// re-checks it atomically, and a submission that loses that race has its
  /// file removed again.
  pub async fn submit(&self, request: SubmissionRequest) -> Result<Submission> {
    let settings = self.settings();
    if !settings.submissions_open {
      return Err(Error::SubmissionsClosed);
    }

    let artist_name = request.artist_name.trim();
    if artist_name.is_empty() {
      return Err(Error::Validation("artist name is required".into()));
    }
    if artist_name.chars().count() > MAX_ARTIST_NAME_CHARS {
      return Err(Error::Validation(format!(
        "artist name is longer than {MAX_ARTIST_NAME_CHARS} characters"
      )));
    }
    let contact = Contact::parse(&request.contact)?;
    if !settings.category_open(request.category) {
      return Err(Error::CategoryClosed(request.category));
    }
    if request.file.is_empty() {
      return Err(Error::Validation("file is empty".into()));
    }
    if request.file.len() > settings.max_upload_bytes {
      return Err(Error::Validation(format!(
        "file is larger than {} bytes",
        settings.max_upload_bytes
      )));
    }
    let content_type = sniff_image(&request.file)
      .ok_or_else(|| Error::Validation("file is not a PNG, JPEG, GIF or WEBP image".into()))?;

    let now = self.clock.now();
    let cooldown = settings.cooldown();
    let not_since = now.checked_sub_signed(cooldown).ok_or_else(cooldown_out_of_range)?;
    let store = &self.store;
    let contact_ref = &contact;
    let last = retry::read("last_submission_at", move || store.last_submission_at(contact_ref))
      .await
      .map_err(Error::store)?;
    if let Some(last) = last {
      let until = last.checked_add_signed(cooldown).ok_or_else(cooldown_out_of_range)?;
      let remaining = until - now;
      if remaining > TimeDelta::zero() {
        return Err(Error::CooldownActive { remaining });
      }
    }

    let url = self
      .objects
      .put(request.file, content_type)
      .await
      .map_err(|e| Error::UploadFailed(Box::new(e)))?;

    let submission = Submission::pending(
      artist_name.to_owned(),
      contact,
      request.skill_tier,
      request.category,
      url,
      now,
    );

    match self.store.insert_submission(submission.clone(), not_since).await {
      Ok(SubmissionInsert::Inserted) => {
        tracing::info!(
          id = %submission.id,
          tier = %submission.skill_tier,
          category = %submission.category,
          "submission received"
        );
        Ok(submission)
      }
      Ok(SubmissionInsert::CoolingDown { last }) => {
        tracing::debug!(contact = %submission.contact, "submission lost cooldown race");
        self.discard_file(&submission.file_url).await;
        let remaining = last
          .checked_add_signed(cooldown)
          .map_or(TimeDelta::zero(), |until| (until - now).max(TimeDelta::zero()));
        Err(Error::CooldownActive { remaining })
      }
      Err(e) => {
        tracing::warn!(
          url = %submission.file_url,
          error = %e,
          "submission insert failed; uploaded file is orphaned"
        );
        Err(Error::PersistFailed(Box::new(e)))
      }
    }
  }

  /// Approved submissions, newest first, without contacts. The filter's
  /// status is ignored and text only matches artist names.
  pub async fn gallery(&self, filter: SubmissionFilter) -> Result<Vec<PublicSubmission>> {
    let filter = SubmissionFilter {
      status: ReviewStatus::Approved,
      search_contacts: false,
      ..filter
    };
    let store = &self.store;
    let filter = &filter;
    let submissions = retry::read("gallery", move || store.list_submissions(filter))
      .await
      .map_err(Error::store)?;
    Ok(submissions.into_iter().map(PublicSubmission::from).collect())
  }
}
