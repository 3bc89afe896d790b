//! Moderation service: reviewing, approving and rejecting submissions.

use std::collections::{BTreeMap, HashSet};

use chrono::TimeDelta;
use davinci_core::{
  object_store::ObjectStore,
  store::CommunityStore,
  submission::{Category, ReviewStatus, SkillTier, Submission, SubmissionFilter},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{Admin, Community, Error, Result, retry};

const RECENT_LIMIT: usize = 10;

/// Dashboard figures over every stored submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmissionStats {
  pub total:            usize,
  pub pending:          usize,
  pub approved:         usize,
  pub per_tier:         BTreeMap<SkillTier, usize>,
  pub per_category:     BTreeMap<Category, usize>,
  /// Distinct contacts that have submitted.
  pub distinct_artists: usize,
  pub last_seven_days:  usize,
  /// The newest submissions, newest first.
  pub recent:           Vec<Submission>,
}

impl SubmissionStats {
  /// Compute the figures from `submissions`, which must be newest first.
  pub fn compute(submissions: &[Submission], now: chrono::DateTime<chrono::Utc>) -> Self {
    let week_ago = now - TimeDelta::days(7);
    let mut stats = Self {
      total: submissions.len(),
      per_tier: SkillTier::all().map(|t| (t, 0)).collect(),
      per_category: Category::all().map(|c| (c, 0)).collect(),
      ..Default::default()
    };

    let mut artists = HashSet::new();
    for s in submissions {
      if s.approved {
        stats.approved += 1;
      } else {
        stats.pending += 1;
      }
      *stats.per_tier.entry(s.skill_tier).or_default() += 1;
      *stats.per_category.entry(s.category).or_default() += 1;
      if s.created_at >= week_ago {
        stats.last_seven_days += 1;
      }
      artists.insert(&s.contact);
    }
    stats.distinct_artists = artists.len();
    stats.recent = submissions.iter().take(RECENT_LIMIT).cloned().collect();
    stats
  }
}

impl<S, O> Community<S, O>
where
  S: CommunityStore,
  O: ObjectStore,
{
  /// Submissions matching `filter`, newest first.
  pub async fn list_submissions(
    &self,
    _admin: &Admin,
    filter: SubmissionFilter,
  ) -> Result<Vec<Submission>> {
    let store = &self.store;
    let filter = &filter;
    retry::read("list_submissions", move || store.list_submissions(filter))
      .await
      .map_err(Error::store)
  }

  pub async fn list_pending(
    &self,
    admin: &Admin,
    filter: SubmissionFilter,
  ) -> Result<Vec<Submission>> {
    let filter = SubmissionFilter {
      status: ReviewStatus::Pending,
      ..filter
    };
    self.list_submissions(admin, filter).await
  }

  pub async fn list_approved(
    &self,
    admin: &Admin,
    filter: SubmissionFilter,
  ) -> Result<Vec<Submission>> {
    let filter = SubmissionFilter {
      status: ReviewStatus::Approved,
      ..filter
    };
    self.list_submissions(admin, filter).await
  }

  /// Approve a submission. Approval alone does not make it eligible for
  /// voting; that happens when a round is created.
  pub async fn approve(&self, _admin: &Admin, id: Uuid) -> Result<Submission> {
    let submission = self
      .store
      .approve_submission(id, self.clock.now())
      .await
      .map_err(Error::store)?
      .ok_or(Error::SubmissionNotFound(id))?;
    tracing::info!(%id, "submission approved");
    Ok(submission)
  }

  /// Permanently delete a submission, then its file. A file that cannot be
  /// deleted is logged and left behind.
  pub async fn reject(&self, _admin: &Admin, id: Uuid) -> Result<Submission> {
    let submission = self
      .store
      .delete_submission(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::SubmissionNotFound(id))?;
    tracing::info!(%id, approved = submission.approved, "submission deleted");
    self.discard_file(&submission.file_url).await;
    Ok(submission)
  }

  pub async fn stats(&self, admin: &Admin) -> Result<SubmissionStats> {
    let all = self
      .list_submissions(admin, SubmissionFilter {
        status: ReviewStatus::Any,
        ..Default::default()
      })
      .await?;
    Ok(SubmissionStats::compute(&all, self.clock.now()))
  }
}
