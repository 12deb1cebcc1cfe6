// src/grading/aggregator.rs

use std::{
    collections::{BTreeSet, HashMap},
    str::FromStr,
    sync::Arc,
};

use serde::Serialize;
use thiserror::Error;

use crate::{
    config::ScoringConfig,
    models::{
        result::{ContestResult, NewContestResult},
        submission::Submission,
    },
    repository::{QuizRepository, RepositoryError},
};

/// Which submissions count towards a contest result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AggregationPolicy {
    /// Only the most recent submission per question.
    #[default]
    LatestPerQuestion,
    /// Every submission row, resubmissions included.
    AllSubmissions,
}

impl FromStr for AggregationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" => Ok(AggregationPolicy::LatestPerQuestion),
            "all" => Ok(AggregationPolicy::AllSubmissions),
            other => Err(format!("unknown aggregation policy '{}'", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("result for user {user_id} contest {contest_id} conflicted but could not be read back")]
    MissingAfterConflict { user_id: i64, contest_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizeResult {
    pub finalized: bool,
    pub remaining_question_ids: BTreeSet<i64>,
    pub aggregate: Option<ContestResult>,
}

/// Correct count and total time over the submissions selected by `policy`.
pub fn summarize(submissions: &[Submission], policy: AggregationPolicy) -> (i32, i64) {
    let counted: Vec<&Submission> = match policy {
        AggregationPolicy::AllSubmissions => submissions.iter().collect(),
        AggregationPolicy::LatestPerQuestion => {
            let mut latest: HashMap<i64, &Submission> = HashMap::new();
            for s in submissions {
                latest
                    .entry(s.question_id)
                    .and_modify(|current| {
                        if (s.submitted_at, s.id) > (current.submitted_at, current.id) {
                            *current = s;
                        }
                    })
                    .or_insert(s);
            }
            latest.into_values().collect()
        }
    };

    let correct = counted.iter().filter(|s| s.is_correct).count();
    let total_time = counted
        .iter()
        .fold(0i64, |acc, s| acc.saturating_add(s.time_taken_ms));

    (i32::try_from(correct).unwrap_or(i32::MAX), total_time)
}

/// Turns a user's submissions into a single contest result once every
/// question of the contest has been answered.
pub struct CompletionAggregator {
    repo: Arc<dyn QuizRepository>,
    policy: AggregationPolicy,
}

impl CompletionAggregator {
    pub fn new(repo: Arc<dyn QuizRepository>, config: &ScoringConfig) -> Self {
        Self {
            repo,
            policy: config.aggregation_policy,
        }
    }

    /// Must run after the triggering submission is stored.
    ///
    /// Idempotent: when a result already exists the insert conflict is
    /// swallowed and the stored row is returned.
    pub async fn maybe_finalize(
        &self,
        user_id: i64,
        contest_id: i64,
    ) -> Result<FinalizeResult, FinalizeError> {
        let all_question_ids = self.repo.list_question_ids(contest_id).await?;
        let submissions = self.repo.list_user_submissions(user_id, contest_id).await?;

        let answered: BTreeSet<i64> = submissions.iter().map(|s| s.question_id).collect();
        let remaining: BTreeSet<i64> = all_question_ids.difference(&answered).copied().collect();

        if all_question_ids.is_empty() || !remaining.is_empty() {
            return Ok(FinalizeResult {
                finalized: false,
                remaining_question_ids: remaining,
                aggregate: None,
            });
        }

        let (number_of_correct_answers, time_ms) = summarize(&submissions, self.policy);
        let record = NewContestResult {
            user_id,
            contest_id,
            number_of_correct_answers,
            time_ms,
        };

        let aggregate = match self.repo.insert_aggregate_result(record).await {
            Ok(result) => {
                tracing::info!(
                    "User {} finished contest {}: {} correct in {}ms",
                    user_id,
                    contest_id,
                    result.number_of_correct_answers,
                    result.time_ms
                );
                result
            }
            Err(RepositoryError::UniqueViolation(_)) => {
                tracing::debug!(
                    "Result for user {} contest {} already exists",
                    user_id,
                    contest_id
                );
                self.repo
                    .get_aggregate_result(user_id, contest_id)
                    .await?
                    .ok_or(FinalizeError::MissingAfterConflict {
                        user_id,
                        contest_id,
                    })?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(FinalizeResult {
            finalized: true,
            remaining_question_ids: remaining,
            aggregate: Some(aggregate),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::{
        models::{question::Question, submission::NewSubmission},
        repository::MemoryQuizRepository,
    };

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn contest_repo(contest_id: i64, question_ids: &[i64]) -> Arc<MemoryQuizRepository> {
        let repo = Arc::new(MemoryQuizRepository::new());
        for &id in question_ids {
            repo.add_question(
                Question {
                    id,
                    contest_id,
                    query: format!("Q{}", id),
                    number_of_options: 0,
                    description: None,
                },
                Some(vec![1.0, 0.0]),
            );
        }
        repo
    }

    async fn submit(
        repo: &MemoryQuizRepository,
        user_id: i64,
        question_id: i64,
        is_correct: bool,
        time_taken_ms: i64,
        offset_ms: i64,
    ) {
        repo.insert_submission(NewSubmission {
            user_id,
            question_id,
            answer: "a".to_string(),
            similarity: if is_correct { 0.99 } else { 0.5 },
            is_correct,
            time_taken_ms,
            submitted_at: t0() + Duration::milliseconds(offset_ms),
        })
        .await
        .unwrap();
    }

    fn aggregator(
        repo: Arc<MemoryQuizRepository>,
        policy: AggregationPolicy,
    ) -> CompletionAggregator {
        let config = ScoringConfig {
            aggregation_policy: policy,
            ..ScoringConfig::default()
        };
        CompletionAggregator::new(repo, &config)
    }

    #[tokio::test]
    async fn test_incomplete_contest_reports_remaining() {
        let repo = contest_repo(1, &[1, 2, 3]);
        submit(&repo, 9, 1, true, 100, 0).await;
        submit(&repo, 9, 2, false, 200, 10).await;

        let result = aggregator(repo.clone(), AggregationPolicy::default())
            .maybe_finalize(9, 1)
            .await
            .unwrap();

        assert!(!result.finalized);
        assert_eq!(result.remaining_question_ids, BTreeSet::from([3]));
        assert!(result.aggregate.is_none());
        assert_eq!(repo.result_count(), 0);
    }

    #[tokio::test]
    async fn test_complete_contest_creates_result() {
        let repo = contest_repo(1, &[1, 2, 3]);
        submit(&repo, 9, 1, true, 100, 0).await;
        submit(&repo, 9, 2, false, 200, 10).await;
        submit(&repo, 9, 3, true, 300, 20).await;

        let result = aggregator(repo.clone(), AggregationPolicy::default())
            .maybe_finalize(9, 1)
            .await
            .unwrap();

        assert!(result.finalized);
        assert!(result.remaining_question_ids.is_empty());
        let aggregate = result.aggregate.unwrap();
        assert_eq!(aggregate.number_of_correct_answers, 2);
        assert_eq!(aggregate.time_ms, 600);
        assert_eq!(repo.result_count(), 1);
    }

    #[tokio::test]
    async fn test_finalize_twice_creates_one_result() {
        let repo = contest_repo(1, &[1, 2]);
        submit(&repo, 9, 1, true, 100, 0).await;
        submit(&repo, 9, 2, true, 100, 10).await;
        let aggregator = aggregator(repo.clone(), AggregationPolicy::default());

        let first = aggregator.maybe_finalize(9, 1).await.unwrap();
        let second = aggregator.maybe_finalize(9, 1).await.unwrap();

        assert!(first.finalized);
        assert!(second.finalized);
        assert_eq!(first.aggregate, second.aggregate);
        assert_eq!(repo.result_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_finalizers_create_one_result() {
        let repo = contest_repo(1, &[1, 2]);
        submit(&repo, 9, 1, true, 100, 0).await;
        submit(&repo, 9, 2, true, 100, 10).await;
        let aggregator = Arc::new(aggregator(repo.clone(), AggregationPolicy::default()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let aggregator = aggregator.clone();
                tokio::spawn(async move { aggregator.maybe_finalize(9, 1).await })
            })
            .collect();

        for handle in handles {
            let result = handle.await.unwrap().unwrap();
            assert!(result.finalized);
        }
        assert_eq!(repo.result_count(), 1);
    }

    #[tokio::test]
    async fn test_other_users_do_not_complete_contest() {
        let repo = contest_repo(1, &[1, 2]);
        submit(&repo, 9, 1, true, 100, 0).await;
        submit(&repo, 8, 2, true, 100, 10).await;

        let result = aggregator(repo, AggregationPolicy::default())
            .maybe_finalize(9, 1)
            .await
            .unwrap();
        assert_eq!(result.remaining_question_ids, BTreeSet::from([2]));
    }

    #[tokio::test]
    async fn test_contest_without_questions_never_finalizes() {
        let repo = contest_repo(1, &[1]);
        let result = aggregator(repo.clone(), AggregationPolicy::default())
            .maybe_finalize(9, 42)
            .await
            .unwrap();
        assert!(!result.finalized);
        assert!(result.remaining_question_ids.is_empty());
        assert_eq!(repo.result_count(), 0);
    }

    #[tokio::test]
    async fn test_resubmissions_latest_policy() {
        let repo = contest_repo(1, &[1, 2]);
        submit(&repo, 9, 1, false, 1000, 0).await;
        submit(&repo, 9, 1, true, 1500, 10).await;
        submit(&repo, 9, 2, true, 500, 20).await;

        let aggregate = aggregator(repo, AggregationPolicy::LatestPerQuestion)
            .maybe_finalize(9, 1)
            .await
            .unwrap()
            .aggregate
            .unwrap();
        assert_eq!(aggregate.number_of_correct_answers, 2);
        assert_eq!(aggregate.time_ms, 2000);
    }

    #[tokio::test]
    async fn test_resubmissions_all_policy() {
        let repo = contest_repo(1, &[1, 2]);
        submit(&repo, 9, 1, true, 1000, 0).await;
        submit(&repo, 9, 1, true, 1500, 10).await;
        submit(&repo, 9, 2, false, 500, 20).await;

        let aggregate = aggregator(repo, AggregationPolicy::AllSubmissions)
            .maybe_finalize(9, 1)
            .await
            .unwrap()
            .aggregate
            .unwrap();
        assert_eq!(aggregate.number_of_correct_answers, 2);
        assert_eq!(aggregate.time_ms, 3000);
    }

    #[test]
    fn test_summarize_latest_breaks_ties_by_id() {
        let at = t0();
        let row = |id, is_correct, time_taken_ms| Submission {
            id,
            user_id: 1,
            question_id: 1,
            answer: String::new(),
            similarity: 0.0,
            is_correct,
            time_taken_ms,
            submitted_at: at,
        };
        let rows = vec![row(2, true, 50), row(1, false, 10)];
        assert_eq!(summarize(&rows, AggregationPolicy::LatestPerQuestion), (1, 50));
        assert_eq!(summarize(&rows, AggregationPolicy::AllSubmissions), (1, 60));
        assert_eq!(summarize(&[], AggregationPolicy::AllSubmissions), (0, 0));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("latest".parse::<AggregationPolicy>(), Ok(AggregationPolicy::LatestPerQuestion));
        assert_eq!("ALL".parse::<AggregationPolicy>(), Ok(AggregationPolicy::AllSubmissions));
        assert!("best".parse::<AggregationPolicy>().is_err());
    }
}
