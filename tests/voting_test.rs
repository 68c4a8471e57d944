//! Voting and acceptance behaviour against the in-memory store

use bson::oid::ObjectId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use qanda::auth::Identity;
use qanda::db::schemas::{
    AnswerDoc, QuestionDoc, TargetKind, UserDoc, VoteDirection, VoteDoc,
};
use qanda::store::{ContentStore, MemoryStore};
use qanda::voting::{VoteTransition, VotingService, ACCEPT_BONUS};
use qanda::QandaError;

// =============================================================================
// Fixtures
// =============================================================================

async fn question_by(store: &dyn ContentStore, author: ObjectId) -> ObjectId {
    store
        .insert_question(QuestionDoc::new(
            author,
            "Make or do?".into(),
            "Do I make or do my homework?".into(),
            vec!["collocations".into()],
        ))
        .await
        .unwrap()
}

async fn answer_by(store: &dyn ContentStore, question: ObjectId, author: ObjectId) -> ObjectId {
    store
        .insert_answer(AnswerDoc::new(question, author, "You do homework.".into()))
        .await
        .unwrap()
}

async fn reputation(store: &dyn ContentStore, user: ObjectId) -> i64 {
    store
        .find_user(user)
        .await
        .unwrap()
        .map(|u| u.reputation)
        .unwrap_or(0)
}

async fn question_votes(store: &dyn ContentStore, id: ObjectId) -> i64 {
    store.find_question(id).await.unwrap().unwrap().votes
}

async fn answer_doc(store: &dyn ContentStore, id: ObjectId) -> AnswerDoc {
    store.find_answer(id).await.unwrap().unwrap()
}

// =============================================================================
// Votes
// =============================================================================

#[tokio::test]
async fn test_question_vote_toggle_then_down() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store.clone());
    let author = ObjectId::new();
    let voter = ObjectId::new();
    let q = question_by(store.as_ref(), author).await;

    let first = service
        .cast_vote(voter, TargetKind::Question, q, "up")
        .await
        .unwrap();
    assert_eq!(first.votes, 1);
    assert_eq!(first.transition, VoteTransition::New);
    assert_eq!(reputation(store.as_ref(), author).await, 2);

    let second = service
        .cast_vote(voter, TargetKind::Question, q, "up")
        .await
        .unwrap();
    assert_eq!(second.votes, 0);
    assert_eq!(second.transition, VoteTransition::Retraction);
    assert_eq!(second.direction, None);
    assert_eq!(reputation(store.as_ref(), author).await, 0);
    assert_eq!(store.vote_count(), 0);

    let third = service
        .cast_vote(voter, TargetKind::Question, q, "down")
        .await
        .unwrap();
    assert_eq!(third.votes, -1);
    assert_eq!(third.direction, Some(VoteDirection::Down));
    assert_eq!(reputation(store.as_ref(), author).await, -1);
}

#[tokio::test]
async fn test_answer_flip_moves_twice_the_single_vote() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store.clone());
    let q = question_by(store.as_ref(), ObjectId::new()).await;
    let answerer = ObjectId::new();
    let a = answer_by(store.as_ref(), q, answerer).await;
    let voter = ObjectId::new();

    service
        .cast_vote(voter, TargetKind::Answer, a, "up")
        .await
        .unwrap();
    assert_eq!(reputation(store.as_ref(), answerer).await, 5);

    let flipped = service
        .cast_vote(voter, TargetKind::Answer, a, "down")
        .await
        .unwrap();
    assert_eq!(flipped.transition, VoteTransition::Flip);
    assert_eq!(flipped.votes, -1);
    assert_eq!(reputation(store.as_ref(), answerer).await, -5);

    let back = service
        .cast_vote(voter, TargetKind::Answer, a, "up")
        .await
        .unwrap();
    assert_eq!(back.votes, 1);
    assert_eq!(reputation(store.as_ref(), answerer).await, 5);
    assert_eq!(store.vote_count(), 1);
}

#[tokio::test]
async fn test_at_most_one_ledger_entry_per_voter() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store.clone());
    let q = question_by(store.as_ref(), ObjectId::new()).await;
    let voter = ObjectId::new();

    for direction in ["up", "down", "down", "up", "up", "down", "up"] {
        service
            .cast_vote(voter, TargetKind::Question, q, direction)
            .await
            .unwrap();
        assert!(store.vote_count() <= 1);
        assert_eq!(
            question_votes(store.as_ref(), q).await,
            store.tally_votes(TargetKind::Question, q).await.unwrap()
        );
    }
}

#[tokio::test]
async fn test_reputation_goes_to_author_not_voter() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store.clone());
    let author = ObjectId::new();
    let voter = ObjectId::new();
    let q = question_by(store.as_ref(), author).await;

    service
        .cast_vote(voter, TargetKind::Question, q, "down")
        .await
        .unwrap();

    assert_eq!(reputation(store.as_ref(), author).await, -1);
    assert_eq!(reputation(store.as_ref(), voter).await, 0);
}

#[tokio::test]
async fn test_invalid_direction_changes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store.clone());
    let author = ObjectId::new();
    let q = question_by(store.as_ref(), author).await;

    let err = service
        .cast_vote(ObjectId::new(), TargetKind::Question, q, "Up")
        .await
        .unwrap_err();

    assert!(matches!(err, QandaError::InvalidArgument(_)));
    assert_eq!(question_votes(store.as_ref(), q).await, 0);
    assert_eq!(store.vote_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_voters_lose_no_updates() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(VotingService::new(store.clone()));
    let q = question_by(store.as_ref(), ObjectId::new()).await;
    let answerer = ObjectId::new();
    let a = answer_by(store.as_ref(), q, answerer).await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..50 {
        let service = Arc::clone(&service);
        tasks.spawn(async move {
            service
                .cast_vote(ObjectId::new(), TargetKind::Answer, a, "up")
                .await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(answer_doc(store.as_ref(), a).await.votes, 50);
    assert_eq!(reputation(store.as_ref(), answerer).await, 250);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_voter_racing_keeps_ledger_consistent() {
    let store = Arc::new(MemoryStore::new());
    let service = Arc::new(VotingService::new(store.clone()));
    let author = ObjectId::new();
    let q = question_by(store.as_ref(), author).await;
    let voter = ObjectId::new();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..20 {
        let service = Arc::clone(&service);
        let direction = if i % 3 == 0 { "down" } else { "up" };
        tasks.spawn(async move {
            service
                .cast_vote(voter, TargetKind::Question, q, direction)
                .await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    assert!(store.vote_count() <= 1);
    let votes = question_votes(store.as_ref(), q).await;
    assert_eq!(votes, store.tally_votes(TargetKind::Question, q).await.unwrap());

    let expected_rep = match store.find_vote(voter, TargetKind::Question, q).await.unwrap() {
        Some(v) if v.direction == VoteDirection::Up => 2,
        Some(_) => -1,
        None => 0,
    };
    assert_eq!(reputation(store.as_ref(), author).await, expected_rep);
}

// =============================================================================
// Acceptance
// =============================================================================

#[tokio::test]
async fn test_first_accept_sets_both_sides_and_grants_bonus() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store.clone());
    let asker = ObjectId::new();
    let answerer = ObjectId::new();
    let q = question_by(store.as_ref(), asker).await;
    let a = answer_by(store.as_ref(), q, answerer).await;

    let outcome = service.accept_answer(asker, a).await.unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.question_id, q);
    assert_eq!(outcome.demoted, None);

    assert!(answer_doc(store.as_ref(), a).await.is_accepted);
    assert_eq!(
        store.find_question(q).await.unwrap().unwrap().accepted_answer,
        Some(a)
    );
    assert_eq!(reputation(store.as_ref(), answerer).await, ACCEPT_BONUS);
}

#[tokio::test]
async fn test_switching_accepted_answer() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store.clone());
    let asker = ObjectId::new();
    let u1 = ObjectId::new();
    let u2 = ObjectId::new();
    let q = question_by(store.as_ref(), asker).await;
    let a1 = answer_by(store.as_ref(), q, u1).await;
    let a2 = answer_by(store.as_ref(), q, u2).await;

    service.accept_answer(asker, a1).await.unwrap();
    let u1_after_first = reputation(store.as_ref(), u1).await;

    let outcome = service.accept_answer(asker, a2).await.unwrap();
    assert_eq!(outcome.demoted, Some(a1));

    assert!(!answer_doc(store.as_ref(), a1).await.is_accepted);
    assert!(answer_doc(store.as_ref(), a2).await.is_accepted);
    assert_eq!(
        store.find_question(q).await.unwrap().unwrap().accepted_answer,
        Some(a2)
    );
    assert_eq!(reputation(store.as_ref(), u1).await, u1_after_first);
    assert_eq!(reputation(store.as_ref(), u2).await, ACCEPT_BONUS);
}

#[tokio::test]
async fn test_only_question_author_may_accept() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store.clone());
    let asker = ObjectId::new();
    let answerer = ObjectId::new();
    let q = question_by(store.as_ref(), asker).await;
    let a = answer_by(store.as_ref(), q, answerer).await;

    // Not even the answer's own author
    let err = service.accept_answer(answerer, a).await.unwrap_err();
    assert!(matches!(err, QandaError::Forbidden(_)));

    assert!(!answer_doc(store.as_ref(), a).await.is_accepted);
    assert_eq!(store.find_question(q).await.unwrap().unwrap().accepted_answer, None);
    assert_eq!(reputation(store.as_ref(), answerer).await, 0);
}

#[tokio::test]
async fn test_accept_missing_answer_or_question() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store.clone());

    let err = service
        .accept_answer(ObjectId::new(), ObjectId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, QandaError::NotFound(_)));

    // Answer whose parent question is gone
    let orphan = answer_by(store.as_ref(), ObjectId::new(), ObjectId::new()).await;
    let err = service
        .accept_answer(ObjectId::new(), orphan)
        .await
        .unwrap_err();
    assert!(matches!(err, QandaError::NotFound(_)));
}

#[tokio::test]
async fn test_reaccept_grants_bonus_once() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store.clone());
    let asker = ObjectId::new();
    let answerer = ObjectId::new();
    let q = question_by(store.as_ref(), asker).await;
    let a = answer_by(store.as_ref(), q, answerer).await;

    service.accept_answer(asker, a).await.unwrap();
    let again = service.accept_answer(asker, a).await.unwrap();

    assert!(!again.changed);
    assert_eq!(reputation(store.as_ref(), answerer).await, ACCEPT_BONUS);
}

#[tokio::test]
async fn test_reaccept_repairs_drifted_flag_without_bonus() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store.clone());
    let asker = ObjectId::new();
    let answerer = ObjectId::new();
    let q = question_by(store.as_ref(), asker).await;
    let a = answer_by(store.as_ref(), q, answerer).await;

    service.accept_answer(asker, a).await.unwrap();
    // Question still points at the answer but the flag was lost
    store.set_answer_accepted(a, false).await.unwrap();

    let outcome = service.accept_answer(asker, a).await.unwrap();

    assert!(!outcome.changed);
    assert!(answer_doc(store.as_ref(), a).await.is_accepted);
    assert_eq!(reputation(store.as_ref(), answerer).await, ACCEPT_BONUS);
}

#[tokio::test]
async fn test_accept_when_previous_answer_is_gone() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store.clone());
    let asker = ObjectId::new();
    let answerer = ObjectId::new();
    let q = question_by(store.as_ref(), asker).await;
    let a = answer_by(store.as_ref(), q, answerer).await;

    let gone = ObjectId::new();
    store.set_accepted_answer(q, Some(gone)).await.unwrap();

    let outcome = service.accept_answer(asker, a).await.unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.demoted, Some(gone));
    assert!(answer_doc(store.as_ref(), a).await.is_accepted);
    assert_eq!(
        store.find_question(q).await.unwrap().unwrap().accepted_answer,
        Some(a)
    );
    assert_eq!(reputation(store.as_ref(), answerer).await, ACCEPT_BONUS);
}

#[tokio::test]
async fn test_accept_and_votes_are_independent() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store.clone());
    let asker = ObjectId::new();
    let answerer = ObjectId::new();
    let q = question_by(store.as_ref(), asker).await;
    let a = answer_by(store.as_ref(), q, answerer).await;

    service
        .cast_vote(asker, TargetKind::Answer, a, "up")
        .await
        .unwrap();
    service.accept_answer(asker, a).await.unwrap();

    assert_eq!(reputation(store.as_ref(), answerer).await, 5 + ACCEPT_BONUS);
    assert_eq!(answer_doc(store.as_ref(), a).await.votes, 1);
}

// =============================================================================
// Fault injection
// =============================================================================

/// Delegates to a `MemoryStore` but fails the named operations
struct FaultyStore {
    inner: MemoryStore,
    faults: Mutex<HashSet<&'static str>>,
}

impl FaultyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            faults: Mutex::new(HashSet::new()),
        }
    }

    fn fail(&self, op: &'static str) {
        self.faults.lock().unwrap().insert(op);
    }

    fn heal(&self) {
        self.faults.lock().unwrap().clear();
    }

    fn check(&self, op: &'static str) -> qanda::Result<()> {
        if self.faults.lock().unwrap().contains(op) {
            return Err(QandaError::Database(format!("injected failure in {}", op)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ContentStore for FaultyStore {
    async fn find_question(&self, id: ObjectId) -> qanda::Result<Option<QuestionDoc>> {
        self.inner.find_question(id).await
    }

    async fn find_answer(&self, id: ObjectId) -> qanda::Result<Option<AnswerDoc>> {
        self.inner.find_answer(id).await
    }

    async fn find_user(&self, id: ObjectId) -> qanda::Result<Option<UserDoc>> {
        self.inner.find_user(id).await
    }

    async fn list_questions(&self, limit: i64, skip: u64) -> qanda::Result<Vec<QuestionDoc>> {
        self.inner.list_questions(limit, skip).await
    }

    async fn list_answers(&self, question_id: ObjectId) -> qanda::Result<Vec<AnswerDoc>> {
        self.inner.list_answers(question_id).await
    }

    async fn insert_question(&self, question: QuestionDoc) -> qanda::Result<ObjectId> {
        self.inner.insert_question(question).await
    }

    async fn insert_answer(&self, answer: AnswerDoc) -> qanda::Result<ObjectId> {
        self.inner.insert_answer(answer).await
    }

    async fn ensure_user(&self, identity: &Identity) -> qanda::Result<()> {
        self.inner.ensure_user(identity).await
    }

    async fn find_vote(
        &self,
        voter_id: ObjectId,
        kind: TargetKind,
        target_id: ObjectId,
    ) -> qanda::Result<Option<VoteDoc>> {
        self.inner.find_vote(voter_id, kind, target_id).await
    }

    async fn insert_vote(&self, vote: VoteDoc) -> qanda::Result<()> {
        self.check("insert_vote")?;
        self.inner.insert_vote(vote).await
    }

    async fn set_vote_direction(
        &self,
        voter_id: ObjectId,
        kind: TargetKind,
        target_id: ObjectId,
        direction: VoteDirection,
    ) -> qanda::Result<()> {
        self.check("set_vote_direction")?;
        self.inner
            .set_vote_direction(voter_id, kind, target_id, direction)
            .await
    }

    async fn delete_vote(
        &self,
        voter_id: ObjectId,
        kind: TargetKind,
        target_id: ObjectId,
    ) -> qanda::Result<()> {
        self.check("delete_vote")?;
        self.inner.delete_vote(voter_id, kind, target_id).await
    }

    async fn tally_votes(&self, kind: TargetKind, target_id: ObjectId) -> qanda::Result<i64> {
        self.inner.tally_votes(kind, target_id).await
    }

    async fn increment_votes(
        &self,
        kind: TargetKind,
        target_id: ObjectId,
        delta: i64,
    ) -> qanda::Result<i64> {
        self.check("increment_votes")?;
        self.inner.increment_votes(kind, target_id, delta).await
    }

    async fn set_votes(&self, kind: TargetKind, target_id: ObjectId, votes: i64) -> qanda::Result<()> {
        self.inner.set_votes(kind, target_id, votes).await
    }

    async fn increment_reputation(&self, user_id: ObjectId, delta: i64) -> qanda::Result<i64> {
        self.check("increment_reputation")?;
        self.inner.increment_reputation(user_id, delta).await
    }

    async fn set_answer_accepted(&self, answer_id: ObjectId, accepted: bool) -> qanda::Result<()> {
        self.check("set_answer_accepted")?;
        self.inner.set_answer_accepted(answer_id, accepted).await
    }

    async fn set_accepted_answer(
        &self,
        question_id: ObjectId,
        answer_id: Option<ObjectId>,
    ) -> qanda::Result<()> {
        self.check("set_accepted_answer")?;
        self.inner.set_accepted_answer(question_id, answer_id).await
    }
}

#[tokio::test]
async fn test_failed_count_update_rolls_back_vote() {
    let store = Arc::new(FaultyStore::new());
    let service = VotingService::new(store.clone());
    let author = ObjectId::new();
    let voter = ObjectId::new();
    let q = question_by(store.as_ref(), author).await;

    store.fail("increment_votes");
    let err = service
        .cast_vote(voter, TargetKind::Question, q, "up")
        .await
        .unwrap_err();

    assert!(matches!(err, QandaError::Database(_)));
    assert_eq!(store.inner.vote_count(), 0);
    assert_eq!(reputation(store.as_ref(), author).await, 0);
    assert_eq!(question_votes(store.as_ref(), q).await, 0);
}

#[tokio::test]
async fn test_failed_reputation_update_restores_flipped_vote() {
    let store = Arc::new(FaultyStore::new());
    let service = VotingService::new(store.clone());
    let q = question_by(store.as_ref(), ObjectId::new()).await;
    let answerer = ObjectId::new();
    let a = answer_by(store.as_ref(), q, answerer).await;
    let voter = ObjectId::new();

    service
        .cast_vote(voter, TargetKind::Answer, a, "up")
        .await
        .unwrap();

    store.fail("increment_reputation");
    let err = service
        .cast_vote(voter, TargetKind::Answer, a, "down")
        .await
        .unwrap_err();
    assert!(matches!(err, QandaError::Database(_)));

    let vote = store
        .find_vote(voter, TargetKind::Answer, a)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(vote.direction, VoteDirection::Up);
    assert_eq!(answer_doc(store.as_ref(), a).await.votes, 1);
}

#[tokio::test]
async fn test_rolled_back_retraction_restores_same_vote() {
    let store = Arc::new(FaultyStore::new());
    let service = VotingService::new(store.clone());
    let author = ObjectId::new();
    let voter = ObjectId::new();
    let q = question_by(store.as_ref(), author).await;

    service
        .cast_vote(voter, TargetKind::Question, q, "up")
        .await
        .unwrap();
    let before = store
        .find_vote(voter, TargetKind::Question, q)
        .await
        .unwrap()
        .unwrap();

    store.fail("increment_votes");
    let err = service
        .cast_vote(voter, TargetKind::Question, q, "up")
        .await
        .unwrap_err();
    assert!(matches!(err, QandaError::Database(_)));

    let after = store
        .find_vote(voter, TargetKind::Question, q)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after._id, before._id);
    assert_eq!(after.metadata.created_at, before.metadata.created_at);
    assert_eq!(after.direction, VoteDirection::Up);
    assert_eq!(question_votes(store.as_ref(), q).await, 1);
    assert_eq!(reputation(store.as_ref(), author).await, 2);
}

#[tokio::test]
async fn test_failed_rollback_is_partial_failure_and_reconcile_repairs() {
    let store = Arc::new(FaultyStore::new());
    let service = VotingService::new(store.clone());
    let author = ObjectId::new();
    let q = question_by(store.as_ref(), author).await;

    store.fail("increment_votes");
    store.fail("delete_vote");
    let err = service
        .cast_vote(ObjectId::new(), TargetKind::Question, q, "up")
        .await
        .unwrap_err();
    assert!(matches!(err, QandaError::PartialFailure(_)));

    // Ledger kept the vote, cached count did not
    assert_eq!(store.inner.vote_count(), 1);
    assert_eq!(question_votes(store.as_ref(), q).await, 0);

    store.heal();
    let report = service.reconcile(TargetKind::Question, q).await.unwrap();
    assert_eq!(report.cached, 0);
    assert_eq!(report.actual, 1);
    assert!(report.repaired);
    assert_eq!(question_votes(store.as_ref(), q).await, 1);
}

#[tokio::test]
async fn test_failed_bonus_rolls_back_acceptance_switch() {
    let store = Arc::new(FaultyStore::new());
    let service = VotingService::new(store.clone());
    let asker = ObjectId::new();
    let q = question_by(store.as_ref(), asker).await;
    let a1 = answer_by(store.as_ref(), q, ObjectId::new()).await;
    let u2 = ObjectId::new();
    let a2 = answer_by(store.as_ref(), q, u2).await;

    service.accept_answer(asker, a1).await.unwrap();

    store.fail("increment_reputation");
    let err = service.accept_answer(asker, a2).await.unwrap_err();
    assert!(matches!(err, QandaError::Database(_)));

    assert!(answer_doc(store.as_ref(), a1).await.is_accepted);
    assert!(!answer_doc(store.as_ref(), a2).await.is_accepted);
    assert_eq!(
        store.find_question(q).await.unwrap().unwrap().accepted_answer,
        Some(a1)
    );
    assert_eq!(reputation(store.as_ref(), u2).await, 0);
}

#[tokio::test]
async fn test_reconcile_missing_target() {
    let store = Arc::new(MemoryStore::new());
    let service = VotingService::new(store);

    let err = service
        .reconcile(TargetKind::Answer, ObjectId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, QandaError::NotFound(_)));
}
