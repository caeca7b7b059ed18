//! Scripted [`RecallBackend`] used by state-machine tests.
//!
//! Responses are queued per endpoint and popped as calls resolve; a queue
//! miss panics so tests fail loudly on unexpected calls. Individual calls can
//! be gated on a oneshot channel to make resolution order deterministic when
//! a test needs a slow request to finish after a fast one — a gated call
//! blocks before taking its response, so script responses in the order calls
//! are released, not the order they are issued.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use super::models::{
    ActivityDay, Credentials, PageMeta, Problem, ProblemDraft, ProblemPage, ProblemPatch,
    SignupDetails, UserIdentity,
};
use super::{ApiResult, RecallBackend};

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    calls: Mutex<Vec<String>>,
    me_q: Mutex<VecDeque<ApiResult<UserIdentity>>>,
    login_q: Mutex<VecDeque<ApiResult<()>>>,
    signup_q: Mutex<VecDeque<ApiResult<()>>>,
    logout_q: Mutex<VecDeque<ApiResult<()>>>,
    list_q: Mutex<VecDeque<ApiResult<ProblemPage>>>,
    problem_q: Mutex<VecDeque<ApiResult<Problem>>>,
    review_q: Mutex<VecDeque<ApiResult<Problem>>>,
    activity_q: Mutex<VecDeque<ApiResult<Vec<ActivityDay>>>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    started: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_me(&self, result: ApiResult<UserIdentity>) {
        self.me_q.lock().push_back(result);
    }

    pub fn script_login(&self, result: ApiResult<()>) {
        self.login_q.lock().push_back(result);
    }

    pub fn script_signup(&self, result: ApiResult<()>) {
        self.signup_q.lock().push_back(result);
    }

    pub fn script_logout(&self, result: ApiResult<()>) {
        self.logout_q.lock().push_back(result);
    }

    /// Queue a list response, consumed by `list_due` and `list_all` alike;
    /// the call log records which endpoint actually fired.
    pub fn script_list(&self, result: ApiResult<ProblemPage>) {
        self.list_q.lock().push_back(result);
    }

    /// Queue a problem response, consumed by `create_problem`, `get_problem`
    /// and `update_problem` alike.
    pub fn script_problem(&self, result: ApiResult<Problem>) {
        self.problem_q.lock().push_back(result);
    }

    pub fn script_review(&self, result: ApiResult<Problem>) {
        self.review_q.lock().push_back(result);
    }

    pub fn script_activity(&self, result: ApiResult<Vec<ActivityDay>>) {
        self.activity_q.lock().push_back(result);
    }

    /// Block the call with the given tag until the returned sender fires
    /// (or is dropped).
    pub fn gate(&self, tag: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(tag.to_string(), rx);
        tx
    }

    /// Stream of call tags in the order calls arrive at the backend.
    pub fn watch_calls(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.started.lock() = Some(tx);
        rx
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    async fn enter(&self, tag: String) {
        self.calls.lock().push(tag.clone());
        if let Some(tx) = &*self.started.lock() {
            let _ = tx.send(tag.clone());
        }
        let gate = self.gates.lock().remove(&tag);
        if let Some(rx) = gate {
            let _ = rx.await;
        }
    }

    fn pop<T>(queue: &Mutex<VecDeque<ApiResult<T>>>, tag: &str) -> ApiResult<T> {
        queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted response for {tag}"))
    }
}

#[async_trait]
impl RecallBackend for ScriptedBackend {
    async fn me(&self) -> ApiResult<UserIdentity> {
        self.enter("me".to_string()).await;
        Self::pop(&self.me_q, "me")
    }

    async fn login(&self, _credentials: &Credentials) -> ApiResult<()> {
        self.enter("login".to_string()).await;
        Self::pop(&self.login_q, "login")
    }

    async fn signup(&self, _details: &SignupDetails) -> ApiResult<()> {
        self.enter("signup".to_string()).await;
        Self::pop(&self.signup_q, "signup")
    }

    async fn logout(&self) -> ApiResult<()> {
        self.enter("logout".to_string()).await;
        Self::pop(&self.logout_q, "logout")
    }

    async fn list_due(&self, page: u32, limit: u32) -> ApiResult<ProblemPage> {
        self.enter(format!("due:{page}:{limit}")).await;
        Self::pop(&self.list_q, "list_due")
    }

    async fn list_all(&self, search: &str, page: u32, limit: u32) -> ApiResult<ProblemPage> {
        self.enter(format!("all:{search}:{page}:{limit}")).await;
        Self::pop(&self.list_q, "list_all")
    }

    async fn create_problem(&self, _draft: &ProblemDraft) -> ApiResult<Problem> {
        self.enter("create".to_string()).await;
        Self::pop(&self.problem_q, "create_problem")
    }

    async fn get_problem(&self, id: i64) -> ApiResult<Problem> {
        self.enter(format!("get:{id}")).await;
        Self::pop(&self.problem_q, "get_problem")
    }

    async fn update_problem(&self, id: i64, _patch: &ProblemPatch) -> ApiResult<Problem> {
        self.enter(format!("update:{id}")).await;
        Self::pop(&self.problem_q, "update_problem")
    }

    async fn review_problem(&self, id: i64, is_easy: bool) -> ApiResult<Problem> {
        self.enter(format!("review:{id}:{is_easy}")).await;
        Self::pop(&self.review_q, "review_problem")
    }

    async fn activity(&self, months: u32) -> ApiResult<Vec<ActivityDay>> {
        self.enter(format!("activity:{months}")).await;
        Self::pop(&self.activity_q, "activity")
    }
}

pub(crate) fn identity(id: i64, name: &str, email: &str) -> UserIdentity {
    UserIdentity {
        id,
        name: name.to_string(),
        email: email.to_string(),
    }
}

pub(crate) fn problem(id: i64, title: &str) -> Problem {
    Problem {
        id,
        created_at: "2025-09-01T10:00:00Z".to_string(),
        updated_at: "2025-09-01T10:00:00Z".to_string(),
        deleted_at: None,
        user_id: 1,
        title: title.to_string(),
        link: format!("https://leetcode.com/problems/p{id}"),
        approach: String::new(),
        code: String::new(),
        language: "python".to_string(),
        current_streak: 0,
        next_review_date: "2025-09-20T00:00:00Z".to_string(),
    }
}

pub(crate) fn page(
    problems: Vec<Problem>,
    current_page: i64,
    page_size: i64,
    total_records: i64,
) -> ProblemPage {
    let total_pages = if total_records == 0 {
        0
    } else {
        (total_records + page_size - 1) / page_size
    };
    ProblemPage {
        problems,
        meta: PageMeta {
            total_records,
            current_page,
            page_size,
            total_pages,
        },
    }
}
