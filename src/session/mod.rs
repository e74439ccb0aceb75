//! Conversation state machine for the assistant transcript.
//!
//! Owns the ordered transcript and enforces single-flight querying: one
//! answer request at a time, appended user-first so the transcript reflects
//! intent even when the answer fails. Gateway calls run on a worker thread
//! and are applied from `poll` on the owning thread; a generation counter
//! invalidates completions that land after a reset.


use crate::gateway::{AnswerGateway, AnswerReply, GatewayResult};
use crate::logging::{log_debug, log_debug_content};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::SystemTime;

/// Opening message for a brand new conversation.
pub const INITIAL_GREETING: &str = "Hello! I'm your medical information assistant. I can answer questions about health conditions, symptoms, and treatments based on medical literature. How can I help you today?";

/// Opening message after the transcript is cleared.
pub const RESET_GREETING: &str =
    "Hello! I'm your medical information assistant. How can I help you today?";

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One source citation attached to an answer.
#[derive(Clone, Debug, PartialEq)]
pub struct Citation {
    pub title: String,
    pub relevance: f64,
}

/// Answer-only fields. Absent values mean the backend did not provide them,
/// which is distinct from zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnswerMeta {
    pub citations: Vec<Citation>,
    pub confidence: Option<f64>,
    pub served_from_cache: bool,
    pub latency_ms: Option<u64>,
}

/// One message in the transcript. Immutable once appended.
#[derive(Clone, Debug)]
pub struct Utterance {
    pub id: u64,
    pub role: Role,
    pub text: String,
    pub created_at: SystemTime,
    /// Present only on assistant messages produced by the answer gateway.
    pub answer: Option<AnswerMeta>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    AwaitingAnswer,
    Failed(String),
}

/// Result of a `submit` call, for caller-side display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// A query is already in flight; nothing was sent or appended.
    Busy,
    /// The text was empty after trimming; nothing was sent or appended.
    RejectedEmpty,
}

/// Completion surfaced by `poll` once a gateway call settles.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Answered { utterance_id: u64 },
    Failed { message: String },
}

struct AnswerJob {
    generation: u64,
    receiver: mpsc::Receiver<GatewayResult<AnswerReply>>,
    handle: Option<thread::JoinHandle<()>>,
}

pub struct ChatSession {
    id: u64,
    transcript: Vec<Utterance>,
    status: SessionStatus,
    generation: u64,
    next_utterance_id: u64,
    jobs: Vec<AnswerJob>,
    gateway: Arc<dyn AnswerGateway>,
    use_cache: bool,
}

impl ChatSession {
    pub fn new(gateway: Arc<dyn AnswerGateway>, use_cache: bool) -> Self {
        let mut session = Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            transcript: Vec::new(),
            status: SessionStatus::Idle,
            generation: 0,
            next_utterance_id: 0,
            jobs: Vec::new(),
            gateway,
            use_cache,
        };
        session.append(Role::Assistant, INITIAL_GREETING.to_string(), None);
        session
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn transcript(&self) -> &[Utterance] {
        &self.transcript
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn is_awaiting_answer(&self) -> bool {
        matches!(self.status, SessionStatus::AwaitingAnswer)
    }

    /// Submit a user utterance and start the gateway call.
    ///
    /// The user's words are appended before any network interaction and are
    /// never rolled back. While a query is in flight further submissions are
    /// rejected, so at most one network attempt runs per accepted call.
    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        if self.is_awaiting_answer() {
            return SubmitOutcome::Busy;
        }
        let query = text.trim();
        if query.is_empty() {
            return SubmitOutcome::RejectedEmpty;
        }
        let query = query.to_string();

        self.append(Role::User, query.clone(), None);
        // Entering AwaitingAnswer also discards a prior failure message.
        self.status = SessionStatus::AwaitingAnswer;

        log_debug(&format!(
            "session {}: query submitted ({} chars)",
            self.id,
            query.chars().count()
        ));
        log_debug_content(&format!("session {}: query: {query}", self.id));
        tracing::debug!(session = self.id, chars = query.chars().count(), "query submitted");

        let gateway = Arc::clone(&self.gateway);
        let use_cache = self.use_cache;
        let (tx, rx) = mpsc::sync_channel(1);
        let handle = thread::spawn(move || {
            let result = gateway.answer(&query, use_cache);
            let _ = tx.send(result);
        });
        self.jobs.push(AnswerJob {
            generation: self.generation,
            receiver: rx,
            handle: Some(handle),
        });
        SubmitOutcome::Accepted
    }

    /// Replace the transcript with a fresh greeting and return to idle.
    ///
    /// Any in-flight query keeps running but its completion is discarded by
    /// the generation check in `poll`, so stale content cannot reappear.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.transcript.clear();
        self.append(Role::Assistant, RESET_GREETING.to_string(), None);
        self.status = SessionStatus::Idle;
        log_debug(&format!(
            "session {}: reset (generation {})",
            self.id, self.generation
        ));
        tracing::debug!(session = self.id, generation = self.generation, "session reset");
    }

    /// Check worker channels without blocking and apply at most one live
    /// completion. Call from the owning thread's tick.
    pub fn poll(&mut self) -> Option<SessionEvent> {
        let mut event = None;
        let mut index = 0;
        while index < self.jobs.len() {
            match self.jobs[index].receiver.try_recv() {
                Ok(result) => {
                    let job = self.finish_job(index);
                    if job.generation != self.generation {
                        log_debug(&format!(
                            "session {}: discarded answer from generation {}",
                            self.id, job.generation
                        ));
                        continue;
                    }
                    event = Some(self.apply_result(result));
                }
                Err(mpsc::TryRecvError::Empty) => index += 1,
                Err(mpsc::TryRecvError::Disconnected) => {
                    let job = self.finish_job(index);
                    if job.generation != self.generation {
                        continue;
                    }
                    let message = "answer worker disconnected unexpectedly".to_string();
                    self.status = SessionStatus::Failed(message.clone());
                    event = Some(SessionEvent::Failed { message });
                }
            }
        }
        event
    }

    /// Remove the job and join its worker so no handle lingers.
    fn finish_job(&mut self, index: usize) -> AnswerJob {
        let mut job = self.jobs.remove(index);
        if let Some(handle) = job.handle.take() {
            let _ = handle.join();
        }
        job
    }

    fn apply_result(&mut self, result: GatewayResult<AnswerReply>) -> SessionEvent {
        match result {
            Ok(reply) => {
                let latency_ms = reply.latency_ms();
                let meta = AnswerMeta {
                    citations: reply
                        .sources
                        .into_iter()
                        .map(|source| Citation {
                            title: source.title,
                            relevance: source.relevance_score,
                        })
                        .collect(),
                    confidence: reply.confidence,
                    served_from_cache: reply.cached,
                    latency_ms,
                };
                tracing::debug!(
                    session = self.id,
                    cached = meta.served_from_cache,
                    latency_ms = ?meta.latency_ms,
                    "answer applied"
                );
                let utterance_id = self.append(Role::Assistant, reply.text, Some(meta));
                self.status = SessionStatus::Idle;
                log_debug(&format!("session {}: answer applied", self.id));
                SessionEvent::Answered { utterance_id }
            }
            Err(err) => {
                // The failed query's user utterance stays in the transcript;
                // no assistant entry is appended.
                let message = err.to_string();
                self.status = SessionStatus::Failed(message.clone());
                log_debug(&format!("session {}: answer failed: {message}", self.id));
                tracing::debug!(session = self.id, error = %message, "answer failed");
                SessionEvent::Failed { message }
            }
        }
    }

    fn append(&mut self, role: Role, text: String, answer: Option<AnswerMeta>) -> u64 {
        let id = self.next_utterance_id;
        self.next_utterance_id += 1;
        self.transcript.push(Utterance {
            id,
            role,
            text,
            created_at: SystemTime::now(),
            answer,
        });
        id
    }

    #[cfg(test)]
    pub(crate) fn inflight_jobs(&self) -> usize {
        self.jobs.len()
    }
}
