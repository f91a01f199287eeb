//! Test doubles shared by the pipeline unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tag_resolver::{ResolveError, Resolver};

#[derive(Clone)]
pub(crate) enum Answer {
    Commit(&'static str),
    Empty,
    NotFound,
    Auth,
    AlreadyKnown,
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Resolver stub answering from a fixed table; unknown keys are `NotFound`.
pub(crate) struct StubResolver {
    answers: HashMap<(String, String), Answer>,
    delays: HashMap<(String, String), Duration>,
    hooks: HashMap<(String, String), Hook>,
    calls: Mutex<Vec<(String, String)>>,
    total: AtomicUsize,
}

impl StubResolver {
    pub(crate) fn new() -> Self {
        Self {
            answers: HashMap::new(),
            delays: HashMap::new(),
            hooks: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            total: AtomicUsize::new(0),
        }
    }

    pub(crate) fn answer(mut self, identity: &str, tag: &str, answer: Answer) -> Self {
        self.answers
            .insert((identity.to_string(), tag.to_string()), answer);
        self
    }

    pub(crate) fn commit(self, identity: &str, tag: &str, sha: &'static str) -> Self {
        self.answer(identity, tag, Answer::Commit(sha))
    }

    pub(crate) fn delay(mut self, identity: &str, tag: &str, ms: u64) -> Self {
        self.delays.insert(
            (identity.to_string(), tag.to_string()),
            Duration::from_millis(ms),
        );
        self
    }

    /// Run `hook` inside the lookup of this key, before it answers.
    pub(crate) fn before(
        mut self,
        identity: &str,
        tag: &str,
        hook: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.hooks
            .insert((identity.to_string(), tag.to_string()), Box::new(hook));
        self
    }

    pub(crate) fn calls_for(&self, identity: &str, tag: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(i, t)| i == identity && t == tag)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Resolver for StubResolver {
    async fn resolve(&self, identity: &str, tag: &str) -> tag_resolver::Result<String> {
        let key = (identity.to_string(), tag.to_string());
        self.calls.lock().unwrap().push(key.clone());
        self.total.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(hook) = self.hooks.get(&key) {
            hook();
        }

        match self.answers.get(&key).cloned() {
            Some(Answer::Commit(sha)) => Ok(sha.to_string()),
            Some(Answer::Empty) => Ok(String::new()),
            Some(Answer::Auth) => Err(ResolveError::Auth("bad token".into())),
            Some(Answer::AlreadyKnown) => Err(ResolveError::AlreadyKnown(identity.into())),
            Some(Answer::NotFound) | None => Err(ResolveError::NotFound {
                identity: identity.into(),
                tag: tag.into(),
            }),
        }
    }
}

/// Make `dir` unusable for new files while keeping its contents readable:
/// the directory moves to `<dir>.moved` and a plain file takes its place.
/// Returns the new location of the old contents.
pub(crate) fn displace_dir(dir: &Path) -> PathBuf {
    let moved = dir.with_extension("moved");
    std::fs::rename(dir, &moved).unwrap();
    std::fs::write(dir, "").unwrap();
    moved
}
