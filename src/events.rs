//! Listener registry for engine events.
//!
//! Callbacks run synchronously on the caller's task, after the registry lock
//! is released. A panicking listener is logged and skipped; the others still run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::context::ContextUpdate;
use crate::result::{AnalysisResult, EmotionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "onAnalysisComplete")]
    AnalysisComplete,
    #[serde(rename = "onEmotionDetected")]
    EmotionDetected,
    #[serde(rename = "onContextUpdate")]
    ContextUpdate,
    #[serde(rename = "onError")]
    Error,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalysisComplete => "onAnalysisComplete",
            Self::EmotionDetected => "onEmotionDetected",
            Self::ContextUpdate => "onContextUpdate",
            Self::Error => "onError",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "onAnalysisComplete" => Ok(Self::AnalysisComplete),
            "onEmotionDetected" => Ok(Self::EmotionDetected),
            "onContextUpdate" => Ok(Self::ContextUpdate),
            "onError" => Ok(Self::Error),
            other => Err(format!("unknown event: {other}")),
        }
    }
}

/// Payload of `onError`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisFailure {
    pub id: String,
    pub text: String,
    pub error_message: String,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    AnalysisComplete(AnalysisResult),
    EmotionDetected(EmotionResult),
    ContextUpdate(ContextUpdate),
    Error(AnalysisFailure),
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::AnalysisComplete(_) => EventKind::AnalysisComplete,
            Self::EmotionDetected(_) => EventKind::EmotionDetected,
            Self::ContextUpdate(_) => EventKind::ContextUpdate,
            Self::Error(_) => EventKind::Error,
        }
    }
}

pub type Listener = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// How `off` identifies a registration: by id or by the callback `Arc` itself.
pub enum ListenerRef<'a> {
    Id(&'a str),
    Callback(&'a Listener),
}

impl<'a> From<&'a str> for ListenerRef<'a> {
    fn from(id: &'a str) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a String> for ListenerRef<'a> {
    fn from(id: &'a String) -> Self {
        Self::Id(id.as_str())
    }
}

impl<'a> From<&'a Listener> for ListenerRef<'a> {
    fn from(cb: &'a Listener) -> Self {
        Self::Callback(cb)
    }
}

struct Registration {
    id: String,
    callback: Listener,
}

#[derive(Default)]
pub struct ListenerRegistry {
    inner: RwLock<HashMap<EventKind, Vec<Registration>>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn on(&self, kind: EventKind, callback: Listener) -> String {
        let id = format!("listener_{}", Uuid::new_v4().simple());
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        g.entry(kind).or_default().push(Registration {
            id: id.clone(),
            callback,
        });
        id
    }

    /// Removes the first matching registration.
    pub fn off<'a>(&self, kind: EventKind, which: impl Into<ListenerRef<'a>>) -> bool {
        let which = which.into();
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        let Some(list) = g.get_mut(&kind) else {
            return false;
        };
        let pos = list.iter().position(|r| match &which {
            ListenerRef::Id(id) => r.id == *id,
            ListenerRef::Callback(cb) => Arc::ptr_eq(&r.callback, cb),
        });
        match pos {
            Some(i) => {
                list.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn emit(&self, event: &EngineEvent) {
        let kind = event.kind();
        let callbacks: Vec<(String, Listener)> = {
            let g = self.inner.read().unwrap_or_else(|p| p.into_inner());
            match g.get(&kind) {
                Some(list) => list
                    .iter()
                    .map(|r| (r.id.clone(), Arc::clone(&r.callback)))
                    .collect(),
                None => return,
            }
        };

        for (id, cb) in callbacks {
            if catch_unwind(AssertUnwindSafe(|| cb(event))).is_err() {
                tracing::error!(event = %kind, listener = %id, "listener panicked");
            }
        }
    }

    pub fn len(&self) -> usize {
        let g = self.inner.read().unwrap_or_else(|p| p.into_inner());
        g.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }
}
