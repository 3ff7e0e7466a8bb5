//! Test doubles: a span-recording subscriber layer and misbehaving collections.

use crate::error::StoreError;
use crate::store::{CollectionProvider, ConnectionCapability, DocumentCollection};
use async_trait::async_trait;
use bson::{Bson, Document};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::subscriber::DefaultGuard;
use tracing::Subscriber;
use tracing_subscriber::layer::{Context as LayerContext, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

/// Everything the recorder learned about one closed span.
#[derive(Debug, Clone)]
pub struct RecordedSpan {
    pub name: &'static str,
    pub parent: Option<&'static str>,
    pub fields: BTreeMap<String, String>,
}

impl RecordedSpan {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

#[derive(Default)]
struct RecorderState {
    open: HashMap<u64, RecordedSpan>,
    opened: Vec<&'static str>,
    closed: Vec<RecordedSpan>,
}

/// A `Layer` that counts span lifecycle events and captures their fields.
#[derive(Clone, Default)]
pub struct SpanRecorder {
    state: Arc<Mutex<RecorderState>>,
}

impl SpanRecorder {
    /// Installs a fresh recorder as the thread's default subscriber.
    pub fn install() -> (Self, DefaultGuard) {
        let recorder = Self::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        let guard = tracing::subscriber::set_default(subscriber);
        (recorder, guard)
    }

    pub fn opened(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn closed(&self) -> Vec<RecordedSpan> {
        self.state.lock().unwrap().closed.clone()
    }

    pub fn still_open(&self) -> usize {
        self.state.lock().unwrap().open.len()
    }

    pub fn closed_span(&self, name: &str) -> RecordedSpan {
        let closed = self.closed();
        let mut matching = closed.into_iter().filter(|span| span.name == name);
        let span = matching
            .next()
            .unwrap_or_else(|| panic!("no closed span named {name}"));
        assert!(matching.next().is_none(), "span {name} closed more than once");
        span
    }
}

struct FieldVisitor<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S> Layer<S> for SpanRecorder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: LayerContext<'_, S>) {
        let mut fields = BTreeMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        let parent = ctx
            .span(id)
            .and_then(|span| span.parent())
            .map(|parent| parent.name());

        let name = attrs.metadata().name();
        let mut state = self.state.lock().unwrap();
        state.opened.push(name);
        state.open.insert(
            id.into_u64(),
            RecordedSpan {
                name,
                parent,
                fields,
            },
        );
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: LayerContext<'_, S>) {
        let mut state = self.state.lock().unwrap();
        if let Some(span) = state.open.get_mut(&id.into_u64()) {
            values.record(&mut FieldVisitor(&mut span.fields));
        }
    }

    fn on_close(&self, id: Id, _ctx: LayerContext<'_, S>) {
        let mut state = self.state.lock().unwrap();
        if let Some(span) = state.open.remove(&id.into_u64()) {
            state.closed.push(span);
        }
    }
}

/// What a `FakeCollection` does when called.
#[derive(Clone, Copy)]
pub enum Behaviour {
    Fail,
    Hang,
}

/// A collection that either fails every call or never answers.
pub struct FakeCollection {
    behaviour: Behaviour,
    database: String,
    name: String,
}

impl FakeCollection {
    async fn respond<T>(&self) -> Result<T, StoreError> {
        match self.behaviour {
            Behaviour::Fail => Err(StoreError::Backend("store unavailable".to_string())),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(StoreError::Backend("unreachable".to_string()))
            }
        }
    }
}

#[async_trait]
impl DocumentCollection for FakeCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn database_name(&self) -> &str {
        &self.database
    }

    async fn find_all(&self, _filter: Document) -> Result<Vec<Document>, StoreError> {
        self.respond().await
    }

    async fn insert_one(&self, _document: Document) -> Result<Bson, StoreError> {
        self.respond().await
    }

    async fn delete_one(&self, _filter: Document) -> Result<u64, StoreError> {
        self.respond().await
    }
}

/// A connection whose every collection behaves like `FakeCollection`.
#[derive(Clone, Copy)]
pub struct FakeConnection(pub Behaviour);

struct FakeDatabase {
    behaviour: Behaviour,
    name: String,
}

impl CollectionProvider for FakeDatabase {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        Arc::new(FakeCollection {
            behaviour: self.behaviour,
            database: self.name.clone(),
            name: name.to_string(),
        })
    }
}

impl ConnectionCapability for FakeConnection {
    fn database(&self, name: &str) -> Box<dyn CollectionProvider> {
        Box::new(FakeDatabase {
            behaviour: self.0,
            name: name.to_string(),
        })
    }
}
