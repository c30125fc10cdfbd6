//! Scripted remote used by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use jobscope_core::{MessageStream, RemoteClient, RemoteError};
use jobscope_proto::{
    Address, Cursor, Entity, EntityStatus, JobAddress, PageMeta, ProjectRef, ResponsePage,
    StreamMessage,
};

pub type Scripted<T> = Result<T, RemoteError>;

/// Stream replaying a fixed list of reads.
pub struct ScriptedStream {
    items: VecDeque<Scripted<StreamMessage>>,
    closes: Arc<AtomicUsize>,
}

impl MessageStream for ScriptedStream {
    async fn next_message(&mut self) -> Option<Scripted<StreamMessage>> {
        self.items.pop_front()
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Remote answering from queues and counting every call.
#[derive(Debug, Default)]
pub struct FakeRemote {
    pub entities: VecDeque<Scripted<Entity>>,
    pub pages: VecDeque<Scripted<ResponsePage>>,
    pub streams: VecDeque<Scripted<Vec<Scripted<StreamMessage>>>>,
    pub fetch_one_calls: Vec<Address>,
    pub fetch_page_calls: Vec<(Address, Option<Cursor>)>,
    pub log_stream_calls: Vec<JobAddress>,
    pub metric_stream_calls: Vec<JobAddress>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: Scripted<Entity>) -> Self {
        self.entities.push_back(entity);
        self
    }

    pub fn with_page(mut self, page: Scripted<ResponsePage>) -> Self {
        self.pages.push_back(page);
        self
    }

    pub fn with_stream(mut self, stream: Scripted<Vec<Scripted<StreamMessage>>>) -> Self {
        self.streams.push_back(stream);
        self
    }

    pub fn total_calls(&self) -> usize {
        self.fetch_one_calls.len()
            + self.fetch_page_calls.len()
            + self.log_stream_calls.len()
            + self.metric_stream_calls.len()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn next_stream(&mut self) -> Scripted<ScriptedStream> {
        let items = self
            .streams
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::Unavailable("no stream scripted".into())))?;
        Ok(ScriptedStream {
            items: items.into(),
            closes: Arc::clone(&self.closes),
        })
    }
}

impl RemoteClient for FakeRemote {
    type Stream = ScriptedStream;

    async fn fetch_one(&mut self, address: &Address) -> Scripted<Entity> {
        self.fetch_one_calls.push(address.clone());
        self.entities
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::Unavailable("no entity scripted".into())))
    }

    async fn fetch_page(
        &mut self,
        address: &Address,
        cursor: Option<&Cursor>,
    ) -> Scripted<ResponsePage> {
        self.fetch_page_calls
            .push((address.clone(), cursor.cloned()));
        self.pages
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::Unavailable("no page scripted".into())))
    }

    async fn open_log_stream(&mut self, job: &JobAddress) -> Scripted<ScriptedStream> {
        self.log_stream_calls.push(job.clone());
        self.next_stream()
    }

    async fn open_metric_stream(&mut self, job: &JobAddress) -> Scripted<ScriptedStream> {
        self.metric_stream_calls.push(job.clone());
        self.next_stream()
    }
}

pub fn project(name: &str) -> ProjectRef {
    ProjectRef::new("adam", name).expect("valid project")
}

pub fn running(id: &str) -> Entity {
    Entity::new(id, Some(EntityStatus::Running))
}

pub fn lines(texts: &[&str]) -> Vec<Scripted<StreamMessage>> {
    texts
        .iter()
        .map(|t| Ok(StreamMessage::log_line(*t)))
        .collect()
}

pub fn page(ids: &[&str], count: u64, next: Option<&str>) -> ResponsePage {
    ResponsePage {
        items: ids.iter().map(|id| running(id)).collect(),
        meta: Some(PageMeta {
            count,
            has_next: next.is_some(),
            has_previous: false,
        }),
        next: next.map(Cursor::new),
    }
}
