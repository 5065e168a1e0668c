#![allow(dead_code)]

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use promo_embed::application::promo::{EmbedPromoManager, PromoOptions};
use promo_embed::application::render::{ComrakPromoRenderer, RenderError, RenderPipeline};
use promo_embed::application::repos::{EntityStore, NodeQuery, RepoError};
use promo_embed::cache::{LOOKUP_BIN, MemoryTagCache, PromoCaches, RENDER_BIN};
use promo_embed::domain::entities::{ContentNode, TextItem};
use promo_embed::domain::types::{NodeId, NodeStatus, PROMO_BUNDLE, TermId};
use promo_embed::infra::memory::MemoryEntityStore;
use time::OffsetDateTime;

pub fn at(seconds: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(seconds).expect("valid timestamp")
}

pub fn article(id: i64, term: Option<i64>, body: &str) -> ContentNode {
    ContentNode {
        id: NodeId(id),
        bundle: "article".to_string(),
        title: format!("Article {id}"),
        status: NodeStatus::Published,
        changed: at(0),
        primary_term: term.map(TermId),
        target_term: None,
        paragraph_offset: None,
        body: vec![TextItem::new(body)],
    }
}

pub fn promo(id: i64, term: i64, changed: i64) -> ContentNode {
    ContentNode {
        id: NodeId(id),
        bundle: PROMO_BUNDLE.to_string(),
        title: format!("Promo {id}"),
        status: NodeStatus::Published,
        changed: at(changed),
        primary_term: None,
        target_term: Some(TermId(term)),
        paragraph_offset: None,
        body: vec![TextItem {
            value: "Read **more**.".to_string(),
            format: "markdown".to_string(),
            langcode: "en".to_string(),
        }],
    }
}

/// `count` paragraphs, `<p>P1</p>` through `<p>Pn</p>`, one per line.
pub fn paragraphs(count: usize) -> String {
    (1..=count).map(|n| format!("<p>P{n}</p>\n")).collect()
}

/// Render pipeline that counts invocations and emits a fixed marker.
#[derive(Default)]
pub struct CountingRenderer {
    calls: AtomicUsize,
}

impl CountingRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn markup_for(node: &ContentNode) -> String {
        format!("<aside data-promo-id=\"{}\">PROMO</aside>\n", node.id)
    }
}

impl RenderPipeline for CountingRenderer {
    fn render(&self, node: &ContentNode, _view_mode: &str) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::markup_for(node))
    }
}

/// Store whose every call fails.
pub struct FailingStore;

#[async_trait]
impl EntityStore for FailingStore {
    async fn load_node(&self, _id: NodeId) -> Result<Option<ContentNode>, RepoError> {
        Err(RepoError::from_persistence("connection refused"))
    }

    async fn query_node_ids(&self, _query: &NodeQuery) -> Result<Vec<NodeId>, RepoError> {
        Err(RepoError::from_persistence("connection refused"))
    }
}

/// Renderer that always fails.
pub struct FailingRenderer;

impl RenderPipeline for FailingRenderer {
    fn render(&self, _node: &ContentNode, _view_mode: &str) -> Result<String, RenderError> {
        Err(RenderError::pipeline("template missing"))
    }
}

/// A manager wired to in-memory parts the test can inspect.
pub struct Harness {
    pub store: Arc<MemoryEntityStore>,
    pub renderer: Arc<CountingRenderer>,
    pub lookup: Arc<MemoryTagCache>,
    pub render: Arc<MemoryTagCache>,
    pub manager: Arc<EmbedPromoManager>,
}

impl Harness {
    pub fn new(nodes: impl IntoIterator<Item = ContentNode>) -> Self {
        let store = Arc::new(MemoryEntityStore::from_nodes(nodes));
        let renderer = Arc::new(CountingRenderer::default());
        let limit = NonZeroUsize::new(64).expect("non-zero");
        let lookup = Arc::new(MemoryTagCache::new(LOOKUP_BIN, limit));
        let render = Arc::new(MemoryTagCache::new(RENDER_BIN, limit));
        let manager = Arc::new(EmbedPromoManager::new(
            store.clone(),
            renderer.clone(),
            PromoCaches::new(lookup.clone(), render.clone()),
            PromoOptions::default(),
        ));
        Self {
            store,
            renderer,
            lookup,
            render,
            manager,
        }
    }

    pub fn caches(&self) -> PromoCaches {
        PromoCaches::new(self.lookup.clone(), self.render.clone())
    }
}

/// A manager using the production comrak renderer over `nodes`.
pub fn comrak_manager(nodes: impl IntoIterator<Item = ContentNode>) -> Arc<EmbedPromoManager> {
    let limit = NonZeroUsize::new(64).expect("non-zero");
    Arc::new(EmbedPromoManager::new(
        Arc::new(MemoryEntityStore::from_nodes(nodes)),
        Arc::new(ComrakPromoRenderer::default()),
        PromoCaches::new(
            Arc::new(MemoryTagCache::new(LOOKUP_BIN, limit)),
            Arc::new(MemoryTagCache::new(RENDER_BIN, limit)),
        ),
        PromoOptions::default(),
    ))
}
