use anyhow::bail;
use async_trait::async_trait;
use canopy_model::{EmbedNode, Field, FieldRegistry, Node, NodeField, NodeType};
use canopy_service::transport::mock::{MEMORY_INFO_ADDRESS, MemoryConnector, MemoryDaemon};
use canopy_service::{
    CacheDep, CacheMods, HandlerOutcome, NodeContext, NodeContextHandler, NodeResolver,
    ServiceError, SessionPool, SignalRegistry,
};
use canopy_types::RequestId;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const SITE: &str = "example";

/// Lists posts for blog nodes and ignores everything else.
#[derive(Default)]
struct BlogHandler {
    calls: AtomicUsize,
}

#[async_trait]
impl NodeContextHandler for BlogHandler {
    fn name(&self) -> &str {
        "blog"
    }

    async fn node_context(
        &self,
        _request: RequestId,
        node_type: &str,
        embed: Option<&EmbedNode>,
    ) -> anyhow::Result<HandlerOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if node_type != "core.Blog" {
            return Ok(HandlerOutcome::Declined);
        }
        let limit = embed
            .and_then(EmbedNode::query)
            .and_then(|q| q.strip_prefix("limit="))
            .unwrap_or("all");
        let blog = embed.map_or("/blog", EmbedNode::path);
        Ok(HandlerOutcome::Handled(
            NodeContext::new()
                .with_fragment("BlogPosts", format!("posts:{limit}"))
                .with_cache(CacheMods::default().with_dep(CacheDep::descending(blog, 2))),
        ))
    }
}

#[tokio::test]
async fn blog_handler_handles_blog_and_declines_document() {
    let handler = Arc::new(BlogHandler::default());
    let mut registry = SignalRegistry::new();
    registry.register(handler.clone());

    let blog = registry
        .dispatch(RequestId::new(1), "core.Blog", None)
        .await
        .unwrap();
    assert_eq!(blog.handled, vec!["blog".to_string()]);
    assert_eq!(
        blog.context.fragments.get("BlogPosts"),
        Some(&b"posts:all".to_vec())
    );

    let document = registry
        .dispatch(RequestId::new(2), "core.Document", None)
        .await
        .unwrap();
    assert!(document.handled.is_empty());
    assert!(document.context.is_empty());
    assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn handlers_run_in_order_and_merge() {
    let mut registry = SignalRegistry::new();
    registry.register_fn("sidebar", |_, _, _| {
        Ok(HandlerOutcome::Handled(
            NodeContext::new()
                .with_fragment("Sidebar", "first")
                .with_fragment("Footer", "first"),
        ))
    });
    registry.register_fn("footer", |_, _, _| {
        Ok(HandlerOutcome::Handled(
            NodeContext::new().with_fragment("Footer", "second"),
        ))
    });
    registry.register_fn("silent", |_, _, _| Ok(HandlerOutcome::Declined));
    assert_eq!(registry.len(), 3);

    let dispatch = registry
        .dispatch(RequestId::new(7), "core.Document", None)
        .await
        .unwrap();

    assert_eq!(dispatch.handled, vec!["sidebar".to_string(), "footer".to_string()]);
    assert_eq!(dispatch.context.fragments["Sidebar"], b"first".to_vec());
    assert_eq!(dispatch.context.fragments["Footer"], b"second".to_vec());
}

#[tokio::test]
async fn handler_error_aborts_dispatch() {
    let after = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&after);

    let mut registry = SignalRegistry::new();
    registry.register_fn("failing", |_, node_type, _| {
        bail!("no template for {node_type}")
    });
    registry.register_fn("after", move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(HandlerOutcome::Declined)
    });

    let err = registry
        .dispatch(RequestId::new(3), "core.Blog", None)
        .await
        .unwrap_err();
    match err {
        ServiceError::Extension { handler, reason } => {
            assert_eq!(handler, "failing");
            assert!(reason.contains("core.Blog"));
        }
        other => panic!("expected extension error, got {other:?}"),
    }
    assert_eq!(after.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handlers_see_embed_query() {
    let mut registry = SignalRegistry::new();
    registry.register(Arc::new(BlogHandler::default()));
    let embed = EmbedNode::new("latest", "/blog?limit=3");

    let dispatch = registry
        .dispatch(RequestId::new(4), "core.Blog", Some(&embed))
        .await
        .unwrap();

    assert_eq!(dispatch.context.fragments["BlogPosts"], b"posts:3".to_vec());
    assert_eq!(
        dispatch.context.cache.unwrap().deps,
        vec![CacheDep::descending("/blog", 2)]
    );
}

fn blog_type() -> NodeType {
    NodeType::new("core.Blog")
        .with_field(NodeField::text("core.Title"))
        .addable_to(".")
}

async fn resolver_setup() -> (SessionPool, NodeResolver) {
    let daemon = Arc::new(MemoryDaemon::new());
    daemon.register_node_type(blog_type());
    let connector = Arc::new(MemoryConnector::new(daemon));
    let pool = SessionPool::new(
        4,
        MEMORY_INFO_ADDRESS,
        connector,
        Arc::new(FieldRegistry::new()),
    );

    let mut blog = Node::new("/blog", blog_type(), &FieldRegistry::new()).unwrap();
    blog.set_field("core.Title", Field::Text("News".into()))
        .unwrap();
    let mut session = pool.session().await.unwrap();
    session
        .data()
        .await
        .write_node(SITE, "/blog", &blog)
        .await
        .unwrap();

    let mut signals = SignalRegistry::new();
    signals.register(Arc::new(BlogHandler::default()));
    (pool, NodeResolver::new(Arc::new(signals)))
}

#[tokio::test]
async fn resolver_returns_node_with_context() {
    let (pool, resolver) = resolver_setup().await;
    let mut session = pool.session().await.unwrap();

    let resolved = resolver
        .resolve(&mut session, SITE, "/blog", RequestId::new(10))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(resolved.node.get_str("core.Title"), Some("News"));
    assert_eq!(resolved.handled_by, vec!["blog".to_string()]);
    assert!(resolved.context.fragments.contains_key("BlogPosts"));
}

#[tokio::test]
async fn resolver_follows_embed_descriptor() {
    let (pool, resolver) = resolver_setup().await;
    let mut session = pool.session().await.unwrap();
    let embed = EmbedNode::new("latest", "/blog?limit=5");

    let resolved = resolver
        .resolve_embedded(&mut session, SITE, &embed, RequestId::new(11))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(resolved.node.path, "/blog");
    assert_eq!(resolved.context.fragments["BlogPosts"], b"posts:5".to_vec());
}

#[tokio::test]
async fn resolver_missing_node_is_none() {
    let (pool, resolver) = resolver_setup().await;
    let mut session = pool.session().await.unwrap();

    let resolved = resolver
        .resolve(&mut session, SITE, "/nowhere", RequestId::new(12))
        .await
        .unwrap();
    assert!(resolved.is_none());
}

#[tokio::test]
async fn resolver_reports_unavailable_data_service() {
    let daemon = Arc::new(MemoryDaemon::new());
    let connector = Arc::new(MemoryConnector::new(daemon));
    connector.fail_data_dials(true);
    let pool = SessionPool::new(
        1,
        MEMORY_INFO_ADDRESS,
        connector,
        Arc::new(FieldRegistry::new()),
    );
    let resolver = NodeResolver::new(Arc::new(SignalRegistry::new()));
    let mut session = pool.session().await.unwrap();

    let err = resolver
        .resolve(&mut session, SITE, "/blog", RequestId::new(13))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unavailable(_)));
}
