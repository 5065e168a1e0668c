mod common;

use std::num::NonZeroUsize;
use std::sync::Arc;

use common::{
    CountingRenderer, FailingRenderer, FailingStore, Harness, article, comrak_manager, paragraphs,
    promo,
};
use promo_embed::application::formatter::PromoFormatter;
use promo_embed::application::promo::{EmbedPromoManager, PromoError, PromoOptions};
use promo_embed::cache::{CacheTag, MemoryTagCache, PromoCaches};
use promo_embed::domain::entities::TextItem;
use promo_embed::domain::paragraphs::split_paragraphs;
use promo_embed::domain::types::TermId;
use promo_embed::infra::memory::MemoryEntityStore;

#[tokio::test]
async fn promo_lands_after_third_paragraph() {
    let harness = Harness::new([]);
    let promo = promo(10, 7, 100);
    let text = paragraphs(5);

    let injected = harness.manager.inject(&promo, &text).await.expect("inject");
    let fragments = split_paragraphs(&injected);

    assert_eq!(fragments.len(), 6);
    assert_eq!(fragments[2], "<p>P3</p>\n");
    assert_eq!(fragments[3], CountingRenderer::markup_for(&promo));
    assert_eq!(fragments[4], "<p>P4</p>\n");
    assert_eq!(fragments[5], "<p>P5</p>");
}

#[tokio::test]
async fn short_body_is_returned_untouched_without_rendering() {
    let harness = Harness::new([]);
    let text = "<p>One</p>\n<p>Two</p>\n\n";

    let injected = harness
        .manager
        .inject(&promo(10, 7, 100), text)
        .await
        .expect("inject");

    assert_eq!(injected, text);
    assert_eq!(harness.renderer.calls(), 0);
}

#[tokio::test]
async fn body_with_exactly_offset_paragraphs_gets_promo_appended() {
    let harness = Harness::new([]);
    let promo = promo(10, 7, 100);

    let injected = harness
        .manager
        .inject(&promo, &paragraphs(3))
        .await
        .expect("inject");

    assert_eq!(
        injected,
        format!(
            "{}{}",
            paragraphs(3),
            CountingRenderer::markup_for(&promo).trim_end()
        )
    );
}

#[tokio::test]
async fn promo_offset_overrides_default() {
    let harness = Harness::new([]);
    let mut first = promo(10, 7, 100);
    first.paragraph_offset = Some(1);

    let injected = harness
        .manager
        .inject(&first, &paragraphs(2))
        .await
        .expect("inject");
    let fragments = split_paragraphs(&injected);
    assert_eq!(fragments[0], "<p>P1</p>\n");
    assert_eq!(fragments[1], CountingRenderer::markup_for(&first));

    let mut leading = promo(11, 7, 100);
    leading.paragraph_offset = Some(0);
    let injected = harness
        .manager
        .inject(&leading, "")
        .await
        .expect("inject");
    assert_eq!(injected, CountingRenderer::markup_for(&leading).trim_end());
}

#[tokio::test]
async fn out_of_reach_offset_leaves_body_untouched() {
    let harness = Harness::new([]);
    let mut distant = promo(10, 7, 100);
    distant.paragraph_offset = Some(u32::MAX);

    let text = paragraphs(5);
    let injected = harness
        .manager
        .inject(&distant, &text)
        .await
        .expect("inject");

    assert_eq!(injected, text);
    assert_eq!(harness.renderer.calls(), 0);
}

#[tokio::test]
async fn missing_markup_still_trims_trailing_whitespace() {
    let harness = Harness::new([]);
    let not_a_promo = article(3, Some(7), "");

    let injected = harness
        .manager
        .inject(&not_a_promo, "<p>A</p>\n<p>B</p>\n<p>C</p>\n\n")
        .await
        .expect("inject");

    assert_eq!(injected, "<p>A</p>\n<p>B</p>\n<p>C</p>");
    assert_eq!(harness.renderer.calls(), 0);
}

#[tokio::test]
async fn markup_is_rendered_once_per_promo() {
    let harness = Harness::new([]);
    let promo = promo(10, 7, 100);

    for _ in 0..3 {
        harness
            .manager
            .inject(&promo, &paragraphs(4))
            .await
            .expect("inject");
    }

    assert_eq!(harness.renderer.calls(), 1);
    assert_eq!(harness.render.len(), 1);
}

#[tokio::test]
async fn formatter_injects_and_tags_items_when_promo_exists() {
    let harness = Harness::new([promo(10, 7, 100)]);
    let formatter = PromoFormatter::new(harness.manager.clone());
    let article = article(1, Some(7), "");
    let items = vec![
        TextItem::new(paragraphs(4)),
        TextItem {
            value: paragraphs(1),
            format: "full_html".to_string(),
            langcode: "de".to_string(),
        },
    ];

    let elements = formatter
        .view_elements(&article, &items)
        .await
        .expect("format");

    assert_eq!(elements.len(), 2);
    assert_eq!(split_paragraphs(&elements[0].text).len(), 5);
    assert_eq!(elements[0].cache_tags, vec![CacheTag::PromoTarget(TermId(7))]);
    assert_eq!(elements[1].text, paragraphs(1));
    assert_eq!(
        elements[1].cache_tags,
        vec![CacheTag::PromoTarget(TermId(7))],
        "short items are tagged even though nothing was injected"
    );
    assert_eq!(elements[1].format, "full_html");
    assert_eq!(elements[1].langcode, "de");
    assert_eq!(harness.store.query_count(), 1);
}

#[tokio::test]
async fn formatter_leaves_items_untagged_without_promo() {
    let harness = Harness::new([promo(10, 7, 100)]);
    let formatter = PromoFormatter::new(harness.manager.clone());
    let items = vec![TextItem::new(paragraphs(4))];

    let uncategorised = formatter
        .view_elements(&article(1, None, ""), &items)
        .await
        .expect("format");
    assert_eq!(uncategorised[0].text, paragraphs(4));
    assert!(uncategorised[0].cache_tags.is_empty());

    let other_category = formatter
        .view_elements(&article(2, Some(8), ""), &items)
        .await
        .expect("format");
    assert_eq!(other_category[0].text, paragraphs(4));
    assert!(other_category[0].cache_tags.is_empty());
    assert_eq!(harness.renderer.calls(), 0);
}

#[tokio::test]
async fn formatter_propagates_failures_unless_best_effort() {
    let manager = Arc::new(EmbedPromoManager::new(
        Arc::new(FailingStore),
        Arc::new(CountingRenderer::default()),
        Harness::new([]).caches(),
        PromoOptions::default(),
    ));
    let formatter = PromoFormatter::new(manager);
    let article = article(1, Some(7), "");
    let items = vec![TextItem::new(paragraphs(4))];

    let err = formatter
        .view_elements(&article, &items)
        .await
        .expect_err("store failure");
    assert!(matches!(err, PromoError::Repo(_)));

    let fallback = formatter.view_elements_best_effort(&article, &items).await;
    assert_eq!(fallback[0].text, paragraphs(4));
    assert!(fallback[0].cache_tags.is_empty());
}

#[tokio::test]
async fn render_failures_surface_as_render_errors() {
    let limit = NonZeroUsize::new(8).expect("non-zero");
    let manager = EmbedPromoManager::new(
        Arc::new(MemoryEntityStore::new()),
        Arc::new(FailingRenderer),
        PromoCaches::new(
            Arc::new(MemoryTagCache::new("lookup", limit)),
            Arc::new(MemoryTagCache::new("render", limit)),
        ),
        PromoOptions::default(),
    );

    let err = manager
        .inject(&promo(10, 7, 100), &paragraphs(3))
        .await
        .expect_err("render failure");
    assert!(matches!(err, PromoError::Render(_)));
}

#[tokio::test]
async fn injected_article_snapshot() {
    let mut subscribe = promo(10, 7, 100);
    subscribe.title = "Subscribe".to_string();
    let manager = comrak_manager([subscribe]);
    let formatter = PromoFormatter::new(manager);

    let body = "<p>One</p>\n<p>Two</p>\n<p>Three</p>\n<p>Four</p>\n";
    let elements = formatter
        .view_elements(&article(1, Some(7), body), &[TextItem::new(body)])
        .await
        .expect("format");

    insta::assert_snapshot!(elements[0].text, @r#"
    <p>One</p>
    <p>Two</p>
    <p>Three</p>
    <aside class="embed-promo" data-view-mode="body_embed_promo" data-promo-id="10">
    <h3 class="embed-promo__title">Subscribe</h3>
    <p>Read <strong>more</strong>.</p>
    </aside>
    <p>Four</p>
    "#);
}
