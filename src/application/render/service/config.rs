use std::collections::HashSet;

use ammonia::Builder as AmmoniaBuilder;
use comrak::options::Options;

pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options
}

/// Sanitizer for promo bodies. Promos sit inside article text, so headings
/// above `h3` and embedded media are stripped.
pub(crate) fn build_promo_sanitizer() -> AmmoniaBuilder<'static> {
    let mut builder = AmmoniaBuilder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a", "abbr", "br", "code", "del", "em", "h3", "h4", "i", "img", "li", "ol", "p", "s",
        "span", "strong", "sub", "sup", "u", "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from(["class", "title", "lang", "dir"]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("a", &["target"]);
    builder.add_tag_attributes("img", &["alt", "width", "height", "loading"]);

    builder
}

/// Sanitizer that keeps text only; used for titles.
pub(crate) fn build_text_sanitizer() -> AmmoniaBuilder<'static> {
    AmmoniaBuilder::empty()
}
