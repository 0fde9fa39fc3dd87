/// Tag tables that decide how elements take part in text matching.

/// Elements whose edges break a line of text. A fragment range that crosses
/// one of these is generated as a `textStart,textEnd` pair.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "dd", "details", "dialog", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4",
    "h5", "h6", "header", "hgroup", "hr", "li", "main", "nav", "ol", "p", "pre", "section",
    "table", "td", "th", "tr", "ul",
];

/// Elements that bound prefix/suffix context. `li` is absent on purpose:
/// list items are skipped so that sibling items can supply context.
const CONTEXT_BOUNDARIES: &[&str] = &[
    "article", "aside", "blockquote", "body", "dd", "div", "dl", "figure", "footer", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "main", "nav", "ol", "p", "pre", "section",
    "table", "ul",
];

/// Elements whose subtrees never contribute visible text.
const HIDDEN_ELEMENTS: &[&str] = &["head", "noscript", "script", "style", "template", "title"];

/// Whether `tag` is a block-level element.
pub fn is_block(tag: &str) -> bool {
    return BLOCK_ELEMENTS.contains(&tag);
}

/// Whether `tag` can serve as the context ancestor of a selection.
pub fn is_context_boundary(tag: &str) -> bool {
    return CONTEXT_BOUNDARIES.contains(&tag);
}

/// Whether `tag` hides its whole subtree from text matching.
pub fn is_hidden(tag: &str) -> bool {
    return HIDDEN_ELEMENTS.contains(&tag);
}

/// Whether `tag` is a list item, which context lookup walks through.
pub fn is_list_item(tag: &str) -> bool {
    return tag == "li";
}
