//! HTML rendering of the clause tree.
//!
//! Produces the embeddable bylaw page: a wrapper with inline styles, a
//! "Last Updated" line, a filter toolbar, and the clause tree itself as flat
//! `<div class="bylaw-clause">` nodes indented by depth. The markup carries
//! the anchors and data attributes the client-side filter script binds to,
//! but the script itself is not served from here.

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use uuid::Uuid;

use crate::sequence::title_sort_key;
use crate::storage::{Clause, ClauseStore, VoteInfo};

/// Indent per tree level, in pixels.
const INDENT_PX: usize = 20;

const TOOLBAR: &str = concat!(
    "<div id=\"bcm-toolbar\"><!-- #bcm-toolbar -->",
    "  <input type=\"text\" id=\"bcm-content-filter\" placeholder=\"Search clauses...\">",
    "  <button type=\"button\" id=\"bcm-content-search\">Search</button>",
    "  <button type=\"button\" onclick=\"bcmClearFilters()\">Clear Filters</button>",
    "  <button type=\"button\" onclick=\"window.print()\">Print / Export PDF</button>",
    "</div><!-- #bcm-toolbar -->",
);

const INLINE_STYLES: &str = concat!(
    "#bcm-toolbar{margin-bottom:1em;display:flex;align-items:center;gap:0.75em;flex-wrap:wrap;}",
    "#bcm-toolbar button{padding:4px 10px;font-size:0.9em;border-radius:4px;border:1px solid #ccc;background:#f5f5f5;cursor:pointer;transition:0.2s;line-height:1.2;}",
    "#bcm-toolbar button:hover{background:#e6e6e6;border-color:#999;}",
    "#bcm-toolbar label{margin-right:0.5em;font-size:0.95em;font-weight:500;}",
    ".bylaw-clause{display:block;margin-bottom:0em;}",
    ".bylaw-label-wrap{display:flex;align-items:flex-start;gap:1em;flex-wrap:wrap;margin-bottom:0.1em;line-height:1.1;}",
    ".bylaw-label-number{white-space:nowrap;font-size:1em;flex-shrink:0;}",
    ".bylaw-label-text{word-break:break-word;font-size:0.95em;flex:1;min-width:0;}",
    ".vote-tooltip{position:relative;display:inline-block;color:#555;cursor:help;font-size:0.85em;}",
    ".vote-tooltip .tooltip-content{display:none;position:absolute;top:100%;left:50%;transform:translateX(-50%);background:#333;color:#fff;padding:6px 8px;border-radius:4px;font-size:0.75em;z-index:9999;min-width:160px;max-width:280px;text-align:left;box-shadow:0 2px 6px rgba(0,0,0,0.3);white-space:normal;}",
    ".vote-tooltip:hover .tooltip-content{display:block;}",
    ".tooltip-content a{color:#9cf;text-decoration:underline;}",
    ".tooltip-content a:hover{color:#cde;}",
);

/// Seam for the rich-text pipeline that turns a stored clause body into
/// HTML-safe markup.
pub trait ContentFilter: Send + Sync {
    fn apply(&self, raw: &str) -> String;
}

/// Default content filter: escapes the text and wraps blank-line-separated
/// runs in paragraph tags.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParagraphFilter;

impl ContentFilter for ParagraphFilter {
    fn apply(&self, raw: &str) -> String {
        raw.trim()
            .split("\n\n")
            .map(str::trim)
            .filter(|para| !para.is_empty())
            .map(|para| format!("<p>{}</p>", escape_html(para)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Escape text for HTML body or attribute position.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// URL/anchor-safe form of a title: lowercased alphanumeric runs joined by
/// dashes.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut gap = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if gap && !slug.is_empty() {
                slug.push('-');
            }
            gap = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            gap = true;
        }
    }
    slug
}

/// Keep only characters valid in a CSS class name.
pub fn sanitize_html_class(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Drop HTML tags, keeping text content. Used for plain-text snippets.
pub fn strip_tags(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    for ch in raw.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Tooltip markup for a clause's vote annotation, or `None` when every field
/// is absent.
pub fn vote_tooltip(vote: &VoteInfo) -> Option<String> {
    if vote.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    if let Some(date) = &vote.date {
        parts.push(format!("Date: {}", escape_html(date)));
    }
    if let Some(reference) = &vote.reference {
        parts.push(format!("Reference: {}", escape_html(reference)));
    }
    if let Some(url) = &vote.url {
        parts.push(format!(
            "URL: <a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
            escape_html(url),
            escape_html(url)
        ));
    }
    Some(format!(
        "<span class=\"vote-tooltip\">[ref]<span class=\"tooltip-content\">{}</span></span>",
        parts.join("<br />")
    ))
}

fn tag_classes(tags: &str) -> String {
    tags.to_lowercase()
        .split(',')
        .map(str::trim)
        .map(sanitize_html_class)
        .filter(|class| !class.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove one wrapping paragraph tag pair so the body can continue the line
/// started by the section label.
fn strip_paragraph_wrap(filtered: &str) -> &str {
    let mut body = filtered.trim();
    if let Some(rest) = body.strip_prefix("<p>") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("</p>") {
        body = rest;
    }
    body
}

fn render_node(clause: &Clause, depth: usize, filter: &dyn ContentFilter, out: &mut String) {
    let classes = tag_classes(&clause.tags);
    let anchor = if clause.section_id.trim().is_empty() {
        slugify(&clause.id.to_string())
    } else {
        slugify(&clause.section_id)
    };
    let parent_attr = match clause.parent {
        Some(parent) => parent.to_string(),
        None => "0".to_string(),
    };
    let filtered = filter.apply(&clause.content);
    let body = strip_paragraph_wrap(&filtered);

    out.push_str(&format!(
        "\n<div class=\"bylaw-clause {}\" id=\"clause-{}\" data-id=\"{}\" data-parent=\"{}\" style=\"margin-left:{}px;\">",
        classes,
        anchor,
        clause.id,
        parent_attr,
        INDENT_PX * depth
    ));
    out.push_str("\n  <div class=\"bylaw-label-wrap\">");
    out.push_str("\n    <div class=\"bylaw-label-text\">");
    out.push_str(&format!(
        "\n      <p>{}. {}",
        escape_html(&clause.section_id),
        body
    ));
    if let Some(tooltip) = vote_tooltip(&clause.vote) {
        out.push(' ');
        out.push_str(&tooltip);
    }
    out.push_str("</p>");
    out.push_str("\n    </div>");
    out.push_str("\n  </div>");
    out.push_str("\n</div>\n");
}

/// Sibling order: title sort key first, then title and id so equal keys stay
/// deterministic.
fn sort_siblings(siblings: &mut [&Clause]) {
    siblings.sort_by(|a, b| {
        title_sort_key(&a.title)
            .cmp(&title_sort_key(&b.title))
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Depth-first emission over an explicit stack. Self-parented clauses are
/// skipped; a revisited id means a cycle, which is logged and abandoned
/// instead of looping.
fn walk<'a>(
    store: &'a ClauseStore,
    mut stack: Vec<(&'a Clause, usize)>,
    filter: &dyn ContentFilter,
    out: &mut String,
) {
    let mut visited: HashSet<Uuid> = HashSet::new();
    while let Some((clause, depth)) = stack.pop() {
        if clause.parent == Some(clause.id) {
            continue;
        }
        if !visited.insert(clause.id) {
            tracing::warn!(
                id = %clause.id,
                title = %clause.title,
                "cycle in clause hierarchy, abandoning branch"
            );
            continue;
        }
        render_node(clause, depth, filter, out);

        let mut children: Vec<&Clause> = store
            .iter()
            .filter(|c| c.parent == Some(clause.id))
            .collect();
        sort_siblings(&mut children);
        for child in children.into_iter().rev() {
            stack.push((child, depth + 1));
        }
    }
}

/// Render the full clause forest, optionally narrowed to one group.
///
/// The group narrows only the root set; membership below a root follows
/// parentage. A clause whose parent id does not resolve is treated as a root
/// rather than dropped.
pub fn render_tree(store: &ClauseStore, group: Option<&str>, filter: &dyn ContentFilter) -> String {
    let mut roots: Vec<&Clause> = store
        .iter()
        .filter(|c| group.is_none_or(|g| c.group == g))
        .filter(|c| match c.parent {
            None => true,
            Some(parent) => parent != c.id && store.get(parent).is_none(),
        })
        .collect();
    sort_siblings(&mut roots);

    let mut out = String::new();
    let stack = roots.into_iter().rev().map(|c| (c, 0)).collect();
    walk(store, stack, filter, &mut out);
    out
}

/// Render one branch starting at `root`, which is emitted at depth zero.
pub fn render_subtree(store: &ClauseStore, root: Uuid, filter: &dyn ContentFilter) -> String {
    let mut out = String::new();
    if let Some(clause) = store.get(root) {
        walk(store, vec![(clause, 0)], filter, &mut out);
    }
    out
}

/// The embeddable bylaw page: wrapper, inline styles, last-updated line,
/// toolbar, tree. An empty store still yields the wrapper and toolbar.
pub fn render_page(store: &ClauseStore, group: Option<&str>, filter: &dyn ContentFilter) -> String {
    let mut out = String::new();
    out.push_str("<div class=\"bcm-wrapper\">");
    out.push_str("<style>");
    out.push_str(INLINE_STYLES);
    out.push_str("</style>");
    if let Some(latest) = store.latest_modified(group) {
        out.push_str(&format!(
            "<div class=\"bcm-updated\"><strong>Last Updated: {}</strong></div>",
            latest.format("%B %-d, %Y")
        ));
    }
    out.push_str(TOOLBAR);
    out.push_str(&render_tree(store, group, filter));
    out.push_str("</div>");
    out
}
