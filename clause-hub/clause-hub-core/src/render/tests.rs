#[cfg(test)]
mod tests {
    use crate::render::*;
    use crate::storage::{ClauseStore, NewClause, VoteInfo};
    use uuid::Uuid;

    fn store() -> (tempfile::TempDir, ClauseStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ClauseStore::new(dir.path()).unwrap();
        (dir, store)
    }

    fn add(store: &mut ClauseStore, title: &str, section: &str, parent: Option<Uuid>) -> Uuid {
        store
            .create(NewClause {
                title: title.to_string(),
                section_id: section.to_string(),
                content: format!("Body of {title}."),
                group: "council".to_string(),
                parent,
                ..NewClause::default()
            })
            .unwrap()
    }

    #[test]
    fn escape_html_escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">&'y'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;y&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn slugify_flattens_to_dashed_lowercase() {
        assert_eq!(slugify("10_C.i"), "10-c-i");
        assert_eq!(slugify("Hello  World!"), "hello-world");
        assert_eq!(slugify("--x--"), "x");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn strip_tags_drops_markup() {
        assert_eq!(strip_tags("<p>Hi <b>there</b></p>"), "Hi there");
        assert_eq!(strip_tags("no tags"), "no tags");
    }

    #[test]
    fn paragraph_filter_wraps_and_escapes() {
        let filter = ParagraphFilter;
        assert_eq!(
            filter.apply("A & B\n\nC<D"),
            "<p>A &amp; B</p>\n<p>C&lt;D</p>"
        );
        assert_eq!(filter.apply("  one  "), "<p>one</p>");
        assert_eq!(filter.apply(""), "");
    }

    #[test]
    fn vote_tooltip_composes_present_parts() {
        let vote = VoteInfo {
            date: Some("2024-05-01".to_string()),
            reference: Some("Motion 44".to_string()),
            url: Some("https://example.org/minutes".to_string()),
        };
        assert_eq!(
            vote_tooltip(&vote).unwrap(),
            "<span class=\"vote-tooltip\">[ref]<span class=\"tooltip-content\">\
             Date: 2024-05-01<br />Reference: Motion 44<br />\
             URL: <a href=\"https://example.org/minutes\" target=\"_blank\" \
             rel=\"noopener noreferrer\">https://example.org/minutes</a>\
             </span></span>"
        );

        let partial = VoteInfo {
            reference: Some("Motion 44".to_string()),
            ..VoteInfo::default()
        };
        assert_eq!(
            vote_tooltip(&partial).unwrap(),
            "<span class=\"vote-tooltip\">[ref]<span class=\"tooltip-content\">Reference: Motion 44</span></span>"
        );

        assert!(vote_tooltip(&VoteInfo::default()).is_none());
    }

    #[test]
    fn node_markup_carries_anchor_and_data_attributes() {
        let (_dir, mut store) = store();
        let id = store
            .create(NewClause {
                title: "10_c".to_string(),
                section_id: "c".to_string(),
                content: "Quorum is half.".to_string(),
                tags: "Finance, Key-Terms".to_string(),
                group: "council".to_string(),
                ..NewClause::default()
            })
            .unwrap();

        let html = render_tree(&store, None, &ParagraphFilter);
        assert!(html.contains(&format!(
            "<div class=\"bylaw-clause finance key-terms\" id=\"clause-c\" \
             data-id=\"{id}\" data-parent=\"0\" style=\"margin-left:0px;\">"
        )));
        assert!(html.contains("<p>c. Quorum is half.</p>"));
        assert!(html.contains("<div class=\"bylaw-label-wrap\">"));
        assert!(html.contains("<div class=\"bylaw-label-text\">"));
    }

    #[test]
    fn vote_tooltip_is_appended_inside_the_label() {
        let (_dir, mut store) = store();
        store
            .create(NewClause {
                title: "4".to_string(),
                section_id: "4".to_string(),
                content: "Votes are recorded.".to_string(),
                group: "council".to_string(),
                vote: VoteInfo {
                    reference: Some("Motion 9".to_string()),
                    ..VoteInfo::default()
                },
                ..NewClause::default()
            })
            .unwrap();

        let html = render_tree(&store, None, &ParagraphFilter);
        assert!(html.contains(
            "Votes are recorded. <span class=\"vote-tooltip\">[ref]\
             <span class=\"tooltip-content\">Reference: Motion 9</span></span></p>"
        ));
    }

    #[test]
    fn children_indent_and_follow_title_order() {
        let (_dir, mut store) = store();
        add(&mut store, "2", "2", None);
        let top = add(&mut store, "10", "10", None);
        add(&mut store, "10_b", "b", Some(top));
        add(&mut store, "10_a", "a", Some(top));

        let html = render_tree(&store, None, &ParagraphFilter);
        let pos = |needle: &str| html.find(needle).unwrap();
        // numeric title order, not lexicographic
        assert!(pos("id=\"clause-2\"") < pos("id=\"clause-10\""));
        assert!(pos("id=\"clause-10\"") < pos("id=\"clause-a\""));
        assert!(pos("id=\"clause-a\"") < pos("id=\"clause-b\""));
        assert_eq!(html.matches("margin-left:0px;").count(), 2);
        assert_eq!(html.matches("margin-left:20px;").count(), 2);
    }

    #[test]
    fn group_filter_applies_only_at_the_top() {
        let (_dir, mut store) = store();
        let top = add(&mut store, "10", "10", None);
        let cross_group_child = store
            .create(NewClause {
                title: "10_a".to_string(),
                section_id: "a".to_string(),
                group: "character".to_string(),
                parent: Some(top),
                ..NewClause::default()
            })
            .unwrap();
        let foreign_root = store
            .create(NewClause {
                title: "1".to_string(),
                section_id: "1".to_string(),
                group: "character".to_string(),
                ..NewClause::default()
            })
            .unwrap();

        let html = render_tree(&store, Some("council"), &ParagraphFilter);
        assert!(html.contains(&format!("data-id=\"{top}\"")));
        assert!(html.contains(&format!("data-id=\"{cross_group_child}\"")));
        assert!(!html.contains(&format!("data-id=\"{foreign_root}\"")));
    }

    #[test]
    fn dangling_parent_renders_as_root() {
        let (_dir, mut store) = store();
        let missing = Uuid::new_v4();
        let orphan = add(&mut store, "7", "7", Some(missing));

        let html = render_tree(&store, None, &ParagraphFilter);
        assert!(html.contains(&format!("data-id=\"{orphan}\"")));
        assert!(html.contains(&format!("data-parent=\"{missing}\"")));
        assert!(html.contains("margin-left:0px;"));
    }

    #[test]
    fn self_parented_clause_never_renders() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let mut store = ClauseStore::new(dir.path()).unwrap();
            add(&mut store, "9", "9", None)
        };
        // force the invalid linkage directly into the record file
        let path = dir.path().join(format!("{}.json", id));
        let mut record: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        record["parent"] = serde_json::json!(id.to_string());
        std::fs::write(&path, serde_json::to_string(&record).unwrap()).unwrap();

        let store = ClauseStore::new(dir.path()).unwrap();
        assert_eq!(store.get(id).unwrap().parent, Some(id));
        let html = render_tree(&store, None, &ParagraphFilter);
        assert!(!html.contains(&format!("data-id=\"{id}\"")));
        assert!(render_subtree(&store, id, &ParagraphFilter).is_empty());
    }

    #[test]
    fn two_node_cycle_is_abandoned_not_looped() {
        let (_dir, mut store) = store();
        let a = add(&mut store, "10", "10", None);
        let b = add(&mut store, "20", "20", None);
        store.set_parent(a, Some(b)).unwrap();
        store.set_parent(b, Some(a)).unwrap();

        // neither node is a root, so the full render skips the cycle entirely
        assert!(render_tree(&store, None, &ParagraphFilter).is_empty());

        // entering the cycle explicitly emits each node once, then stops
        let sub = render_subtree(&store, a, &ParagraphFilter);
        assert_eq!(sub.matches(&format!("data-id=\"{a}\"")).count(), 1);
        assert_eq!(sub.matches(&format!("data-id=\"{b}\"")).count(), 1);
    }

    #[test]
    fn subtree_renders_the_requested_branch() {
        let (_dir, mut store) = store();
        let top = add(&mut store, "10", "10", None);
        let mid = add(&mut store, "10_a", "a", Some(top));
        let leaf = add(&mut store, "10_a_i", "i", Some(mid));

        let sub = render_subtree(&store, mid, &ParagraphFilter);
        assert!(!sub.contains(&format!("data-id=\"{top}\"")));
        assert!(sub.contains(&format!("data-id=\"{mid}\"")));
        assert!(sub.contains(&format!("data-id=\"{leaf}\"")));
        assert!(sub.contains("margin-left:0px;"));
        assert!(sub.contains("margin-left:20px;"));
    }

    #[test]
    fn one_paragraph_wrap_is_stripped_from_the_body() {
        let (_dir, mut store) = store();
        store
            .create(NewClause {
                title: "3".to_string(),
                section_id: "s".to_string(),
                content: "First paragraph.\n\nSecond one.".to_string(),
                group: "council".to_string(),
                ..NewClause::default()
            })
            .unwrap();

        let html = render_tree(&store, None, &ParagraphFilter);
        // outer pair is stripped, interior paragraph tags stay
        assert!(html.contains("<p>s. First paragraph.</p>\n<p>Second one.</p>"));
    }

    #[test]
    fn page_includes_styles_toolbar_and_timestamp() {
        let (_dir, mut store) = store();
        add(&mut store, "1", "1", None);

        let html = render_page(&store, None, &ParagraphFilter);
        assert!(html.starts_with("<div class=\"bcm-wrapper\"><style>"));
        assert!(html.ends_with("</div>"));
        assert!(html.contains("#bcm-toolbar{margin-bottom:1em"));
        assert!(html.contains(".vote-tooltip:hover .tooltip-content{display:block;}"));
        assert!(html.contains("id=\"bcm-content-filter\""));
        assert!(html.contains("id=\"bcm-content-search\""));
        assert!(html.contains("onclick=\"bcmClearFilters()\">Clear Filters</button>"));
        assert!(html.contains("onclick=\"window.print()\">Print / Export PDF</button>"));

        let stamp = store
            .latest_modified(None)
            .unwrap()
            .format("%B %-d, %Y")
            .to_string();
        assert!(html.contains(&format!(
            "<div class=\"bcm-updated\"><strong>Last Updated: {stamp}</strong></div>"
        )));
    }

    #[test]
    fn empty_store_renders_an_empty_wrapper() {
        let (_dir, store) = store();
        let html = render_page(&store, None, &ParagraphFilter);
        assert!(html.starts_with("<div class=\"bcm-wrapper\">"));
        assert!(!html.contains("Last Updated:"));
        assert!(!html.contains("class=\"bylaw-clause"));
        assert!(html.contains("id=\"bcm-content-filter\""));
    }
}
