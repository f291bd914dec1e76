//! Query clause E2E tests for lexmap.
//!
//! Each clause kind is evaluated against a small seeded index: ranges are
//! inclusive on both ends, like/fuzzy ignore accents and Greek spelling
//! variants, exact matches bypass the analyzer.

use pretty_assertions::assert_eq;

use e2e_tests::{date, shop, Shop, TestHarness, ATHENS};
use lexmap_analysis::{normalize, AnalyzerKind};
use lexmap_search::{
    QueryCompositionError, ResultPage, SearchClause, SearchError, Searcher, SortOption,
    StoreConfig,
};

fn names(page: &ResultPage<Shop>) -> Vec<&str> {
    page.records().map(|s| s.name.as_str()).collect()
}

fn stocks(page: &ResultPage<Shop>) -> Vec<i64> {
    page.records().map(|s| s.stock).collect()
}

fn by_stock() -> Vec<SortOption> {
    vec![SortOption::asc("stock")]
}

fn seed_bakeries(harness: &TestHarness) -> Searcher<Shop> {
    let mut batch = vec![
        shop("Φούρνος Αυγερινός", 1, ATHENS),
        shop("Φούρνος της γειτονιάς", 2, ATHENS),
        shop("Ζαχαροπλαστείο Ευρώπη", 3, ATHENS),
    ];
    batch[2].category = "patisserie".to_string();
    harness.seed(&mut batch)
}

#[test]
fn test_int_range_is_inclusive() {
    let harness = TestHarness::new();
    let mut batch: Vec<Shop> = [9, 10, 15, 20, 21]
        .iter()
        .map(|n| shop(&format!("s{n}"), *n, ATHENS))
        .collect();
    let searcher = harness.seed(&mut batch);

    let page = searcher
        .search(&[SearchClause::range_int("stock", 10, 20)], 1, 10, &by_stock())
        .unwrap();
    assert_eq!(stocks(&page), vec![10, 15, 20]);
    assert_eq!(page.total, 3);
}

#[test]
fn test_double_and_date_ranges() {
    let harness = TestHarness::new();
    let mut batch = vec![
        shop("old", 1, ATHENS),
        shop("mid", 2, ATHENS),
        shop("new", 3, ATHENS),
    ];
    batch[0].price = 1.0;
    batch[0].opened = date(1990, 1, 1);
    batch[1].price = 2.0;
    batch[1].opened = date(2005, 6, 15);
    batch[2].price = 3.0;
    batch[2].opened = date(2021, 12, 31);
    let searcher = harness.seed(&mut batch);

    let page = searcher
        .search(&[SearchClause::range_double("price", 1.5, 3.0)], 1, 10, &by_stock())
        .unwrap();
    assert_eq!(stocks(&page), vec![2, 3]);

    let page = searcher
        .search(
            &[SearchClause::range_date("opened", date(1990, 1, 1), date(2005, 6, 15))],
            1,
            10,
            &by_stock(),
        )
        .unwrap();
    assert_eq!(stocks(&page), vec![1, 2]);
}

#[test]
fn test_term_on_analyzed_field() {
    let harness = TestHarness::new();
    let searcher = seed_bakeries(&harness);

    let page = searcher
        .search(&[SearchClause::term("name", "ΦΟΥΡΝΟΣ")], 1, 10, &by_stock())
        .unwrap();
    assert_eq!(stocks(&page), vec![1, 2]);
}

#[test]
fn test_like_ignores_accents_and_spelling() {
    let harness = TestHarness::new();
    let searcher = seed_bakeries(&harness);

    // αυ before a voiced consonant is spelled αβ after folding
    assert_eq!(normalize("αυγερ"), "αβγερ");
    for pattern in ["αυγερ", "ΑΥΓΕΡ", "αβγερ"] {
        let page = searcher
            .search(&[SearchClause::like("name", pattern)], 1, 10, &[])
            .unwrap();
        assert_eq!(names(&page), vec!["Φούρνος Αυγερινός"], "pattern {pattern}");
    }

    let page = searcher
        .search(&[SearchClause::like("name", "ευρ*")], 1, 10, &[])
        .unwrap();
    assert_eq!(names(&page), vec!["Ζαχαροπλαστείο Ευρώπη"]);
}

#[test]
fn test_like_with_single_char_wildcard() {
    let harness = TestHarness::new();
    let searcher = seed_bakeries(&harness);

    let page = searcher
        .search(&[SearchClause::like("name", "ζαχαρ?πλαστ*")], 1, 10, &[])
        .unwrap();
    assert_eq!(stocks(&page), vec![3]);
}

#[test]
fn test_fuzzy_tolerates_typos() {
    let harness = TestHarness::new();
    let searcher = seed_bakeries(&harness);

    let page = searcher
        .search(&[SearchClause::fuzzy("name", "γειτονας")], 1, 10, &[])
        .unwrap();
    assert_eq!(names(&page), vec!["Φούρνος της γειτονιάς"]);
}

#[test]
fn test_fuzzy_fallback_on_raw_value() {
    let harness = TestHarness::new();
    let searcher = seed_bakeries(&harness);

    // one term at 0.7 similarity: ten characters allow two edits
    let page = searcher
        .search(&[SearchClause::fuzzy("category", "patisseri!")], 1, 10, &[])
        .unwrap();
    assert_eq!(names(&page), vec!["Ζαχαροπλαστείο Ευρώπη"]);

    // three edits away from "bakery"
    let page = searcher
        .search(&[SearchClause::fuzzy("category", "bak-r!!")], 1, 10, &[])
        .unwrap();
    assert!(page.is_empty());
}

#[test]
fn test_like_on_raw_value_is_verbatim() {
    let harness = TestHarness::new();
    let searcher = seed_bakeries(&harness);

    let page = searcher
        .search(&[SearchClause::like("category", "bak")], 1, 10, &by_stock())
        .unwrap();
    assert_eq!(stocks(&page), vec![1, 2]);

    let page = searcher
        .search(&[SearchClause::like("category", "pat*rie")], 1, 10, &[])
        .unwrap();
    assert_eq!(stocks(&page), vec![3]);

    let page = searcher
        .search(&[SearchClause::like("category", "Bak")], 1, 10, &[])
        .unwrap();
    assert!(page.is_empty());
}

#[test]
fn test_like_and_fuzzy_follow_standard_analyzer() {
    let harness =
        TestHarness::with_config(StoreConfig::default().with_analyzer(AnalyzerKind::Standard));
    let searcher = seed_bakeries(&harness);

    for pattern in ["αυγερ", "ΑΥΓΕΡ"] {
        let page = searcher
            .search(&[SearchClause::like("name", pattern)], 1, 10, &[])
            .unwrap();
        assert_eq!(names(&page), vec!["Φούρνος Αυγερινός"], "pattern {pattern}");
    }

    // the standard analyzer keeps spelling, so the folded form misses
    let page = searcher
        .search(&[SearchClause::like("name", "αβγερ")], 1, 10, &[])
        .unwrap();
    assert!(page.is_empty());

    let page = searcher
        .search(&[SearchClause::fuzzy("name", "αυγερινος")], 1, 10, &[])
        .unwrap();
    assert_eq!(names(&page), vec!["Φούρνος Αυγερινός"]);

    let page = searcher.search_text("ευρ", &["name"], 1, 10, &[]).unwrap();
    assert_eq!(names(&page), vec!["Ζαχαροπλαστείο Ευρώπη"]);
}

#[test]
fn test_exact_bypasses_analyzer() {
    let harness = TestHarness::new();
    let searcher = seed_bakeries(&harness);

    let page = searcher
        .search(&[SearchClause::exact("category", "patisserie")], 1, 10, &[])
        .unwrap();
    assert_eq!(names(&page), vec!["Ζαχαροπλαστείο Ευρώπη"]);

    let page = searcher
        .search(&[SearchClause::exact("category", "Patisserie")], 1, 10, &[])
        .unwrap();
    assert!(page.is_empty());

    // the raw copy of an analyzed field holds the whole value
    let page = searcher
        .search(&[SearchClause::exact("name", "Φούρνος Αυγερινός")], 1, 10, &[])
        .unwrap();
    assert_eq!(stocks(&page), vec![1]);
}

#[test]
fn test_occurrences_combine() {
    let harness = TestHarness::new();
    let searcher = seed_bakeries(&harness);

    let page = searcher
        .request()
        .must(SearchClause::term("name", "φούρνος"))
        .not(SearchClause::like("name", "αυγ"))
        .run()
        .unwrap();
    assert_eq!(names(&page), vec!["Φούρνος της γειτονιάς"]);

    let page = searcher
        .request()
        .should(SearchClause::like("name", "ευρ"))
        .should(SearchClause::like("name", "αυγ"))
        .sort_by("stock", true)
        .run()
        .unwrap();
    assert_eq!(stocks(&page), vec![3, 1]);
}

#[test]
fn test_boost_raises_rank() {
    let harness = TestHarness::new();
    let searcher = seed_bakeries(&harness);

    let page = searcher
        .request()
        .should(SearchClause::term("name", "φούρνος"))
        .should(SearchClause::term("name", "γειτονιάς").boost(10.0))
        .run()
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.hits[0].record.stock, 2);
    assert!(page.hits[0].score > page.hits[1].score);
}

#[test]
fn test_blank_literals_match_nothing() {
    let harness = TestHarness::new();
    let searcher = seed_bakeries(&harness);

    for clause in [
        SearchClause::term("name", "  "),
        SearchClause::like("name", ""),
        SearchClause::fuzzy("name", " "),
    ] {
        let page = searcher.search(&[clause], 1, 10, &[]).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total, 0);
    }
    assert!(searcher.search(&[], 1, 10, &[]).unwrap().is_empty());
}

#[test]
fn test_second_area_clause_is_rejected() {
    let harness = TestHarness::new();
    let searcher = seed_bakeries(&harness);

    let clauses = vec![
        SearchClause::in_area(ATHENS, 10.0).unwrap(),
        SearchClause::in_area(ATHENS, 20.0).unwrap(),
    ];
    let result = searcher.search(&clauses, 1, 10, &[]);
    assert!(matches!(
        result,
        Err(SearchError::Query(QueryCompositionError::DuplicateArea))
    ));
}

#[test]
fn test_free_text_across_words() {
    let harness = TestHarness::new();
    let searcher = seed_bakeries(&harness);

    let page = searcher
        .search_text("ζαχαρο-γειτ", &["name"], 1, 10, &by_stock())
        .unwrap();
    assert_eq!(stocks(&page), vec![2, 3]);
}
