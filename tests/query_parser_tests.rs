use graphprocs::{
    DefaultOperator, IndexConfig, LabelIndex, ProcError,
    fulltext::{Clause, FullTextQuery, MAX_QUERY_DEPTH, Occur, WildcardPart, parse_query},
};

fn parse(text: &str) -> FullTextQuery {
    parse_query(text, DefaultOperator::Or).expect("query should parse")
}

fn term(field: Option<&str>, text: &str) -> FullTextQuery {
    FullTextQuery::Term {
        field: field.map(str::to_string),
        text: text.to_string(),
    }
}

fn parse_error(text: &str) -> String {
    match parse_query(text, DefaultOperator::Or) {
        Err(ProcError::InvalidQuery(msg)) => msg,
        other => panic!("expected InvalidQuery for {text:?}, got {other:?}"),
    }
}

#[test]
fn test_single_terms() {
    assert_eq!(parse("matrix"), term(None, "matrix"));
    assert_eq!(parse("title:matrix"), term(Some("title"), "matrix"));
    assert_eq!(parse("*:*"), FullTextQuery::MatchAll);
    assert_eq!(parse("*:neo"), term(None, "neo"));
}

#[test]
fn test_prefix_and_wildcards() {
    assert_eq!(
        parse("title:mat*"),
        FullTextQuery::Prefix {
            field: Some("title".into()),
            prefix: "mat".into(),
        }
    );
    assert_eq!(
        parse("n?o"),
        FullTextQuery::Wildcard {
            field: None,
            pattern: vec![
                WildcardPart::Literal('n'),
                WildcardPart::AnyChar,
                WildcardPart::Literal('o'),
            ],
        }
    );
    assert_eq!(parse(r"what\?"), term(None, "what?"));
}

#[test]
fn test_phrases() {
    assert_eq!(
        parse("tagline:\"free your mind\""),
        FullTextQuery::Phrase {
            field: Some("tagline".into()),
            text: "free your mind".into(),
        }
    );
    assert_eq!(
        parse(r#""say \"hi\"""#),
        FullTextQuery::Phrase {
            field: None,
            text: "say \"hi\"".into(),
        }
    );
}

#[test]
fn test_default_operator_controls_adjacent_clauses() {
    assert_eq!(
        parse("neo trinity"),
        FullTextQuery::Boolean(vec![
            Clause::new(Occur::Should, term(None, "neo")),
            Clause::new(Occur::Should, term(None, "trinity")),
        ])
    );
    assert_eq!(
        parse_query("neo trinity", DefaultOperator::And).expect("parse"),
        FullTextQuery::Boolean(vec![
            Clause::new(Occur::Must, term(None, "neo")),
            Clause::new(Occur::Must, term(None, "trinity")),
        ])
    );
}

#[test]
fn test_explicit_operators_and_modifiers() {
    assert_eq!(
        parse("neo AND NOT smith"),
        FullTextQuery::Boolean(vec![
            Clause::new(Occur::Must, term(None, "neo")),
            Clause::new(Occur::MustNot, term(None, "smith")),
        ])
    );
    assert_eq!(parse("neo && trinity"), parse("neo AND trinity"));
    assert_eq!(parse("neo || trinity"), parse("neo OR trinity"));
    assert_eq!(
        parse("+neo -smith oracle"),
        FullTextQuery::Boolean(vec![
            Clause::new(Occur::Must, term(None, "neo")),
            Clause::new(Occur::MustNot, term(None, "smith")),
            Clause::new(Occur::Should, term(None, "oracle")),
        ])
    );
    assert_eq!(parse(r"\AND"), term(None, "AND"));
}

#[test]
fn test_field_grouping() {
    assert_eq!(
        parse("name:(neo OR trinity)"),
        FullTextQuery::Boolean(vec![
            Clause::new(Occur::Should, term(Some("name"), "neo")),
            Clause::new(Occur::Should, term(Some("name"), "trinity")),
        ])
    );
}

#[test]
fn test_malformed_queries() {
    assert_eq!(parse_error("   "), "query must not be empty");
    assert_eq!(parse_error("()"), "empty group");
    assert_eq!(parse_error("(neo"), "missing closing parenthesis");
    assert_eq!(parse_error("neo)"), "unexpected `)` in query");
    assert_eq!(parse_error("\"free your"), "unterminated quoted phrase");
    assert_eq!(parse_error("neo\\"), "dangling escape character");
    assert_eq!(parse_error("title:"), "missing value for field `title`");
    assert_eq!(parse_error(":neo"), "missing field name before `:`");
    assert!(parse_error("neo AND").starts_with("expected a term after AND"));
    assert!(parse_error("neo OR").starts_with("expected a term after OR"));
}

#[test]
fn test_long_prefix_runs_fold_into_one_modifier() {
    let query = format!("{}neo", "-".repeat(10_000));
    assert_eq!(
        parse(&query),
        FullTextQuery::Boolean(vec![Clause::new(Occur::MustNot, term(None, "neo"))])
    );
    assert_eq!(
        parse(&format!("+{}neo", "NOT ".repeat(10_000))),
        FullTextQuery::Boolean(vec![Clause::new(Occur::Must, term(None, "neo"))])
    );
}

#[test]
fn test_deep_nesting_is_rejected() {
    let deep = format!("{}neo{}", "(".repeat(10_000), ")".repeat(10_000));
    assert_eq!(parse_error(&deep), "query nested too deeply");

    let limit = MAX_QUERY_DEPTH;
    let allowed = format!("{}neo{}", "(".repeat(limit), ")".repeat(limit));
    assert_eq!(parse(&allowed), term(None, "neo"));
    let too_deep = format!("{}neo{}", "(".repeat(limit + 1), ")".repeat(limit + 1));
    assert_eq!(parse_error(&too_deep), "query nested too deeply");
}

#[test]
fn test_deep_queries_against_an_index_fail_cleanly() {
    let index = LabelIndex::new("label-A", "A", IndexConfig::full_text());
    index.add(1, "name", serde_json::json!("neo")).expect("add");
    assert!(
        index
            .query(&format!("{}neo", "-".repeat(5_000)))
            .expect("prefix run")
            .is_empty()
    );
    assert_eq!(
        index
            .query(&format!("{}!neo", "(".repeat(10_000)))
            .map_err(|err| matches!(err, ProcError::InvalidQuery(_))),
        Err(true)
    );
}
