use super::*;

fn constants(fragments: &[Fragment]) -> Vec<&str> {
    fragments
        .iter()
        .filter_map(|f| match f {
            Fragment::Constant(s) => Some(s.as_str()),
            Fragment::Dynamic(_) => None,
        })
        .collect()
}

#[test]
fn test_literal_and_variable() {
    let expr = Expression::concat(vec![
        Expression::text("select * from T where id = "),
        Expression::variable("id", Some("String"), None),
    ]);
    let fragments = deconstruct(&expr);
    assert_eq!(fragments.len(), 2);
    assert_eq!(
        fragments[0],
        Fragment::Constant("select * from T where id = ".to_string())
    );
    assert!(matches!(&fragments[1], Fragment::Dynamic(Expression::VariableRef(r)) if r.name == "id"));
}

#[test]
fn test_resolved_local_becomes_constant() {
    let table = Expression::variable("table", Some("String"), Some(Expression::text("users")));
    let expr = Expression::concat(vec![
        Expression::text("select * from "),
        table,
        Expression::text(" where id = ?"),
    ]);
    let fragments = deconstruct(&expr);
    assert_eq!(
        fragments,
        vec![Fragment::Constant(
            "select * from users where id = ?".to_string()
        )]
    );
}

#[test]
fn test_field_with_concat_initializer_is_spliced() {
    let base = Expression::concat(vec![
        Expression::text("select * "),
        Expression::text("from T "),
    ]);
    let field = Expression::field("BASE", Some("String"), Some(base));
    let expr = Expression::concat(vec![
        field,
        Expression::text("where name = "),
        Expression::variable("name", Some("String"), None),
    ]);
    let fragments = deconstruct(&expr);
    assert_eq!(constants(&fragments), vec!["select * from T where name = "]);
    assert_eq!(fragments.len(), 2);
}

#[test]
fn test_unresolved_field_is_dynamic() {
    let expr = Expression::concat(vec![
        Expression::text("select * from "),
        Expression::field("tableName", Some("String"), None),
    ]);
    let fragments = deconstruct(&expr);
    assert!(matches!(&fragments[1], Fragment::Dynamic(Expression::FieldRef(_))));
}

#[test]
fn test_non_plus_operator_is_single_dynamic() {
    let expr = Expression::Concat(Concat {
        operator: "-".to_string(),
        operands: vec![Expression::number("1"), Expression::number("2")],
        text: "1 - 2".to_string(),
        span: Span::default(),
    });
    let fragments = deconstruct(&expr);
    assert_eq!(fragments.len(), 1);
    assert!(matches!(fragments[0], Fragment::Dynamic(_)));
}

#[test]
fn test_builder_chain_is_unrolled() {
    let builder = Expression::Call(Call {
        receiver: None,
        name: "StringBuilder".to_string(),
        args: vec![Expression::text("select * from T where id = ")],
        constructor: true,
        text: "new StringBuilder(\"select * from T where id = \")".to_string(),
        span: Span::default(),
    });
    let appended = Expression::call(
        Some(builder),
        "append",
        vec![Expression::variable("id", Some("String"), None)],
    );
    let expr = Expression::concat(vec![
        Expression::call(Some(appended), "toString", vec![]),
        Expression::text(" limit 1"),
    ]);
    let fragments = deconstruct(&expr);
    assert_eq!(apparent_shape(&fragments), "select * from T where id = ? limit 1");
}

#[test]
fn test_order_is_preserved() {
    let expr = Expression::concat(vec![
        Expression::text("a"),
        Expression::variable("x", None, None),
        Expression::text("b"),
        Expression::variable("y", None, None),
        Expression::text("c"),
    ]);
    let fragments = deconstruct(&expr);
    assert_eq!(apparent_shape(&fragments), "a?b?c");
    assert_eq!(apparent_source(&fragments), "axbyc");
}

#[test]
fn test_sql_care() {
    assert!(Expression::variable("name", Some("String"), None).is_sql_care());
    assert!(Expression::variable("name", None, None).is_sql_care());
    assert!(!Expression::variable("id", Some("int"), None).is_sql_care());
    assert!(!Expression::variable("id", Some("Long"), None).is_sql_care());
    assert!(!Expression::number("10").is_sql_care());
    assert!(!Expression::variable("n", Some("var"), Some(Expression::number("3"))).is_sql_care());

    let size = Expression::call(Some(Expression::variable("ids", None, None)), "size", vec![]);
    assert!(!size.is_sql_care());

    let enum_name = Expression::call(Some(Expression::opaque("Status.ACTIVE")), "name", vec![]);
    assert!(!enum_name.is_sql_care());

    let join = Expression::call(
        Some(Expression::opaque("String")),
        "join",
        vec![Expression::text(","), Expression::variable("names", None, None)],
    );
    assert!(join.is_sql_care());
}

#[test]
fn test_join_follows_element_type() {
    let join_of = |ty: &str| {
        Expression::call(
            Some(Expression::opaque("StringUtils")),
            "join",
            vec![Expression::variable("ids", Some(ty), None), Expression::text(",")],
        )
    };
    assert!(!join_of("List<Long>").is_sql_care());
    assert!(!join_of("Set<Integer>").is_sql_care());
    assert!(!join_of("long[]").is_sql_care());
    assert!(join_of("List<String>").is_sql_care());
    assert!(join_of("String[]").is_sql_care());
    assert!(join_of("List<? extends CharSequence>").is_sql_care());
    // element type unknown from a raw collection
    assert!(join_of("List").is_sql_care());

    let varargs = Expression::call(
        Some(Expression::opaque("String")),
        "join",
        vec![
            Expression::text(","),
            Expression::variable("a", Some("String"), None),
            Expression::variable("b", Some("String"), None),
        ],
    );
    assert!(varargs.is_sql_care());
}
