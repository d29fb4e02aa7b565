use super::*;
use crate::expr::Expression;

fn xml_rewriter() -> Rewriter {
    Rewriter::new(IgnoreList::builtin(), RewriteOptions::xml(true))
}

fn annotation_rewriter() -> Rewriter {
    Rewriter::new(IgnoreList::builtin(), RewriteOptions::default())
}

fn rewrite(text: &str) -> String {
    xml_rewriter().rewrite(text.to_string(), 0)
}

#[test]
fn test_classify_join_examples() {
    assert_eq!(
        classify_join("select id,name from table where name = ", "value", None),
        RiskVerdict::Risky
    );
    assert_eq!(
        classify_join("update TABLE set ", "field", Some("=1")),
        RiskVerdict::Safe
    );
    assert_eq!(
        classify_join("insert into TABLE(id,", "field", None),
        RiskVerdict::Safe
    );
    assert_eq!(
        classify_join("insert into TABLE(id,name) values(", "value", None),
        RiskVerdict::Risky
    );
}

#[test]
fn test_clause_boundary_table() {
    for prefix in [
        "select ",
        "select id,name from ",
        "insert into ",
        "select * from a left join ",
        "update ",
    ] {
        assert_eq!(classify(prefix), RiskVerdict::Safe, "{prefix:?}");
    }
    for prefix in [
        "select * from T where ",
        "insert into T(a) values ",
        "update T set ",
    ] {
        assert_eq!(classify(prefix), RiskVerdict::Risky, "{prefix:?}");
    }
}

#[test]
fn test_classify_comparison_carve_out() {
    assert_eq!(
        classify_join("select * from T where ", "field", Some(" = #{value}")),
        RiskVerdict::Safe
    );
    assert_eq!(
        classify_join("select * from T where id = 1 and ", "field", Some(" > 3")),
        RiskVerdict::Safe
    );
    // a trailing comparison short-circuits before any keyword is consulted
    assert_eq!(
        classify_join("select * from T where id >= ", "value", Some(" = 1")),
        RiskVerdict::Risky
    );
    // values never gets the carve-out
    assert_eq!(
        classify_join("insert into T(a) values (", "value", Some("= 1")),
        RiskVerdict::Risky
    );
}

#[test]
fn test_classify_is_case_insensitive_and_pure() {
    let prefix = "SELECT * FROM T WHERE name = ";
    assert_eq!(classify(prefix), RiskVerdict::Risky);
    assert_eq!(classify(prefix), classify(prefix));
    assert_eq!(classify("SELECT * FROM "), RiskVerdict::Safe);
}

#[test]
fn test_classify_without_keyword_is_risky() {
    assert_eq!(classify(""), RiskVerdict::Risky);
    assert_eq!(classify("and name like\n    '%"), RiskVerdict::Risky);
}

#[test]
fn test_additive_single_fragment_safe() {
    for prefix in [
        "select ",
        "select id,",
        "select id,name from ",
        "select id,name from table1 inner join",
        "select id,name from table where id = 1 order by ",
        "order by id, ",
        "group by ",
        "group by sum(",
        "group by sum(score),",
        "having ",
        "having sum(",
        "insert into ",
        "insert into TABLE(",
        "insert into TABLE(id,",
        "update ",
        "update TABLE set ",
        "delete from ",
    ] {
        assert_eq!(additive_point_risk(prefix), RiskVerdict::Safe, "{prefix:?}");
    }
}

#[test]
fn test_additive_single_fragment_risky() {
    for prefix in [
        "select id,name from table where name = ",
        "select id,name from table where id = 1 and name= ",
        "insert into TABLE(id,name) values(",
        "update TABLE set id=",
        "update TABLE set id=1, name=",
        "delete from TABLE where name=",
    ] {
        assert_eq!(additive_point_risk(prefix), RiskVerdict::Risky, "{prefix:?}");
    }
}

#[test]
fn test_additive_over_fragments() {
    let fragments = crate::expr::deconstruct(&Expression::concat(vec![
        Expression::text("select * from T where id = "),
        Expression::variable("id", Some("String"), None),
    ]));
    assert_eq!(additive_risk(&fragments), RiskVerdict::Risky);

    let table_then_value = crate::expr::deconstruct(&Expression::concat(vec![
        Expression::text("select * from "),
        Expression::variable("table", Some("String"), None),
        Expression::text(" where id = "),
        Expression::variable("id", Some("String"), None),
    ]));
    assert_eq!(additive_risk(&table_then_value), RiskVerdict::Risky);

    let table_only = crate::expr::deconstruct(&Expression::concat(vec![
        Expression::text("select * from "),
        Expression::variable("table", Some("String"), None),
        Expression::text(" where id = ?"),
    ]));
    assert_eq!(additive_risk(&table_only), RiskVerdict::Safe);
}

#[test]
fn test_additive_ignores_numeric_points() {
    let fragments = crate::expr::deconstruct(&Expression::concat(vec![
        Expression::text("select * from T where id = "),
        Expression::variable("id", Some("long"), None),
    ]));
    assert_eq!(additive_risk(&fragments), RiskVerdict::Safe);
}

#[test]
fn test_ordering_operand_respects_limit() {
    assert_eq!(
        additive_point_risk("select * from T order by name, "),
        RiskVerdict::Safe
    );
    assert_eq!(
        additive_point_risk("select * from T where a = 1 order by id limit "),
        RiskVerdict::Risky
    );
}

#[test]
fn test_split_template_drops_trailing_segment() {
    let re = patterns::format_placeholder();
    assert_eq!(
        split_template("select * from T where a = %s and b = '%s'", re),
        vec!["select * from T where a = ", " and b = '"]
    );
    assert!(split_template("no placeholder", re).is_empty());
    assert_eq!(split_template("where id = %s", re), vec!["where id = "]);

    let prefixes = split_template("select * from %s where id = %s", re);
    assert_eq!(additive_prefixes_risk(&prefixes[..1]), RiskVerdict::Safe);
    assert_eq!(additive_prefixes_risk(&prefixes), RiskVerdict::Risky);
}

#[test]
fn test_template_risk_is_cumulative() {
    let re = patterns::format_placeholder();
    assert_eq!(
        template_risk("select * from %s where name = '%s'", re),
        RiskVerdict::Risky
    );
    assert_eq!(
        template_risk("select * from %s where id = ?", re),
        RiskVerdict::Safe
    );
    assert_eq!(template_risk("select %s, %s from T", re), RiskVerdict::Safe);
}

#[test]
fn test_ignore_list() {
    let ignore = IgnoreList::builtin();
    assert!(ignore.contains("orderByClause"));
    assert!(ignore.contains("ew.sqlSegment"));
    assert!(!ignore.contains("name"));
}

#[test]
fn test_log_method_markers() {
    let markers: Vec<String> = patterns::DEFAULT_LOG_METHOD_MARKERS
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert!(is_log_method("logSql", &markers));
    assert!(is_log_method("printf", &markers));
    assert!(!is_log_method("query", &markers));
    assert!(!is_log_method("executeUpdate", &markers));
}

#[test]
fn test_rewrite_direct_placeholder() {
    assert_eq!(rewrite("where id = ${id}"), "where id = #{id}");
    assert_eq!(
        rewrite("where id = ${id,jdbcType=VARCHAR}"),
        "where id = #{id,jdbcType=VARCHAR}"
    );
}

#[test]
fn test_rewrite_leaves_safe_positions() {
    assert_eq!(rewrite("where ${field} = #{value}"), "where ${field} = #{value}");
    assert_eq!(rewrite("select * from ${table}"), "select * from ${table}");
    assert_eq!(
        rewrite("select * from T order by ${orderByClause}"),
        "select * from T order by ${orderByClause}"
    );
}

#[test]
fn test_rewrite_quotes_and_like() {
    assert_eq!(
        rewrite("where id = \"${id}\" and name like '%${name}%'"),
        "where id = #{id} and name like CONCAT('%', #{name}, '%') "
    );
}

#[test]
fn test_rewrite_like_across_lines() {
    assert_eq!(
        rewrite("and name like\n    '%${name}%'"),
        "and name like CONCAT('%', #{name}, '%') "
    );
}

#[test]
fn test_like_wrap_property() {
    let out = rewrite("name like '%${x}%'");
    assert_eq!(out.matches("CONCAT('%', #{x}, '%')").count(), 1);
    assert!(!out.contains("'%${"));
    assert!(!out.contains("%'%"));
    assert!(!out.contains("}%'"));
}

#[test]
fn test_like_keeps_only_present_wildcards() {
    assert_eq!(
        rewrite("where name like '${prefix}%'"),
        "where name like CONCAT(#{prefix}, '%') "
    );
}

#[test]
fn test_like_with_unbalanced_quote_is_left_alone() {
    let text = "where name like '%${name}";
    assert_eq!(rewrite(text), text);
    assert!(!xml_rewriter().fix(text).complete);
}

#[test]
fn test_rewrite_where_in() {
    let expected = "where id in \n<foreach collection=\"ids\" item=\"idsItem\" open=\"(\" separator=\",\" close=\")\">\n#{idsItem}\n</foreach>\n";
    assert_eq!(rewrite("where id in ${ids}"), expected);
    assert_eq!(rewrite("where id in (${ids})"), expected);
}

#[test]
fn test_rewrite_double_where_in() {
    let out = rewrite("and (createdBy in ${userNameList} or projectId IN ${id})");
    let expected = "and (createdBy in \n\
<foreach collection=\"userNameList\" item=\"userNameListItem\" open=\"(\" separator=\",\" close=\")\">\n\
#{userNameListItem}\n\
</foreach>\n \
or projectId IN \n\
<foreach collection=\"id\" item=\"idItem\" open=\"(\" separator=\",\" close=\")\">\n\
#{idItem}\n\
</foreach>\n)";
    assert_eq!(out, expected);
}

#[test]
fn test_rewrite_keeps_safe_points_in_place() {
    let rewriter = xml_rewriter();
    let fixed = rewriter.fix(
        "select * from ${table} where id in ('${ids}') and name = '${name}' order by ${col}",
    );
    assert_eq!(
        fixed.text,
        "select * from ${table} where id in \n\
<foreach collection=\"ids\" item=\"idsItem\" open=\"(\" separator=\",\" close=\")\">\n\
#{idsItem}\n\
</foreach>\n \
and name = #{name} order by ${col}"
    );
    assert!(fixed.complete);
    // the surviving interpolations still sit in identifier positions
    assert_eq!(rewriter.remaining_risk(&fixed.text), RiskVerdict::Safe);
    assert_eq!(rewriter.rewrite(fixed.text.clone(), 0), fixed.text);
}

#[test]
fn test_partial_rewrite_stays_risky() {
    let rewriter = annotation_rewriter();
    let fixed = rewriter.fix("select * from T where id in (${ids}) and name = '${name}'");
    assert_eq!(
        fixed.text,
        "select * from T where id in (${ids}) and name = #{name}"
    );
    assert!(!fixed.complete);
    assert_eq!(rewriter.remaining_risk(&fixed.text), RiskVerdict::Risky);
    assert_eq!(rewriter.fix(&fixed.text), fixed);
}

#[test]
fn test_plan_outputs_per_variant() {
    let rewriter = xml_rewriter();
    let plan_at = |text: &str| {
        let caps = patterns::dollar_var().captures(text).expect("interpolation");
        let (whole, var) = (caps.get(0).expect("match"), caps.get(1).expect("var"));
        rewriter
            .plan(text, whole.start(), whole.end(), var.as_str())
            .expect("risky point")
    };

    let quoted = plan_at("where name = \"${name}\" and a = 1");
    assert!(matches!(quoted, FixPlan::DirectPlaceholder { .. }));
    assert_eq!(quoted.text(), "where name = #{name} and a = 1");
    assert_eq!(&quoted.text()[..quoted.resume()], "where name = #{name}");

    let like = plan_at("where name like \"%${name}\" and a = 1");
    assert!(matches!(like, FixPlan::LikeWrap { .. }));
    assert_eq!(like.text(), "where name like CONCAT('%', #{name}) and a = 1");
    assert_eq!(
        &like.text()[..like.resume()],
        "where name like CONCAT('%', #{name}) "
    );

    let bare_in = plan_at("where id in ${ids} and a = 1");
    assert!(matches!(bare_in, FixPlan::WhereInForeach { .. }));
    assert_eq!(
        bare_in.text(),
        "where id in \n<foreach collection=\"ids\" item=\"idsItem\" open=\"(\" separator=\",\" close=\")\">\n#{idsItem}\n</foreach>\n and a = 1"
    );
    assert!(bare_in.text()[bare_in.resume()..].starts_with(" and a = 1"));

    let quoted_in = plan_at("where user.id in (\"${ids}\")");
    assert_eq!(
        quoted_in.text(),
        "where user.id in \n<foreach collection=\"ids\" item=\"idsItem\" open=\"(\" separator=\",\" close=\")\">\n#{idsItem}\n</foreach>\n"
    );
}

#[test]
fn test_escaped_comparators_in_xml_text() {
    let rewriter = xml_rewriter();
    assert_eq!(
        rewriter.remaining_risk("where ${col} &lt; 3"),
        RiskVerdict::Safe
    );
    assert_eq!(
        rewriter.remaining_risk("where ${col} &gt;= #{min}"),
        RiskVerdict::Safe
    );
    assert_eq!(
        rewriter.remaining_risk("where a &lt;= ${max}"),
        RiskVerdict::Risky
    );
    assert_eq!(rewrite("where ${col} &lt; 3"), "where ${col} &lt; 3");
    // outside XML the entity is plain text
    assert_eq!(
        annotation_rewriter().remaining_risk("where ${col} &lt; 3"),
        RiskVerdict::Risky
    );
}

#[test]
fn test_annotation_where_in_stays_unresolved() {
    let rewriter = annotation_rewriter();
    let fixed = rewriter.fix("select count(1) from T where id in (${ids}) and name = ${name}");
    assert_eq!(
        fixed.text,
        "select count(1) from T where id in (${ids}) and name = #{name}"
    );
    assert!(!fixed.complete);
}

#[test]
fn test_annotation_quoted_value() {
    let fixed = annotation_rewriter().fix("select count(1) from T where id = '${id}'");
    assert_eq!(fixed.text, "select count(1) from T where id = #{id}");
    assert!(fixed.complete);
}

#[test]
fn test_plan_variants() {
    let rewriter = xml_rewriter();
    let text = "where id = ${id}";
    let plan = rewriter.plan(text, 11, 16, "id").expect("risky point");
    assert!(matches!(plan, FixPlan::DirectPlaceholder { .. }));
    assert_eq!(plan.text(), "where id = #{id}");
    assert_eq!(plan.resume(), "where id = #{id}".len());

    assert!(rewriter.plan("from ${t}", 5, 9, "t").is_none());
}
