use super::*;
use crate::ast::*;
use crate::error::SecurityViolation;
use crate::ident::Alias;
use crate::registry::NamedQuery;
use pretty_assertions::assert_eq;
use serde_json::json;

fn registry() -> Registry {
    let category_offerings = NamedQuery {
        from: FromClause::new("categories", alias("c")),
        joins: vec![JoinClause::new(
            JoinType::Inner,
            "offerings",
            alias("o"),
            JoinColumnCondition::eq(key("o.category_id"), key("c.id")),
        )],
    };
    Registry::builder()
        .register("w", "wholesalers", &["id", "name", "status"])
        .register("o", "offerings", &["id", "wholesaler_id", "category_id", "price"])
        .register("c", "categories", &["id", "name"])
        .register("x", "audit_log", &["*"])
        .named_query("category_offerings", category_offerings)
        .build()
        .unwrap()
}

fn alias(s: &str) -> Alias {
    Alias::parse(s).unwrap()
}

fn key(s: &str) -> ColumnKey {
    ColumnKey::parse(s).unwrap()
}

fn payload(value: serde_json::Value) -> QueryPayload {
    serde_json::from_value(value).unwrap()
}

fn wholesalers_page() -> QueryPayload {
    payload(json!({
        "select": ["w.id", "w.name"],
        "from": { "table": "wholesalers", "alias": "w" },
        "where": { "columnKey": "w.status", "operator": "=", "value": "active" },
        "limit": 10
    }))
}

fn security(err: QueryError) -> SecurityViolation {
    match err {
        QueryError::Security(v) => v,
        other => panic!("expected security violation, got {:?}", other),
    }
}

#[test]
fn test_active_wholesalers_page() {
    let registry = registry();
    let compiled = compile(&wholesalers_page(), &registry, None, None).unwrap();

    assert_eq!(
        compiled.sql,
        "SELECT w.id, w.name FROM wholesalers w WHERE w.status = @p0 \
         ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
    );
    assert_eq!(compiled.parameters.len(), 1);
    assert_eq!(compiled.parameters.get("p0"), Some(&Scalar::Text("active".into())));
    assert_eq!(
        serde_json::to_value(&compiled.parameters).unwrap(),
        json!({ "p0": "active" })
    );
}

#[test]
fn test_metadata() {
    let registry = registry();
    let compiled = compile(&wholesalers_page(), &registry, None, None).unwrap();
    assert_eq!(
        compiled.metadata,
        QueryMetadata {
            selected_columns: vec!["w.id".into(), "w.name".into()],
            has_joins: false,
            has_where: true,
            parameter_count: 1,
            table_name: "wholesalers".into(),
            named_query: None,
            dialect: Dialect::SqlServer,
        }
    );
}

#[test]
fn test_named_query_ignores_payload_from() {
    let registry = registry();
    let p = payload(json!({
        "select": ["c.name", "o.price"],
        "from": { "table": "wholesalers", "alias": "w" }
    }));
    let compiled = compile(&p, &registry, Some("category_offerings"), None).unwrap();

    assert_eq!(
        compiled.sql,
        "SELECT c.name, o.price FROM categories c INNER JOIN offerings o ON o.category_id = c.id"
    );
    assert!(compiled.parameters.is_empty());
    assert_eq!(compiled.metadata.table_name, "categories");
    assert_eq!(compiled.metadata.named_query.as_deref(), Some("category_offerings"));
    assert!(compiled.metadata.has_joins);
}

#[test]
fn test_named_query_appends_client_joins() {
    let registry = registry();
    let p = payload(json!({
        "select": ["c.name", "w.name"],
        "joins": [{
            "joinType": "LEFT",
            "table": "wholesalers",
            "alias": "w",
            "on": { "columnA": "w.id", "operator": "=", "columnB": "o.wholesaler_id" }
        }]
    }));
    let compiled = compile(&p, &registry, Some("category_offerings"), None).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT c.name, w.name FROM categories c \
         INNER JOIN offerings o ON o.category_id = c.id \
         LEFT JOIN wholesalers w ON w.id = o.wholesaler_id"
    );
}

#[test]
fn test_anti_join() {
    let registry = registry();
    let p = payload(json!({
        "select": ["w.id", "w.name"],
        "from": { "table": "wholesalers", "alias": "w" },
        "joins": [{
            "joinType": "LEFT",
            "table": "offerings",
            "alias": "o",
            "on": {
                "logicalOperator": "AND",
                "conditions": [
                    { "columnA": "o.wholesaler_id", "operator": "=", "columnB": "w.id" },
                    { "columnKey": "o.category_id", "operator": "=", "value": 7 }
                ]
            }
        }],
        "where": { "columnKey": "o.id", "operator": "IS NULL" }
    }));
    let compiled = compile(&p, &registry, None, None).unwrap();

    assert_eq!(
        compiled.sql,
        "SELECT w.id, w.name FROM wholesalers w \
         LEFT JOIN offerings o ON (o.wholesaler_id = w.id AND o.category_id = @p0) \
         WHERE o.id IS NULL"
    );
    assert_eq!(compiled.parameters.len(), 1);
    assert_eq!(compiled.parameters.get("p0"), Some(&Scalar::Int(7)));
}

#[test]
fn test_on_parameters_precede_where_parameters() {
    let registry = registry();
    let p = QueryPayload::select(vec![key("w.id")])
        .from_clause(FromClause::new("wholesalers", alias("w")))
        .join(JoinClause::new(
            JoinType::Inner,
            "offerings",
            alias("o"),
            OnFilter::and(vec![
                JoinColumnCondition::eq(key("o.wholesaler_id"), key("w.id")).into(),
                Condition::new(key("o.price"), Operator::Gt, 100i64).into(),
            ]),
        ))
        .filter(Condition::eq(key("w.status"), "active"));
    let compiled = compile(&p, &registry, None, None).unwrap();

    assert!(compiled.sql.contains("o.price > @p0"), "{}", compiled.sql);
    assert!(compiled.sql.ends_with("WHERE w.status = @p1"), "{}", compiled.sql);
    assert_eq!(compiled.parameters.get("p1"), Some(&Scalar::Text("active".into())));
}

#[test]
fn test_group_and_in_list() {
    let registry = registry();
    let p = QueryPayload::select(vec![key("w.id")])
        .from_clause(FromClause::new("wholesalers", alias("w")))
        .filter(Filter::or(vec![
            Condition::eq(key("w.status"), "active").into(),
            Condition::in_list(key("w.id"), vec![Scalar::Int(1), Scalar::Int(2), Scalar::Int(3)]).into(),
        ]));
    let compiled = compile(&p, &registry, None, None).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT w.id FROM wholesalers w WHERE (w.status = @p0 OR w.id IN (@p1, @p2, @p3))"
    );
    assert_eq!(compiled.metadata.parameter_count, 4);
}

#[test]
fn test_empty_in_list_matches_nothing() {
    let registry = registry();
    for op in ["IN", "NOT IN"] {
        let p = payload(json!({
            "select": ["w.id"],
            "from": { "table": "wholesalers", "alias": "w" },
            "where": { "columnKey": "w.id", "operator": op, "value": [] }
        }));
        let compiled = compile(&p, &registry, None, None).unwrap();
        assert_eq!(compiled.sql, "SELECT w.id FROM wholesalers w WHERE 1=0");
        assert!(compiled.parameters.is_empty());
    }
}

#[test]
fn test_idempotent() {
    let registry = registry();
    let compiler = QueryCompiler::new(&registry);
    let first = compiler.compile(&wholesalers_page(), None, None).unwrap();
    let second = compiler.compile(&wholesalers_page(), None, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unqualified_columns_resolve_to_from_alias() {
    let registry = registry();
    let p = payload(json!({
        "select": ["name"],
        "from": { "table": "wholesalers", "alias": "w" },
        "where": { "columnKey": "status", "operator": "!=", "value": "closed" },
        "orderBy": [{ "columnKey": "name" }]
    }));
    let compiled = compile(&p, &registry, None, None).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT w.name FROM wholesalers w WHERE w.status != @p0 ORDER BY w.name ASC"
    );
}

#[test]
fn test_empty_select_expands_to_allowed_columns() {
    let registry = registry();
    let p = QueryPayload::default().from_clause(FromClause::new("wholesalers", alias("w")));
    let compiled = compile(&p, &registry, None, None).unwrap();
    assert_eq!(compiled.sql, "SELECT w.id, w.name, w.status FROM wholesalers w");
    assert!(!compiled.metadata.has_where);
}

#[test]
fn test_wildcard_entry() {
    let registry = registry();
    let from = FromClause::new("audit_log", alias("x"));

    let err = compile(&QueryPayload::default().from_clause(from.clone()), &registry, None, None).unwrap_err();
    assert!(matches!(err, QueryError::InvalidQuery(_)));

    let p = QueryPayload::select(vec![key("x.actor"), key("x.action")]).from_clause(from);
    let compiled = compile(&p, &registry, None, None).unwrap();
    assert_eq!(compiled.sql, "SELECT x.actor, x.action FROM audit_log x");
}

#[test]
fn test_fixed_from_overrides_payload_from() {
    let registry = registry();
    let p = payload(json!({
        "select": ["o.id", "o.price"],
        "from": { "table": "wholesalers", "alias": "w" }
    }));
    let fixed = FromClause::new("offerings", alias("o"));
    let compiled = compile(&p, &registry, None, Some(&fixed)).unwrap();
    assert_eq!(compiled.sql, "SELECT o.id, o.price FROM offerings o");
}

#[test]
fn test_named_query_beats_fixed_from() {
    let registry = registry();
    let p = QueryPayload::select(vec![key("c.name")]);
    let fixed = FromClause::new("offerings", alias("o"));
    let compiled = compile(&p, &registry, Some("category_offerings"), Some(&fixed)).unwrap();
    assert!(compiled.sql.starts_with("SELECT c.name FROM categories c"), "{}", compiled.sql);
}

#[test]
fn test_missing_source_is_configuration_error() {
    let registry = registry();
    let p = QueryPayload::select(vec![key("w.id")]);
    let err = compile(&p, &registry, None, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = compile(&wholesalers_page(), &registry, Some("no_such_query"), None).unwrap_err();
    assert!(matches!(err, QueryError::Configuration(ref msg) if msg.contains("no_such_query")));
}

#[test]
fn test_unregistered_alias() {
    let registry = registry();
    let p = payload(json!({
        "select": ["u.id"],
        "from": { "table": "users", "alias": "u" }
    }));
    let err = compile(&p, &registry, None, None).unwrap_err();
    assert_eq!(
        security(err),
        SecurityViolation::UnregisteredAlias { alias: "u".into() }
    );
}

#[test]
fn test_alias_table_mismatch() {
    let registry = registry();
    let p = payload(json!({
        "select": ["w.id"],
        "from": { "table": "users", "alias": "w" }
    }));
    let err = compile(&p, &registry, None, None).unwrap_err();
    assert_eq!(err.status_code(), 403);
    assert_eq!(
        security(err),
        SecurityViolation::AliasTableMismatch {
            alias: "w".into(),
            registered: "wholesalers".into(),
            requested: "users".into(),
        }
    );
}

#[test]
fn test_join_without_alias() {
    let registry = registry();
    let p = payload(json!({
        "select": ["w.id"],
        "from": { "table": "wholesalers", "alias": "w" },
        "joins": [{
            "joinType": "LEFT",
            "table": "offerings",
            "on": { "columnA": "o.wholesaler_id", "operator": "=", "columnB": "w.id" }
        }]
    }));
    let err = compile(&p, &registry, None, None).unwrap_err();
    assert_eq!(
        security(err),
        SecurityViolation::JoinMissingAlias { table: "offerings".into() }
    );
}

#[test]
fn test_join_table_mismatch() {
    let registry = registry();
    let p = payload(json!({
        "select": ["w.id"],
        "from": { "table": "wholesalers", "alias": "w" },
        "joins": [{
            "table": "users",
            "alias": "o",
            "on": { "columnA": "o.id", "operator": "=", "columnB": "w.id" }
        }]
    }));
    let err = compile(&p, &registry, None, None).unwrap_err();
    assert!(matches!(security(err), SecurityViolation::AliasTableMismatch { .. }));
}

#[test]
fn test_join_with_unregistered_alias() {
    let registry = registry();
    let p = payload(json!({
        "select": ["w.id"],
        "from": { "table": "wholesalers", "alias": "w" },
        "joins": [{
            "joinType": "INNER",
            "table": "users",
            "alias": "u",
            "on": { "columnA": "u.wholesaler_id", "operator": "=", "columnB": "w.id" }
        }]
    }));
    let err = compile(&p, &registry, None, None).unwrap_err();
    assert_eq!(err.status_code(), 403);
    assert_eq!(
        security(err),
        SecurityViolation::UnregisteredAlias { alias: "u".into() }
    );
}

#[test]
fn test_client_join_cannot_reuse_named_query_alias() {
    let registry = registry();
    let p = payload(json!({
        "select": ["c.name"],
        "joins": [{
            "joinType": "LEFT",
            "table": "offerings",
            "alias": "o",
            "on": { "columnA": "o.category_id", "operator": "=", "columnB": "c.id" }
        }]
    }));
    let err = compile(&p, &registry, Some("category_offerings"), None).unwrap_err();
    assert!(matches!(err, QueryError::InvalidQuery(ref msg) if msg.contains("'o'")));
}

#[test]
fn test_rejected_compile_yields_no_query_or_parameters() {
    let registry = registry();
    let compiler = QueryCompiler::new(&registry);
    let rejected = payload(json!({
        "select": ["w.id"],
        "from": { "table": "wholesalers", "alias": "w" },
        "joins": [{
            "joinType": "LEFT",
            "table": "offerings",
            "alias": "o",
            "on": { "columnKey": "o.price", "operator": ">", "value": 5 }
        }],
        "where": { "columnKey": "w.status", "operator": "=", "value": "active" },
        "orderBy": [{ "columnKey": "w.password_hash" }]
    }));

    let result = compiler.compile(&rejected, None, None);
    assert!(matches!(result, Err(QueryError::Security(_))));

    let compiled = compiler.compile(&wholesalers_page(), None, None).unwrap();
    assert_eq!(compiled.parameters.len(), 1);
    assert_eq!(compiled.parameters.get("p0"), Some(&Scalar::Text("active".into())));
}

#[test]
fn test_reserved_word_table_is_quoted() {
    let registry = Registry::builder()
        .register("r", "order", &["id", "user"])
        .build()
        .unwrap();
    let p = payload(json!({
        "select": ["r.id", "r.user"],
        "from": { "table": "order", "alias": "r" },
        "orderBy": [{ "columnKey": "r.user" }]
    }));

    let compiled = compile(&p, &registry, None, None).unwrap();
    assert_eq!(compiled.sql, "SELECT r.id, r.[user] FROM [order] r ORDER BY r.[user] ASC");
    assert_eq!(compiled.metadata.selected_columns, vec!["r.id", "r.user"]);

    let compiled = QueryCompiler::new(&registry)
        .dialect(Dialect::Postgres)
        .compile(&p, None, None)
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT r.id, r.\"user\" FROM \"order\" r ORDER BY r.\"user\" ASC"
    );
}

#[test]
fn test_columns_outside_whitelist() {
    let registry = registry();

    let p = QueryPayload::select(vec![key("w.password_hash")])
        .from_clause(FromClause::new("wholesalers", alias("w")));
    let err = compile(&p, &registry, None, None).unwrap_err();
    assert_eq!(
        security(err),
        SecurityViolation::ColumnNotAllowed {
            alias: "w".into(),
            column: "password_hash".into(),
        }
    );

    let p = QueryPayload::select(vec![key("w.id")])
        .from_clause(FromClause::new("wholesalers", alias("w")))
        .order_by(key("w.created_at"), SortDirection::Desc);
    assert!(matches!(
        compile(&p, &registry, None, None),
        Err(QueryError::Security(SecurityViolation::ColumnNotAllowed { .. }))
    ));

    let p = QueryPayload::select(vec![key("w.id")])
        .from_clause(FromClause::new("wholesalers", alias("w")))
        .filter(Condition::eq(key("c.name"), "tools"));
    assert!(matches!(
        compile(&p, &registry, None, None),
        Err(QueryError::Security(SecurityViolation::AliasNotInQuery { .. }))
    ));
}

#[test]
fn test_postgres_dialect() {
    let registry = registry();
    let p = wholesalers_page()
        .order_by(key("w.name"), SortDirection::Desc)
        .offset(20);
    let compiled = QueryCompiler::new(&registry)
        .dialect(Dialect::Postgres)
        .compile(&p, None, None)
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT w.id, w.name FROM wholesalers w WHERE w.status = $1 ORDER BY w.name DESC LIMIT 10 OFFSET 20"
    );
    assert_eq!(compiled.parameters.get("p0"), Some(&Scalar::Text("active".into())));
    assert_eq!(compiled.metadata.dialect, Dialect::Postgres);
}

#[test]
fn test_sqlite_dialect() {
    let registry = registry();
    let compiled = QueryCompiler::new(&registry)
        .dialect(Dialect::Sqlite)
        .compile(&wholesalers_page(), None, None)
        .unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT w.id, w.name FROM wholesalers w WHERE w.status = ? LIMIT 10"
    );
}

#[test]
fn test_pagination_bounds() {
    let registry = registry();
    let base = QueryPayload::select(vec![key("w.id")])
        .from_clause(FromClause::new("wholesalers", alias("w")))
        .order_by(key("w.id"), SortDirection::Asc);

    let no_limit = compile(&base.clone().limit(0).offset(5), &registry, None, None).unwrap();
    assert_eq!(no_limit.sql, "SELECT w.id FROM wholesalers w ORDER BY w.id ASC");

    let negative = compile(&base.clone().limit(-3), &registry, None, None).unwrap();
    assert_eq!(negative.sql, no_limit.sql);

    let clamped_offset = compile(&base.clone().limit(5).offset(-10), &registry, None, None).unwrap();
    assert!(clamped_offset.sql.ends_with("OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"));

    let capped = QueryCompiler::new(&registry)
        .max_limit(100)
        .compile(&base.limit(5000), None, None)
        .unwrap();
    assert!(capped.sql.ends_with("FETCH NEXT 100 ROWS ONLY"), "{}", capped.sql);
}

#[test]
fn test_compile_count() {
    let registry = registry();
    let p = wholesalers_page()
        .order_by(key("w.name"), SortDirection::Asc)
        .offset(40);
    let compiled = QueryCompiler::new(&registry).compile_count(&p, None, None).unwrap();

    assert_eq!(
        compiled.sql,
        "SELECT COUNT(*) AS total_count FROM wholesalers w WHERE w.status = @p0"
    );
    assert_eq!(compiled.parameters.len(), 1);
    assert_eq!(compiled.metadata.selected_columns, vec![COUNT_COLUMN.to_string()]);
}

#[test]
fn test_parameter_limit() {
    let registry = registry();
    let ids: Vec<Scalar> = (0..2101).map(Scalar::Int).collect();
    let p = QueryPayload::select(vec![key("w.id")])
        .from_clause(FromClause::new("wholesalers", alias("w")))
        .filter(Condition::in_list(key("w.id"), ids));

    let err = compile(&p, &registry, None, None).unwrap_err();
    assert!(matches!(err, QueryError::InvalidQuery(_)));

    let compiled = QueryCompiler::new(&registry)
        .dialect(Dialect::Postgres)
        .compile(&p, None, None)
        .unwrap();
    assert_eq!(compiled.parameters.len(), 2101);
}

#[test]
fn test_compiled_query_serializes_for_audit() {
    let registry = registry();
    let compiled = compile(&wholesalers_page(), &registry, None, None).unwrap();
    let value = serde_json::to_value(&compiled).unwrap();
    assert_eq!(value["parameters"], json!({ "p0": "active" }));
    assert_eq!(value["metadata"]["selectedColumns"], json!(["w.id", "w.name"]));
    assert_eq!(value["metadata"]["dialect"], json!("sqlserver"));
    assert!(value["metadata"].get("namedQuery").is_none());
}
