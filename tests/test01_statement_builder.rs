use pg_dbc::prelude::*;

#[test]
fn insert_uses_quoted_fields_and_ordered_params() -> Result<(), DbcError> {
    let stmt = build_insert(
        "users",
        ColumnValues::new().set("name", "alice").set("age", 30_i64),
    )?;
    assert_eq!(
        stmt.sql,
        r#"INSERT INTO users ("name", "age") VALUES ($1, $2)"#
    );
    assert_eq!(
        stmt.params,
        vec![RowValues::Text("alice".into()), RowValues::Int(30)]
    );
    Ok(())
}

#[test]
fn update_numbers_where_before_set() -> Result<(), DbcError> {
    let stmt = build_update(
        "users",
        &FilterCondition::new().eq("id", 5_i64),
        ColumnValues::new().set("name", "x"),
    )?;
    assert_eq!(stmt.sql, r#"UPDATE users SET "name" = $2 WHERE "id" = $1"#);
    assert_eq!(
        stmt.params,
        vec![RowValues::Int(5), RowValues::Text("x".into())]
    );
    Ok(())
}

#[test]
fn select_with_in_list_order_limit_offset() -> Result<(), DbcError> {
    let stmt = SelectQuery::new("events")
        .fields(["id", "kind"])
        .filter(
            FilterCondition::new()
                .any_of("kind", ["a", "b", "c"])
                .eq("owner", 7_i64),
        )
        .order_by("at", "desc")
        .order_by("id", "ASC")
        .limit(20)
        .offset(40)
        .build()?;
    assert_eq!(
        stmt.sql,
        r#"SELECT "id", "kind" FROM events WHERE "kind" IN ($1, $2, $3) AND "owner" = $4 ORDER BY at DESC, id ASC LIMIT 20 OFFSET 40"#
    );
    assert_eq!(stmt.params.len(), 4);
    Ok(())
}

#[test]
fn delete_without_filter_matches_everything() {
    let stmt = build_delete("sessions", &FilterCondition::new());
    assert_eq!(stmt.sql, "DELETE FROM sessions WHERE true");
    assert!(stmt.params.is_empty());
}

#[test]
fn empty_bind_is_true() {
    let bound = bind_filter(&FilterCondition::new());
    assert_eq!(bound.sql, "true");
    assert!(bound.params.is_empty());
}

#[test]
fn invalid_select_arguments_are_rejected_before_sql() {
    for query in [
        SelectQuery::new("t").limit(0),
        SelectQuery::new("t").limit(-1),
        SelectQuery::new("t").offset(-1),
        SelectQuery::new("t").order_by("id", "sideways"),
    ] {
        let err = query.build().unwrap_err();
        assert!(matches!(err, DbcError::InvalidArgument(_)), "{err}");
    }
}

#[test]
fn empty_insert_and_update_are_rejected() {
    assert!(matches!(
        build_insert("t", ColumnValues::new()),
        Err(DbcError::InvalidArgument(_))
    ));
    assert!(matches!(
        build_update("t", &FilterCondition::new(), ColumnValues::new()),
        Err(DbcError::InvalidArgument(_))
    ));
}

#[test]
fn sort_direction_parses_case_insensitively() {
    assert_eq!(SortDirection::parse("desc").unwrap(), SortDirection::Desc);
    assert_eq!(SortDirection::parse("Asc").unwrap(), SortDirection::Asc);
    assert!(SortDirection::parse(" ASC").is_err());
}
