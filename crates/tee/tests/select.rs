mod common;

use common::{Call, MockDb, row};
use tee::{Filter, Model, OrmError, Value, Where};

#[derive(Debug, PartialEq, tee::Model)]
#[orm(table = "users")]
struct User {
    #[orm(id)]
    id: Option<i64>,
    name: String,
    email: Option<String>,
}

fn alice() -> tee::Row {
    row([
        ("id", Value::Int(1)),
        ("name", Value::from("alice")),
        ("email", Value::from("alice@example.com")),
    ])
}

fn bob() -> tee::Row {
    row([
        ("id", Value::Int(2)),
        ("name", Value::from("bob")),
        ("email", Value::Null),
    ])
}

#[tokio::test]
async fn list_maps_rows_in_order() {
    let db = MockDb::register("select_list");
    db.push_rows(vec![alice(), bob()]);

    let users = User::select()
        .using("select_list")
        .like(User::NAME, "o")
        .list()
        .await
        .unwrap();

    assert_eq!(
        users,
        vec![
            User {
                id: Some(1),
                name: "alice".into(),
                email: Some("alice@example.com".into()),
            },
            User {
                id: Some(2),
                name: "bob".into(),
                email: None,
            },
        ]
    );
    assert_eq!(
        db.statements(),
        vec![(
            "SELECT id, name, email FROM users WHERE name LIKE ?".to_string(),
            vec![Value::from("%o%")],
        )]
    );
}

#[tokio::test]
async fn each_call_opens_and_closes_its_own_connection() {
    let db = MockDb::register("select_lifecycle");

    User::select().using("select_lifecycle").list().await.unwrap();
    User::select().using("select_lifecycle").list().await.unwrap();

    let calls = db.calls();
    assert_eq!(calls.len(), 6);
    assert!(matches!(calls[0], Call::Connect { conn: 1, autocommit: true }));
    assert!(matches!(calls[1], Call::Query { conn: 1, .. }));
    assert_eq!(calls[2], Call::Close(1));
    assert!(matches!(calls[3], Call::Connect { conn: 2, autocommit: true }));
    assert_eq!(calls[5], Call::Close(2));
    assert_eq!(tee::context::state(), tee::UnitState::Idle);
}

#[tokio::test]
async fn empty_results() {
    let db = MockDb::register("select_empty");

    let users = User::select().using("select_empty").list().await.unwrap();
    assert!(users.is_empty());

    let one = User::select().using("select_empty").one().await.unwrap();
    assert_eq!(one, None);

    let first = User::select().using("select_empty").first().await.unwrap();
    assert_eq!(first, None);

    let err = User::select()
        .using("select_empty")
        .get(false)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(db.count(|c| matches!(c, Call::Query { .. })), 4);
}

#[tokio::test]
async fn get_rejects_multiple_rows() {
    let db = MockDb::register("select_multiple");
    db.push_rows(vec![alice(), bob()]);

    let err = User::select()
        .using("select_multiple")
        .get(false)
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::MultipleRecords(2)));
}

#[tokio::test]
async fn first_limits_to_one_row() {
    let db = MockDb::register("select_first");
    db.push_rows(vec![bob()]);

    let user = User::select()
        .using("select_first")
        .group(Where::or().eq(User::ID, 2).eq(User::NAME, "bob"))
        .desc(&[User::ID])
        .first()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.name, "bob");

    let (sql, args) = db.statements().remove(0);
    assert_eq!(
        sql,
        "SELECT id, name, email FROM users WHERE (id = ? OR name = ?) ORDER BY id DESC LIMIT 1"
    );
    assert_eq!(args, vec![Value::Int(2), Value::from("bob")]);
}

#[tokio::test]
async fn narrowed_projection_leaves_optional_fields_empty() {
    let db = MockDb::register("select_columns");
    db.push_rows(vec![row([
        ("id", Value::Int(1)),
        ("name", Value::from("alice")),
    ])]);

    let user = User::select()
        .using("select_columns")
        .columns(&[User::ID, User::NAME])
        .one()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.email, None);
    assert_eq!(db.statements()[0].0, "SELECT id, name FROM users");
}

#[tokio::test]
async fn decode_failure_is_reported_with_column() {
    let db = MockDb::register("select_decode");
    db.push_rows(vec![row([
        ("id", Value::from("not a number")),
        ("name", Value::from("alice")),
    ])]);

    let err = User::select()
        .using("select_decode")
        .list()
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "id"));
}

#[tokio::test]
async fn unknown_database_fails_before_any_call() {
    let err = User::select()
        .using("select_never_registered")
        .list()
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::UnknownDatabase(ref n) if n == "select_never_registered"));
}
