use tinyorm::OrmError;
use tinyorm::construct::{Instance, Model};
use tinyorm::database::Database;
use tinyorm::datatype::Value;
use tinyorm::field::Field;
use tinyorm::persist::SqliteStore;
use tinyorm::settings::PersistenceMode;

fn define_people(db: &Database) {
    db.define(Model::new("Person").with_field("name", Field::string()))
        .expect("define Person");
    db.define(
        Model::new("Passport")
            .with_field("number", Field::string())
            .with_field("holder", Field::one_to_one("Person")),
    )
    .expect("define Passport");
}

fn save_person(db: &Database, name: &str) -> Instance {
    let mut person = db.create("Person").expect("create");
    person.set("name", name).expect("set name");
    db.save(&mut person).expect("person saves without a passport");
    person
}

// the same scenario for every backend
fn both_sides_resolve(db: &Database) {
    define_people(db);
    let person = save_person(db, "Ada");
    let _ = save_person(db, "Grace");
    let mut passport = db.create("Passport").expect("create");
    passport.set("number", "X-1").expect("set number");
    passport.set("holder", person.clone()).expect("set holder");
    db.save(&mut passport).expect("save passport");

    let mut passport = db.get("Passport", passport.pk().expect("pk")).expect("get");
    let holder = db.fetch_one(&mut passport, "holder").expect("read").expect("holder");
    assert_eq!(holder.pk(), person.pk());

    let mut person = db.get("Person", person.pk().expect("pk")).expect("get");
    let owned = db.fetch_one(&mut person, "passport").expect("read").expect("passport");
    assert_eq!(owned.pk(), passport.pk());
    assert_eq!(owned.get("number").and_then(Value::as_text), Some("X-1"));
}

#[test]
fn both_sides_resolve_in_memory() {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    both_sides_resolve(&db);
}

#[test]
fn both_sides_resolve_in_sqlite() {
    let db = Database::with_store(SqliteStore::in_memory().expect("sqlite"));
    both_sides_resolve(&db);
}

#[test]
fn side_without_counterpart_reads_nothing() {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    define_people(&db);
    let person = save_person(&db, "Ada");
    let mut person = db.get("Person", person.pk().expect("pk")).expect("get");
    assert_eq!(db.fetch_one(&mut person, "passport").expect("read"), None);
}

#[test]
fn instances_built_before_a_definition_take_its_fields() {
    let db = Database::new(PersistenceMode::InMemory).expect("db");
    db.define(Model::new("Person").with_field("name", Field::string()))
        .expect("define Person");
    let mut person = db.create("Person").expect("create");
    person.set("name", "Ada").expect("set name");
    db.define(Model::new("Passport").with_field("holder", Field::one_to_one("Person")))
        .expect("define Passport");

    // the instance has no slot for the installed field
    assert!(matches!(person.set("passport", Value::Null), Err(OrmError::NotFound(_))));
    db.save(&mut person).expect("save person");
    let mut passport = db.create("Passport").expect("create");
    passport.set("holder", person.clone()).expect("set holder");
    db.save(&mut passport).expect("save passport");
    db.set(&mut person, "passport", passport.clone()).expect("set by definition");
    assert!(matches!(
        db.set(&mut person, "nickname", "A"),
        Err(OrmError::NotFound(_))
    ));
    db.save(&mut person).expect("save person again");

    let mut stored = db.get("Person", person.pk().expect("pk")).expect("get");
    let owned = db.fetch_one(&mut stored, "passport").expect("read").expect("passport");
    assert_eq!(owned.pk(), passport.pk());
}
