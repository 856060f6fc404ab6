use tinyorm::OrmError;
use tinyorm::construct::{Model, ModelKeeper};
use tinyorm::datatype::DataType;
use tinyorm::field::{Field, RelationKind};
use tinyorm::relation;

fn keeper_with_authors() -> ModelKeeper {
    let mut keeper = ModelKeeper::new();
    keeper
        .define(Model::new("Author").with_field("name", Field::string()))
        .expect("define Author");
    keeper
}

#[test]
fn foreign_key_installs_back_reference() {
    let mut keeper = keeper_with_authors();
    keeper
        .define(
            Model::new("Book")
                .with_field("title", Field::string())
                .with_field("author", Field::foreign_key("Author")),
        )
        .expect("define Book");
    let author = keeper.lookup("Author").expect("Author");
    let books = author.field("books").expect("back-reference installed");
    assert_eq!(books.data_type(), &DataType::Model("Book".to_string()));
    assert_eq!(
        books.kind(),
        Some(&RelationKind::ToOneInverse {
            foreign_key: "author".to_string()
        })
    );
    assert!(!books.serialize());
    assert!(books.relation().expect("relation").initialized());
}

#[test]
fn explicit_inverse_name_is_used() {
    let mut keeper = keeper_with_authors();
    keeper
        .define(Model::new("Book").with_field("writer", Field::foreign_key("Author").related_name("works")))
        .expect("define Book");
    let author = keeper.lookup("Author").expect("Author");
    assert!(author.field("works").is_some());
    assert!(author.field("books").is_none());
}

#[test]
fn one_to_one_is_symmetric() {
    let mut keeper = ModelKeeper::new();
    keeper
        .define(Model::new("Person").with_field("name", Field::string()))
        .expect("define Person");
    keeper
        .define(Model::new("Passport").with_field("holder", Field::one_to_one("Person")))
        .expect("define Passport");
    let person = keeper.lookup("Person").expect("Person");
    let passport = person.field("passport").expect("counterpart installed");
    assert_eq!(passport.related(), Some("Passport"));
    assert_eq!(
        passport.kind(),
        Some(&RelationKind::OneToOne {
            related_name: Some("holder".to_string())
        })
    );
    assert!(passport.serialize());
    // a person may exist before any passport does
    assert!(passport.is_blank());
    assert!(passport.relation().expect("relation").initialized());
}

#[test]
fn many_to_many_synthesizes_join_model() {
    let mut keeper = ModelKeeper::new();
    keeper
        .define(Model::new("Tag").with_field("label", Field::string()))
        .expect("define Tag");
    keeper
        .define(
            Model::new("Post")
                .with_field("title", Field::string())
                .with_field("tags", Field::many_to_many("Tag")),
        )
        .expect("define Post");
    assert_eq!(keeper.len(), 3);

    let join = keeper.lookup("PostTags").expect("join model registered");
    assert!(join.is_join());
    assert_eq!(join.field("post").and_then(|f| f.related()), Some("Post"));
    assert_eq!(join.field("tag").and_then(|f| f.related()), Some("Tag"));

    let tag = keeper.lookup("Tag").expect("Tag");
    let inverse = tag.field("post").expect("inverse many-to-many");
    assert_eq!(
        inverse.kind(),
        Some(&RelationKind::ManyToMany {
            related_name: Some("tags".to_string()),
            join_model: Some("PostTags".to_string())
        })
    );
    // both sides get a back-reference to the join rows
    assert!(tag.field("posttags").is_some());
    let post = keeper.lookup("Post").expect("Post");
    assert!(post.field("posttags").is_some());
    assert_eq!(
        post.field("tags").and_then(|f| f.kind()),
        Some(&RelationKind::ManyToMany {
            related_name: Some("post".to_string()),
            join_model: Some("PostTags".to_string())
        })
    );
}

#[test]
fn declaring_twice_is_a_no_op() {
    let mut keeper = ModelKeeper::new();
    keeper
        .define(Model::new("Tag").with_field("label", Field::string()))
        .expect("define Tag");
    keeper
        .define(Model::new("Post").with_field("tags", Field::many_to_many("Tag")))
        .expect("define Post");
    let before = keeper.len();
    let base = keeper.base();
    let declared = relation::declare(&mut keeper, "Post", "tags", Some(&*base)).expect("declare");
    assert!(!declared);
    assert_eq!(keeper.len(), before);
    let declared = relation::declare(&mut keeper, "Tag", "post", Some(&*base)).expect("declare");
    assert!(!declared);
}

#[test]
fn many_to_many_needs_the_base_model() {
    let mut keeper = ModelKeeper::new();
    keeper
        .define(Model::new("Tag").with_field("label", Field::string()))
        .expect("define Tag");
    // kept without declaring, so the relation is still pending
    keeper.keep(Model::new("Post").with_field("tags", Field::many_to_many("Tag")));

    let missing = relation::declare(&mut keeper, "Post", "tags", None);
    assert!(matches!(missing, Err(OrmError::Definition(_))));

    let not_reserved = Model::new("Other");
    let wrong = relation::declare(&mut keeper, "Post", "tags", Some(&not_reserved));
    assert!(matches!(wrong, Err(OrmError::Definition(_))));
    assert!(!keeper.contains("PostTags"));

    let base = keeper.base();
    assert!(relation::declare(&mut keeper, "Post", "tags", Some(&*base)).expect("declare"));
    assert!(keeper.contains("PostTags"));
}

#[test]
fn self_referential_many_to_many_is_rejected() {
    let mut keeper = ModelKeeper::new();
    let result = keeper.define(Model::new("Person").with_field("friends", Field::many_to_many("Person")));
    assert!(matches!(result, Err(OrmError::Definition(_))));
    assert!(keeper.is_empty());
}

#[test]
fn unknown_related_model_is_rejected() {
    let mut keeper = ModelKeeper::new();
    let result = keeper.define(Model::new("Book").with_field("author", Field::foreign_key("Author")));
    assert!(matches!(result, Err(OrmError::Definition(_))));
    assert!(!keeper.contains("Book"));
}

#[test]
fn failed_definition_leaves_registry_untouched() {
    let mut keeper = keeper_with_authors();
    keeper
        .define(Model::new("Tag").with_field("label", Field::string()))
        .expect("define Tag");
    let before = keeper.describe();
    // the foreign key would succeed, the many-to-many cannot find its model
    let result = keeper.define(
        Model::new("Book")
            .with_field("author", Field::foreign_key("Author"))
            .with_field("tags", Field::many_to_many("Label")),
    );
    assert!(matches!(result, Err(OrmError::Definition(_))));
    assert_eq!(keeper.describe(), before);
    assert!(keeper.lookup("Author").expect("Author").field("books").is_none());
}

#[test]
fn names_are_validated() {
    let mut keeper = keeper_with_authors();
    assert!(matches!(
        keeper.define(Model::new("author")),
        Err(OrmError::Definition(_))
    ));
    assert!(matches!(
        keeper.define(Model::new(Model::BASE)),
        Err(OrmError::Definition(_))
    ));
    assert!(matches!(
        keeper.define(Model::new("Two Words")),
        Err(OrmError::Definition(_))
    ));
    assert!(matches!(
        keeper.define(
            Model::new("Book")
                .with_field("title", Field::string())
                .with_field("title", Field::string())
        ),
        Err(OrmError::Definition(_))
    ));
    // installing over an existing field is a definition error too
    assert!(matches!(
        keeper.define(
            Model::new("Book").with_field("writer", Field::foreign_key("Author").related_name("name"))
        ),
        Err(OrmError::Definition(_))
    ));
}

#[test]
fn describe_lists_models_in_definition_order() {
    let mut keeper = keeper_with_authors();
    keeper
        .define(Model::new("Book").with_field("author", Field::foreign_key("Author")))
        .expect("define Book");
    let description = keeper.describe();
    let author_at = description.find("Author :").expect("Author listed");
    let book_at = description.find("Book :").expect("Book listed");
    assert!(author_at < book_at);
    assert!(description.contains("books -> BackReference, field_type -> Book"));
    assert!(description.contains("author -> ForeignKey, field_type -> Author"));
}
