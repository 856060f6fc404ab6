use tinyorm::OrmError;
use tinyorm::construct::{Instance, Model, RelationList};
use tinyorm::field::Field;

#[test]
fn push_accepts_the_declared_model() {
    let tag = Model::new("Tag").with_field("label", Field::string());
    let mut list = RelationList::new("Tag");
    list.push(Instance::new(&tag)).expect("push");
    list.push(Instance::new(&tag)).expect("push");
    assert_eq!(list.len(), 2);
    assert_eq!(list.into_inner().len(), 2);
}

#[test]
fn push_rejects_other_models() {
    let author = Model::new("Author").with_field("name", Field::string());
    let mut list = RelationList::new("Tag");
    match list.push(Instance::new(&author)) {
        Err(OrmError::TypeMismatch { expected, found }) => {
            assert_eq!(expected, "Tag");
            assert_eq!(found, "Author");
        }
        other => panic!("expected a type mismatch, got {other:?}"),
    }
    assert!(list.is_empty());
}
