use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use tinyorm::construct::Model;
use tinyorm::database::Database;
use tinyorm::field::Field;
use tinyorm::settings::PersistenceMode;

fn library() -> Database {
    let db = Database::new(PersistenceMode::InMemory).unwrap();
    db.define(Model::new("Author").with_field("name", Field::string())).unwrap();
    db.define(Model::new("Tag").with_field("label", Field::string())).unwrap();
    db.define(
        Model::new("Book")
            .with_field("title", Field::string())
            .with_field("author", Field::foreign_key("Author"))
            .with_field("tags", Field::many_to_many("Tag")),
    )
    .unwrap();
    db
}

fn save_and_get(c: &mut Criterion) {
    let db = library();
    c.bench_function("save and get", |b| {
        b.iter(|| {
            let mut author = db.create("Author").unwrap();
            author.set("name", "Le Guin").unwrap();
            let key = db.save(&mut author).unwrap();
            black_box(db.get("Author", key).unwrap());
        })
    });
}

fn relation_reads(c: &mut Criterion) {
    let db = library();
    let mut author = db.create("Author").unwrap();
    author.set("name", "Le Guin").unwrap();
    db.save(&mut author).unwrap();
    let mut books = Vec::new();
    for i in 0..100 {
        let mut book = db.create("Book").unwrap();
        book.set("title", format!("Book {}", i)).unwrap();
        book.set("author", author.clone()).unwrap();
        db.save(&mut book).unwrap();
        books.push(book);
    }
    for label in ["fantasy", "classic", "short"] {
        let mut tag = db.create("Tag").unwrap();
        tag.set("label", label).unwrap();
        db.save(&mut tag).unwrap();
        for book in &books {
            let mut link = db.create("BookTags").unwrap();
            link.set("book", book.clone()).unwrap();
            link.set("tag", tag.clone()).unwrap();
            db.save(&mut link).unwrap();
        }
    }
    let mut author = db.get("Author", author.pk().unwrap()).unwrap();
    let mut book = books.swap_remove(0);

    c.bench_function("back-reference read", |b| {
        b.iter(|| black_box(db.fetch_many(&mut author, "books").unwrap()))
    });
    c.bench_function("many-to-many read", |b| {
        b.iter(|| black_box(db.fetch_related(&mut book, "tags").unwrap()))
    });
}

criterion_group!(benches, save_and_get, relation_reads);
criterion_main!(benches);
