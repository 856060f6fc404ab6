//! TinyORM – a small object-relational mapping layer over an embedded document store.
//!
//! Models are declared at runtime as named lists of typed fields:
//! * Scalar fields ([`field::Field::string`], `int`, `float`, `json`) are
//!   stored as plain values in the model's document.
//! * A foreign key ([`field::Field::foreign_key`]) stores the key of a related
//!   instance, and gives the related model a back-reference listing every
//!   instance that points at it.
//! * A one-to-one ([`field::Field::one_to_one`]) gives the related model a
//!   symmetric one-to-one pointing back.
//! * A many-to-many ([`field::Field::many_to_many`]) synthesizes a join model
//!   holding a foreign key to each side, and gives the related model the
//!   inverse many-to-many.
//!
//! Only one side of a relationship is ever declared; the [`construct::ModelKeeper`]
//! derives the other side when the model is defined (see [`relation`]).
//!
//! ## Modules
//! * [`construct`] – Models, instances, relation lists and the keeper of models.
//! * [`field`] – Field descriptors and their check/load/save contract.
//! * [`relation`] – Derives the counterpart of every relational field.
//! * [`database`] – The [`database::Database`]: saving, loading and lazy relational reads.
//! * [`persist`] – The [`persist::Store`] trait with SQLite and in-memory stores.
//! * [`datatype`] – Values, data types and stored records.
//! * [`settings`] – Settings file and environment based bootstrap.
//!
//! ## Lazy relations
//! Scalar fields are populated as soon as an instance is loaded. Relational
//! fields are resolved through [`database::Database::read`] (or the typed
//! `fetch_one`, `fetch_many` and `fetch_related`), which query the store on
//! every call. Nothing is cached between reads.
//!
//! ## Cascading saves
//! Assigning an unsaved instance to a to-one field moves a copy into the
//! field. Saving the owner saves that copy first and stores its key; an
//! instance the caller kept aside stays unsaved. Read the saved one back with
//! `fetch_one` instead of saving the kept copy, which would insert it twice.
//!
//! ## Quick Start
//! ```
//! use tinyorm::{database::Database, construct::Model, field::Field, settings::PersistenceMode};
//! let db = Database::new(PersistenceMode::InMemory).unwrap();
//! db.define(Model::new("Author").with_field("name", Field::string())).unwrap();
//! db.define(Model::new("Book")
//!     .with_field("title", Field::string())
//!     .with_field("author", Field::foreign_key("Author"))).unwrap();
//! let mut author = db.create("Author").unwrap();
//! author.set("name", "Ursula").unwrap();
//! let mut book = db.create("Book").unwrap();
//! book.set("title", "The Dispossessed").unwrap();
//! book.set("author", author).unwrap();
//! db.save(&mut book).unwrap();
//! let mut author = db.fetch_one(&mut book, "author").unwrap().unwrap();
//! assert_eq!(db.fetch_many(&mut author, "books").unwrap().len(), 1);
//! ```

pub mod construct;
pub mod database;
pub mod datatype;
pub mod error;
pub mod field;
pub mod persist;
pub mod relation;
pub mod settings;

pub use error::{OrmError, Result};
