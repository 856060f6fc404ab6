//! The persistence coordinator.
//!
//! A [`Database`] wires a [`Store`] together with a [`ModelKeeper`]. Every
//! operation on instances goes through it: building them from stored
//! records, validating and saving them, and resolving their relational
//! fields on demand.
//!
//! Relational reads are never cached. Each call to [`Database::read`] (or the
//! typed `fetch_*` accessors) queries the store again.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::construct::{Instance, Model, ModelKeeper, RelationList};
use crate::datatype::{Key, Record, Reference, Value};
use crate::error::{OrmError, Result};
use crate::field::{Field, RelationKind};
use crate::persist::{MemoryStore, SqliteStore, Store};
use crate::settings::{PersistenceMode, Settings};

pub struct Database {
    // owns the keeper of model definitions
    pub registry: Arc<Mutex<ModelKeeper>>,
    // responsible for the persistence layer
    pub store: Arc<Mutex<Box<dyn Store>>>,
}

impl Database {
    pub fn new(mode: PersistenceMode) -> Result<Self> {
        let database = match &mode {
            PersistenceMode::InMemory => Self::with_store(MemoryStore::new()),
            PersistenceMode::File(path) => Self::with_store(SqliteStore::open(path)?),
        };
        info!(?mode, "database opened");
        Ok(database)
    }
    pub fn open(settings: &Settings) -> Result<Self> {
        Self::new(settings.persistence_mode()?)
    }
    pub fn with_store<S: Store + 'static>(store: S) -> Self {
        let store: Box<dyn Store> = Box::new(store);
        Self {
            registry: Arc::new(Mutex::new(ModelKeeper::new())),
            store: Arc::new(Mutex::new(store)),
        }
    }

    // ------------- definitions -------------
    pub fn define(&self, model: Model) -> Result<Arc<Model>> {
        self.registry.lock()?.define(model)
    }
    pub fn model(&self, name: &str) -> Result<Arc<Model>> {
        self.registry.lock()?.lookup(name)
    }
    pub fn create(&self, name: &str) -> Result<Instance> {
        let model = self.model(name)?;
        Ok(Instance::new(&model))
    }
    /// Assigns a field by the model's current definition, so fields
    /// installed after the instance was built can be set as well.
    pub fn set(&self, instance: &mut Instance, name: &str, value: impl Into<Value>) -> Result<()> {
        let model = self.model(instance.model())?;
        if model.field(name).is_none() {
            return Err(OrmError::NotFound(format!("field {}.{}", model.name(), name)));
        }
        instance.assign(name, value.into());
        Ok(())
    }

    // ------------- lookups -------------
    /// The instance stored under `key`, or `NotFound`.
    pub fn get(&self, name: &str, key: Key) -> Result<Instance> {
        let model = self.model(name)?;
        let record = self
            .store
            .lock()?
            .get_by_key(&model.collection(), key)?
            .ok_or_else(|| OrmError::NotFound(format!("{} with key {}", model.name(), key)))?;
        Instance::from_record(&model, Some(key), &record)
    }
    /// Every instance whose `field` equals `value`; empty when none does.
    pub fn get_all(&self, name: &str, field: &str, value: impl Into<Value>) -> Result<Vec<Instance>> {
        let model = self.model(name)?;
        let descriptor = stored_field(&model, field)?;
        let raw = descriptor.save(&value.into()).map_err(|e| e.at(model.name(), field))?;
        self.find(&model, field, &raw)
    }
    fn find(&self, model: &Model, field: &str, raw: &JsonValue) -> Result<Vec<Instance>> {
        let found = self
            .store
            .lock()?
            .get_all_by_field(&model.collection(), field, raw)?;
        debug!(model = model.name(), field, found = found.len(), "lookup by field");
        found
            .iter()
            .map(|(key, record)| Instance::from_record(model, Some(*key), record))
            .collect()
    }

    // ------------- lazy relational reads -------------
    /// Reads a field of an instance. Relational fields of a saved instance are
    /// loaded from the store on every call and the result is assigned to the
    /// instance. Scalar fields, and every field of an unsaved instance, give
    /// back the assigned value.
    pub fn read(&self, instance: &mut Instance, name: &str) -> Result<Value> {
        let model = self.model(instance.model())?;
        let field = model
            .field(name)
            .ok_or_else(|| OrmError::NotFound(format!("field {}.{}", model.name(), name)))?;
        let current = instance
            .get(name)
            .cloned()
            .unwrap_or_else(|| field.default_value().clone());
        let Some(pk) = instance.pk() else {
            return Ok(current);
        };
        if !field.is_relational() {
            return Ok(current);
        }
        let started = Instant::now();
        let loaded = self.load(&model, name, field, pk, current)?;
        debug!(
            model = model.name(),
            field = name,
            pk,
            us = started.elapsed().as_micros() as u64,
            "relation loaded"
        );
        instance.assign(name, loaded.clone());
        Ok(loaded)
    }
    /// Reads a to-one or one-to-one field. `None` when nothing is referenced.
    pub fn fetch_one(&self, instance: &mut Instance, name: &str) -> Result<Option<Instance>> {
        match self.read(instance, name)? {
            Value::Null => Ok(None),
            Value::Reference(Reference::Object(object)) => Ok(Some(*object)),
            Value::Reference(Reference::Key { model, key }) => self.get(&model, key).map(Some),
            other => Err(mismatch("a reference", &other)),
        }
    }
    /// Reads a back-reference field.
    pub fn fetch_many(&self, instance: &mut Instance, name: &str) -> Result<Vec<Instance>> {
        match self.read(instance, name)? {
            Value::Null => Ok(Vec::new()),
            Value::Objects(objects) => Ok(objects),
            other => Err(mismatch("objects", &other)),
        }
    }
    /// Reads a many-to-many field.
    pub fn fetch_related(&self, instance: &mut Instance, name: &str) -> Result<RelationList> {
        let model = self.model(instance.model())?;
        match self.read(instance, name)? {
            Value::Related(list) => Ok(list),
            // unsaved instances have nothing related yet
            Value::Null => match model.field(name).and_then(Field::related) {
                Some(related) => Ok(RelationList::new(related)),
                None => Err(OrmError::NotFound(format!("field {}.{}", model.name(), name))),
            },
            other => Err(mismatch("a relation list", &other)),
        }
    }

    fn load(&self, model: &Model, name: &str, field: &Field, pk: Key, current: Value) -> Result<Value> {
        let related = field.related().unwrap_or_default();
        match field.kind() {
            Some(RelationKind::ToOne { .. }) => self.dereference(current),
            Some(RelationKind::OneToOne { related_name }) => match (current, related_name) {
                // the side that stores nothing finds the row pointing at it
                (Value::Null, Some(counterpart)) => {
                    let related_model = self.model(related)?;
                    let found = self.find(&related_model, counterpart, &JsonValue::from(pk))?;
                    Ok(found.into_iter().next().map_or(Value::Null, Value::from))
                }
                (current, _) => self.dereference(current),
            },
            Some(RelationKind::ToOneInverse { foreign_key }) => {
                let owner = self.model(related)?;
                let objects = self.find(&owner, foreign_key, &JsonValue::from(pk))?;
                Ok(Value::Objects(objects))
            }
            Some(RelationKind::ManyToMany { join_model, .. }) => {
                let join_name = join_model.as_deref().ok_or_else(|| {
                    OrmError::Definition(format!("{}.{} has no join model", model.name(), name))
                })?;
                let join = self.model(join_name)?;
                let related_model = self.model(related)?;
                let rows = self.find(&join, &model.key_name(), &JsonValue::from(pk))?;
                let mut list = RelationList::new(related_model.name());
                for row in rows {
                    let key = row
                        .get(&related_model.key_name())
                        .and_then(Value::as_reference)
                        .and_then(Reference::key);
                    match key {
                        Some(key) => list.push(self.get(related_model.name(), key)?)?,
                        None => warn!(join = join_name, pk = ?row.pk(), "join row without related key"),
                    }
                }
                Ok(Value::Related(list))
            }
            None => Ok(current),
        }
    }

    fn dereference(&self, current: Value) -> Result<Value> {
        match current {
            Value::Reference(reference) => match reference.key() {
                Some(key) => Ok(Value::from(self.get(reference.model(), key)?)),
                // assigned but not saved yet, nothing to dereference
                None => Ok(Value::Reference(reference)),
            },
            other => Ok(other),
        }
    }

    // ------------- persistence -------------
    fn validate(&self, model: &Model, instance: &Instance) -> Result<()> {
        for (name, field) in model.fields() {
            let value = instance.get(name).unwrap_or(&Value::Null);
            if !field.check(value) {
                return Err(OrmError::Validation {
                    model: model.name().to_string(),
                    field: name.to_string(),
                    message: format!("{} does not fit {}", value.kind(), field.data_type()),
                });
            }
        }
        Ok(())
    }

    /// Runs a field's save routine. To-one values that hold an unsaved
    /// instance get that instance saved first.
    fn save_field(&self, model: &Model, name: &str, field: &Field, instance: &mut Instance) -> Result<JsonValue> {
        if let Some(RelationKind::ToOne { .. } | RelationKind::OneToOne { .. }) = field.kind() {
            if let Some(Value::Reference(Reference::Object(related))) = instance.value_mut(name) {
                if related.pk().is_none() {
                    debug!(model = model.name(), field = name, related = related.model(), "cascading save");
                    self.save(related)?;
                }
            }
        }
        let value = instance.get(name).unwrap_or(&Value::Null);
        field.save(value).map_err(|e| e.at(model.name(), name))
    }

    fn record(&self, model: &Model, instance: &mut Instance) -> Result<Record> {
        let mut record = Record::new();
        for (name, field) in model.fields() {
            if field.serialize() {
                let raw = self.save_field(model, name, field, instance)?;
                record.insert(name.to_string(), raw);
            }
        }
        Ok(record)
    }

    /// The plain storable representation of an instance. Only serialized
    /// fields are included.
    pub fn serialize(&self, instance: &mut Instance) -> Result<Record> {
        let model = self.model(instance.model())?;
        self.validate(&model, instance)?;
        self.record(&model, instance)
    }

    /// Builds an instance of `name` from a record without touching the store.
    pub fn load_record(&self, name: &str, pk: Option<Key>, record: &Record) -> Result<Instance> {
        let model = self.model(name)?;
        Instance::from_record(&model, pk, record)
    }

    /// Saves an instance: upserts under its key when it has one, otherwise
    /// inserts it and adopts the key the store hands out.
    ///
    /// An unsaved instance assigned to a to-one field is saved first. The
    /// key lands on the copy held by the field, not on any instance the
    /// caller kept; take the saved one back with [`Database::fetch_one`] (or
    /// from the field's [`Reference`]) before saving it again.
    pub fn save(&self, instance: &mut Instance) -> Result<Key> {
        let model = self.model(instance.model())?;
        self.validate(&model, instance)?;
        for (name, field) in model.fields() {
            if field.is_relational() && !field.serialize() {
                // side effects only, recomputed fields are never written
                self.save_field(&model, name, field, instance)?;
            }
        }
        let record = self.record(&model, instance)?;
        let collection = model.collection();
        let key = match instance.pk() {
            Some(pk) => {
                self.store.lock()?.update_or_insert(&collection, &record, pk)?;
                pk
            }
            None => {
                let key = self.store.lock()?.insert(&collection, &record)?;
                instance.set_pk(key);
                key
            }
        };
        debug!(model = model.name(), key, "saved");
        Ok(key)
    }
}

// lookups only make sense on values that are actually stored
fn stored_field<'m>(model: &'m Model, name: &str) -> Result<&'m Field> {
    match model.field(name) {
        Some(field) if field.serialize() => Ok(field),
        Some(_) => Err(OrmError::Validation {
            model: model.name().to_string(),
            field: name.to_string(),
            message: "field is not stored and cannot be looked up".to_string(),
        }),
        None => Err(OrmError::NotFound(format!("field {}.{}", model.name(), name))),
    }
}

fn mismatch(expected: &str, found: &Value) -> OrmError {
    OrmError::TypeMismatch {
        expected: expected.to_string(),
        found: found.kind(),
    }
}
