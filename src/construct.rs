//! Implements the constructs of the mapping layer.
//!
//! - Models are the declared shapes of persisted entity types: a name and an
//!   ordered list of named fields.
//! - Instances are the runtime values of a model, with a primary key once
//!   they have been saved.
//! - Relation lists are the typed results of many-to-many reads.
//!
//! Along with these a "keeper" pattern is used, with the intention to own the
//! model definitions and guarantee their uniqueness. The ModelKeeper is also
//! the definition builder: defining a model wires up its relationships,
//! installing counterparts on related models and synthesizing join models.

use std::sync::Arc;

// other keepers use HashSet or HashMap
use core::hash::BuildHasherDefault;
use std::collections::{BTreeMap, HashMap};
use seahash::SeaHasher;

// used to print out readable forms of a construct
use std::fmt;
use std::ops;

// model and field names become collection names and JSON paths
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

// our own stuff that we need
use crate::datatype::{Key, Record, Value};
use crate::error::{OrmError, Result};
use crate::field::{Field, RelationKind};
use crate::relation;

pub type OtherHasher = BuildHasherDefault<SeaHasher>;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap();
}

// ------------- Model -------------
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    name: String,
    fields: Vec<(String, Field)>,
    reserved: bool,
    join: bool,
}

impl Model {
    /// Name of the reserved base model every join model derives from.
    pub const BASE: &'static str = "Model";

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
            reserved: false,
            join: false,
        }
    }
    pub fn base() -> Self {
        Self {
            name: Self::BASE.to_string(),
            fields: Vec::new(),
            reserved: true,
            join: false,
        }
    }
    // join models start out with whatever the base model declares
    pub(crate) fn derive(base: &Model, name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: base.fields.clone(),
            reserved: false,
            join: true,
        }
    }
    pub fn with_field(mut self, name: &str, field: Field) -> Self {
        self.fields.push((name.to_string(), field));
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// The collection identifier at the storage boundary.
    pub fn collection(&self) -> String {
        self.name.to_lowercase()
    }
    /// Name used for fields that refer to this model by convention.
    pub fn key_name(&self) -> String {
        self.name.to_lowercase()
    }
    pub fn reserved(&self) -> bool {
        self.reserved
    }
    pub fn is_join(&self) -> bool {
        self.join
    }
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }
    pub(crate) fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|(n, _)| n == name).map(|(_, f)| f)
    }
    pub(crate) fn install(&mut self, name: &str, field: Field) -> Result<()> {
        if self.field(name).is_some() {
            return Err(OrmError::Definition(format!(
                "{} already has a field named {}",
                self.name, name
            )));
        }
        self.fields.push((name.to_string(), field));
        Ok(())
    }
    fn validate(&self) -> Result<()> {
        if !IDENTIFIER.is_match(&self.name) {
            return Err(OrmError::Definition(format!(
                "{:?} is not a valid model name",
                self.name
            )));
        }
        if self.name.eq_ignore_ascii_case(Self::BASE) {
            return Err(OrmError::Definition(format!(
                "{} is reserved for the base model",
                self.name
            )));
        }
        for (i, (name, _)) in self.fields.iter().enumerate() {
            if !IDENTIFIER.is_match(name) {
                return Err(OrmError::Definition(format!(
                    "{:?} is not a valid field name on {}",
                    name, self.name
                )));
            }
            if self.fields[..i].iter().any(|(n, _)| n == name) {
                return Err(OrmError::Definition(format!(
                    "{} declares {} twice",
                    self.name, name
                )));
            }
        }
        Ok(())
    }
}
impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} :", self.name)?;
        for (name, field) in &self.fields {
            let kind = match field.kind() {
                None => "Field",
                Some(RelationKind::ToOne { .. }) => "ForeignKey",
                Some(RelationKind::OneToOne { .. }) => "OneToOne",
                Some(RelationKind::ToOneInverse { .. }) => "BackReference",
                Some(RelationKind::ManyToMany { .. }) => "ManyToMany",
            };
            writeln!(f, "    {} -> {}, field_type -> {}", name, kind, field.data_type())?;
        }
        Ok(())
    }
}

// ------------- Instance -------------
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    model: String,
    pk: Option<Key>,
    values: BTreeMap<String, Value>,
}

impl Instance {
    /// A fresh, unsaved instance holding every field's default.
    pub fn new(model: &Model) -> Self {
        Self {
            model: model.name().to_string(),
            pk: None,
            values: model
                .fields()
                .map(|(name, field)| (name.to_string(), field.default_value().clone()))
                .collect(),
        }
    }
    /// Builds an instance from a stored record. Fields present in the record
    /// go through their load routine, absent ones get their default. Nothing
    /// here touches the store.
    pub fn from_record(model: &Model, pk: Option<Key>, record: &Record) -> Result<Self> {
        let mut values = BTreeMap::new();
        for (name, field) in model.fields() {
            let value = match record.get(name) {
                Some(raw) => field.load(raw)?,
                None => field.default_value().clone(),
            };
            values.insert(name.to_string(), value);
        }
        Ok(Self {
            model: model.name().to_string(),
            pk,
            values,
        })
    }
    pub fn model(&self) -> &str {
        &self.model
    }
    pub fn pk(&self) -> Option<Key> {
        self.pk
    }
    /// The assigned value, without side effects. Relational fields hold
    /// whatever was last assigned or read.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
    /// Assigns a field the model had when this instance was built. Fields
    /// installed by later definitions go through `Database::set`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(OrmError::NotFound(format!("field {}.{}", self.model, name))),
        }
    }
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
    pub(crate) fn set_pk(&mut self, pk: Key) {
        self.pk = Some(pk);
    }
    // fields installed after this instance was built have no slot yet
    pub(crate) fn assign(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }
    pub(crate) fn value_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.values.get_mut(name)
    }
}
impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = self
            .values
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join(", ");
        match self.pk {
            Some(pk) => write!(f, "{}#{} {{{}}}", self.model, pk, s),
            None => write!(f, "{}#? {{{}}}", self.model, s),
        }
    }
}

// ------------- RelationList -------------
/// The result of reading a many-to-many field: the related instances in join
/// order. Only instances of the declared related model can be pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationList {
    model: String,
    items: Vec<Instance>,
}
impl RelationList {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            items: Vec::new(),
        }
    }
    pub fn model(&self) -> &str {
        &self.model
    }
    pub fn push(&mut self, item: Instance) -> Result<()> {
        if item.model() != self.model {
            return Err(OrmError::TypeMismatch {
                expected: self.model.clone(),
                found: item.model().to_string(),
            });
        }
        self.items.push(item);
        Ok(())
    }
    pub fn into_inner(self) -> Vec<Instance> {
        self.items
    }
}
impl ops::Deref for RelationList {
    type Target = [Instance];
    fn deref(&self) -> &Self::Target {
        &self.items
    }
}
impl IntoIterator for RelationList {
    type Item = Instance;
    type IntoIter = std::vec::IntoIter<Instance>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
impl<'a> IntoIterator for &'a RelationList {
    type Item = &'a Instance;
    type IntoIter = std::slice::Iter<'a, Instance>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ------------- ModelKeeper -------------
#[derive(Debug, Clone)]
pub struct ModelKeeper {
    // keyed by the lower-cased name, which is also the collection identifier
    kept: HashMap<String, Arc<Model>, OtherHasher>,
    order: Vec<String>,
    base: Arc<Model>,
}

impl ModelKeeper {
    pub fn new() -> Self {
        Self {
            kept: HashMap::default(),
            order: Vec::new(),
            base: Arc::new(Model::base()),
        }
    }
    pub fn base(&self) -> Arc<Model> {
        Arc::clone(&self.base)
    }
    /// Keeps a model unless one with the same lower-cased name is already
    /// kept, in which case the kept one is returned along with `true`.
    pub fn keep(&mut self, model: Model) -> (Arc<Model>, bool) {
        let keepsake = model.key_name();
        let mut previously_kept = true;
        let kept_model = self.kept.entry(keepsake.clone()).or_insert_with(|| {
            previously_kept = false;
            Arc::new(model)
        });
        let kept_model = Arc::clone(kept_model);
        if !previously_kept {
            self.order.push(keepsake);
        }
        (kept_model, previously_kept)
    }
    pub fn get(&self, name: &str) -> Option<Arc<Model>> {
        self.kept.get(&name.to_lowercase()).map(Arc::clone)
    }
    pub fn lookup(&self, name: &str) -> Result<Arc<Model>> {
        self.get(name)
            .ok_or_else(|| OrmError::NotFound(format!("model {}", name)))
    }
    pub fn contains(&self, name: &str) -> bool {
        self.kept.contains_key(&name.to_lowercase())
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
    /// Models in definition order.
    pub fn models(&self) -> Vec<Arc<Model>> {
        self.order
            .iter()
            .filter_map(|name| self.kept.get(name).map(Arc::clone))
            .collect()
    }
    pub fn describe(&self) -> String {
        self.models().iter().map(|m| m.to_string()).collect()
    }
    pub(crate) fn model_mut(&mut self, name: &str) -> Option<&mut Model> {
        self.kept.get_mut(&name.to_lowercase()).map(Arc::make_mut)
    }

    /// Defines a model: registers it and declares its relationships, other
    /// relations first and many-to-many last. On error the keeper is left
    /// exactly as it was.
    pub fn define(&mut self, model: Model) -> Result<Arc<Model>> {
        let mut staging = self.clone();
        let defined = staging.install(model)?;
        *self = staging;
        Ok(defined)
    }

    pub(crate) fn install(&mut self, model: Model) -> Result<Arc<Model>> {
        model.validate()?;
        let name = model.name().to_string();
        let (kept_model, previously_kept) = self.keep(model);
        if previously_kept {
            return Err(OrmError::Definition(format!(
                "a model named {} is already defined",
                kept_model.name()
            )));
        }
        let (many_to_many, others): (Vec<(String, bool)>, Vec<(String, bool)>) = kept_model
            .fields()
            .filter(|(_, field)| field.is_relational())
            .map(|(field_name, field)| (field_name.to_string(), field.is_many_to_many()))
            .partition(|(_, many)| *many);
        let base = self.base();
        for (field_name, _) in others.iter().chain(many_to_many.iter()) {
            relation::declare(self, &name, field_name, Some(&*base))?;
        }
        info!(model = %name, join = kept_model.is_join(), "model defined");
        debug!(models = self.len(), "registry size");
        self.lookup(&name)
    }
}
impl Default for ModelKeeper {
    fn default() -> Self {
        Self::new()
    }
}
