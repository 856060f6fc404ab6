//! Declares the counterpart of a relational field on its related model.
//!
//! A single one-sided declaration is enough to make a relationship usable
//! from both ends:
//! * a foreign key gets a back-reference on the related model,
//! * a one-to-one gets a symmetric one-to-one on the related model,
//! * a many-to-many gets a synthesized join model plus the inverse
//!   many-to-many on the related model.
//!
//! Every declaration marks the field initialized, so declaring it again is a
//! no-op.

use tracing::debug;

use crate::construct::{Model, ModelKeeper};
use crate::error::{OrmError, Result};
use crate::field::{Field, RelationKind};

/// Declares the relationship of `owner.field_name`. Returns `false` when the
/// field had already been declared. Many-to-many declarations need the
/// keeper's base model to derive the join model from.
pub fn declare(
    keeper: &mut ModelKeeper,
    owner: &str,
    field_name: &str,
    base: Option<&Model>,
) -> Result<bool> {
    let owner_model = keeper
        .get(owner)
        .ok_or_else(|| OrmError::Definition(format!("{} is not a registered model", owner)))?;
    let field = owner_model.field(field_name).ok_or_else(|| {
        OrmError::Definition(format!("{} has no field named {}", owner, field_name))
    })?;
    let relation = field.relation().ok_or_else(|| {
        OrmError::Definition(format!("{}.{} is not a relation", owner, field_name))
    })?;
    if relation.initialized() {
        return Ok(false);
    }
    let related = field.related().unwrap_or_default().to_string();
    let related_model = keeper.get(&related).ok_or_else(|| {
        OrmError::Definition(format!(
            "{}.{} refers to {} which is not a registered model",
            owner, field_name, related
        ))
    })?;
    let owner_name = owner_model.name();

    let declared = match relation.kind().clone() {
        RelationKind::ToOne { inverse_name } => {
            let inverse_name = inverse_name.unwrap_or_else(|| format!("{}s", owner_model.key_name()));
            install(keeper, &related, &inverse_name, Field::inverse(owner_name, field_name))?;
            RelationKind::ToOne {
                inverse_name: Some(inverse_name),
            }
        }
        RelationKind::OneToOne { related_name } => {
            let related_name = related_name.unwrap_or_else(|| owner_model.key_name());
            // nothing gets written on this side unless assigned, reads fall
            // back to the owner row that points here
            let mut counterpart = Field::one_to_one(owner_name).related_name(field_name).blank();
            counterpart.mark_initialized();
            install(keeper, &related, &related_name, counterpart)?;
            RelationKind::OneToOne {
                related_name: Some(related_name),
            }
        }
        // generated already initialized, nothing to derive
        RelationKind::ToOneInverse { .. } => return Ok(false),
        RelationKind::ManyToMany { related_name, .. } => {
            let base = match base {
                Some(base) if base.reserved() => base,
                Some(other) => {
                    return Err(OrmError::Definition(format!(
                        "{}.{} must derive its join model from the base model, not {}",
                        owner, field_name, other.name()
                    )));
                }
                None => {
                    return Err(OrmError::Definition(format!(
                        "{}.{} is a many-to-many relation but no base model was given",
                        owner, field_name
                    )));
                }
            };
            let related_name = related_name.unwrap_or_else(|| owner_model.key_name());
            let join_name = format!("{}{}", owner_name, capitalize(field_name));
            let (owner_key, related_key) = (owner_model.key_name(), related_model.key_name());
            if owner_key == related_key {
                return Err(OrmError::Definition(format!(
                    "join model {} would hold two fields named {}",
                    join_name, owner_key
                )));
            }
            let back_reference = join_name.to_lowercase();
            let join_model = Model::derive(base, &join_name)
                .with_field(
                    &owner_key,
                    Field::foreign_key(owner_name).related_name(&back_reference),
                )
                .with_field(
                    &related_key,
                    Field::foreign_key(related_model.name()).related_name(&back_reference),
                );
            keeper.install(join_model)?;

            let mut counterpart = Field::many_to_many(owner_name);
            counterpart.set_kind(RelationKind::ManyToMany {
                related_name: Some(field_name.to_string()),
                join_model: Some(join_name.clone()),
            });
            counterpart.mark_initialized();
            install(keeper, &related, &related_name, counterpart)?;
            RelationKind::ManyToMany {
                related_name: Some(related_name),
                join_model: Some(join_name),
            }
        }
    };

    let field = keeper
        .model_mut(owner)
        .and_then(|model| model.field_mut(field_name))
        .ok_or_else(|| OrmError::Definition(format!("{} lost field {}", owner, field_name)))?;
    debug!(model = owner, field = field_name, kind = ?declared, "relation declared");
    field.set_kind(declared);
    field.mark_initialized();
    Ok(true)
}

fn install(keeper: &mut ModelKeeper, model: &str, name: &str, field: Field) -> Result<()> {
    keeper
        .model_mut(model)
        .ok_or_else(|| OrmError::Definition(format!("{} is not a registered model", model)))?
        .install(name, field)
}

// "tags" -> "Tags"
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
