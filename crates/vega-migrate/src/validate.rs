use thiserror::Error;

use vega_model::TypeRef;

/// Rejections for the user-requested migration target type.
///
/// These are hard preconditions checked before the engine runs at all; a
/// failing type never starts a migration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("cannot migrate to vararg type `{0}`")]
    VariadicTarget(TypeRef),
    #[error("cannot migrate to disjunction type `{0}`")]
    DisjunctionTarget(TypeRef),
    #[error("cannot migrate to `void`")]
    VoidTarget,
    #[error("cannot migrate to the null type")]
    NullTarget,
    #[error("wildcard bound `{0}` must not be primitive")]
    PrimitiveWildcardBound(TypeRef),
    #[error("primitive type argument `{0}` is not allowed")]
    PrimitiveTypeArgument(TypeRef),
}

/// Validate a migration target type before a session is created.
pub fn validate_migration_type(ty: &TypeRef) -> Result<(), ValidationError> {
    if ty.is_variadic() {
        return Err(ValidationError::VariadicTarget(ty.clone()));
    }
    if ty.is_disjunction() {
        return Err(ValidationError::DisjunctionTarget(ty.clone()));
    }
    if ty.is_void() {
        return Err(ValidationError::VoidTarget);
    }
    if ty.is_null() {
        return Err(ValidationError::NullTarget);
    }
    validate_type_arguments(ty)
}

fn validate_type_arguments(ty: &TypeRef) -> Result<(), ValidationError> {
    for argument in ty.type_arguments() {
        if let Some(bound) = argument.wildcard_bound() {
            if bound.is_primitive() {
                return Err(ValidationError::PrimitiveWildcardBound(bound));
            }
        } else if argument.is_primitive() {
            return Err(ValidationError::PrimitiveTypeArgument(argument));
        }
        validate_type_arguments(&argument)?;
    }
    Ok(())
}
