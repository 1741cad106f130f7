//! Common repository traits
//!
//! Generic interfaces for the CRUD operations every repository exposes.
//! Domain-specific queries live as inherent methods on each repository.

/// Trait for creating new entities in the database
///
/// # Type Parameters
/// * `Entity` - Type of the returned entity (with ID assigned by the database)
/// * `CreateDTO` - DTO for creation (without ID, will be automatically generated)
pub trait Create<Entity, CreateDTO> {
    /// Creates a new entity and returns it with the generated ID
    async fn create(&self, data: &CreateDTO) -> Result<Entity, sqlx::Error>;
}

/// Trait for reading a single entity by primary key
///
/// # Type Parameters
/// * `Entity` - Type of the entity to read
/// * `Id` - Type of the primary key (e.g. `i64`, `(i64, i64)`)
pub trait Read<Entity, Id> {
    /// * `Ok(Some(Entity))` - Entity found
    /// * `Ok(None)` - No entity with that ID
    async fn read(&self, id: &Id) -> Result<Option<Entity>, sqlx::Error>;
}

/// Trait for reading multiple entities by list of primary keys
///
/// Entities are returned in database order, which may not match the order of `ids`.
pub trait ReadMany<Entity, Id> {
    async fn read_many(&self, ids: &[Id]) -> Result<Vec<Entity>, sqlx::Error>;
}

/// Trait for updating existing entities
///
/// Only the `Some(_)` fields of `UpdateDTO` are written. Fails with
/// `sqlx::Error::RowNotFound` when the entity does not exist.
pub trait Update<Entity, UpdateDTO, Id> {
    async fn update(&self, id: &Id, data: &UpdateDTO) -> Result<Entity, sqlx::Error>;
}

/// Trait for deleting entities
pub trait Delete<Id> {
    async fn delete(&self, id: &Id) -> Result<(), sqlx::Error>;
}
