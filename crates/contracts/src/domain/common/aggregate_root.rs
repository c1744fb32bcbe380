use super::EntityMetadata;

/// Trait for aggregate roots
///
/// Mandatory accessors plus the static metadata every aggregate class
/// declares about itself.
pub trait AggregateRoot {
    /// Aggregate identifier type
    type Id;

    /// Record id
    fn id(&self) -> Self::Id;

    /// Business code
    fn code(&self) -> &str;

    /// Display name
    fn description(&self) -> &str;

    /// Lifecycle metadata
    fn metadata(&self) -> &EntityMetadata;

    /// Mutable lifecycle metadata
    fn metadata_mut(&mut self) -> &mut EntityMetadata;

    /// Aggregate index in the system (e.g. "a001")
    fn aggregate_index() -> &'static str;

    /// Collection name for the DB (e.g. "network")
    fn collection_name() -> &'static str;

    /// Full aggregate name (e.g. "a001_network")
    fn full_name() -> String {
        format!("{}_{}", Self::aggregate_index(), Self::collection_name())
    }
}
