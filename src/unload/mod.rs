// ABOUTME: SQL generation for unloading warehouse tables to object storage
// ABOUTME: Exposes the metadata query builder and the unload plan builder

pub mod metadata;
pub mod plan;

pub use metadata::build_metadata_query;
pub use plan::{
    build_unload_plan, build_unload_plan_with, plan_for, IntegrationNaming, UnloadPlan,
    INTEGRATION_ROLE, MAX_FILE_SIZE,
};
