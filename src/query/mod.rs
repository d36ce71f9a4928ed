//! Query features: turns a request's query string into a `QuerySpec` the stores execute.

mod pipeline;
mod spec;

pub use pipeline::{
    build, filter, limit_fields, paginate, sort, Stage, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT,
    RESERVED_KEYS, STAGES,
};
pub use spec::{
    Comparison, Condition, Direction, Predicate, Projection, QuerySpec, RequestQuery,
    ResolvedProjection, SortKey, TypedPredicate,
};
