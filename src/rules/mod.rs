pub mod exceptions;
pub mod matching;
pub mod ownership;

pub use exceptions::{is_excepted, ExceptionSet};
pub use matching::is_match;
pub use ownership::{
    is_npc_controlled, is_resolvable, owns_unit, resolve_owner, OwnerScope, OwnershipContext,
    ResolvedOwner,
};
