pub mod cascade;
pub mod lookup;
pub mod resolver;

pub use cascade::{ChainPlan, ChainResolution, LoadOutcome, LoadTicket};
pub use lookup::{LocationLookup, LookupError, PsgcClient, RegistryLoadError, StaticLocationLookup};
pub use resolver::LocationHierarchyResolver;
