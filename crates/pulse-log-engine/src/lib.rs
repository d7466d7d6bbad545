pub mod coerce;
pub mod decode;
pub mod extractor;
pub mod format;
pub mod origin;
pub mod registry;

pub use coerce::{coerce, CoerceError};
pub use decode::{decode_batch, encode_batch, InvocationEvent};
pub use extractor::{Extractor, Measurements};
pub use format::format_timestamp_iso;
pub use origin::resolve_origin;
pub use registry::{ExtractionRule, MetricSpec, RegistryError, RuleDef, RuleRegistry, BUILTIN_RULES};
