//! Font resources: font map files, TFM metrics and the provider the
//! interpreter consults.

pub mod fontmap;
pub mod metrics;
pub mod tfm;

pub use fontmap::{FontMapRecord, FontMapTable, MapMode};
pub use metrics::{FontResolver, MetricsProvider, MetricsTable, NoMetrics, ResolvedFont};
pub use tfm::{CharMetrics, FixWord, TfmMetrics, scale_fix_word};
