//! Hydration and translation services over the store seams.

mod hydrator;
mod translation;
mod translation_diff;
pub use hydrator::{get_missing_relations, EntityHydrator, HydrateOptions};
pub use translation::{pick_translation, TranslationResolver};
pub use translation_diff::{TranslationDiff, TranslationDiffer};
