pub mod answer_service;
pub mod enrichment_service;
pub mod pronunciation_cache;
pub mod pronunciation_service;

pub use answer_service::{check_answer, AnswerCard, AnswerVerdict};
pub use enrichment_service::{EnrichStats, RowEnricher};
pub use pronunciation_cache::PronunciationCache;
pub use pronunciation_service::{PronunciationReply, PronunciationService};
