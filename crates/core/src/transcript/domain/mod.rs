pub mod attributed_segment;
pub mod pipeline_result;
pub mod result_assembler;
pub mod speaker_merger;
pub mod speaker_segment;
pub mod word_span;
