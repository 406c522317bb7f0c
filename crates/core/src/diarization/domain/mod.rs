pub mod diarizer;
pub mod rttm;
